use crate::error::Error;
use crate::pdf;
use crate::statement::{Statement, Valuation};
use crate::transaction::Transaction;

use chrono::NaiveDate;
use nom::bytes::complete::*;
use nom::character::complete::*;
use nom::combinator::*;
use nom::sequence::*;
use nom::IResult;
use rust_decimal::Decimal;
use std::io::Read;
use std::str::FromStr;
use tracing::{debug, info};

/// Fund name used for rows that appear before any fund header.
pub const UNKNOWN_FUND: &str = "Unknown";

/// Line scanner for consolidated account statements. Fund, folio and ISIN
/// headers set the context that following transaction and market value lines
/// are attributed to.
#[derive(Clone, Default, Debug)]
pub struct Parser {
    fund: Option<String>,
    folio: Option<String>,
    isin: Option<String>,
}

/// Columns of a transaction line, before number conversion.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TransactionColumns<'a> {
    pub date: NaiveDate,
    pub description: String,
    pub amount: &'a str,
    pub units: &'a str,
    pub price: &'a str,
    pub unit_balance: &'a str,
}

impl Parser {
    pub fn new() -> Parser {
        Parser::default()
    }

    /// Reads a PDF statement, unlocking it with `password`, and parses its text.
    pub fn parse<R: Read>(&mut self, mut pdf_file: R, password: &str) -> Result<Statement, Error> {
        let mut bytes = Vec::new();
        pdf_file.read_to_end(&mut bytes)?;
        let text = pdf::extract_text(&bytes, password)?;
        self.parse_text(&text)
    }

    /// Parses statement text. Context left over from an earlier call is
    /// dropped first.
    pub fn parse_text(&mut self, text: &str) -> Result<Statement, Error> {
        *self = Parser::default();
        let mut transactions = Vec::new();
        let mut valuations = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;

            if let Ok((_, name)) = fund_header(line) {
                debug!(line = line_number, fund = name, "fund header");
                self.fund = Some(name.to_string());
            }

            if let Ok((_, folio)) = folio_header(line) {
                self.folio = Some(folio.to_string());
            }

            if let Some(isin) = find_isin(line) {
                self.isin = Some(isin.to_string());
            }

            if let Some(columns) = transaction_columns(line) {
                transactions.push(self.transaction(columns, line_number)?);
            }

            if let Some((date, value)) = find_market_value(line) {
                valuations.push(Valuation {
                    fund: self.current_fund(),
                    date,
                    market_value: parse_number(value, line_number)?,
                });
            }
        }

        info!(
            transactions = transactions.len(),
            valuations = valuations.len(),
            "parsed statement"
        );
        Ok(Statement::new(transactions, valuations))
    }

    fn current_fund(&self) -> String {
        self.fund
            .clone()
            .unwrap_or_else(|| UNKNOWN_FUND.to_string())
    }

    fn transaction(&self, columns: TransactionColumns<'_>, line: usize) -> Result<Transaction, Error> {
        Ok(Transaction {
            folio: self.folio.clone(),
            isin: self.isin.clone(),
            fund: self.current_fund(),
            date: columns.date,
            description: columns.description,
            amount: parse_number(columns.amount, line)?,
            units: parse_number(columns.units, line)?,
            price: parse_number(columns.price, line)?,
            unit_balance: parse_number(columns.unit_balance, line)?,
        })
    }
}

/// Converts a statement number: thousands separators are dropped and a value
/// in parentheses is negative.
pub fn parse_number(input: &str, line: usize) -> Result<Decimal, Error> {
    let cleaned: String = input
        .chars()
        .filter(|c| *c != ',' && *c != ')')
        .map(|c| if c == '(' { '-' } else { c })
        .collect();
    Decimal::from_str(&cleaned).map_err(|e| Error::Parse {
        line,
        reason: format!("invalid number '{}': {}", input, e),
    })
}

/// `05-Jan-2023`
pub(crate) fn date(input: &str) -> IResult<&str, NaiveDate> {
    map_res(
        recognize(tuple((
            take_while_m_n(2, 2, |c: char| c.is_ascii_digit()),
            char('-'),
            take_while_m_n(3, 3, |c: char| c.is_ascii_alphabetic()),
            char('-'),
            take_while_m_n(4, 4, |c: char| c.is_ascii_digit()),
        ))),
        |s: &str| NaiveDate::parse_from_str(s, "%d-%b-%Y"),
    )(input)
}

/// `B205RG-Axis Bluechip Fund - Regular Growth` yields `B205RG-Axis Bluechip Fund`.
pub(crate) fn fund_header(input: &str) -> IResult<&str, &str> {
    let (rest, (code, _)) = pair(
        take_while_m_n(3, usize::MAX, |c: char| c.is_ascii_alphanumeric()),
        char('-'),
    )(input)?;
    let name_start = code.len() + 1;
    match find_ignore_case(rest, "FUND") {
        Some(position) => {
            let end = name_start + position + "FUND".len();
            Ok((&input[end..], &input[..end]))
        }
        None => Err(nom::Err::Error(nom::error::Error::new(
            rest,
            nom::error::ErrorKind::TakeUntil,
        ))),
    }
}

/// `Folio No: 12345678 / 0` yields `12345678`.
pub(crate) fn folio_header(input: &str) -> IResult<&str, &str> {
    let (rest, (_, _, folio, _)) = tuple((
        tag_no_case("Folio No:"),
        satisfy(char::is_whitespace),
        digit1,
        satisfy(char::is_whitespace),
    ))(input)?;
    Ok((rest, folio))
}

/// ISIN printed after `ISIN` and one separator, up to `Reg` or `(`.
pub(crate) fn find_isin(line: &str) -> Option<&str> {
    let start = rfind_ignore_case(line, "ISIN")?;
    let mut after = line[start + "ISIN".len()..].chars();
    after.next()?;
    let rest = after.as_str();
    let end = [rest.find("Reg"), rest.find('(')]
        .iter()
        .flatten()
        .min()
        .copied()?;
    let isin = rest[..end].trim();
    if isin.is_empty() {
        None
    } else {
        Some(isin)
    }
}

/// `Market Value on 13-Oct-2025: INR 23,500.00`, anywhere in the line.
pub(crate) fn find_market_value(line: &str) -> Option<(NaiveDate, &str)> {
    let result: IResult<&str, (NaiveDate, &str)> = preceded(
        pair(take_until("Market Value on "), tag("Market Value on ")),
        separated_pair(date, tag(": INR "), market_value_number),
    )(line);
    result.ok().map(|(_, value)| value)
}

/// `1,23,456.78`: digits and separators ending in exactly two decimals.
fn market_value_number(input: &str) -> IResult<&str, &str> {
    let (rest, whole) = take_while1(|c: char| c.is_ascii_digit() || c == ',')(input)?;
    let (rest, _) = char('.')(rest)?;
    let (rest, cents) = take_while_m_n(2, 2, |c: char| c.is_ascii_digit())(rest)?;
    let len = whole.len() + 1 + cents.len();
    Ok((rest, &input[..len]))
}

/// Splits a transaction line into its columns: a leading date, a description,
/// then amount, units, price and unit balance. The description ends at the
/// first position where the four numeric columns follow.
pub(crate) fn transaction_columns(line: &str) -> Option<TransactionColumns<'_>> {
    let (rest, date) = date(line).ok()?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let tokens: Vec<&str> = rest.split_whitespace().collect();
    if tokens.len() < 5 {
        return None;
    }

    (1..=tokens.len() - 4)
        .find(|&i| {
            is_amount(tokens[i])
                && is_units(tokens[i + 1])
                && is_plain_number(tokens[i + 2])
                && is_plain_number(tokens[i + 3])
        })
        .map(|i| TransactionColumns {
            date,
            description: tokens[..i].join(" "),
            amount: tokens[i],
            units: tokens[i + 1],
            price: tokens[i + 2],
            unit_balance: tokens[i + 3],
        })
}

fn numeric_token(input: &str, parentheses: bool) -> bool {
    let chars = take_while1::<_, &str, nom::error::Error<&str>>(|c: char| {
        c.is_ascii_digit() || c == ',' || c == '.' || (parentheses && (c == '(' || c == ')'))
    });
    all_consuming(chars)(input).is_ok() && input.chars().any(|c| c.is_ascii_digit())
}

/// Amount column: starts with a digit or `(` and carries a decimal separator.
fn is_amount(token: &str) -> bool {
    numeric_token(token, true)
        && token.len() >= 3
        && token.starts_with(|c: char| c.is_ascii_digit() || c == '(')
        && token[1..].contains(|c: char| c == ',' || c == '.')
}

fn is_units(token: &str) -> bool {
    numeric_token(token, true)
}

fn is_plain_number(token: &str) -> bool {
    numeric_token(token, false)
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_uppercase().find(&needle.to_ascii_uppercase())
}

fn rfind_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_uppercase().rfind(&needle.to_ascii_uppercase())
}
