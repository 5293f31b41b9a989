use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

use crate::error::Error;
use crate::returns::{FundReturn, PortfolioReturns};
use crate::xirr::XirrError;

#[derive(Serialize, Debug)]
struct ReturnView<'a> {
    fund: &'a str,
    market_value: Decimal,
    xirr: Option<f64>,
    error: Option<String>,
}

impl<'a> From<&'a FundReturn> for ReturnView<'a> {
    fn from(r: &'a FundReturn) -> Self {
        ReturnView {
            fund: &r.fund,
            market_value: r.market_value,
            xirr: r.xirr.as_ref().ok().copied(),
            error: r.xirr.as_ref().err().map(|e| e.to_string()),
        }
    }
}

#[derive(Serialize, Debug)]
struct ReportView<'a> {
    as_of: NaiveDate,
    total_market_value: Decimal,
    total: ReturnView<'a>,
    funds: Vec<ReturnView<'a>>,
}

pub fn to_json(returns: &PortfolioReturns) -> Result<String, Error> {
    let view = ReportView {
        as_of: returns.as_of,
        total_market_value: returns.total_market_value,
        total: ReturnView::from(&returns.portfolio),
        funds: returns.funds.iter().map(ReturnView::from).collect(),
    };
    Ok(serde_json::to_string_pretty(&view)?)
}

/// Plain text report: totals first, then one row per fund.
pub fn render(returns: &PortfolioReturns) -> String {
    TextReport(returns).to_string()
}

struct TextReport<'a>(&'a PortfolioReturns);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let returns = self.0;

        writeln!(f)?;
        writeln!(
            f,
            "Total Market Value: INR {}",
            format_amount(returns.total_market_value)
        )?;
        writeln!(f, "Total XIRR: {}", format_rate(&returns.portfolio.xirr, "%"))?;
        writeln!(f, "As of: {}\n", returns.as_of.format("%d-%b-%Y"))?;
        writeln!(f, "Fund-wise XIRR:\n")?;

        let rows: Vec<(String, String, String)> = returns
            .funds
            .iter()
            .map(|r| {
                (
                    r.fund.clone(),
                    format_amount(r.market_value),
                    format_rate(&r.xirr, ""),
                )
            })
            .collect();

        let name_width = rows
            .iter()
            .map(|r| r.0.chars().count())
            .chain(std::iter::once("Fund".len()))
            .max()
            .unwrap_or(0);
        let value_width = rows
            .iter()
            .map(|r| r.1.len())
            .chain(std::iter::once("Market Value".len()))
            .max()
            .unwrap_or(0);

        writeln!(
            f,
            "{:<nw$}  {:>vw$}  {}",
            "Fund",
            "Market Value",
            "XIRR (%)",
            nw = name_width,
            vw = value_width
        )?;
        for (name, value, rate) in rows {
            writeln!(
                f,
                "{:<nw$}  {:>vw$}  {:>8}",
                name,
                value,
                rate,
                nw = name_width,
                vw = value_width
            )?;
        }
        Ok(())
    }
}

/// Rate as a percentage with two decimals, or a marker naming why it is
/// missing. Never renders a missing rate as a number.
pub fn format_rate(rate: &Result<f64, XirrError>, suffix: &str) -> String {
    match rate {
        Ok(r) => format!("{:.2}{}", r * 100.0, suffix),
        Err(e) => format!("n/a ({})", e.kind()),
    }
}

/// `1234567.891` becomes `1,234,567.89`.
pub fn format_amount(value: Decimal) -> String {
    let fixed = format!("{:.2}", value.round_dp(2));
    let (sign, digits) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (whole, fraction) = digits.split_at(digits.find('.').unwrap_or(digits.len()));

    let mut grouped = String::new();
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}{}{}", sign, grouped, fraction)
}
