use crate::cashflow::CashFlow;
use crate::transaction::Transaction;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Default, Debug)]
pub struct Statement {
    pub funds: Vec<FundOverview>,
    pub total_market_value: Decimal,
    pub valuations: Vec<Valuation>,
    pub transactions: Vec<Transaction>,
}

/// Market value of a fund's holding as printed in the statement.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Valuation {
    pub fund: String,
    pub date: NaiveDate,
    pub market_value: Decimal,
}

#[derive(Serialize, Deserialize, Clone, Default, Debug, PartialEq)]
pub struct FundOverview {
    pub name: String,
    pub count: i64,
    pub invested: Decimal,
    pub redeemed: Decimal,
    pub market_value: Decimal,
}

impl Statement {
    /// Builds a statement with transactions in date order. Rows on the same
    /// date keep their order in the document.
    pub fn new(mut transactions: Vec<Transaction>, valuations: Vec<Valuation>) -> Statement {
        transactions.sort_by_key(|t| t.date);
        let total_market_value = valuations
            .iter()
            .fold(Decimal::new(0, 2), |sum, v| sum + v.market_value);
        Statement {
            funds: Vec::new(),
            total_market_value,
            valuations,
            transactions,
        }
    }

    /// Current value per fund. A fund valued more than once (one line per
    /// folio) gets the sum of its valuations.
    pub fn market_values(&self) -> BTreeMap<String, Decimal> {
        let mut values: BTreeMap<String, Decimal> = BTreeMap::new();
        for valuation in &self.valuations {
            *values
                .entry(valuation.fund.clone())
                .or_insert_with(|| Decimal::new(0, 2)) += valuation.market_value;
        }
        values
    }

    /// Date of the first valuation, used as "today" for the terminal flows.
    pub fn valuation_date(&self) -> Option<NaiveDate> {
        self.valuations.first().map(|v| v.date)
    }

    pub fn cash_flows(&self) -> Vec<CashFlow> {
        self.transactions.iter().map(Transaction::to_cash_flow).collect()
    }

    pub fn calculate_fund_overview(&mut self) -> &Vec<FundOverview> {
        let mut funds: Vec<FundOverview> = Vec::new();

        let names = self
            .transactions
            .iter()
            .map(|t| &t.fund)
            .chain(self.valuations.iter().map(|v| &v.fund));

        for name in names {
            if funds.iter().find(|f| &f.name == name).is_none() {
                funds.push(FundOverview {
                    name: name.to_string(),
                    count: 0i64,
                    invested: Decimal::new(0, 2),
                    redeemed: Decimal::new(0, 2),
                    market_value: Decimal::new(0, 2),
                })
            }
        }

        for transaction in &self.transactions {
            if let Some(fund) = funds.iter_mut().find(|f| f.name == transaction.fund) {
                fund.count += 1;
                if transaction.is_purchase() {
                    fund.invested += transaction.amount;
                } else {
                    fund.redeemed -= transaction.amount;
                }
            }
        }

        for valuation in &self.valuations {
            if let Some(fund) = funds.iter_mut().find(|f| f.name == valuation.fund) {
                fund.market_value += valuation.market_value;
            }
        }

        self.funds = funds;
        &self.funds
    }
}
