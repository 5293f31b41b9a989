use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Group identifier for the flows of every fund taken together.
pub const PORTFOLIO_TOTAL: &str = "Total";

/// Converts a statement amount to the floating point value the solver works
/// with. Unrepresentable values become NaN and are rejected by the solver.
pub fn to_amount(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

/// A single dated money movement, seen from the investor's side: negative
/// amounts are money invested, positive amounts are money returned or the
/// current value of a holding.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CashFlow {
    pub date: NaiveDate,
    pub amount: f64,
    pub fund_id: String,
}

impl CashFlow {
    pub fn new(date: NaiveDate, amount: f64, fund_id: impl Into<String>) -> CashFlow {
        CashFlow {
            date,
            amount,
            fund_id: fund_id.into(),
        }
    }
}

/// The transaction history of one fund (or of the whole portfolio) closed out
/// by a single terminal flow carrying the current market value.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct FlowGroup {
    pub fund_id: String,
    pub history: Vec<CashFlow>,
    pub terminal: CashFlow,
}

impl FlowGroup {
    pub fn new(fund_id: &str, history: Vec<CashFlow>, market_value: f64, as_of: NaiveDate) -> FlowGroup {
        FlowGroup {
            fund_id: fund_id.to_string(),
            history,
            terminal: CashFlow::new(as_of, market_value, fund_id),
        }
    }

    pub fn market_value(&self) -> f64 {
        self.terminal.amount
    }

    /// All flows of the group, terminal flow last.
    pub fn flows(&self) -> Vec<CashFlow> {
        let mut flows = self.history.clone();
        flows.push(self.terminal.clone());
        flows
    }
}
