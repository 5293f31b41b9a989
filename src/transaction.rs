use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cashflow::{to_amount, CashFlow};

/// One transaction row of the statement. Amounts are from the fund's side:
/// purchases are positive, redemptions negative.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Transaction {
    pub folio: Option<String>,
    pub isin: Option<String>,
    pub fund: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub units: Decimal,
    pub price: Decimal,
    pub unit_balance: Decimal,
}

impl Transaction {
    pub fn is_purchase(&self) -> bool {
        self.amount.is_sign_positive() && !self.amount.is_zero()
    }

    /// The investor's cash flow for this row: money paid into the fund is an
    /// outflow, redemptions are inflows.
    pub fn to_cash_flow(&self) -> CashFlow {
        CashFlow::new(self.date, to_amount(-self.amount), self.fund.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn transaction(amount: Decimal) -> Transaction {
        Transaction {
            folio: Some("12345678".to_string()),
            isin: Some("INF846K01164".to_string()),
            fund: "B205RG-Axis Bluechip Fund".to_string(),
            date: NaiveDate::from_ymd_opt(2023, 1, 5).unwrap(),
            description: "Purchase".to_string(),
            amount,
            units: dec!(250.000),
            price: dec!(40.0000),
            unit_balance: dec!(250.000),
        }
    }

    #[test]
    fn purchase_is_an_outflow() {
        let purchase = transaction(dec!(10000.00));
        assert!(purchase.is_purchase());

        let flow = purchase.to_cash_flow();
        assert_eq!(flow.amount, -10_000.0);
        assert_eq!(flow.fund_id, "B205RG-Axis Bluechip Fund");
        assert_eq!(flow.date, purchase.date);
    }

    #[test]
    fn redemption_is_an_inflow() {
        let redemption = transaction(dec!(-2000.00));
        assert!(!redemption.is_purchase());
        assert_eq!(redemption.to_cash_flow().amount, 2_000.0);
    }
}
