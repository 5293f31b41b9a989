use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::cashflow::{to_amount, CashFlow, FlowGroup, PORTFOLIO_TOTAL};

/// Cash flows grouped per fund and for the whole portfolio, each closed out
/// with its market value on `as_of`.
#[derive(Clone, Debug)]
pub struct Aggregation {
    pub as_of: NaiveDate,
    /// Funds with at least one transaction, in order of first appearance.
    pub funds: Vec<FlowGroup>,
    pub portfolio: FlowGroup,
    /// Funds with a market value but no transactions. They take no part in
    /// any flow group.
    pub idle: Vec<String>,
    pub market_values: BTreeMap<String, Decimal>,
}

impl Aggregation {
    pub fn market_value(&self, fund: &str) -> Decimal {
        self.market_values
            .get(fund)
            .copied()
            .unwrap_or_else(|| Decimal::new(0, 2))
    }

    /// Market value of every fund in the statement, idle funds included.
    pub fn total_market_value(&self) -> Decimal {
        self.market_values
            .values()
            .fold(Decimal::new(0, 2), |sum, v| sum + *v)
    }

    /// Market value closing out the portfolio group.
    pub fn portfolio_market_value(&self) -> Decimal {
        self.funds
            .iter()
            .fold(Decimal::new(0, 2), |sum, g| sum + self.market_value(&g.fund_id))
    }
}

/// Groups `transactions` by fund and appends a terminal flow per fund (its
/// market value) and for the portfolio (the sum of those values), all dated
/// `as_of`. Funds missing from `market_values` are closed out at zero.
pub fn aggregate(
    transactions: &[CashFlow],
    market_values: &BTreeMap<String, Decimal>,
    as_of: NaiveDate,
) -> Aggregation {
    let mut histories: Vec<(String, Vec<CashFlow>)> = Vec::new();
    for flow in transactions {
        match histories.iter_mut().find(|(fund, _)| fund == &flow.fund_id) {
            Some((_, history)) => history.push(flow.clone()),
            None => histories.push((flow.fund_id.clone(), vec![flow.clone()])),
        }
    }

    let mut portfolio_value = Decimal::new(0, 2);
    let mut funds = Vec::with_capacity(histories.len());
    for (fund, history) in histories {
        let value = match market_values.get(&fund) {
            Some(value) => *value,
            None => {
                warn!(fund = %fund, "no market value for fund, closing it out at zero");
                Decimal::new(0, 2)
            }
        };
        portfolio_value += value;
        funds.push(FlowGroup::new(&fund, history, to_amount(value), as_of));
    }

    let idle: Vec<String> = market_values
        .keys()
        .filter(|fund| !funds.iter().any(|g: &FlowGroup| &g.fund_id == *fund))
        .cloned()
        .collect();
    for fund in &idle {
        warn!(fund = %fund, "fund has a market value but no transactions");
    }

    let portfolio = FlowGroup::new(
        PORTFOLIO_TOTAL,
        transactions.to_vec(),
        to_amount(portfolio_value),
        as_of,
    );

    info!(
        funds = funds.len(),
        idle = idle.len(),
        flows = transactions.len(),
        %as_of,
        "aggregated cash flows"
    );

    Aggregation {
        as_of,
        funds,
        portfolio,
        idle,
        market_values: market_values.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn transactions() -> Vec<CashFlow> {
        vec![
            CashFlow::new(date(2022, 1, 10), -5_000.0, "Alpha Fund"),
            CashFlow::new(date(2022, 2, 10), -2_000.0, "Beta Fund"),
            CashFlow::new(date(2022, 3, 10), -5_000.0, "Alpha Fund"),
            CashFlow::new(date(2022, 3, 10), -5_000.0, "Alpha Fund"),
            CashFlow::new(date(2023, 8, 1), 1_000.0, "Beta Fund"),
        ]
    }

    fn values() -> BTreeMap<String, Decimal> {
        let mut values = BTreeMap::new();
        values.insert("Alpha Fund".to_string(), dec!(17250.50));
        values.insert("Beta Fund".to_string(), dec!(1300.25));
        values
    }

    #[test]
    fn groups_by_fund_in_order_of_appearance() {
        let aggregation = aggregate(&transactions(), &values(), date(2024, 6, 30));

        let names: Vec<&str> = aggregation.funds.iter().map(|g| g.fund_id.as_str()).collect();
        assert_eq!(names, vec!["Alpha Fund", "Beta Fund"]);

        let alpha = &aggregation.funds[0];
        assert_eq!(alpha.history.len(), 3);
        assert!(alpha.history.iter().all(|f| f.fund_id == "Alpha Fund"));
        assert_eq!(alpha.terminal, CashFlow::new(date(2024, 6, 30), 17_250.5, "Alpha Fund"));
    }

    #[test]
    fn duplicate_rows_are_kept() {
        let aggregation = aggregate(&transactions(), &values(), date(2024, 6, 30));
        let duplicates = aggregation.funds[0]
            .history
            .iter()
            .filter(|f| f.date == date(2022, 3, 10))
            .count();
        assert_eq!(duplicates, 2);
    }

    #[test]
    fn portfolio_is_the_union_of_fund_flows() {
        let transactions = transactions();
        let aggregation = aggregate(&transactions, &values(), date(2024, 6, 30));

        let fund_flows: usize = aggregation.funds.iter().map(|g| g.history.len()).sum();
        assert_eq!(aggregation.portfolio.history.len(), fund_flows);
        assert_eq!(aggregation.portfolio.history, transactions);

        let fund_total: f64 = aggregation
            .funds
            .iter()
            .flat_map(|g| g.history.iter())
            .map(|f| f.amount)
            .sum();
        let portfolio_total: f64 = aggregation.portfolio.history.iter().map(|f| f.amount).sum();
        assert!((fund_total - portfolio_total).abs() < 1e-9);
    }

    #[test]
    fn portfolio_terminal_is_the_sum_of_fund_terminals() {
        let aggregation = aggregate(&transactions(), &values(), date(2024, 6, 30));

        let terminal_sum: f64 = aggregation.funds.iter().map(|g| g.market_value()).sum();
        assert!((aggregation.portfolio.market_value() - terminal_sum).abs() < 1e-6);
        assert_eq!(aggregation.portfolio.terminal.fund_id, PORTFOLIO_TOTAL);
        assert_eq!(aggregation.portfolio.terminal.date, date(2024, 6, 30));
        assert_eq!(aggregation.portfolio_market_value(), dec!(18550.75));
    }

    #[test]
    fn valued_fund_without_transactions_is_idle() {
        let mut values = values();
        values.insert("Gamma Fund".to_string(), dec!(999.99));

        let aggregation = aggregate(&transactions(), &values, date(2024, 6, 30));

        assert_eq!(aggregation.idle, vec!["Gamma Fund".to_string()]);
        assert_eq!(aggregation.funds.len(), 2);
        assert_eq!(aggregation.portfolio_market_value(), dec!(18550.75));
        assert_eq!(aggregation.total_market_value(), dec!(19550.74));
        assert!((aggregation.portfolio.market_value() - 18_550.75).abs() < 1e-6);
    }

    #[test]
    fn fund_without_market_value_closes_at_zero() {
        let mut values = values();
        values.remove("Beta Fund");

        let aggregation = aggregate(&transactions(), &values, date(2024, 6, 30));

        let beta = &aggregation.funds[1];
        assert_eq!(beta.fund_id, "Beta Fund");
        assert_eq!(beta.market_value(), 0.0);
        assert_eq!(aggregation.market_value("Beta Fund"), dec!(0));
    }

    #[test]
    fn empty_statement_has_no_funds() {
        let aggregation = aggregate(&[], &BTreeMap::new(), date(2024, 6, 30));
        assert!(aggregation.funds.is_empty());
        assert!(aggregation.idle.is_empty());
        assert!(aggregation.portfolio.history.is_empty());
        assert_eq!(aggregation.portfolio.market_value(), 0.0);
    }
}
