use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::warn;

use crate::aggregate::Aggregation;
use crate::cashflow::{FlowGroup, PORTFOLIO_TOTAL};
use crate::config::SolverConfig;
use crate::xirr::{xirr, XirrError};

/// Rate of return of one group, or why it could not be computed.
#[derive(Clone, Debug, PartialEq)]
pub struct FundReturn {
    pub fund: String,
    pub market_value: Decimal,
    pub xirr: Result<f64, XirrError>,
}

impl FundReturn {
    pub fn is_computable(&self) -> bool {
        self.xirr.is_ok()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PortfolioReturns {
    pub as_of: NaiveDate,
    pub total_market_value: Decimal,
    pub portfolio: FundReturn,
    pub funds: Vec<FundReturn>,
}

/// Solves every fund group, then the portfolio group. A failure stays with
/// the group that produced it. Idle funds are listed last as not computable.
pub fn compute(aggregation: &Aggregation, config: &SolverConfig) -> PortfolioReturns {
    let mut funds: Vec<FundReturn> = aggregation
        .funds
        .iter()
        .map(|group| solve(group, aggregation.market_value(&group.fund_id), config))
        .collect();

    for fund in &aggregation.idle {
        funds.push(FundReturn {
            fund: fund.clone(),
            market_value: aggregation.market_value(fund),
            xirr: Err(XirrError::InvalidInput(
                "no transaction history".to_string(),
            )),
        });
    }

    let portfolio = solve(
        &aggregation.portfolio,
        aggregation.portfolio_market_value(),
        config,
    );

    PortfolioReturns {
        as_of: aggregation.as_of,
        total_market_value: aggregation.total_market_value(),
        portfolio,
        funds,
    }
}

fn solve(group: &FlowGroup, market_value: Decimal, config: &SolverConfig) -> FundReturn {
    let rate = xirr(&group.flows(), config);
    if let Err(e) = &rate {
        warn!(fund = %group.fund_id, error = %e, "XIRR not computable");
    }
    FundReturn {
        fund: group.fund_id.clone(),
        market_value,
        xirr: rate,
    }
}

impl PortfolioReturns {
    pub fn fund(&self, name: &str) -> Option<&FundReturn> {
        if name == PORTFOLIO_TOTAL {
            return Some(&self.portfolio);
        }
        self.funds.iter().find(|f| f.fund == name)
    }
}
