//! Money-weighted rate of return over irregularly dated cash flows.
//!
//! The rate `r` solves
//!
//! ```text
//! sum(amount_i / (1 + r)^((date_i - date_0) / 365)) = 0
//! ```
//!
//! where `date_0` is the earliest date among the flows. The root is bracketed
//! by growing and shrinking `1 + r` geometrically from the initial guess, then
//! refined by false position with bisection fallback.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, trace};

use crate::cashflow::CashFlow;
use crate::config::SolverConfig;

const DAYS_PER_YEAR: f64 = 365.0;

/// Bracket expansion attempts in each direction before giving up.
pub const MAX_BRACKET_EXPANSIONS: u32 = 60;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum XirrError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no solution: {0}")]
    NoSolution(String),
    #[error("no convergence after {0} iterations")]
    NonConvergence(u32),
}

impl XirrError {
    /// Short label for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            XirrError::InvalidInput(_) => "invalid input",
            XirrError::NoSolution(_) => "no solution",
            XirrError::NonConvergence(_) => "did not converge",
        }
    }
}

/// Flows reduced to (years since the earliest flow, amount).
struct Schedule {
    terms: Vec<(f64, f64)>,
}

impl Schedule {
    fn new(flows: &[CashFlow]) -> Result<Schedule, XirrError> {
        if flows.is_empty() {
            return Err(XirrError::InvalidInput("no cash flows".to_string()));
        }
        if flows.iter().any(|f| !f.amount.is_finite()) {
            return Err(XirrError::InvalidInput(
                "cash flow amounts must be finite".to_string(),
            ));
        }
        if flows.iter().all(|f| f.amount == 0.0) {
            return Err(XirrError::InvalidInput("all cash flows are zero".to_string()));
        }

        let (start, end) = date_range(flows);
        if start == end {
            return Err(XirrError::InvalidInput(
                "cash flows need at least two distinct dates".to_string(),
            ));
        }

        let terms = flows
            .iter()
            .map(|f| ((f.date - start).num_days() as f64 / DAYS_PER_YEAR, f.amount))
            .collect();
        Ok(Schedule { terms })
    }

    fn npv(&self, rate: f64) -> f64 {
        let growth = 1.0 + rate;
        self.terms
            .iter()
            .map(|(years, amount)| amount / growth.powf(*years))
            .sum()
    }

    fn has_both_signs(&self) -> bool {
        self.terms.iter().any(|(_, a)| *a < 0.0) && self.terms.iter().any(|(_, a)| *a > 0.0)
    }
}

fn date_range(flows: &[CashFlow]) -> (NaiveDate, NaiveDate) {
    flows.iter().fold((flows[0].date, flows[0].date), |(lo, hi), f| {
        (lo.min(f.date), hi.max(f.date))
    })
}

/// Two rates whose net present values have opposite signs (or one is zero).
#[derive(Debug, Clone, Copy)]
struct Bracket {
    lo: f64,
    f_lo: f64,
    hi: f64,
    f_hi: f64,
}

/// Net present value of `flows` discounted at `rate` to the earliest flow date.
pub fn xnpv(rate: f64, flows: &[CashFlow]) -> Result<f64, XirrError> {
    if rate <= -1.0 || rate.is_nan() {
        return Err(XirrError::InvalidInput(format!(
            "rate must be greater than -1, got {}",
            rate
        )));
    }
    Ok(Schedule::new(flows)?.npv(rate))
}

/// Annualized rate at which the net present value of `flows` is zero.
pub fn xirr(flows: &[CashFlow], config: &SolverConfig) -> Result<f64, XirrError> {
    config
        .validate()
        .map_err(|e| XirrError::InvalidInput(e.to_string()))?;

    let schedule = Schedule::new(flows)?;
    if !schedule.has_both_signs() {
        return Err(XirrError::NoSolution(
            "cash flows need both an investment and a return".to_string(),
        ));
    }

    let bracket = find_bracket(&schedule, config)?;
    refine(&schedule, bracket, config)
}

fn find_bracket(schedule: &Schedule, config: &SolverConfig) -> Result<Bracket, XirrError> {
    let guess = config.initial_guess;
    let f_guess = schedule.npv(guess);
    if !f_guess.is_finite() {
        return Err(XirrError::NoSolution(format!(
            "net present value is not finite at the initial guess {}",
            guess
        )));
    }

    let growth = 1.0 + guess;
    let (mut up, mut f_up, mut up_open) = (guess, f_guess, true);
    let (mut down, mut f_down, mut down_open) = (guess, f_guess, true);

    for k in 1..=MAX_BRACKET_EXPANSIONS {
        let scale = config.bracket_expansion_factor.powi(k as i32);

        if up_open {
            let rate = growth * scale - 1.0;
            let f = schedule.npv(rate);
            if !rate.is_finite() || !f.is_finite() {
                up_open = false;
            } else if f * f_up <= 0.0 {
                debug!(lo = up, hi = rate, expansions = k, "bracketed root above guess");
                return Ok(Bracket {
                    lo: up,
                    f_lo: f_up,
                    hi: rate,
                    f_hi: f,
                });
            } else {
                up = rate;
                f_up = f;
            }
        }

        if down_open {
            let rate = growth / scale - 1.0;
            let f = schedule.npv(rate);
            if rate <= -1.0 || !f.is_finite() {
                down_open = false;
            } else if f * f_down <= 0.0 {
                debug!(lo = rate, hi = down, expansions = k, "bracketed root below guess");
                return Ok(Bracket {
                    lo: rate,
                    f_lo: f,
                    hi: down,
                    f_hi: f_down,
                });
            } else {
                down = rate;
                f_down = f;
            }
        }

        if !up_open && !down_open {
            break;
        }
    }

    Err(XirrError::NoSolution(format!(
        "net present value keeps its sign between {:.4} and {:.4}",
        down, up
    )))
}

fn refine(schedule: &Schedule, bracket: Bracket, config: &SolverConfig) -> Result<f64, XirrError> {
    let Bracket {
        mut lo,
        mut f_lo,
        mut hi,
        mut f_hi,
    } = bracket;

    if f_lo.abs() < config.tolerance {
        return Ok(lo);
    }
    if f_hi.abs() < config.tolerance {
        return Ok(hi);
    }

    let mut bisect = false;
    for iteration in 1..=config.max_iterations {
        let width = hi - lo;
        let mut rate = hi - f_hi * width / (f_hi - f_lo);
        if bisect || !rate.is_finite() || rate <= lo || rate >= hi {
            rate = lo + width / 2.0;
        }

        let f = schedule.npv(rate);
        trace!(iteration, rate, npv = f, "refining");

        if f.abs() < config.tolerance || width.abs() <= 4.0 * f64::EPSILON * rate.abs().max(1.0) {
            debug!(iteration, rate, npv = f, "converged");
            return Ok(rate);
        }

        if f * f_lo < 0.0 {
            hi = rate;
            f_hi = f;
        } else {
            lo = rate;
            f_lo = f;
        }

        // Bisect next when this step did not halve the bracket.
        bisect = (hi - lo) > width / 2.0;
    }

    Err(XirrError::NonConvergence(config.max_iterations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn flow(date: NaiveDate, amount: f64) -> CashFlow {
        CashFlow::new(date, amount, "fund")
    }

    fn two_flows(start: NaiveDate, days: i64, invested: f64, returned: f64) -> Vec<CashFlow> {
        vec![
            flow(start, invested),
            flow(start + Duration::days(days), returned),
        ]
    }

    #[test]
    fn recovers_ten_percent_over_one_year() {
        let flows = two_flows(date(2023, 1, 1), 365, -100_000.0, 110_000.0);
        let rate = xirr(&flows, &SolverConfig::default()).unwrap();
        assert!((rate - 0.10).abs() < 1e-6, "rate was {}", rate);
    }

    #[test]
    fn two_flow_rate_matches_closed_form() {
        let flows = two_flows(date(2022, 3, 14), 500, -2_500.0, 3_100.0);
        let rate = xirr(&flows, &SolverConfig::default()).unwrap();
        let expected = (3_100.0f64 / 2_500.0).powf(365.0 / 500.0) - 1.0;
        assert!((rate - expected).abs() < 1e-6);
        assert!((-2_500.0 + 3_100.0 / (1.0 + rate).powf(500.0 / 365.0)).abs() < 1e-6);
    }

    #[test]
    fn negative_return() {
        let flows = two_flows(date(2023, 1, 1), 365, -1_000.0, 900.0);
        let rate = xirr(&flows, &SolverConfig::default()).unwrap();
        assert!((rate + 0.10).abs() < 1e-6);
    }

    #[test]
    fn heavy_loss_stays_above_minus_one() {
        let flows = two_flows(date(2023, 1, 1), 180, -1_000.0, 500.0);
        let rate = xirr(&flows, &SolverConfig::default()).unwrap();
        assert!(rate > -0.76 && rate < -0.75, "rate was {}", rate);
        assert!(xnpv(rate, &flows).unwrap().abs() < 1e-6);
    }

    #[test]
    fn converges_from_different_guesses() {
        let flows = two_flows(date(2024, 1, 1), 200, -50_000.0, 52_000.0);

        let from_default = xirr(&flows, &SolverConfig::default()).unwrap();
        let config = SolverConfig {
            initial_guess: 0.05,
            ..SolverConfig::default()
        };
        let from_low = xirr(&flows, &config).unwrap();

        assert!(xnpv(from_default, &flows).unwrap().abs() < 1e-6);
        assert!(xnpv(from_low, &flows).unwrap().abs() < 1e-6);
        assert!((from_default - from_low).abs() < 1e-6);
    }

    #[test]
    fn same_input_same_result() {
        let flows = vec![
            flow(date(2021, 2, 1), -10_000.0),
            flow(date(2021, 8, 15), -5_000.0),
            flow(date(2022, 6, 30), 2_000.0),
            flow(date(2024, 10, 1), 17_250.0),
        ];
        let config = SolverConfig::default();
        let first = xirr(&flows, &config).unwrap();
        let second = xirr(&flows, &config).unwrap();
        assert!((first - second).abs() < 1e-12);
    }

    #[test]
    fn input_order_does_not_matter() {
        let mut flows = vec![
            flow(date(2020, 5, 4), -3_000.0),
            flow(date(2021, 1, 20), -1_500.0),
            flow(date(2023, 7, 7), 6_100.0),
        ];
        let config = SolverConfig::default();
        let forward = xirr(&flows, &config).unwrap();
        flows.reverse();
        let reversed = xirr(&flows, &config).unwrap();
        assert!((forward - reversed).abs() < 1e-6);
    }

    #[test]
    fn longer_horizon_lowers_the_rate() {
        let config = SolverConfig::default();
        let start = date(2023, 1, 1);
        let mut previous = f64::INFINITY;
        for days in &[90, 180, 365, 730, 1460] {
            let flows = two_flows(start, *days, -100_000.0, 110_000.0);
            let rate = xirr(&flows, &config).unwrap();
            assert!(rate < previous, "{} days gave {}", days, rate);
            previous = rate;
        }

        let two_years = xirr(&two_flows(start, 730, -100_000.0, 110_000.0), &config).unwrap();
        assert!((two_years - (1.1f64.sqrt() - 1.0)).abs() < 1e-6);
    }

    #[test]
    fn shifting_all_dates_keeps_the_rate() {
        let config = SolverConfig::default();
        let early = xirr(&two_flows(date(2019, 6, 1), 400, -7_000.0, 7_700.0), &config).unwrap();
        let late = xirr(&two_flows(date(2024, 2, 10), 400, -7_000.0, 7_700.0), &config).unwrap();
        assert!((early - late).abs() < 1e-9);
    }

    #[test]
    fn multiple_contributions_with_terminal_value() {
        let flows = vec![
            flow(date(2023, 1, 1), -1_000.0),
            flow(date(2023, 6, 1), -500.0),
            flow(date(2024, 1, 1), 1_700.0),
        ];
        let rate = xirr(&flows, &SolverConfig::default()).unwrap();
        assert!(rate > 0.10 && rate < 0.20);
        assert!(xnpv(rate, &flows).unwrap().abs() < 1e-6);
    }

    #[test]
    fn single_flow_is_invalid() {
        let flows = vec![flow(date(2023, 1, 1), -1_000.0)];
        assert!(matches!(
            xirr(&flows, &SolverConfig::default()),
            Err(XirrError::InvalidInput(_))
        ));
    }

    #[test]
    fn same_day_flows_are_invalid() {
        let flows = vec![flow(date(2023, 1, 1), -1_000.0), flow(date(2023, 1, 1), 1_100.0)];
        assert!(matches!(
            xirr(&flows, &SolverConfig::default()),
            Err(XirrError::InvalidInput(_))
        ));
    }

    #[test]
    fn zero_flows_are_invalid() {
        let flows = vec![flow(date(2023, 1, 1), 0.0), flow(date(2024, 1, 1), 0.0)];
        assert!(matches!(
            xirr(&flows, &SolverConfig::default()),
            Err(XirrError::InvalidInput(_))
        ));
        assert!(matches!(
            xirr(&[], &SolverConfig::default()),
            Err(XirrError::InvalidInput(_))
        ));
    }

    #[test]
    fn non_finite_amount_is_invalid() {
        let flows = vec![flow(date(2023, 1, 1), -1_000.0), flow(date(2024, 1, 1), f64::NAN)];
        assert!(matches!(
            xirr(&flows, &SolverConfig::default()),
            Err(XirrError::InvalidInput(_))
        ));
    }

    #[test]
    fn same_sign_flows_have_no_solution() {
        let outflows = vec![flow(date(2023, 1, 1), -1_000.0), flow(date(2024, 1, 1), -500.0)];
        assert!(matches!(
            xirr(&outflows, &SolverConfig::default()),
            Err(XirrError::NoSolution(_))
        ));

        let inflows = vec![flow(date(2023, 1, 1), 1_000.0), flow(date(2024, 1, 1), 0.0)];
        assert!(matches!(
            xirr(&inflows, &SolverConfig::default()),
            Err(XirrError::NoSolution(_))
        ));
    }

    #[test]
    fn sign_change_without_a_root_has_no_solution() {
        // NPV stays positive for every rate: the search runs out both ways.
        let flows = vec![
            flow(date(2020, 1, 1), 100.0),
            flow(date(2021, 1, 1), -1.0),
            flow(date(2022, 1, 1), 100.0),
        ];
        assert!(matches!(
            xirr(&flows, &SolverConfig::default()),
            Err(XirrError::NoSolution(_))
        ));
    }

    #[test]
    fn exhausted_budget_is_non_convergence() {
        let flows = two_flows(date(2023, 1, 1), 365, -100_000.0, 110_000.0);
        let config = SolverConfig {
            initial_guess: 0.5,
            max_iterations: 1,
            ..SolverConfig::default()
        };
        assert_eq!(xirr(&flows, &config), Err(XirrError::NonConvergence(1)));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let flows = two_flows(date(2023, 1, 1), 365, -100_000.0, 110_000.0);
        let config = SolverConfig {
            bracket_expansion_factor: 0.5,
            ..SolverConfig::default()
        };
        assert!(matches!(xirr(&flows, &config), Err(XirrError::InvalidInput(_))));
    }

    #[test]
    fn xnpv_rejects_rates_at_or_below_minus_one() {
        let flows = two_flows(date(2023, 1, 1), 365, -100.0, 110.0);
        assert!(xnpv(-1.0, &flows).is_err());
        assert!(xnpv(-1.5, &flows).is_err());
        assert!((xnpv(0.0, &flows).unwrap() - 10.0).abs() < 1e-9);
    }
}
