// 📈 Projections - compound interest and the "First Million" tracker
//
// Rates are decimal fractions (0.10 = 10% a year).
// Monthly simulations deposit first, then apply that month's interest.

use crate::error::{DashboardError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ANNUAL_RETURN: f64 = 0.10;
pub const DEFAULT_TARGET: f64 = 1_000_000.0;

/// Simulations give up after 100 years
pub const MAX_SIMULATION_MONTHS: u32 = 1200;

const MIN_YEARS: u32 = 5;
const MAX_YEARS: u32 = 40;
const YEAR_POINTS: usize = 7;
const LADDER_SIZE: usize = 10;

// ============================================================================
// HORIZONS
// ============================================================================

/// Months in a horizon of `period` `unit`s, rejecting anything past `MAX_SIMULATION_MONTHS`
pub fn horizon_months(period: u32, unit: PeriodUnit) -> Result<u32> {
    let months = match unit {
        PeriodUnit::Years => period.checked_mul(12),
        PeriodUnit::Months => Some(period),
    };
    match months {
        Some(months) if months <= MAX_SIMULATION_MONTHS => Ok(months),
        _ => Err(DashboardError::validation(format!(
            "Horizon must be at most {} years",
            MAX_SIMULATION_MONTHS / 12
        ))),
    }
}

// ============================================================================
// CLOSED-FORM FORMULAS
// ============================================================================

/// Future value of an initial amount (compounded yearly) plus monthly contributions
/// (compounded monthly)
pub fn future_value(initial: f64, monthly: f64, years: u32, annual_return: f64) -> f64 {
    let years = f64::from(years);
    let months = years * 12.0;
    let monthly_rate = annual_return / 12.0;

    let initial_fv = initial * (1.0 + annual_return).powf(years);
    let contribution_fv = if monthly_rate > 0.0 {
        monthly * ((1.0 + monthly_rate).powf(months) - 1.0) / monthly_rate
    } else {
        monthly * months
    };

    initial_fv + contribution_fv
}

/// Unrounded monthly payment that reaches `desired` in `years`
fn required_payment(initial: f64, desired: f64, years: u32, annual_return: f64) -> Result<f64> {
    if years == 0 {
        return Err(DashboardError::validation("Years must be at least 1"));
    }
    let months = f64::from(horizon_months(years, PeriodUnit::Years)?);
    let monthly_rate = annual_return / 12.0;

    let remaining = desired - initial * (1.0 + annual_return).powf(f64::from(years));
    let payment = if monthly_rate > 0.0 {
        remaining * monthly_rate / ((1.0 + monthly_rate).powf(months) - 1.0)
    } else {
        remaining / months
    };
    Ok(payment)
}

/// Monthly contribution needed to reach `desired`, rounded up to the next 100
/// (0 when the initial amount already gets there)
pub fn minimum_contribution(
    initial: f64,
    desired: f64,
    years: u32,
    annual_return: f64,
) -> Result<f64> {
    let payment = required_payment(initial, desired, years, annual_return)?;
    Ok(round_up_to_hundred(payment).max(0.0))
}

fn round_up_to_hundred(value: f64) -> f64 {
    (value / 100.0).ceil() * 100.0
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// PROJECTION TABLE
// ============================================================================

/// `count` contribution amounts from 1% of monthly income up to `minimum`
pub fn contribution_ladder(annual_income: f64, minimum: f64, count: usize) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    if count == 1 {
        return vec![round_cents(minimum)];
    }

    let base = round_up_to_hundred(annual_income / 12.0 * 0.01);
    let steps = (count - 1) as f64;

    if minimum <= base || base <= 0.0 {
        let step = (minimum - base) / steps;
        (0..count)
            .map(|i| round_cents(base + step * i as f64))
            .collect()
    } else {
        let ratio = (minimum / base).powf(1.0 / steps);
        (0..count)
            .map(|i| round_cents(base * ratio.powi(i as i32)))
            .collect()
    }
}

/// Year horizons worth showing for these inputs
///
/// Finds the fewest years (5..=40) that reach the goal when investing half of monthly
/// income, then spreads 7 distinct points around it.
pub fn year_ranges(initial: f64, desired: f64, monthly_income: f64, annual_return: f64) -> Vec<u32> {
    let max_monthly = monthly_income * 0.5;

    let (mut lo, mut hi) = (MIN_YEARS, MAX_YEARS);
    while lo < hi {
        let mid = (lo + hi) / 2;
        if future_value(initial, max_monthly, mid, annual_return) >= desired {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    let needed = lo;

    let min_range = MIN_YEARS.max(needed.saturating_sub(5));
    let max_range = MAX_YEARS.min(needed + 20);
    let step = ((max_range - min_range) as usize / (YEAR_POINTS - 1)).max(1);

    let mut years: Vec<u32> = (min_range..=max_range).step_by(step).collect();

    while years.len() > YEAR_POINTS {
        let idx = years.len() / 2;
        years.remove(idx);
    }

    while years.len() < YEAR_POINTS {
        let widest = years
            .windows(2)
            .enumerate()
            .map(|(i, w)| (w[1] - w[0], i))
            .max();
        match widest {
            Some((gap, idx)) if gap >= 2 => years.insert(idx + 1, years[idx] + gap / 2),
            _ => break,
        }
    }

    years.sort_unstable();
    years
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRow {
    pub contribution: f64,
    /// (years, future value)
    pub values: Vec<(u32, f64)>,
}

pub fn projection_table(
    initial: f64,
    contributions: &[f64],
    years: &[u32],
    annual_return: f64,
) -> Vec<ProjectionRow> {
    contributions
        .iter()
        .map(|&contribution| ProjectionRow {
            contribution,
            values: years
                .iter()
                .map(|&y| (y, future_value(initial, contribution, y, annual_return)))
                .collect(),
        })
        .collect()
}

// ============================================================================
// FIRST MILLION
// ============================================================================

/// Inputs of the First Million calculator (persisted between sessions)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirstMillionConfig {
    pub initial_amount: f64,
    pub desired_amount: f64,
    pub annual_income: f64,
    pub monthly_income: f64,
}

impl FirstMillionConfig {
    pub fn new(initial_amount: f64, desired_amount: f64, annual_income: f64) -> Result<Self> {
        for (name, value) in [
            ("Initial amount", initial_amount),
            ("Desired amount", desired_amount),
            ("Annual income", annual_income),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(DashboardError::validation(format!(
                    "{} must be positive",
                    name
                )));
            }
        }
        if desired_amount <= initial_amount {
            return Err(DashboardError::validation(
                "Desired amount must be greater than the initial amount",
            ));
        }
        Ok(FirstMillionConfig {
            initial_amount,
            desired_amount,
            annual_income,
            monthly_income: annual_income / 12.0,
        })
    }
}

/// Everything the First Million page shows for one set of inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirstMillionPlan {
    pub config: FirstMillionConfig,
    pub annual_return: f64,
    pub years: Vec<u32>,
    /// Minimum contribution for the shortest horizon in `years`
    pub minimum_contribution: f64,
    pub table: Vec<ProjectionRow>,
}

pub fn first_million_plan(config: &FirstMillionConfig, annual_return: f64) -> Result<FirstMillionPlan> {
    let years = year_ranges(
        config.initial_amount,
        config.desired_amount,
        config.monthly_income,
        annual_return,
    );
    let shortest = years.first().copied().unwrap_or(MIN_YEARS);
    let minimum = minimum_contribution(
        config.initial_amount,
        config.desired_amount,
        shortest,
        annual_return,
    )?;
    let ladder = contribution_ladder(config.annual_income, minimum, LADDER_SIZE);
    let table = projection_table(config.initial_amount, &ladder, &years, annual_return);

    Ok(FirstMillionPlan {
        config: config.clone(),
        annual_return,
        years,
        minimum_contribution: minimum,
        table,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalTimeline {
    pub years: u32,
    pub months: u32,
    pub total_months: u32,
    pub final_amount: f64,
    pub total_invested: f64,
    pub total_interest: f64,
}

/// How long a fixed monthly investment takes to reach `goal`
pub fn time_to_goal(initial: f64, monthly: f64, annual_return: f64, goal: f64) -> Option<GoalTimeline> {
    let monthly_rate = annual_return / 12.0;
    let mut current = initial;
    let mut total_months = 0u32;

    while current < goal {
        current += monthly;
        current += current * monthly_rate;
        total_months += 1;

        if total_months > MAX_SIMULATION_MONTHS {
            return None;
        }
    }

    let total_invested = initial + monthly * total_months as f64;
    Some(GoalTimeline {
        years: total_months / 12,
        months: total_months % 12,
        total_months,
        final_amount: current,
        total_invested,
        total_interest: current - total_invested,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RequiredInvestment {
    pub monthly_payment: f64,
    pub final_amount: f64,
    pub total_invested: f64,
    pub total_interest: f64,
}

/// Monthly investment needed to reach `goal` in `years`, with the simulated outcome
pub fn required_monthly_investment(
    initial: f64,
    years: u32,
    annual_return: f64,
    goal: f64,
) -> Result<RequiredInvestment> {
    let monthly_payment = required_payment(initial, goal, years, annual_return)?;
    let monthly_rate = annual_return / 12.0;
    let months = horizon_months(years, PeriodUnit::Years)?;

    let mut current = initial;
    for _ in 0..months {
        current += monthly_payment;
        current += current * monthly_rate;
    }

    let total_invested = initial + monthly_payment * months as f64;
    Ok(RequiredInvestment {
        monthly_payment,
        final_amount: current,
        total_invested,
        total_interest: current - total_invested,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub month: u32,
    pub total_amount: f64,
    pub total_invested: f64,
    pub total_returns: f64,
    pub monthly_return: f64,
}

/// Month-by-month growth, starting with a month 0 row
pub fn investment_timeline(
    initial: f64,
    monthly: f64,
    years: u32,
    annual_return: f64,
) -> Result<Vec<TimelinePoint>> {
    let total_months = horizon_months(years, PeriodUnit::Years)?;
    let monthly_rate = annual_return / 12.0;
    let mut points = Vec::with_capacity(total_months as usize + 1);
    points.push(TimelinePoint {
        month: 0,
        total_amount: initial,
        total_invested: initial,
        total_returns: 0.0,
        monthly_return: 0.0,
    });

    let mut current = initial;
    for month in 1..=total_months {
        current += monthly;
        let interest = current * monthly_rate;
        current += interest;

        let total_invested = initial + monthly * month as f64;
        points.push(TimelinePoint {
            month,
            total_amount: current,
            total_invested,
            total_returns: current - total_invested,
            monthly_return: interest,
        });
    }
    Ok(points)
}

// ============================================================================
// COMPOUND INTEREST
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateBasis {
    Annual,
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodUnit {
    Years,
    Months,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompoundRow {
    pub month: u32,
    pub total_invested: f64,
    pub interest: f64,
    pub total_amount: f64,
}

pub fn compound_interest(
    initial: f64,
    rate: f64,
    period: u32,
    monthly: f64,
    rate_basis: RateBasis,
    period_unit: PeriodUnit,
) -> Result<Vec<CompoundRow>> {
    let monthly_rate = match rate_basis {
        RateBasis::Annual => rate / 12.0,
        RateBasis::Monthly => rate,
    };
    let total_months = horizon_months(period, period_unit)?;

    let mut current = initial;
    let mut invested = initial;
    Ok((1..=total_months)
        .map(|month| {
            current += monthly;
            invested += monthly;
            current += current * monthly_rate;
            CompoundRow {
                month,
                total_invested: invested,
                interest: current - invested,
                total_amount: current,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn test_future_value_zero_rate() {
        assert_eq!(future_value(1000.0, 100.0, 2, 0.0), 3400.0);
    }

    #[test]
    fn test_future_value_initial_only() {
        // 10,000 at 10% for 3 years = 13,310
        assert!(approx(future_value(10_000.0, 0.0, 3, 0.10), 13_310.0, 1e-6));
    }

    #[test]
    fn test_minimum_contribution_rounds_up() {
        let min = minimum_contribution(0.0, 1_000_000.0, 10, 0.10).unwrap();
        assert_eq!(min, 4900.0);
        assert!(future_value(0.0, min, 10, 0.10) >= 1_000_000.0);
    }

    #[test]
    fn test_minimum_contribution_when_already_reached() {
        let min = minimum_contribution(2_000_000.0, 1_000_000.0, 10, 0.10).unwrap();
        assert_eq!(min, 0.0);
    }

    #[test]
    fn test_minimum_contribution_zero_years() {
        assert!(minimum_contribution(0.0, 1_000.0, 0, 0.10).is_err());
    }

    #[test]
    fn test_contribution_ladder_geometric() {
        let ladder = contribution_ladder(120_000.0, 4900.0, 10);
        assert_eq!(ladder.len(), 10);
        assert_eq!(ladder[0], 100.0);
        assert!(approx(ladder[9], 4900.0, 0.01));
        assert!(ladder.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_contribution_ladder_arithmetic_when_minimum_is_small() {
        let ladder = contribution_ladder(120_000.0, 10.0, 10);
        assert_eq!(ladder[0], 100.0);
        assert_eq!(ladder[9], 10.0);
        assert_eq!(ladder[1], 90.0);
    }

    #[test]
    fn test_contribution_ladder_without_income() {
        let ladder = contribution_ladder(0.0, 900.0, 10);
        assert_eq!(ladder[0], 0.0);
        assert_eq!(ladder[9], 900.0);
    }

    #[test]
    fn test_year_ranges_spread() {
        let years = year_ranges(0.0, 1_000_000.0, 10_000.0, 0.10);
        assert_eq!(years, vec![5, 9, 13, 17, 21, 25, 29]);
    }

    #[test]
    fn test_year_ranges_near_upper_bound_has_no_duplicates() {
        // Unreachable goal pins the search at 40 years
        let years = year_ranges(0.0, 1e12, 1_000.0, 0.10);
        let mut deduped = years.clone();
        deduped.dedup();
        assert_eq!(years, deduped);
        assert_eq!(*years.first().unwrap(), 35);
        assert_eq!(*years.last().unwrap(), 40);
    }

    #[test]
    fn test_projection_table_shape() {
        let table = projection_table(1000.0, &[100.0, 200.0], &[5, 10], 0.10);
        assert_eq!(table.len(), 2);
        assert_eq!(table[1].values.len(), 2);
        assert_eq!(table[1].values[0].0, 5);
        assert!(table[1].values[1].1 > table[0].values[1].1);
    }

    #[test]
    fn test_time_to_goal_without_interest() {
        let timeline = time_to_goal(0.0, 100.0, 0.0, 1200.0).unwrap();
        assert_eq!(timeline.total_months, 12);
        assert_eq!(timeline.years, 1);
        assert_eq!(timeline.months, 0);
        assert_eq!(timeline.total_invested, 1200.0);
        assert_eq!(timeline.total_interest, 0.0);
    }

    #[test]
    fn test_time_to_goal_already_reached() {
        let timeline = time_to_goal(5000.0, 0.0, 0.10, 1000.0).unwrap();
        assert_eq!(timeline.total_months, 0);
    }

    #[test]
    fn test_time_to_goal_unreachable() {
        assert!(time_to_goal(0.0, 0.0, 0.0, 1.0).is_none());
    }

    #[test]
    fn test_required_monthly_investment_reaches_goal() {
        let required = required_monthly_investment(0.0, 10, 0.10, 1_000_000.0).unwrap();
        assert!(approx(required.monthly_payment, 4881.74, 0.05));
        // Deposit-then-interest earns one extra month of interest per payment
        assert!(required.final_amount >= 1_000_000.0);
        assert!(approx(
            required.total_interest,
            required.final_amount - required.total_invested,
            1e-6
        ));
    }

    #[test]
    fn test_investment_timeline() {
        let points = investment_timeline(1000.0, 100.0, 1, 0.12).unwrap();
        assert_eq!(points.len(), 13);
        assert_eq!(points[0].total_amount, 1000.0);
        assert_eq!(points[0].monthly_return, 0.0);

        assert!(approx(points[1].total_amount, 1111.0, 1e-9));
        assert!(approx(points[1].monthly_return, 11.0, 1e-9));
        assert_eq!(points[12].total_invested, 2200.0);
    }

    #[test]
    fn test_compound_interest_annual_rate_years() {
        let rows = compound_interest(1000.0, 0.12, 1, 0.0, RateBasis::Annual, PeriodUnit::Years).unwrap();
        assert_eq!(rows.len(), 12);
        assert!(approx(rows[0].total_amount, 1010.0, 1e-9));
        assert!(approx(rows[11].total_amount, 1000.0 * 1.01f64.powi(12), 1e-9));
        assert_eq!(rows[11].total_invested, 1000.0);
    }

    #[test]
    fn test_compound_interest_monthly_rate_months() {
        let rows = compound_interest(0.0, 0.0, 6, 50.0, RateBasis::Monthly, PeriodUnit::Months).unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[5].total_amount, 300.0);
        assert_eq!(rows[5].interest, 0.0);
    }

    #[test]
    fn test_horizon_months_bounds() {
        assert_eq!(horizon_months(100, PeriodUnit::Years).unwrap(), MAX_SIMULATION_MONTHS);
        assert_eq!(horizon_months(1200, PeriodUnit::Months).unwrap(), 1200);
        assert!(horizon_months(101, PeriodUnit::Years).is_err());
        assert!(horizon_months(1201, PeriodUnit::Months).is_err());
        assert!(horizon_months(u32::MAX, PeriodUnit::Years).is_err());
    }

    #[test]
    fn test_huge_horizons_are_rejected() {
        assert!(matches!(
            investment_timeline(0.0, 100.0, 400_000_000, 0.10),
            Err(DashboardError::Validation(_))
        ));
        assert!(matches!(
            compound_interest(0.0, 0.10, 400_000_000, 100.0, RateBasis::Annual, PeriodUnit::Years),
            Err(DashboardError::Validation(_))
        ));
        assert!(matches!(
            required_monthly_investment(0.0, 400_000_000, 0.10, 1_000_000.0),
            Err(DashboardError::Validation(_))
        ));
        assert!(minimum_contribution(0.0, 1_000_000.0, 400_000_000, 0.10).is_err());
    }

    #[test]
    fn test_future_value_long_horizon_stays_positive() {
        let value = future_value(0.0, 100.0, 200_000_000, 0.0);
        assert_eq!(value, 100.0 * 200_000_000.0 * 12.0);
    }

    #[test]
    fn test_first_million_config_validation() {
        assert!(FirstMillionConfig::new(0.0, 1_000_000.0, 120_000.0).is_ok());
        assert!(FirstMillionConfig::new(2_000.0, 1_000.0, 120_000.0).is_err());
        assert!(FirstMillionConfig::new(-1.0, 1_000.0, 120_000.0).is_err());

        let config = FirstMillionConfig::new(0.0, 1_000_000.0, 120_000.0).unwrap();
        assert_eq!(config.monthly_income, 10_000.0);
    }

    #[test]
    fn test_first_million_plan() {
        let config = FirstMillionConfig::new(0.0, 1_000_000.0, 120_000.0).unwrap();
        let plan = first_million_plan(&config, 0.10).unwrap();

        assert_eq!(plan.years.len(), 7);
        assert_eq!(plan.table.len(), 10);
        assert_eq!(plan.table[0].values.len(), 7);
        // Shortest horizon is 5 years
        assert_eq!(
            plan.minimum_contribution,
            minimum_contribution(0.0, 1_000_000.0, 5, 0.10).unwrap()
        );
    }
}
