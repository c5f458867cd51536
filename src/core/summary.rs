use super::engine::round_cents;
use super::types::{
    IncomeGoalProgress, IncomeMilestone, ProjectionSummary, SimulationParams, YearlyData,
};

/// Headline figures for a finished projection. Returns `None` for an empty run.
pub fn summarize(params: &SimulationParams, years: &[YearlyData]) -> Option<ProjectionSummary> {
    let last = years.last()?;

    let net_profit = round_cents(last.portfolio_value - last.total_invested);
    let roi_percent = if last.total_invested > 0.0 {
        net_profit / last.total_invested * 100.0
    } else {
        0.0
    };
    let total_tax: f64 = years.iter().map(|row| row.yearly_tax).sum();

    Some(ProjectionSummary {
        final_label: last.label.clone(),
        final_portfolio_value: last.portfolio_value,
        final_real_value: last.inflation_adjusted_value,
        total_invested: last.total_invested,
        total_withdrawn: last.total_withdrawn,
        net_profit,
        roi_percent,
        total_tax: round_cents(total_tax),
        inflation_loss: round_cents(last.portfolio_value - last.inflation_adjusted_value),
        income_goal: income_goal_progress(params.target_monthly_income, years),
    })
}

/// Passive income is the year's after-tax growth spread over twelve months.
pub fn monthly_income(row: &YearlyData) -> f64 {
    row.net_growth / 12.0
}

fn income_goal_progress(target: f64, years: &[YearlyData]) -> Option<IncomeGoalProgress> {
    if target <= 0.0 || target.is_nan() {
        return None;
    }

    let reached = years
        .iter()
        .filter(|row| row.year > 0)
        .find(|row| monthly_income(row) >= target)
        .map(|row| IncomeMilestone {
            year: row.year,
            label: row.label.clone(),
            monthly_income: round_cents(monthly_income(row)),
        });

    let max_monthly_income = years
        .iter()
        .map(monthly_income)
        .fold(f64::NEG_INFINITY, f64::max)
        .max(0.0);

    Some(IncomeGoalProgress {
        target_monthly_income: target,
        reached,
        max_monthly_income: round_cents(max_monthly_income),
        progress_percent: (max_monthly_income / target * 100.0).min(100.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::project;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn growth_params() -> SimulationParams {
        SimulationParams {
            start_year: 2024,
            initial_capital: 100_000.0,
            monthly_contribution: 0.0,
            adjust_contribution_for_inflation: false,
            annual_return_rate: 5.0,
            is_tax_enabled: false,
            tax_rate: 26.0,
            tax_adjusted_for_inflation: false,
            duration_years: 3,
            inflation_rate: 0.0,
            target_monthly_income: 0.0,
        }
    }

    #[test]
    fn summary_reports_final_values_and_roi() {
        let params = growth_params();
        let years = project(&params, &[]).expect("valid projection");

        let summary = summarize(&params, &years).expect("non-empty projection");
        assert_eq!(summary.final_label, "2027");
        assert_close(summary.final_portfolio_value, 115_762.5, 1e-6);
        assert_close(summary.total_invested, 100_000.0, 1e-6);
        assert_close(summary.net_profit, 15_762.5, 1e-6);
        assert_close(summary.roi_percent, 15.7625, 1e-9);
        assert_close(summary.total_tax, 0.0, 1e-9);
        assert_close(summary.inflation_loss, 0.0, 1e-9);
        assert!(summary.income_goal.is_none());
    }

    #[test]
    fn summary_sums_tax_across_years() {
        let mut params = growth_params();
        params.is_tax_enabled = true;
        params.tax_rate = 20.0;
        params.duration_years = 2;

        // Year 1: 5000 profit, 1000 tax. Year 2: 104000 * 5% = 5200 profit, 1040 tax.
        let years = project(&params, &[]).expect("valid projection");
        let summary = summarize(&params, &years).expect("non-empty projection");
        assert_close(summary.total_tax, 2_040.0, 1e-9);
    }

    #[test]
    fn income_goal_reports_first_year_reaching_target() {
        let mut params = growth_params();
        params.initial_capital = 240_000.0;
        params.annual_return_rate = 10.0;
        params.target_monthly_income = 2_000.0;

        let years = project(&params, &[]).expect("valid projection");
        let goal = summarize(&params, &years)
            .and_then(|summary| summary.income_goal)
            .expect("target is set");

        let reached = goal.reached.expect("goal reached in first year");
        assert_eq!(reached.year, 1);
        assert_eq!(reached.label, "2025");
        assert_close(reached.monthly_income, 2_000.0, 1e-9);
        assert_close(goal.progress_percent, 100.0, 1e-9);
    }

    #[test]
    fn income_goal_reports_partial_progress_when_not_reached() {
        let mut params = growth_params();
        params.target_monthly_income = 5_000.0;

        // Best year is year 3: 110250 * 5% / 12 = 459.375 per month.
        let years = project(&params, &[]).expect("valid projection");
        let goal = summarize(&params, &years)
            .and_then(|summary| summary.income_goal)
            .expect("target is set");

        assert!(goal.reached.is_none());
        assert_close(goal.max_monthly_income, 459.38, 1e-9);
        assert_close(goal.progress_percent, 9.1875, 1e-3);
    }

    #[test]
    fn income_goal_never_counts_losing_years() {
        let mut params = growth_params();
        params.annual_return_rate = -5.0;
        params.target_monthly_income = 1.0;

        let years = project(&params, &[]).expect("valid projection");
        let goal = summarize(&params, &years)
            .and_then(|summary| summary.income_goal)
            .expect("target is set");

        assert!(goal.reached.is_none());
        assert_close(goal.max_monthly_income, 0.0, 1e-9);
        assert_close(goal.progress_percent, 0.0, 1e-9);
    }

    #[test]
    fn roi_is_zero_without_invested_capital() {
        let mut params = growth_params();
        params.initial_capital = 0.0;
        let years = project(&params, &[]).expect("valid projection");

        let summary = summarize(&params, &years).expect("non-empty projection");
        assert_close(summary.roi_percent, 0.0, 1e-12);
    }

    #[test]
    fn empty_projection_has_no_summary() {
        assert!(summarize(&growth_params(), &[]).is_none());
    }
}
