use chrono::NaiveDate;

use crate::core::{EventType, FinancialEvent, Scenario, YearlyData, summarize};

const RULE: &str = "========================================";

/// Plain-text scenario report: assumptions, planned events and final results.
pub fn render_report(scenario: &Scenario, years: &[YearlyData], generated_on: NaiveDate) -> String {
    let params = &scenario.params;
    let summary = summarize(params, years);
    let end_year = i64::from(params.start_year) + i64::from(params.duration_years);

    let mut lines = vec![
        "CAPITAL PROJECTION - SCENARIO REPORT".to_string(),
        format!("Generated on: {}", generated_on.format("%Y-%m-%d")),
        RULE.to_string(),
        String::new(),
    ];
    push_heading(&mut lines, "1. GOALS AND PARAMETERS");

    match summary.as_ref().and_then(|s| s.income_goal.as_ref()) {
        Some(goal) => {
            lines.push(format!(
                "- Target monthly income: {}",
                format_amount(goal.target_monthly_income)
            ));
            lines.push(match &goal.reached {
                Some(reached) => format!(
                    "- Estimated goal reached: year {} (in {} years)",
                    reached.label, reached.year
                ),
                None => format!(
                    "- Estimated goal reached: not within the simulated period ({} years)",
                    params.duration_years
                ),
            });
        }
        None => lines.push("- Target monthly income: not set".to_string()),
    }
    lines.push(String::new());

    lines.push(format!("- Start year: {}", params.start_year));
    lines.push(format!(
        "- Simulation length: {} years (ends in {end_year})",
        params.duration_years
    ));
    lines.push(format!(
        "- Initial capital: {}",
        format_amount(params.initial_capital)
    ));
    lines.push(format!(
        "- Monthly contribution: {} per month",
        format_amount(params.monthly_contribution)
    ));
    lines.push(if params.adjust_contribution_for_inflation {
        "  - Inflation indexing: yes (the contribution grows every year with inflation)".to_string()
    } else {
        "  - Inflation indexing: no (the contribution stays fixed in nominal terms)".to_string()
    });
    lines.push(format!(
        "- Expected gross annual return: {}%",
        params.annual_return_rate
    ));
    lines.push(format!(
        "- Expected inflation: {}% (erodes real purchasing power over time)",
        params.inflation_rate
    ));
    if params.is_tax_enabled {
        lines.push(format!("- Taxation: enabled (rate {}%)", params.tax_rate));
        lines.push(if params.tax_adjusted_for_inflation {
            "  - Tax method: real returns (only growth above inflation is taxed)".to_string()
        } else {
            "  - Tax method: nominal returns".to_string()
        });
    } else {
        lines.push("- Taxation: disabled (figures are gross of tax)".to_string());
    }
    lines.push(String::new());

    push_heading(&mut lines, "2. PLANNED EVENTS");
    if scenario.events.is_empty() {
        lines.push("No extra deposits, withdrawals or loans planned.".to_string());
    } else {
        let mut events: Vec<&FinancialEvent> = scenario.events.iter().collect();
        events.sort_by_key(|event| event.year);
        for event in events {
            describe_event(&mut lines, event, params.start_year, params.duration_years);
        }
    }
    lines.push(String::new());

    push_heading(&mut lines, &format!("3. PROJECTION RESULTS (YEAR {end_year})"));
    if let Some(summary) = &summary {
        lines.push(format!(
            "- Final portfolio value (nominal): {}",
            format_amount(summary.final_portfolio_value)
        ));
        lines.push(format!(
            "- Real portfolio value (net of inflation): {}",
            format_amount(summary.final_real_value)
        ));
        lines.push(format!(
            "- Total capital invested: {}",
            format_amount(summary.total_invested)
        ));
        lines.push(format!(
            "- Total net profit: {} (ROI: {:.2}%)",
            format_amount(summary.net_profit),
            summary.roi_percent
        ));
        if params.is_tax_enabled {
            lines.push(format!(
                "- Total estimated taxes: {}",
                format_amount(summary.total_tax)
            ));
        }
        lines.push(format!(
            "- Total withdrawals: {}",
            format_amount(summary.total_withdrawn)
        ));
        lines.push(String::new());
        lines.push("INFLATION IMPACT".to_string());
        lines.push(format!(
            "- Nominal value lost to inflation: -{}",
            format_amount(summary.inflation_loss)
        ));
    } else {
        lines.push("No projection data.".to_string());
    }

    lines.push(String::new());
    lines.push(RULE.to_string());
    lines.push(
        "NOTE: This projection assumes constant returns. Real markets are volatile.".to_string(),
    );

    let mut report = lines.join("\n");
    report.push('\n');
    report
}

fn push_heading(lines: &mut Vec<String>, title: &str) {
    lines.push(title.to_string());
    lines.push("-".repeat(title.chars().count()));
}

fn describe_event(lines: &mut Vec<String>, event: &FinancialEvent, start_year: i32, horizon: u32) {
    let calendar_year = i64::from(start_year) + i64::from(event.year);
    let kind = match event.kind {
        EventType::Deposit => "EXTRA DEPOSIT",
        EventType::Withdrawal => "WITHDRAWAL",
        EventType::Loan => "LOAN (paid out)",
        EventType::LeverageLoan => "LEVERAGE LOAN (reinvested)",
    };
    let note = event
        .description
        .as_deref()
        .filter(|text| !text.trim().is_empty())
        .map(|text| format!(" - {}", text.trim()))
        .unwrap_or_default();

    lines.push(format!(
        "[Year {calendar_year}] {kind}: {}{note}",
        format_amount(event.amount)
    ));

    let rate = event.loan_interest_rate.unwrap_or(0.0);
    let term = event.loan_duration_years.unwrap_or(0);
    match event.kind {
        EventType::Loan => lines.push(format!(
            "  - Loan terms: {rate}% interest over {term} years; installments are withdrawn from the portfolio."
        )),
        EventType::LeverageLoan => {
            lines.push(format!(
                "  - Leverage terms: {rate}% interest over {term} years."
            ));
            lines.push(
                "  - Installments are deducted from the monthly contribution first.".to_string(),
            );
        }
        EventType::Deposit | EventType::Withdrawal if event.is_recurring => {
            let last = event
                .recurring_end_year
                .filter(|&end| end > 0)
                .unwrap_or(horizon);
            lines.push(format!(
                "  - Frequency: every year from {calendar_year} to {}",
                i64::from(start_year) + i64::from(last)
            ));
        }
        EventType::Deposit | EventType::Withdrawal => {
            lines.push("  - Frequency: one-off".to_string());
        }
    }
}

/// Formats money with thousands separators and two decimals, e.g. `12,345.60`.
pub fn format_amount(value: f64) -> String {
    let cents = (value.abs() * 100.0).round();
    let whole = (cents / 100.0).trunc() as u64;
    let fraction = (cents % 100.0) as u64;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && cents > 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{fraction:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SimulationParams, project};

    fn report_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).expect("valid date")
    }

    fn sample_scenario() -> Scenario {
        Scenario {
            params: SimulationParams {
                start_year: 2025,
                initial_capital: 240_000.0,
                monthly_contribution: 500.0,
                adjust_contribution_for_inflation: false,
                annual_return_rate: 10.0,
                is_tax_enabled: true,
                tax_rate: 26.0,
                tax_adjusted_for_inflation: true,
                duration_years: 5,
                inflation_rate: 2.0,
                target_monthly_income: 1_000.0,
            },
            events: vec![
                FinancialEvent {
                    id: "loan".to_string(),
                    year: 3,
                    kind: EventType::Loan,
                    amount: 10_000.0,
                    description: Some("car".to_string()),
                    is_recurring: false,
                    recurring_end_year: None,
                    loan_interest_rate: Some(5.0),
                    loan_duration_years: Some(4),
                },
                FinancialEvent {
                    id: "gift".to_string(),
                    year: 1,
                    kind: EventType::Deposit,
                    amount: 1_500.0,
                    description: None,
                    is_recurring: true,
                    recurring_end_year: Some(2),
                    loan_interest_rate: None,
                    loan_duration_years: None,
                },
            ],
        }
    }

    #[test]
    fn format_amount_groups_thousands() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(999.999), "1,000.00");
        assert_eq!(format_amount(1_234_567.5), "1,234,567.50");
        assert_eq!(format_amount(-42_000.1), "-42,000.10");
        assert_eq!(format_amount(-0.001), "0.00");
    }

    #[test]
    fn report_lists_parameters_events_and_results() {
        let scenario = sample_scenario();
        let years = project(&scenario.params, &scenario.events).expect("valid projection");
        let report = render_report(&scenario, &years, report_date());

        assert!(report.starts_with("CAPITAL PROJECTION - SCENARIO REPORT\nGenerated on: 2025-01-15\n"));
        assert!(report.contains("- Target monthly income: 1,000.00"));
        assert!(report.contains("- Estimated goal reached: year 2026 (in 1 years)"));
        assert!(report.contains("- Simulation length: 5 years (ends in 2030)"));
        assert!(report.contains("- Taxation: enabled (rate 26%)"));
        assert!(report.contains("  - Tax method: real returns"));
        assert!(report.contains("3. PROJECTION RESULTS (YEAR 2030)"));
        assert!(report.contains("- Total estimated taxes: "));
        assert!(report.ends_with("Real markets are volatile.\n"));
    }

    #[test]
    fn section_underlines_match_heading_width() {
        let mut scenario = sample_scenario();
        scenario.params.start_year = 1999;
        scenario.params.duration_years = 100;
        let years = project(&scenario.params, &scenario.events).expect("valid projection");
        let report = render_report(&scenario, &years, report_date());

        let lines: Vec<&str> = report.lines().collect();
        for heading in [
            "1. GOALS AND PARAMETERS",
            "2. PLANNED EVENTS",
            "3. PROJECTION RESULTS (YEAR 2099)",
        ] {
            let at = lines
                .iter()
                .position(|line| *line == heading)
                .unwrap_or_else(|| panic!("missing heading {heading}"));
            assert_eq!(lines[at + 1], "-".repeat(heading.len()));
        }
    }

    #[test]
    fn report_sorts_events_by_year_and_describes_terms() {
        let scenario = sample_scenario();
        let years = project(&scenario.params, &scenario.events).expect("valid projection");
        let report = render_report(&scenario, &years, report_date());

        let deposit = report
            .find("[Year 2026] EXTRA DEPOSIT: 1,500.00")
            .expect("deposit line");
        let loan = report
            .find("[Year 2028] LOAN (paid out): 10,000.00 - car")
            .expect("loan line");
        assert!(deposit < loan);
        assert!(report.contains("  - Frequency: every year from 2026 to 2027"));
        assert!(report.contains("  - Loan terms: 5% interest over 4 years"));
    }

    #[test]
    fn report_without_events_or_target() {
        let mut scenario = sample_scenario();
        scenario.events.clear();
        scenario.params.target_monthly_income = 0.0;
        scenario.params.is_tax_enabled = false;
        let years = project(&scenario.params, &scenario.events).expect("valid projection");
        let report = render_report(&scenario, &years, report_date());

        assert!(report.contains("No extra deposits, withdrawals or loans planned."));
        assert!(report.contains("- Target monthly income: not set"));
        assert!(report.contains("- Taxation: disabled"));
        assert!(!report.contains("Total estimated taxes"));
    }

    #[test]
    fn report_flags_unreached_goal() {
        let mut scenario = sample_scenario();
        scenario.params.target_monthly_income = 1_000_000.0;
        let years = project(&scenario.params, &scenario.events).expect("valid projection");
        let report = render_report(&scenario, &years, report_date());

        assert!(report.contains("not within the simulated period (5 years)"));
    }
}
