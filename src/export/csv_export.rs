use std::io;

use super::ExportError;
use crate::core::YearlyData;

pub const CSV_HEADER: [&str; 8] = [
    "year",
    "label",
    "portfolioValue",
    "totalInvested",
    "totalWithdrawn",
    "yearlyProfit",
    "yearlyTax",
    "inflationAdjustedValue",
];

pub fn write_csv<W: io::Write>(years: &[YearlyData], sink: W) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(sink);
    writer.write_record(CSV_HEADER)?;
    for row in years {
        writer.write_record([
            row.year.to_string(),
            row.label.clone(),
            cents(row.portfolio_value),
            cents(row.total_invested),
            cents(row.total_withdrawn),
            cents(row.yearly_profit),
            cents(row.yearly_tax),
            cents(row.inflation_adjusted_value),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn to_csv_string(years: &[YearlyData]) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    write_csv(years, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

fn cents(value: f64) -> String {
    // Avoid printing "-0.00" for values that rounded to zero.
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{value:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EventType, FinancialEvent, SimulationParams, project};

    fn sample_params() -> SimulationParams {
        SimulationParams {
            start_year: 2030,
            initial_capital: 1_000.0,
            monthly_contribution: 100.0,
            adjust_contribution_for_inflation: false,
            annual_return_rate: 10.0,
            is_tax_enabled: true,
            tax_rate: 25.0,
            tax_adjusted_for_inflation: false,
            duration_years: 2,
            inflation_rate: 0.0,
            target_monthly_income: 0.0,
        }
    }

    #[test]
    fn csv_has_header_and_one_row_per_year() {
        let years = project(&sample_params(), &[]).expect("valid projection");
        let csv = to_csv_string(&years).expect("csv renders");

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "year,label,portfolioValue,totalInvested,totalWithdrawn,yearlyProfit,yearlyTax,inflationAdjustedValue"
        );
        for line in &lines {
            assert_eq!(line.split(',').count(), 8, "line {line}");
        }
    }

    #[test]
    fn csv_rows_use_two_decimal_places() {
        // Year 1: profit 100, tax 25, value 1000 + 75 + 1200 = 2275.
        let years = project(&sample_params(), &[]).expect("valid projection");
        let csv = to_csv_string(&years).expect("csv renders");

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[1], "0,2030,1000.00,1000.00,0.00,0.00,0.00,1000.00");
        assert_eq!(lines[2], "1,2031,2275.00,2200.00,0.00,100.00,25.00,2275.00");
    }

    #[test]
    fn csv_never_prints_negative_zero() {
        let mut params = sample_params();
        params.initial_capital = 100.0;
        params.monthly_contribution = 0.0;
        params.annual_return_rate = 0.0;
        let events = [FinancialEvent {
            id: "w".to_string(),
            year: 1,
            kind: EventType::Withdrawal,
            amount: 500.0,
            description: None,
            is_recurring: false,
            recurring_end_year: None,
            loan_interest_rate: None,
            loan_duration_years: None,
        }];

        let years = project(&params, &events).expect("valid projection");
        let csv = to_csv_string(&years).expect("csv renders");
        assert!(!csv.contains("-0.00"), "{csv}");
        assert!(csv.contains("1,2031,0.00,-400.00,500.00,0.00,0.00,0.00"));
    }
}
