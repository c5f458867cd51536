use serde::{Deserialize, Serialize};

/// Immutable assumptions for a single projection run. Rates are percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationParams {
    pub start_year: i32,
    pub initial_capital: f64,
    pub monthly_contribution: f64,
    pub adjust_contribution_for_inflation: bool,
    pub annual_return_rate: f64,
    pub is_tax_enabled: bool,
    pub tax_rate: f64,
    pub tax_adjusted_for_inflation: bool,
    pub duration_years: u32,
    pub inflation_rate: f64,
    pub target_monthly_income: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Deposit,
    Withdrawal,
    Loan,
    LeverageLoan,
}

impl EventType {
    pub fn is_loan(self) -> bool {
        matches!(self, EventType::Loan | EventType::LeverageLoan)
    }
}

/// A user-defined cash event. `year` is 1-based relative to the start year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialEvent {
    pub id: String,
    pub year: u32,
    #[serde(rename = "type")]
    pub kind: EventType,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_end_year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_interest_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_duration_years: Option<i32>,
}

/// End-of-year snapshot. Monetary fields are rounded to cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyData {
    pub year: u32,
    pub label: String,
    pub portfolio_value: f64,
    pub total_invested: f64,
    pub total_withdrawn: f64,
    pub yearly_profit: f64,
    pub yearly_tax: f64,
    pub yearly_real_tax: f64,
    pub net_growth: f64,
    pub inflation_adjusted_value: f64,
    pub total_inflation_loss: f64,
}

/// Parameters plus events, as saved to and loaded from scenario files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub params: SimulationParams,
    #[serde(default)]
    pub events: Vec<FinancialEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeMilestone {
    pub year: u32,
    pub label: String,
    pub monthly_income: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeGoalProgress {
    pub target_monthly_income: f64,
    pub reached: Option<IncomeMilestone>,
    pub max_monthly_income: f64,
    pub progress_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSummary {
    pub final_label: String,
    pub final_portfolio_value: f64,
    pub final_real_value: f64,
    pub total_invested: f64,
    pub total_withdrawn: f64,
    pub net_profit: f64,
    pub roi_percent: f64,
    pub total_tax: f64,
    pub inflation_loss: f64,
    pub income_goal: Option<IncomeGoalProgress>,
}
