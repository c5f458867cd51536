mod engine;
mod error;
mod summary;
mod types;

pub use engine::{annuity_payment, project, project_scenario};
pub use error::ProjectionError;
pub use summary::{monthly_income, summarize};
pub use types::{
    EventType, FinancialEvent, IncomeGoalProgress, IncomeMilestone, ProjectionSummary, Scenario,
    SimulationParams, YearlyData,
};
