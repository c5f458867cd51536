use thiserror::Error;

/// Reasons a projection refuses to run. Each one rejects the whole call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("duration must be at least 1 year, got {years}")]
    InvalidDuration { years: u32 },

    #[error("parameter `{name}` must be a finite number")]
    NonFiniteParameter { name: &'static str },

    #[error("inflation rate must be greater than -100%, got {rate}%")]
    InvalidInflationRate { rate: f64 },

    #[error("event `{id}`: year must be >= 1, got {year}")]
    InvalidEventYear { id: String, year: u32 },

    #[error("event `{id}`: amount must be a positive number, got {amount}")]
    InvalidEventAmount { id: String, amount: f64 },

    #[error("event `{id}`: loans require both an interest rate and a duration")]
    MissingLoanTerms { id: String },

    #[error("event `{id}`: loan duration must be at least 1 year, got {years}")]
    InvalidLoanDuration { id: String, years: i32 },

    #[error("event `{id}`: loan interest rate must be finite and greater than -100%, got {rate}%")]
    InvalidLoanRate { id: String, rate: f64 },

    #[error("event `{id}`: loan terms give an unusable annual payment of {payment}")]
    InvalidLoanPayment { id: String, payment: f64 },

    #[error("year {year}: `{name}` is no longer a finite number")]
    NonFiniteValue { year: u32, name: &'static str },
}
