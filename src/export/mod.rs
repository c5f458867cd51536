//! Renderers for finished projections: the 8-column CSV sheet and the plain-text report.

mod csv_export;
mod report;

use thiserror::Error;

pub use csv_export::{CSV_HEADER, to_csv_string, write_csv};
pub use report::{format_amount, render_report};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),

    #[error("export produced invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
