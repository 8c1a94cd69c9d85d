use thiserror::Error;

use crate::external::demand_source::SourceError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },
    #[error("Degenerate series: {0}")]
    DegenerateSeries(String),
    #[error("Solver error: {0}")]
    Solver(String),
    #[error("Data source error: {0}")]
    Source(#[from] SourceError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[cfg(feature = "postgres")]
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

impl AppError {
    /// Errors a forecast run recovers from by switching to the seasonal baseline.
    pub fn is_recoverable_by_fallback(&self) -> bool {
        matches!(self, AppError::InsufficientData { .. } | AppError::Solver(_))
    }
}
