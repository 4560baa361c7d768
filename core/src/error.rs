use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid date format: '{input}'")]
    InvalidDateFormat { input: String },

    #[error("Unknown program '{0}'")]
    UnknownProgram(String),

    /// A join that must be 1:1 produced a different cardinality.
    /// Always aborts the whole cycle for the (program, period) being
    /// processed; a silent drop would corrupt downstream reporting.
    #[error("Inconsistent merge on {context}: expected {expected} rows, got {actual}")]
    InconsistentMerge {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Product {code} not found for program {program}")]
    ProductNotFound { code: i64, program: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type TrackResult<T> = Result<T, TrackError>;
