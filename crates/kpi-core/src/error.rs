//! Error types for kpi-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in kpi-core
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// Integer code with no entry in a lookup table
    #[error("Unknown {table} code: {code}")]
    UnknownCode { table: &'static str, code: i32 },

    /// Text with no entry in a lookup table
    #[error("Unknown {table}: '{text}'")]
    UnknownTranslation { table: &'static str, text: String },

    /// KPI definition failed validation
    #[error("Invalid KPI '{name}': {reason}")]
    InvalidKpi { name: String, reason: String },

    /// Calendar arithmetic left the representable date range
    #[error("Date out of range")]
    DateOutOfRange,
}
