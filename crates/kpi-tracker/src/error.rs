//! Error types for kpi-tracker

use kpi_formula::FormulaError;
use thiserror::Error;

/// Result type alias using [`ConsolidationError`]
pub type ConsolidationResult<T> = std::result::Result<T, ConsolidationError>;

/// Errors that abort a consolidation run
#[derive(Debug, Error)]
pub enum ConsolidationError {
    /// Two KPIs share a name
    #[error("Duplicate KPI: '{0}'")]
    DuplicateKpi(String),

    /// A formula references a KPI that is not part of the run
    #[error("KPI '{kpi}' references unknown KPI '{reference}'")]
    UnknownKpi { kpi: String, reference: String },

    /// Formula KPIs reference each other in a loop
    #[error("Circular reference between KPIs: {}", .0.join(" -> "))]
    CircularReference(Vec<String>),

    /// A formula failed to compile, or failed to evaluate with `fail_on_error` set
    #[error("Formula error in KPI '{kpi}': {source}")]
    Formula {
        kpi: String,
        #[source]
        source: FormulaError,
    },

    /// Invalid definition or calendar arithmetic out of range
    #[error(transparent)]
    Core(#[from] kpi_core::Error),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
