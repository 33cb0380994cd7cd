//! Prelude module - common imports for kpi-tracker users
//!
//! ```rust
//! use kpi_tracker::prelude::*;
//! ```

pub use crate::{
    // Consolidation
    consolidate,
    consolidate_with_options,
    Bucket,
    Consolidation,
    ConsolidationError,
    ConsolidationOptions,
    ConsolidationStats,
    ConsolidationType,

    // Error types
    EvalError,
    FormulaError,

    // Formula engine
    Formula,
    FormulaOptions,
    FrequencyType,

    // Data model
    Kpi,
    KpiValue,
    ResolveFn,
    Target,
    TargetMarginType,
    TrendType,
};
