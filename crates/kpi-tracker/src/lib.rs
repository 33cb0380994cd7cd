//! # kpi-tracker
//!
//! Track key performance indicators over time.
//!
//! ## Features
//!
//! - Lookup tables for frequencies, consolidation modes, targets and trends
//! - Calendar arithmetic on frequency buckets
//! - Consolidation of raw observations into buckets (mean, weighted, sum, min, max)
//! - KPIs computed by formula from other KPIs, evaluated in dependency order
//!
//! ## Example
//!
//! ```rust
//! use kpi_tracker::prelude::*;
//!
//! let mut formula = Formula::new("SUM(\"north\", \"south\") / 2").unwrap();
//! let ctx = ResolveFn(|key: &str| match key {
//!     "\"north\"" => Some(30.0),
//!     "\"south\"" => Some(10.0),
//!     _ => None,
//! });
//! assert_eq!(formula.evaluate(Some(&ctx)).unwrap(), 20.0);
//! ```

pub mod consolidation;
pub mod error;
pub mod prelude;

// Re-export consolidation types
pub use consolidation::{
    consolidate, consolidate_with_options, Bucket, Consolidation, ConsolidationOptions,
    ConsolidationStats,
};
pub use error::{ConsolidationError, ConsolidationResult};

// Re-export core types
pub use kpi_core::{
    date_range, is_frequency_type, next_date, round_down, round_up, ConsolidationType, DateRange,
    Error, FrequencyType, Kpi, KpiValue, Result, Target, TargetMargin, TargetMarginType,
    TargetType, TrendType,
};

// Re-export formula engine
pub use kpi_formula::{
    evaluate, evaluate_with_registry, to_postfix, to_postfix_with_options, Arity,
    DependencyGraph, EvalError, EvaluationContext, Formula, FormulaError, FormulaOptions,
    FormulaResult, FunctionRegistry, LexError, ParseError, PostfixProgram, PostfixToken,
    ResolveFn,
};

/// The formula engine crate
pub use kpi_formula as formula;
