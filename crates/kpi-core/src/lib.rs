//! # kpi-core
//!
//! Core data structures for the kpi-tracker service.
//!
//! This crate provides:
//! - Lookup tables for frequency, consolidation, target and trend types
//! - Calendar arithmetic on frequency buckets ([`round_down`], [`round_up`], [`date_range`])
//! - The [`Kpi`] definition and raw [`KpiValue`] observations
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use kpi_core::{round_down, FrequencyType};
//!
//! let t = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap().and_hms_opt(9, 30, 0).unwrap();
//! let bucket = round_down(t, FrequencyType::Month).unwrap();
//! assert_eq!(bucket.to_string(), "2024-05-01 00:00:00");
//! ```

pub mod calendar;
pub mod enums;
pub mod error;
pub mod kpi;

pub use calendar::{date_range, next_date, round_down, round_up, DateRange};
pub use enums::{
    is_frequency_type, ConsolidationType, FrequencyType, TargetMarginType, TargetType, TrendType,
};
pub use error::{Error, Result};
pub use kpi::{Kpi, KpiValue, Target, TargetMargin};
