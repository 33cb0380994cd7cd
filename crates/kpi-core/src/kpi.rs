//! KPI definitions and raw values

use crate::enums::{ConsolidationType, FrequencyType, TargetMarginType, TargetType, TrendType};
use crate::error::{Error, Result};
use chrono::NaiveDateTime;

/// A tracked key performance indicator
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Kpi {
    /// Unique name; formulas reference it as `"name"`
    pub name: String,
    /// Native bucket size of the series (None = unspecified)
    #[cfg_attr(feature = "serde", serde(default))]
    pub frequency: Option<FrequencyType>,
    pub consolidation: ConsolidationType,
    /// Formula text, required for [`ConsolidationType::Formula`]
    #[cfg_attr(feature = "serde", serde(default))]
    pub formula: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub target: Option<Target>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub trend: Option<TrendType>,
}

impl Kpi {
    /// Create a KPI consolidated from raw values
    pub fn new<S: Into<String>>(name: S, consolidation: ConsolidationType) -> Self {
        Self {
            name: name.into(),
            frequency: None,
            consolidation,
            formula: None,
            target: None,
            trend: None,
        }
    }

    /// Create a KPI computed from other KPIs
    pub fn formula<S: Into<String>, F: Into<String>>(name: S, formula: F) -> Self {
        Self {
            formula: Some(formula.into()),
            ..Self::new(name, ConsolidationType::Formula)
        }
    }

    /// Set the native frequency
    pub fn with_frequency(mut self, frequency: FrequencyType) -> Self {
        self.frequency = Some(frequency);
        self
    }

    /// Set the target
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    /// Set the trend
    pub fn with_trend(mut self, trend: TrendType) -> Self {
        self.trend = Some(trend);
        self
    }

    /// Whether the value is computed by a formula
    pub fn is_formula(&self) -> bool {
        self.consolidation == ConsolidationType::Formula
    }

    /// Check the definition for internal consistency
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidKpi {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        let has_formula = self.formula.as_deref().map_or(false, |f| !f.trim().is_empty());
        match (self.is_formula(), has_formula) {
            (true, false) => Err(invalid("formula consolidation requires formula text")),
            (false, true) => Err(invalid("formula text requires formula consolidation")),
            _ => Ok(()),
        }
    }
}

/// Target a KPI is measured against
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Target {
    pub kind: TargetType,
    /// Constant target, or ignored when `kind` is [`TargetType::Kpi`]
    pub value: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub margin: Option<TargetMargin>,
}

/// Tolerance around a target
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetMargin {
    pub kind: TargetMarginType,
    pub value: f64,
}

impl Target {
    /// Constant target without margin
    pub fn constant(value: f64) -> Self {
        Self {
            kind: TargetType::Constant,
            value,
            margin: None,
        }
    }

    /// Set the margin
    pub fn with_margin(mut self, kind: TargetMarginType, value: f64) -> Self {
        self.margin = Some(TargetMargin { kind, value });
        self
    }

    /// Check whether `value` meets the target
    ///
    /// `resolved_target` is the target value in effect (for a KPI-backed
    /// target, the referenced KPI's value); `resolved_margin` likewise for a
    /// KPI-backed margin. Without a trend the value must lie within the margin
    /// on either side.
    pub fn is_met(
        &self,
        value: f64,
        trend: Option<TrendType>,
        resolved_target: f64,
        resolved_margin: Option<f64>,
    ) -> bool {
        let tolerance = match self.margin {
            None => 0.0,
            Some(TargetMargin {
                kind: TargetMarginType::Constant,
                value,
            }) => value,
            Some(TargetMargin {
                kind: TargetMarginType::Percentage,
                value,
            }) => resolved_target.abs() * value / 100.0,
            Some(TargetMargin {
                kind: TargetMarginType::Kpi,
                ..
            }) => resolved_margin.unwrap_or(0.0),
        }
        .abs();

        match trend {
            Some(TrendType::Up) => value >= resolved_target - tolerance,
            Some(TrendType::Down) => value <= resolved_target + tolerance,
            None => (value - resolved_target).abs() <= tolerance,
        }
    }
}

/// A raw, timestamped KPI observation
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KpiValue {
    pub date: NaiveDateTime,
    pub value: f64,
    /// Weight used by [`ConsolidationType::Weighted`] (default 1)
    #[cfg_attr(feature = "serde", serde(default))]
    pub weight: Option<f64>,
}

impl KpiValue {
    pub fn new(date: NaiveDateTime, value: f64) -> Self {
        Self {
            date,
            value,
            weight: None,
        }
    }

    pub fn weighted(date: NaiveDateTime, value: f64, weight: f64) -> Self {
        Self {
            date,
            value,
            weight: Some(weight),
        }
    }
}
