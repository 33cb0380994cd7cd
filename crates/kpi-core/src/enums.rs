//! Immutable lookup tables
//!
//! Every table maps a fieldless enum onto a stable integer code (the value
//! stored alongside a KPI) and a lowercase translation (the value exchanged
//! with users). The "none" entry of each table is represented by `Option::None`
//! at the use site rather than by a variant.

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

macro_rules! lookup_table {
    (
        $(#[$meta:meta])*
        $name:ident, $table:literal {
            $( $(#[$vmeta:meta])* $variant:ident = $code:literal => $text:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// All entries, in code order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Stored integer code
            pub fn code(self) -> i32 {
                match self {
                    $( $name::$variant => $code, )+
                }
            }

            /// Lowercase user-facing name
            pub fn translation(self) -> &'static str {
                match self {
                    $( $name::$variant => $text, )+
                }
            }

            /// Look up an entry by its stored code
            pub fn from_code(code: i32) -> Option<Self> {
                match code {
                    $( $code => Some($name::$variant), )+
                    _ => None,
                }
            }

            /// Look up an entry by its translation (case-insensitive)
            pub fn from_translation(text: &str) -> Option<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|entry| entry.translation().eq_ignore_ascii_case(text.trim()))
            }

            /// Like [`Self::from_code`], reporting the table on failure
            pub fn try_from_code(code: i32) -> crate::Result<Self> {
                Self::from_code(code).ok_or(Error::UnknownCode { table: $table, code })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.translation())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_translation(s).ok_or_else(|| Error::UnknownTranslation {
                    table: $table,
                    text: s.to_string(),
                })
            }
        }
    };
}

lookup_table! {
    /// Bucket size of a KPI's time series
    FrequencyType, "frequency type" {
        Year = 0 => "year",
        /// Half a year; buckets start on 1 January and 1 July
        Semester = 1 => "semester",
        Month = 2 => "month",
        /// Buckets start on Monday
        Week = 3 => "week",
        Day = 4 => "day",
        Hour = 5 => "hour",
        Minute = 6 => "minute",
        Seconds = 7 => "seconds",
    }
}

lookup_table! {
    /// How the raw values falling into one bucket are reduced to a single value
    ConsolidationType, "consolidation type" {
        Mean = 1 => "mean",
        /// Mean weighted by each value's weight
        Weighted = 2 => "weighted",
        Sum = 3 => "sum",
        Min = 4 => "min",
        Max = 5 => "max",
        /// Value computed from other KPIs through a formula
        Formula = 6 => "formula",
    }
}

lookup_table! {
    /// Source of a KPI's target value
    TargetType, "target type" {
        Constant = 0 => "constant",
        Kpi = 1 => "kpi",
    }
}

lookup_table! {
    /// Interpretation of the tolerance around a target
    TargetMarginType, "target margin type" {
        Constant = 0 => "constant",
        Kpi = 1 => "kpi",
        Percentage = 2 => "percentage",
    }
}

lookup_table! {
    /// Direction in which a KPI improves
    TrendType, "trend type" {
        Up = 0 => "up",
        Down = 1 => "down",
    }
}

/// Check whether `text` names a known frequency type
pub fn is_frequency_type(text: &str) -> bool {
    FrequencyType::from_translation(text).is_some()
}
