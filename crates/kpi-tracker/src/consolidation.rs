//! Consolidation engine
//!
//! Reduces raw [`KpiValue`] observations to one value per time bucket and
//! computes formula-defined KPIs from the consolidated series of the KPIs
//! they reference.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use chrono::NaiveDate;
//! use kpi_tracker::prelude::*;
//!
//! let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(12, 0, 0).unwrap();
//!
//! let kpis = vec![
//!     Kpi::new("revenue", ConsolidationType::Sum),
//!     Kpi::new("cost", ConsolidationType::Sum),
//!     Kpi::formula("margin", "\"revenue\" - \"cost\""),
//! ];
//! let mut values = HashMap::new();
//! values.insert("revenue".to_string(), vec![KpiValue::new(day(1), 100.0), KpiValue::new(day(1), 50.0)]);
//! values.insert("cost".to_string(), vec![KpiValue::new(day(1), 90.0)]);
//!
//! let (result, stats) = consolidate(&kpis, &values, day(1), day(2), FrequencyType::Day).unwrap();
//! assert_eq!(result.series["margin"][0].value, Some(60.0));
//! assert_eq!(result.series["margin"][1].value, None);
//! assert_eq!(stats.unresolved, 1);
//! ```

use crate::error::{ConsolidationError, ConsolidationResult};
use ahash::AHashMap;
use chrono::NaiveDateTime;
use kpi_core::{date_range, round_down, round_up, ConsolidationType, FrequencyType, Kpi, KpiValue};
use kpi_formula::{
    evaluate, reference_name, DependencyGraph, EvalError, EvaluationContext, Formula,
    FormulaError, PostfixProgram,
};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// Options for a consolidation run
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsolidationOptions {
    /// Worker threads for formula evaluation; 0 and 1 both mean sequential
    pub threads: usize,
    /// Abort on the first evaluation error instead of leaving the bucket empty
    pub fail_on_error: bool,
}

impl Default for ConsolidationOptions {
    fn default() -> Self {
        Self {
            threads: 1,
            fail_on_error: false,
        }
    }
}

/// Statistics from a consolidation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsolidationStats {
    /// Number of KPIs consolidated
    pub kpis: usize,
    /// Buckets produced, over all series
    pub buckets: usize,
    /// Formula buckets evaluated to a value
    pub formulas_evaluated: usize,
    /// Formula buckets left empty because a referenced KPI had no value
    pub unresolved: usize,
    /// Formula buckets left empty because evaluation failed
    pub errors: usize,
}

/// One time bucket of a consolidated series
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bucket {
    pub start: NaiveDateTime,
    /// Last whole second inside the bucket
    pub end: NaiveDateTime,
    pub value: Option<f64>,
}

/// Consolidated series, keyed by KPI name
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Consolidation {
    pub series: BTreeMap<String, Vec<Bucket>>,
}

/// Consolidate with default options
pub fn consolidate(
    kpis: &[Kpi],
    values: &HashMap<String, Vec<KpiValue>>,
    start: NaiveDateTime,
    end: NaiveDateTime,
    frequency: FrequencyType,
) -> ConsolidationResult<(Consolidation, ConsolidationStats)> {
    consolidate_with_options(
        kpis,
        values,
        start,
        end,
        frequency,
        &ConsolidationOptions::default(),
    )
}

/// Consolidate `values` of `kpis` into `frequency` buckets covering `[start, end]`
///
/// The first bucket is the one containing `start`. Values of KPIs missing
/// from `values` are treated as empty; values outside the range are ignored.
pub fn consolidate_with_options(
    kpis: &[Kpi],
    values: &HashMap<String, Vec<KpiValue>>,
    start: NaiveDateTime,
    end: NaiveDateTime,
    frequency: FrequencyType,
    options: &ConsolidationOptions,
) -> ConsolidationResult<(Consolidation, ConsolidationStats)> {
    let mut engine = ConsolidationEngine::new(options, frequency);
    engine.consolidate_all(kpis, values, start, end)
}

/// Per-bucket reference resolution against already consolidated series
struct BucketContext<'a> {
    series: &'a AHashMap<String, Vec<Option<f64>>>,
    index: usize,
}

impl EvaluationContext for BucketContext<'_> {
    fn resolve(&self, key: &str) -> Option<f64> {
        self.series
            .get(reference_name(key))
            .and_then(|values| values.get(self.index).copied().flatten())
    }
}

/// Running reduction of the values falling into one bucket
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    count: usize,
    sum: f64,
    weighted_sum: f64,
    weights: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    fn add(&mut self, value: &KpiValue) {
        let weight = value.weight.unwrap_or(1.0);
        if self.count == 0 {
            self.min = value.value;
            self.max = value.value;
        } else {
            self.min = self.min.min(value.value);
            self.max = self.max.max(value.value);
        }
        self.count += 1;
        self.sum += value.value;
        self.weighted_sum += value.value * weight;
        self.weights += weight;
    }

    fn finish(&self, consolidation: ConsolidationType) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        match consolidation {
            ConsolidationType::Mean => Some(self.sum / self.count as f64),
            ConsolidationType::Weighted if self.weights == 0.0 => None,
            ConsolidationType::Weighted => Some(self.weighted_sum / self.weights),
            ConsolidationType::Sum => Some(self.sum),
            ConsolidationType::Min => Some(self.min),
            ConsolidationType::Max => Some(self.max),
            ConsolidationType::Formula => None,
        }
    }
}

/// The consolidation engine
struct ConsolidationEngine<'o> {
    options: &'o ConsolidationOptions,
    frequency: FrequencyType,
    /// Bucket start dates, ascending
    starts: Vec<NaiveDateTime>,
    /// Consolidated values per KPI name, one slot per bucket
    series: AHashMap<String, Vec<Option<f64>>>,
    stats: ConsolidationStats,
}

impl<'o> ConsolidationEngine<'o> {
    fn new(options: &'o ConsolidationOptions, frequency: FrequencyType) -> Self {
        Self {
            options,
            frequency,
            starts: Vec::new(),
            series: AHashMap::new(),
            stats: ConsolidationStats::default(),
        }
    }

    fn consolidate_all(
        &mut self,
        kpis: &[Kpi],
        values: &HashMap<String, Vec<KpiValue>>,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> ConsolidationResult<(Consolidation, ConsolidationStats)> {
        self.stats.kpis = kpis.len();
        self.starts = date_range(round_down(start, self.frequency)?, end, self.frequency).collect();

        // Phase 1: Validate definitions and compile formulas
        let mut by_name: AHashMap<&str, &Kpi> = AHashMap::with_capacity(kpis.len());
        for kpi in kpis {
            kpi.validate()?;
            if by_name.insert(kpi.name.as_str(), kpi).is_some() {
                return Err(ConsolidationError::DuplicateKpi(kpi.name.clone()));
            }
        }
        let programs = compile_formulas(kpis)?;

        // Phase 2: Order formula KPIs after the KPIs they reference
        let order = self.evaluation_order(kpis, &programs, &by_name)?;

        // Phase 3: Consolidate raw values
        for kpi in kpis.iter().filter(|kpi| !kpi.is_formula()) {
            let raw = values.get(&kpi.name).map_or(&[][..], Vec::as_slice);
            let series = self.aggregate(kpi, raw)?;
            self.series.insert(kpi.name.clone(), series);
        }

        // Phase 4: Evaluate formulas in dependency order
        let pool = self.thread_pool()?;
        for name in &order {
            if let Some(program) = programs.get(name.as_str()) {
                let series = self.evaluate_formula(name, program, pool.as_ref())?;
                self.series.insert(name.clone(), series);
            }
        }

        let consolidation = self.collect()?;
        tracing::info!(
            kpis = self.stats.kpis,
            buckets = self.stats.buckets,
            formulas = self.stats.formulas_evaluated,
            unresolved = self.stats.unresolved,
            errors = self.stats.errors,
            "consolidation complete"
        );

        Ok((consolidation, std::mem::take(&mut self.stats)))
    }

    fn evaluation_order(
        &self,
        kpis: &[Kpi],
        programs: &AHashMap<&str, PostfixProgram>,
        by_name: &AHashMap<&str, &Kpi>,
    ) -> ConsolidationResult<Vec<String>> {
        let mut graph = DependencyGraph::new();

        for kpi in kpis {
            graph.add_node(&kpi.name);
            let Some(program) = programs.get(kpi.name.as_str()) else {
                continue;
            };
            for key in program.references() {
                let reference = reference_name(key);
                if !by_name.contains_key(reference) {
                    return Err(ConsolidationError::UnknownKpi {
                        kpi: kpi.name.clone(),
                        reference: reference.to_string(),
                    });
                }
                graph.add_dependency(reference, &kpi.name);
            }
        }

        graph
            .evaluation_order()
            .map_err(ConsolidationError::CircularReference)
    }

    fn aggregate(&self, kpi: &Kpi, raw: &[KpiValue]) -> ConsolidationResult<Vec<Option<f64>>> {
        let mut accumulators = vec![Accumulator::default(); self.starts.len()];

        for value in raw {
            let bucket = round_down(value.date, self.frequency)?;
            if let Ok(index) = self.starts.binary_search(&bucket) {
                accumulators[index].add(value);
            }
        }

        Ok(accumulators
            .iter()
            .map(|acc| acc.finish(kpi.consolidation))
            .collect())
    }

    fn thread_pool(&self) -> ConsolidationResult<Option<rayon::ThreadPool>> {
        if self.options.threads <= 1 {
            return Ok(None);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.threads)
            .build()?;
        Ok(Some(pool))
    }

    fn evaluate_formula(
        &mut self,
        name: &str,
        program: &PostfixProgram,
        pool: Option<&rayon::ThreadPool>,
    ) -> ConsolidationResult<Vec<Option<f64>>> {
        let count = self.starts.len();
        let series = &self.series;
        let evaluate_bucket = |index: usize| {
            let ctx = BucketContext { series, index };
            evaluate(program, Some(&ctx))
        };

        let results: Vec<Result<f64, EvalError>> = match pool {
            Some(pool) => pool.install(|| {
                (0..count)
                    .into_par_iter()
                    .map(evaluate_bucket)
                    .collect()
            }),
            None => (0..count).map(evaluate_bucket).collect(),
        };

        let mut values = Vec::with_capacity(results.len());
        for (index, result) in results.into_iter().enumerate() {
            let value = match result {
                Ok(value) => {
                    self.stats.formulas_evaluated += 1;
                    Some(value)
                }
                Err(EvalError::UnresolvedReference(key)) => {
                    tracing::debug!(kpi = name, bucket = %self.starts[index], key = %key, "unresolved reference");
                    self.stats.unresolved += 1;
                    None
                }
                Err(e) => {
                    if self.options.fail_on_error {
                        return Err(ConsolidationError::Formula {
                            kpi: name.to_string(),
                            source: FormulaError::Eval(e),
                        });
                    }
                    tracing::warn!(kpi = name, bucket = %self.starts[index], error = %e, "formula evaluation failed");
                    self.stats.errors += 1;
                    None
                }
            };
            values.push(value);
        }

        Ok(values)
    }

    fn collect(&mut self) -> ConsolidationResult<Consolidation> {
        let mut consolidation = Consolidation::default();

        for (name, values) in self.series.drain() {
            let buckets = self
                .starts
                .iter()
                .zip(values)
                .map(|(start, value)| {
                    Ok(Bucket {
                        start: *start,
                        end: round_up(*start, self.frequency)?,
                        value,
                    })
                })
                .collect::<ConsolidationResult<Vec<_>>>()?;
            self.stats.buckets += buckets.len();
            consolidation.series.insert(name, buckets);
        }

        Ok(consolidation)
    }
}

/// Compile every formula KPI once
fn compile_formulas(kpis: &[Kpi]) -> ConsolidationResult<AHashMap<&str, PostfixProgram>> {
    let mut programs = AHashMap::new();

    for kpi in kpis.iter().filter(|kpi| kpi.is_formula()) {
        let text = kpi.formula.as_deref().unwrap_or_default();
        let program = Formula::new(text)
            .and_then(|formula| formula.compile())
            .map_err(|source| ConsolidationError::Formula {
                kpi: kpi.name.clone(),
                source,
            })?;
        tracing::debug!(kpi = %kpi.name, postfix = %program, "compiled KPI formula");
        programs.insert(kpi.name.as_str(), program);
    }

    Ok(programs)
}
