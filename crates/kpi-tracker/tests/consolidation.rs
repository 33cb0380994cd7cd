//! Tests for consolidating raw values and formula KPIs into buckets

use chrono::{NaiveDate, NaiveDateTime};
use kpi_tracker::prelude::*;
use kpi_tracker::ParseError;
use pretty_assertions::assert_eq;
use std::collections::HashMap;

fn at(m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, m, d)
        .unwrap()
        .and_hms_opt(10, 30, 0)
        .unwrap()
}

fn month(m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, m, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn values_of(series: &[Bucket]) -> Vec<Option<f64>> {
    series.iter().map(|b| b.value).collect()
}

fn sales_values() -> HashMap<String, Vec<KpiValue>> {
    let mut values = HashMap::new();
    values.insert(
        "revenue".to_string(),
        vec![
            KpiValue::new(at(1, 3), 100.0),
            KpiValue::new(at(1, 20), 300.0),
            KpiValue::new(at(2, 14), 250.0),
            KpiValue::new(at(3, 31), 50.0),
        ],
    );
    values.insert(
        "cost".to_string(),
        vec![
            KpiValue::new(at(1, 10), 320.0),
            KpiValue::new(at(2, 2), 0.0),
            KpiValue::new(at(3, 5), 40.0),
        ],
    );
    values.insert(
        "satisfaction".to_string(),
        vec![
            KpiValue::weighted(at(1, 5), 4.0, 3.0),
            KpiValue::weighted(at(1, 6), 2.0, 1.0),
        ],
    );
    values
}

/// Test the raw-value consolidation modes over monthly buckets
#[test]
fn test_consolidation_modes() {
    let kpis = vec![
        Kpi::new("revenue", ConsolidationType::Sum),
        Kpi::new("cost", ConsolidationType::Max),
        Kpi::new("satisfaction", ConsolidationType::Weighted),
    ];

    let (result, stats) = consolidate(
        &kpis,
        &sales_values(),
        at(1, 15),
        at(3, 15),
        FrequencyType::Month,
    )
    .unwrap();

    let revenue = &result.series["revenue"];
    assert_eq!(
        revenue.iter().map(|b| b.start).collect::<Vec<_>>(),
        vec![month(1), month(2), month(3)]
    );
    assert_eq!(revenue[1].end, month(3) - chrono::Duration::seconds(1));
    assert_eq!(values_of(revenue), vec![Some(400.0), Some(250.0), Some(50.0)]);
    assert_eq!(
        values_of(&result.series["cost"]),
        vec![Some(320.0), Some(0.0), Some(40.0)]
    );
    // (4*3 + 2*1) / 4
    assert_eq!(
        values_of(&result.series["satisfaction"]),
        vec![Some(3.5), None, None]
    );

    assert_eq!(stats.kpis, 3);
    assert_eq!(stats.buckets, 9);
    assert_eq!(stats.formulas_evaluated, 0);
}

/// Test formula KPIs, declared before their precedents and chained
#[test]
fn test_formula_kpis_in_dependency_order() {
    let kpis = vec![
        Kpi::formula("bonus", "MAX(\"profit\" * 0.1, 0)"),
        Kpi::formula("profit", "\"revenue\" - \"cost\""),
        Kpi::new("revenue", ConsolidationType::Sum),
        Kpi::new("cost", ConsolidationType::Sum),
    ];

    let (result, stats) = consolidate(
        &kpis,
        &sales_values(),
        month(1),
        month(3),
        FrequencyType::Month,
    )
    .unwrap();

    assert_eq!(
        values_of(&result.series["profit"]),
        vec![Some(80.0), Some(250.0), Some(10.0)]
    );
    assert_eq!(
        values_of(&result.series["bonus"]),
        vec![Some(8.0), Some(25.0), Some(1.0)]
    );
    assert_eq!(stats.formulas_evaluated, 6);
    assert_eq!(stats.unresolved, 0);
    assert_eq!(stats.errors, 0);
}

/// Test that empty precedent buckets leave the formula bucket empty
#[test]
fn test_unresolved_references() {
    let kpis = vec![
        Kpi::new("revenue", ConsolidationType::Sum),
        Kpi::new("visits", ConsolidationType::Sum),
        Kpi::formula("per_visit", "\"revenue\" / \"visits\""),
    ];

    let (result, stats) = consolidate(
        &kpis,
        &sales_values(),
        month(1),
        month(2),
        FrequencyType::Month,
    )
    .unwrap();

    assert_eq!(values_of(&result.series["per_visit"]), vec![None, None]);
    assert_eq!(stats.unresolved, 2);
    assert_eq!(stats.errors, 0);
}

/// Test that evaluation errors are counted, or returned in strict mode
#[test]
fn test_evaluation_errors() {
    let kpis = vec![
        Kpi::new("revenue", ConsolidationType::Sum),
        Kpi::new("cost", ConsolidationType::Sum),
        Kpi::formula("ratio", "\"revenue\" / \"cost\""),
    ];
    let values = sales_values();

    let (result, stats) =
        consolidate(&kpis, &values, month(1), month(3), FrequencyType::Month).unwrap();
    assert_eq!(
        values_of(&result.series["ratio"]),
        vec![Some(400.0 / 320.0), None, Some(50.0 / 40.0)]
    );
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.formulas_evaluated, 2);

    let options = ConsolidationOptions {
        fail_on_error: true,
        ..Default::default()
    };
    let err = consolidate_with_options(
        &kpis,
        &values,
        month(1),
        month(3),
        FrequencyType::Month,
        &options,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ConsolidationError::Formula {
            ref kpi,
            source: FormulaError::Eval(EvalError::DivisionByZero),
        } if kpi == "ratio"
    ));
}

/// Test that a thread pool gives the same result as sequential evaluation
#[test]
fn test_parallel_matches_sequential() {
    let kpis = vec![
        Kpi::new("revenue", ConsolidationType::Mean),
        Kpi::new("cost", ConsolidationType::Min),
        Kpi::formula("margin", "(\"revenue\" - \"cost\") / \"revenue\" * 100"),
    ];
    let mut values = HashMap::new();
    let start = month(1);
    values.insert(
        "revenue".to_string(),
        (0..90)
            .map(|d| KpiValue::new(start + chrono::Duration::days(d), 100.0 + d as f64))
            .collect(),
    );
    values.insert(
        "cost".to_string(),
        (0..90)
            .step_by(2)
            .map(|d| KpiValue::new(start + chrono::Duration::days(d), 50.0 + d as f64))
            .collect(),
    );

    let sequential = consolidate(&kpis, &values, start, at(3, 30), FrequencyType::Day).unwrap();
    let options = ConsolidationOptions {
        threads: 4,
        ..Default::default()
    };
    let parallel = consolidate_with_options(
        &kpis,
        &values,
        start,
        at(3, 30),
        FrequencyType::Day,
        &options,
    )
    .unwrap();

    assert_eq!(sequential, parallel);
    assert_eq!(parallel.1.formulas_evaluated, 45);
    assert_eq!(parallel.1.unresolved, 45);
}

/// Test that weekly buckets start on Monday
#[test]
fn test_week_buckets() {
    let kpis = vec![Kpi::new("revenue", ConsolidationType::Sum)];

    // 2024-01-03 is a Wednesday
    let (result, _) = consolidate(
        &kpis,
        &sales_values(),
        at(1, 3),
        at(1, 21),
        FrequencyType::Week,
    )
    .unwrap();

    let starts: Vec<_> = result.series["revenue"].iter().map(|b| b.start).collect();
    assert_eq!(
        starts,
        vec![month(1), month(1) + chrono::Duration::weeks(1), month(1) + chrono::Duration::weeks(2)]
    );
    assert_eq!(
        values_of(&result.series["revenue"]),
        vec![Some(100.0), None, Some(300.0)]
    );
}

/// Test definition errors that abort the run
#[test]
fn test_definition_errors() {
    fn run(kpis: &[Kpi]) -> Result<(Consolidation, ConsolidationStats), ConsolidationError> {
        consolidate(kpis, &HashMap::new(), month(1), month(2), FrequencyType::Month)
    }

    let err = run(&[
        Kpi::new("revenue", ConsolidationType::Sum),
        Kpi::formula("margin", "\"revenue\" - \"cost\""),
    ])
    .unwrap_err();
    assert!(matches!(
        err,
        ConsolidationError::UnknownKpi { ref kpi, ref reference } if kpi == "margin" && reference == "cost"
    ));

    let err = run(&[Kpi::formula("a", "\"b\" + 1"), Kpi::formula("b", "\"a\" * 2")]).unwrap_err();
    match err {
        ConsolidationError::CircularReference(cycle) => {
            let mut cycle = cycle;
            cycle.sort();
            assert_eq!(cycle, vec!["a".to_string(), "b".to_string()]);
        }
        other => panic!("expected circular reference, got {:?}", other),
    }

    let err = run(&[
        Kpi::new("revenue", ConsolidationType::Sum),
        Kpi::new("revenue", ConsolidationType::Mean),
    ])
    .unwrap_err();
    assert!(matches!(err, ConsolidationError::DuplicateKpi(ref name) if name == "revenue"));

    let err = run(&[Kpi::formula("broken", "(1 + 2")]).unwrap_err();
    assert!(matches!(
        err,
        ConsolidationError::Formula {
            source: FormulaError::Parse(ParseError::UnmatchedLeftParen { position: 0 }),
            ..
        }
    ));

    let mut invalid = Kpi::new("plain", ConsolidationType::Sum);
    invalid.formula = Some("1 + 1".to_string());
    assert!(matches!(
        run(&[invalid]).unwrap_err(),
        ConsolidationError::Core(kpi_tracker::Error::InvalidKpi { .. })
    ));
}

/// Test a long chain of formula KPIs, each referencing the next
#[test]
fn test_long_formula_chain() {
    let name = |i: usize| format!("k{:05}", i);
    let mut kpis: Vec<Kpi> = (0..10_000)
        .map(|i| Kpi::formula(name(i), format!("\"{}\" + 1", name(i + 1))))
        .collect();
    kpis.push(Kpi::new(name(10_000), ConsolidationType::Sum));

    let mut values = HashMap::new();
    values.insert(name(10_000), vec![KpiValue::new(at(1, 3), 0.5)]);

    let (result, stats) =
        consolidate(&kpis, &values, month(1), month(1), FrequencyType::Month).unwrap();

    assert_eq!(values_of(&result.series[&name(0)]), vec![Some(10_000.5)]);
    assert_eq!(values_of(&result.series[&name(9_999)]), vec![Some(1.5)]);
    assert_eq!(stats.formulas_evaluated, 10_000);
}
