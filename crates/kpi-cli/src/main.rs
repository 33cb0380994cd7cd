//! KPI CLI - formula and consolidation tool

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use kpi_tracker::prelude::*;
use kpi_tracker::{date_range, evaluate, round_down, to_postfix};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "kpi")]
#[command(author, version, about = "KPI formula evaluation and consolidation tool")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the postfix form of a formula and its argument counts
    Postfix {
        /// Formula text
        expr: String,
    },

    /// Evaluate a formula
    Eval {
        /// Formula text
        expr: String,

        /// Reference value, as NAME=VALUE (NAME without quotes)
        #[arg(short, long = "ref", value_parser = parse_reference)]
        refs: Vec<(String, f64)>,
    },

    /// List the bucket start dates of a range
    Range {
        /// First date (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)
        #[arg(long, value_parser = parse_datetime)]
        start: NaiveDateTime,

        /// Last date, inclusive
        #[arg(long, value_parser = parse_datetime)]
        end: NaiveDateTime,

        /// Bucket frequency (year, semester, month, week, day, hour, minute, seconds)
        #[arg(short, long)]
        frequency: FrequencyType,
    },

    /// Consolidate KPI values from a JSON file
    Consolidate {
        /// Input file: {"kpis": [...], "values": {"name": [...]}}
        input: PathBuf,

        #[arg(long, value_parser = parse_datetime)]
        start: NaiveDateTime,

        #[arg(long, value_parser = parse_datetime)]
        end: NaiveDateTime,

        #[arg(short, long)]
        frequency: FrequencyType,

        /// Worker threads for formula evaluation
        #[arg(short, long, default_value = "1")]
        threads: usize,

        /// Fail on the first formula evaluation error
        #[arg(long)]
        strict: bool,
    },
}

/// Contents of a consolidation input file
#[derive(Deserialize)]
struct ConsolidationInput {
    kpis: Vec<Kpi>,
    #[serde(default)]
    values: HashMap<String, Vec<KpiValue>>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Commands::Postfix { expr } => show_postfix(&expr),
        Commands::Eval { expr, refs } => eval(&expr, refs),
        Commands::Range {
            start,
            end,
            frequency,
        } => list_range(start, end, frequency),
        Commands::Consolidate {
            input,
            start,
            end,
            frequency,
            threads,
            strict,
        } => run_consolidation(
            &input,
            start,
            end,
            frequency,
            &ConsolidationOptions {
                threads,
                fail_on_error: strict,
            },
        ),
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install log subscriber")?;
    Ok(())
}

fn show_postfix(expr: &str) -> Result<()> {
    let program = to_postfix(expr).with_context(|| format!("Failed to compile '{}'", expr))?;

    println!("{}", program);
    if !program.arities().is_empty() {
        println!("arities: {:?}", program.arities());
    }
    Ok(())
}

fn eval(expr: &str, refs: Vec<(String, f64)>) -> Result<()> {
    let ctx: HashMap<String, f64> = refs
        .into_iter()
        .map(|(name, value)| (format!("\"{}\"", name), value))
        .collect();

    let program = to_postfix(expr).with_context(|| format!("Failed to compile '{}'", expr))?;
    let value = evaluate(&program, Some(&ctx))
        .with_context(|| format!("Failed to evaluate '{}'", expr))?;

    println!("{}", value);
    Ok(())
}

fn list_range(start: NaiveDateTime, end: NaiveDateTime, frequency: FrequencyType) -> Result<()> {
    let first = round_down(start, frequency).context("Start date out of range")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for date in date_range(first, end, frequency) {
        writeln!(out, "{}", date.format("%Y-%m-%dT%H:%M:%S"))?;
    }
    Ok(())
}

fn run_consolidation(
    input: &Path,
    start: NaiveDateTime,
    end: NaiveDateTime,
    frequency: FrequencyType,
    options: &ConsolidationOptions,
) -> Result<()> {
    if start > end {
        bail!("Start {} is after end {}", start, end);
    }

    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read '{}'", input.display()))?;
    let data: ConsolidationInput = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse '{}'", input.display()))?;

    let (consolidation, stats) =
        consolidate_with_options(&data.kpis, &data.values, start, end, frequency, options)
            .context("Consolidation failed")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &consolidation)?;
    writeln!(out)?;

    eprintln!(
        "Consolidated {} KPIs into {} buckets ({} formulas evaluated, {} unresolved, {} errors)",
        stats.kpis, stats.buckets, stats.formulas_evaluated, stats.unresolved, stats.errors
    );
    Ok(())
}

fn parse_reference(s: &str) -> std::result::Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    let value = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid number '{}'", value))?;
    Ok((name.trim().trim_matches('"').to_string(), value))
}

fn parse_datetime(s: &str) -> std::result::Result<NaiveDateTime, String> {
    const FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

    if let Some(dt) = FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Ok(dt);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("invalid date '{}'", s))
}
