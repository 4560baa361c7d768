//! report-runner: headless reporting cycle runner for the stock tracking
//! pipeline.
//!
//! Usage:
//!   report-runner --db suivi.db --program PNLS --period 2026-05 --inputs cycle.json
//!   report-runner --db suivi.db --program PNLT --month Janvier --year 2026 --inputs cycle.json

use anyhow::{bail, Context, Result};
use chrono::Datelike;
use std::env;
use std::fs;
use std::str::FromStr;
use stocktrack_core::{
    calendar::Period,
    config::EngineConfig,
    engine::{CycleSummary, ReportEngine},
    inputs::CycleInputs,
    store::StockStore,
    types::Program,
};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = arg_value(&args, "--db").unwrap_or(":memory:");
    let program_raw =
        arg_value(&args, "--program").context("--program is required (PNLP, PNLS, PNLT, PNN, PNSME)")?;
    let program = Program::from_str(program_raw)?;

    let period = parse_period(&args)?;
    let auto = !args.iter().any(|a| a == "--no-auto");
    let max_months = parse_arg(&args, "--max-months", EngineConfig::default().max_months_considered);
    let horizon = parse_arg(
        &args,
        "--horizon",
        EngineConfig::default().forecast_horizon_months,
    );

    let inputs = match arg_value(&args, "--inputs") {
        Some(path) => {
            let raw = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str::<CycleInputs>(&raw).with_context(|| format!("parsing {path}"))?
        }
        None => CycleInputs::default(),
    };

    println!("stock tracking report-runner");
    println!("  db:      {db}");
    println!("  program: {program}");
    println!("  period:  {period}");
    println!("  auto:    {auto}");
    println!();

    let store = StockStore::open(db)?;
    store.migrate()?;

    let config = EngineConfig {
        max_months_considered: max_months,
        auto_computed: auto,
        forecast_horizon_months: horizon,
    };
    let engine = ReportEngine::new(program, period, config, store);
    let summary = engine.run_cycle(&inputs)?;

    print_summary(&engine, &summary)?;
    Ok(())
}

/// Reporting period: either `--period YYYY-MM[-DD]` or a French month name
/// via `--month Janvier --year 2026`.
fn parse_period(args: &[String]) -> Result<Period> {
    if let Some(raw) = arg_value(args, "--period") {
        return Ok(Period::parse(raw)?);
    }
    if let Some(month) = arg_value(args, "--month") {
        let year = parse_arg(args, "--year", chrono::Local::now().year());
        return Ok(Period::from_french_month(month, year)?);
    }
    bail!("either --period or --month is required");
}

fn arg_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: FromStr>(args: &[String], name: &str, default: T) -> T {
    arg_value(args, name)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn print_summary(engine: &ReportEngine, summary: &CycleSummary) -> Result<()> {
    println!("cycle {} completed", summary.cycle_id);
    println!("  products:   {}", summary.products);
    println!(
        "  indicators: {} DMM records, {} CMM records",
        summary.dmm_records, summary.cmm_records
    );
    println!(
        "  deviations: {} computed, {} flagged",
        summary.deviations, summary.flagged_deviations
    );
    println!("  snapshots:  {}", summary.snapshots);
    println!("  forecast:   {} rows", summary.forecast_rows);

    let tally = engine.store().status_tally(summary.program, summary.period)?;
    if !tally.is_empty() {
        println!();
        println!("stock status by level:");
        for (level, status, count) in &tally {
            println!("  {level:<13} {status:<14} {count}");
        }
    }

    let products = engine.store().products_for_program(summary.program)?;
    let deviations = engine
        .store()
        .largest_deviations(summary.program, summary.period, 10)?;
    let flagged: Vec<_> = deviations.iter().filter(|d| d.is_flagged()).collect();
    if !flagged.is_empty() {
        println!();
        println!("largest deviations:");
        for record in flagged {
            let designation = products
                .iter()
                .find(|p| p.product_id == record.product_id)
                .map(|p| p.designation.as_str())
                .unwrap_or("?");
            println!(
                "  {:<40} expected {} observed {} ecart {}",
                designation,
                record.expected_theoretical,
                record.observed_theoretical,
                record.discrepancy
            );
        }
    }

    Ok(())
}
