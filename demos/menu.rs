//! Lowest-Calorie Menu Example
//!
//! This example plans the lowest-calorie order that meets a set of nutrition bounds.
//!
//! Use `-c` to load a catalog fixture by name (or pass a CSV path)
//! Use `-p` to pick a bound preset, or `--config` for a YAML file
//! Use `-r` / `-e` to require or exclude items, `--min` / `--max` to bound nutrients
//! Use `-f` to print the integer program before solving

use std::{io, io::Write, path::Path, time::Instant};

use anyhow::Result;
use clap::Parser;
use humanize_duration::{Truncate, prelude::DurationExt};
use tracing_subscriber::EnvFilter;

use macroplan::{
    catalog::NutritionCatalog,
    fixtures::Fixture,
    planner::{PlanOutcome, Planner},
    report::{SolutionReport, write_infeasibility},
    solvers::ilp::Program,
    utils::ExampleMenuArgs,
};

/// Lowest-Calorie Menu Example
#[expect(clippy::print_stdout, reason = "Example program output to user")]
pub fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = ExampleMenuArgs::parse();

    let catalog = if Path::new(&args.catalog).extension().is_some() {
        NutritionCatalog::from_path(&args.catalog)?
    } else {
        Fixture::new().catalog(&args.catalog)?
    };

    let config = args.planner_config()?;
    let planner = Planner::new(&catalog, &config);

    let spec = planner.constraints(&args.selections())?;

    if args.formulation {
        println!("{}", Program::formulate(planner.catalog(), &spec)?);
    }

    let start = Instant::now();
    let outcome = planner.plan_spec(&spec)?;
    let elapsed = start.elapsed();

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match &outcome {
        PlanOutcome::Optimal(solution) => {
            SolutionReport::new(solution)
                .with_constraints(&spec)
                .write_to(&mut handle)?;
        }
        PlanOutcome::Infeasible(report) => write_infeasibility(&mut handle, report)?,
        PlanOutcome::TimedOut { limit } => {
            writeln!(
                handle,
                "\nNo answer within {}; try a longer --timeout-ms.",
                limit.human(Truncate::Nano)
            )?;
        }
    }

    writeln!(
        handle,
        " {} ({}s)",
        elapsed.human(Truncate::Nano),
        elapsed.as_secs_f32()
    )?;

    Ok(())
}
