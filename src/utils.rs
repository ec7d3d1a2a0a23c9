//! Utils

use std::path::PathBuf;

use clap::Parser;

use crate::{
    config::{ConfigError, PlannerConfig, Preset},
    constraints::{BoundRequest, Selections},
    nutrients::Nutrient,
};

/// Arguments for the menu example
#[derive(Debug, Parser)]
pub struct ExampleMenuArgs {
    /// Catalog fixture name, or a path to a nutrition CSV
    #[clap(short, long, default_value = "chipotle")]
    pub catalog: String,

    /// Built-in bound preset
    #[clap(short, long, value_enum, default_value_t = Preset::Ranges)]
    pub preset: Preset,

    /// YAML configuration file; overrides `--preset`
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Item that must be ordered (repeatable)
    #[clap(short, long)]
    pub require: Vec<String>,

    /// Item that must not be ordered (repeatable)
    #[clap(short, long)]
    pub exclude: Vec<String>,

    /// Minimum total, as `NUTRIENT=VALUE` (repeatable)
    #[clap(long, value_parser = parse_nutrient_value)]
    pub min: Vec<(Nutrient, f64)>,

    /// Maximum total, as `NUTRIENT=VALUE` (repeatable)
    #[clap(long, value_parser = parse_nutrient_value)]
    pub max: Vec<(Nutrient, f64)>,

    /// Solve time budget in milliseconds; `0` waits indefinitely
    #[clap(short, long)]
    pub timeout_ms: Option<u64>,

    /// Print the integer program before solving
    #[clap(short, long)]
    pub formulation: bool,
}

impl ExampleMenuArgs {
    /// Planner configuration from `--config` or `--preset`, with `--timeout-ms` applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed.
    pub fn planner_config(&self) -> Result<PlannerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => PlannerConfig::from_path(path)?,
            None => PlannerConfig::preset(self.preset),
        };

        if let Some(timeout_ms) = self.timeout_ms {
            config.solver.timeout_ms = Some(timeout_ms);
        }

        Ok(config)
    }

    /// Selections described by the item and bound flags.
    ///
    /// `--min` and `--max` for the same nutrient combine into one bound.
    pub fn selections(&self) -> Selections {
        let mut bounds: Vec<BoundRequest> = Vec::new();

        let flags = self
            .min
            .iter()
            .map(|&(nutrient, value)| (nutrient, Some(value), None))
            .chain(
                self.max
                    .iter()
                    .map(|&(nutrient, value)| (nutrient, None, Some(value))),
            );

        for (nutrient, min, max) in flags {
            match bounds.iter_mut().find(|bound| bound.nutrient == nutrient) {
                Some(bound) => {
                    bound.min = min.or(bound.min);
                    bound.max = max.or(bound.max);
                }
                None => bounds.push(BoundRequest { nutrient, min, max }),
            }
        }

        Selections {
            required: self.require.clone(),
            excluded: self.exclude.clone(),
            bounds,
        }
    }
}

/// Parse a `NUTRIENT=VALUE` pair such as `protein=40`.
///
/// # Errors
///
/// Returns a message if the pair is malformed, the nutrient is unknown, or the value is not a
/// number.
pub fn parse_nutrient_value(raw: &str) -> Result<(Nutrient, f64), String> {
    let (nutrient, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NUTRIENT=VALUE, got `{raw}`"))?;

    let nutrient = nutrient.parse::<Nutrient>().map_err(|err| err.to_string())?;

    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("invalid value `{value}`: {err}"))?;

    Ok((nutrient, value))
}
