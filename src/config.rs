//! Configuration

use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{constraints::NutrientBound, nutrients::Nutrient};

/// Default number of required or excluded items a request may name.
pub const DEFAULT_SELECTION_LIMIT: usize = 3;

/// Default solve time budget in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Configuration Errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading a configuration file
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),
}

/// Built-in bound presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Lower and upper bounds on fat, carbohydrates and protein.
    Ranges,

    /// Minimum targets only.
    Minimums,
}

impl Preset {
    /// Default bounds for this preset.
    pub fn bounds(self) -> Vec<NutrientBound> {
        match self {
            Preset::Ranges => vec![
                NutrientBound::between(Nutrient::TotalFat, 10.0, 70.0),
                NutrientBound::between(Nutrient::Carbohydrates, 50.0, 260.0),
                NutrientBound::between(Nutrient::Protein, 15.0, 85.0),
            ],
            Preset::Minimums => vec![
                NutrientBound::at_least(Nutrient::TotalFat, 50.0),
                NutrientBound::at_least(Nutrient::Carbohydrates, 100.0),
                NutrientBound::at_least(Nutrient::Protein, 40.0),
            ],
        }
    }
}

/// Constraint Builder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Maximum number of required items per request
    pub max_required: usize,

    /// Maximum number of excluded items per request
    pub max_excluded: usize,

    /// Bounds applied when a request leaves a side unset
    pub defaults: Vec<NutrientBound>,
}

impl BuilderConfig {
    /// Configuration using a built-in preset's defaults.
    pub fn preset(preset: Preset) -> Self {
        Self {
            max_required: DEFAULT_SELECTION_LIMIT,
            max_excluded: DEFAULT_SELECTION_LIMIT,
            defaults: preset.bounds(),
        }
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self::preset(Preset::Ranges)
    }
}

/// Solver options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    /// Time budget for a single solve in milliseconds. `None` or `0` waits indefinitely.
    pub timeout_ms: Option<u64>,
}

impl SolveOptions {
    /// Options without a time limit. The solve runs on the calling thread.
    pub fn unlimited() -> Self {
        Self { timeout_ms: None }
    }

    /// Options with the given time limit, rounded up to whole milliseconds.
    ///
    /// A zero duration means no limit.
    pub fn with_timeout(timeout: Duration) -> Self {
        let millis = timeout.as_nanos().div_ceil(1_000_000);

        Self {
            timeout_ms: Some(u64::try_from(millis).unwrap_or(u64::MAX)),
        }
    }

    /// Time limit, if any. A zero budget is treated as no limit.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms
            .filter(|&millis| millis > 0)
            .map(Duration::from_millis)
    }
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            timeout_ms: Some(DEFAULT_TIMEOUT_MS),
        }
    }
}

/// Complete planner configuration, as read from YAML.
///
/// ```yaml
/// constraints:
///   max_required: 3
///   defaults:
///     - { nutrient: protein, min: 15, max: 85 }
/// solver:
///   timeout_ms: 2000
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Constraint Builder settings
    pub constraints: BuilderConfig,

    /// Solver settings
    pub solver: SolveOptions,
}

impl PlannerConfig {
    /// Planner configuration using a built-in bound preset.
    pub fn preset(preset: Preset) -> Self {
        Self {
            constraints: BuilderConfig::preset(preset),
            solver: SolveOptions::default(),
        }
    }

    /// Parse configuration from a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the document is not valid configuration.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_norway::from_str(yaml)?)
    }

    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;

        Self::from_yaml_str(&contents)
    }
}
