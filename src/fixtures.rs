//! Fixtures
//!
//! Named catalogs and presets stored under `./fixtures`.

use std::path::PathBuf;

use thiserror::Error;

use crate::{
    catalog::{CatalogLoadError, NutritionCatalog},
    config::{ConfigError, PlannerConfig},
};

/// Fixture Loading Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// Catalog fixture could not be loaded
    #[error("Failed to load catalog fixture `{name}`: {source}")]
    Catalog {
        /// Fixture name
        name: String,
        /// Underlying error
        source: CatalogLoadError,
    },

    /// Preset fixture could not be loaded
    #[error("Failed to load preset fixture `{name}`: {source}")]
    Preset {
        /// Fixture name
        name: String,
        /// Underlying error
        source: ConfigError,
    },
}

/// Fixture
#[derive(Debug, Clone)]
pub struct Fixture {
    /// Base path for fixture files
    base_path: PathBuf,
}

impl Fixture {
    /// Fixtures under the default `./fixtures` directory
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Fixtures under a custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Path of a named catalog fixture.
    pub fn catalog_path(&self, name: &str) -> PathBuf {
        self.base_path.join("catalogs").join(format!("{name}.csv"))
    }

    /// Path of a named preset fixture.
    pub fn preset_path(&self, name: &str) -> PathBuf {
        self.base_path.join("presets").join(format!("{name}.yml"))
    }

    /// Load a catalog from `catalogs/{name}.csv`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails validation.
    pub fn catalog(&self, name: &str) -> Result<NutritionCatalog, FixtureError> {
        NutritionCatalog::from_path(self.catalog_path(name)).map_err(|source| {
            FixtureError::Catalog {
                name: name.to_string(),
                source,
            }
        })
    }

    /// Load planner configuration from `presets/{name}.yml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn preset(&self, name: &str) -> Result<PlannerConfig, FixtureError> {
        PlannerConfig::from_path(self.preset_path(name)).map_err(|source| FixtureError::Preset {
            name: name.to_string(),
            source,
        })
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
