//! Constraint Builder
//!
//! Turns raw selections from a user interface into a validated [`ConstraintSpec`]. Every
//! check that can fail because of user input happens here, so the solver only ever sees
//! structurally valid requests.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::{catalog::NutritionCatalog, config::BuilderConfig, nutrients::Nutrient};

/// Which selection list an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionList {
    /// Items that must be ordered
    Required,

    /// Items that must not be ordered
    Excluded,
}

impl fmt::Display for SelectionList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionList::Required => f.write_str("required"),
            SelectionList::Excluded => f.write_str("excluded"),
        }
    }
}

/// Invalid user-supplied constraints. Callers should re-prompt rather than abort.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstraintError {
    /// A selected item is not on the menu.
    #[error("{list} item `{name}` is not on the menu")]
    UnknownItem {
        /// List the entry came from
        list: SelectionList,
        /// Selected identifier
        name: String,
    },

    /// An item is both required and excluded.
    #[error("`{name}` cannot be both required and excluded")]
    Overlap {
        /// Conflicting identifier
        name: String,
    },

    /// An item appears twice in the same list.
    #[error("`{name}` is listed more than once in the {list} items")]
    DuplicateSelection {
        /// List the entry came from
        list: SelectionList,
        /// Repeated identifier
        name: String,
    },

    /// A list has more entries than the configuration allows.
    #[error("{count} {list} items selected, at most {limit} allowed")]
    TooManySelections {
        /// Offending list
        list: SelectionList,
        /// Entries supplied
        count: usize,
        /// Configured maximum
        limit: usize,
    },

    /// A lower bound exceeds its upper bound.
    #[error("{nutrient} minimum {min} exceeds maximum {max}")]
    InvertedBound {
        /// Bounded nutrient
        nutrient: Nutrient,
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },

    /// A bound is negative, infinite or NaN.
    #[error("{nutrient} bound {value} must be a finite, non-negative number")]
    InvalidBound {
        /// Bounded nutrient
        nutrient: Nutrient,
        /// Offending value
        value: f64,
    },

    /// The same nutrient was bounded twice in one request.
    #[error("{0} is bounded more than once")]
    DuplicateBound(Nutrient),

    /// The catalog has no values for a bounded nutrient.
    #[error("the menu does not list {0}")]
    UntrackedNutrient(Nutrient),
}

/// Bound requested for a nutrient. Absent sides fall back to configured defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundRequest {
    /// Bounded nutrient
    pub nutrient: Nutrient,

    /// Requested minimum total
    #[serde(default)]
    pub min: Option<f64>,

    /// Requested maximum total
    #[serde(default)]
    pub max: Option<f64>,
}

impl BoundRequest {
    /// Request both sides of a bound.
    pub fn between(nutrient: Nutrient, min: f64, max: f64) -> Self {
        Self {
            nutrient,
            min: Some(min),
            max: Some(max),
        }
    }

    /// Request only a minimum.
    pub fn at_least(nutrient: Nutrient, min: f64) -> Self {
        Self {
            nutrient,
            min: Some(min),
            max: None,
        }
    }

    /// Request only a maximum.
    pub fn at_most(nutrient: Nutrient, max: f64) -> Self {
        Self {
            nutrient,
            min: None,
            max: Some(max),
        }
    }
}

/// Raw selections as supplied by a user interface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selections {
    /// Identifiers of items that must be ordered
    pub required: Vec<String>,

    /// Identifiers of items that must not be ordered
    pub excluded: Vec<String>,

    /// Requested nutrient bounds
    pub bounds: Vec<BoundRequest>,
}

impl Selections {
    /// Empty selections: no items pinned and every bound at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required item.
    #[must_use]
    pub fn require(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    /// Add an excluded item.
    #[must_use]
    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.excluded.push(name.into());
        self
    }

    /// Add a bound request.
    #[must_use]
    pub fn bound(mut self, bound: BoundRequest) -> Self {
        self.bounds.push(bound);
        self
    }
}

/// Resolved bound on a nutrient total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutrientBound {
    /// Bounded nutrient
    pub nutrient: Nutrient,

    /// Lower bound on the total
    #[serde(default)]
    pub min: f64,

    /// Optional upper bound on the total
    #[serde(default)]
    pub max: Option<f64>,
}

impl NutrientBound {
    /// Bound with both sides.
    pub fn between(nutrient: Nutrient, min: f64, max: f64) -> Self {
        Self {
            nutrient,
            min,
            max: Some(max),
        }
    }

    /// Bound with only a minimum.
    pub fn at_least(nutrient: Nutrient, min: f64) -> Self {
        Self {
            nutrient,
            min,
            max: None,
        }
    }

    /// Whether `total` lies within this bound (with an absolute `tolerance`).
    pub fn contains(&self, total: f64, tolerance: f64) -> bool {
        total >= self.min - tolerance && self.max.is_none_or(|max| total <= max + tolerance)
    }
}

impl fmt::Display for NutrientBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = self.nutrient.unit();

        match self.max {
            Some(max) => write!(f, "{}–{} {unit}", self.min, max),
            None => write!(f, "≥ {} {unit}", self.min),
        }
    }
}

/// A catalog item selected by the user, resolved to its catalog position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    index: usize,
    name: String,
}

impl ItemRef {
    /// Catalog position.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Item identifier.
    pub fn name(&self) -> &str {
        &self.name
    }
}

type ItemRefs = SmallVec<[ItemRef; 3]>;

/// Validated optimisation request. Only [`ConstraintBuilder::build`] creates these.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSpec {
    required: ItemRefs,
    excluded: ItemRefs,
    bounds: SmallVec<[NutrientBound; 4]>,
}

impl ConstraintSpec {
    /// Items that must appear at least once.
    pub fn required(&self) -> &[ItemRef] {
        &self.required
    }

    /// Items that must not appear.
    pub fn excluded(&self) -> &[ItemRef] {
        &self.excluded
    }

    /// Nutrient bounds, defaults first in configuration order.
    pub fn bounds(&self) -> &[NutrientBound] {
        &self.bounds
    }

    /// Bound on a single nutrient, if any.
    pub fn bound(&self, nutrient: Nutrient) -> Option<&NutrientBound> {
        self.bounds.iter().find(|bound| bound.nutrient == nutrient)
    }
}

/// Builds [`ConstraintSpec`]s against a catalog using configured limits and defaults.
#[derive(Debug, Clone, Default)]
pub struct ConstraintBuilder {
    config: BuilderConfig,
}

impl ConstraintBuilder {
    /// Create a builder with the given configuration.
    pub fn new(config: BuilderConfig) -> Self {
        Self { config }
    }

    /// Validate raw selections and resolve them into a [`ConstraintSpec`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConstraintError`] if a list is too long or repeats an entry, an item is
    /// unknown or both required and excluded, or a bound is invalid, duplicated or targets a
    /// nutrient the catalog does not track. A request giving both sides is rejected when its
    /// minimum exceeds its maximum; a minimum above a default maximum is kept and left for the
    /// solver to report as infeasible.
    pub fn build(
        &self,
        catalog: &NutritionCatalog,
        selections: &Selections,
    ) -> Result<ConstraintSpec, ConstraintError> {
        let required = resolve_items(
            catalog,
            &selections.required,
            SelectionList::Required,
            self.config.max_required,
        )?;

        let excluded = resolve_items(
            catalog,
            &selections.excluded,
            SelectionList::Excluded,
            self.config.max_excluded,
        )?;

        if let Some(item) = required
            .iter()
            .find(|item| excluded.iter().any(|other| other.index == item.index))
        {
            return Err(ConstraintError::Overlap {
                name: item.name.clone(),
            });
        }

        let bounds = self.resolve_bounds(catalog, &selections.bounds)?;

        Ok(ConstraintSpec {
            required,
            excluded,
            bounds,
        })
    }

    fn resolve_bounds(
        &self,
        catalog: &NutritionCatalog,
        requests: &[BoundRequest],
    ) -> Result<SmallVec<[NutrientBound; 4]>, ConstraintError> {
        for (idx, request) in requests.iter().enumerate() {
            if requests
                .iter()
                .skip(idx + 1)
                .any(|other| other.nutrient == request.nutrient)
            {
                return Err(ConstraintError::DuplicateBound(request.nutrient));
            }

            if let (Some(min), Some(max)) = (request.min, request.max)
                && min > max
            {
                return Err(ConstraintError::InvertedBound {
                    nutrient: request.nutrient,
                    min,
                    max,
                });
            }
        }

        let mut bounds: SmallVec<[NutrientBound; 4]> = SmallVec::new();

        let defaulted = self.config.defaults.iter().map(|default| {
            let request = requests.iter().find(|r| r.nutrient == default.nutrient);

            NutrientBound {
                nutrient: default.nutrient,
                min: request.and_then(|r| r.min).unwrap_or(default.min),
                max: request.and_then(|r| r.max).or(default.max),
            }
        });

        let extra = requests
            .iter()
            .filter(|request| {
                !self
                    .config
                    .defaults
                    .iter()
                    .any(|default| default.nutrient == request.nutrient)
            })
            .map(|request| NutrientBound {
                nutrient: request.nutrient,
                min: request.min.unwrap_or(0.0),
                max: request.max,
            });

        for bound in defaulted.chain(extra) {
            validate_bound(catalog, &bound)?;

            bounds.push(bound);
        }

        Ok(bounds)
    }
}

fn resolve_items(
    catalog: &NutritionCatalog,
    names: &[String],
    list: SelectionList,
    limit: usize,
) -> Result<ItemRefs, ConstraintError> {
    if names.len() > limit {
        return Err(ConstraintError::TooManySelections {
            list,
            count: names.len(),
            limit,
        });
    }

    let mut resolved = ItemRefs::new();

    for name in names {
        let index = catalog
            .position(name)
            .ok_or_else(|| ConstraintError::UnknownItem {
                list,
                name: name.clone(),
            })?;

        if resolved.iter().any(|item| item.index == index) {
            return Err(ConstraintError::DuplicateSelection {
                list,
                name: name.clone(),
            });
        }

        resolved.push(ItemRef {
            index,
            name: name.clone(),
        });
    }

    Ok(resolved)
}

fn validate_bound(catalog: &NutritionCatalog, bound: &NutrientBound) -> Result<(), ConstraintError> {
    for value in std::iter::once(bound.min).chain(bound.max) {
        if !value.is_finite() || value < 0.0 {
            return Err(ConstraintError::InvalidBound {
                nutrient: bound.nutrient,
                value,
            });
        }
    }

    if !catalog.tracks(bound.nutrient) {
        return Err(ConstraintError::UntrackedNutrient(bound.nutrient));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{
        catalog::MenuItem,
        config::{BuilderConfig, Preset, SolveOptions},
        solvers::{Solver, ilp::MenuSolver},
    };

    use super::*;

    fn catalog() -> Result<NutritionCatalog, crate::catalog::CatalogLoadError> {
        NutritionCatalog::from_items(vec![
            MenuItem::new("Chicken")
                .with(Nutrient::Calories, 180.0)
                .with(Nutrient::TotalFat, 7.0)
                .with(Nutrient::Carbohydrates, 0.0)
                .with(Nutrient::Protein, 32.0),
            MenuItem::new("Rice")
                .with(Nutrient::Calories, 210.0)
                .with(Nutrient::TotalFat, 4.0)
                .with(Nutrient::Carbohydrates, 40.0)
                .with(Nutrient::Protein, 4.0),
            MenuItem::new("Guacamole")
                .with(Nutrient::Calories, 230.0)
                .with(Nutrient::TotalFat, 22.0)
                .with(Nutrient::Carbohydrates, 8.0)
                .with(Nutrient::Protein, 2.0),
        ])
    }

    #[test]
    fn absent_bounds_take_preset_defaults() -> TestResult {
        let builder = ConstraintBuilder::new(BuilderConfig::preset(Preset::Ranges));

        let spec = builder.build(&catalog()?, &Selections::new())?;

        assert_eq!(
            spec.bounds(),
            &[
                NutrientBound::between(Nutrient::TotalFat, 10.0, 70.0),
                NutrientBound::between(Nutrient::Carbohydrates, 50.0, 260.0),
                NutrientBound::between(Nutrient::Protein, 15.0, 85.0),
            ]
        );

        Ok(())
    }

    #[test]
    fn requested_sides_override_defaults_independently() -> TestResult {
        let builder = ConstraintBuilder::new(BuilderConfig::preset(Preset::Ranges));
        let selections = Selections::new()
            .bound(BoundRequest::at_least(Nutrient::Protein, 30.0))
            .bound(BoundRequest::at_most(Nutrient::Sugar, 5.0));

        let spec = builder.build(&catalog()?, &selections);

        // Sugar is not tracked by this catalog.
        assert_eq!(
            spec,
            Err(ConstraintError::UntrackedNutrient(Nutrient::Sugar))
        );

        let selections = Selections::new()
            .bound(BoundRequest::at_least(Nutrient::Protein, 30.0))
            .bound(BoundRequest::at_most(Nutrient::Calories, 900.0));

        let spec = builder.build(&catalog()?, &selections)?;

        assert_eq!(
            spec.bound(Nutrient::Protein),
            Some(&NutrientBound::between(Nutrient::Protein, 30.0, 85.0))
        );
        assert_eq!(
            spec.bound(Nutrient::Calories),
            Some(&NutrientBound {
                nutrient: Nutrient::Calories,
                min: 0.0,
                max: Some(900.0),
            })
        );
        assert_eq!(spec.bounds().len(), 4);

        Ok(())
    }

    #[test]
    fn minimums_preset_has_no_upper_bounds() -> TestResult {
        let builder = ConstraintBuilder::new(BuilderConfig::preset(Preset::Minimums));

        let spec = builder.build(&catalog()?, &Selections::new())?;

        assert!(spec.bounds().iter().all(|bound| bound.max.is_none()));
        assert_eq!(
            spec.bound(Nutrient::Carbohydrates),
            Some(&NutrientBound::at_least(Nutrient::Carbohydrates, 100.0))
        );

        Ok(())
    }

    #[test]
    fn resolves_items_to_catalog_positions() -> TestResult {
        let builder = ConstraintBuilder::default();
        let selections = Selections::new().require("Rice").exclude("Guacamole");

        let spec = builder.build(&catalog()?, &selections)?;

        assert_eq!(spec.required().first().map(ItemRef::index), Some(1));
        assert_eq!(spec.excluded().first().map(ItemRef::name), Some("Guacamole"));

        Ok(())
    }

    #[test]
    fn overlapping_lists_are_rejected() -> TestResult {
        let builder = ConstraintBuilder::default();
        let selections = Selections::new().require("Rice").exclude("Rice");

        assert_eq!(
            builder.build(&catalog()?, &selections),
            Err(ConstraintError::Overlap {
                name: "Rice".to_string()
            })
        );

        Ok(())
    }

    #[test]
    fn unknown_items_are_rejected() -> TestResult {
        let builder = ConstraintBuilder::default();
        let selections = Selections::new().exclude("Queso");

        assert_eq!(
            builder.build(&catalog()?, &selections),
            Err(ConstraintError::UnknownItem {
                list: SelectionList::Excluded,
                name: "Queso".to_string()
            })
        );

        Ok(())
    }

    #[test]
    fn repeated_entries_are_rejected() -> TestResult {
        let builder = ConstraintBuilder::default();
        let selections = Selections::new().require("Rice").require("Rice");

        assert!(matches!(
            builder.build(&catalog()?, &selections),
            Err(ConstraintError::DuplicateSelection {
                list: SelectionList::Required,
                ..
            })
        ));

        Ok(())
    }

    #[test]
    fn list_length_is_limited() -> TestResult {
        let config = BuilderConfig {
            max_required: 1,
            ..BuilderConfig::default()
        };
        let builder = ConstraintBuilder::new(config);
        let selections = Selections::new().require("Rice").require("Chicken");

        assert_eq!(
            builder.build(&catalog()?, &selections),
            Err(ConstraintError::TooManySelections {
                list: SelectionList::Required,
                count: 2,
                limit: 1,
            })
        );

        Ok(())
    }

    #[test]
    fn inverted_bounds_are_rejected() -> TestResult {
        let builder = ConstraintBuilder::default();
        let selections =
            Selections::new().bound(BoundRequest::between(Nutrient::TotalFat, 80.0, 20.0));

        assert!(matches!(
            builder.build(&catalog()?, &selections),
            Err(ConstraintError::InvertedBound {
                nutrient: Nutrient::TotalFat,
                ..
            })
        ));

        Ok(())
    }

    #[test]
    fn minimum_above_a_default_maximum_is_left_to_the_solver() -> TestResult {
        let catalog = catalog()?;
        let builder = ConstraintBuilder::new(BuilderConfig::preset(Preset::Ranges));
        let selections = Selections::new().bound(BoundRequest::at_least(Nutrient::Protein, 100.0));

        let spec = builder.build(&catalog, &selections)?;

        assert_eq!(
            spec.bound(Nutrient::Protein),
            Some(&NutrientBound {
                nutrient: Nutrient::Protein,
                min: 100.0,
                max: Some(85.0),
            })
        );

        let outcome = MenuSolver::new(SolveOptions::unlimited()).solve(&catalog, &spec)?;

        assert!(outcome.is_infeasible());

        Ok(())
    }

    #[test]
    fn negative_and_nan_bounds_are_rejected() -> TestResult {
        let builder = ConstraintBuilder::default();

        for value in [-1.0, f64::NAN, f64::INFINITY] {
            let selections =
                Selections::new().bound(BoundRequest::at_least(Nutrient::Protein, value));

            assert!(matches!(
                builder.build(&catalog()?, &selections),
                Err(ConstraintError::InvalidBound { .. })
            ));
        }

        Ok(())
    }

    #[test]
    fn a_nutrient_may_only_be_bounded_once() -> TestResult {
        let builder = ConstraintBuilder::default();
        let selections = Selections::new()
            .bound(BoundRequest::at_least(Nutrient::Protein, 10.0))
            .bound(BoundRequest::at_most(Nutrient::Protein, 50.0));

        assert_eq!(
            builder.build(&catalog()?, &selections),
            Err(ConstraintError::DuplicateBound(Nutrient::Protein))
        );

        Ok(())
    }

    #[test]
    fn selections_deserialize_from_yaml() -> TestResult {
        let yaml = "required: [Rice]\nbounds:\n  - { nutrient: protein, min: 20 }\n";

        let selections: Selections = serde_norway::from_str(yaml)?;

        assert_eq!(selections.required, vec!["Rice".to_string()]);
        assert!(selections.excluded.is_empty());
        assert_eq!(
            selections.bounds,
            vec![BoundRequest {
                nutrient: Nutrient::Protein,
                min: Some(20.0),
                max: None,
            }]
        );

        Ok(())
    }

    #[test]
    fn bound_contains_respects_tolerance() {
        let bound = NutrientBound::between(Nutrient::Protein, 10.0, 20.0);

        assert!(bound.contains(10.0, 0.0));
        assert!(bound.contains(20.000_000_1, 1e-6));
        assert!(!bound.contains(9.0, 1e-6));
        assert!(NutrientBound::at_least(Nutrient::Protein, 10.0).contains(1e9, 0.0));
    }
}
