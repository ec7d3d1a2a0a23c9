//! Solution Aggregator

use num_traits::ToPrimitive;
use rustc_hash::FxHashSet;
use serde::Serialize;
use thiserror::Error;

use crate::{catalog::NutritionCatalog, nutrients::Nutrient, solvers::Assignment};

/// Errors raised while aggregating a solver assignment.
///
/// These indicate a defect in the pipeline, not bad user input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregationError {
    /// The assignment names an item the catalog does not contain.
    #[error("solver chose unknown menu item `{0}`")]
    UnknownItem(String),

    /// The assignment lists the same item twice.
    #[error("solver assignment lists `{0}` more than once")]
    DuplicateItem(String),

    /// A chosen item has no value for a tracked nutrient.
    #[error("`{item}` has no value for {nutrient}")]
    MissingNutrient {
        /// Item identifier
        item: String,
        /// Nutrient without a value
        nutrient: Nutrient,
    },
}

/// An item chosen at least once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChosenItem {
    /// Item identifier
    pub name: String,

    /// Number of servings
    pub quantity: u32,

    #[serde(skip)]
    index: usize,
}

impl ChosenItem {
    /// Catalog position.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Total of one nutrient across every chosen serving.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NutrientTotal {
    /// Nutrient summed
    pub nutrient: Nutrient,

    /// Exact sum
    pub amount: f64,
}

/// Optimal menu: chosen items, calorie total and nutrition totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    items: Vec<ChosenItem>,
    calories: f64,
    totals: Vec<NutrientTotal>,
}

impl Solution {
    /// Aggregate a raw assignment against the catalog it was solved for.
    ///
    /// Items with zero servings are dropped and the rest are kept in catalog order. Totals
    /// are exact sums over every nutrient the catalog tracks.
    ///
    /// # Errors
    ///
    /// Returns an [`AggregationError`] if the assignment names an unknown or repeated item,
    /// or a chosen item is missing a tracked nutrient.
    pub fn aggregate(
        catalog: &NutritionCatalog,
        assignment: &Assignment,
    ) -> Result<Self, AggregationError> {
        let mut items: Vec<ChosenItem> = Vec::new();
        let mut seen = FxHashSet::default();

        for (name, quantity) in assignment.quantities() {
            let index = catalog
                .position(name)
                .ok_or_else(|| AggregationError::UnknownItem(name.clone()))?;

            if !seen.insert(index) {
                return Err(AggregationError::DuplicateItem(name.clone()));
            }

            if *quantity > 0 {
                items.push(ChosenItem {
                    name: name.clone(),
                    quantity: *quantity,
                    index,
                });
            }
        }

        items.sort_by_key(|item| item.index);

        let mut totals: Vec<NutrientTotal> = catalog
            .nutrients()
            .iter()
            .map(|&nutrient| NutrientTotal {
                nutrient,
                amount: 0.0,
            })
            .collect();

        for chosen in &items {
            let item = catalog
                .get(chosen.index)
                .ok_or_else(|| AggregationError::UnknownItem(chosen.name.clone()))?;

            for total in &mut totals {
                let value =
                    item.get(total.nutrient)
                        .ok_or_else(|| AggregationError::MissingNutrient {
                            item: chosen.name.clone(),
                            nutrient: total.nutrient,
                        })?;

                total.amount += value * f64::from(chosen.quantity);
            }
        }

        Ok(Self {
            items,
            calories: assignment.calories(),
            totals,
        })
    }

    /// Chosen items in catalog order.
    pub fn items(&self) -> &[ChosenItem] {
        &self.items
    }

    /// `(name, servings)` pairs for every chosen item, in catalog order.
    pub fn quantities(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.items
            .iter()
            .map(|item| (item.name.as_str(), item.quantity))
    }

    /// Servings of one item (zero if not chosen).
    pub fn quantity(&self, name: &str) -> u32 {
        self.items
            .iter()
            .find(|item| item.name == name)
            .map_or(0, |item| item.quantity)
    }

    /// Objective value: total calories.
    pub fn calories(&self) -> f64 {
        self.calories
    }

    /// Exact totals for every tracked nutrient.
    pub fn totals(&self) -> &[NutrientTotal] {
        &self.totals
    }

    /// Exact total for one nutrient.
    pub fn total(&self, nutrient: Nutrient) -> Option<f64> {
        self.totals
            .iter()
            .find(|total| total.nutrient == nutrient)
            .map(|total| total.amount)
    }

    /// Total for one nutrient rounded to whole units, for display.
    pub fn rounded_total(&self, nutrient: Nutrient) -> Option<i64> {
        self.total(nutrient)
            .and_then(|amount| amount.round().to_i64())
    }

    /// Whether nothing was chosen.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::catalog::MenuItem;

    use super::*;

    fn catalog() -> Result<NutritionCatalog, crate::catalog::CatalogLoadError> {
        NutritionCatalog::from_items(vec![
            MenuItem::new("Chicken")
                .with(Nutrient::Calories, 180.0)
                .with(Nutrient::Protein, 32.0)
                .with(Nutrient::Sodium, 310.5),
            MenuItem::new("Rice")
                .with(Nutrient::Calories, 210.0)
                .with(Nutrient::Protein, 4.0)
                .with(Nutrient::Sodium, 350.0),
            MenuItem::new("Salsa")
                .with(Nutrient::Calories, 25.0)
                .with(Nutrient::Protein, 0.0)
                .with(Nutrient::Sodium, 550.0),
        ])
    }

    #[test]
    fn keeps_nonzero_items_in_catalog_order() -> TestResult {
        let catalog = catalog()?;
        let assignment = Assignment::new(
            vec![
                ("Salsa".to_string(), 1),
                ("Rice".to_string(), 0),
                ("Chicken".to_string(), 2),
            ],
            385.0,
        );

        let solution = Solution::aggregate(&catalog, &assignment)?;

        let quantities: Vec<_> = solution.quantities().collect();

        assert_eq!(quantities, vec![("Chicken", 2), ("Salsa", 1)]);
        assert_eq!(solution.quantity("Rice"), 0);
        assert_eq!(solution.items().first().map(ChosenItem::index), Some(0));

        Ok(())
    }

    #[test]
    fn totals_cover_every_tracked_nutrient() -> TestResult {
        let catalog = catalog()?;
        let assignment = Assignment::new(
            vec![("Chicken".to_string(), 2), ("Salsa".to_string(), 1)],
            385.0,
        );

        let solution = Solution::aggregate(&catalog, &assignment)?;

        assert_eq!(solution.totals().len(), catalog.nutrients().len());
        assert_eq!(solution.rounded_total(Nutrient::Protein), Some(64));
        assert_eq!(solution.rounded_total(Nutrient::Calories), Some(385));
        assert!(
            solution
                .total(Nutrient::Sodium)
                .is_some_and(|sodium| (sodium - 1171.0).abs() <= f64::EPSILON)
        );
        assert_eq!(solution.total(Nutrient::Sugar), None);

        Ok(())
    }

    #[test]
    fn unknown_items_are_an_aggregation_error() -> TestResult {
        let catalog = catalog()?;
        let assignment = Assignment::new(vec![("Queso".to_string(), 1)], 120.0);

        assert_eq!(
            Solution::aggregate(&catalog, &assignment),
            Err(AggregationError::UnknownItem("Queso".to_string()))
        );

        Ok(())
    }

    #[test]
    fn repeated_items_are_an_aggregation_error() -> TestResult {
        let catalog = catalog()?;
        let assignment = Assignment::new(
            vec![("Rice".to_string(), 1), ("Rice".to_string(), 1)],
            420.0,
        );

        assert_eq!(
            Solution::aggregate(&catalog, &assignment),
            Err(AggregationError::DuplicateItem("Rice".to_string()))
        );

        Ok(())
    }

    #[test]
    fn empty_assignment_has_zero_totals() -> TestResult {
        let catalog = catalog()?;

        let solution = Solution::aggregate(&catalog, &Assignment::new(Vec::new(), 0.0))?;

        assert!(solution.is_empty());
        assert!(solution.totals().iter().all(|total| total.amount == 0.0));

        Ok(())
    }

    #[test]
    fn serializes_quantities_by_name() -> TestResult {
        let catalog = catalog()?;
        let assignment = Assignment::new(vec![("Rice".to_string(), 2)], 420.0);

        let solution = Solution::aggregate(&catalog, &assignment)?;
        let yaml = serde_norway::to_string(&solution)?;

        assert!(yaml.contains("name: Rice"));
        assert!(yaml.contains("quantity: 2"));
        assert!(!yaml.contains("index"));

        Ok(())
    }
}
