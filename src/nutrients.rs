//! Nutrients

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a string does not name a known nutrient.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown nutrient: {0}")]
pub struct ParseNutrientError(pub String);

/// A nutrition field tracked per menu item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nutrient {
    /// Total energy
    #[serde(alias = "calorie")]
    Calories,

    /// Energy from fat
    FatCalories,

    /// Total fat
    #[serde(alias = "fat")]
    TotalFat,

    /// Saturated fat
    SaturatedFat,

    /// Trans fat
    TransFat,

    /// Fat that is not saturated
    NonSaturatedFat,

    /// Cholesterol
    Cholesterol,

    /// Sodium
    Sodium,

    /// Carbohydrates
    #[serde(alias = "carbs", alias = "carbohydrate")]
    Carbohydrates,

    /// Dietary fiber
    #[serde(alias = "fiber")]
    DietaryFiber,

    /// Sugar
    #[serde(alias = "sugars")]
    Sugar,

    /// Protein
    Protein,
}

impl Nutrient {
    /// Number of nutrient variants.
    pub const COUNT: usize = 12;

    /// Every nutrient, in catalog column order.
    pub const ALL: [Nutrient; Self::COUNT] = [
        Nutrient::Calories,
        Nutrient::FatCalories,
        Nutrient::TotalFat,
        Nutrient::SaturatedFat,
        Nutrient::TransFat,
        Nutrient::NonSaturatedFat,
        Nutrient::Cholesterol,
        Nutrient::Sodium,
        Nutrient::Carbohydrates,
        Nutrient::DietaryFiber,
        Nutrient::Sugar,
        Nutrient::Protein,
    ];

    /// CSV column header carrying this nutrient.
    pub fn column(self) -> &'static str {
        match self {
            Nutrient::Calories => "Total Calories (cal)",
            Nutrient::FatCalories => "Fat Calories (cal)",
            Nutrient::TotalFat => "Total Fats (g)",
            Nutrient::SaturatedFat => "Saturated Fats (g)",
            Nutrient::TransFat => "Trans Fats (g)",
            Nutrient::NonSaturatedFat => "Non-Saturated Fats (g)",
            Nutrient::Cholesterol => "Cholesterol (mg)",
            Nutrient::Sodium => "Sodium (g)",
            Nutrient::Carbohydrates => "Carbohydrates (g)",
            Nutrient::DietaryFiber => "Dietary Fiber (g)",
            Nutrient::Sugar => "Sugar (g)",
            Nutrient::Protein => "Protein (g)",
        }
    }

    /// Human readable label.
    pub fn label(self) -> &'static str {
        match self {
            Nutrient::Calories => "Calories",
            Nutrient::FatCalories => "Fat Calories",
            Nutrient::TotalFat => "Total Fat",
            Nutrient::SaturatedFat => "Saturated Fat",
            Nutrient::TransFat => "Trans Fat",
            Nutrient::NonSaturatedFat => "Non-Saturated Fat",
            Nutrient::Cholesterol => "Cholesterol",
            Nutrient::Sodium => "Sodium",
            Nutrient::Carbohydrates => "Carbohydrates",
            Nutrient::DietaryFiber => "Dietary Fiber",
            Nutrient::Sugar => "Sugar",
            Nutrient::Protein => "Protein",
        }
    }

    /// Unit the catalog reports this nutrient in.
    pub fn unit(self) -> &'static str {
        match self {
            Nutrient::Calories | Nutrient::FatCalories => "cal",
            Nutrient::Cholesterol => "mg",
            _ => "g",
        }
    }

    /// Whether every catalog must carry a column for this nutrient.
    pub fn is_required(self) -> bool {
        matches!(
            self,
            Nutrient::Calories
                | Nutrient::TotalFat
                | Nutrient::SaturatedFat
                | Nutrient::Carbohydrates
                | Nutrient::Sugar
                | Nutrient::Protein
                | Nutrient::Sodium
        )
    }

    /// Identifier used in configuration files and on the command line.
    pub fn key(self) -> &'static str {
        match self {
            Nutrient::Calories => "calories",
            Nutrient::FatCalories => "fat_calories",
            Nutrient::TotalFat => "total_fat",
            Nutrient::SaturatedFat => "saturated_fat",
            Nutrient::TransFat => "trans_fat",
            Nutrient::NonSaturatedFat => "non_saturated_fat",
            Nutrient::Cholesterol => "cholesterol",
            Nutrient::Sodium => "sodium",
            Nutrient::Carbohydrates => "carbohydrates",
            Nutrient::DietaryFiber => "dietary_fiber",
            Nutrient::Sugar => "sugar",
            Nutrient::Protein => "protein",
        }
    }

    /// Position of this nutrient in [`Nutrient::ALL`].
    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Nutrient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Nutrient {
    type Err = ParseNutrientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");

        let nutrient = match normalised.as_str() {
            "calorie" => Nutrient::Calories,
            "fat" => Nutrient::TotalFat,
            "carbs" | "carbohydrate" => Nutrient::Carbohydrates,
            "fiber" => Nutrient::DietaryFiber,
            "sugars" => Nutrient::Sugar,
            other => Nutrient::ALL
                .into_iter()
                .find(|nutrient| nutrient.key() == other)
                .ok_or_else(|| ParseNutrientError(s.to_string()))?,
        };

        Ok(nutrient)
    }
}

/// Nutrition values for a single menu item, one optional slot per [`Nutrient`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NutritionFacts {
    values: [Option<f64>; Nutrient::COUNT],
}

impl NutritionFacts {
    /// Create an empty set of facts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value recorded for `nutrient`, if any.
    pub fn get(&self, nutrient: Nutrient) -> Option<f64> {
        self.values.get(nutrient.slot()).copied().flatten()
    }

    /// Record the value for `nutrient`, replacing any previous value.
    pub fn set(&mut self, nutrient: Nutrient, value: f64) {
        if let Some(slot) = self.values.get_mut(nutrient.slot()) {
            *slot = Some(value);
        }
    }

    /// Builder-style [`NutritionFacts::set`].
    #[must_use]
    pub fn with(mut self, nutrient: Nutrient, value: f64) -> Self {
        self.set(nutrient, value);
        self
    }

    /// Iterate the recorded nutrients in [`Nutrient::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Nutrient, f64)> + '_ {
        Nutrient::ALL
            .into_iter()
            .filter_map(|nutrient| self.get(nutrient).map(|value| (nutrient, value)))
    }
}
