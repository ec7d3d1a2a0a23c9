//! Nutrition Catalog

use std::{fs::File, io, path::Path};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::debug;

use crate::nutrients::{Nutrient, NutritionFacts};

/// Header of the column holding item identifiers.
pub const ITEM_COLUMN: &str = "Item";

/// Errors raised while loading a nutrition catalog.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    /// The source could not be opened or read.
    #[error("failed to read nutrition source: {0}")]
    Io(#[from] io::Error),

    /// The source is not well-formed CSV.
    #[error("malformed nutrition table: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from the header row.
    #[error("nutrition table is missing required column `{column}`")]
    MissingColumn {
        /// Expected header
        column: &'static str,
    },

    /// A row has a blank identifier.
    #[error("row {row} has an empty item identifier")]
    EmptyIdentifier {
        /// 1-based data row number
        row: usize,
    },

    /// Two rows share an identifier.
    #[error("duplicate menu item: {name}")]
    DuplicateItem {
        /// Repeated identifier
        name: String,
    },

    /// A cell could not be read as a finite number.
    #[error("item `{item}` has non-numeric value {value:?} in column `{column}`")]
    InvalidValue {
        /// Item identifier
        item: String,
        /// Column header
        column: &'static str,
        /// Raw cell contents
        value: String,
    },

    /// A cell holds a negative number.
    #[error("item `{item}` has negative value {value} in column `{column}`")]
    NegativeValue {
        /// Item identifier
        item: String,
        /// Column header
        column: &'static str,
        /// Parsed value
        value: f64,
    },

    /// An item lacks a value for a nutrient the catalog tracks.
    #[error("item `{item}` has no value for {nutrient}")]
    MissingValue {
        /// Item identifier
        item: String,
        /// Nutrient without a value
        nutrient: Nutrient,
    },
}

/// Errors raised by catalog lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// No item carries the given identifier.
    #[error("unknown menu item: {0}")]
    UnknownItem(String),

    /// The catalog has no column for the nutrient.
    #[error("catalog does not track {0}")]
    UntrackedNutrient(Nutrient),
}

/// A menu item and its nutrition facts.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    name: String,
    facts: NutritionFacts,
}

impl MenuItem {
    /// Create an item with no nutrition values recorded.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_facts(name, NutritionFacts::new())
    }

    /// Create an item from a prepared row of facts.
    pub fn with_facts(name: impl Into<String>, facts: NutritionFacts) -> Self {
        Self {
            name: name.into(),
            facts,
        }
    }

    /// Builder-style setter for a single nutrient.
    #[must_use]
    pub fn with(mut self, nutrient: Nutrient, value: f64) -> Self {
        self.facts.set(nutrient, value);
        self
    }

    /// Unique identifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All recorded nutrition values.
    pub fn facts(&self) -> &NutritionFacts {
        &self.facts
    }

    /// Value for a single nutrient.
    pub fn get(&self, nutrient: Nutrient) -> Option<f64> {
        self.facts.get(nutrient)
    }
}

/// Immutable, ordered table of menu items indexed by identifier.
#[derive(Debug, Clone, Default)]
pub struct NutritionCatalog {
    items: Vec<MenuItem>,
    index: FxHashMap<String, usize>,
    nutrients: SmallVec<[Nutrient; Nutrient::COUNT]>,
}

impl NutritionCatalog {
    /// Load a catalog from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogLoadError`] if the file cannot be opened or its contents fail
    /// validation (see [`NutritionCatalog::from_reader`]).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogLoadError> {
        let file = File::open(path.as_ref())?;

        Self::from_reader(file)
    }

    /// Load a catalog from CSV with one row per item.
    ///
    /// The header row must contain [`ITEM_COLUMN`] and the column of every required
    /// [`Nutrient`]. Optional nutrient columns are tracked when present; any other
    /// column is ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogLoadError`] if the CSV is malformed, a required column is
    /// missing, an identifier is blank or repeated, or a value is non-numeric or negative.
    pub fn from_reader(reader: impl io::Read) -> Result<Self, CatalogLoadError> {
        let mut table = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = table.headers()?.clone();

        let item_col = headers
            .iter()
            .position(|header| header == ITEM_COLUMN)
            .ok_or(CatalogLoadError::MissingColumn {
                column: ITEM_COLUMN,
            })?;

        let mut columns: SmallVec<[(Nutrient, usize); Nutrient::COUNT]> = SmallVec::new();

        for nutrient in Nutrient::ALL {
            match headers.iter().position(|header| header == nutrient.column()) {
                Some(col) => columns.push((nutrient, col)),
                None if nutrient.is_required() => {
                    return Err(CatalogLoadError::MissingColumn {
                        column: nutrient.column(),
                    });
                }
                None => {}
            }
        }

        let mut items = Vec::new();

        for (row_idx, record) in table.records().enumerate() {
            let record = record?;
            let row = row_idx + 1;

            let name = record.get(item_col).unwrap_or_default();

            if name.is_empty() {
                return Err(CatalogLoadError::EmptyIdentifier { row });
            }

            let mut facts = NutritionFacts::new();

            for &(nutrient, col) in &columns {
                let raw = record.get(col).unwrap_or_default();
                facts.set(nutrient, parse_value(name, nutrient, raw)?);
            }

            items.push(MenuItem::with_facts(name, facts));
        }

        let nutrients = columns.iter().map(|&(nutrient, _)| nutrient).collect();

        Self::from_parts(items, nutrients)
    }

    /// Build a catalog from in-memory items.
    ///
    /// The tracked nutrients are calories plus every nutrient recorded on any item; every
    /// item must then carry all of them.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogLoadError`] if an identifier is blank or repeated, an item lacks a
    /// tracked nutrient, or a value is non-finite or negative.
    pub fn from_items(items: impl Into<Vec<MenuItem>>) -> Result<Self, CatalogLoadError> {
        let items = items.into();

        let nutrients = Nutrient::ALL
            .into_iter()
            .filter(|&nutrient| {
                nutrient == Nutrient::Calories || items.iter().any(|item| item.get(nutrient).is_some())
            })
            .collect();

        Self::from_parts(items, nutrients)
    }

    fn from_parts(
        items: Vec<MenuItem>,
        nutrients: SmallVec<[Nutrient; Nutrient::COUNT]>,
    ) -> Result<Self, CatalogLoadError> {
        let mut index = FxHashMap::default();

        for (idx, item) in items.iter().enumerate() {
            if item.name.trim().is_empty() {
                return Err(CatalogLoadError::EmptyIdentifier { row: idx + 1 });
            }

            for &nutrient in &nutrients {
                let value = item.get(nutrient).ok_or_else(|| CatalogLoadError::MissingValue {
                    item: item.name.clone(),
                    nutrient,
                })?;

                check_value(&item.name, nutrient, value)?;
            }

            if index.insert(item.name.clone(), idx).is_some() {
                return Err(CatalogLoadError::DuplicateItem {
                    name: item.name.clone(),
                });
            }
        }

        debug!(
            items = items.len(),
            nutrients = nutrients.len(),
            "loaded nutrition catalog"
        );

        Ok(Self {
            items,
            index,
            nutrients,
        })
    }

    /// Items in catalog order.
    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the catalog has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Nutrients tracked for every item, in [`Nutrient::ALL`] order.
    pub fn nutrients(&self) -> &[Nutrient] {
        &self.nutrients
    }

    /// Whether every item carries a value for `nutrient`.
    pub fn tracks(&self, nutrient: Nutrient) -> bool {
        self.nutrients.contains(&nutrient)
    }

    /// Item at a catalog position.
    pub fn get(&self, idx: usize) -> Option<&MenuItem> {
        self.items.get(idx)
    }

    /// Catalog position of the item named `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Find an item by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::UnknownItem`] if no item has that identifier.
    pub fn lookup(&self, name: &str) -> Result<&MenuItem, LookupError> {
        self.position(name)
            .and_then(|idx| self.items.get(idx))
            .ok_or_else(|| LookupError::UnknownItem(name.to_string()))
    }

    /// Value of `nutrient` for the item named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::UnknownItem`] for an unknown identifier and
    /// [`LookupError::UntrackedNutrient`] if the catalog has no such column.
    pub fn nutrient(&self, name: &str, nutrient: Nutrient) -> Result<f64, LookupError> {
        self.lookup(name)?
            .get(nutrient)
            .ok_or(LookupError::UntrackedNutrient(nutrient))
    }
}

fn parse_value(item: &str, nutrient: Nutrient, raw: &str) -> Result<f64, CatalogLoadError> {
    let value = raw
        .parse::<f64>()
        .map_err(|_err| CatalogLoadError::InvalidValue {
            item: item.to_string(),
            column: nutrient.column(),
            value: raw.to_string(),
        })?;

    if !value.is_finite() {
        return Err(CatalogLoadError::InvalidValue {
            item: item.to_string(),
            column: nutrient.column(),
            value: raw.to_string(),
        });
    }

    Ok(value)
}

fn check_value(item: &str, nutrient: Nutrient, value: f64) -> Result<(), CatalogLoadError> {
    if !value.is_finite() {
        return Err(CatalogLoadError::InvalidValue {
            item: item.to_string(),
            column: nutrient.column(),
            value: value.to_string(),
        });
    }

    if value < 0.0 {
        return Err(CatalogLoadError::NegativeValue {
            item: item.to_string(),
            column: nutrient.column(),
            value,
        });
    }

    Ok(())
}
