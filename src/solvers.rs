//! Solvers for menu optimisation problems

use std::{fmt, io, time::Duration};

use good_lp::ResolutionError;
use serde::Serialize;
use thiserror::Error;

use crate::{catalog::NutritionCatalog, constraints::ConstraintSpec, nutrients::Nutrient};

pub mod ilp;

/// Solver Errors
///
/// None of these are expected for a well-formed request: the serving cap keeps every
/// program bounded. Seeing one means the pipeline itself is broken.
#[derive(Debug, Error)]
pub enum SolverError {
    /// The backend reported an unbounded objective.
    #[error("integer program is unbounded")]
    Unbounded,

    /// Wrapped solver resolution error
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The worker thread for a timed solve could not be started.
    #[error("failed to start solver thread: {0}")]
    Spawn(#[from] io::Error),

    /// Internal solver invariant was violated (this is a bug).
    #[error("solver invariant violated: {message}")]
    InvariantViolation {
        /// What invariant was violated
        message: String,
    },
}

impl SolverError {
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        SolverError::InvariantViolation {
            message: message.into(),
        }
    }
}

/// Named group a constraint row belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ConstraintGroup {
    /// At least one serving of an item
    Required {
        /// Item identifier
        item: String,
    },

    /// No servings of an item
    Excluded {
        /// Item identifier
        item: String,
    },

    /// Lower bound on a nutrient total
    Minimum {
        /// Bounded nutrient
        nutrient: Nutrient,
        /// Bound value
        value: f64,
    },

    /// Upper bound on a nutrient total
    Maximum {
        /// Bounded nutrient
        nutrient: Nutrient,
        /// Bound value
        value: f64,
    },
}

impl fmt::Display for ConstraintGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintGroup::Required { item } => write!(f, "must have {item}"),
            ConstraintGroup::Excluded { item } => write!(f, "don't want {item}"),
            ConstraintGroup::Minimum { nutrient, value } => {
                write!(f, "{nutrient} ≥ {value} {}", nutrient.unit())
            }
            ConstraintGroup::Maximum { nutrient, value } => {
                write!(f, "{nutrient} ≤ {value} {}", nutrient.unit())
            }
        }
    }
}

/// A constraint that cannot be met on its own, whatever the other items do.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conflict {
    /// The unattainable constraint
    pub group: ConstraintGroup,

    /// Smallest value the constrained total can take
    pub reachable_min: f64,

    /// Largest value the constrained total can take
    pub reachable_max: f64,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, but only {}–{} is reachable",
            self.group, self.reachable_min, self.reachable_max
        )
    }
}

/// Details of an infeasible request, to help a caller suggest which constraint to relax.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InfeasibilityReport {
    active: Vec<ConstraintGroup>,
    conflicts: Vec<Conflict>,
}

impl InfeasibilityReport {
    /// Create a report.
    pub fn new(active: Vec<ConstraintGroup>, conflicts: Vec<Conflict>) -> Self {
        Self { active, conflicts }
    }

    /// Every constraint group that was part of the program.
    pub fn active(&self) -> &[ConstraintGroup] {
        &self.active
    }

    /// Constraint groups that are unattainable on their own.
    ///
    /// Empty when infeasibility only arises from several constraints interacting.
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }
}

/// Raw optimal assignment: serving counts keyed by item, plus the objective value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    quantities: Vec<(String, u32)>,
    calories: f64,
}

impl Assignment {
    /// Create an assignment from per-item quantities and the objective value.
    pub fn new(quantities: Vec<(String, u32)>, calories: f64) -> Self {
        Self {
            quantities,
            calories,
        }
    }

    /// Quantity for every item in the program, in catalog order.
    pub fn quantities(&self) -> &[(String, u32)] {
        &self.quantities
    }

    /// Quantity chosen for one item (zero if absent).
    pub fn quantity(&self, name: &str) -> u32 {
        self.quantities
            .iter()
            .find(|(item, _)| item == name)
            .map_or(0, |&(_, quantity)| quantity)
    }

    /// Objective value: total calories.
    pub fn calories(&self) -> f64 {
        self.calories
    }
}

/// Result of a solve.
///
/// When several assignments share the optimal calorie total, which one is returned depends
/// on the solver backend; callers must not rely on the tie-break.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A minimum-calorie assignment
    Optimal(Assignment),

    /// No assignment satisfies every constraint
    Infeasible(InfeasibilityReport),

    /// The solve did not finish within its time budget
    TimedOut {
        /// Budget that was exceeded
        limit: Duration,
    },
}

impl Outcome {
    /// The optimal assignment, if one was found.
    pub fn optimal(&self) -> Option<&Assignment> {
        match self {
            Outcome::Optimal(assignment) => Some(assignment),
            _ => None,
        }
    }

    /// Whether the constraints were proven unsatisfiable.
    pub fn is_infeasible(&self) -> bool {
        matches!(self, Outcome::Infeasible(_))
    }
}

/// Trait for solving menu optimisation requests against a catalog
pub trait Solver {
    /// Find the lowest-calorie assignment satisfying `spec`.
    ///
    /// # Errors
    ///
    /// Returns a [`SolverError`] if the solver encounters an error.
    fn solve(
        &self,
        catalog: &NutritionCatalog,
        spec: &ConstraintSpec,
    ) -> Result<Outcome, SolverError>;
}
