//! Planner
//!
//! Runs the full pipeline for one request: build constraints, solve, aggregate.

use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::{
    catalog::NutritionCatalog,
    config::PlannerConfig,
    constraints::{ConstraintBuilder, ConstraintError, ConstraintSpec, Selections},
    solution::{AggregationError, Solution},
    solvers::{InfeasibilityReport, Outcome, Solver, SolverError, ilp::MenuSolver},
};

/// Errors from a planning request.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The request was invalid; re-prompt the user.
    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    /// The solver failed (this is a bug).
    #[error(transparent)]
    Solver(#[from] SolverError),

    /// The solver's answer could not be aggregated (this is a bug).
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
}

/// Result of a planning request.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    /// Lowest-calorie menu meeting every constraint
    Optimal(Solution),

    /// No menu meets every constraint
    Infeasible(InfeasibilityReport),

    /// The solver ran out of time
    TimedOut {
        /// Budget that was exceeded
        limit: Duration,
    },
}

impl PlanOutcome {
    /// The solution, if one was found.
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            PlanOutcome::Optimal(solution) => Some(solution),
            _ => None,
        }
    }
}

/// Plans menus against a shared, read-only catalog.
#[derive(Debug, Clone)]
pub struct Planner<'c, S: Solver = MenuSolver> {
    catalog: &'c NutritionCatalog,
    builder: ConstraintBuilder,
    solver: S,
}

impl<'c> Planner<'c> {
    /// Create a planner using the MILP solver.
    pub fn new(catalog: &'c NutritionCatalog, config: &PlannerConfig) -> Self {
        Self::with_solver(
            catalog,
            ConstraintBuilder::new(config.constraints.clone()),
            MenuSolver::new(config.solver),
        )
    }
}

impl<'c, S: Solver> Planner<'c, S> {
    /// Create a planner with a custom solver.
    pub fn with_solver(catalog: &'c NutritionCatalog, builder: ConstraintBuilder, solver: S) -> Self {
        Self {
            catalog,
            builder,
            solver,
        }
    }

    /// Catalog being planned against.
    pub fn catalog(&self) -> &'c NutritionCatalog {
        self.catalog
    }

    /// Validate `selections` without solving.
    ///
    /// # Errors
    ///
    /// Returns a [`ConstraintError`] if the selections are invalid.
    pub fn constraints(&self, selections: &Selections) -> Result<ConstraintSpec, ConstraintError> {
        self.builder.build(self.catalog, selections)
    }

    /// Build, solve and aggregate one request.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Constraint`] for invalid selections; the solver is not invoked in
    /// that case. Other variants indicate a defect.
    #[tracing::instrument(
        name = "planner.plan",
        skip_all,
        fields(
            required = selections.required.len(),
            excluded = selections.excluded.len(),
            bounds = selections.bounds.len()
        )
    )]
    pub fn plan(&self, selections: &Selections) -> Result<PlanOutcome, PlanError> {
        let spec = self.constraints(selections)?;

        self.plan_spec(&spec)
    }

    /// Solve and aggregate an already validated request.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Solver`] or [`PlanError::Aggregation`] if the pipeline is broken.
    pub fn plan_spec(&self, spec: &ConstraintSpec) -> Result<PlanOutcome, PlanError> {
        let outcome = match self.solver.solve(self.catalog, spec)? {
            Outcome::Optimal(assignment) => {
                let solution = Solution::aggregate(self.catalog, &assignment)?;

                info!(
                    calories = solution.calories(),
                    items = solution.items().len(),
                    "planned menu"
                );

                PlanOutcome::Optimal(solution)
            }
            Outcome::Infeasible(report) => PlanOutcome::Infeasible(report),
            Outcome::TimedOut { limit } => PlanOutcome::TimedOut { limit },
        };

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use testresult::TestResult;

    use crate::{
        catalog::MenuItem,
        nutrients::Nutrient,
        solvers::Assignment,
    };

    use super::*;

    /// Solver double that counts calls and returns a fixed outcome.
    struct FixedSolver {
        outcome: Outcome,
        calls: Cell<usize>,
    }

    impl Solver for FixedSolver {
        fn solve(&self, _: &NutritionCatalog, _: &ConstraintSpec) -> Result<Outcome, SolverError> {
            self.calls.set(self.calls.get() + 1);

            Ok(self.outcome.clone())
        }
    }

    fn catalog() -> Result<NutritionCatalog, crate::catalog::CatalogLoadError> {
        NutritionCatalog::from_items(vec![
            MenuItem::new("A")
                .with(Nutrient::Calories, 300.0)
                .with(Nutrient::Protein, 20.0)
                .with(Nutrient::TotalFat, 5.0)
                .with(Nutrient::Carbohydrates, 10.0),
            MenuItem::new("B")
                .with(Nutrient::Calories, 500.0)
                .with(Nutrient::Protein, 5.0)
                .with(Nutrient::TotalFat, 20.0)
                .with(Nutrient::Carbohydrates, 40.0),
        ])
    }

    #[test]
    fn invalid_selections_never_reach_the_solver() -> TestResult {
        let catalog = catalog()?;
        let solver = FixedSolver {
            outcome: Outcome::TimedOut {
                limit: Duration::from_secs(1),
            },
            calls: Cell::new(0),
        };
        let planner = Planner::with_solver(&catalog, ConstraintBuilder::default(), solver);

        let result = planner.plan(&Selections::new().require("A").exclude("A"));

        assert!(matches!(
            result,
            Err(PlanError::Constraint(ConstraintError::Overlap { .. }))
        ));
        assert_eq!(planner.solver.calls.get(), 0);

        Ok(())
    }

    #[test]
    fn unknown_items_in_an_optimum_surface_as_aggregation_errors() -> TestResult {
        let catalog = catalog()?;
        let solver = FixedSolver {
            outcome: Outcome::Optimal(Assignment::new(vec![("Z".to_string(), 1)], 1.0)),
            calls: Cell::new(0),
        };
        let planner = Planner::with_solver(&catalog, ConstraintBuilder::default(), solver);

        let result = planner.plan(&Selections::new());

        assert!(matches!(
            result,
            Err(PlanError::Aggregation(AggregationError::UnknownItem(_)))
        ));

        Ok(())
    }

    #[test]
    fn timeouts_pass_through() -> TestResult {
        let catalog = catalog()?;
        let limit = Duration::from_millis(5);
        let solver = FixedSolver {
            outcome: Outcome::TimedOut { limit },
            calls: Cell::new(0),
        };
        let planner = Planner::with_solver(&catalog, ConstraintBuilder::default(), solver);

        assert_eq!(
            planner.plan(&Selections::new())?,
            PlanOutcome::TimedOut { limit }
        );

        Ok(())
    }

    #[test]
    fn default_planner_solves_with_milp() -> TestResult {
        let catalog = catalog()?;
        let config = PlannerConfig::from_yaml_str("constraints:\n  defaults: []\n")?;
        let planner = Planner::new(&catalog, &config);

        assert_eq!(planner.catalog().len(), 2);

        let outcome = planner.plan(&Selections::new().require("B"))?;

        assert_eq!(
            outcome.solution().map(|solution| solution.quantity("B")),
            Some(1)
        );

        Ok(())
    }
}
