//! Macroplan prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    catalog::{CatalogLoadError, LookupError, MenuItem, NutritionCatalog},
    config::{BuilderConfig, ConfigError, PlannerConfig, Preset, SolveOptions},
    constraints::{
        BoundRequest, ConstraintBuilder, ConstraintError, ConstraintSpec, NutrientBound,
        Selections,
    },
    fixtures::{Fixture, FixtureError},
    nutrients::{Nutrient, NutritionFacts},
    planner::{PlanError, PlanOutcome, Planner},
    report::{ReportError, SolutionReport, write_infeasibility},
    solution::{AggregationError, Solution},
    solvers::{
        Assignment, ConstraintGroup, InfeasibilityReport, Outcome, Solver, SolverError,
        ilp::{MenuSolver, NoopObserver, Program, ProgramObserver, TracingObserver},
    },
};
