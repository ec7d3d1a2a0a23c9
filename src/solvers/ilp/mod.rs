//! ILP Solver

use std::{
    sync::{
        Arc,
        mpsc::{self, RecvTimeoutError},
    },
    thread,
    time::Duration,
};

use tracing::{Span, debug, info, warn};

use crate::{
    catalog::NutritionCatalog,
    config::SolveOptions,
    constraints::ConstraintSpec,
    solvers::{Outcome, Solver, SolverError},
};

pub mod observer;
pub mod program;

pub use observer::{NoopObserver, ProgramObserver, TracingObserver};
pub use program::{LinearConstraint, MAX_SERVINGS, Program, Relation, ServingVariable};

use program::{FEASIBILITY_TOLERANCE, RawOutcome};

/// Name given to worker threads running timed solves.
const WORKER_THREAD_NAME: &str = "macroplan-solve";

/// Solver using Integer Linear Programming (ILP)
#[derive(Debug, Clone, Default)]
pub struct MenuSolver {
    options: SolveOptions,
}

impl MenuSolver {
    /// Create a solver with the given options.
    pub fn new(options: SolveOptions) -> Self {
        Self { options }
    }

    /// Solve with an observer for capturing the formulation.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError`] if the program cannot be formulated, the backend fails, or its
    /// answer does not survive re-checking.
    #[tracing::instrument(
        name = "menu_solver.solve",
        skip_all,
        fields(items = catalog.len(), constraints = tracing::field::Empty)
    )]
    pub fn solve_with_observer(
        &self,
        catalog: &NutritionCatalog,
        spec: &ConstraintSpec,
        observer: &mut dyn ProgramObserver,
    ) -> Result<Outcome, SolverError> {
        let program = Program::formulate_with_observer(catalog, spec, observer)?;

        Span::current().record("constraints", program.constraints().len());

        self.solve_program(program)
    }

    /// Solve an already formulated program.
    ///
    /// Without a time limit the backend runs on the calling thread. With one, it runs on a
    /// worker thread and the call returns [`Outcome::TimedOut`] once the limit passes; the
    /// worker is left to finish on its own.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError`] if the backend fails or returns an assignment that is not
    /// integral, out of range or violates a constraint.
    pub fn solve_program(&self, program: Program) -> Result<Outcome, SolverError> {
        self.solve_program_with(program, Program::solve)
    }

    fn solve_program_with<F>(&self, program: Program, backend: F) -> Result<Outcome, SolverError>
    where
        F: FnOnce(&Program) -> Result<RawOutcome, SolverError> + Send + 'static,
    {
        let program = Arc::new(program);

        debug!(
            variables = program.variables().len(),
            constraints = program.constraints().len(),
            timeout = ?self.options.timeout(),
            "solving integer program"
        );

        let raw = match self.options.timeout() {
            None => backend(&program)?,
            Some(limit) => {
                let worker = Arc::clone(&program);

                match run_with_deadline(limit, move || backend(&worker))? {
                    Some(raw) => raw,
                    None => {
                        warn!(?limit, "solve exceeded its time budget");

                        return Ok(Outcome::TimedOut { limit });
                    }
                }
            }
        };

        match raw {
            RawOutcome::Optimal(quantities) => {
                if let Some(row) = program.violated(&quantities, FEASIBILITY_TOLERANCE) {
                    return Err(SolverError::invariant(format!(
                        "solver reported an optimum that violates `{}`",
                        row.group
                    )));
                }

                let assignment = program.assignment(&quantities);

                info!(calories = assignment.calories(), "found optimal menu");

                Ok(Outcome::Optimal(assignment))
            }
            RawOutcome::Infeasible => {
                let report = program.infeasibility_report();

                info!(
                    conflicts = report.conflicts().len(),
                    "no menu satisfies the constraints"
                );

                Ok(Outcome::Infeasible(report))
            }
        }
    }
}

impl Solver for MenuSolver {
    fn solve(
        &self,
        catalog: &NutritionCatalog,
        spec: &ConstraintSpec,
    ) -> Result<Outcome, SolverError> {
        self.solve_with_observer(catalog, spec, &mut NoopObserver)
    }
}

/// Run `job` on a worker thread, waiting at most `limit` for its result.
///
/// Returns `Ok(None)` if the limit passes first.
fn run_with_deadline<T, F>(limit: Duration, job: F) -> Result<Option<T>, SolverError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SolverError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();

    let _worker = thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_string())
        .spawn(move || {
            if tx.send(job()).is_err() {
                debug!("solve finished after its caller stopped waiting");
            }
        })?;

    match rx.recv_timeout(limit) {
        Ok(result) => result.map(Some),
        Err(RecvTimeoutError::Timeout) => Ok(None),
        Err(RecvTimeoutError::Disconnected) => Err(SolverError::invariant(
            "solver thread exited without a result",
        )),
    }
}
