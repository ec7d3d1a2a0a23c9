//! Integer Program
//!
//! A plain-data description of the menu problem: one bounded integer variable per catalog
//! item, a calorie objective and a list of named linear constraints. Building it touches
//! no solver state, so a program can be inspected, printed or moved to another thread
//! before it is handed to the backend.

use std::fmt;

use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable, constraint,
    variable,
};
use num_traits::ToPrimitive;
use smallvec::SmallVec;

#[cfg(feature = "solver-highs")]
use good_lp::solvers::highs::highs as default_solver;
#[cfg(all(not(feature = "solver-highs"), feature = "solver-microlp"))]
use good_lp::solvers::microlp::microlp as default_solver;

use crate::{
    catalog::NutritionCatalog,
    constraints::{ConstraintSpec, ItemRef},
    nutrients::Nutrient,
    solvers::{
        Assignment, Conflict, ConstraintGroup, InfeasibilityReport, SolverError,
        ilp::observer::{NoopObserver, ProgramObserver},
    },
};

/// Hard cap on servings of any single item.
pub const MAX_SERVINGS: u32 = 2;

/// Largest distance from an integer tolerated in a solver-reported variable value.
pub const INTEGRALITY_TOLERANCE: f64 = 1e-6;

/// Absolute slack allowed when re-checking constraints against a solution.
pub const FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// Relation operator for a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Less than or equal (`lhs <= rhs`)
    Leq,

    /// Greater than or equal (`lhs >= rhs`)
    Geq,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Leq => f.write_str("<="),
            Relation::Geq => f.write_str(">="),
        }
    }
}

/// Named linear constraint over serving variables.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    /// Group the row belongs to
    pub group: ConstraintGroup,

    /// `(variable index, coefficient)` pairs; zero coefficients are omitted
    pub terms: Vec<(usize, f64)>,

    /// Relation operator
    pub relation: Relation,

    /// Right-hand side scalar
    pub rhs: f64,
}

impl LinearConstraint {
    /// Left-hand side evaluated at `quantities`.
    pub fn lhs_value(&self, quantities: &[u32]) -> f64 {
        self.terms
            .iter()
            .map(|&(idx, coeff)| {
                coeff * quantities.get(idx).copied().map_or(0.0, f64::from)
            })
            .sum()
    }

    /// Whether `quantities` satisfy this row within `tolerance`.
    pub fn is_satisfied_by(&self, quantities: &[u32], tolerance: f64) -> bool {
        let lhs = self.lhs_value(quantities);

        match self.relation {
            Relation::Leq => lhs <= self.rhs + tolerance,
            Relation::Geq => lhs >= self.rhs - tolerance,
        }
    }
}

/// Integer decision variable: servings of one catalog item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServingVariable {
    /// Catalog position of the item
    pub item: usize,

    /// Item identifier
    pub name: String,

    /// Largest allowed value; the smallest is always zero
    pub max: u32,
}

/// Outcome of running a program through the backend, before any re-checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RawOutcome {
    Optimal(Vec<u32>),
    Infeasible,
}

/// Bounded integer minimisation problem.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    variables: Vec<ServingVariable>,
    objective: Vec<f64>,
    constraints: Vec<LinearConstraint>,
}

impl Program {
    /// Formulate the program for `spec` against `catalog`.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::InvariantViolation`] if `spec` does not belong to `catalog` or an
    /// item lacks a value for a nutrient the formulation needs.
    pub fn formulate(
        catalog: &NutritionCatalog,
        spec: &ConstraintSpec,
    ) -> Result<Self, SolverError> {
        Self::formulate_with_observer(catalog, spec, &mut NoopObserver)
    }

    /// Formulate the program, reporting each variable, objective term and constraint to
    /// `observer` as it is created.
    ///
    /// # Errors
    ///
    /// See [`Program::formulate`].
    pub fn formulate_with_observer<O: ProgramObserver + ?Sized>(
        catalog: &NutritionCatalog,
        spec: &ConstraintSpec,
        observer: &mut O,
    ) -> Result<Self, SolverError> {
        let mut program = Program::default();

        for (idx, item) in catalog.items().iter().enumerate() {
            let calories = item.get(Nutrient::Calories).ok_or_else(|| {
                SolverError::invariant(format!("`{}` has no calorie value", item.name()))
            })?;

            let var = ServingVariable {
                item: idx,
                name: item.name().to_string(),
                max: MAX_SERVINGS,
            };

            observer.on_variable(&var);
            observer.on_objective_term(idx, calories);

            program.variables.push(var);
            program.objective.push(calories);
        }

        for item in spec.required() {
            let idx = checked_index(catalog, item)?;

            program.push(
                observer,
                LinearConstraint {
                    group: ConstraintGroup::Required {
                        item: item.name().to_string(),
                    },
                    terms: vec![(idx, 1.0)],
                    relation: Relation::Geq,
                    rhs: 1.0,
                },
            );
        }

        for item in spec.excluded() {
            let idx = checked_index(catalog, item)?;

            program.push(
                observer,
                LinearConstraint {
                    group: ConstraintGroup::Excluded {
                        item: item.name().to_string(),
                    },
                    terms: vec![(idx, 1.0)],
                    relation: Relation::Leq,
                    rhs: 0.0,
                },
            );
        }

        for bound in spec.bounds() {
            let terms = nutrient_terms(catalog, bound.nutrient)?;

            program.push(
                observer,
                LinearConstraint {
                    group: ConstraintGroup::Minimum {
                        nutrient: bound.nutrient,
                        value: bound.min,
                    },
                    terms: terms.clone(),
                    relation: Relation::Geq,
                    rhs: bound.min,
                },
            );

            if let Some(max) = bound.max {
                program.push(
                    observer,
                    LinearConstraint {
                        group: ConstraintGroup::Maximum {
                            nutrient: bound.nutrient,
                            value: max,
                        },
                        terms,
                        relation: Relation::Leq,
                        rhs: max,
                    },
                );
            }
        }

        Ok(program)
    }

    fn push<O: ProgramObserver + ?Sized>(&mut self, observer: &mut O, row: LinearConstraint) {
        observer.on_constraint(&row);

        self.constraints.push(row);
    }

    /// Decision variables, in catalog order.
    pub fn variables(&self) -> &[ServingVariable] {
        &self.variables
    }

    /// Calorie coefficient of each variable.
    pub fn objective(&self) -> &[f64] {
        &self.objective
    }

    /// Constraint rows, in formulation order.
    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    /// Objective evaluated at `quantities`.
    pub fn objective_value(&self, quantities: &[u32]) -> f64 {
        self.objective
            .iter()
            .zip(quantities)
            .map(|(&coeff, &quantity)| coeff * f64::from(quantity))
            .sum()
    }

    /// First constraint row that `quantities` violate, if any.
    pub fn violated(&self, quantities: &[u32], tolerance: f64) -> Option<&LinearConstraint> {
        if quantities.len() != self.variables.len() {
            return self.constraints.first();
        }

        self.constraints
            .iter()
            .find(|row| !row.is_satisfied_by(quantities, tolerance))
    }

    /// Pair solver quantities with item identifiers.
    pub(crate) fn assignment(&self, quantities: &[u32]) -> Assignment {
        let calories = self.objective_value(quantities);

        let named = self
            .variables
            .iter()
            .zip(quantities)
            .map(|(var, &quantity)| (var.name.clone(), quantity))
            .collect();

        Assignment::new(named, calories)
    }

    /// Explain an infeasible program.
    ///
    /// Single-item rows tighten each variable's range first (a required item takes at least
    /// its right-hand side, an excluded one at most). Every row is then checked against the
    /// range its left-hand side can reach, with a minimum also capped by the maximum on the
    /// same nutrient; rows that cannot be met are reported as conflicts.
    pub fn infeasibility_report(&self) -> InfeasibilityReport {
        let mut ranges: Vec<(f64, f64)> = self
            .variables
            .iter()
            .map(|var| (0.0, f64::from(var.max)))
            .collect();

        for row in &self.constraints {
            let [(idx, coeff)] = row.terms.as_slice() else {
                continue;
            };

            let Some((lo, hi)) = ranges.get_mut(*idx) else {
                continue;
            };

            if *coeff <= 0.0 {
                continue;
            }

            let limit = row.rhs / coeff;

            match (&row.group, row.relation) {
                (ConstraintGroup::Required { .. }, Relation::Geq) => *lo = lo.max(limit.ceil()),
                (ConstraintGroup::Excluded { .. }, Relation::Leq) => *hi = hi.min(limit.floor()),
                _ => {}
            }
        }

        let conflicts = self
            .constraints
            .iter()
            .filter_map(|row| {
                let (reachable_min, mut reachable_max) = row.terms.iter().fold(
                    (0.0, 0.0),
                    |(min, max), &(idx, coeff)| {
                        let (lo, hi) = ranges.get(idx).copied().unwrap_or_default();
                        (min + coeff * lo, max + coeff * hi)
                    },
                );

                // A minimum can never exceed the maximum on the same nutrient.
                if let ConstraintGroup::Minimum { nutrient, .. } = &row.group
                    && let Some(cap) = self.maximum(*nutrient)
                {
                    reachable_max = f64::min(reachable_max, cap);
                }

                let unattainable = match row.relation {
                    Relation::Geq => reachable_max < row.rhs - FEASIBILITY_TOLERANCE,
                    Relation::Leq => reachable_min > row.rhs + FEASIBILITY_TOLERANCE,
                };

                unattainable.then(|| Conflict {
                    group: row.group.clone(),
                    reachable_min,
                    reachable_max,
                })
            })
            .collect();

        InfeasibilityReport::new(
            self.constraints.iter().map(|row| row.group.clone()).collect(),
            conflicts,
        )
    }

    fn maximum(&self, nutrient: Nutrient) -> Option<f64> {
        self.constraints.iter().find_map(|row| match row.group {
            ConstraintGroup::Maximum {
                nutrient: bounded,
                value,
            } if bounded == nutrient => Some(value),
            _ => None,
        })
    }

    /// Run the program through the MILP backend, blocking until it finishes.
    ///
    /// Infeasibility is an outcome, not an error. Every variable value returned by the
    /// backend is checked for integrality and range before it is trusted.
    pub(crate) fn solve(&self) -> Result<RawOutcome, SolverError> {
        // Nothing to choose: decide directly rather than building an empty model.
        if self.variables.is_empty() {
            return Ok(match self.violated(&[], FEASIBILITY_TOLERANCE) {
                None => RawOutcome::Optimal(Vec::new()),
                Some(_) => RawOutcome::Infeasible,
            });
        }

        let mut pb = ProblemVariables::new();

        let vars: SmallVec<[Variable; 32]> = self
            .variables
            .iter()
            .map(|var| pb.add(variable().integer().min(0).max(var.max)))
            .collect();

        let mut cost = Expression::default();

        for (var, coeff) in vars.iter().copied().zip(self.objective.iter().copied()) {
            cost += var * coeff;
        }

        let mut model = pb.minimise(cost).using(default_solver);

        for row in &self.constraints {
            let mut lhs = Expression::default();

            for &(idx, coeff) in &row.terms {
                let var = vars
                    .get(idx)
                    .copied()
                    .ok_or_else(|| SolverError::invariant("constraint references unknown variable"))?;

                lhs += var * coeff;
            }

            model = match row.relation {
                Relation::Leq => model.with(constraint::leq(lhs, row.rhs)),
                Relation::Geq => model.with(constraint::geq(lhs, row.rhs)),
            };
        }

        let solution = match model.solve() {
            Ok(solution) => solution,
            Err(ResolutionError::Infeasible) => return Ok(RawOutcome::Infeasible),
            Err(ResolutionError::Unbounded) => return Err(SolverError::Unbounded),
            Err(err) => return Err(err.into()),
        };

        let quantities = vars
            .iter()
            .zip(&self.variables)
            .map(|(&var, serving)| to_quantity(solution.value(var), serving))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RawOutcome::Optimal(quantities))
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let objective: Vec<(usize, f64)> = self.objective.iter().copied().enumerate().collect();

        writeln!(f, "minimise calories:")?;
        writeln!(f, "  {}", self.linear_sum(&objective))?;
        writeln!(f, "subject to:")?;

        for row in &self.constraints {
            writeln!(
                f,
                "  {}: {} {} {}",
                row.group,
                self.linear_sum(&row.terms),
                row.relation,
                row.rhs
            )?;
        }

        writeln!(f, "bounds:")?;

        for var in &self.variables {
            writeln!(f, "  0 <= [{}] <= {} integer", var.name, var.max)?;
        }

        Ok(())
    }
}

impl Program {
    fn linear_sum(&self, terms: &[(usize, f64)]) -> String {
        let rendered: Vec<String> = terms
            .iter()
            .filter(|&&(_, coeff)| coeff != 0.0)
            .map(|&(idx, coeff)| {
                let name = self.variables.get(idx).map_or("?", |var| var.name.as_str());
                format!("{coeff} [{name}]")
            })
            .collect();

        if rendered.is_empty() {
            "0".to_string()
        } else {
            rendered.join(" + ")
        }
    }
}

fn checked_index(catalog: &NutritionCatalog, item: &ItemRef) -> Result<usize, SolverError> {
    match catalog.get(item.index()) {
        Some(found) if found.name() == item.name() => Ok(item.index()),
        _ => Err(SolverError::invariant(format!(
            "constraint item `{}` does not match the catalog",
            item.name()
        ))),
    }
}

fn nutrient_terms(
    catalog: &NutritionCatalog,
    nutrient: Nutrient,
) -> Result<Vec<(usize, f64)>, SolverError> {
    let mut terms = Vec::with_capacity(catalog.len());

    for (idx, item) in catalog.items().iter().enumerate() {
        let value = item.get(nutrient).ok_or_else(|| {
            SolverError::invariant(format!("`{}` has no value for {nutrient}", item.name()))
        })?;

        if value != 0.0 {
            terms.push((idx, value));
        }
    }

    Ok(terms)
}

fn to_quantity(value: f64, serving: &ServingVariable) -> Result<u32, SolverError> {
    let rounded = value.round();

    if (value - rounded).abs() > INTEGRALITY_TOLERANCE {
        return Err(SolverError::invariant(format!(
            "solver returned non-integral servings {value} for `{}`",
            serving.name
        )));
    }

    rounded
        .to_u32()
        .filter(|&quantity| quantity <= serving.max)
        .ok_or_else(|| {
            SolverError::invariant(format!(
                "solver returned out-of-range servings {value} for `{}`",
                serving.name
            ))
        })
}
