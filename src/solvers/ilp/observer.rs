//! Formulation Observer

use tracing::trace;

use crate::solvers::ilp::program::{LinearConstraint, ServingVariable};

/// Observer trait for capturing the integer program as it's built.
///
/// Callbacks fire in formulation order: every variable with its objective term first, then
/// the constraint rows. Observers only record; the formulation itself lives in
/// [`Program`](super::program::Program).
pub trait ProgramObserver {
    /// Called when a serving variable is created for a catalog item.
    fn on_variable(&mut self, variable: &ServingVariable);

    /// Called when an item's calorie coefficient is added to the objective.
    ///
    /// # Parameters
    ///
    /// - `item_idx`: Catalog position of the item
    /// - `coefficient`: Calories per serving
    fn on_objective_term(&mut self, _item_idx: usize, _coefficient: f64) {}

    /// Called when a constraint row is added.
    fn on_constraint(&mut self, constraint: &LinearConstraint);
}

/// No-op observer for unobserved solves.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl ProgramObserver for NoopObserver {
    fn on_variable(&mut self, _: &ServingVariable) {}

    fn on_constraint(&mut self, _: &LinearConstraint) {}
}

/// Observer that emits the formulation as `trace` events.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl ProgramObserver for TracingObserver {
    fn on_variable(&mut self, variable: &ServingVariable) {
        trace!(item = %variable.name, max = variable.max, "serving variable");
    }

    fn on_objective_term(&mut self, item_idx: usize, coefficient: f64) {
        trace!(item_idx, coefficient, "objective term");
    }

    fn on_constraint(&mut self, constraint: &LinearConstraint) {
        trace!(
            group = %constraint.group,
            terms = constraint.terms.len(),
            relation = %constraint.relation,
            rhs = constraint.rhs,
            "constraint"
        );
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{
        catalog::{MenuItem, NutritionCatalog},
        constraints::{ConstraintBuilder, Selections},
        nutrients::Nutrient,
        solvers::ilp::program::Program,
    };

    use super::*;

    #[derive(Default)]
    struct RecordingObserver {
        variables: Vec<String>,
        objective: Vec<(usize, f64)>,
        constraints: Vec<String>,
    }

    impl ProgramObserver for RecordingObserver {
        fn on_variable(&mut self, variable: &ServingVariable) {
            self.variables.push(variable.name.clone());
        }

        fn on_objective_term(&mut self, item_idx: usize, coefficient: f64) {
            self.objective.push((item_idx, coefficient));
        }

        fn on_constraint(&mut self, constraint: &LinearConstraint) {
            self.constraints.push(constraint.group.to_string());
        }
    }

    #[test]
    fn observer_sees_the_whole_formulation() -> TestResult {
        let catalog = NutritionCatalog::from_items(vec![
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
        ])?;
        let spec = ConstraintBuilder::default().build(&catalog, &Selections::new().require("Rice"))?;

        let mut observer = RecordingObserver::default();
        let program = Program::formulate_with_observer(&catalog, &spec, &mut observer)?;

        assert_eq!(observer.variables, vec!["Chicken", "Rice"]);
        assert_eq!(observer.objective, vec![(0, 180.0), (1, 210.0)]);
        assert_eq!(observer.constraints.len(), program.constraints().len());
        assert_eq!(
            observer.constraints.first().map(String::as_str),
            Some("must have Rice")
        );

        Ok(())
    }

    #[test]
    fn tracing_observer_accepts_every_callback() -> TestResult {
        let catalog =
            NutritionCatalog::from_items(vec![MenuItem::new("Chips").with(Nutrient::Calories, 540.0)])?;
        let spec = ConstraintBuilder::new(crate::config::BuilderConfig {
            defaults: Vec::new(),
            ..crate::config::BuilderConfig::default()
        })
        .build(&catalog, &Selections::new().require("Chips"))?;

        let program = Program::formulate_with_observer(&catalog, &spec, &mut TracingObserver)?;

        assert_eq!(program.constraints().len(), 1);

        Ok(())
    }
}
