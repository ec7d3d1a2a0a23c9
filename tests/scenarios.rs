//! Two-item menu scenarios solved end to end.

use testresult::TestResult;

use macroplan::{
    catalog::NutritionCatalog,
    config::{BuilderConfig, PlannerConfig, SolveOptions},
    constraints::{BoundRequest, ConstraintError, Selections},
    fixtures::Fixture,
    nutrients::Nutrient,
    planner::{PlanError, PlanOutcome, Planner},
    solvers::ConstraintGroup,
};

fn two_items() -> TestResult<(NutritionCatalog, PlannerConfig)> {
    let fixture = Fixture::new();

    Ok((fixture.catalog("two_items")?, fixture.preset("two_items")?))
}

fn unbounded() -> PlannerConfig {
    PlannerConfig {
        constraints: BuilderConfig {
            defaults: Vec::new(),
            ..BuilderConfig::default()
        },
        solver: SolveOptions::unlimited(),
    }
}

#[test]
fn cheapest_item_meeting_every_minimum_wins() -> TestResult {
    let (catalog, config) = two_items()?;
    let planner = Planner::new(&catalog, &config);

    let outcome = planner.plan(&Selections::new())?;

    let Some(solution) = outcome.solution() else {
        return Err(format!("expected an optimal menu, got {outcome:?}").into());
    };

    assert_eq!(solution.quantity("A"), 1);
    assert_eq!(solution.quantity("B"), 0);
    assert!((solution.calories() - 300.0).abs() <= f64::EPSILON);

    Ok(())
}

#[test]
fn required_item_is_ordered_even_when_costly() -> TestResult {
    let (catalog, _) = two_items()?;
    let config = unbounded();
    let planner = Planner::new(&catalog, &config);

    let outcome = planner.plan(&Selections::new().require("B").exclude("A"))?;

    let Some(solution) = outcome.solution() else {
        return Err(format!("expected an optimal menu, got {outcome:?}").into());
    };

    assert_eq!(solution.quantity("A"), 0);
    assert!(solution.quantity("B") >= 1);
    assert!(solution.calories() >= 500.0);

    Ok(())
}

#[test]
fn requiring_and_excluding_one_item_is_rejected() -> TestResult {
    let (catalog, config) = two_items()?;
    let planner = Planner::new(&catalog, &config);

    let result = planner.plan(&Selections::new().require("A").exclude("A"));

    assert!(matches!(
        result,
        Err(PlanError::Constraint(ConstraintError::Overlap { ref name })) if name == "A"
    ));

    Ok(())
}

#[test]
fn unreachable_protein_is_infeasible_not_an_error() -> TestResult {
    let (catalog, config) = two_items()?;
    let planner = Planner::new(&catalog, &config);

    let outcome =
        planner.plan(&Selections::new().bound(BoundRequest::at_least(Nutrient::Protein, 1000.0)))?;

    let PlanOutcome::Infeasible(report) = outcome else {
        return Err(format!("expected infeasible, got {outcome:?}").into());
    };

    let protein = report.conflicts().iter().find(|conflict| {
        matches!(
            conflict.group,
            ConstraintGroup::Minimum {
                nutrient: Nutrient::Protein,
                ..
            }
        )
    });

    assert!(protein.is_some_and(|conflict| conflict.reachable_max < 1000.0));
    assert_eq!(report.active().len(), 3);

    Ok(())
}

#[test]
fn excluding_the_only_protein_source_explains_the_conflict() -> TestResult {
    let (catalog, config) = two_items()?;
    let planner = Planner::new(&catalog, &config);

    let outcome = planner.plan(&Selections::new().exclude("A"))?;

    let PlanOutcome::Infeasible(report) = outcome else {
        return Err(format!("expected infeasible, got {outcome:?}").into());
    };

    assert!(
        report
            .active()
            .contains(&ConstraintGroup::Excluded {
                item: "A".to_string()
            })
    );
    assert_eq!(report.conflicts().len(), 1);

    Ok(())
}
