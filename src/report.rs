//! Report

use std::io;

use tabled::{
    builder::Builder,
    settings::{
        Alignment, Color, Style,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    constraints::ConstraintSpec, nutrients::Nutrient, solution::Solution,
    solvers::InfeasibilityReport,
};

/// Errors that can occur when writing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// IO error
    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),
}

/// Terminal rendering of a solved menu.
#[derive(Debug, Clone, Copy)]
pub struct SolutionReport<'a> {
    solution: &'a Solution,
    spec: Option<&'a ConstraintSpec>,
}

impl<'a> SolutionReport<'a> {
    /// Report on a solution without bound annotations.
    pub fn new(solution: &'a Solution) -> Self {
        Self {
            solution,
            spec: None,
        }
    }

    /// Annotate nutrient totals with the bounds they were solved against.
    #[must_use]
    pub fn with_constraints(mut self, spec: &'a ConstraintSpec) -> Self {
        self.spec = Some(spec);
        self
    }

    /// Write the calorie headline, chosen items and nutrition totals.
    ///
    /// # Errors
    ///
    /// Returns a [`ReportError`] if writing to `out` fails.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReportError> {
        let calories = self
            .solution
            .rounded_total(Nutrient::Calories)
            .unwrap_or_default();

        writeln!(out, "\nTotal Calories: {calories}")?;

        if self.solution.is_empty() {
            writeln!(out, "\nNo items needed.")?;
        } else {
            writeln!(out, "\n{}", self.items_table())?;
        }

        writeln!(out, "{}", self.totals_table())?;

        Ok(())
    }

    fn items_table(&self) -> String {
        let mut builder = Builder::default();

        builder.push_record(["", "Item", "Servings"]);

        for (position, (name, quantity)) in self.solution.quantities().enumerate() {
            builder.push_record([
                format!("#{:<3}", position + 1),
                name.to_string(),
                quantity.to_string(),
            ]);
        }

        let mut table = builder.build();

        table.with(Style::modern_rounded());
        table.modify(Rows::first(), Color::BOLD);
        table.modify(Columns::new(2..3), Alignment::right());

        table.to_string()
    }

    fn totals_table(&self) -> String {
        let mut builder = Builder::default();

        builder.push_record(["Nutrient", "Total", "Bound"]);

        for total in self.solution.totals() {
            let rounded = self
                .solution
                .rounded_total(total.nutrient)
                .unwrap_or_default();

            let bound = self
                .spec
                .and_then(|spec| spec.bound(total.nutrient))
                .map(ToString::to_string)
                .unwrap_or_default();

            builder.push_record([
                total.nutrient.label().to_string(),
                format!("{rounded} {}", total.nutrient.unit()),
                bound,
            ]);
        }

        let mut table = builder.build();

        table.with(Style::modern_rounded());
        table.modify(Rows::first(), Color::BOLD);
        table.modify(Columns::new(1..2), Alignment::right());

        table.to_string()
    }
}

/// Write an explanation of an infeasible request.
///
/// # Errors
///
/// Returns a [`ReportError`] if writing to `out` fails.
pub fn write_infeasibility(
    mut out: impl io::Write,
    report: &InfeasibilityReport,
) -> Result<(), ReportError> {
    writeln!(out, "\nNo menu satisfies every constraint.")?;

    if report.conflicts().is_empty() {
        writeln!(out, "Constraints in play:")?;

        for group in report.active() {
            writeln!(out, "  - {group}")?;
        }
    } else {
        writeln!(out, "Try relaxing:")?;

        for conflict in report.conflicts() {
            writeln!(out, "  - {conflict}")?;
        }
    }

    Ok(())
}
