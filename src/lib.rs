//! Macroplan
//!
//! Macroplan finds the lowest-calorie combination of menu items that satisfies a set of
//! nutrition bounds, modelled as an integer program.

pub mod catalog;
pub mod config;
pub mod constraints;
pub mod fixtures;
pub mod nutrients;
pub mod planner;
pub mod prelude;
pub mod report;
pub mod solution;
pub mod solvers;
pub mod utils;
