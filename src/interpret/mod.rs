//! Solution interpretation.
//!
//! # Key Components
//!
//! - [`SolutionInterpreter`]: values to berth assignments, yard placements and
//!   start times, plus a per-ship cost decomposition
//! - [`merge_runs`] / [`format_intervals`]: occupied slots as `3;7-9`
//! - [`SolutionReport::verify`]: post-solve checks returning [`Violation`]s

mod interpreter;
mod intervals;
mod report;

pub use interpreter::{
    InterpretError, SolutionInterpreter, ASSIGNMENT_THRESHOLD, CONTRIBUTION_EPSILON,
};
pub use intervals::{format_intervals, merge_runs, SlotInterval};
pub use report::{CompartmentPlacement, ShipCost, ShipPlan, SolutionReport, Violation};
