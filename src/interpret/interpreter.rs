//! Maps solver values back to terminal decisions.

use super::intervals::merge_runs;
use super::report::{CompartmentPlacement, ShipCost, ShipPlan, SolutionReport};
use crate::formulation::{Formulation, VarIndex};
use crate::instance::Instance;
use crate::milp::{MilpSolution, SolverStatus};
use thiserror::Error;
use tracing::debug;

/// Threshold above which a binary reads as 1.
pub const ASSIGNMENT_THRESHOLD: f64 = 0.5;

/// Values at or below this contribute nothing to the cost decomposition.
pub const CONTRIBUTION_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpretError {
    #[error("solver returned no values (status: {0})")]
    NoSolution(SolverStatus),

    #[error("solution has {found} values, model has {expected} variables")]
    ValueCount { expected: usize, found: usize },
}

/// Reads a [`MilpSolution`] of a [`Formulation`].
pub struct SolutionInterpreter;

impl SolutionInterpreter {
    /// Builds the [`SolutionReport`].
    ///
    /// Assignments read binaries with [`ASSIGNMENT_THRESHOLD`]; the cost
    /// decomposition is recomputed from the raw `x`, `z` and `e` values.
    pub fn interpret(
        instance: &Instance,
        formulation: &Formulation,
        solution: &MilpSolution,
    ) -> Result<SolutionReport, InterpretError> {
        if !solution.is_solution_found() {
            return Err(InterpretError::NoSolution(solution.status));
        }
        let expected = formulation.model.variable_count();
        if solution.values.len() != expected {
            return Err(InterpretError::ValueCount {
                expected,
                found: solution.values.len(),
            });
        }

        let vars = &formulation.vars;
        let mut total = ShipCost::default();
        let ships: Vec<ShipPlan> = (0..instance.dims.num_ships)
            .map(|s| {
                let plan = ship_plan(instance, vars, solution, s);
                total.accumulate(&plan.cost);
                plan
            })
            .collect();

        debug!(
            transshipment = total.transshipment,
            storage = total.storage,
            berth_time = total.berth_time,
            weighted = total.weighted,
            "solution interpreted"
        );

        Ok(SolutionReport {
            status: solution.status,
            objective_value: solution.objective_value,
            alpha: instance.alpha,
            beta: instance.beta,
            ships,
            total,
        })
    }
}

fn ship_plan(instance: &Instance, vars: &VarIndex, sol: &MilpSolution, s: usize) -> ShipPlan {
    let d = instance.dims;

    let berths: Vec<usize> = (0..d.num_berths)
        .filter(|&b| sol.value(vars.z(s, b)) > ASSIGNMENT_THRESHOLD)
        .collect();

    let compartments = (0..d.num_ship_k)
        .map(|k| {
            let row = (0..d.num_rows).find(|&r| sol.value(vars.f(s, k, r)) > ASSIGNMENT_THRESHOLD);
            let mut slots = Vec::new();
            let mut stray = Vec::new();
            for r in 0..d.num_rows {
                for v in 0..d.num_slots_per_row {
                    if sol.value(vars.x(s, k, r, v)) <= ASSIGNMENT_THRESHOLD {
                        continue;
                    }
                    if Some(r) == row {
                        slots.push(v);
                    } else {
                        stray.push((r, v));
                    }
                }
            }
            CompartmentPlacement {
                compartment: k,
                row,
                intervals: merge_runs(&slots),
                slots,
                stray,
                start_time: sol.value(vars.e_sk(s, k)),
            }
        })
        .collect();

    ShipPlan {
        ship: s,
        berths,
        start_time: sol.value(vars.e(s)),
        compartments,
        cost: ship_cost(instance, vars, sol, s),
    }
}

fn ship_cost(instance: &Instance, vars: &VarIndex, sol: &MilpSolution, s: usize) -> ShipCost {
    let d = instance.dims;
    let significant = |v: f64| if v > CONTRIBUTION_EPSILON { Some(v) } else { None };

    let mut transshipment = 0.0;
    for k in 0..d.num_ship_k {
        if instance.required_slots[(s, k)] == 0 {
            continue;
        }
        let wt = instance.slot_weight(s, k);
        for b in 0..d.num_berths {
            let Some(z) = significant(sol.value(vars.z(s, b))) else {
                continue;
            };
            for r in 0..d.num_rows {
                for v in 0..d.num_slots_per_row {
                    if let Some(x) = significant(sol.value(vars.x(s, k, r, v))) {
                        transshipment += instance.transshipment_cost[(b, r, v)] * wt * x * z;
                    }
                }
            }
        }
    }

    let mut storage = 0.0;
    for k in 0..d.num_ship_k {
        for r in 0..d.num_rows {
            for v in 0..d.num_slots_per_row {
                if let Some(x) = significant(sol.value(vars.x(s, k, r, v))) {
                    storage += instance.storage_cost[(s, k, r)] * x;
                }
            }
        }
    }

    let mut berth_time = sol.value(vars.e(s)) - instance.arrival_time[s];
    for b in 0..d.num_berths {
        if let Some(z) = significant(sol.value(vars.z(s, b))) {
            berth_time += instance.processing_time(s, b) * z;
        }
    }

    ShipCost {
        transshipment,
        storage,
        berth_time,
        weighted: instance.alpha * (transshipment + storage) + instance.beta * berth_time,
    }
}
