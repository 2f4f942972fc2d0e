//! [`SolverBackend`] on top of `good_lp` with the pure-Rust `microlp` solver.

use super::model::{Relation, Sense};
use super::solver::{SolverBackend, SolverStatus, VarHandle};
use good_lp::solvers::microlp::microlp;
use good_lp::{
    constraint, variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel,
    Variable,
};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
struct Column {
    name: String,
    binary: bool,
    lower: f64,
    upper: f64,
}

#[derive(Debug, Clone)]
struct Row {
    terms: Vec<(usize, f64)>,
    relation: Relation,
    rhs: f64,
}

#[derive(Debug, Clone, Default)]
struct Problem {
    columns: Vec<Column>,
    rows: Vec<Row>,
    objective: Vec<(usize, f64)>,
    constant: f64,
    maximize: bool,
}

/// `good_lp` + `microlp` backend.
///
/// The problem is buffered and handed to `microlp` on a worker thread; the
/// caller waits at most the time limit for it. `microlp` exposes no
/// incumbent, so an expired solve reports
/// [`SolverStatus::TimeLimitReached`] without values. The worker cannot be
/// interrupted and finishes in the background.
///
/// A completed solve is proven optimal: the best bound equals the objective
/// and the gap is zero.
#[derive(Debug, Default)]
pub struct GoodLpBackend {
    problem: Problem,
    values: Option<Vec<f64>>,
}

impl GoodLpBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variable_count(&self) -> usize {
        self.problem.columns.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.problem.rows.len()
    }
}

enum Outcome {
    Solved(Vec<f64>),
    Infeasible,
    Failed(String),
}

fn expression(terms: &[(usize, f64)], vars: &[Variable], constant: f64) -> Expression {
    let mut expr = Expression::from(constant);
    for &(i, coef) in terms {
        expr += coef * vars[i];
    }
    expr
}

fn run(problem: Problem) -> Outcome {
    let mut pv = ProblemVariables::new();
    let vars: Vec<Variable> = problem
        .columns
        .iter()
        .map(|c| {
            let def = variable().name(c.name.clone());
            let def = if c.binary {
                def.binary()
            } else if c.upper.is_finite() {
                def.min(c.lower).max(c.upper)
            } else {
                def.min(c.lower)
            };
            pv.add(def)
        })
        .collect();

    let objective = expression(&problem.objective, &vars, problem.constant);
    let unsolved = if problem.maximize {
        pv.maximise(objective)
    } else {
        pv.minimise(objective)
    };

    let lp = problem.rows.iter().fold(unsolved.using(microlp), |lp, row| {
        let lhs = expression(&row.terms, &vars, 0.0);
        let rhs = row.rhs;
        lp.with(match row.relation {
            Relation::Le => constraint!(lhs <= rhs),
            Relation::Ge => constraint!(lhs >= rhs),
            Relation::Eq => constraint!(lhs == rhs),
        })
    });

    match lp.solve() {
        Ok(sol) => Outcome::Solved(vars.iter().map(|&v| sol.value(v)).collect()),
        Err(ResolutionError::Infeasible) => Outcome::Infeasible,
        Err(e) => Outcome::Failed(e.to_string()),
    }
}

impl SolverBackend for GoodLpBackend {
    fn name(&self) -> &str {
        "good_lp/microlp"
    }

    fn declare_bool(&mut self, name: &str) -> VarHandle {
        self.problem.columns.push(Column {
            name: name.to_string(),
            binary: true,
            lower: 0.0,
            upper: 1.0,
        });
        VarHandle(self.problem.columns.len() - 1)
    }

    fn declare_continuous(&mut self, lower: f64, upper: f64, name: &str) -> VarHandle {
        self.problem.columns.push(Column {
            name: name.to_string(),
            binary: false,
            lower,
            upper,
        });
        VarHandle(self.problem.columns.len() - 1)
    }

    fn add_linear_constraint(&mut self, expr: &[(VarHandle, f64)], relation: Relation, rhs: f64) {
        self.problem.rows.push(Row {
            terms: expr.iter().map(|&(h, c)| (h.0, c)).collect(),
            relation,
            rhs,
        });
    }

    fn set_objective(&mut self, expr: &[(VarHandle, f64)], constant: f64, sense: Sense) {
        self.problem.objective = expr.iter().map(|&(h, c)| (h.0, c)).collect();
        self.problem.constant = constant;
        self.problem.maximize = sense == Sense::Maximize;
    }

    fn solve(&mut self, time_limit: Duration) -> SolverStatus {
        self.values = None;
        let problem = self.problem.clone();
        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("microlp".into())
            .spawn(move || {
                // The receiver is gone once the caller timed out.
                let _ = tx.send(run(problem));
            });
        if let Err(e) = spawned {
            warn!(error = %e, "could not spawn solver thread");
            return SolverStatus::Error;
        }

        match rx.recv_timeout(time_limit) {
            Ok(Outcome::Solved(values)) => {
                debug!(variables = values.len(), "microlp returned a solution");
                self.values = Some(values);
                SolverStatus::Optimal
            }
            Ok(Outcome::Infeasible) => SolverStatus::Infeasible,
            Ok(Outcome::Failed(reason)) => {
                warn!(%reason, "microlp failed");
                SolverStatus::Error
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(limit_ms = time_limit.as_millis() as u64, "time limit reached");
                SolverStatus::TimeLimitReached
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                warn!("solver thread terminated without a result");
                SolverStatus::Error
            }
        }
    }

    fn value(&self, var: VarHandle) -> f64 {
        self.values
            .as_ref()
            .and_then(|v| v.get(var.0).copied())
            .unwrap_or(0.0)
    }

    fn objective(&self) -> f64 {
        self.problem
            .objective
            .iter()
            .map(|&(i, c)| c * self.value(VarHandle(i)))
            .sum::<f64>()
            + self.problem.constant
    }

    fn best_bound(&self) -> f64 {
        self.objective()
    }

    fn gap(&self) -> f64 {
        0.0
    }

    fn has_values(&self) -> bool {
        self.values.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::milp::{solve_model, LinearExpr, MilpModel, SolverConfig};

    #[test]
    fn test_small_knapsack() {
        // max 5a + 4b + 3c s.t. 2a + 3b + c <= 4
        let mut model = MilpModel::new("knapsack");
        let a = model.add_binary("a").unwrap();
        let b = model.add_binary("b").unwrap();
        let c = model.add_binary("c").unwrap();
        model.add_le(
            "capacity",
            LinearExpr::new().with(a, 2.0).with(b, 3.0).with(c, 1.0),
            4.0,
        );
        model.set_objective(
            Sense::Maximize,
            LinearExpr::new().with(a, 5.0).with(b, 4.0).with(c, 3.0),
        );

        let mut backend = GoodLpBackend::new();
        let sol = solve_model(&model, &mut backend, &SolverConfig::default()).unwrap();
        assert_eq!(sol.status, SolverStatus::Optimal);
        assert!((sol.objective_value.unwrap() - 8.0).abs() < 1e-6);
        assert!(sol.value(a) > 0.5);
        assert!(sol.value(b) < 0.5);
        assert!(sol.value(c) > 0.5);
        assert_eq!(sol.gap, Some(0.0));
    }

    #[test]
    fn test_continuous_bounds_and_constant() {
        let mut model = MilpModel::new("bounds");
        let e = model.add_continuous("e", 2.5, 10.0).unwrap();
        model.set_objective(Sense::Minimize, LinearExpr::new().with(e, 1.0).plus(1.0));

        let mut backend = GoodLpBackend::new();
        let sol = solve_model(&model, &mut backend, &SolverConfig::default()).unwrap();
        assert!((sol.value(e) - 2.5).abs() < 1e-6);
        assert!((sol.objective_value.unwrap() - 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_infeasible() {
        let mut model = MilpModel::new("infeasible");
        let a = model.add_binary("a").unwrap();
        let b = model.add_binary("b").unwrap();
        model.add_ge("both", LinearExpr::new().with(a, 1.0).with(b, 1.0), 3.0);
        model.set_objective(Sense::Minimize, LinearExpr::from(a));

        let mut backend = GoodLpBackend::new();
        let sol = solve_model(&model, &mut backend, &SolverConfig::default()).unwrap();
        assert_eq!(sol.status, SolverStatus::Infeasible);
        assert!(!sol.is_solution_found());
        assert_eq!(backend.conflicts(), None);
    }
}
