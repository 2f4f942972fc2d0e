//! Solver interface and the glue between [`MilpModel`] and a backend.

use super::model::{MilpModel, ModelError, Relation, Sense};
use super::variables::{VarId, VarKind};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Status of the solver after execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverStatus {
    /// Proven optimal solution found.
    Optimal,
    /// Feasible (but not necessarily optimal) solution found.
    Feasible,
    /// No feasible solution exists.
    Infeasible,
    /// Time limit expired.
    TimeLimitReached,
    /// Solver failed for another reason (unbounded, numerical trouble, ...).
    Error,
}

impl SolverStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SolverStatus::Optimal => "optimal",
            SolverStatus::Feasible => "feasible",
            SolverStatus::Infeasible => "infeasible",
            SolverStatus::TimeLimitReached => "time_limit_reached",
            SolverStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Solver configuration.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverConfig {
    /// Maximum solve time in milliseconds.
    pub time_limit_ms: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: 3_600_000,
        }
    }
}

impl SolverConfig {
    pub fn with_time_limit_ms(mut self, ms: u64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.time_limit_ms == 0 {
            return Err("time_limit_ms must be > 0".into());
        }
        Ok(())
    }
}

/// Backend-side handle of a declared variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarHandle(pub usize);

/// A mixed-integer solver.
///
/// The solver is an opaque service: it accepts variables, linear constraints
/// and an objective, solves under a time budget and answers value queries.
/// Any implementation honoring this contract is interchangeable.
pub trait SolverBackend {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    fn declare_bool(&mut self, name: &str) -> VarHandle;

    /// `upper` may be `f64::INFINITY`.
    fn declare_continuous(&mut self, lower: f64, upper: f64, name: &str) -> VarHandle;

    fn add_linear_constraint(&mut self, expr: &[(VarHandle, f64)], relation: Relation, rhs: f64);

    fn set_objective(&mut self, expr: &[(VarHandle, f64)], constant: f64, sense: Sense);

    /// Runs the search. Blocks for at most `time_limit` (plus backend overhead).
    fn solve(&mut self, time_limit: Duration) -> SolverStatus;

    /// Value of a variable in the last solution. Meaningless when no solution
    /// was found.
    fn value(&self, var: VarHandle) -> f64;

    fn objective(&self) -> f64;

    fn best_bound(&self) -> f64;

    /// Relative optimality gap.
    fn gap(&self) -> f64;

    /// Whether the last [`solve`](Self::solve) left values to query.
    fn has_values(&self) -> bool;

    /// Names of an irreducible infeasible subsystem, if the backend can
    /// compute one.
    fn conflicts(&self) -> Option<Vec<String>> {
        None
    }
}

/// Declares every variable, constraint and the objective of `model` in
/// `backend`.
///
/// Variables are declared exactly once, in declaration order; the returned
/// vector maps `VarId::index()` to the backend handle.
pub fn load_into<B: SolverBackend + ?Sized>(
    model: &MilpModel,
    backend: &mut B,
) -> Result<Vec<VarHandle>, ModelError> {
    model.validate()?;

    let handles: Vec<VarHandle> = model
        .variables()
        .iter()
        .map(|decl| match decl.kind {
            VarKind::Binary => backend.declare_bool(&decl.name),
            VarKind::Continuous => backend.declare_continuous(decl.lower, decl.upper, &decl.name),
        })
        .collect();

    let map = |terms: &[(VarId, f64)]| -> Vec<(VarHandle, f64)> {
        terms.iter().map(|&(v, c)| (handles[v.0], c)).collect()
    };

    for c in model.constraints() {
        backend.add_linear_constraint(&map(&c.expr.terms), c.relation, c.rhs);
    }

    let objective = model.objective().ok_or(ModelError::MissingObjective)?;
    backend.set_objective(
        &map(&objective.expr.terms),
        objective.expr.constant,
        objective.sense,
    );

    debug!(
        backend = backend.name(),
        variables = handles.len(),
        constraints = model.constraint_count(),
        "model loaded"
    );
    Ok(handles)
}

/// Solution of a [`MilpModel`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MilpSolution {
    pub status: SolverStatus,
    /// Values indexed by [`VarId::index`]; empty when no solution was found.
    pub values: Vec<f64>,
    pub objective_value: Option<f64>,
    pub best_bound: Option<f64>,
    pub gap: Option<f64>,
    /// Solve time in milliseconds.
    pub solve_time_ms: u64,
}

impl MilpSolution {
    /// Creates an empty solution with the given status.
    pub fn empty(status: SolverStatus) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective_value: None,
            best_bound: None,
            gap: None,
            solve_time_ms: 0,
        }
    }

    /// Reads status, values and statistics back from a solved backend.
    pub fn collect<B: SolverBackend + ?Sized>(
        status: SolverStatus,
        handles: &[VarHandle],
        backend: &B,
        elapsed: Duration,
    ) -> Self {
        let mut solution = Self::empty(status);
        solution.solve_time_ms = elapsed.as_millis() as u64;
        if status != SolverStatus::Infeasible && backend.has_values() {
            solution.values = handles.iter().map(|&h| backend.value(h)).collect();
            solution.objective_value = Some(backend.objective());
            solution.best_bound = Some(backend.best_bound());
            solution.gap = Some(backend.gap());
        }
        solution
    }

    /// Whether values are available.
    pub fn is_solution_found(&self) -> bool {
        !self.values.is_empty()
    }

    /// Value of `var`, 0 when absent.
    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(var.0).copied().unwrap_or(0.0)
    }
}

/// Loads `model` into `backend`, solves it and collects the solution.
pub fn solve_model<B: SolverBackend + ?Sized>(
    model: &MilpModel,
    backend: &mut B,
    config: &SolverConfig,
) -> Result<MilpSolution, ModelError> {
    let handles = load_into(model, backend)?;
    let start = Instant::now();
    let status = backend.solve(config.time_limit());
    let solution = MilpSolution::collect(status, &handles, backend, start.elapsed());
    info!(
        backend = backend.name(),
        status = %solution.status,
        objective = ?solution.objective_value,
        elapsed_ms = solution.solve_time_ms,
        "solve finished"
    );
    Ok(solution)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::milp::LinearExpr;

    /// Records declarations and returns preset values.
    #[derive(Default)]
    pub(crate) struct ScriptedBackend {
        pub names: Vec<String>,
        pub rows: usize,
        pub objective_terms: Vec<(VarHandle, f64)>,
        pub preset: Vec<f64>,
        pub status: Option<SolverStatus>,
        pub solve_calls: usize,
    }

    impl SolverBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        fn declare_bool(&mut self, name: &str) -> VarHandle {
            self.names.push(name.to_string());
            VarHandle(self.names.len() - 1)
        }

        fn declare_continuous(&mut self, _lower: f64, _upper: f64, name: &str) -> VarHandle {
            self.declare_bool(name)
        }

        fn add_linear_constraint(&mut self, _: &[(VarHandle, f64)], _: Relation, _: f64) {
            self.rows += 1;
        }

        fn set_objective(&mut self, expr: &[(VarHandle, f64)], _: f64, _: Sense) {
            self.objective_terms = expr.to_vec();
        }

        fn solve(&mut self, _time_limit: Duration) -> SolverStatus {
            self.solve_calls += 1;
            self.status.unwrap_or(SolverStatus::Optimal)
        }

        fn value(&self, var: VarHandle) -> f64 {
            self.preset.get(var.0).copied().unwrap_or(0.0)
        }

        fn objective(&self) -> f64 {
            self.objective_terms
                .iter()
                .map(|&(h, c)| c * self.value(h))
                .sum()
        }

        fn best_bound(&self) -> f64 {
            self.objective()
        }

        fn gap(&self) -> f64 {
            0.0
        }

        fn has_values(&self) -> bool {
            self.solve_calls > 0
        }
    }

    fn two_var_model() -> MilpModel {
        let mut model = MilpModel::new("t");
        let a = model.add_binary("a").unwrap();
        let e = model.add_continuous("e", 0.0, 5.0).unwrap();
        model.add_le("link", LinearExpr::new().with(e, 1.0).with(a, -5.0), 0.0);
        model.set_objective(Sense::Minimize, LinearExpr::new().with(a, 2.0).with(e, 1.0));
        model
    }

    #[test]
    fn test_load_declares_each_variable_once() {
        let model = two_var_model();
        let mut backend = ScriptedBackend::default();
        let handles = load_into(&model, &mut backend).unwrap();
        assert_eq!(handles, vec![VarHandle(0), VarHandle(1)]);
        assert_eq!(backend.names, vec!["a", "e"]);
        assert_eq!(backend.rows, 1);
    }

    #[test]
    fn test_solve_model_collects_values() {
        let model = two_var_model();
        let mut backend = ScriptedBackend {
            preset: vec![1.0, 3.0],
            ..Default::default()
        };
        let sol = solve_model(&model, &mut backend, &SolverConfig::default()).unwrap();
        assert_eq!(sol.status, SolverStatus::Optimal);
        assert!(sol.is_solution_found());
        assert_eq!(sol.value(VarId(1)), 3.0);
        assert_eq!(sol.objective_value, Some(5.0));
        assert_eq!(sol.gap, Some(0.0));
    }

    #[test]
    fn test_infeasible_has_no_values() {
        let model = two_var_model();
        let mut backend = ScriptedBackend {
            status: Some(SolverStatus::Infeasible),
            ..Default::default()
        };
        let sol = solve_model(&model, &mut backend, &SolverConfig::default()).unwrap();
        assert_eq!(sol.status, SolverStatus::Infeasible);
        assert!(!sol.is_solution_found());
        assert_eq!(sol.objective_value, None);
    }

    #[test]
    fn test_invalid_model_never_reaches_backend() {
        let model = MilpModel::new("no objective");
        let mut backend = ScriptedBackend::default();
        assert_eq!(
            solve_model(&model, &mut backend, &SolverConfig::default()).unwrap_err(),
            ModelError::MissingObjective
        );
        assert_eq!(backend.solve_calls, 0);
    }

    #[test]
    fn test_config_validation() {
        assert!(SolverConfig::default().validate().is_ok());
        assert_eq!(SolverConfig::default().time_limit(), Duration::from_secs(3600));
        assert!(SolverConfig::default()
            .with_time_limit_ms(0)
            .validate()
            .is_err());
    }
}
