//! End-to-end run: validate, build, solve, interpret.
//!
//! Only a malformed configuration or instance aborts a run. An infeasible
//! model is a regular [`PlanOutcome`] whose model is exported for diagnosis
//! when a diagnostics directory is configured.

use crate::formulation::{Formulation, FormulationConfig, FormulationError, ModelBuilder};
use crate::instance::Instance;
use crate::interpret::{InterpretError, SolutionInterpreter, SolutionReport, Violation};
use crate::milp::{solve_model, write_lp, MilpSolution, ModelError, SolverBackend, SolverConfig, SolverStatus};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

/// File name of the exported infeasible model.
pub const INFEASIBLE_MODEL_FILE: &str = "infeasible_model.lp";

/// Configuration for [`Planner::run`].
#[derive(Debug, Clone)]
pub struct PlanConfig {
    pub formulation: FormulationConfig,
    pub solver: SolverConfig,
    /// Directory receiving [`INFEASIBLE_MODEL_FILE`]; `None` disables export.
    pub diagnostics_dir: Option<PathBuf>,
    /// Relative tolerance between the solver objective and the recomputed
    /// cost decomposition.
    pub objective_tolerance: f64,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            formulation: FormulationConfig::default(),
            solver: SolverConfig::default(),
            diagnostics_dir: None,
            objective_tolerance: 1e-6,
        }
    }
}

impl PlanConfig {
    pub fn with_formulation(mut self, formulation: FormulationConfig) -> Self {
        self.formulation = formulation;
        self
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_time_limit_ms(mut self, ms: u64) -> Self {
        self.solver.time_limit_ms = ms;
        self
    }

    pub fn with_diagnostics_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.diagnostics_dir = Some(dir.into());
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.formulation.validate()?;
        self.solver.validate()?;
        if !(self.objective_tolerance.is_finite() && self.objective_tolerance >= 0.0) {
            return Err(format!(
                "objective_tolerance must be finite and >= 0, got {}",
                self.objective_tolerance
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("invalid plan config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Formulation(#[from] FormulationError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Interpret(#[from] InterpretError),
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub status: SolverStatus,
    pub formulation: Formulation,
    pub solution: MilpSolution,
    /// Present whenever the solver returned values.
    pub report: Option<SolutionReport>,
    /// Post-solve checks of `report`.
    pub violations: Vec<Violation>,
    /// Path of the exported model after an infeasible solve.
    pub exported_model: Option<PathBuf>,
    /// Conflict set reported by the backend, if it computes one.
    pub conflicts: Option<Vec<String>>,
}

impl PlanOutcome {
    pub fn is_solution_found(&self) -> bool {
        self.report.is_some()
    }
}

/// Runs the pipeline against any [`SolverBackend`].
pub struct Planner;

impl Planner {
    /// Builds the model of `instance`, solves it with `backend` and
    /// interprets the result.
    ///
    /// # Errors
    ///
    /// Configuration and instance errors (including insufficient yard
    /// capacity) are returned before the backend sees anything.
    #[instrument(skip_all, fields(
        ships = instance.dims.num_ships,
        berths = instance.dims.num_berths,
        backend = backend.name(),
    ))]
    pub fn run<B: SolverBackend + ?Sized>(
        instance: &Instance,
        config: &PlanConfig,
        backend: &mut B,
    ) -> Result<PlanOutcome, PlanError> {
        config.validate().map_err(PlanError::InvalidConfig)?;

        let formulation = ModelBuilder::build(instance, &config.formulation)?;
        let solution = solve_model(&formulation.model, backend, &config.solver)?;
        let status = solution.status;

        let mut outcome = PlanOutcome {
            status,
            formulation,
            solution,
            report: None,
            violations: Vec::new(),
            exported_model: None,
            conflicts: None,
        };

        match status {
            SolverStatus::Infeasible => {
                error!("model is infeasible");
                outcome.conflicts = backend.conflicts();
                outcome.exported_model = export_infeasible(&outcome.formulation, config);
            }
            SolverStatus::TimeLimitReached if !outcome.solution.is_solution_found() => {
                warn!(
                    limit_ms = config.solver.time_limit_ms,
                    "time limit reached without an incumbent"
                );
            }
            SolverStatus::Error => {
                error!("solver failed");
            }
            _ => {}
        }

        if outcome.solution.is_solution_found() {
            let report =
                SolutionInterpreter::interpret(instance, &outcome.formulation, &outcome.solution)?;
            if !report.objective_matches(config.objective_tolerance) {
                warn!(
                    reported = ?report.objective_value,
                    recomputed = report.total.weighted,
                    "objective decomposition does not match solver objective"
                );
            }
            outcome.violations = report.verify(instance);
            for v in &outcome.violations {
                warn!(violation = %v, "solution check failed");
            }
            info!(
                objective = ?report.objective_value,
                violations = outcome.violations.len(),
                "plan ready"
            );
            outcome.report = Some(report);
        }

        Ok(outcome)
    }
}

/// Writes the model for offline diagnosis. Failures are logged only.
fn export_infeasible(formulation: &Formulation, config: &PlanConfig) -> Option<PathBuf> {
    let dir = config.diagnostics_dir.as_ref()?;
    let path = dir.join(INFEASIBLE_MODEL_FILE);
    match write_lp(&formulation.model, &path) {
        Ok(()) => {
            info!(path = %path.display(), "infeasible model exported");
            Some(path)
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "could not export infeasible model");
            None
        }
    }
}
