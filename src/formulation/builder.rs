//! Instance to [`MilpModel`] translation.

use super::config::{FormulationConfig, TransshipmentLinearization};
use super::indexing::{VarGrid, VarIndex};
use super::linearize::{self, compartment_start_upper, BigMSummary};
use crate::instance::{Instance, InstanceError};
use crate::milp::{LinearExpr, MilpModel, ModelError, Sense, VarDecl};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Constraint family labels, as attached to every row of the model.
pub mod family {
    pub const SINGLE_BERTH: &str = "single_berth";
    pub const SLOT_COUNT: &str = "slot_count";
    pub const SLOT_EXCLUSIVITY: &str = "slot_exclusivity";
    pub const SINGLE_ROW: &str = "single_row";
    pub const ROW_LINK: &str = "row_link";
    pub const CONTIGUITY: &str = "contiguity";
    pub const COMPARTMENT_ORDER: &str = "compartment_order";
    pub const COMPARTMENT_TIMING: &str = "compartment_timing";
    pub const SHIP_START: &str = "ship_start";
    pub const BERTH_SHARING: &str = "berth_sharing";
    pub const NO_OVERLAP: &str = "no_overlap";
    pub const TRANSSHIPMENT_LINK: &str = "transshipment_link";
}

/// Model construction failure. Nothing is built when one is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulationError {
    #[error("invalid formulation config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Instance(#[from] InstanceError),

    #[error(transparent)]
    Model(#[from] ModelError),

    /// The berth aggregate linearisation is only exact for costs >= 0.
    #[error("transshipment cost at berth {berth}, row {row}, slot {slot} is negative ({cost})")]
    NegativeTransshipmentCost {
        berth: usize,
        row: usize,
        slot: usize,
        cost: f64,
    },
}

/// Statistics of a built model.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub variables: usize,
    pub binaries: usize,
    pub constraints: usize,
    pub family_counts: BTreeMap<&'static str, usize>,
    /// Unloading speeds `<= 0` replaced by 1.
    pub speed_substitutions: usize,
    pub big_m: BigMSummary,
}

/// A built model together with the handles of its logical variables.
#[derive(Debug, Clone)]
pub struct Formulation {
    pub model: MilpModel,
    pub vars: VarIndex,
    pub config: FormulationConfig,
    pub report: BuildReport,
}

/// Builds the berth allocation, yard packing and unloading order model.
///
/// # Examples
///
/// ```
/// use u_bulkport::formulation::{FormulationConfig, ModelBuilder};
/// use u_bulkport::instance::{GeneratorConfig, InstanceGenerator};
///
/// let config = GeneratorConfig::new(1, 2).with_yard(4, 8).with_compartments(2);
/// let instance = InstanceGenerator::generate(&config).unwrap();
/// let formulation = ModelBuilder::build(&instance, &FormulationConfig::default()).unwrap();
/// assert!(formulation.model.validate().is_ok());
/// ```
pub struct ModelBuilder;

impl ModelBuilder {
    /// Validates `instance` and emits the full model.
    ///
    /// # Errors
    ///
    /// - [`FormulationError::InvalidConfig`] for a bad `config`
    /// - [`FormulationError::Instance`] when the instance is malformed or its
    ///   slot demand exceeds yard capacity
    /// - [`FormulationError::NegativeTransshipmentCost`] for the berth
    ///   aggregate linearisation with negative costs
    pub fn build(
        instance: &Instance,
        config: &FormulationConfig,
    ) -> Result<Formulation, FormulationError> {
        config.validate().map_err(FormulationError::InvalidConfig)?;
        instance.validate()?;
        if config.linearization == TransshipmentLinearization::BerthAggregate {
            if let Some(((berth, row, slot), &cost)) = instance
                .transshipment_cost
                .indexed()
                .find(|(_, &c)| c < 0.0)
            {
                return Err(FormulationError::NegativeTransshipmentCost {
                    berth,
                    row,
                    slot,
                    cost,
                });
            }
        }

        let substituted = instance.non_positive_speeds();
        for &(ship, berth, compartment) in &substituted {
            warn!(
                ship,
                berth,
                compartment,
                speed = instance.unloading_speed[(ship, berth, compartment)],
                "non-positive unloading speed replaced by 1"
            );
        }

        let mut model = MilpModel::new("bulk_terminal");
        let vars = declare_variables(&mut model, instance, config)?;
        debug!(variables = model.variable_count(), "variables declared");

        model.set_objective(Sense::Minimize, objective(instance, &vars, config));

        add_single_berth(&mut model, instance, &vars);
        add_slot_count(&mut model, instance, &vars);
        add_slot_exclusivity(&mut model, instance, &vars);
        add_single_row(&mut model, instance, &vars);
        add_contiguity(&mut model, instance, &vars);

        let mut big_m = BigMSummary::default();
        linearize::add_compartment_order(&mut model, instance, &vars, config, &mut big_m);
        linearize::add_ship_start_links(&mut model, instance, &vars);
        linearize::add_berth_sharing(&mut model, instance, &vars);
        linearize::add_no_overlap(&mut model, instance, &vars, config, &mut big_m);
        linearize::add_transshipment_links(&mut model, instance, &vars, config, &mut big_m);

        let report = BuildReport {
            variables: model.variable_count(),
            binaries: model.binary_count(),
            constraints: model.constraint_count(),
            family_counts: model.family_counts(),
            speed_substitutions: substituted.len(),
            big_m,
        };
        info!(
            variables = report.variables,
            binaries = report.binaries,
            constraints = report.constraints,
            speed_substitutions = report.speed_substitutions,
            "model built"
        );

        Ok(Formulation {
            model,
            vars,
            config: config.clone(),
            report,
        })
    }
}

fn declare(
    model: &mut MilpModel,
    grid: &mut VarGrid,
    decl: VarDecl,
) -> Result<(), ModelError> {
    grid.push(model.add_var(decl)?);
    Ok(())
}

fn declare_variables(
    model: &mut MilpModel,
    instance: &Instance,
    config: &FormulationConfig,
) -> Result<VarIndex, ModelError> {
    let d = instance.dims;
    let (ns, nb, nr, nv, nk) = (
        d.num_ships,
        d.num_berths,
        d.num_rows,
        d.num_slots_per_row,
        d.num_ship_k,
    );
    let mut vars = VarIndex::new(d);

    vars.z = VarGrid::with_capacity(ns * nb);
    for s in 0..ns {
        for b in 0..nb {
            declare(model, &mut vars.z, VarDecl::binary(format!("z_{s}_{b}")))?;
        }
    }

    vars.x = VarGrid::with_capacity(ns * nk * nr * nv);
    vars.h = VarGrid::with_capacity(ns * nk * nr * nv);
    for s in 0..ns {
        for k in 0..nk {
            for r in 0..nr {
                for v in 0..nv {
                    declare(model, &mut vars.x, VarDecl::binary(format!("x_{s}_{k}_{r}_{v}")))?;
                }
            }
        }
    }
    for s in 0..ns {
        for k in 0..nk {
            for r in 0..nr {
                for v in 0..nv {
                    declare(model, &mut vars.h, VarDecl::binary(format!("h_{s}_{k}_{r}_{v}")))?;
                }
            }
        }
    }

    vars.f = VarGrid::with_capacity(ns * nk * nr);
    for s in 0..ns {
        for k in 0..nk {
            for r in 0..nr {
                declare(model, &mut vars.f, VarDecl::binary(format!("f_{s}_{k}_{r}")))?;
            }
        }
    }

    for s in 0..ns {
        for t in (0..ns).filter(|&t| t != s) {
            declare(model, &mut vars.y, VarDecl::binary(format!("y_{s}_{t}")))?;
        }
    }

    for s in 0..ns {
        for k in 0..nk {
            for t in (0..nk).filter(|&t| t != k) {
                declare(model, &mut vars.q, VarDecl::binary(format!("q_{s}_{k}_{t}")))?;
            }
        }
    }

    let horizon = instance.planning_horizon;
    for s in 0..ns {
        let lower = instance.arrival_time[s];
        declare(model, &mut vars.e, VarDecl::continuous(format!("e_{s}"), lower, horizon))?;
    }
    for s in 0..ns {
        let lower = instance.arrival_time[s];
        let upper = compartment_start_upper(instance, s, config.compartment_horizon);
        for k in 0..nk {
            declare(
                model,
                &mut vars.e_sk,
                VarDecl::continuous(format!("esk_{s}_{k}"), lower, upper),
            )?;
        }
    }

    for s in 0..ns {
        for t in (0..ns).filter(|&t| t != s) {
            for b in 0..nb {
                declare(model, &mut vars.omega, VarDecl::binary(format!("omega_{s}_{t}_{b}")))?;
                declare(model, &mut vars.lambda, VarDecl::binary(format!("lambda_{s}_{t}_{b}")))?;
                declare(model, &mut vars.mu, VarDecl::binary(format!("mu_{s}_{t}_{b}")))?;
            }
        }
    }

    match config.linearization {
        TransshipmentLinearization::Product => {
            vars.w = VarGrid::with_capacity(ns * nk * nr * nv * nb);
            for s in 0..ns {
                for k in 0..nk {
                    for r in 0..nr {
                        for v in 0..nv {
                            for b in 0..nb {
                                declare(
                                    model,
                                    &mut vars.w,
                                    VarDecl::continuous(format!("w_{s}_{k}_{r}_{v}_{b}"), 0.0, 1.0),
                                )?;
                            }
                        }
                    }
                }
            }
        }
        TransshipmentLinearization::BerthAggregate => {
            for s in 0..ns {
                for k in 0..nk {
                    for b in 0..nb {
                        declare(
                            model,
                            &mut vars.tau,
                            VarDecl::continuous(format!("tau_{s}_{k}_{b}"), 0.0, f64::INFINITY),
                        )?;
                    }
                }
            }
        }
    }

    Ok(vars)
}

/// `alpha * (transshipment + storage) + beta * berth_time`.
fn objective(instance: &Instance, vars: &VarIndex, config: &FormulationConfig) -> LinearExpr {
    let d = instance.dims;

    let mut cost = linearize::transshipment_objective(instance, vars, config.linearization);
    for s in 0..d.num_ships {
        for k in 0..d.num_ship_k {
            for r in 0..d.num_rows {
                let phi = instance.storage_cost[(s, k, r)];
                if phi == 0.0 {
                    continue;
                }
                for v in 0..d.num_slots_per_row {
                    cost.add_term(vars.x(s, k, r, v), phi);
                }
            }
        }
    }

    let mut berth_time = LinearExpr::new();
    for s in 0..d.num_ships {
        berth_time.add_term(vars.e(s), 1.0);
        berth_time.add_constant(-instance.arrival_time[s]);
        for b in 0..d.num_berths {
            berth_time.add_term(vars.z(s, b), instance.processing_time(s, b));
        }
    }

    let mut expr = LinearExpr::new();
    expr.add_scaled(&cost, instance.alpha);
    expr.add_scaled(&berth_time, instance.beta);
    expr
}

/// `Σ_b z[s][b] = 1`.
fn add_single_berth(model: &mut MilpModel, instance: &Instance, vars: &VarIndex) {
    let d = instance.dims;
    for s in 0..d.num_ships {
        let mut expr = LinearExpr::new();
        for b in 0..d.num_berths {
            expr.add_term(vars.z(s, b), 1.0);
        }
        model.add_eq(family::SINGLE_BERTH, expr, 1.0);
    }
}

/// `Σ_{r,v} x[s][k][r][v] = required_slots[s][k]`.
fn add_slot_count(model: &mut MilpModel, instance: &Instance, vars: &VarIndex) {
    let d = instance.dims;
    for s in 0..d.num_ships {
        for k in 0..d.num_ship_k {
            let mut expr = LinearExpr::new();
            for r in 0..d.num_rows {
                for v in 0..d.num_slots_per_row {
                    expr.add_term(vars.x(s, k, r, v), 1.0);
                }
            }
            model.add_eq(
                family::SLOT_COUNT,
                expr,
                instance.required_slots[(s, k)] as f64,
            );
        }
    }
}

/// At most one compartment per physical slot.
fn add_slot_exclusivity(model: &mut MilpModel, instance: &Instance, vars: &VarIndex) {
    let d = instance.dims;
    for r in 0..d.num_rows {
        for v in 0..d.num_slots_per_row {
            let mut expr = LinearExpr::new();
            for s in 0..d.num_ships {
                for k in 0..d.num_ship_k {
                    expr.add_term(vars.x(s, k, r, v), 1.0);
                }
            }
            model.add_le(family::SLOT_EXCLUSIVITY, expr, 1.0);
        }
    }
}

/// One row per compartment, and no slots outside it.
fn add_single_row(model: &mut MilpModel, instance: &Instance, vars: &VarIndex) {
    let d = instance.dims;
    let nv = d.num_slots_per_row as f64;
    for s in 0..d.num_ships {
        for k in 0..d.num_ship_k {
            let mut rows = LinearExpr::new();
            for r in 0..d.num_rows {
                rows.add_term(vars.f(s, k, r), 1.0);

                let mut link = LinearExpr::new().with(vars.f(s, k, r), -nv);
                for v in 0..d.num_slots_per_row {
                    link.add_term(vars.x(s, k, r, v), 1.0);
                }
                model.add_le(family::ROW_LINK, link, 0.0);
            }
            model.add_eq(family::SINGLE_ROW, rows, 1.0);
        }
    }
}

/// Exactly one right boundary in the chosen row, so the run is contiguous.
fn add_contiguity(model: &mut MilpModel, instance: &Instance, vars: &VarIndex) {
    let d = instance.dims;
    let last = d.num_slots_per_row - 1;
    for s in 0..d.num_ships {
        for k in 0..d.num_ship_k {
            for r in 0..d.num_rows {
                let mut boundaries = LinearExpr::new().with(vars.f(s, k, r), -1.0);
                for v in 0..d.num_slots_per_row {
                    boundaries.add_term(vars.h(s, k, r, v), 1.0);
                }
                model.add_eq(family::CONTIGUITY, boundaries, 0.0);

                model.add_le(
                    family::CONTIGUITY,
                    LinearExpr::new()
                        .with(vars.x(s, k, r, last), 1.0)
                        .with(vars.h(s, k, r, last), -1.0),
                    0.0,
                );
                for v in 0..last {
                    model.add_le(
                        family::CONTIGUITY,
                        LinearExpr::new()
                            .with(vars.x(s, k, r, v), 1.0)
                            .with(vars.x(s, k, r, v + 1), -1.0)
                            .with(vars.h(s, k, r, v), -1.0),
                        0.0,
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formulation::CompartmentHorizon;
    use crate::instance::{Dimensions, Geometry, Grid2, Grid3, GeneratorConfig, InstanceGenerator};

    fn two_ships() -> Instance {
        let dims = Dimensions::new(1, 2, 4, 2, 1);
        let mut inst = Instance::zeroed(dims, 100.0, Geometry::new(50.0, 0.5));
        inst.arrival_time = vec![0.0, 5.0];
        inst.cargo_weight = vec![100.0, 60.0];
        inst.required_slots = Grid2::filled(2, 1, 3);
        inst.unloading_speed = Grid3::filled(2, 1, 1, 10.0);
        inst.transshipment_cost = Grid3::from_fn(1, 2, 4, |_, r, v| 1.0 + r as f64 + 0.5 * v as f64);
        inst.storage_cost = Grid3::filled(2, 1, 2, 2.0);
        inst
    }

    #[test]
    fn test_variable_counts() {
        let inst = two_ships();
        let f = ModelBuilder::build(&inst, &FormulationConfig::default()).unwrap();
        let (s, b, r, v, k) = (2, 1, 2, 4, 1);
        let expected = s * b            // z
            + 2 * s * k * r * v         // x, h
            + s * k * r                 // f
            + s * (s - 1)               // y
            + s * k * (k - 1)           // q
            + s + s * k                 // e, e_sk
            + 3 * s * (s - 1) * b       // omega, lambda, mu
            + s * k * r * v * b; // w
        assert_eq!(f.report.variables, expected);
        assert_eq!(f.model.variable_count(), expected);
        assert_eq!(f.model.var("x_1_0_1_3"), Some(f.vars.x(1, 0, 1, 3)));
        assert_eq!(f.model.var("mu_1_0_0"), Some(f.vars.mu(1, 0, 0)));
        assert_eq!(f.model.var("y_0_1"), Some(f.vars.y(0, 1)));
        assert!(f.vars.tau(0, 0, 0).is_none());
        assert!(f.model.validate().is_ok());
    }

    #[test]
    fn test_family_counts() {
        let inst = two_ships();
        let f = ModelBuilder::build(&inst, &FormulationConfig::default()).unwrap();
        let c = &f.report.family_counts;
        assert_eq!(c[family::SINGLE_BERTH], 2);
        assert_eq!(c[family::SLOT_COUNT], 2);
        assert_eq!(c[family::SLOT_EXCLUSIVITY], 8);
        assert_eq!(c[family::SINGLE_ROW], 2);
        assert_eq!(c[family::ROW_LINK], 4);
        // per (s, k, r): 1 boundary sum + 1 last slot + 3 transitions
        assert_eq!(c[family::CONTIGUITY], 4 * 5);
        assert_eq!(c[family::SHIP_START], 2);
        assert_eq!(c[family::BERTH_SHARING], 2 * 10);
        assert_eq!(c[family::NO_OVERLAP], 2 * 2);
        assert_eq!(c[family::TRANSSHIPMENT_LINK], 3 * 16);
        assert!(!c.contains_key(family::COMPARTMENT_ORDER));
    }

    #[test]
    fn test_compartment_order_rows() {
        let config = GeneratorConfig::new(2, 2)
            .with_yard(3, 8)
            .with_compartments(3)
            .with_cargo_weight(1_000, 2_000);
        let inst = InstanceGenerator::generate(&config).unwrap();
        let f = ModelBuilder::build(&inst, &FormulationConfig::default()).unwrap();
        let c = &f.report.family_counts;
        // one antisymmetry row per unordered pair, one timing row per ordered pair and berth
        assert_eq!(c[family::COMPARTMENT_ORDER], 2 * 3);
        assert_eq!(c[family::COMPARTMENT_TIMING], 2 * 6 * 2);
        assert!(f.report.big_m.compartment_order > 0.0);
    }

    #[test]
    fn test_objective_constant_and_coefficients() {
        let inst = two_ships();
        let f = ModelBuilder::build(&inst, &FormulationConfig::default()).unwrap();
        let obj = f.model.objective().unwrap().expr.compact();
        // beta * -(Σ arrival)
        assert_eq!(obj.constant, -5.0);
        let coef = |id| {
            obj.terms
                .iter()
                .find(|(v, _)| *v == id)
                .map(|&(_, c)| c)
                .unwrap_or(0.0)
        };
        assert_eq!(coef(f.vars.e(1)), 1.0);
        assert!((coef(f.vars.z(0, 0)) - 10.0).abs() < 1e-12);
        assert_eq!(coef(f.vars.x(0, 0, 1, 2)), 2.0);
        // d * wt = (1 + 1 + 1.0) * 100 / 3
        let w = f.vars.w(0, 0, 1, 2, 0).unwrap();
        assert!((coef(w) - 3.0 * 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_capacity_rejected_before_building() {
        let mut inst = two_ships();
        inst.dims.num_rows = 1;
        inst.transshipment_cost = Grid3::filled(1, 1, 4, 1.0);
        inst.storage_cost = Grid3::filled(2, 1, 1, 2.0);
        let err = ModelBuilder::build(&inst, &FormulationConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            FormulationError::Instance(InstanceError::CapacityExceeded {
                required: 6,
                available: 4
            })
        ));
    }

    #[test]
    fn test_zero_speed_is_substituted_and_counted() {
        let mut inst = two_ships();
        inst.unloading_speed[(1, 0, 0)] = 0.0;
        let f = ModelBuilder::build(&inst, &FormulationConfig::default()).unwrap();
        assert_eq!(f.report.speed_substitutions, 1);
        assert!(f.model.validate().is_ok());
    }

    #[test]
    fn test_berth_aggregate() {
        let inst = two_ships();
        let config =
            FormulationConfig::default().with_linearization(TransshipmentLinearization::BerthAggregate);
        let f = ModelBuilder::build(&inst, &config).unwrap();
        assert!(f.vars.w(0, 0, 0, 0, 0).is_none());
        assert!(f.vars.tau(1, 0, 0).is_some());
        assert_eq!(f.report.family_counts[family::TRANSSHIPMENT_LINK], 2);
        // wt * n * max d + margin = (100/3) * 3 * 3.5 + 1
        assert!((f.report.big_m.transshipment - 351.0).abs() < 1e-9);

        let mut negative = inst.clone();
        negative.transshipment_cost[(0, 1, 2)] = -1.0;
        assert!(matches!(
            ModelBuilder::build(&negative, &config),
            Err(FormulationError::NegativeTransshipmentCost {
                berth: 0,
                row: 1,
                slot: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_compartment_horizon_bounds() {
        let inst = two_ships();
        let config =
            FormulationConfig::default().with_compartment_horizon(CompartmentHorizon::PlanningHorizon);
        let f = ModelBuilder::build(&inst, &config).unwrap();
        let decl = f.model.decl(f.vars.e_sk(1, 0)).unwrap();
        assert_eq!((decl.lower, decl.upper), (5.0, 100.0));

        let f = ModelBuilder::build(&inst, &FormulationConfig::default()).unwrap();
        let decl = f.model.decl(f.vars.e_sk(1, 0)).unwrap();
        assert!((decl.upper - 106.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_config() {
        let config = FormulationConfig::default().with_big_m_margin(-1.0);
        assert!(matches!(
            ModelBuilder::build(&two_ships(), &config),
            Err(FormulationError::InvalidConfig(_))
        ));
    }
}
