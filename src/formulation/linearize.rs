//! Big-M linearisation of the scheduling disjunctions and of the bilinear
//! transshipment term.
//!
//! Every constant is derived from variable bounds so that it equals the
//! largest value the guarded left-hand side can reach when the indicator
//! switches the row off, plus a configurable margin.

use super::builder::family;
use super::config::{CompartmentHorizon, FormulationConfig, TransshipmentLinearization};
use super::indexing::VarIndex;
use crate::instance::Instance;
use crate::milp::{LinearExpr, MilpModel};

/// Largest big-M constant used per guarded family.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BigMSummary {
    pub no_overlap: f64,
    pub compartment_order: f64,
    /// Zero unless the berth aggregate linearisation is used.
    pub transshipment: f64,
}

/// Upper bound of `e_sk[s][*]`.
pub fn compartment_start_upper(instance: &Instance, ship: usize, horizon: CompartmentHorizon) -> f64 {
    match horizon {
        CompartmentHorizon::ShipProcessing => {
            instance.planning_horizon + instance.max_processing_time(ship)
        }
        CompartmentHorizon::PlanningHorizon => instance.planning_horizon,
    }
}

/// Big-M for `e[first] + proc(first, b) <= e[second] + M (1 - ind)`.
///
/// With `e[first] <= H` and `e[second] >= arrival[second]` the left side
/// minus `e[second]` never exceeds `H + proc(first, b) - arrival[second]`.
pub fn no_overlap_big_m(
    instance: &Instance,
    first: usize,
    second: usize,
    berth: usize,
    margin: f64,
) -> f64 {
    let span = instance.planning_horizon + instance.processing_time(first, berth)
        - instance.arrival_time[second];
    span.max(0.0) + margin
}

/// Big-M for `e_sk[s][k] + dur(s, k, b) - e_sk[s][t] <= M (2 - q - z)`.
pub fn compartment_order_big_m(
    instance: &Instance,
    ship: usize,
    compartment: usize,
    berth: usize,
    start_upper: f64,
    margin: f64,
) -> f64 {
    let span = start_upper + instance.compartment_duration(ship, compartment, berth)
        - instance.arrival_time[ship];
    span.max(0.0) + margin
}

/// Big-M for the berth-aggregated transshipment cost row: the largest cost
/// `(s, k)` can incur at berth `b`.
pub fn transshipment_big_m(
    instance: &Instance,
    ship: usize,
    compartment: usize,
    berth: usize,
    margin: f64,
) -> f64 {
    let d = instance.dims;
    let max_cost = (0..d.num_rows)
        .flat_map(|r| (0..d.num_slots_per_row).map(move |v| (r, v)))
        .map(|(r, v)| instance.transshipment_cost[(berth, r, v)])
        .fold(0.0, f64::max);
    let n = instance.required_slots[(ship, compartment)] as f64;
    (instance.slot_weight(ship, compartment) * n * max_cost).max(0.0) + margin
}

/// Compartment order: `q` antisymmetry and the timing rows for every berth.
pub(crate) fn add_compartment_order(
    model: &mut MilpModel,
    instance: &Instance,
    vars: &VarIndex,
    config: &FormulationConfig,
    summary: &mut BigMSummary,
) {
    let d = instance.dims;
    for s in 0..d.num_ships {
        for k in 0..d.num_ship_k {
            for t in (k + 1)..d.num_ship_k {
                model.add_eq(
                    family::COMPARTMENT_ORDER,
                    LinearExpr::new()
                        .with(vars.q(s, k, t), 1.0)
                        .with(vars.q(s, t, k), 1.0),
                    1.0,
                );
            }
        }

        let upper = compartment_start_upper(instance, s, config.compartment_horizon);
        for k in 0..d.num_ship_k {
            for t in (0..d.num_ship_k).filter(|&t| t != k) {
                for b in 0..d.num_berths {
                    let dur = instance.compartment_duration(s, k, b);
                    let m = compartment_order_big_m(instance, s, k, b, upper, config.big_m_margin);
                    summary.compartment_order = summary.compartment_order.max(m);
                    // e_sk[k] - e_sk[t] + M q + M z <= 2M - dur
                    model.add_le(
                        family::COMPARTMENT_TIMING,
                        LinearExpr::new()
                            .with(vars.e_sk(s, k), 1.0)
                            .with(vars.e_sk(s, t), -1.0)
                            .with(vars.q(s, k, t), m)
                            .with(vars.z(s, b), m),
                        2.0 * m - dur,
                    );
                }
            }
        }
    }
}

/// `e[s] <= e_sk[s][k]`.
pub(crate) fn add_ship_start_links(model: &mut MilpModel, instance: &Instance, vars: &VarIndex) {
    let d = instance.dims;
    for s in 0..d.num_ships {
        for k in 0..d.num_ship_k {
            model.add_le(
                family::SHIP_START,
                LinearExpr::new()
                    .with(vars.e(s), 1.0)
                    .with(vars.e_sk(s, k), -1.0),
                0.0,
            );
        }
    }
}

/// `omega = z[s][b] AND z[t][b]`, split by `y[s][t]` into `mu` (y = 1) and
/// `lambda` (y = 0).
pub(crate) fn add_berth_sharing(model: &mut MilpModel, instance: &Instance, vars: &VarIndex) {
    let d = instance.dims;
    for s in 0..d.num_ships {
        for t in (0..d.num_ships).filter(|&t| t != s) {
            let y = vars.y(s, t);
            for b in 0..d.num_berths {
                let omega = vars.omega(s, t, b);
                let lambda = vars.lambda(s, t, b);
                let mu = vars.mu(s, t, b);
                let (zs, zt) = (vars.z(s, b), vars.z(t, b));

                let le0 = |a, b| LinearExpr::new().with(a, 1.0).with(b, -1.0);
                model.add_le(family::BERTH_SHARING, le0(omega, zs), 0.0);
                model.add_le(family::BERTH_SHARING, le0(omega, zt), 0.0);
                model.add_ge(
                    family::BERTH_SHARING,
                    LinearExpr::new()
                        .with(omega, 1.0)
                        .with(zs, -1.0)
                        .with(zt, -1.0),
                    -1.0,
                );

                model.add_le(family::BERTH_SHARING, le0(mu, omega), 0.0);
                model.add_le(family::BERTH_SHARING, le0(mu, y), 0.0);
                model.add_ge(
                    family::BERTH_SHARING,
                    LinearExpr::new()
                        .with(mu, 1.0)
                        .with(omega, -1.0)
                        .with(y, -1.0),
                    -1.0,
                );

                model.add_le(family::BERTH_SHARING, le0(lambda, omega), 0.0);
                model.add_le(
                    family::BERTH_SHARING,
                    LinearExpr::new().with(lambda, 1.0).with(y, 1.0),
                    1.0,
                );
                model.add_ge(
                    family::BERTH_SHARING,
                    LinearExpr::new()
                        .with(lambda, 1.0)
                        .with(omega, -1.0)
                        .with(y, 1.0),
                    0.0,
                );

                model.add_eq(
                    family::BERTH_SHARING,
                    LinearExpr::new()
                        .with(lambda, 1.0)
                        .with(mu, 1.0)
                        .with(omega, -1.0),
                    0.0,
                );
            }
        }
    }
}

/// Ships sharing a berth do not overlap: `lambda` puts `s` first, `mu`
/// puts `t` first.
pub(crate) fn add_no_overlap(
    model: &mut MilpModel,
    instance: &Instance,
    vars: &VarIndex,
    config: &FormulationConfig,
    summary: &mut BigMSummary,
) {
    let d = instance.dims;
    for s in 0..d.num_ships {
        for t in (0..d.num_ships).filter(|&t| t != s) {
            for b in 0..d.num_berths {
                // e[s] + proc(s,b) <= e[t] + M (1 - lambda)
                let m = no_overlap_big_m(instance, s, t, b, config.big_m_margin);
                summary.no_overlap = summary.no_overlap.max(m);
                model.add_le(
                    family::NO_OVERLAP,
                    LinearExpr::new()
                        .with(vars.e(s), 1.0)
                        .with(vars.e(t), -1.0)
                        .with(vars.lambda(s, t, b), m),
                    m - instance.processing_time(s, b),
                );

                // e[t] + proc(t,b) <= e[s] + M (1 - mu)
                let m = no_overlap_big_m(instance, t, s, b, config.big_m_margin);
                summary.no_overlap = summary.no_overlap.max(m);
                model.add_le(
                    family::NO_OVERLAP,
                    LinearExpr::new()
                        .with(vars.e(t), 1.0)
                        .with(vars.e(s), -1.0)
                        .with(vars.mu(s, t, b), m),
                    m - instance.processing_time(t, b),
                );
            }
        }
    }
}

/// Linking rows of the chosen transshipment linearisation.
pub(crate) fn add_transshipment_links(
    model: &mut MilpModel,
    instance: &Instance,
    vars: &VarIndex,
    config: &FormulationConfig,
    summary: &mut BigMSummary,
) {
    let d = instance.dims;
    match config.linearization {
        TransshipmentLinearization::Product => {
            for s in 0..d.num_ships {
                for k in 0..d.num_ship_k {
                    for r in 0..d.num_rows {
                        for v in 0..d.num_slots_per_row {
                            let x = vars.x(s, k, r, v);
                            for b in 0..d.num_berths {
                                let Some(w) = vars.w(s, k, r, v, b) else {
                                    continue;
                                };
                                let z = vars.z(s, b);
                                model.add_le(
                                    family::TRANSSHIPMENT_LINK,
                                    LinearExpr::new().with(w, 1.0).with(x, -1.0),
                                    0.0,
                                );
                                model.add_le(
                                    family::TRANSSHIPMENT_LINK,
                                    LinearExpr::new().with(w, 1.0).with(z, -1.0),
                                    0.0,
                                );
                                model.add_ge(
                                    family::TRANSSHIPMENT_LINK,
                                    LinearExpr::new()
                                        .with(w, 1.0)
                                        .with(x, -1.0)
                                        .with(z, -1.0),
                                    -1.0,
                                );
                            }
                        }
                    }
                }
            }
        }
        TransshipmentLinearization::BerthAggregate => {
            for s in 0..d.num_ships {
                for k in 0..d.num_ship_k {
                    let wt = instance.slot_weight(s, k);
                    for b in 0..d.num_berths {
                        let Some(tau) = vars.tau(s, k, b) else {
                            continue;
                        };
                        let m = transshipment_big_m(instance, s, k, b, config.big_m_margin);
                        summary.transshipment = summary.transshipment.max(m);
                        // tau - wt Σ d x - M z >= -M
                        let mut expr = LinearExpr::new().with(tau, 1.0).with(vars.z(s, b), -m);
                        for r in 0..d.num_rows {
                            for v in 0..d.num_slots_per_row {
                                let cost = wt * instance.transshipment_cost[(b, r, v)];
                                if cost != 0.0 {
                                    expr.add_term(vars.x(s, k, r, v), -cost);
                                }
                            }
                        }
                        model.add_ge(family::TRANSSHIPMENT_LINK, expr, -m);
                    }
                }
            }
        }
    }
}

/// Transshipment part of the objective, before weighting by `alpha`.
pub(crate) fn transshipment_objective(
    instance: &Instance,
    vars: &VarIndex,
    linearization: TransshipmentLinearization,
) -> LinearExpr {
    let d = instance.dims;
    let mut expr = LinearExpr::new();
    for s in 0..d.num_ships {
        for k in 0..d.num_ship_k {
            let wt = instance.slot_weight(s, k);
            for b in 0..d.num_berths {
                match linearization {
                    TransshipmentLinearization::Product => {
                        for r in 0..d.num_rows {
                            for v in 0..d.num_slots_per_row {
                                let cost = wt * instance.transshipment_cost[(b, r, v)];
                                if cost == 0.0 {
                                    continue;
                                }
                                if let Some(w) = vars.w(s, k, r, v, b) {
                                    expr.add_term(w, cost);
                                }
                            }
                        }
                    }
                    TransshipmentLinearization::BerthAggregate => {
                        if let Some(tau) = vars.tau(s, k, b) {
                            expr.add_term(tau, 1.0);
                        }
                    }
                }
            }
        }
    }
    expr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{GeneratorConfig, InstanceGenerator};
    use proptest::prelude::*;

    fn instance() -> Instance {
        let config = GeneratorConfig::new(2, 3)
            .with_yard(3, 6)
            .with_compartments(2)
            .with_planning_horizon(48.0)
            .with_cargo_weight(1_000, 3_000)
            .with_seed(11);
        InstanceGenerator::generate(&config).unwrap()
    }

    #[test]
    fn test_compartment_start_upper() {
        let inst = instance();
        let h = inst.planning_horizon;
        assert_eq!(
            compartment_start_upper(&inst, 0, CompartmentHorizon::PlanningHorizon),
            h
        );
        assert!(
            (compartment_start_upper(&inst, 0, CompartmentHorizon::ShipProcessing)
                - (h + inst.max_processing_time(0)))
            .abs()
                < 1e-9
        );
    }

    #[test]
    fn test_transshipment_big_m_covers_worst_placement() {
        let inst = instance();
        let d = inst.dims;
        for s in 0..d.num_ships {
            for k in 0..d.num_ship_k {
                for b in 0..d.num_berths {
                    let mut costs: Vec<f64> = (0..d.num_rows)
                        .flat_map(|r| (0..d.num_slots_per_row).map(move |v| (r, v)))
                        .map(|(r, v)| inst.transshipment_cost[(b, r, v)])
                        .collect();
                    costs.sort_by(|a, b| b.total_cmp(a));
                    let n = inst.required_slots[(s, k)] as usize;
                    let worst: f64 = costs.iter().take(n).sum::<f64>() * inst.slot_weight(s, k);
                    assert!(transshipment_big_m(&inst, s, k, b, 0.0) + 1e-9 >= worst);
                }
            }
        }
    }

    #[test]
    fn test_margin_added_to_non_negative_span() {
        let mut inst = instance();
        inst.arrival_time[1] = inst.planning_horizon;
        let m0 = no_overlap_big_m(&inst, 0, 1, 0, 0.0);
        assert!((m0 - inst.processing_time(0, 0)).abs() < 1e-9);
        assert!((no_overlap_big_m(&inst, 0, 1, 0, 2.5) - m0 - 2.5).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_no_overlap_big_m_dominates_lhs(
            es in 0.0f64..=1.0,
            et in 0.0f64..=1.0,
        ) {
            let inst = instance();
            let h = inst.planning_horizon;
            for s in 0..inst.dims.num_ships {
                for t in (0..inst.dims.num_ships).filter(|&t| t != s) {
                    let e_s = inst.arrival_time[s] + es * (h - inst.arrival_time[s]);
                    let e_t = inst.arrival_time[t] + et * (h - inst.arrival_time[t]);
                    for b in 0..inst.dims.num_berths {
                        let lhs = e_s + inst.processing_time(s, b) - e_t;
                        prop_assert!(lhs <= no_overlap_big_m(&inst, s, t, b, 0.0) + 1e-9);
                    }
                }
            }
        }

        #[test]
        fn prop_compartment_order_big_m_dominates_lhs(
            ek in 0.0f64..=1.0,
            et in 0.0f64..=1.0,
        ) {
            let inst = instance();
            for horizon in [CompartmentHorizon::ShipProcessing, CompartmentHorizon::PlanningHorizon] {
                for s in 0..inst.dims.num_ships {
                    let upper = compartment_start_upper(&inst, s, horizon);
                    let lo = inst.arrival_time[s];
                    let e_k = lo + ek * (upper - lo);
                    let e_t = lo + et * (upper - lo);
                    for k in 0..inst.dims.num_ship_k {
                        for b in 0..inst.dims.num_berths {
                            let lhs = e_k + inst.compartment_duration(s, k, b) - e_t;
                            let m = compartment_order_big_m(&inst, s, k, b, upper, 0.0);
                            prop_assert!(lhs <= m + 1e-9);
                        }
                    }
                }
            }
        }
    }
}
