//! Interpreted solution: assignments, placements and cost decomposition.

use super::intervals::SlotInterval;
use crate::instance::Instance;
use crate::milp::SolverStatus;
use std::collections::HashMap;
use std::fmt;

/// Where and when one compartment is handled.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompartmentPlacement {
    pub compartment: usize,
    /// First row with `f > 0.5`.
    pub row: Option<usize>,
    /// Occupied slots of `row`, increasing.
    pub slots: Vec<usize>,
    pub intervals: Vec<SlotInterval>,
    /// Occupied cells outside `row`.
    pub stray: Vec<(usize, usize)>,
    /// Compartment start `e_sk`.
    pub start_time: f64,
}

/// Per-ship cost decomposition, recomputed from variable values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShipCost {
    pub transshipment: f64,
    pub storage: f64,
    /// Waiting plus unloading time.
    pub berth_time: f64,
    /// `alpha * (transshipment + storage) + beta * berth_time`.
    pub weighted: f64,
}

impl ShipCost {
    pub(crate) fn accumulate(&mut self, other: &ShipCost) {
        self.transshipment += other.transshipment;
        self.storage += other.storage;
        self.berth_time += other.berth_time;
        self.weighted += other.weighted;
    }
}

/// Decisions and costs of one ship.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShipPlan {
    pub ship: usize,
    /// Every berth with `z > 0.5`; a valid solution has exactly one.
    pub berths: Vec<usize>,
    /// Ship start `e`.
    pub start_time: f64,
    pub compartments: Vec<CompartmentPlacement>,
    pub cost: ShipCost,
}

impl ShipPlan {
    pub fn berth(&self) -> Option<usize> {
        self.berths.first().copied()
    }

    /// Start plus processing time at the assigned berth.
    pub fn end_time(&self, instance: &Instance) -> Option<f64> {
        self.berth()
            .map(|b| self.start_time + instance.processing_time(self.ship, b))
    }
}

/// A post-solve property that does not hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    SlotDoubleBooked {
        row: usize,
        slot: usize,
        /// `(ship, compartment)` pairs.
        occupants: Vec<(usize, usize)>,
    },
    WrongSlotCount {
        ship: usize,
        compartment: usize,
        expected: u32,
        found: usize,
    },
    NotContiguous {
        ship: usize,
        compartment: usize,
        runs: usize,
    },
    OutsideRow {
        ship: usize,
        compartment: usize,
        cells: usize,
    },
    BerthCount {
        ship: usize,
        count: usize,
    },
    Overlap {
        berth: usize,
        first: usize,
        second: usize,
    },
    /// A compartment starts before its ship.
    CompartmentBeforeShip {
        ship: usize,
        compartment: usize,
    },
    /// Two compartments of one ship are unloaded at the same time.
    CompartmentOverlap {
        ship: usize,
        first: usize,
        second: usize,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::SlotDoubleBooked {
                row,
                slot,
                occupants,
            } => write!(f, "row {row} slot {slot} held by {occupants:?}"),
            Violation::WrongSlotCount {
                ship,
                compartment,
                expected,
                found,
            } => write!(
                f,
                "ship {ship} compartment {compartment}: {found} slots, expected {expected}"
            ),
            Violation::NotContiguous {
                ship,
                compartment,
                runs,
            } => write!(f, "ship {ship} compartment {compartment} split into {runs} runs"),
            Violation::OutsideRow {
                ship,
                compartment,
                cells,
            } => write!(
                f,
                "ship {ship} compartment {compartment} has {cells} cells outside its row"
            ),
            Violation::BerthCount { ship, count } => {
                write!(f, "ship {ship} assigned to {count} berths")
            }
            Violation::Overlap {
                berth,
                first,
                second,
            } => write!(f, "ships {first} and {second} overlap at berth {berth}"),
            Violation::CompartmentBeforeShip { ship, compartment } => {
                write!(f, "ship {ship} compartment {compartment} starts before the ship")
            }
            Violation::CompartmentOverlap {
                ship,
                first,
                second,
            } => write!(
                f,
                "ship {ship} compartments {first} and {second} overlap in time"
            ),
        }
    }
}

/// Tolerance of the time comparisons in [`SolutionReport::verify`].
const TIME_TOLERANCE: f64 = 1e-6;

/// `a <= b` up to [`TIME_TOLERANCE`], relative for large times.
fn before(a: f64, b: f64) -> bool {
    a <= b + TIME_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

/// Compartments start no earlier than their ship and are unloaded one at a
/// time at the assigned berth.
fn check_compartment_order(
    plan: &ShipPlan,
    instance: &Instance,
    violations: &mut Vec<Violation>,
) {
    let Some(berth) = plan.berth() else {
        return;
    };
    let span = |c: &CompartmentPlacement| {
        let end = c.start_time + instance.compartment_duration(plan.ship, berth, c.compartment);
        (c.start_time, end)
    };

    for (i, a) in plan.compartments.iter().enumerate() {
        if !before(plan.start_time, a.start_time) {
            violations.push(Violation::CompartmentBeforeShip {
                ship: plan.ship,
                compartment: a.compartment,
            });
        }
        let (a_start, a_end) = span(a);
        for b in &plan.compartments[i + 1..] {
            let (b_start, b_end) = span(b);
            if !(before(a_end, b_start) || before(b_end, a_start)) {
                violations.push(Violation::CompartmentOverlap {
                    ship: plan.ship,
                    first: a.compartment,
                    second: b.compartment,
                });
            }
        }
    }
}

/// Readable form of a solved model.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolutionReport {
    pub status: SolverStatus,
    /// Solver-reported objective.
    pub objective_value: Option<f64>,
    pub alpha: f64,
    pub beta: f64,
    pub ships: Vec<ShipPlan>,
    /// Sum of the per-ship decompositions.
    pub total: ShipCost,
}

impl SolutionReport {
    /// Whether the recomputed weighted total equals the solver objective
    /// within relative tolerance `rel_tol`.
    pub fn objective_matches(&self, rel_tol: f64) -> bool {
        let Some(reported) = self.objective_value else {
            return false;
        };
        let diff = (reported - self.total.weighted).abs();
        diff <= rel_tol * reported.abs().max(1.0)
    }

    /// Checks exclusivity, contiguity, slot counts, single berth, berth
    /// no-overlap and compartment sequencing. An empty list means every
    /// property holds.
    pub fn verify(&self, instance: &Instance) -> Vec<Violation> {
        let mut violations = Vec::new();
        let mut cells: HashMap<(usize, usize), Vec<(usize, usize)>> = HashMap::new();

        for plan in &self.ships {
            if plan.berths.len() != 1 {
                violations.push(Violation::BerthCount {
                    ship: plan.ship,
                    count: plan.berths.len(),
                });
            }
            for c in &plan.compartments {
                let expected = instance.required_slots[(plan.ship, c.compartment)];
                let found = c.slots.len() + c.stray.len();
                if found != expected as usize {
                    violations.push(Violation::WrongSlotCount {
                        ship: plan.ship,
                        compartment: c.compartment,
                        expected,
                        found,
                    });
                }
                if c.intervals.len() > 1 {
                    violations.push(Violation::NotContiguous {
                        ship: plan.ship,
                        compartment: c.compartment,
                        runs: c.intervals.len(),
                    });
                }
                if !c.stray.is_empty() {
                    violations.push(Violation::OutsideRow {
                        ship: plan.ship,
                        compartment: c.compartment,
                        cells: c.stray.len(),
                    });
                }
                let occupied = c
                    .row
                    .into_iter()
                    .flat_map(|r| c.slots.iter().map(move |&v| (r, v)))
                    .chain(c.stray.iter().copied());
                for cell in occupied {
                    cells
                        .entry(cell)
                        .or_default()
                        .push((plan.ship, c.compartment));
                }
            }
            check_compartment_order(plan, instance, &mut violations);
        }

        let mut double: Vec<_> = cells
            .into_iter()
            .filter(|(_, occ)| occ.len() > 1)
            .collect();
        double.sort_by_key(|(cell, _)| *cell);
        violations.extend(
            double
                .into_iter()
                .map(|((row, slot), occupants)| Violation::SlotDoubleBooked {
                    row,
                    slot,
                    occupants,
                }),
        );

        for (i, a) in self.ships.iter().enumerate() {
            for b in &self.ships[i + 1..] {
                let (Some(berth), Some(other)) = (a.berth(), b.berth()) else {
                    continue;
                };
                if berth != other {
                    continue;
                }
                let (Some(a_end), Some(b_end)) = (a.end_time(instance), b.end_time(instance))
                else {
                    continue;
                };
                let disjoint = before(a_end, b.start_time) || before(b_end, a.start_time);
                if !disjoint {
                    violations.push(Violation::Overlap {
                        berth,
                        first: a.ship,
                        second: b.ship,
                    });
                }
            }
        }

        violations
    }
}
