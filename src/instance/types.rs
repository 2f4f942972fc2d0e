//! Problem instance data.

use super::grid::{Grid2, Grid3};
use super::slots::{required_slot_table, SlotError};
use thiserror::Error;

/// Index-space sizes of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dimensions {
    /// Number of berths (`B`), at least 1.
    pub num_berths: usize,
    /// Number of yard storage rows (`R`), at least 1.
    pub num_rows: usize,
    /// Slots in every row (`V`), at least 1.
    pub num_slots_per_row: usize,
    /// Number of ships (`S`).
    pub num_ships: usize,
    /// Compartments per ship (`K`), at least 1.
    pub num_ship_k: usize,
}

impl Dimensions {
    pub fn new(
        num_berths: usize,
        num_rows: usize,
        num_slots_per_row: usize,
        num_ships: usize,
        num_ship_k: usize,
    ) -> Self {
        Self {
            num_berths,
            num_rows,
            num_slots_per_row,
            num_ships,
            num_ship_k,
        }
    }

    /// Total number of physical yard slots.
    pub fn capacity(&self) -> usize {
        self.num_rows * self.num_slots_per_row
    }

    /// Entry count of the largest array an [`Instance`] of these dimensions
    /// holds, or `None` when it overflows `usize`.
    pub fn largest_table(&self) -> Option<usize> {
        let (b, r, v, s, k) = (
            self.num_berths,
            self.num_rows,
            self.num_slots_per_row,
            self.num_ships,
            self.num_ship_k,
        );
        let tables = [
            Some(s),
            s.checked_mul(b)?.checked_mul(k),
            b.checked_mul(r)?.checked_mul(v),
            s.checked_mul(k)?.checked_mul(r),
        ];
        tables.into_iter().try_fold(0, |acc, n| n.map(|n| acc.max(n)))
    }
}

/// Storage-row geometry shared by every pile.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Geometry {
    /// Row width `w`.
    pub width: f64,
    /// Relative pile height `c`, in (0, 2).
    pub relative_height: f64,
}

impl Geometry {
    pub fn new(width: f64, relative_height: f64) -> Self {
        Self {
            width,
            relative_height,
        }
    }
}

/// Rejected instance data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InstanceError {
    /// Total slot demand does not fit in the yard.
    #[error("required slots ({required}) exceed yard capacity ({available})")]
    CapacityExceeded { required: usize, available: usize },

    #[error("instance has no {0}")]
    EmptyDimension(&'static str),

    #[error("{field}: expected {expected} entries, found {found}")]
    ShapeMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{field}: expected dimensions {expected:?}, found {found:?}")]
    GridDimensions {
        field: &'static str,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("{field}: non-finite value at flat index {index}")]
    NonFinite { field: &'static str, index: usize },

    #[error("planning horizon must be positive and finite, got {0}")]
    InvalidHorizon(f64),

    #[error("ship {ship} arrives at {arrival}, outside [0, {horizon}]")]
    ArrivalOutsideHorizon {
        ship: usize,
        arrival: f64,
        horizon: f64,
    },

    #[error(
        "ship {ship} compartment {compartment} needs {required} slots but a row holds {row_len}"
    )]
    CompartmentExceedsRow {
        ship: usize,
        compartment: usize,
        required: u32,
        row_len: usize,
    },

    #[error(transparent)]
    Slot(#[from] SlotError),
}

/// A complete terminal instance.
///
/// Per-entity data lives in flat arenas indexed as follows:
///
/// | field | index |
/// |---|---|
/// | `cargo_density`, `max_response_angle`, `required_slots` | `(ship, compartment)` |
/// | `unloading_speed` | `(ship, berth, compartment)` |
/// | `transshipment_cost` | `(berth, row, slot)` |
/// | `storage_cost` | `(ship, compartment, row)` |
///
/// An instance is read-only once handed to the model builder.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instance {
    pub dims: Dimensions,
    pub planning_horizon: f64,
    pub geometry: Geometry,
    /// Weight of the cost terms in the objective.
    pub alpha: f64,
    /// Weight of the berth-time term in the objective.
    pub beta: f64,
    pub arrival_time: Vec<f64>,
    pub cargo_weight: Vec<f64>,
    pub cargo_density: Grid2<f64>,
    /// Angle of repose, in radians.
    pub max_response_angle: Grid2<f64>,
    pub required_slots: Grid2<u32>,
    pub unloading_speed: Grid3<f64>,
    pub transshipment_cost: Grid3<f64>,
    pub storage_cost: Grid3<f64>,
}

impl Instance {
    /// Creates an instance with every array zero-filled to the right shape.
    pub fn zeroed(dims: Dimensions, planning_horizon: f64, geometry: Geometry) -> Self {
        let Dimensions {
            num_berths: b,
            num_rows: r,
            num_slots_per_row: v,
            num_ships: s,
            num_ship_k: k,
        } = dims;
        Self {
            dims,
            planning_horizon,
            geometry,
            alpha: 1.0,
            beta: 1.0,
            arrival_time: vec![0.0; s],
            cargo_weight: vec![0.0; s],
            cargo_density: Grid2::filled(s, k, 0.0),
            max_response_angle: Grid2::filled(s, k, 0.0),
            required_slots: Grid2::filled(s, k, 0),
            unloading_speed: Grid3::filled(s, b, k, 0.0),
            transshipment_cost: Grid3::filled(b, r, v, 0.0),
            storage_cost: Grid3::filled(s, k, r, 0.0),
        }
    }

    /// Recomputes `required_slots` from cargo geometry.
    pub fn with_computed_slots(mut self) -> Result<Self, SlotError> {
        self.required_slots = required_slot_table(
            &self.cargo_weight,
            &self.cargo_density,
            &self.max_response_angle,
            &self.geometry,
        )?;
        Ok(self)
    }

    pub fn total_required_slots(&self) -> usize {
        self.required_slots
            .as_slice()
            .iter()
            .map(|&n| n as usize)
            .sum()
    }

    /// Fails when total slot demand exceeds yard capacity.
    pub fn check_capacity(&self) -> Result<(), InstanceError> {
        let required = self.total_required_slots();
        let available = self.dims.capacity();
        if required > available {
            return Err(InstanceError::CapacityExceeded {
                required,
                available,
            });
        }
        Ok(())
    }

    /// Validates shapes, values and the capacity invariant.
    pub fn validate(&self) -> Result<(), InstanceError> {
        let d = self.dims;
        if d.num_berths == 0 {
            return Err(InstanceError::EmptyDimension("berths"));
        }
        if d.num_rows == 0 {
            return Err(InstanceError::EmptyDimension("rows"));
        }
        if d.num_slots_per_row == 0 {
            return Err(InstanceError::EmptyDimension("slots per row"));
        }
        if d.num_ship_k == 0 {
            return Err(InstanceError::EmptyDimension("compartments"));
        }
        if !(self.planning_horizon.is_finite() && self.planning_horizon > 0.0) {
            return Err(InstanceError::InvalidHorizon(self.planning_horizon));
        }

        let s = d.num_ships;
        let k = d.num_ship_k;
        check_shape("arrival_time", self.arrival_time.len(), s)?;
        check_shape("cargo_weight", self.cargo_weight.len(), s)?;
        check_dims("cargo_density", &self.cargo_density.dims(), &[s, k])?;
        check_dims("max_response_angle", &self.max_response_angle.dims(), &[s, k])?;
        check_dims("required_slots", &self.required_slots.dims(), &[s, k])?;
        check_dims(
            "unloading_speed",
            &self.unloading_speed.dims(),
            &[s, d.num_berths, k],
        )?;
        check_dims(
            "transshipment_cost",
            &self.transshipment_cost.dims(),
            &[d.num_berths, d.num_rows, d.num_slots_per_row],
        )?;
        check_dims("storage_cost", &self.storage_cost.dims(), &[s, k, d.num_rows])?;

        check_finite("arrival_time", &self.arrival_time)?;
        check_finite("cargo_weight", &self.cargo_weight)?;
        check_finite("unloading_speed", self.unloading_speed.as_slice())?;
        check_finite("transshipment_cost", self.transshipment_cost.as_slice())?;
        check_finite("storage_cost", self.storage_cost.as_slice())?;
        check_finite("weights", &[self.alpha, self.beta])?;

        for (ship, &arrival) in self.arrival_time.iter().enumerate() {
            if arrival < 0.0 || arrival > self.planning_horizon {
                return Err(InstanceError::ArrivalOutsideHorizon {
                    ship,
                    arrival,
                    horizon: self.planning_horizon,
                });
            }
        }

        for ((ship, compartment), &required) in self.required_slots.indexed() {
            if required as usize > d.num_slots_per_row {
                return Err(InstanceError::CompartmentExceedsRow {
                    ship,
                    compartment,
                    required,
                    row_len: d.num_slots_per_row,
                });
            }
        }

        self.check_capacity()
    }

    /// Unloading speed with non-positive entries replaced by 1.
    pub fn guarded_speed(&self, ship: usize, berth: usize, compartment: usize) -> f64 {
        let speed = self.unloading_speed[(ship, berth, compartment)];
        if speed <= 0.0 {
            1.0
        } else {
            speed
        }
    }

    /// `(ship, berth, compartment)` entries whose speed gets substituted.
    pub fn non_positive_speeds(&self) -> Vec<(usize, usize, usize)> {
        self.unloading_speed
            .indexed()
            .filter(|(_, &speed)| speed <= 0.0)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Time to unload one compartment at a berth.
    pub fn compartment_duration(&self, ship: usize, berth: usize, compartment: usize) -> f64 {
        self.cargo_weight[ship]
            / (self.dims.num_ship_k as f64 * self.guarded_speed(ship, berth, compartment))
    }

    /// Time to unload a whole ship at a berth, compartments in series.
    pub fn processing_time(&self, ship: usize, berth: usize) -> f64 {
        (0..self.dims.num_ship_k)
            .map(|k| self.compartment_duration(ship, berth, k))
            .sum()
    }

    /// Longest processing time of a ship over all berths.
    pub fn max_processing_time(&self, ship: usize) -> f64 {
        (0..self.dims.num_berths)
            .map(|b| self.processing_time(ship, b))
            .fold(0.0, f64::max)
    }

    /// Cargo weight carried by each occupied slot of a compartment.
    ///
    /// Zero for compartments that need no slots.
    pub fn slot_weight(&self, ship: usize, compartment: usize) -> f64 {
        let required = self.required_slots[(ship, compartment)];
        if required == 0 {
            return 0.0;
        }
        self.cargo_weight[ship] / (required as f64 * self.dims.num_ship_k as f64)
    }
}

fn check_shape(field: &'static str, found: usize, expected: usize) -> Result<(), InstanceError> {
    if found != expected {
        return Err(InstanceError::ShapeMismatch {
            field,
            expected,
            found,
        });
    }
    Ok(())
}

fn check_dims(
    field: &'static str,
    found: &[usize],
    expected: &[usize],
) -> Result<(), InstanceError> {
    if found != expected {
        return Err(InstanceError::GridDimensions {
            field,
            expected: expected.to_vec(),
            found: found.to_vec(),
        });
    }
    Ok(())
}

fn check_finite(field: &'static str, values: &[f64]) -> Result<(), InstanceError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(InstanceError::NonFinite { field, index }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Instance {
        let dims = Dimensions::new(1, 2, 4, 2, 1);
        let mut inst = Instance::zeroed(dims, 100.0, Geometry::new(50.0, 0.5));
        inst.arrival_time = vec![0.0, 5.0];
        inst.cargo_weight = vec![100.0, 60.0];
        inst.required_slots = Grid2::from_fn(2, 1, |_, _| 3);
        inst.unloading_speed = Grid3::filled(2, 1, 1, 10.0);
        inst
    }

    #[test]
    fn test_valid_instance() {
        let inst = small();
        assert!(inst.validate().is_ok());
        assert_eq!(inst.total_required_slots(), 6);
        assert_eq!(inst.dims.capacity(), 8);
    }

    #[test]
    fn test_capacity_exceeded() {
        let mut inst = small();
        inst.required_slots = Grid2::from_fn(2, 1, |_, _| 4);
        inst.dims.num_rows = 1;
        inst.transshipment_cost = Grid3::filled(1, 1, 4, 0.0);
        inst.storage_cost = Grid3::filled(2, 1, 1, 0.0);
        assert_eq!(
            inst.validate(),
            Err(InstanceError::CapacityExceeded {
                required: 8,
                available: 4
            })
        );
    }

    #[test]
    fn test_compartment_longer_than_row() {
        let mut inst = small();
        inst.required_slots[(0, 0)] = 5;
        assert!(matches!(
            inst.validate(),
            Err(InstanceError::CompartmentExceedsRow { ship: 0, .. })
        ));
    }

    #[test]
    fn test_shape_and_value_checks() {
        let mut inst = small();
        inst.cargo_weight.pop();
        assert!(matches!(
            inst.validate(),
            Err(InstanceError::ShapeMismatch {
                field: "cargo_weight",
                ..
            })
        ));

        let mut inst = small();
        inst.storage_cost[(1, 0, 1)] = f64::NAN;
        assert!(matches!(
            inst.validate(),
            Err(InstanceError::NonFinite {
                field: "storage_cost",
                ..
            })
        ));

        let mut inst = small();
        inst.arrival_time[1] = 101.0;
        assert!(matches!(
            inst.validate(),
            Err(InstanceError::ArrivalOutsideHorizon { ship: 1, .. })
        ));
    }

    #[test]
    fn test_transposed_grid_is_rejected() {
        // same cell count as (ship, berth, compartment) = (2, 1, 1)
        let mut inst = small();
        inst.unloading_speed = Grid3::filled(1, 2, 1, 10.0);
        assert_eq!(
            inst.validate(),
            Err(InstanceError::GridDimensions {
                field: "unloading_speed",
                expected: vec![2, 1, 1],
                found: vec![1, 2, 1],
            })
        );

        let mut inst = small();
        inst.transshipment_cost = Grid3::filled(1, 4, 2, 0.0);
        assert!(matches!(
            inst.validate(),
            Err(InstanceError::GridDimensions {
                field: "transshipment_cost",
                ..
            })
        ));

        let mut inst = small();
        inst.required_slots = Grid2::filled(1, 2, 3);
        assert!(matches!(
            inst.validate(),
            Err(InstanceError::GridDimensions {
                field: "required_slots",
                ..
            })
        ));
    }

    #[test]
    fn test_largest_table() {
        let d = Dimensions::new(2, 3, 4, 5, 6);
        assert_eq!(d.largest_table(), Some(5 * 6 * 3));
        assert_eq!(Dimensions::new(1, 1, 1, 7, 0).largest_table(), Some(7));
        assert_eq!(
            Dimensions::new(2, usize::MAX / 2, 3, 1, 1).largest_table(),
            None
        );
    }

    #[test]
    fn test_speed_guard_and_durations() {
        let mut inst = small();
        inst.unloading_speed[(1, 0, 0)] = 0.0;
        assert_eq!(inst.guarded_speed(1, 0, 0), 1.0);
        assert_eq!(inst.non_positive_speeds(), vec![(1, 0, 0)]);
        assert!((inst.processing_time(0, 0) - 10.0).abs() < 1e-12);
        assert!((inst.processing_time(1, 0) - 60.0).abs() < 1e-12);
        assert!((inst.slot_weight(0, 0) - 100.0 / 3.0).abs() < 1e-12);
    }
}
