//! Storage-slot requirement from pile geometry.
//!
//! A compartment's cargo is stored as a pile of trapezoidal cross-section whose
//! slope is bounded by the cargo's angle of repose. The number of yard slots a
//! compartment needs follows from its volume and the row geometry:
//!
//! ```text
//! volume   = weight / (density * K)
//! term     = 4 / (w^3 * c * (2 - c) * tan(theta))
//! inside   = volume + (1/12) * w^3 * c^2 * (3 - 2c) * tan(theta)
//! required = ceil(term * inside)
//! ```
//!
//! where `w` is the row width, `c` the relative pile height and `K` the
//! number of compartments per ship.

use super::grid::Grid2;
use super::types::Geometry;
use std::f64::consts::FRAC_PI_2;
use thiserror::Error;

/// Invalid geometry or cargo data for the slot calculation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SlotError {
    #[error("response angle {angle} rad is outside (0, pi/2)")]
    InvalidAngle { angle: f64 },

    #[error("cargo density must be positive, got {0}")]
    NonPositiveDensity(f64),

    #[error("cargo weight must be a non-negative finite number, got {0}")]
    InvalidWeight(f64),

    #[error("compartment count must be positive")]
    NoCompartments,

    #[error("relative height must lie in (0, 2), got {0}")]
    InvalidRelativeHeight(f64),

    #[error("row width must be positive, got {0}")]
    InvalidWidth(f64),

    #[error("slot requirement {0} cannot be represented")]
    Unrepresentable(f64),
}

/// Computes the number of slots one compartment requires.
///
/// # Errors
///
/// Angles at or beyond 90° (where `tan` diverges), non-positive densities and
/// degenerate geometry are rejected instead of producing NaN or infinity.
///
/// # Examples
///
/// ```
/// use u_bulkport::instance::{required_slots, Geometry};
///
/// let geometry = Geometry::new(50.0, 0.5);
/// let n = required_slots(180_000.0, 3.5, 40f64.to_radians(), &geometry, 3).unwrap();
/// assert_eq!(n, 2);
/// ```
pub fn required_slots(
    cargo_weight: f64,
    density: f64,
    angle: f64,
    geometry: &Geometry,
    compartments: usize,
) -> Result<u32, SlotError> {
    if compartments == 0 {
        return Err(SlotError::NoCompartments);
    }
    if !(cargo_weight.is_finite() && cargo_weight >= 0.0) {
        return Err(SlotError::InvalidWeight(cargo_weight));
    }
    if !(density.is_finite() && density > 0.0) {
        return Err(SlotError::NonPositiveDensity(density));
    }
    if !(angle.is_finite() && angle > 0.0 && angle < FRAC_PI_2) {
        return Err(SlotError::InvalidAngle { angle });
    }
    let w = geometry.width;
    if !(w.is_finite() && w > 0.0) {
        return Err(SlotError::InvalidWidth(w));
    }
    let c = geometry.relative_height;
    if !(c.is_finite() && c > 0.0 && c < 2.0) {
        return Err(SlotError::InvalidRelativeHeight(c));
    }

    let tan = angle.tan();
    let w3 = w.powi(3);
    let volume = cargo_weight / (density * compartments as f64);
    let term = 4.0 / (w3 * c * (2.0 - c) * tan);
    let inside = volume + (1.0 / 12.0) * w3 * c * c * (3.0 - 2.0 * c) * tan;
    let required = (term * inside).ceil().max(0.0);

    if !required.is_finite() || required > u32::MAX as f64 {
        return Err(SlotError::Unrepresentable(required));
    }
    Ok(required as u32)
}

/// Computes the `[ship][compartment]` slot requirement table.
///
/// `cargo_weight` is per ship; `density` and `angle` are per
/// `(ship, compartment)`.
pub fn required_slot_table(
    cargo_weight: &[f64],
    density: &Grid2<f64>,
    angle: &Grid2<f64>,
    geometry: &Geometry,
) -> Result<Grid2<u32>, SlotError> {
    let [ships, compartments] = density.dims();
    let mut table = Grid2::filled(ships, compartments, 0u32);
    for s in 0..ships {
        let weight = cargo_weight.get(s).copied().unwrap_or(0.0);
        for k in 0..compartments {
            table[(s, k)] = required_slots(
                weight,
                density[(s, k)],
                angle[(s, k)],
                geometry,
                compartments,
            )?;
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reference(weight: f64, density: f64, angle: f64, w: f64, c: f64, k: usize) -> f64 {
        let volume = weight / (density * k as f64);
        let term = 4.0 / (w.powi(3) * c * (2.0 - c) * angle.tan());
        let inside = volume + w.powi(3) * c.powi(2) * (3.0 - 2.0 * c) * angle.tan() / 12.0;
        (term * inside).ceil()
    }

    #[test]
    fn test_matches_closed_form() {
        let geometry = Geometry::new(50.0, 0.5);
        let angle = 42f64.to_radians();
        let n = required_slots(240_000.0, 2.0, angle, &geometry, 3).unwrap();
        assert_eq!(n as f64, reference(240_000.0, 2.0, angle, 50.0, 0.5, 3));
    }

    #[test]
    fn test_small_geometry_needs_many_slots() {
        let geometry = Geometry::new(5.0, 0.5);
        let n = required_slots(1000.0, 1.0, 45f64.to_radians(), &geometry, 1).unwrap();
        // 4 / (125 * 0.75) * (1000 + 125 * 0.25 * 2 / 12)
        assert_eq!(n, 43);
    }

    #[test]
    fn test_right_angle_rejected() {
        let geometry = Geometry::new(50.0, 0.5);
        let err = required_slots(1000.0, 2.0, FRAC_PI_2, &geometry, 3).unwrap_err();
        assert!(matches!(err, SlotError::InvalidAngle { .. }));
        assert!(required_slots(1000.0, 2.0, 100f64.to_radians(), &geometry, 3).is_err());
        assert!(required_slots(1000.0, 2.0, 0.0, &geometry, 3).is_err());
    }

    #[test]
    fn test_degenerate_inputs_rejected() {
        let geometry = Geometry::new(50.0, 0.5);
        let angle = 40f64.to_radians();
        assert_eq!(
            required_slots(1000.0, 0.0, angle, &geometry, 3),
            Err(SlotError::NonPositiveDensity(0.0))
        );
        assert_eq!(
            required_slots(1000.0, 2.0, angle, &geometry, 0),
            Err(SlotError::NoCompartments)
        );
        assert!(required_slots(1000.0, 2.0, angle, &Geometry::new(50.0, 2.0), 3).is_err());
        assert!(required_slots(1000.0, 2.0, angle, &Geometry::new(-1.0, 0.5), 3).is_err());
        assert!(required_slots(f64::NAN, 2.0, angle, &geometry, 3).is_err());
    }

    #[test]
    fn test_table_shape() {
        let geometry = Geometry::new(50.0, 0.5);
        let density = Grid2::filled(2, 3, 3.0);
        let angle = Grid2::filled(2, 3, 40f64.to_radians());
        let table =
            required_slot_table(&[100_000.0, 250_000.0], &density, &angle, &geometry).unwrap();
        assert_eq!(table.dims(), [2, 3]);
        assert!(table[(1, 0)] >= table[(0, 0)]);
    }

    proptest! {
        #[test]
        fn prop_monotone_in_weight(
            weight in 0.0f64..500_000.0,
            extra in 0.0f64..100_000.0,
            density in 1.0f64..6.0,
            angle_deg in 30.0f64..55.0,
        ) {
            let geometry = Geometry::new(50.0, 0.5);
            let angle = angle_deg.to_radians();
            let a = required_slots(weight, density, angle, &geometry, 3).unwrap();
            let b = required_slots(weight + extra, density, angle, &geometry, 3).unwrap();
            prop_assert!(b >= a);
            prop_assert!(a >= 1);
        }
    }
}
