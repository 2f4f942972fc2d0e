//! Seeded random instance generation.
//!
//! Produces benchmark instances with the same distributions as the terminal's
//! historical test data. Generation is a pure function of the configuration:
//! the same seed always yields the same instance.

use super::grid::{Grid2, Grid3};
use super::slots::SlotError;
use super::types::{Dimensions, Geometry, Instance, InstanceError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::debug;

/// Instance generation failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeneratorError {
    #[error("invalid generator config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Slot(#[from] SlotError),

    #[error(transparent)]
    Instance(#[from] InstanceError),
}

/// Configuration for [`InstanceGenerator`].
///
/// Integer ranges are inclusive on both ends.
///
/// # Examples
///
/// ```
/// use u_bulkport::instance::{GeneratorConfig, InstanceGenerator};
///
/// let config = GeneratorConfig::new(2, 4)
///     .with_yard(4, 12)
///     .with_compartments(2)
///     .with_seed(7);
/// let instance = InstanceGenerator::generate(&config).unwrap();
/// assert_eq!(instance.dims.num_ships, 4);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeneratorConfig {
    /// Number of berths (default: 2).
    pub num_berths: usize,
    /// Number of ships (default: 3).
    pub num_ships: usize,
    /// Yard storage rows (default: 20).
    pub num_rows: usize,
    /// Slots per row (default: 24).
    pub num_slots_per_row: usize,
    /// Compartments per ship (default: 3).
    pub num_ship_k: usize,
    /// Planning horizon in hours (default: 168). Arrivals are drawn as whole
    /// hours in `[0, horizon]`.
    pub planning_horizon: f64,
    /// Row width and relative pile height (default: 50, 0.5).
    pub geometry: Geometry,
    /// Weight of transshipment and storage cost (default: 1).
    pub alpha: f64,
    /// Weight of berth time in hours (default: 20000).
    pub beta: f64,
    /// Cargo weight per ship in tonnes, inclusive (default: 60000..=300000).
    pub cargo_weight: (u32, u32),
    /// Storage cost per (ship, compartment, row) slot, inclusive (default: 900..=1200).
    pub storage_cost: (u32, u32),
    /// Base transshipment cost per (berth, row), inclusive (default: 15..=20).
    /// `transshipment_slot_step * slot` is added.
    pub transshipment_base: (u32, u32),
    /// Transshipment cost increment per slot index (default: 0.5).
    pub transshipment_slot_step: f64,
    /// Unloading speed in tonnes per hour, inclusive (default: 5000..=11000).
    pub unloading_speed: (u32, u32),
    /// Angle of repose range in degrees (default: 35..=50).
    pub response_angle_deg: (f64, f64),
    /// Cargo density in tonnes per cubic unit, inclusive (default: 2..=5).
    pub density: (u32, u32),
    /// Random seed (default: 42).
    pub seed: u64,
}

impl GeneratorConfig {
    /// Creates a configuration with the default yard and distributions.
    pub fn new(num_berths: usize, num_ships: usize) -> Self {
        Self {
            num_berths,
            num_ships,
            ..Self::default()
        }
    }

    pub fn with_yard(mut self, num_rows: usize, num_slots_per_row: usize) -> Self {
        self.num_rows = num_rows;
        self.num_slots_per_row = num_slots_per_row;
        self
    }

    pub fn with_compartments(mut self, num_ship_k: usize) -> Self {
        self.num_ship_k = num_ship_k;
        self
    }

    pub fn with_planning_horizon(mut self, horizon: f64) -> Self {
        self.planning_horizon = horizon;
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn with_weights(mut self, alpha: f64, beta: f64) -> Self {
        self.alpha = alpha;
        self.beta = beta;
        self
    }

    pub fn with_cargo_weight(mut self, min: u32, max: u32) -> Self {
        self.cargo_weight = (min, max);
        self
    }

    pub fn with_unloading_speed(mut self, min: u32, max: u32) -> Self {
        self.unloading_speed = (min, max);
        self
    }

    pub fn with_density(mut self, min: u32, max: u32) -> Self {
        self.density = (min, max);
        self
    }

    pub fn with_response_angle_deg(mut self, min: f64, max: f64) -> Self {
        self.response_angle_deg = (min, max);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.num_berths == 0 {
            return Err("num_berths must be positive".into());
        }
        if self.num_rows == 0 || self.num_slots_per_row == 0 {
            return Err("yard must have at least one row and one slot".into());
        }
        if self.num_ship_k == 0 {
            return Err("num_ship_k must be positive".into());
        }
        if !(self.planning_horizon.is_finite() && self.planning_horizon >= 1.0) {
            return Err(format!(
                "planning_horizon must be at least 1, got {}",
                self.planning_horizon
            ));
        }
        for (name, (lo, hi)) in [
            ("cargo_weight", self.cargo_weight),
            ("storage_cost", self.storage_cost),
            ("transshipment_base", self.transshipment_base),
            ("unloading_speed", self.unloading_speed),
            ("density", self.density),
        ] {
            if lo > hi {
                return Err(format!("{name} range is empty: [{lo}, {hi}]"));
            }
        }
        if self.unloading_speed.0 == 0 {
            return Err("unloading_speed must be positive".into());
        }
        if self.density.0 == 0 {
            return Err("density must be positive".into());
        }
        let (a_lo, a_hi) = self.response_angle_deg;
        if !(a_lo > 0.0 && a_lo <= a_hi && a_hi < 90.0) {
            return Err(format!(
                "response_angle_deg must satisfy 0 < min <= max < 90, got [{a_lo}, {a_hi}]"
            ));
        }
        if !self.transshipment_slot_step.is_finite() {
            return Err("transshipment_slot_step must be finite".into());
        }
        Ok(())
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            num_berths: 2,
            num_ships: 3,
            num_rows: 20,
            num_slots_per_row: 24,
            num_ship_k: 3,
            planning_horizon: 168.0,
            geometry: Geometry::new(50.0, 0.5),
            alpha: 1.0,
            beta: 20_000.0,
            cargo_weight: (60_000, 300_000),
            storage_cost: (900, 1200),
            transshipment_base: (15, 20),
            transshipment_slot_step: 0.5,
            unloading_speed: (5_000, 11_000),
            response_angle_deg: (35.0, 50.0),
            density: (2, 5),
            seed: 42,
        }
    }
}

/// Generates feasibility-checked random instances.
pub struct InstanceGenerator;

impl InstanceGenerator {
    /// Generates an instance from `config.seed`.
    pub fn generate(config: &GeneratorConfig) -> Result<Instance, GeneratorError> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        Self::generate_with_rng(config, &mut rng)
    }

    /// Generates an instance drawing from a caller-supplied source.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::CapacityExceeded`] (wrapped) when the drawn
    /// cargo needs more slots than the yard holds.
    pub fn generate_with_rng<R: Rng>(
        config: &GeneratorConfig,
        rng: &mut R,
    ) -> Result<Instance, GeneratorError> {
        config.validate().map_err(GeneratorError::InvalidConfig)?;

        let dims = Dimensions::new(
            config.num_berths,
            config.num_rows,
            config.num_slots_per_row,
            config.num_ships,
            config.num_ship_k,
        );
        let (s, b, r, v, k) = (
            dims.num_ships,
            dims.num_berths,
            dims.num_rows,
            dims.num_slots_per_row,
            dims.num_ship_k,
        );
        let mut instance = Instance::zeroed(dims, config.planning_horizon, config.geometry);
        instance.alpha = config.alpha;
        instance.beta = config.beta;

        let horizon = config.planning_horizon.floor() as u32;
        instance.arrival_time = (0..s)
            .map(|_| rng.random_range(0..=horizon) as f64)
            .collect();
        instance.unloading_speed =
            Grid3::from_fn(s, b, k, |_, _, _| draw(rng, config.unloading_speed));
        let step = config.transshipment_slot_step;
        instance.transshipment_cost = Grid3::from_fn(b, r, v, |_, _, slot| {
            draw(rng, config.transshipment_base) + step * slot as f64
        });
        instance.storage_cost = Grid3::from_fn(s, k, r, |_, _, _| draw(rng, config.storage_cost));
        instance.cargo_weight = (0..s).map(|_| draw(rng, config.cargo_weight)).collect();
        instance.cargo_density = Grid2::from_fn(s, k, |_, _| draw(rng, config.density));
        let (a_lo, a_hi) = config.response_angle_deg;
        instance.max_response_angle = Grid2::from_fn(s, k, |_, _| {
            rng.random_range(a_lo.to_radians()..=a_hi.to_radians())
        });

        let instance = instance.with_computed_slots()?;
        debug!(
            ships = s,
            berths = b,
            required = instance.total_required_slots(),
            capacity = dims.capacity(),
            seed = config.seed,
            "generated instance"
        );
        instance.check_capacity()?;
        Ok(instance)
    }
}

fn draw<R: Rng>(rng: &mut R, (lo, hi): (u32, u32)) -> f64 {
    rng.random_range(lo..=hi) as f64
}
