//! Terminal instance data: dimensions, cargo geometry and cost tables.
//!
//! # Key Components
//!
//! - [`Instance`]: immutable problem data in flat arenas ([`Grid2`], [`Grid3`])
//! - [`required_slots`]: storage-slot requirement from pile geometry
//! - [`InstanceGenerator`]: seeded random instances for tests and benchmarks
//!
//! An instance must satisfy `Σ required_slots <= rows * slots_per_row`;
//! [`Instance::validate`] enforces it before any model is built.

mod generator;
mod grid;
mod slots;
mod types;

pub use generator::{GeneratorConfig, GeneratorError, InstanceGenerator};
pub use grid::{Grid2, Grid3};
pub use slots::{required_slot_table, required_slots, SlotError};
pub use types::{Dimensions, Geometry, Instance, InstanceError};
