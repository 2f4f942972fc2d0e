//! Terminal MILP formulation.
//!
//! Translates an [`Instance`](crate::instance::Instance) into a
//! [`MilpModel`](crate::milp::MilpModel) that jointly decides berth
//! assignment, contiguous yard placement per compartment and unloading
//! order.
//!
//! # Key Components
//!
//! - [`ModelBuilder`]: validates the instance and emits every constraint family
//! - [`VarIndex`]: flat handle arenas for `z, x, h, f, y, q, e, e_sk, omega,
//!   lambda, mu` and the linearisation variables
//! - [`FormulationConfig`]: linearisation choice, compartment horizon, big-M margin
//! - Big-M helpers ([`no_overlap_big_m`], [`compartment_order_big_m`],
//!   [`transshipment_big_m`]): constants derived from variable bounds
//!
//! # Objective
//!
//! ```text
//! minimise alpha * (transshipment + storage) + beta * berth_time
//! ```
//!
//! The transshipment term multiplies a slot decision by a berth decision; it
//! is linearised either with one product variable per pair
//! ([`TransshipmentLinearization::Product`]) or with one aggregated cost
//! variable per compartment and berth
//! ([`TransshipmentLinearization::BerthAggregate`]).

mod builder;
mod config;
mod indexing;
mod linearize;

pub use builder::{family, BuildReport, Formulation, FormulationError, ModelBuilder};
pub use config::{CompartmentHorizon, FormulationConfig, TransshipmentLinearization};
pub use indexing::{VarGrid, VarIndex};
pub use linearize::{
    compartment_order_big_m, compartment_start_upper, no_overlap_big_m, transshipment_big_m,
    BigMSummary,
};
