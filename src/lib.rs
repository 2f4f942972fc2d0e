//! Bulk-cargo terminal planning as a mixed-integer linear program.
//!
//! Ships arrive at a terminal, are assigned to berths and unloaded
//! compartment by compartment into a storage yard of rows and slots. This
//! crate decides, in one model:
//!
//! - **Berth assignment**: every ship to exactly one berth, with no two ships
//!   overlapping at a shared berth.
//! - **Yard placement**: every compartment to one contiguous slot range in a
//!   single row, sized from the pile geometry of its cargo.
//! - **Unloading order**: a sequence of compartments per ship.
//!
//! The objective weighs transshipment and storage cost against total berth
//! time.
//!
//! # Modules
//!
//! - [`instance`]: problem data, slot requirement calculator, seeded generator
//! - [`milp`]: solver-agnostic MILP model, solver contract, `good_lp` backend
//! - [`formulation`]: instance to model, with big-M linearisation
//! - [`interpret`]: solver values to assignments, intervals and costs
//! - [`interchange`]: CSV parameters and results
//! - [`planner`]: the whole pipeline behind one call
//!
//! # Example
//!
//! ```no_run
//! use u_bulkport::instance::{GeneratorConfig, InstanceGenerator};
//! use u_bulkport::milp::GoodLpBackend;
//! use u_bulkport::planner::{PlanConfig, Planner};
//!
//! let instance = InstanceGenerator::generate(
//!     &GeneratorConfig::new(1, 2).with_yard(4, 8).with_compartments(2),
//! )?;
//! let outcome = Planner::run(&instance, &PlanConfig::default(), &mut GoodLpBackend::new())?;
//! if let Some(report) = outcome.report {
//!     for ship in &report.ships {
//!         println!("ship {} -> berth {:?} at {}", ship.ship, ship.berth(), ship.start_time);
//!     }
//! }
//! # Ok::<(), u_bulkport::Error>(())
//! ```

pub mod error;
pub mod formulation;
pub mod instance;
pub mod interchange;
pub mod interpret;
pub mod milp;
pub mod planner;

pub use error::{Error, Result};

