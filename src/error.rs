//! Crate-level error type.

use crate::formulation::FormulationError;
use crate::instance::{GeneratorError, InstanceError, SlotError};
use crate::interchange::InterchangeError;
use crate::interpret::InterpretError;
use crate::milp::ModelError;
use crate::planner::PlanError;
use thiserror::Error;

/// Any error this crate returns.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Slot(#[from] SlotError),

    #[error(transparent)]
    Instance(#[from] InstanceError),

    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Formulation(#[from] FormulationError),

    #[error(transparent)]
    Interpret(#[from] InterpretError),

    #[error(transparent)]
    Interchange(#[from] InterchangeError),

    #[error(transparent)]
    Plan(#[from] PlanError),
}

pub type Result<T> = std::result::Result<T, Error>;
