//! Mixed-integer linear programming (MILP) modelling layer.
//!
//! Provides a solver-agnostic model of Boolean and continuous variables,
//! linear constraints grouped by family, and a linear objective.
//!
//! # Key Components
//!
//! - **Variables**: [`VarId`], [`VarDecl`]: dense ids in declaration order
//! - **Model**: [`MilpModel`]: container for variables, constraints, objective
//! - **Solver**: [`SolverBackend`] trait: the opaque solver contract
//! - **Backend**: [`GoodLpBackend`]: `good_lp` with the pure-Rust `microlp` solver
//! - **Export**: [`write_lp`]: CPLEX LP text for external diagnosis
//!
//! # Design
//!
//! The model never talks to a solver directly. [`load_into`] replays it into
//! any [`SolverBackend`], declaring each variable exactly once, and
//! [`MilpSolution`] reads the values back indexed by [`VarId`].

mod goodlp;
mod lp_format;
mod model;
mod solver;
mod variables;

pub use goodlp::GoodLpBackend;
pub use lp_format::{to_lp_string, write_lp};
pub use model::{LinearConstraint, LinearExpr, MilpModel, ModelError, Objective, Relation, Sense};
pub use solver::{
    load_into, solve_model, MilpSolution, SolverBackend, SolverConfig, SolverStatus, VarHandle,
};
pub use variables::{VarDecl, VarId, VarKind};

#[cfg(test)]
pub(crate) use solver::tests::ScriptedBackend;
