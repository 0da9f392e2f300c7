//! Core traits and types for the Spar workspace.
//!
//! This crate defines the shared abstractions that solvers, observers, and
//! the aerostructural analysis build on:
//!
//! - [`Model`]: a callable that maps a typed input to a typed output
//! - [`Snapshot`]: a captured input/output pair from a model call
//! - [`Observer`]: receives solver events and optionally returns control actions
//! - [`CoupledProblem`]: a multidisciplinary fixed point over a flat vector of
//!   coupling variables
//! - [`OptimizationProblem`]: adapts a design vector to model inputs and
//!   extracts an objective and constraints from outputs

mod model;
mod observer;
mod problems;

pub use observer::Observer;
pub use problems::coupled::{CoupledProblem, Sweep};
pub use problems::optimization::{
    ConstraintKind, ConstraintSpec, DesignVariable, OptimizationProblem, TotalDerivatives,
};
pub use {model::Model, model::Snapshot};
