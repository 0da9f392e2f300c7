//! Numerical solvers for the Spar workspace.
//!
//! - [`coupled`]: drives a [`CoupledProblem`] to its fixed point with
//!   nonlinear block Gauss–Seidel or Newton iteration
//! - [`optimization`]: minimizes a constrained [`OptimizationProblem`] with an
//!   augmented-Lagrangian driver
//! - [`linalg`]: pivot-checked dense LU shared by Newton and the disciplines
//!
//! [`CoupledProblem`]: spar_core::CoupledProblem
//! [`OptimizationProblem`]: spar_core::OptimizationProblem

pub mod coupled;
pub mod linalg;
pub mod optimization;
