//! Solvers for coupled problems: driving a discipline sweep to its fixed point.
//!
//! A [`CoupledProblem`] maps coupling variables `u` to `G(u)` by running every
//! discipline once. Solvers in this module iterate until the change in the
//! coupling vector, `‖G(u) − u‖₂`, falls below an absolute tolerance or below a
//! relative tolerance times the first residual.
//!
//! # Solvers
//!
//! - [`gauss_seidel`]: nonlinear block Gauss–Seidel (fixed-point iteration),
//!   optionally with Aitken relaxation
//! - [`newton`]: Newton iteration on `R(u) = G(u) − u` with a
//!   finite-difference Jacobian of the sweep map
//!
//! [`NonlinearSolver`] selects one of them once, at configuration time.
//!
//! # Failure semantics
//!
//! Reaching the iteration cap is not an error: the last iterate is returned
//! and its [`ConvergenceRecord`] reports [`Phase::MaxIterExceeded`]. A failed
//! sweep, a singular Newton system, or a non-finite residual aborts the solve
//! with an [`Error`].
//!
//! [`CoupledProblem`]: spar_core::CoupledProblem

mod error;
mod event;
mod record;
mod solution;

pub mod gauss_seidel;
pub mod newton;


pub use error::Error;
pub use event::{Action, Event};
pub use record::{ConvergenceRecord, Method, Phase};
pub use solution::Solution;

use spar_core::{CoupledProblem, Observer};

/// Nonlinear solver strategy for a coupled problem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NonlinearSolver {
    GaussSeidel(gauss_seidel::Config),
    Newton(newton::Config),
}

impl Default for NonlinearSolver {
    fn default() -> Self {
        Self::GaussSeidel(gauss_seidel::Config::default())
    }
}

impl NonlinearSolver {
    /// Returns the method this strategy runs.
    #[must_use]
    pub fn method(&self) -> Method {
        match self {
            Self::GaussSeidel(_) => Method::GaussSeidel,
            Self::Newton(_) => Method::Newton,
        }
    }

    /// Returns the iteration cap of the selected strategy.
    #[must_use]
    pub fn max_iters(&self) -> usize {
        match self {
            Self::GaussSeidel(config) => config.max_iters(),
            Self::Newton(config) => config.max_iters(),
        }
    }

    /// Solves the problem starting from its initial coupling vector.
    ///
    /// # Errors
    ///
    /// Returns an error if a sweep fails, a linear system is singular, or the
    /// residual becomes non-finite.
    pub fn solve<P, Obs>(
        &self,
        problem: &P,
        observer: Obs,
    ) -> Result<Solution<P::State>, Error<P::Error>>
    where
        P: CoupledProblem,
        Obs: for<'a> Observer<Event<'a, P::State>, Action>,
    {
        self.solve_from(problem, problem.initial_coupling(), observer)
    }

    /// Solves the problem starting from the given coupling vector.
    ///
    /// # Errors
    ///
    /// Returns an error if a sweep fails, a linear system is singular, or the
    /// residual becomes non-finite.
    pub fn solve_from<P, Obs>(
        &self,
        problem: &P,
        coupling: Vec<f64>,
        observer: Obs,
    ) -> Result<Solution<P::State>, Error<P::Error>>
    where
        P: CoupledProblem,
        Obs: for<'a> Observer<Event<'a, P::State>, Action>,
    {
        match self {
            Self::GaussSeidel(config) => gauss_seidel::solve_from(problem, coupling, config, observer),
            Self::Newton(config) => newton::solve_from(problem, coupling, config, observer),
        }
    }
}

/// Returns `G(u) − u` and its Euclidean norm.
fn residual(previous: &[f64], next: &[f64]) -> (Vec<f64>, f64) {
    let r: Vec<f64> = next.iter().zip(previous).map(|(n, p)| n - p).collect();
    let norm = r.iter().map(|v| v * v).sum::<f64>().sqrt();
    (r, norm)
}

/// Returns true when `norm` satisfies the absolute or relative tolerance.
fn is_converged(norm: f64, first: f64, atol: f64, rtol: f64) -> bool {
    norm <= atol || norm <= rtol * first
}
