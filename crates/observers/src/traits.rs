//! Capability traits for cross-solver observers.
//!
//! These traits abstract over solver-specific event and action types, enabling
//! observers to work generically across different solvers.
//!
//! # Event traits
//!
//! - [`HasResidual`]: events that carry a residual value
//! - [`HasObjective`]: events that carry an objective value
//! - [`IsFailure`]: events that may report a failed evaluation
//!
//! # Action traits
//!
//! - [`CanStopEarly`]: actions that can signal early termination
//! - [`CanAssumeWorse`]: actions that can signal a worse-than-evaluated outcome
//!
//! # Example
//!
//! ```rust
//! use spar_core::Observer;
//! use spar_observers::traits::{CanStopEarly, HasResidual};
//!
//! struct GoodEnough {
//!     tolerance: f64,
//!     min_iters: usize,
//!     iter: usize,
//! }
//!
//! impl<E: HasResidual, A: CanStopEarly> Observer<E, A> for GoodEnough {
//!     fn observe(&mut self, event: &E) -> Option<A> {
//!         self.iter += 1;
//!         if self.iter >= self.min_iters && event.residual().abs() < self.tolerance {
//!             return Some(A::stop_early());
//!         }
//!         None
//!     }
//! }
//! ```

use spar_core::{Model, OptimizationProblem};

use spar_solvers::{coupled, optimization};

/// An event that carries a residual value.
pub trait HasResidual {
    /// Returns the residual for this event.
    ///
    /// Returns `f64::NAN` when the event represents an error and no residual
    /// is available.
    fn residual(&self) -> f64;
}

/// An event that carries an objective value.
pub trait HasObjective {
    /// Returns the objective for this event.
    ///
    /// Returns `f64::NAN` when the event represents an error and no objective
    /// is available.
    fn objective(&self) -> f64;
}

/// An event that may report a failed evaluation.
pub trait IsFailure {
    /// Returns true if the event reports a failed evaluation.
    fn is_failure(&self) -> bool;
}

/// An action type that can signal early termination.
pub trait CanStopEarly {
    /// Returns the action that stops the solver early.
    fn stop_early() -> Self;
}

/// An action type that can signal a worse-than-evaluated outcome.
pub trait CanAssumeWorse {
    /// Returns the action that treats this evaluation as worse than any
    /// evaluable point.
    fn assume_worse() -> Self;
}

// --- coupled::Event ---

impl<S> HasResidual for coupled::Event<'_, S> {
    fn residual(&self) -> f64 {
        self.residual
    }
}

impl<S> IsFailure for coupled::Event<'_, S> {
    fn is_failure(&self) -> bool {
        false
    }
}

// --- optimization::Event ---

impl<M, P> HasResidual for optimization::Event<'_, M, P>
where
    M: Model,
    P: OptimizationProblem<Input = M::Input, Output = M::Output>,
{
    /// Largest constraint violation of an outer iteration.
    fn residual(&self) -> f64 {
        match self {
            optimization::Event::Iteration { violation, .. } => *violation,
            optimization::Event::ModelFailed { .. }
            | optimization::Event::ProblemFailed { .. } => f64::NAN,
        }
    }
}

impl<M, P> HasObjective for optimization::Event<'_, M, P>
where
    M: Model,
    P: OptimizationProblem<Input = M::Input, Output = M::Output>,
{
    fn objective(&self) -> f64 {
        match self {
            optimization::Event::Iteration { objective, .. } => *objective,
            optimization::Event::ModelFailed { .. }
            | optimization::Event::ProblemFailed { .. } => f64::NAN,
        }
    }
}

impl<M, P> IsFailure for optimization::Event<'_, M, P>
where
    M: Model,
    P: OptimizationProblem<Input = M::Input, Output = M::Output>,
{
    fn is_failure(&self) -> bool {
        !matches!(self, optimization::Event::Iteration { .. })
    }
}

// --- CanStopEarly impls ---

impl CanStopEarly for coupled::Action {
    fn stop_early() -> Self {
        Self::StopEarly
    }
}

impl CanStopEarly for optimization::Action {
    fn stop_early() -> Self {
        Self::StopEarly
    }
}

// --- CanAssumeWorse for optimization::Action ---

impl CanAssumeWorse for optimization::Action {
    fn assume_worse() -> Self {
        Self::AssumeWorse
    }
}
