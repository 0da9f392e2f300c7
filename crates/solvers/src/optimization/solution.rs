use spar_core::Snapshot;

use super::Optimizer;

/// Indicates whether the optimizer converged or hit the iteration limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Stationarity and feasibility tolerances were met.
    Converged,

    /// Reached the outer iteration limit without converging.
    MaxIters,

    /// Stopped early due to an observer decision.
    StoppedByObserver,
}

/// The result of an augmented-Lagrangian optimization.
#[derive(Debug, Clone)]
pub struct Solution<I, O> {
    /// Final optimizer status.
    pub status: Status,

    /// Inner strategy that actually ran.
    pub optimizer: Optimizer,

    /// Physical design vector at the reported point.
    pub x: Vec<f64>,

    /// Unscaled objective at the reported point.
    pub objective: f64,

    /// Unscaled constraint values at the reported point.
    pub constraints: Vec<f64>,

    /// Largest scaled constraint violation.
    pub violation: f64,

    /// Projected Lagrangian gradient norm.
    pub stationarity: f64,

    /// Snapshot at the reported point.
    pub snapshot: Snapshot<I, O>,

    /// Outer iteration count when the optimizer finished.
    pub iters: usize,

    /// Number of model evaluations, including finite-difference columns.
    pub evaluations: usize,
}
