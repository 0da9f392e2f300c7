use super::Method;

/// Actions an observer can take during a coupled solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop iterating and return the latest iterate.
    StopEarly,
}

/// Iteration event emitted by the coupled solvers.
///
/// One event is emitted per iteration, after the residual is computed and
/// before the convergence check.
pub struct Event<'a, S> {
    /// Solver variant producing the event.
    pub method: Method,

    /// Iteration counter (1-based).
    pub iter: usize,

    /// Residual norm `‖G(u) − u‖₂` at this iteration.
    pub residual: f64,

    /// Coupling vector produced by the sweep, `G(u)`.
    pub coupling: &'a [f64],

    /// Discipline state computed during the sweep.
    pub state: &'a S,
}
