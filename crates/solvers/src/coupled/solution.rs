use super::{ConvergenceRecord, Phase};

/// The result of a coupled solve.
#[derive(Debug, Clone)]
pub struct Solution<S> {
    /// Final coupling vector.
    pub coupling: Vec<f64>,

    /// Discipline state from the final sweep.
    pub state: S,

    /// Iteration history and final phase.
    pub record: ConvergenceRecord,
}

impl<S> Solution<S> {
    /// Returns the final phase of the solve.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.record.phase()
    }

    /// Returns true if the solve met its tolerance.
    #[must_use]
    pub fn converged(&self) -> bool {
        self.record.converged()
    }
}
