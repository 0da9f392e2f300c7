use std::fmt;

/// The coupled solver variant that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Nonlinear block Gauss–Seidel (fixed-point iteration).
    GaussSeidel,

    /// Newton iteration on the coupled residual.
    Newton,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GaussSeidel => f.write_str("gauss-seidel"),
            Self::Newton => f.write_str("newton"),
        }
    }
}

/// Lifecycle of a coupled solve.
///
/// ```text
/// Uninitialized → Iterating → { Converged | MaxIterExceeded | Stopped | Singular }
/// ```
///
/// Only the non-singular terminal phases carry an iterate that downstream
/// evaluation may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Iterating,
    Converged,
    MaxIterExceeded,

    /// An observer stopped the solve before convergence.
    Stopped,

    Singular,
}

impl Phase {
    /// Returns true if the phase carries an iterate usable downstream.
    #[must_use]
    pub fn allows_evaluation(self) -> bool {
        matches!(self, Self::Converged | Self::MaxIterExceeded | Self::Stopped)
    }

    /// Returns true if the solve has finished.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Uninitialized | Self::Iterating)
    }
}

/// Iteration history of a coupled solve.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceRecord {
    method: Method,
    phase: Phase,
    residuals: Vec<f64>,
}

impl ConvergenceRecord {
    pub(crate) fn new(method: Method) -> Self {
        Self {
            method,
            phase: Phase::Uninitialized,
            residuals: Vec::new(),
        }
    }

    pub(crate) fn begin(&mut self) {
        debug_assert_eq!(self.phase, Phase::Uninitialized);
        self.phase = Phase::Iterating;
    }

    pub(crate) fn push(&mut self, residual: f64) {
        debug_assert_eq!(self.phase, Phase::Iterating);
        self.residuals.push(residual);
    }

    pub(crate) fn finish(&mut self, converged: bool) {
        self.phase = if converged {
            Phase::Converged
        } else {
            Phase::MaxIterExceeded
        };
    }

    pub(crate) fn stop(&mut self) {
        self.phase = Phase::Stopped;
    }

    pub(crate) fn fail(&mut self) {
        self.phase = Phase::Singular;
    }

    /// Returns the solver variant used.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns true if the solve met its tolerance.
    #[must_use]
    pub fn converged(&self) -> bool {
        self.phase == Phase::Converged
    }

    /// Returns the number of completed iterations.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.residuals.len()
    }

    /// Returns the residual norm of every completed iteration.
    #[must_use]
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Returns the residual norm of the last completed iteration.
    #[must_use]
    pub fn final_residual(&self) -> Option<f64> {
        self.residuals.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_phase_transitions() {
        let mut record = ConvergenceRecord::new(Method::GaussSeidel);
        assert_eq!(record.phase(), Phase::Uninitialized);
        assert!(!record.phase().is_terminal());

        record.begin();
        record.push(1.0);
        record.push(0.1);
        assert_eq!(record.phase(), Phase::Iterating);

        record.finish(true);
        assert!(record.converged());
        assert!(record.phase().allows_evaluation());
        assert_eq!(record.iterations(), 2);
        assert_eq!(record.final_residual(), Some(0.1));
    }

    #[test]
    fn max_iter_allows_evaluation_but_singular_does_not() {
        let mut record = ConvergenceRecord::new(Method::Newton);
        record.begin();
        record.finish(false);
        assert_eq!(record.phase(), Phase::MaxIterExceeded);
        assert!(record.phase().allows_evaluation());
        assert!(!record.converged());

        let mut record = ConvergenceRecord::new(Method::Newton);
        record.begin();
        record.fail();
        assert!(record.phase().is_terminal());
        assert!(!record.phase().allows_evaluation());
    }
}
