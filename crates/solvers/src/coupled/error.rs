use thiserror::Error;

/// Errors that can occur while solving a coupled problem.
///
/// Hitting the iteration cap is not an error; see
/// [`Phase::MaxIterExceeded`](super::Phase::MaxIterExceeded).
#[derive(Debug, Error)]
pub enum Error<E> {
    /// A discipline sweep failed.
    #[error("coupled sweep failed")]
    Problem(#[source] E),

    /// The Newton system `(I − ∂G/∂u) Δu = R` could not be solved.
    #[error("coupled Newton system is singular at iteration {iter}")]
    SingularJacobian { iter: usize },

    /// The coupling residual became NaN or infinite.
    #[error("non-finite coupling residual at iteration {iter}")]
    NonFiniteResidual { iter: usize },

    /// A sweep returned a coupling vector of the wrong length.
    #[error("sweep returned {actual} coupling values, expected {expected}")]
    CouplingLength { expected: usize, actual: usize },
}

impl<E> Error<E> {
    /// Returns true if the failure is numerical singularity rather than a
    /// failed discipline evaluation.
    pub fn is_singular(&self) -> bool {
        matches!(
            self,
            Self::SingularJacobian { .. } | Self::NonFiniteResidual { .. }
        )
    }
}
