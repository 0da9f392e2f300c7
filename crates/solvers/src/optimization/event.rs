use spar_core::{Model, Observer, OptimizationProblem};

use super::EvalError;

/// Actions an observer can take during optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop the optimizer and return the best point of the current inner
    /// minimization.
    StopEarly,

    /// Treat a failed point as having an infinite merit.
    ///
    /// Only meaningful in response to [`Event::ModelFailed`] or
    /// [`Event::ProblemFailed`]; the line search backtracks away from the
    /// point instead of aborting the run.
    AssumeWorse,
}

/// Events emitted by the augmented-Lagrangian optimizer.
pub enum Event<'a, M, P>
where
    M: Model,
    P: OptimizationProblem<Input = M::Input, Output = M::Output>,
{
    /// An outer iteration finished and the multipliers were updated.
    Iteration {
        iter: usize,

        /// Physical design vector at the end of the inner minimization.
        x: &'a [f64],

        /// Unscaled objective.
        objective: f64,

        /// Largest scaled constraint violation.
        violation: f64,

        /// Projected Lagrangian gradient norm.
        stationarity: f64,

        penalty: f64,

        input: &'a M::Input,
        output: &'a M::Output,
    },

    /// Model evaluation failed.
    ModelFailed {
        /// Physical design vector where evaluation failed.
        x: &'a [f64],

        error: &'a M::Error,
    },

    /// Problem method failed (input, objective, constraints, or derivatives).
    ProblemFailed {
        /// Physical design vector where evaluation failed.
        x: &'a [f64],

        error: &'a P::Error,
    },
}

impl<M, P> Event<'_, M, P>
where
    M: Model,
    P: OptimizationProblem<Input = M::Input, Output = M::Output>,
{
    /// Returns the design vector the event refers to.
    #[must_use]
    pub fn x(&self) -> &[f64] {
        match self {
            Self::Iteration { x, .. } | Self::ModelFailed { x, .. } | Self::ProblemFailed { x, .. } => {
                x
            }
        }
    }

    /// Emits a failure event and returns the observer's action.
    ///
    /// Errors without a matching event (such as a constraint length mismatch)
    /// are never recoverable and return `None`.
    pub(super) fn emit_failure<Obs>(
        x: &[f64],
        error: &EvalError<M::Error, P::Error>,
        observer: &mut Obs,
    ) -> Option<Action>
    where
        Obs: for<'a> Observer<Event<'a, M, P>, Action>,
    {
        match error {
            EvalError::Model(e) => {
                let event = Event::ModelFailed { x, error: e };
                observer.observe(&event)
            }
            EvalError::Problem(e) => {
                let event = Event::ProblemFailed { x, error: e };
                observer.observe(&event)
            }
            EvalError::ConstraintLength { .. } => None,
        }
    }
}
