use spar_core::{Model, Observer, OptimizationProblem};
use spar_solvers::{coupled, optimization};
use tracing::{debug, info, warn};

/// Logs solver events through `tracing` without steering the solver.
///
/// Coupled iterations are logged at debug level, optimizer iterations at info
/// level, and failed evaluations as warnings. Every record carries the
/// observer's label so several analyses can share one subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingObserver {
    label: String,
}

impl TracingObserver {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl<S> Observer<coupled::Event<'_, S>, coupled::Action> for TracingObserver {
    fn observe(&mut self, event: &coupled::Event<'_, S>) -> Option<coupled::Action> {
        debug!(
            label = %self.label,
            method = %event.method,
            iter = event.iter,
            residual = event.residual,
            "coupled iteration"
        );
        None
    }
}

impl<M, P> Observer<optimization::Event<'_, M, P>, optimization::Action> for TracingObserver
where
    M: Model,
    P: OptimizationProblem<Input = M::Input, Output = M::Output>,
{
    fn observe(&mut self, event: &optimization::Event<'_, M, P>) -> Option<optimization::Action> {
        match event {
            optimization::Event::Iteration {
                iter,
                objective,
                violation,
                stationarity,
                penalty,
                ..
            } => info!(
                label = %self.label,
                iter,
                objective,
                violation,
                stationarity,
                penalty,
                "optimizer iteration"
            ),
            optimization::Event::ModelFailed { x, error } => {
                warn!(label = %self.label, ?x, %error, "model evaluation failed");
            }
            optimization::Event::ProblemFailed { x, error } => {
                warn!(label = %self.label, ?x, %error, "problem evaluation failed");
            }
        }
        None
    }
}
