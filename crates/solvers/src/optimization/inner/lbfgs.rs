use std::cell::RefCell;

use argmin::core::{CostFunction, Executor, Gradient, State, TerminationReason};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use tracing::{debug, warn};

use super::projected_gradient;
use crate::optimization::{
    Config, Error,
    merit::{Interrupt, MeritFunction},
};

/// Adapts a merit function to argmin's cost and gradient traits.
///
/// argmin errors carry no payload we can recover, so interrupts raised by the
/// merit function are parked in `interrupt` and inspected after the run.
struct Adapter<'a, F> {
    merit: &'a F,
    interrupt: &'a RefCell<Option<Interrupt>>,
}

impl<F: MeritFunction> Adapter<'_, F> {
    fn evaluate(&self, z: &[f64]) -> Result<(f64, Vec<f64>), argmin::core::Error> {
        match self.merit.value(z) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(argmin::core::Error::msg("point assumed worse")),
            Err(interrupt) => {
                *self.interrupt.borrow_mut() = Some(interrupt);
                Err(argmin::core::Error::msg("evaluation interrupted"))
            }
        }
    }
}

impl<F: MeritFunction> CostFunction for Adapter<'_, F> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, z: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        self.evaluate(z).map(|(f, _)| f)
    }
}

impl<F: MeritFunction> Gradient for Adapter<'_, F> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, z: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
        self.evaluate(z).map(|(_, g)| g)
    }
}

/// Runs L-BFGS on the merit function.
///
/// If the line search meets a point assumed worse, argmin aborts the run; the
/// search then continues with projected gradient from the best point found.
pub(super) fn minimize<F: MeritFunction>(
    merit: &F,
    z0: &[f64],
    tolerance: f64,
    config: &Config,
) -> Result<(), Interrupt> {
    let interrupt = RefCell::new(None);
    let adapter = Adapter {
        merit,
        interrupt: &interrupt,
    };

    let linesearch = MoreThuenteLineSearch::new();
    let solver = LBFGS::new(linesearch, config.lbfgs_memory)
        .with_tolerance_grad(tolerance)
        .map_err(|e| Error::Lbfgs(e.to_string()))?;

    let start = merit.project(z0);
    let result = Executor::new(adapter, solver)
        .configure(|state| {
            state
                .param(start)
                .max_iters(config.max_inner_iters as u64)
                .target_cost(f64::NEG_INFINITY)
        })
        .run();

    if let Some(interrupt) = interrupt.borrow_mut().take() {
        return Err(interrupt);
    }

    match result {
        Ok(result) => {
            let converged = matches!(
                result.state().get_termination_reason(),
                Some(TerminationReason::SolverConverged)
            );
            debug!(iters = result.state().get_iter(), converged, "l-bfgs finished");
            Ok(())
        }
        Err(error) => {
            warn!(%error, "l-bfgs aborted, continuing with projected gradient");
            let Some(best) = merit.best() else {
                return Ok(());
            };
            let tolerance = tolerance * config.fallback_tol_factor;
            projected_gradient::minimize(merit, &best, tolerance, config.max_inner_iters)
        }
    }
}
