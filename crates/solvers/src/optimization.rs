//! Solvers for optimization problems: minimizing a constrained objective.
//!
//! An [`OptimizationProblem`] maps a design vector `x` to model inputs, calls
//! the model, and extracts a scalar objective plus a flat vector of
//! constraint values. The solver in this module searches for a bound-feasible
//! `x` that minimizes the objective subject to those constraints.
//!
//! # Algorithm
//!
//! [`minimize`] runs an augmented-Lagrangian outer loop. Each outer iteration
//! minimizes the merit function
//!
//! ```text
//! Φ(z) = f(z) + Σ ψ(gᵢ(z), λᵢ, μ) + Σ (νⱼ hⱼ(z) + μ/2 hⱼ(z)²)
//! ```
//!
//! over the scaled design vector `z`, then updates the multipliers and grows
//! the penalty `μ` when feasibility stalls. Inequalities use the Rockafellar
//! form `ψ`; design-variable bounds are enforced by evaluating at the
//! projected point.
//!
//! The inner minimization is chosen by [`Optimizer`]:
//!
//! - [`Optimizer::Preferred`]: `argmin` L-BFGS with a Moré–Thuente line
//!   search (requires the `argmin` feature)
//! - [`Optimizer::Fallback`]: projected gradient with Armijo backtracking,
//!   run with a looser stationarity tolerance
//!
//! Gradients come from [`OptimizationProblem::total_derivatives`] when the
//! problem supplies them, and otherwise from forward differences evaluated in
//! parallel.
//!
//! # Observer Events
//!
//! - [`Event::Iteration`]: emitted once per outer iteration
//! - [`Event::ModelFailed`] / [`Event::ProblemFailed`]: emitted for every
//!   failed evaluation
//!
//! Observers can return [`Action::StopEarly`] to halt, or
//! [`Action::AssumeWorse`] on a failure event to treat the point as having an
//! infinite merit so the line search backs away from it.
//!
//! [`OptimizationProblem`]: spar_core::OptimizationProblem
//! [`OptimizationProblem::total_derivatives`]: spar_core::OptimizationProblem::total_derivatives

mod config;
mod derivatives;
mod error;
mod evaluate;
mod event;
mod inner;
mod lagrangian;
mod merit;
mod scaling;
mod solution;

#[cfg(test)]
mod tests;

pub use config::{Config, ConfigError, Optimizer};
pub use derivatives::finite_difference;
pub use error::Error;
pub use evaluate::{EvalError, EvaluateResult, Evaluation, evaluate};
pub use event::{Action, Event};
pub use scaling::{Scaling, ScalingError};
pub use solution::{Solution, Status};

use spar_core::{Model, Observer, OptimizationProblem, Snapshot};
use tracing::{info, warn};

use lagrangian::AugmentedLagrangian;
use merit::{Interrupt, Merit};

/// Finds a constrained minimum of the objective starting from `x0`.
///
/// `x0` is in physical units and is projected onto the design-variable bounds
/// before the first evaluation.
///
/// # Errors
///
/// Returns an error if the problem definition or config is invalid, the
/// starting point cannot be evaluated, or an evaluation fails and the observer
/// does not return [`Action::AssumeWorse`] to recover.
pub fn minimize<M, P, Obs>(
    model: &M,
    problem: &P,
    x0: &[f64],
    config: &Config,
    mut observer: Obs,
) -> Result<Solution<M::Input, M::Output>, Error>
where
    M: Model + Sync,
    P: OptimizationProblem<Input = M::Input, Output = M::Output> + Sync,
    Obs: for<'a> Observer<Event<'a, M, P>, Action>,
{
    config.validate()?;
    let scaling = Scaling::new(problem)?;
    if x0.len() != scaling.len() {
        return Err(ScalingError::StartLength {
            expected: scaling.len(),
            actual: x0.len(),
        }
        .into());
    }

    let optimizer = config.optimizer.resolve();
    let tolerance = config.stationarity_tol(optimizer);
    let mut lagrangian = AugmentedLagrangian::new(scaling.equalities(), config);

    let mut z = scaling.project(&scaling.to_scaled(x0));
    let mut evaluations = 0;
    let mut previous_violation = f64::INFINITY;

    for iter in 1..=config.max_outer_iters {
        let merit = Merit::new(model, problem, &scaling, &lagrangian, config, &mut observer);
        let inner = inner::minimize(&merit, &z, optimizer, tolerance, config);
        let outcome = merit.finish();
        evaluations += outcome.evaluations;

        if let Err(Interrupt::Fail(error)) = inner {
            return Err(error);
        }
        let Some((z_best, point)) = outcome.best else {
            return Err(Error::NoFeasiblePoint);
        };
        z = z_best;

        let finish = |point: Point<_, _>, lagrangian: &AugmentedLagrangian, status| {
            let violation = lagrangian.violation(&point.constraints_scaled);
            let stationarity = lagrangian.stationarity(&scaling, &point);
            point.into_solution(optimizer, status, violation, stationarity, iter, evaluations)
        };

        if outcome.stopped {
            return Ok(finish(point, &lagrangian, Status::StoppedByObserver));
        }

        // After the update, ∇L at these multipliers is the merit gradient the
        // inner solve just drove to zero.
        lagrangian.update_multipliers(&point.constraints_scaled);
        let violation = lagrangian.violation(&point.constraints_scaled);
        let stationarity = lagrangian.stationarity(&scaling, &point);

        info!(
            iter,
            objective = point.objective,
            violation,
            stationarity,
            penalty = lagrangian.penalty(),
            "augmented-lagrangian iteration"
        );

        let event = Event::Iteration {
            iter,
            x: &point.x,
            objective: point.objective,
            violation,
            stationarity,
            penalty: lagrangian.penalty(),
            input: &point.snapshot.input,
            output: &point.snapshot.output,
        };
        if let Some(Action::StopEarly) = observer.observe(&event) {
            return Ok(finish(point, &lagrangian, Status::StoppedByObserver));
        }

        if violation <= config.feasibility_tol && stationarity <= tolerance {
            return Ok(finish(point, &lagrangian, Status::Converged));
        }

        if iter == config.max_outer_iters {
            warn!(
                iters = iter,
                violation, stationarity, "optimizer reached max iterations without converging"
            );
            return Ok(finish(point, &lagrangian, Status::MaxIters));
        }

        if violation > config.penalty_trigger * previous_violation {
            lagrangian.grow_penalty();
        }
        previous_violation = violation;
    }

    Err(Error::NoFeasiblePoint)
}

/// Finds a constrained minimum without observer support.
///
/// This is a convenience wrapper around [`minimize`] that uses a no-op observer.
///
/// # Errors
///
/// Returns an error if the problem definition or config is invalid or an
/// evaluation fails.
pub fn minimize_unobserved<M, P>(
    model: &M,
    problem: &P,
    x0: &[f64],
    config: &Config,
) -> Result<Solution<M::Input, M::Output>, Error>
where
    M: Model + Sync,
    P: OptimizationProblem<Input = M::Input, Output = M::Output> + Sync,
{
    minimize(model, problem, x0, config, ())
}

/// A fully evaluated design point in scaled space.
pub(crate) struct Point<I, O> {
    /// Physical design vector.
    pub x: Vec<f64>,

    /// Physical objective.
    pub objective: f64,

    /// Physical constraint values.
    pub constraints: Vec<f64>,

    /// Scaled constraints in `g ≤ 0` / `h = 0` form.
    pub constraints_scaled: Vec<f64>,

    /// Gradient of the scaled objective with respect to `z`.
    pub objective_gradient: Vec<f64>,

    /// Gradient rows of the scaled constraints with respect to `z`.
    pub constraint_gradients: Vec<Vec<f64>>,

    pub snapshot: Snapshot<I, O>,
}

impl<I, O> Point<I, O> {
    fn into_solution(
        self,
        optimizer: Optimizer,
        status: Status,
        violation: f64,
        stationarity: f64,
        iters: usize,
        evaluations: usize,
    ) -> Solution<I, O> {
        Solution {
            status,
            optimizer,
            x: self.x,
            objective: self.objective,
            constraints: self.constraints,
            violation,
            stationarity,
            snapshot: self.snapshot,
            iters,
            evaluations,
        }
    }
}
