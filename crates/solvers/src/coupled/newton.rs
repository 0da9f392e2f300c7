//! Newton iteration on the coupled residual `R(u) = G(u) − u`.
//!
//! The Jacobian of the sweep map is built column by column with forward
//! differences, and each step solves `(I − ∂G/∂u) Δu = R(u)` by LU
//! factorization. Every iteration costs `n + 1` sweeps for `n` coupling
//! variables, so this solver suits small coupling vectors or strongly coupled
//! problems where Gauss–Seidel stalls.

mod config;

pub use config::{Config, ConfigError};

use nalgebra::{DMatrix, DVector};
use spar_core::{CoupledProblem, Observer};
use tracing::{debug, warn};

use super::{Action, ConvergenceRecord, Error, Event, Method, Solution, is_converged, residual};
use crate::linalg;

/// Solves the problem by Newton iteration from its initial coupling.
///
/// # Errors
///
/// Returns an error if a sweep fails, the Newton system is singular, or the
/// residual becomes non-finite.
pub fn solve<P, Obs>(
    problem: &P,
    config: &Config,
    observer: Obs,
) -> Result<Solution<P::State>, Error<P::Error>>
where
    P: CoupledProblem,
    Obs: for<'a> Observer<Event<'a, P::State>, Action>,
{
    solve_from(problem, problem.initial_coupling(), config, observer)
}

/// Solves the problem by Newton iteration from `coupling`.
///
/// # Errors
///
/// Returns an error if a sweep fails, the Newton system is singular, or the
/// residual becomes non-finite.
pub fn solve_from<P, Obs>(
    problem: &P,
    coupling: Vec<f64>,
    config: &Config,
    mut observer: Obs,
) -> Result<Solution<P::State>, Error<P::Error>>
where
    P: CoupledProblem,
    Obs: for<'a> Observer<Event<'a, P::State>, Action>,
{
    let mut record = ConvergenceRecord::new(Method::Newton);
    record.begin();

    let n = coupling.len();
    let mut u = coupling;
    let mut first = None;

    let mut iter = 0;
    loop {
        iter += 1;

        let sweep = problem.sweep(&u).map_err(Error::Problem)?;
        check_len(n, &sweep.coupling)?;

        let (r, norm) = residual(&u, &sweep.coupling);
        if !norm.is_finite() {
            record.fail();
            return Err(Error::NonFiniteResidual { iter });
        }
        record.push(norm);
        let first = *first.get_or_insert(norm);
        debug!(iter, residual = norm, "newton iteration");

        let event = Event {
            method: Method::Newton,
            iter,
            residual: norm,
            coupling: &sweep.coupling,
            state: &sweep.state,
        };
        if let Some(Action::StopEarly) = observer.observe(&event) {
            record.stop();
            return Ok(Solution {
                coupling: sweep.coupling,
                state: sweep.state,
                record,
            });
        }

        let done = is_converged(norm, first, config.atol(), config.rtol());
        if done || iter >= config.max_iters() {
            record.finish(done);
            if !done {
                warn!(
                    iters = iter,
                    residual = norm,
                    "newton reached max iterations without converging"
                );
            }
            return Ok(Solution {
                coupling: sweep.coupling,
                state: sweep.state,
                record,
            });
        }

        // A = I − ∂G/∂u
        let mut a = DMatrix::<f64>::identity(n, n);
        for j in 0..n {
            let h = config.fd_step() * u[j].abs().max(1.0);
            let mut perturbed = u.clone();
            perturbed[j] += h;
            let column = problem.sweep(&perturbed).map_err(Error::Problem)?;
            check_len(n, &column.coupling)?;
            for i in 0..n {
                a[(i, j)] -= (column.coupling[i] - sweep.coupling[i]) / h;
            }
        }

        let Ok(step) = linalg::solve(a, &DVector::from_vec(r)) else {
            record.fail();
            return Err(Error::SingularJacobian { iter });
        };
        for (ui, di) in u.iter_mut().zip(step.iter()) {
            *ui += di;
        }
    }
}

fn check_len<E>(expected: usize, coupling: &[f64]) -> Result<(), Error<E>> {
    if coupling.len() == expected {
        Ok(())
    } else {
        Err(Error::CouplingLength {
            expected,
            actual: coupling.len(),
        })
    }
}

