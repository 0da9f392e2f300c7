//! Nonlinear block Gauss–Seidel iteration.
//!
//! Each iteration runs one sweep `G(u)` and moves the coupling vector to the
//! new value, either directly or through Aitken relaxation. The solver
//! terminates when the residual `‖G(u) − u‖₂` meets the absolute tolerance or
//! the relative tolerance against the first residual, or after
//! [`Config::max_iters`] sweeps.
//!
//! The returned [`Solution`] always pairs the state of the final sweep with
//! the coupling vector that sweep produced.

mod config;

pub use config::{Config, ConfigError, Relaxation};

use spar_core::{CoupledProblem, Observer};
use tracing::{debug, warn};

use super::{
    Action, ConvergenceRecord, Error, Event, Method, Solution, is_converged, residual,
};

/// Solves the problem by Gauss–Seidel iteration from its initial coupling.
///
/// # Errors
///
/// Returns an error if a sweep fails or the residual becomes non-finite.
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

/// Solves the problem by Gauss–Seidel iteration from `coupling`.
///
/// # Errors
///
/// Returns an error if a sweep fails or the residual becomes non-finite.
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
    let mut record = ConvergenceRecord::new(Method::GaussSeidel);
    record.begin();

    let mut u = coupling;
    let mut first = None;
    let mut aitken = Aitken::new(config.relaxation());

    let mut iter = 0;
    loop {
        iter += 1;

        let sweep = problem.sweep(&u).map_err(Error::Problem)?;
        if sweep.coupling.len() != u.len() {
            return Err(Error::CouplingLength {
                expected: u.len(),
                actual: sweep.coupling.len(),
            });
        }

        let (r, norm) = residual(&u, &sweep.coupling);
        if !norm.is_finite() {
            record.fail();
            return Err(Error::NonFiniteResidual { iter });
        }
        record.push(norm);
        let first = *first.get_or_insert(norm);
        debug!(iter, residual = norm, "gauss-seidel sweep");

        let event = Event {
            method: Method::GaussSeidel,
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
                    "gauss-seidel reached max iterations without converging"
                );
            }
            return Ok(Solution {
                coupling: sweep.coupling,
                state: sweep.state,
                record,
            });
        }

        u = aitken.update(u, sweep.coupling, r);
    }
}

/// Aitken relaxation state carried between sweeps.
struct Aitken {
    relaxation: Relaxation,
    theta: f64,
    previous: Option<Vec<f64>>,
}

impl Aitken {
    fn new(relaxation: Relaxation) -> Self {
        let theta = match relaxation {
            Relaxation::None => 1.0,
            Relaxation::Aitken { initial, .. } => initial,
        };
        Self {
            relaxation,
            theta,
            previous: None,
        }
    }

    /// Returns the next coupling vector given `u`, `G(u)`, and `r = G(u) − u`.
    fn update(&mut self, u: Vec<f64>, next: Vec<f64>, r: Vec<f64>) -> Vec<f64> {
        let Relaxation::Aitken { min, max, .. } = self.relaxation else {
            return next;
        };

        if let Some(previous) = &self.previous {
            let (dot, sq) = r
                .iter()
                .zip(previous)
                .fold((0.0, 0.0), |(dot, sq), (rn, rp)| {
                    let d = rn - rp;
                    (dot + d * rn, sq + d * d)
                });
            if sq > 0.0 {
                self.theta = (self.theta * (1.0 - dot / sq)).clamp(min, max);
            }
        }

        let relaxed = u
            .iter()
            .zip(&r)
            .map(|(ui, ri)| ui + self.theta * ri)
            .collect();
        self.previous = Some(r);
        relaxed
    }
}
