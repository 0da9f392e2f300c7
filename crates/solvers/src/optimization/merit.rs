use std::cell::{Cell, RefCell};

use spar_core::{Model, Observer, OptimizationProblem};
use tracing::debug;

use super::{
    Action, Config, Error, EvalError, Event, Point, Scaling, evaluate, finite_difference,
    lagrangian::AugmentedLagrangian,
};

/// Reason an inner minimization ended before converging.
pub(super) enum Interrupt {
    /// An observer asked to stop.
    Stop,

    /// An evaluation failed and the observer did not recover.
    Fail(Error),
}

impl From<Error> for Interrupt {
    fn from(error: Error) -> Self {
        Self::Fail(error)
    }
}

/// A bound-constrained merit function seen by the inner solvers.
pub(super) trait MeritFunction {
    /// Projects a scaled vector onto the bounds.
    fn project(&self, z: &[f64]) -> Vec<f64>;

    /// Returns the merit and its gradient at `z`.
    ///
    /// `Ok(None)` means the point was assumed worse: its merit is `+∞`.
    fn value(&self, z: &[f64]) -> Result<Option<(f64, Vec<f64>)>, Interrupt>;

    /// Returns the lowest-merit evaluable point seen so far.
    fn best(&self) -> Option<Vec<f64>>;
}

/// Scaled values of an evaluated point.
#[derive(Debug, Clone)]
struct Values {
    objective: f64,
    constraints: Vec<f64>,
    objective_gradient: Vec<f64>,
    constraint_gradients: Vec<Vec<f64>>,
}

impl Values {
    fn is_finite(&self) -> bool {
        self.objective.is_finite()
            && self.constraints.iter().all(|v| v.is_finite())
            && self.objective_gradient.iter().all(|v| v.is_finite())
            && self
                .constraint_gradients
                .iter()
                .flatten()
                .all(|v| v.is_finite())
    }
}

/// What an inner minimization produced.
pub(super) struct Outcome<I, O> {
    /// Lowest-merit point evaluated, with its projected scaled vector.
    pub best: Option<(Vec<f64>, Point<I, O>)>,
    pub evaluations: usize,
    pub stopped: bool,
}

/// The augmented-Lagrangian merit of one outer iteration.
///
/// Evaluations run at the projected point; a quadratic penalty on the distance
/// to the bounds keeps the function defined everywhere. The last evaluation is
/// cached because line searches ask for the value and gradient separately.
pub(super) struct Merit<'a, M, P, Obs>
where
    M: Model,
    P: OptimizationProblem<Input = M::Input, Output = M::Output>,
{
    model: &'a M,
    problem: &'a P,
    scaling: &'a Scaling,
    lagrangian: &'a AugmentedLagrangian,
    config: &'a Config,
    observer: RefCell<&'a mut Obs>,
    current: RefCell<Option<(Vec<f64>, Option<Values>)>>,
    best: RefCell<Option<(f64, Vec<f64>, Point<M::Input, M::Output>)>>,
    evaluations: Cell<usize>,
    stopped: Cell<bool>,
}

impl<'a, M, P, Obs> Merit<'a, M, P, Obs>
where
    M: Model + Sync,
    P: OptimizationProblem<Input = M::Input, Output = M::Output> + Sync,
    Obs: for<'e> Observer<Event<'e, M, P>, Action>,
{
    pub(super) fn new(
        model: &'a M,
        problem: &'a P,
        scaling: &'a Scaling,
        lagrangian: &'a AugmentedLagrangian,
        config: &'a Config,
        observer: &'a mut Obs,
    ) -> Self {
        Self {
            model,
            problem,
            scaling,
            lagrangian,
            config,
            observer: RefCell::new(observer),
            current: RefCell::new(None),
            best: RefCell::new(None),
            evaluations: Cell::new(0),
            stopped: Cell::new(false),
        }
    }

    pub(super) fn finish(self) -> Outcome<M::Input, M::Output> {
        Outcome {
            best: self.best.into_inner().map(|(_, z, point)| (z, point)),
            evaluations: self.evaluations.get(),
            stopped: self.stopped.get(),
        }
    }

    /// Evaluates the model at a projected scaled vector.
    fn evaluate(&self, zp: &[f64]) -> Result<Option<Values>, Interrupt> {
        let n = zp.len();
        let x = self.scaling.to_physical(zp);
        self.evaluations.set(self.evaluations.get() + 1);

        let eval = match evaluate(self.model, self.problem, &x) {
            Ok(eval) => eval,
            Err(error) => return self.recover(&x, error).map(|()| None),
        };

        let supplied =
            self.problem
                .total_derivatives(&x, &eval.snapshot.input, &eval.snapshot.output);
        let derivatives = match supplied {
            Some(Ok(derivatives)) => derivatives,
            Some(Err(error)) => return self.recover(&x, EvalError::Problem(error)).map(|()| None),
            None => {
                self.evaluations.set(self.evaluations.get() + n);
                let base = (eval.objective, eval.constraints.as_slice());
                match finite_difference(self.model, self.problem, &x, base, self.config.fd_step) {
                    Ok(derivatives) => derivatives,
                    Err(error) => return self.recover(&x, error).map(|()| None),
                }
            }
        };

        let shape_ok = derivatives.objective.len() == n
            && derivatives.constraints.len() == eval.constraints.len()
            && derivatives.constraints.iter().all(|row| row.len() == n);
        if !shape_ok {
            return Err(Error::DerivativeShape.into());
        }

        let values = Values {
            objective: self.scaling.objective(eval.objective),
            constraints: self.scaling.constraints(&eval.constraints),
            objective_gradient: self.scaling.objective_gradient(&derivatives.objective),
            constraint_gradients: self.scaling.constraint_gradients(&derivatives.constraints),
        };
        if !values.is_finite() {
            debug!(?x, "non-finite evaluation treated as worse");
            return Ok(None);
        }

        let merit = self.lagrangian.merit(values.objective, &values.constraints);
        let mut best = self.best.borrow_mut();
        if best.as_ref().is_none_or(|(m, _, _)| merit < *m) {
            let point = Point {
                x,
                objective: eval.objective,
                constraints: eval.constraints,
                constraints_scaled: values.constraints.clone(),
                objective_gradient: values.objective_gradient.clone(),
                constraint_gradients: values.constraint_gradients.clone(),
                snapshot: eval.snapshot,
            };
            *best = Some((merit, zp.to_vec(), point));
        }

        Ok(Some(values))
    }

    /// Reports a failed evaluation and applies the observer's decision.
    fn recover(&self, x: &[f64], error: EvalError<M::Error, P::Error>) -> Result<(), Interrupt> {
        let action = {
            let mut observer = self.observer.borrow_mut();
            Event::<M, P>::emit_failure(x, &error, &mut **observer)
        };
        match action {
            Some(Action::AssumeWorse) => {
                debug!(?x, "failed evaluation assumed worse");
                Ok(())
            }
            Some(Action::StopEarly) => {
                self.stopped.set(true);
                Err(Interrupt::Stop)
            }
            None => Err(Interrupt::Fail(error.into())),
        }
    }
}

impl<M, P, Obs> MeritFunction for Merit<'_, M, P, Obs>
where
    M: Model + Sync,
    P: OptimizationProblem<Input = M::Input, Output = M::Output> + Sync,
    Obs: for<'e> Observer<Event<'e, M, P>, Action>,
{
    fn project(&self, z: &[f64]) -> Vec<f64> {
        self.scaling.project(z)
    }

    fn value(&self, z: &[f64]) -> Result<Option<(f64, Vec<f64>)>, Interrupt> {
        if self.stopped.get() {
            return Err(Interrupt::Stop);
        }

        let zp = self.scaling.project(z);
        let cached = match &*self.current.borrow() {
            Some((key, values)) if *key == zp => Some(values.clone()),
            _ => None,
        };
        let values = match cached {
            Some(values) => values,
            None => {
                let values = self.evaluate(&zp)?;
                *self.current.borrow_mut() = Some((zp.clone(), values.clone()));
                values
            }
        };
        let Some(values) = values else {
            return Ok(None);
        };

        let mut merit = self.lagrangian.merit(values.objective, &values.constraints);
        let mut gradient = self.lagrangian.gradient(
            &values.objective_gradient,
            &values.constraints,
            &values.constraint_gradients,
        );
        let kappa = self.config.bound_penalty;
        for ((g, z), zp) in gradient.iter_mut().zip(z).zip(&zp) {
            let d = z - zp;
            if d != 0.0 {
                merit += 0.5 * kappa * d * d;
                *g = kappa * d;
            }
        }

        Ok(Some((merit, gradient)))
    }

    fn best(&self) -> Option<Vec<f64>> {
        self.best.borrow().as_ref().map(|(_, z, _)| z.clone())
    }
}
