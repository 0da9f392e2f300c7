use approx::assert_relative_eq;
use thiserror::Error;

use spar_core::{
    ConstraintKind, ConstraintSpec, DesignVariable, Model, OptimizationProblem, TotalDerivatives,
};

use super::{
    Action, Config, Error, Event, Optimizer, ScalingError, Status, minimize, minimize_unobserved,
};

#[derive(Debug, Error)]
#[error("model undefined at x = {0:?}")]
pub(super) struct Undefined(Vec<f64>);

/// Identity model, undefined where any component exceeds `fail_above`.
pub(super) struct Partial {
    fail_above: f64,
}

impl Partial {
    fn everywhere() -> Self {
        Self {
            fail_above: f64::INFINITY,
        }
    }
}

impl Model for Partial {
    type Input = Vec<f64>;
    type Output = Vec<f64>;
    type Error = Undefined;

    fn call(&self, x: &Vec<f64>) -> Result<Vec<f64>, Undefined> {
        if x.iter().any(|v| *v > self.fail_above) {
            return Err(Undefined(x.clone()));
        }
        Ok(x.clone())
    }
}

/// `Σ (xᵢ − targetᵢ)²` with every constraint applied to `Σ xᵢ`.
pub(super) struct Quadratic {
    variables: Vec<DesignVariable>,
    constraints: Vec<ConstraintSpec>,
    target: Vec<f64>,
    objective_scaler: f64,
    analytic: bool,
}

impl Quadratic {
    pub(super) fn new(variables: Vec<DesignVariable>, constraints: Vec<ConstraintSpec>) -> Self {
        let n = variables.iter().map(|v| v.size).sum();
        Self {
            variables,
            constraints,
            target: vec![0.0; n],
            objective_scaler: 1.0,
            analytic: false,
        }
    }

    fn with_target(mut self, target: Vec<f64>) -> Self {
        self.target = target;
        self
    }

    fn with_analytic_derivatives(mut self) -> Self {
        self.analytic = true;
        self
    }
}

impl OptimizationProblem for Quadratic {
    type Input = Vec<f64>;
    type Output = Vec<f64>;
    type Error = Undefined;

    fn design_variables(&self) -> &[DesignVariable] {
        &self.variables
    }

    fn constraints(&self) -> &[ConstraintSpec] {
        &self.constraints
    }

    fn objective_scaler(&self) -> f64 {
        self.objective_scaler
    }

    fn input(&self, x: &[f64]) -> Result<Vec<f64>, Undefined> {
        Ok(x.to_vec())
    }

    fn objective(&self, _input: &Vec<f64>, output: &Vec<f64>) -> Result<f64, Undefined> {
        Ok(output
            .iter()
            .zip(&self.target)
            .map(|(x, t)| (x - t).powi(2))
            .sum())
    }

    fn constraint_values(&self, _input: &Vec<f64>, output: &Vec<f64>) -> Result<Vec<f64>, Undefined> {
        let sum: f64 = output.iter().sum();
        Ok(vec![sum; self.num_constraints()])
    }

    fn total_derivatives(
        &self,
        x: &[f64],
        _input: &Vec<f64>,
        _output: &Vec<f64>,
    ) -> Option<Result<TotalDerivatives, Undefined>> {
        self.analytic.then(|| {
            Ok(TotalDerivatives {
                objective: x
                    .iter()
                    .zip(&self.target)
                    .map(|(x, t)| 2.0 * (x - t))
                    .collect(),
                constraints: vec![vec![1.0; x.len()]; self.num_constraints()],
            })
        })
    }
}

fn box_variables(n: usize) -> Vec<DesignVariable> {
    vec![DesignVariable::new("x", n, -5.0, 5.0)]
}

#[test]
fn unconstrained_minimum_at_bound() {
    let problem = Quadratic::new(vec![DesignVariable::new("x", 1, -1.0, 1.0)], vec![])
        .with_target(vec![3.0]);

    let solution =
        minimize_unobserved(&Partial::everywhere(), &problem, &[0.0], &Config::default()).unwrap();

    assert_eq!(solution.status, Status::Converged);
    assert_relative_eq!(solution.x[0], 1.0, epsilon = 1e-6);
    assert_relative_eq!(solution.objective, 4.0, epsilon = 1e-6);
}

#[test]
fn active_inequality_with_finite_differences() {
    let problem = Quadratic::new(
        box_variables(2),
        vec![ConstraintSpec::new("sum", 1, ConstraintKind::Upper(2.0))],
    )
    .with_target(vec![1.0, 2.0]);

    let config = Config {
        tolerance: 1e-5,
        ..Config::default()
    };

    let solution =
        minimize_unobserved(&Partial::everywhere(), &problem, &[0.0, 0.0], &config).unwrap();

    assert_relative_eq!(solution.x[0], 0.5, epsilon = 1e-4);
    assert_relative_eq!(solution.x[1], 1.5, epsilon = 1e-4);
    assert!(solution.violation <= 1e-5);
    assert!(solution.evaluations > solution.iters);
}

#[test]
fn equality_constraint_with_analytic_derivatives() {
    let problem = Quadratic::new(
        box_variables(2),
        vec![ConstraintSpec::new("sum", 1, ConstraintKind::Equals(1.0))],
    )
    .with_target(vec![1.0, 2.0])
    .with_analytic_derivatives();

    let solution =
        minimize_unobserved(&Partial::everywhere(), &problem, &[3.0, 3.0], &Config::default())
            .unwrap();

    assert_eq!(solution.status, Status::Converged);
    assert_relative_eq!(solution.x[0], 0.0, epsilon = 1e-4);
    assert_relative_eq!(solution.x[1], 1.0, epsilon = 1e-4);
    assert_relative_eq!(solution.constraints[0], 1.0, epsilon = 1e-5);
}

#[test]
fn scaling_does_not_move_the_optimum() {
    let mut problem = Quadratic::new(
        vec![DesignVariable::new("x", 2, -5.0, 5.0).with_scaler(10.0)],
        vec![ConstraintSpec::new("sum", 1, ConstraintKind::Lower(-2.0)).with_scaler(0.5)],
    )
    .with_target(vec![-1.0, -2.0])
    .with_analytic_derivatives();
    problem.objective_scaler = 10.0;

    let solution =
        minimize_unobserved(&Partial::everywhere(), &problem, &[0.0, 0.0], &Config::default())
            .unwrap();

    assert_relative_eq!(solution.x[0], -0.5, epsilon = 1e-4);
    assert_relative_eq!(solution.x[1], -1.5, epsilon = 1e-4);
}

#[test]
fn fallback_reaches_the_same_optimum() {
    let problem = Quadratic::new(
        box_variables(2),
        vec![ConstraintSpec::new("sum", 1, ConstraintKind::Upper(2.0))],
    )
    .with_target(vec![1.0, 2.0])
    .with_analytic_derivatives();
    let config = Config {
        optimizer: Optimizer::Fallback,
        max_inner_iters: 500,
        ..Config::default()
    };

    let solution =
        minimize_unobserved(&Partial::everywhere(), &problem, &[0.0, 0.0], &config).unwrap();

    assert_eq!(solution.optimizer, Optimizer::Fallback);
    assert_eq!(solution.status, Status::Converged);
    assert_relative_eq!(solution.x[0], 0.5, epsilon = 1e-3);
    assert_relative_eq!(solution.x[1], 1.5, epsilon = 1e-3);
}

#[test]
fn assume_worse_steers_away_from_failures() {
    let model = Partial { fail_above: 1.5 };
    let problem = Quadratic::new(vec![DesignVariable::new("x", 1, 0.0, 3.0)], vec![])
        .with_target(vec![2.0])
        .with_analytic_derivatives();
    let config = Config {
        optimizer: Optimizer::Fallback,
        max_outer_iters: 3,
        ..Config::default()
    };

    let mut failures = 0;
    let observer = |event: &Event<'_, _, _>| match event {
        Event::ModelFailed { .. } => {
            failures += 1;
            Some(Action::AssumeWorse)
        }
        _ => None,
    };

    let solution = minimize(&model, &problem, &[0.0], &config, observer).unwrap();

    assert_eq!(solution.status, Status::MaxIters);
    assert!(solution.x[0] <= 1.5);
    assert!(solution.x[0] > 1.4);
    assert!(failures > 0);
}

#[test]
fn failures_propagate_without_recovery() {
    let model = Partial { fail_above: 1.5 };
    let problem = Quadratic::new(vec![DesignVariable::new("x", 1, 0.0, 3.0)], vec![])
        .with_target(vec![2.0]);

    let error = minimize_unobserved(&model, &problem, &[2.0], &Config::default()).unwrap_err();
    assert!(matches!(error, Error::Model(_)));
}

#[test]
fn observer_can_stop_after_first_iteration() {
    let problem = Quadratic::new(
        box_variables(2),
        vec![ConstraintSpec::new("sum", 1, ConstraintKind::Upper(2.0))],
    )
    .with_target(vec![1.0, 2.0]);

    let observer = |event: &Event<'_, _, _>| match event {
        Event::Iteration { iter: 1, .. } => Some(Action::StopEarly),
        _ => None,
    };

    let solution =
        minimize(&Partial::everywhere(), &problem, &[0.0, 0.0], &Config::default(), observer)
            .unwrap();

    assert_eq!(solution.status, Status::StoppedByObserver);
    assert_eq!(solution.iters, 1);
}

#[test]
fn rejects_wrong_start_length() {
    let problem = Quadratic::new(box_variables(2), vec![]);
    let error = minimize_unobserved(&Partial::everywhere(), &problem, &[0.0], &Config::default())
        .unwrap_err();
    assert!(matches!(
        error,
        Error::Scaling(ScalingError::StartLength {
            expected: 2,
            actual: 1
        })
    ));
}
