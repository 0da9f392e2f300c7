use spar_core::Observer;

use crate::traits::{CanAssumeWorse, IsFailure};

/// Answers every failure event with an assume-worse action.
///
/// With an optimizer this turns failed evaluations into points of infinite
/// merit, so the line search backs away instead of aborting the run. The
/// number of recovered failures is kept for reporting.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecoverFailures {
    recovered: usize,
}

impl RecoverFailures {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many failures have been answered so far.
    #[must_use]
    pub fn recovered(&self) -> usize {
        self.recovered
    }
}

impl<E: IsFailure, A: CanAssumeWorse> Observer<E, A> for RecoverFailures {
    fn observe(&mut self, event: &E) -> Option<A> {
        if event.is_failure() {
            self.recovered += 1;
            Some(A::assume_worse())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::convert::Infallible;

    use spar_core::{ConstraintSpec, DesignVariable, Model, OptimizationProblem};
    use spar_solvers::optimization::{self, Action, Config, Event, Optimizer, Status};

    #[derive(Debug, thiserror::Error)]
    #[error("singular")]
    struct Singular;

    /// `x²`, undefined for `x < 0.5`.
    struct Clipped;

    impl Model for Clipped {
        type Input = f64;
        type Output = f64;
        type Error = Singular;

        fn call(&self, x: &f64) -> Result<f64, Singular> {
            if *x < 0.5 { Err(Singular) } else { Ok(x * x) }
        }
    }

    struct Scalar {
        variables: Vec<DesignVariable>,
    }

    impl OptimizationProblem for Scalar {
        type Input = f64;
        type Output = f64;
        type Error = Infallible;

        fn design_variables(&self) -> &[DesignVariable] {
            &self.variables
        }

        fn constraints(&self) -> &[ConstraintSpec] {
            &[]
        }

        fn input(&self, x: &[f64]) -> Result<f64, Infallible> {
            Ok(x[0])
        }

        fn objective(&self, _input: &f64, output: &f64) -> Result<f64, Infallible> {
            Ok(*output)
        }

        fn constraint_values(&self, _input: &f64, _output: &f64) -> Result<Vec<f64>, Infallible> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn optimizer_continues_past_failures() {
        let problem = Scalar {
            variables: vec![DesignVariable::new("x", 1, 0.0, 2.0)],
        };
        let config = Config {
            optimizer: Optimizer::Fallback,
            max_outer_iters: 2,
            ..Config::default()
        };

        let mut policy = RecoverFailures::new();
        let observer = |event: &Event<'_, Clipped, Scalar>| -> Option<Action> { policy.observe(event) };
        let solution = optimization::minimize(&Clipped, &problem, &[2.0], &config, observer).unwrap();

        assert_ne!(solution.status, Status::StoppedByObserver);
        assert!(solution.x[0] >= 0.5);
        assert!(solution.x[0] < 0.75);
        assert!(policy.recovered() > 0);
    }
}
