/// A named block of design variables with shared bounds and scaling.
///
/// Bounds are expressed in physical units. The `scaler` multiplies physical
/// values before they reach the optimizer, so a thickness in metres with
/// `scaler = 1e2` is seen by the optimizer in centimetres.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignVariable {
    pub name: String,
    pub size: usize,
    pub lower: f64,
    pub upper: f64,
    pub scaler: f64,
}

impl DesignVariable {
    /// Creates an unscaled design variable block.
    #[must_use]
    pub fn new(name: impl Into<String>, size: usize, lower: f64, upper: f64) -> Self {
        Self {
            name: name.into(),
            size,
            lower,
            upper,
            scaler: 1.0,
        }
    }

    /// Sets the scaling factor applied before values reach the optimizer.
    #[must_use]
    pub fn with_scaler(mut self, scaler: f64) -> Self {
        self.scaler = scaler;
        self
    }
}

/// The bound semantics of a constraint block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstraintKind {
    /// Values must not exceed the bound.
    Upper(f64),

    /// Values must not fall below the bound.
    Lower(f64),

    /// Values must equal the target.
    Equals(f64),
}

/// A named block of constraint values.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSpec {
    pub name: String,
    pub size: usize,
    pub kind: ConstraintKind,
    pub scaler: f64,
}

impl ConstraintSpec {
    /// Creates an unscaled constraint block.
    #[must_use]
    pub fn new(name: impl Into<String>, size: usize, kind: ConstraintKind) -> Self {
        Self {
            name: name.into(),
            size,
            kind,
            scaler: 1.0,
        }
    }

    /// Sets the scaling factor applied to constraint values.
    #[must_use]
    pub fn with_scaler(mut self, scaler: f64) -> Self {
        self.scaler = scaler;
        self
    }

    /// Returns true for equality constraints.
    #[must_use]
    pub fn is_equality(&self) -> bool {
        matches!(self.kind, ConstraintKind::Equals(_))
    }
}

/// Total derivatives of the objective and constraints with respect to the
/// physical (unscaled) design vector.
#[derive(Debug, Clone, PartialEq)]
pub struct TotalDerivatives {
    /// Gradient of the unscaled objective.
    pub objective: Vec<f64>,

    /// One gradient row per flattened constraint value.
    pub constraints: Vec<Vec<f64>>,
}

/// Defines a constrained optimization problem.
///
/// The problem maps a flat design vector (`x`, physical units, ordered as the
/// concatenation of [`design_variables`](Self::design_variables)) into a model
/// input, then extracts the objective and the flattened constraint values
/// (ordered as [`constraints`](Self::constraints)) from the model input and
/// output. The ordering and the bounds must not change between calls.
pub trait OptimizationProblem {
    type Input;
    type Output;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the design variable blocks in design-vector order.
    fn design_variables(&self) -> &[DesignVariable];

    /// Returns the constraint blocks in constraint-vector order.
    fn constraints(&self) -> &[ConstraintSpec];

    /// Returns the factor applied to the objective before optimization.
    fn objective_scaler(&self) -> f64 {
        1.0
    }

    /// Maps the design vector (`x`) into a model input.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the input cannot be constructed from `x`.
    fn input(&self, x: &[f64]) -> Result<Self::Input, Self::Error>;

    /// Computes the unscaled objective from model input/output.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the objective cannot be computed.
    fn objective(&self, input: &Self::Input, output: &Self::Output) -> Result<f64, Self::Error>;

    /// Computes the flattened, unscaled constraint values.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the constraints cannot be computed.
    fn constraint_values(
        &self,
        input: &Self::Input,
        output: &Self::Output,
    ) -> Result<Vec<f64>, Self::Error>;

    /// Computes total derivatives at an evaluated point, if the problem can.
    ///
    /// Returning `None` asks the solver to fall back to finite differences.
    fn total_derivatives(
        &self,
        _x: &[f64],
        _input: &Self::Input,
        _output: &Self::Output,
    ) -> Option<Result<TotalDerivatives, Self::Error>> {
        None
    }

    /// Returns the length of the design vector.
    fn num_variables(&self) -> usize {
        self.design_variables().iter().map(|v| v.size).sum()
    }

    /// Returns the length of the flattened constraint vector.
    fn num_constraints(&self) -> usize {
        self.constraints().iter().map(|c| c.size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::convert::Infallible;

    struct Paraboloid {
        variables: Vec<DesignVariable>,
        constraints: Vec<ConstraintSpec>,
    }

    impl OptimizationProblem for Paraboloid {
        type Input = Vec<f64>;
        type Output = f64;
        type Error = Infallible;

        fn design_variables(&self) -> &[DesignVariable] {
            &self.variables
        }

        fn constraints(&self) -> &[ConstraintSpec] {
            &self.constraints
        }

        fn input(&self, x: &[f64]) -> Result<Vec<f64>, Self::Error> {
            Ok(x.to_vec())
        }

        fn objective(&self, _input: &Vec<f64>, output: &f64) -> Result<f64, Self::Error> {
            Ok(*output)
        }

        fn constraint_values(&self, input: &Vec<f64>, _output: &f64) -> Result<Vec<f64>, Self::Error> {
            Ok(vec![input.iter().sum()])
        }
    }

    #[test]
    fn sizes_follow_blocks() {
        let problem = Paraboloid {
            variables: vec![
                DesignVariable::new("a", 2, -1.0, 1.0),
                DesignVariable::new("b", 3, 0.0, 1.0).with_scaler(1e2),
            ],
            constraints: vec![ConstraintSpec::new("sum", 1, ConstraintKind::Equals(0.0))],
        };

        assert_eq!(problem.num_variables(), 5);
        assert_eq!(problem.num_constraints(), 1);
        assert!(problem.constraints()[0].is_equality());
        assert_eq!(problem.design_variables()[1].scaler, 1e2);
        assert!(problem.total_derivatives(&[0.0; 5], &vec![], &0.0).is_none());
    }
}
