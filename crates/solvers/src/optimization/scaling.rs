use spar_core::{ConstraintKind, OptimizationProblem};
use thiserror::Error;

/// Maps between physical design vectors and the scaled vectors the
/// optimizer works on.
///
/// Design variables are multiplied by their scaler. The objective is
/// multiplied by the problem's objective scaler. Constraints are rewritten as
/// `g ≤ 0` (inequalities) or `h = 0` (equalities) and multiplied by their
/// scaler.
#[derive(Debug, Clone, PartialEq)]
pub struct Scaling {
    scalers: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    objective_scaler: f64,
    constraint_scalers: Vec<f64>,
    kinds: Vec<ConstraintKind>,
}

/// Errors found in a problem's variable and constraint definitions.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScalingError {
    #[error("design variable `{name}` has a zero or non-finite scaler")]
    VariableScaler { name: String },

    #[error("design variable `{name}` has lower bound above upper bound")]
    Bounds { name: String },

    #[error("constraint `{name}` has a zero or non-finite scaler")]
    ConstraintScaler { name: String },

    #[error("objective scaler must be finite and positive")]
    ObjectiveScaler,

    #[error("starting point has {actual} values, expected {expected}")]
    StartLength { expected: usize, actual: usize },
}

impl Scaling {
    /// Builds the scaling for a problem.
    ///
    /// # Errors
    ///
    /// Returns an error if a scaler is zero or non-finite, or a bound pair is
    /// inverted.
    pub fn new<P: OptimizationProblem>(problem: &P) -> Result<Self, ScalingError> {
        let objective_scaler = problem.objective_scaler();
        if !objective_scaler.is_finite() || objective_scaler <= 0.0 {
            return Err(ScalingError::ObjectiveScaler);
        }

        let mut scalers = Vec::new();
        let mut lower = Vec::new();
        let mut upper = Vec::new();
        for var in problem.design_variables() {
            if !var.scaler.is_finite() || var.scaler == 0.0 {
                return Err(ScalingError::VariableScaler {
                    name: var.name.clone(),
                });
            }
            if var.lower > var.upper || var.lower.is_nan() || var.upper.is_nan() {
                return Err(ScalingError::Bounds {
                    name: var.name.clone(),
                });
            }
            let (lo, hi) = if var.scaler > 0.0 {
                (var.lower * var.scaler, var.upper * var.scaler)
            } else {
                (var.upper * var.scaler, var.lower * var.scaler)
            };
            for _ in 0..var.size {
                scalers.push(var.scaler);
                lower.push(lo);
                upper.push(hi);
            }
        }

        let mut constraint_scalers = Vec::new();
        let mut kinds = Vec::new();
        for con in problem.constraints() {
            if !con.scaler.is_finite() || con.scaler == 0.0 {
                return Err(ScalingError::ConstraintScaler {
                    name: con.name.clone(),
                });
            }
            for _ in 0..con.size {
                constraint_scalers.push(con.scaler);
                kinds.push(con.kind);
            }
        }

        Ok(Self {
            scalers,
            lower,
            upper,
            objective_scaler,
            constraint_scalers,
            kinds,
        })
    }

    /// Returns the length of the design vector.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scalers.len()
    }

    /// Returns true if the problem has no design variables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scalers.is_empty()
    }

    /// Returns the number of flattened constraint values.
    #[must_use]
    pub fn num_constraints(&self) -> usize {
        self.kinds.len()
    }

    #[must_use]
    pub fn to_scaled(&self, x: &[f64]) -> Vec<f64> {
        x.iter().zip(&self.scalers).map(|(x, s)| x * s).collect()
    }

    #[must_use]
    pub fn to_physical(&self, z: &[f64]) -> Vec<f64> {
        z.iter().zip(&self.scalers).map(|(z, s)| z / s).collect()
    }

    /// Projects a scaled vector onto the scaled bounds.
    #[must_use]
    pub fn project(&self, z: &[f64]) -> Vec<f64> {
        z.iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(z, (lo, hi))| z.clamp(*lo, *hi))
            .collect()
    }

    /// Returns the scaled lower bounds.
    #[must_use]
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    /// Returns the scaled upper bounds.
    #[must_use]
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Returns which flattened constraints are equalities.
    #[must_use]
    pub fn equalities(&self) -> Vec<bool> {
        self.kinds
            .iter()
            .map(|k| matches!(k, ConstraintKind::Equals(_)))
            .collect()
    }

    /// Returns the scaled objective.
    #[must_use]
    pub fn objective(&self, f: f64) -> f64 {
        f * self.objective_scaler
    }

    /// Converts a physical objective gradient into a scaled one.
    #[must_use]
    pub fn objective_gradient(&self, df_dx: &[f64]) -> Vec<f64> {
        df_dx
            .iter()
            .zip(&self.scalers)
            .map(|(d, s)| d * self.objective_scaler / s)
            .collect()
    }

    /// Rewrites physical constraint values in scaled `g ≤ 0` / `h = 0` form.
    #[must_use]
    pub fn constraints(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .zip(self.kinds.iter().zip(&self.constraint_scalers))
            .map(|(c, (kind, s))| match *kind {
                ConstraintKind::Upper(bound) => s * (c - bound),
                ConstraintKind::Lower(bound) => s * (bound - c),
                ConstraintKind::Equals(target) => s * (c - target),
            })
            .collect()
    }

    /// Converts physical constraint gradient rows into scaled ones.
    #[must_use]
    pub fn constraint_gradients(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter()
            .zip(self.kinds.iter().zip(&self.constraint_scalers))
            .map(|(row, (kind, s))| {
                let sign = if matches!(kind, ConstraintKind::Lower(_)) {
                    -s
                } else {
                    *s
                };
                row.iter()
                    .zip(&self.scalers)
                    .map(|(d, vs)| sign * d / vs)
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use spar_core::{ConstraintSpec, DesignVariable};

    use crate::optimization::tests::Quadratic;

    #[test]
    fn scales_and_projects() {
        let problem = Quadratic::new(
            vec![DesignVariable::new("t", 2, 0.01, 0.5).with_scaler(1e2)],
            vec![],
        );
        let scaling = Scaling::new(&problem).unwrap();

        assert_eq!(scaling.len(), 2);
        assert_eq!(scaling.lower(), &[1.0, 1.0]);
        assert_eq!(scaling.upper(), &[50.0, 50.0]);

        let z = scaling.to_scaled(&[0.075, 0.6]);
        assert_relative_eq!(z[0], 7.5, epsilon = 1e-12);
        assert_eq!(scaling.project(&z)[1], 50.0);
        assert_relative_eq!(scaling.to_physical(&z)[0], 0.075, epsilon = 1e-12);
    }

    #[test]
    fn rewrites_constraints_as_non_positive() {
        let problem = Quadratic::new(
            vec![DesignVariable::new("x", 1, -1.0, 1.0)],
            vec![
                ConstraintSpec::new("upper", 1, ConstraintKind::Upper(1.0)),
                ConstraintSpec::new("lower", 1, ConstraintKind::Lower(2.0)).with_scaler(2.0),
                ConstraintSpec::new("eq", 1, ConstraintKind::Equals(0.5)),
            ],
        );
        let scaling = Scaling::new(&problem).unwrap();

        assert_eq!(scaling.constraints(&[0.5, 3.0, 0.5]), vec![-0.5, -2.0, 0.0]);
        assert_eq!(scaling.equalities(), vec![false, false, true]);

        let rows = scaling.constraint_gradients(&[vec![1.0], vec![1.0], vec![1.0]]);
        assert_eq!(rows, vec![vec![1.0], vec![-2.0], vec![1.0]]);
    }

    #[test]
    fn rejects_zero_scaler() {
        let problem = Quadratic::new(
            vec![DesignVariable::new("x", 1, -1.0, 1.0).with_scaler(0.0)],
            vec![],
        );
        assert!(matches!(
            Scaling::new(&problem),
            Err(ScalingError::VariableScaler { .. })
        ));
    }
}
