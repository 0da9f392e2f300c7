use thiserror::Error;

use spar_core::{Model, OptimizationProblem, Snapshot};

/// The result of evaluating an optimization problem at a given `x`.
#[derive(Debug, Clone)]
pub struct Evaluation<I, O> {
    pub x: Vec<f64>,

    pub objective: f64,

    /// Flattened, unscaled constraint values.
    pub constraints: Vec<f64>,

    pub snapshot: Snapshot<I, O>,
}

/// Errors that can occur when evaluating an optimization problem.
#[derive(Debug, Error)]
pub enum EvalError<ME, PE> {
    /// The model call failed.
    #[error("model call failed")]
    Model(#[source] ME),

    /// Failed to construct input or compute the objective or constraints.
    #[error("problem error")]
    Problem(#[source] PE),

    /// The problem returned the wrong number of constraint values.
    #[error("problem returned {actual} constraint values, expected {expected}")]
    ConstraintLength { expected: usize, actual: usize },
}

/// Type alias for the result of [`evaluate`].
pub type EvaluateResult<M, P> = Result<
    Evaluation<<M as Model>::Input, <M as Model>::Output>,
    EvalError<<M as Model>::Error, <P as OptimizationProblem>::Error>,
>;

/// Evaluates the model in the context of an optimization problem.
///
/// This function maps `x` to model input, calls the model, then computes
/// the objective and constraints from the input and output.
///
/// # Errors
///
/// Returns an error if input mapping, the model call, or objective or
/// constraint computation fails.
pub fn evaluate<M, P>(model: &M, problem: &P, x: &[f64]) -> EvaluateResult<M, P>
where
    M: Model,
    P: OptimizationProblem<Input = M::Input, Output = M::Output>,
{
    let input = problem.input(x).map_err(EvalError::Problem)?;
    let output = model.call(&input).map_err(EvalError::Model)?;
    let objective = problem
        .objective(&input, &output)
        .map_err(EvalError::Problem)?;
    let constraints = problem
        .constraint_values(&input, &output)
        .map_err(EvalError::Problem)?;

    let expected = problem.num_constraints();
    if constraints.len() != expected {
        return Err(EvalError::ConstraintLength {
            expected,
            actual: constraints.len(),
        });
    }

    Ok(Evaluation {
        x: x.to_vec(),
        objective,
        constraints,
        snapshot: Snapshot::new(input, output),
    })
}
