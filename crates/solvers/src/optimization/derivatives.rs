use rayon::prelude::*;
use spar_core::{Model, OptimizationProblem, TotalDerivatives};

use super::{EvalError, evaluate};

/// Computes forward-difference derivatives of the objective and constraints.
///
/// `base` holds the objective and constraint values already evaluated at `x`.
/// Columns are evaluated in parallel. The step for variable `j` is
/// `step * max(1, |x_j|)`; it is taken backward when a forward step would
/// cross the variable's upper bound.
///
/// # Errors
///
/// Returns the first evaluation error encountered at a perturbed point.
pub fn finite_difference<M, P>(
    model: &M,
    problem: &P,
    x: &[f64],
    base: (f64, &[f64]),
    step: f64,
) -> Result<TotalDerivatives, EvalError<M::Error, P::Error>>
where
    M: Model + Sync,
    P: OptimizationProblem<Input = M::Input, Output = M::Output> + Sync,
{
    let upper: Vec<f64> = problem
        .design_variables()
        .iter()
        .flat_map(|v| std::iter::repeat_n(v.upper, v.size))
        .collect();
    let (f0, c0) = base;

    let columns = (0..x.len())
        .into_par_iter()
        .map(|j| {
            let mut h = step * x[j].abs().max(1.0);
            if upper.get(j).is_some_and(|&hi| x[j] + h > hi) {
                h = -h;
            }
            let mut perturbed = x.to_vec();
            perturbed[j] += h;

            let eval = evaluate(model, problem, &perturbed)?;
            let df = (eval.objective - f0) / h;
            let dc: Vec<f64> = eval
                .constraints
                .iter()
                .zip(c0)
                .map(|(c, c0)| (c - c0) / h)
                .collect();
            Ok((df, dc))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut derivatives = TotalDerivatives {
        objective: Vec::with_capacity(x.len()),
        constraints: vec![vec![0.0; x.len()]; c0.len()],
    };
    for (j, (df, dc)) in columns.into_iter().enumerate() {
        derivatives.objective.push(df);
        for (row, d) in derivatives.constraints.iter_mut().zip(dc) {
            row[j] = d;
        }
    }
    Ok(derivatives)
}
