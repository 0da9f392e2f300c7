//! Inner minimizers of the bound-constrained merit function.

#[cfg(feature = "argmin")]
mod lbfgs;
mod projected_gradient;

use super::{Config, Optimizer, merit::Interrupt, merit::MeritFunction};

/// Minimizes `merit` from `z0` with the given strategy.
///
/// The result is the merit function's own record of its best point; this
/// function only drives the search.
pub(super) fn minimize<F: MeritFunction>(
    merit: &F,
    z0: &[f64],
    optimizer: Optimizer,
    tolerance: f64,
    config: &Config,
) -> Result<(), Interrupt> {
    match optimizer {
        #[cfg(feature = "argmin")]
        Optimizer::Preferred => lbfgs::minimize(merit, z0, tolerance, config),
        _ => projected_gradient::minimize(merit, z0, tolerance, config.max_inner_iters),
    }
}
