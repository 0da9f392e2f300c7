use spar_core::Observer;

use crate::traits::{CanStopEarly, HasResidual};

/// Records the residual of every event.
///
/// With a `stop_below` threshold set, the observer also stops the solver once
/// a finite residual falls below it.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ResidualHistory {
    residuals: Vec<f64>,
    stop_below: Option<f64>,
}

impl ResidualHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops the solver once a residual falls below `threshold`.
    #[must_use]
    pub fn stop_below(mut self, threshold: f64) -> Self {
        self.stop_below = Some(threshold);
        self
    }

    /// Returns the recorded residuals in event order.
    #[must_use]
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Returns true if no recorded residual exceeds its predecessor.
    #[must_use]
    pub fn is_monotone(&self) -> bool {
        self.residuals.windows(2).all(|w| w[1] <= w[0])
    }
}

impl<E: HasResidual, A: CanStopEarly> Observer<E, A> for ResidualHistory {
    fn observe(&mut self, event: &E) -> Option<A> {
        let residual = event.residual();
        self.residuals.push(residual);
        match self.stop_below {
            Some(threshold) if residual.is_finite() && residual < threshold => {
                Some(A::stop_early())
            }
            _ => None,
        }
    }
}
