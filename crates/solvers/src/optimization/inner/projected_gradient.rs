use tracing::debug;

use crate::optimization::merit::{Interrupt, MeritFunction};

/// Sufficient-decrease constant of the Armijo condition.
const ARMIJO: f64 = 1e-4;

const MAX_BACKTRACKS: usize = 40;

/// Projected gradient descent with Armijo backtracking along the projection
/// arc.
///
/// Points whose merit is `+∞` fail the sufficient-decrease test, so the step
/// halves until it lands on an evaluable point.
pub(super) fn minimize<F: MeritFunction>(
    merit: &F,
    z0: &[f64],
    tolerance: f64,
    max_iters: usize,
) -> Result<(), Interrupt> {
    let mut z = merit.project(z0);
    let Some((mut f, mut g)) = merit.value(&z)? else {
        debug!("projected gradient started at a point assumed worse");
        return Ok(());
    };
    let mut step = 1.0;

    for iter in 0..max_iters {
        let moved = merit.project(&descend(&z, &g, 1.0));
        let stationarity = moved
            .iter()
            .zip(&z)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        if stationarity <= tolerance {
            debug!(iter, stationarity, "projected gradient converged");
            return Ok(());
        }

        let mut t = step;
        let mut accepted = None;
        for _ in 0..MAX_BACKTRACKS {
            let trial = merit.project(&descend(&z, &g, t));
            let slope: f64 = g
                .iter()
                .zip(trial.iter().zip(&z))
                .map(|(g, (a, b))| g * (a - b))
                .sum();
            if let Some((ft, gt)) = merit.value(&trial)? {
                if ft <= f + ARMIJO * slope {
                    accepted = Some((trial, ft, gt));
                    break;
                }
            }
            t *= 0.5;
        }

        let Some((trial, ft, gt)) = accepted else {
            debug!(iter, stationarity, "projected gradient line search stalled");
            return Ok(());
        };
        z = trial;
        f = ft;
        g = gt;
        step = 2.0 * t;
    }

    Ok(())
}

fn descend(z: &[f64], g: &[f64], t: f64) -> Vec<f64> {
    z.iter().zip(g).map(|(z, g)| z - t * g).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::{Cell, RefCell};

    use approx::assert_relative_eq;

    /// `(z₀ − 3)² + 4 (z₁ + 1)²` on `[−2, 2]²`, undefined for `z₁ > 1`.
    struct Bowl {
        calls: Cell<usize>,
        best: RefCell<Option<(f64, Vec<f64>)>>,
    }

    impl MeritFunction for Bowl {
        fn project(&self, z: &[f64]) -> Vec<f64> {
            z.iter().map(|v| v.clamp(-2.0, 2.0)).collect()
        }

        fn value(&self, z: &[f64]) -> Result<Option<(f64, Vec<f64>)>, Interrupt> {
            self.calls.set(self.calls.get() + 1);
            if z[1] > 1.0 {
                return Ok(None);
            }
            let f = (z[0] - 3.0).powi(2) + 4.0 * (z[1] + 1.0).powi(2);
            let mut best = self.best.borrow_mut();
            if best.as_ref().is_none_or(|(b, _)| f < *b) {
                *best = Some((f, z.to_vec()));
            }
            Ok(Some((f, vec![2.0 * (z[0] - 3.0), 8.0 * (z[1] + 1.0)])))
        }

        fn best(&self) -> Option<Vec<f64>> {
            self.best.borrow().as_ref().map(|(_, z)| z.clone())
        }
    }

    #[test]
    fn stops_at_active_bound() {
        let bowl = Bowl {
            calls: Cell::new(0),
            best: RefCell::new(None),
        };
        assert!(minimize(&bowl, &[0.0, 0.5], 1e-10, 200).is_ok());

        let z = bowl.best().unwrap();
        assert_relative_eq!(z[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(z[1], -1.0, epsilon = 1e-6);
    }

    #[test]
    fn backtracks_away_from_points_assumed_worse() {
        let bowl = Bowl {
            calls: Cell::new(0),
            best: RefCell::new(None),
        };
        // Starting gradient points toward z₁ > 1.
        assert!(minimize(&bowl, &[0.0, -2.0], 1e-10, 200).is_ok());

        let z = bowl.best().unwrap();
        assert_relative_eq!(z[1], -1.0, epsilon = 1e-6);
        assert!(bowl.calls.get() > 2);
    }
}
