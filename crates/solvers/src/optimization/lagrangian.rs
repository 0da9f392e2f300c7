use super::{Config, Point, Scaling};

/// Multipliers and penalty of the augmented Lagrangian.
#[derive(Debug, Clone)]
pub(super) struct AugmentedLagrangian {
    equality: Vec<bool>,
    multipliers: Vec<f64>,
    penalty: f64,
    growth: f64,
    max_penalty: f64,
}

impl AugmentedLagrangian {
    pub(super) fn new(equality: Vec<bool>, config: &Config) -> Self {
        Self {
            multipliers: vec![0.0; equality.len()],
            equality,
            penalty: config.initial_penalty,
            growth: config.penalty_growth,
            max_penalty: config.max_penalty,
        }
    }

    pub(super) fn penalty(&self) -> f64 {
        self.penalty
    }

    #[cfg(test)]
    pub(super) fn multipliers(&self) -> &[f64] {
        &self.multipliers
    }

    /// Returns `f + Σ ψ(gᵢ)` for scaled objective and constraints.
    pub(super) fn merit(&self, f: f64, g: &[f64]) -> f64 {
        let mu = self.penalty;
        let terms: f64 = g
            .iter()
            .zip(self.multipliers.iter().zip(&self.equality))
            .map(|(&g, (&lambda, &eq))| {
                if eq {
                    lambda * g + 0.5 * mu * g * g
                } else if g >= -lambda / mu {
                    lambda * g + 0.5 * mu * g * g
                } else {
                    -0.5 * lambda * lambda / mu
                }
            })
            .sum();
        f + terms
    }

    /// Returns the gradient of [`merit`](Self::merit).
    pub(super) fn gradient(&self, df: &[f64], g: &[f64], dg: &[Vec<f64>]) -> Vec<f64> {
        let weights: Vec<f64> = g
            .iter()
            .zip(self.multipliers.iter().zip(&self.equality))
            .map(|(&g, (&lambda, &eq))| {
                if eq {
                    lambda + self.penalty * g
                } else {
                    (lambda + self.penalty * g).max(0.0)
                }
            })
            .collect();
        combine(df, &weights, dg)
    }

    /// Applies the first-order multiplier update.
    pub(super) fn update_multipliers(&mut self, g: &[f64]) {
        for ((lambda, &eq), &g) in self.multipliers.iter_mut().zip(&self.equality).zip(g) {
            *lambda += self.penalty * g;
            if !eq {
                *lambda = lambda.max(0.0);
            }
        }
    }

    pub(super) fn grow_penalty(&mut self) {
        self.penalty = (self.penalty * self.growth).min(self.max_penalty);
    }

    /// Returns the largest scaled constraint violation.
    pub(super) fn violation(&self, g: &[f64]) -> f64 {
        g.iter()
            .zip(&self.equality)
            .map(|(&g, &eq)| if eq { g.abs() } else { g.max(0.0) })
            .fold(0.0, f64::max)
    }

    /// Returns `‖P(z − ∇L) − z‖∞` using the current multipliers.
    pub(super) fn stationarity<I, O>(&self, scaling: &Scaling, point: &Point<I, O>) -> f64 {
        let grad = combine(
            &point.objective_gradient,
            &self.multipliers,
            &point.constraint_gradients,
        );
        let z = scaling.to_scaled(&point.x);
        let stepped: Vec<f64> = z.iter().zip(&grad).map(|(z, g)| z - g).collect();
        scaling
            .project(&stepped)
            .iter()
            .zip(&z)
            .map(|(p, z)| (p - z).abs())
            .fold(0.0, f64::max)
    }
}

/// Returns `df + Σ wᵢ dgᵢ`.
fn combine(df: &[f64], weights: &[f64], dg: &[Vec<f64>]) -> Vec<f64> {
    let mut grad = df.to_vec();
    for (w, row) in weights.iter().zip(dg) {
        if *w != 0.0 {
            for (gj, dj) in grad.iter_mut().zip(row) {
                *gj += w * dj;
            }
        }
    }
    grad
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn lagrangian(equality: Vec<bool>) -> AugmentedLagrangian {
        AugmentedLagrangian::new(equality, &Config::default())
    }

    #[test]
    fn inactive_inequality_adds_nothing_at_zero_multiplier() {
        let al = lagrangian(vec![false]);
        assert_eq!(al.merit(1.0, &[-0.5]), 1.0);
        assert_eq!(al.gradient(&[2.0], &[-0.5], &[vec![3.0]]), vec![2.0]);
    }

    #[test]
    fn merit_gradient_matches_finite_difference() {
        let mut al = lagrangian(vec![false, true]);
        al.update_multipliers(&[0.05, -0.02]);

        // f = x², g = x − 0.5, h = 2x − 1
        let merit = |x: f64| al.merit(x * x, &[x - 0.5, 2.0 * x - 1.0]);
        let x = 0.7;
        let grad = al.gradient(&[2.0 * x], &[x - 0.5, 2.0 * x - 1.0], &[vec![1.0], vec![2.0]]);
        let h = 1e-6;
        let fd = (merit(x + h) - merit(x - h)) / (2.0 * h);
        assert_relative_eq!(grad[0], fd, epsilon = 1e-5);
    }

    #[test]
    fn updated_multipliers_make_lagrangian_gradient_the_merit_gradient() {
        let mut al = lagrangian(vec![false, false, true]);
        al.update_multipliers(&[0.2, -0.1, 0.3]);

        let df = [1.0, -2.0];
        let g = [0.05, -0.4, -0.2];
        let dg = [vec![1.0, 0.5], vec![-1.0, 2.0], vec![0.3, 0.7]];
        let merit_gradient = al.gradient(&df, &g, &dg);

        al.update_multipliers(&g);
        let lagrangian_gradient = combine(&df, al.multipliers(), &dg);
        for (a, b) in merit_gradient.iter().zip(&lagrangian_gradient) {
            assert_relative_eq!(*a, *b, epsilon = 1e-14);
        }
    }

    #[test]
    fn multipliers_stay_non_negative_for_inequalities() {
        let mut al = lagrangian(vec![false, true]);
        al.update_multipliers(&[-1.0, -1.0]);
        assert_eq!(al.multipliers()[0], 0.0);
        assert!(al.multipliers()[1] < 0.0);
        assert_eq!(al.violation(&[-1.0, -0.25]), 0.25);
    }

    #[test]
    fn penalty_growth_is_capped() {
        let mut al = lagrangian(vec![]);
        for _ in 0..20 {
            al.grow_penalty();
        }
        assert_eq!(al.penalty(), Config::default().max_penalty);
    }
}
