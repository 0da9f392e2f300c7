use thiserror::Error;
use tracing::warn;

/// Inner minimization strategy, chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Optimizer {
    /// L-BFGS with a Moré–Thuente line search, provided by `argmin`.
    #[default]
    Preferred,

    /// Projected gradient with Armijo backtracking.
    Fallback,
}

impl Optimizer {
    /// Returns the strategy that will actually run.
    ///
    /// [`Optimizer::Preferred`] resolves to [`Optimizer::Fallback`] when the
    /// crate is built without the `argmin` feature.
    #[must_use]
    pub fn resolve(self) -> Self {
        match self {
            Self::Preferred if !cfg!(feature = "argmin") => {
                warn!("argmin support is not compiled in, using the projected-gradient fallback");
                Self::Fallback
            }
            other => other,
        }
    }
}

/// Configuration for the augmented-Lagrangian optimizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub optimizer: Optimizer,

    /// Maximum number of multiplier updates.
    pub max_outer_iters: usize,

    /// Maximum number of iterations per inner minimization.
    pub max_inner_iters: usize,

    /// Tolerance on the projected Lagrangian gradient, `‖P(z − ∇L) − z‖∞`.
    pub tolerance: f64,

    /// Tolerance on the largest scaled constraint violation.
    pub feasibility_tol: f64,

    /// Factor loosening [`tolerance`](Self::tolerance) for the fallback.
    pub fallback_tol_factor: f64,

    pub initial_penalty: f64,
    pub penalty_growth: f64,
    pub max_penalty: f64,

    /// The penalty grows when the violation fails to fall below this fraction
    /// of the previous outer iteration's violation.
    pub penalty_trigger: f64,

    /// Quadratic penalty on the distance from the bounds, seen only by inner
    /// solvers that step outside them.
    pub bound_penalty: f64,

    /// Relative forward-difference step for gradients.
    pub fd_step: f64,

    /// Number of correction pairs kept by L-BFGS.
    pub lbfgs_memory: usize,
}

/// Errors that can occur when validating an optimizer config.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_outer_iters and max_inner_iters must be at least 1")]
    Iterations,

    #[error("tolerances must be finite and non-negative")]
    Tolerance,

    #[error("fallback_tol_factor must be finite and at least 1")]
    FallbackFactor,

    #[error("penalty settings must satisfy 0 < initial <= max and growth > 1")]
    Penalty,

    #[error("penalty_trigger must lie in (0, 1]")]
    Trigger,

    #[error("bound_penalty and fd_step must be finite and positive")]
    Positive,

    #[error("lbfgs_memory must be at least 1")]
    Memory,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            optimizer: Optimizer::Preferred,
            max_outer_iters: 30,
            max_inner_iters: 100,
            tolerance: 1e-6,
            feasibility_tol: 1e-6,
            fallback_tol_factor: 10.0,
            initial_penalty: 10.0,
            penalty_growth: 10.0,
            max_penalty: 1e8,
            penalty_trigger: 0.25,
            bound_penalty: 1e6,
            fd_step: 1e-6,
            lbfgs_memory: 10,
        }
    }
}

impl Config {
    /// Validates iteration limits, tolerances, and penalty settings.
    ///
    /// # Errors
    ///
    /// Returns the first setting found to be invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_outer_iters == 0 || self.max_inner_iters == 0 {
            return Err(ConfigError::Iterations);
        }
        let non_negative = |v: f64| v.is_finite() && v >= 0.0;
        if !non_negative(self.tolerance) || !non_negative(self.feasibility_tol) {
            return Err(ConfigError::Tolerance);
        }
        if !self.fallback_tol_factor.is_finite() || self.fallback_tol_factor < 1.0 {
            return Err(ConfigError::FallbackFactor);
        }
        let penalty_ok = self.initial_penalty > 0.0
            && self.initial_penalty <= self.max_penalty
            && self.max_penalty.is_finite()
            && self.penalty_growth.is_finite()
            && self.penalty_growth > 1.0;
        if !penalty_ok {
            return Err(ConfigError::Penalty);
        }
        if !(self.penalty_trigger > 0.0 && self.penalty_trigger <= 1.0) {
            return Err(ConfigError::Trigger);
        }
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.bound_penalty) || !positive(self.fd_step) {
            return Err(ConfigError::Positive);
        }
        if self.lbfgs_memory == 0 {
            return Err(ConfigError::Memory);
        }
        Ok(())
    }

    /// Returns the stationarity tolerance used with `optimizer`.
    #[must_use]
    pub fn stationarity_tol(&self, optimizer: Optimizer) -> f64 {
        match optimizer {
            Optimizer::Preferred => self.tolerance,
            Optimizer::Fallback => self.tolerance * self.fallback_tol_factor,
        }
    }
}
