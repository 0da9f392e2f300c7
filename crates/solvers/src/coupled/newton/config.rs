use thiserror::Error;

/// Configuration for the coupled Newton solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    max_iters: usize,
    atol: f64,
    rtol: f64,
    fd_step: f64,
}

/// Errors that can occur when validating a Newton config.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_iters must be at least 1")]
    MaxIters,

    #[error("atol must be finite and non-negative")]
    Atol,

    #[error("rtol must be finite and non-negative")]
    Rtol,

    #[error("fd_step must be finite and positive")]
    FdStep,
}

impl Default for Config {
    fn default() -> Self {
        // Known-good values, unwrap is safe
        Self::new(20, 1e-10, 1e-10, 1e-7).unwrap()
    }
}

impl Config {
    /// Creates a new config with validated tolerances.
    ///
    /// The Jacobian column for coupling `j` is differenced with step
    /// `fd_step * max(1, |u_j|)`.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_iters` is zero, a tolerance is negative or
    /// non-finite, or `fd_step` is not positive.
    pub fn new(max_iters: usize, atol: f64, rtol: f64, fd_step: f64) -> Result<Self, ConfigError> {
        if max_iters == 0 {
            return Err(ConfigError::MaxIters);
        }
        if !atol.is_finite() || atol < 0.0 {
            return Err(ConfigError::Atol);
        }
        if !rtol.is_finite() || rtol < 0.0 {
            return Err(ConfigError::Rtol);
        }
        if !fd_step.is_finite() || fd_step <= 0.0 {
            return Err(ConfigError::FdStep);
        }

        Ok(Self {
            max_iters,
            atol,
            rtol,
            fd_step,
        })
    }

    /// Returns the maximum number of Newton steps.
    #[must_use]
    pub fn max_iters(&self) -> usize {
        self.max_iters
    }

    /// Returns the absolute residual tolerance.
    #[must_use]
    pub fn atol(&self) -> f64 {
        self.atol
    }

    /// Returns the residual tolerance relative to the first residual.
    #[must_use]
    pub fn rtol(&self) -> f64 {
        self.rtol
    }

    /// Returns the relative finite-difference step.
    #[must_use]
    pub fn fd_step(&self) -> f64 {
        self.fd_step
    }
}
