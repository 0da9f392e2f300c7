use thiserror::Error;

/// Configuration for the nonlinear block Gauss–Seidel solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    max_iters: usize,
    atol: f64,
    rtol: f64,
    relaxation: Relaxation,
}

/// Update rule applied between sweeps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Relaxation {
    /// Plain fixed-point update, `u ← G(u)`.
    None,

    /// Dynamic Aitken relaxation, `u ← u + θ (G(u) − u)`, with `θ` clipped to
    /// `[min, max]`.
    Aitken { initial: f64, min: f64, max: f64 },
}

/// Errors that can occur when validating a Gauss–Seidel config.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_iters must be at least 1")]
    MaxIters,

    #[error("atol must be finite and non-negative")]
    Atol,

    #[error("rtol must be finite and non-negative")]
    Rtol,

    #[error("Aitken bounds must satisfy 0 < min <= initial <= max")]
    Aitken,
}

impl Default for Config {
    fn default() -> Self {
        // Known-good values, unwrap is safe
        Self::new(20, 1e-10, 1e-10).unwrap()
    }
}

impl Config {
    /// Creates a new config without relaxation.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_iters` is zero or a tolerance is negative or
    /// non-finite.
    pub fn new(max_iters: usize, atol: f64, rtol: f64) -> Result<Self, ConfigError> {
        if max_iters == 0 {
            return Err(ConfigError::MaxIters);
        }
        if !atol.is_finite() || atol < 0.0 {
            return Err(ConfigError::Atol);
        }
        if !rtol.is_finite() || rtol < 0.0 {
            return Err(ConfigError::Rtol);
        }

        Ok(Self {
            max_iters,
            atol,
            rtol,
            relaxation: Relaxation::None,
        })
    }

    /// Enables Aitken relaxation.
    ///
    /// # Errors
    ///
    /// Returns an error unless `0 < min <= initial <= max`.
    pub fn with_aitken(mut self, initial: f64, min: f64, max: f64) -> Result<Self, ConfigError> {
        let valid = [initial, min, max].iter().all(|v| v.is_finite())
            && min > 0.0
            && min <= initial
            && initial <= max;
        if !valid {
            return Err(ConfigError::Aitken);
        }

        self.relaxation = Relaxation::Aitken { initial, min, max };
        Ok(self)
    }

    /// Returns the maximum number of sweeps.
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

    /// Returns the update rule.
    #[must_use]
    pub fn relaxation(&self) -> Relaxation {
        self.relaxation
    }
}
