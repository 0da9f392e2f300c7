use super::{ConfigError, EvalError, ScalingError};

/// Errors that can occur during optimization.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("model error: {0}")]
    Model(Box<dyn std::error::Error + Send + Sync>),

    #[error("problem error: {0}")]
    Problem(Box<dyn std::error::Error + Send + Sync>),

    #[error("invalid optimizer config: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid problem definition: {0}")]
    Scaling(#[from] ScalingError),

    /// Supplied total derivatives do not match the design and constraint
    /// vector lengths.
    #[error("total derivatives have the wrong shape")]
    DerivativeShape,

    /// Every evaluation in an inner minimization was assumed worse.
    #[error("no evaluable design point was found")]
    NoFeasiblePoint,

    /// The L-BFGS executor failed for a reason other than an evaluation.
    #[error("L-BFGS failed: {0}")]
    Lbfgs(String),
}

impl<ME, PE> From<EvalError<ME, PE>> for Error
where
    ME: std::error::Error + Send + Sync + 'static,
    PE: std::error::Error + Send + Sync + 'static,
{
    fn from(error: EvalError<ME, PE>) -> Self {
        match error {
            EvalError::Model(e) => Error::Model(Box::new(e)),
            EvalError::Problem(e) => Error::Problem(Box::new(e)),
            e @ EvalError::ConstraintLength { .. } => Error::Problem(Box::new(e)),
        }
    }
}
