use std::fmt;

use ninterp::error::{InterpolateError, ValidateError};
use spar_solvers::coupled::{self, gauss_seidel, newton};
use thiserror::Error;

use crate::mission::MissionError;

/// Errors produced by an aerostructural analysis.
///
/// Coupled non-convergence is not an error: the analysis returns its last
/// iterate and reports the outcome through its
/// [`ConvergenceRecord`](spar_solvers::coupled::ConvergenceRecord).
#[derive(Debug, Error)]
pub enum Error {
    /// The problem definition is inconsistent and no solve was attempted.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] InvalidConfiguration),

    /// A linear solve inside a discipline, or the coupled Newton system,
    /// could not be completed.
    #[error("singular {discipline} system on surface `{surface}`")]
    SingularSystem {
        discipline: Discipline,
        surface: String,
    },

    /// The coupled state converged but the mission cannot be evaluated from it.
    #[error("mission: {0}")]
    Mission(#[from] MissionError),
}

impl Error {
    /// Returns true if the evaluation failed on a singular system.
    ///
    /// Optimizer observers use this to treat the point as infeasible instead
    /// of aborting the run.
    #[must_use]
    pub fn is_singular(&self) -> bool {
        matches!(self, Self::SingularSystem { .. })
    }

    /// Returns true if the design point is physically infeasible: a singular
    /// system or a state the mission cannot be flown from.
    #[must_use]
    pub fn is_infeasible(&self) -> bool {
        matches!(self, Self::SingularSystem { .. } | Self::Mission(_))
    }

    pub(crate) fn singular(discipline: Discipline, surface: impl Into<String>) -> Self {
        Self::SingularSystem {
            discipline,
            surface: surface.into(),
        }
    }

    /// Maps a coupled-solver failure, naming every surface in the solve.
    pub(crate) fn from_coupled(error: coupled::Error<Error>, surfaces: &str) -> Self {
        match error {
            coupled::Error::Problem(error) => error,
            coupled::Error::SingularJacobian { .. } | coupled::Error::NonFiniteResidual { .. } => {
                Self::singular(Discipline::Coupled, surfaces)
            }
            coupled::Error::CouplingLength { expected, actual } => {
                InvalidConfiguration::CouplingLength { expected, actual }.into()
            }
        }
    }
}

/// The linear system that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discipline {
    Aerodynamic,
    Structural,

    /// The joint Newton or adjoint system.
    Coupled,
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aerodynamic => f.write_str("aerodynamic"),
            Self::Structural => f.write_str("structural"),
            Self::Coupled => f.write_str("coupled"),
        }
    }
}

/// A linear system with a vanishing or non-finite pivot.
///
/// Returned by [`AeroModel`](crate::AeroModel) and
/// [`StructuralModel`](crate::StructuralModel) implementations; the analysis
/// attaches the discipline and surface before reporting it.
pub use spar_solvers::linalg::Singular;

/// Setup errors detected before any solve.
#[derive(Debug, Error)]
pub enum InvalidConfiguration {
    #[error("at least one surface is required")]
    NoSurfaces,

    #[error("surface name `{0}` is used more than once")]
    DuplicateSurface(String),

    #[error("surface `{surface}`: mesh needs at least 2×2 nodes, got {nx}×{ny}")]
    MeshTooSmall {
        surface: String,
        nx: usize,
        ny: usize,
    },

    #[error("surface `{surface}`: a symmetric mesh needs an odd num_y, got {ny}")]
    EvenSymmetricMesh { surface: String, ny: usize },

    #[error("surface `{surface}`: mesh must have shape (nx, ny, 3)")]
    MeshShape { surface: String },

    #[error("surface `{surface}`: {field} has {actual} values, expected {expected}")]
    Length {
        surface: String,
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("surface `{surface}`: {field} must be positive and finite")]
    NotPositive {
        surface: String,
        field: &'static str,
    },

    #[error("surface `{surface}`: {field} must be finite")]
    NotFinite {
        surface: String,
        field: &'static str,
    },

    #[error("surface `{surface}`: {field} must be finite and non-negative")]
    Negative {
        surface: String,
        field: &'static str,
    },

    #[error("surface `{surface}`: {field} must lie in [0, 1]")]
    Fraction {
        surface: String,
        field: &'static str,
    },

    #[error("flight condition: {0} must be positive and finite")]
    Flight(&'static str),

    #[error("design vector has {actual} values, expected {expected}")]
    DesignLength { expected: usize, actual: usize },

    #[error("coupling vector has {actual} values, expected {expected}")]
    CouplingLength { expected: usize, actual: usize },

    #[error("control point arrays must not be empty")]
    EmptyControlPoints,

    #[error("control point grid: {0}")]
    ControlPoints(#[from] ValidateError),

    #[error("control point interpolation: {0}")]
    Interpolation(#[from] InterpolateError),

    #[error("gauss-seidel settings: {0}")]
    GaussSeidel(#[from] gauss_seidel::ConfigError),

    #[error("newton settings: {0}")]
    Newton(#[from] newton::ConfigError),

    #[error("design setting `{name}`: bounds must be finite with lower <= upper")]
    Bounds { name: &'static str },

    #[error("design setting `{name}` must be positive and finite")]
    Setting { name: &'static str },
}
