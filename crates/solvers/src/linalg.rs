//! Dense linear solves shared by the coupled solvers and the disciplines.

use nalgebra::{DMatrix, DVector, Dyn, linalg::LU};
use thiserror::Error;

/// Pivot magnitude, relative to the largest pivot, treated as zero.
pub const PIVOT_RATIO: f64 = 1e-14;

/// A linear system with a vanishing or non-finite pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("linear system is singular")]
pub struct Singular;

/// A dense LU factorization with a checked pivot ratio.
#[derive(Debug, Clone)]
pub struct Factorization(LU<f64, Dyn, Dyn>);

impl Factorization {
    /// Factorizes `a`.
    ///
    /// # Errors
    ///
    /// Returns [`Singular`] if `a` is not square, holds a non-finite entry, or
    /// has a pivot that vanishes relative to the largest pivot.
    pub fn new(a: DMatrix<f64>) -> Result<Self, Singular> {
        if !a.is_square() || a.iter().any(|v| !v.is_finite()) {
            return Err(Singular);
        }

        let lu = a.lu();
        let diag = lu.u().diagonal();
        let largest = diag.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let smallest = diag.iter().fold(f64::INFINITY, |m, v| m.min(v.abs()));
        if largest == 0.0 || smallest <= PIVOT_RATIO * largest {
            return Err(Singular);
        }

        Ok(Self(lu))
    }

    /// Solves `a x = b`.
    ///
    /// # Errors
    ///
    /// Returns [`Singular`] if the solution is not finite.
    pub fn solve(&self, b: &DVector<f64>) -> Result<DVector<f64>, Singular> {
        self.0
            .solve(b)
            .filter(|x| x.iter().all(|v| v.is_finite()))
            .ok_or(Singular)
    }
}

/// Factorizes `a` and solves `a x = b`.
///
/// # Errors
///
/// Returns [`Singular`] as for [`Factorization::new`] and
/// [`Factorization::solve`].
pub fn solve(a: DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, Singular> {
    Factorization::new(a)?.solve(b)
}
