/// Defines a coupled multidisciplinary problem to be driven to a fixed point.
///
/// A coupled problem exposes a flat vector of coupling variables `u` (for an
/// aerostructural system, the nodal structural displacements) and a sweep map
/// `G`: one pass through every discipline, starting from `u` and producing the
/// next coupling vector `G(u)` together with the discipline state computed on
/// the way. Solvers search for `u` such that `G(u) = u`.
///
/// Implementations must be deterministic and must not mutate shared state
/// between sweeps; solvers are free to call [`sweep`](Self::sweep) at
/// perturbed coupling vectors (for example to build a Newton Jacobian).
pub trait CoupledProblem {
    /// Discipline state produced by a sweep.
    type State;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the coupling vector iteration starts from.
    fn initial_coupling(&self) -> Vec<f64>;

    /// Runs one pass through every discipline starting from `coupling`.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if any discipline fails to evaluate.
    fn sweep(&self, coupling: &[f64]) -> Result<Sweep<Self::State>, Self::Error>;
}

/// The result of one discipline sweep.
#[derive(Debug, Clone)]
pub struct Sweep<S> {
    /// Coupling vector produced by the sweep, `G(u)`.
    pub coupling: Vec<f64>,

    /// Discipline state computed during the sweep.
    pub state: S,
}

impl<S> Sweep<S> {
    /// Creates a sweep result.
    pub fn new(coupling: Vec<f64>, state: S) -> Self {
        Self { coupling, state }
    }
}
