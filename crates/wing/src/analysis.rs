//! The aerostructural [`Model`]: design point in, converged performance out.

use std::collections::HashSet;

use spar_core::{CoupledProblem, Model, Observer};
use spar_solvers::coupled::{self, ConvergenceRecord, NonlinearSolver};
use tracing::{debug, warn};
use uom::si::{angle::degree, f64::Angle};

use crate::{
    AeroModel, Error, FlightCondition, InvalidConfiguration, SpatialBeam, StructuralModel,
    SurfaceDefinition, VortexLattice,
    coupled::{CoupledAnalysis, SurfaceSizing, SurfaceState},
    mission::{self, Mission},
    performance::{self, SurfacePerformance},
};

/// Sizing and angle of attack for one analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignPoint {
    /// Sizing of every surface, in definition order.
    pub surfaces: Vec<SurfaceSizing>,
    pub alpha: Angle,
}

/// The outcome of one coupled analysis.
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub performance: Vec<SurfacePerformance>,
    pub mission: Mission,

    /// Coupling state of every surface from the final sweep.
    pub states: Vec<SurfaceState>,

    /// Final coupling vector, the concatenated nodal displacements.
    pub coupling: Vec<f64>,

    pub record: ConvergenceRecord,
}

impl AnalysisOutput {
    #[must_use]
    pub fn converged(&self) -> bool {
        self.record.converged()
    }
}

/// Coupled aerostructural analysis of a set of lifting surfaces.
///
/// The aerodynamic and structural models default to [`VortexLattice`] and
/// [`SpatialBeam`]; any pair of [`AeroModel`] and [`StructuralModel`] can be
/// substituted with [`Aerostructural::with_models`].
#[derive(Debug, Clone)]
pub struct Aerostructural<A = VortexLattice, S = SpatialBeam> {
    surfaces: Vec<SurfaceDefinition>,
    flight: FlightCondition,
    solver: NonlinearSolver,
    aero: A,
    structures: S,
}

impl Aerostructural {
    /// Creates an analysis with the default discipline models.
    ///
    /// # Errors
    ///
    /// Returns an error if the surfaces or the flight condition are invalid.
    pub fn new(
        surfaces: Vec<SurfaceDefinition>,
        flight: FlightCondition,
        solver: NonlinearSolver,
    ) -> Result<Self, InvalidConfiguration> {
        Self::with_models(surfaces, flight, solver, VortexLattice::default(), SpatialBeam)
    }
}

impl<A: AeroModel, S: StructuralModel> Aerostructural<A, S> {
    /// Creates an analysis with custom discipline models.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no surfaces, two surfaces share a name,
    /// a surface is inconsistent, or the flight condition is invalid.
    pub fn with_models(
        surfaces: Vec<SurfaceDefinition>,
        flight: FlightCondition,
        solver: NonlinearSolver,
        aero: A,
        structures: S,
    ) -> Result<Self, InvalidConfiguration> {
        if surfaces.is_empty() {
            return Err(InvalidConfiguration::NoSurfaces);
        }
        let mut names = HashSet::new();
        for surface in &surfaces {
            if !names.insert(surface.name.as_str()) {
                return Err(InvalidConfiguration::DuplicateSurface(surface.name.clone()));
            }
            surface.validate()?;
        }
        flight.validate()?;

        Ok(Self {
            surfaces,
            flight,
            solver,
            aero,
            structures,
        })
    }

    #[must_use]
    pub fn surfaces(&self) -> &[SurfaceDefinition] {
        &self.surfaces
    }

    #[must_use]
    pub fn flight(&self) -> &FlightCondition {
        &self.flight
    }

    #[must_use]
    pub fn solver(&self) -> &NonlinearSolver {
        &self.solver
    }

    /// Returns the design point built from every surface's initial control
    /// points at the configured angle of attack.
    #[must_use]
    pub fn initial_point(&self) -> DesignPoint {
        DesignPoint {
            surfaces: self
                .surfaces
                .iter()
                .map(|s| SurfaceSizing {
                    twist_cp: s.twist_cp.clone(),
                    thickness_cp: s.thickness_cp.clone(),
                })
                .collect(),
            alpha: self.flight.alpha,
        }
    }

    /// Applies a design point, ready for sweeping.
    ///
    /// # Errors
    ///
    /// Returns an error if the sizing is invalid or a stiffness matrix is
    /// singular.
    pub fn prepare(&self, point: &DesignPoint) -> Result<CoupledAnalysis<'_, A, S>, Error> {
        if !point.alpha.get::<degree>().is_finite() {
            return Err(InvalidConfiguration::Flight("alpha").into());
        }
        CoupledAnalysis::prepare(
            &self.aero,
            &self.structures,
            &self.surfaces,
            &point.surfaces,
            self.flight.with_alpha(point.alpha),
        )
    }

    /// Runs the coupled solve from undeformed meshes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SingularSystem`] if a discipline or the coupled
    /// Newton system is singular, or [`Error::InvalidConfiguration`] if the
    /// design point does not fit the surfaces.
    pub fn analyze(&self, point: &DesignPoint) -> Result<AnalysisOutput, Error> {
        self.analyze_observed(point, None, ())
    }

    /// Runs the coupled solve from a given coupling vector, such as the
    /// converged state of an earlier analysis.
    ///
    /// # Errors
    ///
    /// As for [`analyze`](Self::analyze).
    pub fn analyze_from(&self, point: &DesignPoint, coupling: Vec<f64>) -> Result<AnalysisOutput, Error> {
        self.analyze_observed(point, Some(coupling), ())
    }

    /// Runs the coupled solve, reporting each iteration to `observer`.
    ///
    /// # Errors
    ///
    /// As for [`analyze`](Self::analyze).
    pub fn analyze_observed<Obs>(
        &self,
        point: &DesignPoint,
        coupling: Option<Vec<f64>>,
        observer: Obs,
    ) -> Result<AnalysisOutput, Error>
    where
        Obs: for<'a> Observer<coupled::Event<'a, Vec<SurfaceState>>, coupled::Action>,
    {
        let analysis = self.prepare(point)?;
        let coupling = coupling.unwrap_or_else(|| analysis.initial_coupling());
        let solution = self
            .solver
            .solve_from(&analysis, coupling, observer)
            .map_err(|e| Error::from_coupled(e, analysis.label()))?;

        if !solution.converged() {
            warn!(
                method = %solution.record.method(),
                iterations = solution.record.iterations(),
                residual = solution.record.final_residual(),
                "coupled solve did not converge"
            );
        }

        let (performance, mission) = self.evaluate(&analysis, &solution.state)?;
        debug!(
            iterations = solution.record.iterations(),
            fuel_burn = mission.fuel_burn,
            l_equals_w = mission.l_equals_w,
            "aerostructural analysis"
        );

        Ok(AnalysisOutput {
            performance,
            mission,
            states: solution.state,
            coupling: solution.coupling,
            record: solution.record,
        })
    }

    /// Evaluates performance and mission totals of a coupling state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Mission`] if the state carries no positive lift or a
    /// mission total is not finite.
    pub fn evaluate(
        &self,
        analysis: &CoupledAnalysis<'_, A, S>,
        states: &[SurfaceState],
    ) -> Result<(Vec<SurfacePerformance>, Mission), Error> {
        let performance: Vec<SurfacePerformance> = analysis
            .surfaces()
            .iter()
            .zip(states)
            .map(|(surface, state)| {
                performance::evaluate(surface, state, &self.structures, analysis.flight())
            })
            .collect();
        let mission = mission::evaluate(&performance, analysis.flight())?;
        Ok((performance, mission))
    }
}

impl<A: AeroModel, S: StructuralModel> Model for Aerostructural<A, S> {
    type Input = DesignPoint;
    type Output = AnalysisOutput;
    type Error = Error;

    fn call(&self, input: &DesignPoint) -> Result<AnalysisOutput, Error> {
        self.analyze(input)
    }
}
