//! One design point prepared for the coupled aerostructural fixed point.
//!
//! [`CoupledAnalysis`] owns everything that depends on sizing but not on the
//! coupling state: twisted meshes, spar beams, factorized stiffnesses and the
//! load-transfer operators. It is built once per design point and swept
//! repeatedly by a [`NonlinearSolver`](spar_solvers::coupled::NonlinearSolver).

use ndarray::Array3;
use spar_core::{CoupledProblem, Sweep};
use tracing::trace;
use uom::si::{mass_density::kilogram_per_cubic_meter, pressure::pascal};

use crate::{
    AeroModel, AeroSurface, Beam, Discipline, Error, FlightCondition, InvalidConfiguration,
    LoadTransfer, StructuralModel, SurfaceDefinition,
    geometry::{self, Mesh},
    surface::check_control_points,
};

/// Twist and thickness control points for one surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSizing {
    /// Spanwise twist control points, in degrees.
    pub twist_cp: Vec<f64>,

    /// Spanwise spar wall thickness control points, in metres.
    pub thickness_cp: Vec<f64>,
}

/// Sizing values interpolated onto the structural grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Sizing {
    /// Twist at every spanwise node, in degrees.
    pub twist: Vec<f64>,

    /// Wall thickness of every spar element.
    pub thickness: Vec<f64>,

    /// Outer radius of every spar element.
    pub radius: Vec<f64>,
}

/// A surface with its sizing applied and its structure factorized.
pub struct PreparedSurface<'a, K> {
    pub definition: &'a SurfaceDefinition,
    pub sizing: Sizing,
    pub beam: Beam,
    pub transfer: LoadTransfer,
    stiffness: K,
}

impl<K> PreparedSurface<'_, K> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Returns the undeformed, twisted mesh.
    #[must_use]
    pub fn mesh(&self) -> &Mesh {
        self.transfer.baseline()
    }
}

/// Coupling state of one surface after a discipline sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceState {
    /// Mesh deformed by the displacements the sweep started from.
    pub mesh: Mesh,

    /// Panel forces on the deformed mesh, `(nx − 1, ny − 1, 3)`.
    pub forces: Array3<f64>,

    /// Nodal spar loads, six per node.
    pub loads: Vec<f64>,

    /// Nodal spar displacements produced by the sweep.
    pub displacements: Vec<f64>,
}

/// A coupled aerostructural problem at a fixed sizing and flight condition.
///
/// The coupling vector concatenates the nodal displacements of every surface
/// in definition order.
pub struct CoupledAnalysis<'a, A, S: StructuralModel> {
    aero: &'a A,
    structures: &'a S,
    flight: FlightCondition,
    surfaces: Vec<PreparedSurface<'a, S::Stiffness>>,
    label: String,
}

impl<'a, A, S> CoupledAnalysis<'a, A, S>
where
    A: AeroModel,
    S: StructuralModel,
{
    /// Applies sizing to every surface and factorizes its structure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the sizing does not match
    /// the surfaces, or [`Error::SingularSystem`] if a stiffness matrix
    /// cannot be factorized.
    pub fn prepare(
        aero: &'a A,
        structures: &'a S,
        definitions: &'a [SurfaceDefinition],
        sizing: &[SurfaceSizing],
        flight: FlightCondition,
    ) -> Result<Self, Error> {
        if sizing.len() != definitions.len() {
            return Err(InvalidConfiguration::DesignLength {
                expected: definitions.len(),
                actual: sizing.len(),
            }
            .into());
        }

        let surfaces = definitions
            .iter()
            .zip(sizing)
            .map(|(definition, sizing)| prepare_surface(structures, definition, sizing))
            .collect::<Result<Vec<_>, _>>()?;

        let label = definitions
            .iter()
            .map(|d| d.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        Ok(Self {
            aero,
            structures,
            flight,
            surfaces,
            label,
        })
    }

    #[must_use]
    pub fn surfaces(&self) -> &[PreparedSurface<'a, S::Stiffness>] {
        &self.surfaces
    }

    #[must_use]
    pub fn flight(&self) -> &FlightCondition {
        &self.flight
    }

    #[must_use]
    pub fn structures(&self) -> &S {
        self.structures
    }

    /// Returns the surface names joined for error reporting.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the length of the coupling vector.
    #[must_use]
    pub fn num_coupling(&self) -> usize {
        self.surfaces.iter().map(|s| s.transfer.num_dofs()).sum()
    }

    /// Splits a coupling vector into per-surface displacement slices.
    fn split<'u>(&self, coupling: &'u [f64]) -> Vec<&'u [f64]> {
        let mut rest = coupling;
        self.surfaces
            .iter()
            .map(|s| {
                let (head, tail) = rest.split_at(s.transfer.num_dofs());
                rest = tail;
                head
            })
            .collect()
    }
}

fn prepare_surface<'a, S: StructuralModel>(
    structures: &S,
    definition: &'a SurfaceDefinition,
    sizing: &SurfaceSizing,
) -> Result<PreparedSurface<'a, S::Stiffness>, Error> {
    let name = &definition.name;
    check_control_points(name, &sizing.twist_cp, &sizing.thickness_cp)?;

    let twist = geometry::interpolate(&sizing.twist_cp, definition.num_nodes())?;
    let thickness = geometry::interpolate(&sizing.thickness_cp, definition.num_elements())?;
    let mesh = geometry::apply_twist(&definition.mesh, &twist);
    let radius = geometry::spar_radius(&mesh, definition.viscous.t_over_c);
    let nodes = geometry::spar_nodes(&mesh, definition.spar_origin);

    let material = &definition.material;
    let beam = Beam {
        nodes: nodes.clone(),
        radius: radius.clone(),
        thickness: thickness.clone(),
        youngs_modulus: material.youngs_modulus.get::<pascal>(),
        shear_modulus: material.shear_modulus.get::<pascal>(),
        density: material.density.get::<kilogram_per_cubic_meter>(),
    };
    let stiffness = structures
        .assemble(&beam)
        .map_err(|_| Error::singular(Discipline::Structural, name.as_str()))?;

    Ok(PreparedSurface {
        definition,
        sizing: Sizing {
            twist,
            thickness,
            radius,
        },
        beam,
        transfer: LoadTransfer::new(mesh, nodes),
        stiffness,
    })
}

impl<A, S> CoupledProblem for CoupledAnalysis<'_, A, S>
where
    A: AeroModel,
    S: StructuralModel,
{
    type State = Vec<SurfaceState>;
    type Error = Error;

    /// Starts from the undeformed meshes.
    fn initial_coupling(&self) -> Vec<f64> {
        vec![0.0; self.num_coupling()]
    }

    fn sweep(&self, coupling: &[f64]) -> Result<Sweep<Self::State>, Self::Error> {
        let expected = self.num_coupling();
        if coupling.len() != expected {
            return Err(InvalidConfiguration::CouplingLength {
                expected,
                actual: coupling.len(),
            }
            .into());
        }

        let displacements = self.split(coupling);
        let meshes: Vec<Mesh> = self
            .surfaces
            .iter()
            .zip(&displacements)
            .map(|(s, u)| s.transfer.deform(u))
            .collect();

        let aero_surfaces: Vec<AeroSurface<'_>> = self
            .surfaces
            .iter()
            .zip(&meshes)
            .map(|(s, mesh)| AeroSurface {
                mesh,
                symmetric: s.definition.symmetric,
            })
            .collect();
        let forces = self
            .aero
            .loads(&aero_surfaces, &self.flight)
            .map_err(|_| Error::singular(Discipline::Aerodynamic, self.label.as_str()))?;

        let mut next = Vec::with_capacity(expected);
        let mut state = Vec::with_capacity(self.surfaces.len());
        for ((surface, mesh), forces) in self.surfaces.iter().zip(meshes).zip(forces) {
            let loads = surface.transfer.structural_loads(&forces);
            let displacements = self
                .structures
                .displacements(&surface.stiffness, &loads)
                .map_err(|_| Error::singular(Discipline::Structural, surface.name()))?;
            trace!(surface = surface.name(), "structural solve");

            next.extend_from_slice(&displacements);
            state.push(SurfaceState {
                mesh,
                forces,
                loads,
                displacements,
            });
        }

        Ok(Sweep::new(next, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use uom::si::{angle::degree, f64::Angle};

    use crate::{SpatialBeam, VortexLattice};

    fn reference() -> (Vec<SurfaceDefinition>, Vec<SurfaceSizing>) {
        let wing = SurfaceDefinition::rectangular("wing").unwrap();
        let sizing = vec![SurfaceSizing {
            twist_cp: wing.twist_cp.clone(),
            thickness_cp: wing.thickness_cp.clone(),
        }];
        (vec![wing], sizing)
    }

    #[test]
    fn coupling_covers_every_spar_dof() {
        let (surfaces, sizing) = reference();
        let aero = VortexLattice::default();
        let analysis = CoupledAnalysis::prepare(
            &aero,
            &SpatialBeam,
            &surfaces,
            &sizing,
            FlightCondition::default(),
        )
        .unwrap();

        assert_eq!(analysis.num_coupling(), 18);
        assert_eq!(analysis.initial_coupling(), vec![0.0; 18]);
        assert_eq!(analysis.surfaces()[0].sizing.thickness.len(), 2);
    }

    #[test]
    fn untwisted_wing_at_zero_alpha_stays_put() {
        let (surfaces, _) = reference();
        let sizing = vec![SurfaceSizing {
            twist_cp: vec![0.0],
            thickness_cp: vec![0.075],
        }];
        let flight = FlightCondition::default().with_alpha(Angle::new::<degree>(0.0));
        let aero = VortexLattice::default();
        let analysis =
            CoupledAnalysis::prepare(&aero, &SpatialBeam, &surfaces, &sizing, flight).unwrap();

        let sweep = analysis.sweep(&analysis.initial_coupling()).unwrap();
        for u in &sweep.coupling {
            assert_abs_diff_eq!(*u, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn wrong_coupling_length_is_rejected() {
        let (surfaces, sizing) = reference();
        let aero = VortexLattice::default();
        let analysis = CoupledAnalysis::prepare(
            &aero,
            &SpatialBeam,
            &surfaces,
            &sizing,
            FlightCondition::default(),
        )
        .unwrap();

        let error = analysis.sweep(&[0.0; 3]).unwrap_err();
        assert!(matches!(
            error,
            Error::InvalidConfiguration(InvalidConfiguration::CouplingLength {
                expected: 18,
                actual: 3
            })
        ));
    }

    #[test]
    fn zero_thickness_is_singular() {
        let (surfaces, _) = reference();
        let sizing = vec![SurfaceSizing {
            twist_cp: vec![0.0],
            thickness_cp: vec![0.0],
        }];
        let aero = VortexLattice::default();
        let result = CoupledAnalysis::prepare(
            &aero,
            &SpatialBeam,
            &surfaces,
            &sizing,
            FlightCondition::default(),
        );

        match result {
            Err(Error::SingularSystem {
                discipline,
                surface,
            }) => {
                assert_eq!(discipline, Discipline::Structural);
                assert_eq!(surface, "wing");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("zero thickness should be singular"),
        }
    }
}
