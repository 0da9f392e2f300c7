//! Structural response of the wing spar.
//!
//! [`StructuralModel`] is the seam between the coupled analysis and the
//! structural kernel. [`SpatialBeam`] implements it with 6-DOF Euler–Bernoulli
//! frame elements of thin-walled circular tube section, clamped at the node
//! closest to the symmetry plane.
//!
//! Nodal vectors (loads and displacements) hold six entries per node:
//! `[Fx, Fy, Fz, Mx, My, Mz]` or `[ux, uy, uz, θx, θy, θz]` in global axes.

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector, SMatrix, SVector};
use spar_solvers::linalg::Factorization;

use crate::{
    Singular,
    geometry::{cross, dot, norm, scale, sub},
};

/// Degrees of freedom per node.
pub const DOF: usize = 6;

type Element = SMatrix<f64, 12, 12>;

/// A sized spar: nodes, tube sections, and material in SI units.
#[derive(Debug, Clone, PartialEq)]
pub struct Beam {
    pub nodes: Vec<[f64; 3]>,

    /// Outer radius of each element.
    pub radius: Vec<f64>,

    /// Wall thickness of each element.
    pub thickness: Vec<f64>,

    pub youngs_modulus: f64,
    pub shear_modulus: f64,
    pub density: f64,
}

/// Tube section properties of one element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Section {
    pub area: f64,
    pub inertia: f64,
    pub polar: f64,
}

impl Beam {
    /// Returns the section properties of each element.
    #[must_use]
    pub fn sections(&self) -> Vec<Section> {
        self.radius
            .iter()
            .zip(&self.thickness)
            .map(|(&r, &t)| {
                let inner = (r - t).max(0.0);
                let area = PI * (r * r - inner * inner);
                let inertia = 0.25 * PI * (r.powi(4) - inner.powi(4));
                Section {
                    area,
                    inertia,
                    polar: 2.0 * inertia,
                }
            })
            .collect()
    }

    /// Returns the length of each element.
    #[must_use]
    pub fn lengths(&self) -> Vec<f64> {
        self.nodes.windows(2).map(|n| norm(sub(n[1], n[0]))).collect()
    }

    /// Returns the mass of each element in kilograms.
    #[must_use]
    pub fn element_masses(&self) -> Vec<f64> {
        self.sections()
            .iter()
            .zip(self.lengths())
            .map(|(s, l)| self.density * s.area * l)
            .collect()
    }

    /// Returns the index of the clamped node, the one closest to `y = 0`.
    #[must_use]
    pub fn root(&self) -> usize {
        self.nodes
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a[1].abs().total_cmp(&b[1].abs()))
            .map_or(0, |(i, _)| i)
    }
}

/// Computes spar displacements and stresses.
pub trait StructuralModel {
    /// Factorized stiffness reused across coupling iterations.
    type Stiffness: Send + Sync;

    /// Assembles and factorizes the stiffness of `beam`.
    ///
    /// # Errors
    ///
    /// Returns [`Singular`] if the stiffness cannot be factorized.
    fn assemble(&self, beam: &Beam) -> Result<Self::Stiffness, Singular>;

    /// Solves for nodal displacements under nodal `loads`.
    ///
    /// # Errors
    ///
    /// Returns [`Singular`] if the solution is not finite.
    fn displacements(
        &self,
        stiffness: &Self::Stiffness,
        loads: &[f64],
    ) -> Result<Vec<f64>, Singular>;

    /// Returns two von Mises stress measures per element, in pascals.
    fn von_mises(&self, beam: &Beam, displacements: &[f64]) -> Vec<[f64; 2]>;
}

/// Tube-spar frame elements with a clamped root.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpatialBeam;

/// Factorized spatial-beam stiffness.
#[derive(Debug, Clone)]
pub struct Stiffness {
    factorization: Factorization,
    root: usize,
}

impl StructuralModel for SpatialBeam {
    type Stiffness = Stiffness;

    fn assemble(&self, beam: &Beam) -> Result<Stiffness, Singular> {
        let n = DOF * beam.nodes.len();
        let mut k = DMatrix::<f64>::zeros(n, n);

        for (e, (section, length)) in beam.sections().iter().zip(beam.lengths()).enumerate() {
            if length == 0.0 {
                return Err(Singular);
            }
            let rotation = transformation(beam.nodes[e], beam.nodes[e + 1], length);
            let global = rotation.transpose() * local_stiffness(beam, section, length) * rotation;
            let offset = DOF * e;
            for r in 0..12 {
                for c in 0..12 {
                    k[(offset + r, offset + c)] += global[(r, c)];
                }
            }
        }

        let root = beam.root();
        let scale = k.diagonal().iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let scale = if scale > 0.0 { scale } else { 1.0 };
        for d in DOF * root..DOF * (root + 1) {
            k.row_mut(d).fill(0.0);
            k.column_mut(d).fill(0.0);
            k[(d, d)] = scale;
        }

        Ok(Stiffness {
            factorization: Factorization::new(k)?,
            root,
        })
    }

    fn displacements(&self, stiffness: &Stiffness, loads: &[f64]) -> Result<Vec<f64>, Singular> {
        let mut f = DVector::from_column_slice(loads);
        for d in DOF * stiffness.root..DOF * (stiffness.root + 1) {
            f[d] = 0.0;
        }
        let u = stiffness.factorization.solve(&f)?;
        Ok(u.iter().copied().collect())
    }

    fn von_mises(&self, beam: &Beam, displacements: &[f64]) -> Vec<[f64; 2]> {
        let e_mod = beam.youngs_modulus;
        let g_mod = beam.shear_modulus;

        beam.lengths()
            .iter()
            .enumerate()
            .map(|(e, &length)| {
                let rotation = transformation(beam.nodes[e], beam.nodes[e + 1], length);
                let global =
                    SVector::<f64, 12>::from_column_slice(&displacements[DOF * e..DOF * (e + 2)]);
                let u = rotation * global;
                let r = beam.radius[e];

                let axial = e_mod * (u[6] - u[0]) / length;
                let bending =
                    e_mod * r / length * ((u[11] - u[5]).powi(2) + (u[10] - u[4]).powi(2)).sqrt();
                let torsion = g_mod * r * (u[9] - u[3]) / length;

                let vm = |sxx: f64| (sxx * sxx + 3.0 * torsion * torsion).sqrt();
                [vm(axial + bending), vm(-axial + bending)]
            })
            .collect()
    }
}

/// Local element stiffness with dofs `[u v w θx θy θz]` at both ends.
fn local_stiffness(beam: &Beam, section: &Section, length: f64) -> Element {
    let e = beam.youngs_modulus;
    let l = length;
    let mut k = Element::zeros();

    let axial = e * section.area / l;
    let torsion = beam.shear_modulus * section.polar / l;
    k[(0, 0)] = axial;
    k[(6, 6)] = axial;
    k[(0, 6)] = -axial;
    k[(3, 3)] = torsion;
    k[(9, 9)] = torsion;
    k[(3, 9)] = -torsion;

    let ei = e * section.inertia;
    let a = 12.0 * ei / l.powi(3);
    let b = 6.0 * ei / l.powi(2);
    let c = 4.0 * ei / l;
    let d = 2.0 * ei / l;

    // Bending in the local x–y plane: v and θz.
    k[(1, 1)] = a;
    k[(1, 5)] = b;
    k[(1, 7)] = -a;
    k[(1, 11)] = b;
    k[(5, 5)] = c;
    k[(5, 7)] = -b;
    k[(5, 11)] = d;
    k[(7, 7)] = a;
    k[(7, 11)] = -b;
    k[(11, 11)] = c;

    // Bending in the local x–z plane: w and θy.
    k[(2, 2)] = a;
    k[(2, 4)] = -b;
    k[(2, 8)] = -a;
    k[(2, 10)] = -b;
    k[(4, 4)] = c;
    k[(4, 8)] = b;
    k[(4, 10)] = d;
    k[(8, 8)] = a;
    k[(8, 10)] = b;
    k[(10, 10)] = c;

    for r in 0..12 {
        for col in 0..r {
            k[(r, col)] = k[(col, r)];
        }
    }
    k
}

/// Global-to-local transformation of one element's twelve dofs.
fn transformation(n0: [f64; 3], n1: [f64; 3], length: f64) -> Element {
    let x = scale(sub(n1, n0), 1.0 / length);
    let reference = if dot(x, [0.0, 0.0, 1.0]).abs() < 0.99 {
        [0.0, 0.0, 1.0]
    } else {
        [1.0, 0.0, 0.0]
    };
    let y = cross(reference, x);
    let y = scale(y, 1.0 / norm(y));
    let z = cross(x, y);

    let mut t = Element::zeros();
    for block in 0..4 {
        let o = 3 * block;
        for (row, axis) in [x, y, z].iter().enumerate() {
            for col in 0..3 {
                t[(o + row, o + col)] = axis[col];
            }
        }
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn cantilever(thickness: f64) -> Beam {
        Beam {
            nodes: (0..5).map(|j| [0.35, -5.0 + 1.25 * j as f64, 0.0]).collect(),
            radius: vec![0.075; 4],
            thickness: vec![thickness; 4],
            youngs_modulus: 70e9,
            shear_modulus: 30e9,
            density: 3e3,
        }
    }

    #[test]
    fn tip_load_matches_beam_theory() {
        let beam = cantilever(0.01);
        let stiffness = SpatialBeam.assemble(&beam).unwrap();

        let p = 1000.0;
        let mut loads = vec![0.0; DOF * 5];
        loads[2] = p;

        let u = SpatialBeam.displacements(&stiffness, &loads).unwrap();
        let inertia = beam.sections()[0].inertia;
        let expected = p * 5.0_f64.powi(3) / (3.0 * 70e9 * inertia);

        assert_eq!(beam.root(), 4);
        assert_relative_eq!(u[2], expected, max_relative = 1e-7);
        assert!(u[DOF * 4..].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn tip_torque_twists_linearly() {
        let beam = cantilever(0.01);
        let stiffness = SpatialBeam.assemble(&beam).unwrap();

        let torque = 500.0;
        let mut loads = vec![0.0; DOF * 5];
        loads[4] = torque;

        let u = SpatialBeam.displacements(&stiffness, &loads).unwrap();
        let polar = beam.sections()[0].polar;
        assert_relative_eq!(u[4], torque * 5.0 / (30e9 * polar), max_relative = 1e-7);
    }

    #[test]
    fn unloaded_beam_is_unstressed() {
        let beam = cantilever(0.02);
        let stress = SpatialBeam.von_mises(&beam, &vec![0.0; DOF * 5]);
        assert_eq!(stress.len(), 4);
        assert!(stress.iter().flatten().all(|s| *s == 0.0));
    }

    #[test]
    fn root_bending_stress_matches_section_modulus() {
        let beam = cantilever(0.01);
        let stiffness = SpatialBeam.assemble(&beam).unwrap();

        let p = 1000.0;
        let mut loads = vec![0.0; DOF * 5];
        loads[2] = p;
        let u = SpatialBeam.displacements(&stiffness, &loads).unwrap();
        let stress = SpatialBeam.von_mises(&beam, &u);

        // Curvature is linear in the element, so the end-rotation difference
        // gives the mean moment over the root element.
        let inertia = beam.sections()[0].inertia;
        let mean_moment = p * (5.0 - 0.5 * 1.25);
        let expected = mean_moment * 0.075 / inertia;
        assert_relative_eq!(stress[3][0], expected, max_relative = 1e-7);
    }

    #[test]
    fn zero_thickness_is_singular() {
        assert_eq!(SpatialBeam.assemble(&cantilever(0.0)).unwrap_err(), Singular);
    }

    #[test]
    fn solid_tube_mass() {
        let beam = cantilever(0.075);
        let mass: f64 = beam.element_masses().iter().sum();
        assert_relative_eq!(mass, 3e3 * PI * 0.075 * 0.075 * 5.0, max_relative = 1e-12);
    }
}
