//! Aerodynamic loads on lifting-surface meshes.
//!
//! [`AeroModel`] is the seam between the coupled analysis and the
//! aerodynamic kernel. [`VortexLattice`] implements it with one horseshoe
//! vortex per panel: the bound leg lies on the panel quarter chord, the
//! trailing legs run to infinity along `+x`, and flow tangency is enforced at
//! the three-quarter-chord collocation points. Symmetric half meshes are
//! mirrored across `y = 0` with image vortices.
//!
//! Panel forces follow from Kutta–Joukowski, `F = ρ Γ (V × l)`, evaluated at
//! the bound-leg midpoints with the full induced velocity, so the
//! streamwise component is the induced drag.

mod viscous;

pub use viscous::skin_friction_drag;

use nalgebra::{DMatrix, DVector};
use ndarray::Array3;
use spar_solvers::linalg;
use uom::si::mass_density::kilogram_per_cubic_meter;

use crate::{
    FlightCondition, Singular,
    geometry::{Mesh, cross, dot, lerp, norm, point, scale, sub},
    surface::ReferenceArea,
};

/// A mesh presented to the aerodynamic model.
#[derive(Debug, Clone, Copy)]
pub struct AeroSurface<'a> {
    pub mesh: &'a Mesh,
    pub symmetric: bool,
}

/// Computes panel forces for a set of surfaces sharing a flight condition.
pub trait AeroModel {
    /// Returns the force on every panel of every surface, each shaped
    /// `(nx − 1, ny − 1, 3)`, in newtons.
    ///
    /// Forces on a symmetric surface cover the modelled half only. Each force
    /// acts at the midpoint of the panel's quarter-chord line.
    ///
    /// # Errors
    ///
    /// Returns [`Singular`] if the influence system cannot be solved.
    fn loads(
        &self,
        surfaces: &[AeroSurface<'_>],
        flight: &FlightCondition,
    ) -> Result<Vec<Array3<f64>>, Singular>;
}

/// Horseshoe vortex-lattice method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VortexLattice {
    /// Relative distance from a vortex line below which its induced velocity
    /// is taken as zero.
    pub core: f64,
}

impl Default for VortexLattice {
    fn default() -> Self {
        Self { core: 1e-10 }
    }
}

/// One horseshoe vortex: bound leg from `a` to `b`.
#[derive(Debug, Clone, Copy)]
struct Horseshoe {
    a: [f64; 3],
    b: [f64; 3],
    symmetric: bool,
}

impl AeroModel for VortexLattice {
    fn loads(
        &self,
        surfaces: &[AeroSurface<'_>],
        flight: &FlightCondition,
    ) -> Result<Vec<Array3<f64>>, Singular> {
        let mut vortices = Vec::new();
        let mut collocation = Vec::new();
        let mut normals = Vec::new();
        for surface in surfaces {
            let (nx, ny, _) = surface.mesh.dim();
            for i in 0..nx - 1 {
                for j in 0..ny - 1 {
                    let (a, b) = bound_leg(surface.mesh, i, j);
                    vortices.push(Horseshoe {
                        a,
                        b,
                        symmetric: surface.symmetric,
                    });
                    collocation.push(collocation_point(surface.mesh, i, j));
                    normals.push(unit(panel_normal(surface.mesh, i, j)));
                }
            }
        }

        let n = vortices.len();
        let v_inf = flight.freestream();
        let aic = DMatrix::from_fn(n, n, |m, k| {
            dot(self.induced(&vortices[k], collocation[m]), normals[m])
        });
        let rhs = DVector::from_fn(n, |m, _| -dot(v_inf, normals[m]));
        let gamma = linalg::solve(aic, &rhs)?;

        let rho = flight.density.get::<kilogram_per_cubic_meter>();
        let mut k = 0;
        let mut forces = Vec::with_capacity(surfaces.len());
        for surface in surfaces {
            let (nx, ny, _) = surface.mesh.dim();
            let mut panel_forces = Array3::zeros((nx - 1, ny - 1, 3));
            for i in 0..nx - 1 {
                for j in 0..ny - 1 {
                    let vortex = vortices[k];
                    let mid = lerp(vortex.a, vortex.b, 0.5);
                    let velocity = vortices
                        .iter()
                        .zip(gamma.iter())
                        .fold(v_inf, |v, (other, g)| {
                            let w = self.induced(other, mid);
                            [v[0] + g * w[0], v[1] + g * w[1], v[2] + g * w[2]]
                        });
                    let f = scale(cross(velocity, sub(vortex.b, vortex.a)), rho * gamma[k]);
                    for d in 0..3 {
                        panel_forces[[i, j, d]] = f[d];
                    }
                    k += 1;
                }
            }
            forces.push(panel_forces);
        }

        Ok(forces)
    }
}

impl VortexLattice {
    /// Velocity induced at `p` by a unit-strength horseshoe and its image.
    fn induced(&self, vortex: &Horseshoe, p: [f64; 3]) -> [f64; 3] {
        let mut v = self.horseshoe(vortex.a, vortex.b, p);
        if vortex.symmetric {
            let mirror = |q: [f64; 3]| [q[0], -q[1], q[2]];
            let image = self.horseshoe(mirror(vortex.b), mirror(vortex.a), p);
            v = [v[0] + image[0], v[1] + image[1], v[2] + image[2]];
        }
        v
    }

    /// Trailing leg in from infinity to `a`, bound leg `a → b`, trailing leg
    /// out from `b` to infinity.
    fn horseshoe(&self, a: [f64; 3], b: [f64; 3], p: [f64; 3]) -> [f64; 3] {
        let bound = self.segment(a, b, p);
        let out = self.semi_infinite(b, p);
        let into = self.semi_infinite(a, p);
        [
            bound[0] + out[0] - into[0],
            bound[1] + out[1] - into[1],
            bound[2] + out[2] - into[2],
        ]
    }

    /// Biot–Savart velocity at `p` from a unit filament `a → b`.
    fn segment(&self, a: [f64; 3], b: [f64; 3], p: [f64; 3]) -> [f64; 3] {
        let r0 = sub(b, a);
        let r1 = sub(p, a);
        let r2 = sub(p, b);
        let c = cross(r1, r2);
        let c_norm = norm(c);
        let (n1, n2) = (norm(r1), norm(r2));
        if c_norm <= self.core * dot(r0, r0) || n1 == 0.0 || n2 == 0.0 {
            return [0.0; 3];
        }
        let k = (dot(r0, scale(r1, 1.0 / n1)) - dot(r0, scale(r2, 1.0 / n2)))
            / (4.0 * std::f64::consts::PI * c_norm * c_norm);
        scale(c, k)
    }

    /// Velocity at `p` from a unit filament leaving `a` along `+x`.
    fn semi_infinite(&self, a: [f64; 3], p: [f64; 3]) -> [f64; 3] {
        const DIRECTION: [f64; 3] = [1.0, 0.0, 0.0];
        let r = sub(p, a);
        let r_norm = norm(r);
        let c = cross(DIRECTION, r);
        let c_norm = norm(c);
        if c_norm <= self.core * r_norm {
            return [0.0; 3];
        }
        let k = (1.0 + dot(DIRECTION, r) / r_norm)
            / (4.0 * std::f64::consts::PI * c_norm * c_norm);
        scale(c, k)
    }
}

/// Returns the quarter-chord bound leg of panel `(i, j)`.
pub(crate) fn bound_leg(mesh: &Mesh, i: usize, j: usize) -> ([f64; 3], [f64; 3]) {
    let a = lerp(point(mesh, i, j), point(mesh, i + 1, j), 0.25);
    let b = lerp(point(mesh, i, j + 1), point(mesh, i + 1, j + 1), 0.25);
    (a, b)
}

/// Returns the point where each panel force acts, `(nx − 1, ny − 1, 3)`.
#[must_use]
pub fn load_points(mesh: &Mesh) -> Array3<f64> {
    let (nx, ny, _) = mesh.dim();
    let mut points = Array3::zeros((nx - 1, ny - 1, 3));
    for i in 0..nx - 1 {
        for j in 0..ny - 1 {
            let (a, b) = bound_leg(mesh, i, j);
            let mid = lerp(a, b, 0.5);
            for d in 0..3 {
                points[[i, j, d]] = mid[d];
            }
        }
    }
    points
}

fn collocation_point(mesh: &Mesh, i: usize, j: usize) -> [f64; 3] {
    let left = lerp(point(mesh, i, j), point(mesh, i + 1, j), 0.75);
    let right = lerp(point(mesh, i, j + 1), point(mesh, i + 1, j + 1), 0.75);
    lerp(left, right, 0.5)
}

/// Panel normal scaled by twice the panel area.
fn panel_normal(mesh: &Mesh, i: usize, j: usize) -> [f64; 3] {
    let d1 = sub(point(mesh, i + 1, j + 1), point(mesh, i, j));
    let d2 = sub(point(mesh, i, j + 1), point(mesh, i + 1, j));
    cross(d1, d2)
}

fn unit(v: [f64; 3]) -> [f64; 3] {
    let n = norm(v);
    if n > 0.0 { scale(v, 1.0 / n) } else { v }
}

/// Returns the reference area of a mesh, doubled for a symmetric half.
#[must_use]
pub fn reference_area(mesh: &Mesh, kind: ReferenceArea, symmetric: bool) -> f64 {
    let (nx, ny, _) = mesh.dim();
    let mut area = 0.0;
    for i in 0..nx - 1 {
        for j in 0..ny - 1 {
            let n = panel_normal(mesh, i, j);
            area += match kind {
                ReferenceArea::Wetted => 0.5 * norm(n),
                ReferenceArea::Projected => 0.5 * n[2].abs(),
            };
        }
    }
    if symmetric { 2.0 * area } else { area }
}
