//! Geometric coupling between the aerodynamic mesh and the spar.
//!
//! Every mesh point in spanwise column `j` is rigidly linked to spar node
//! `j`. A panel force acting at its load point is split equally between the
//! two spar nodes bounding its strip, together with the moment of each half
//! about that node. Both directions use the same fixed links, built once from
//! the undeformed mesh, so the transfer is work-conserving: for any panel
//! forces `f` and nodal displacements `u`,
//!
//! ```text
//! structural_loads(f) · u == Σ f · load_point_displacements(u)
//! ```

use ndarray::Array3;

use crate::{
    aero,
    geometry::{Mesh, add, cross, point, scale, sub},
    structures::DOF,
};

/// The fixed linear map between panel forces and spar loads, and between
/// spar displacements and mesh motion.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadTransfer {
    baseline: Mesh,
    nodes: Vec<[f64; 3]>,
    load_points: Array3<f64>,
}

impl LoadTransfer {
    /// Builds the transfer from an undeformed mesh and its spar nodes.
    ///
    /// `nodes` must hold one node per spanwise mesh station.
    #[must_use]
    pub fn new(baseline: Mesh, nodes: Vec<[f64; 3]>) -> Self {
        debug_assert_eq!(baseline.dim().1, nodes.len());
        let load_points = aero::load_points(&baseline);
        Self {
            baseline,
            nodes,
            load_points,
        }
    }

    #[must_use]
    pub fn baseline(&self) -> &Mesh {
        &self.baseline
    }

    #[must_use]
    pub fn nodes(&self) -> &[[f64; 3]] {
        &self.nodes
    }

    /// Returns the length of a nodal load or displacement vector.
    #[must_use]
    pub fn num_dofs(&self) -> usize {
        DOF * self.nodes.len()
    }

    /// Moves the baseline mesh with the spar: `P' = P + t + θ × (P − n)`.
    #[must_use]
    pub fn deform(&self, displacements: &[f64]) -> Mesh {
        let (nx, ny, _) = self.baseline.dim();
        let mut mesh = self.baseline.clone();
        for j in 0..ny {
            for i in 0..nx {
                let p = point(&self.baseline, i, j);
                let moved = add(p, self.link(j, p, displacements));
                for d in 0..3 {
                    mesh[[i, j, d]] = moved[d];
                }
            }
        }
        mesh
    }

    /// Converts panel forces, `(nx − 1, ny − 1, 3)`, into nodal spar loads.
    #[must_use]
    pub fn structural_loads(&self, forces: &Array3<f64>) -> Vec<f64> {
        let (rows, strips, _) = forces.dim();
        let mut loads = vec![0.0; self.num_dofs()];
        for i in 0..rows {
            for j in 0..strips {
                let half = scale(panel(forces, i, j), 0.5);
                let p = panel(&self.load_points, i, j);
                for node in [j, j + 1] {
                    let moment = cross(sub(p, self.nodes[node]), half);
                    let o = DOF * node;
                    for d in 0..3 {
                        loads[o + d] += half[d];
                        loads[o + 3 + d] += moment[d];
                    }
                }
            }
        }
        loads
    }

    /// Returns how far each load point moves under nodal `displacements`.
    ///
    /// This is the transpose of [`structural_loads`](Self::structural_loads).
    #[must_use]
    pub fn load_point_displacements(&self, displacements: &[f64]) -> Array3<f64> {
        let (rows, strips, _) = self.load_points.dim();
        let mut moved = Array3::zeros((rows, strips, 3));
        for i in 0..rows {
            for j in 0..strips {
                let p = panel(&self.load_points, i, j);
                let delta = scale(
                    add(self.link(j, p, displacements), self.link(j + 1, p, displacements)),
                    0.5,
                );
                for d in 0..3 {
                    moved[[i, j, d]] = delta[d];
                }
            }
        }
        moved
    }

    /// Displacement of point `p` rigidly linked to node `j`.
    fn link(&self, j: usize, p: [f64; 3], displacements: &[f64]) -> [f64; 3] {
        let o = DOF * j;
        let t = [displacements[o], displacements[o + 1], displacements[o + 2]];
        let theta = [displacements[o + 3], displacements[o + 4], displacements[o + 5]];
        add(t, cross(theta, sub(p, self.nodes[j])))
    }
}

fn panel(values: &Array3<f64>, i: usize, j: usize) -> [f64; 3] {
    [values[[i, j, 0]], values[[i, j, 1]], values[[i, j, 2]]]
}
