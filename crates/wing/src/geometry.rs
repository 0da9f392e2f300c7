//! Planform meshes and the mapping from control points to mesh geometry.
//!
//! A [`Mesh`] is an `(nx, ny, 3)` grid of points. Index `i` runs chordwise
//! from the leading edge to the trailing edge and index `j` runs spanwise
//! from the left tip (`y = −b/2`) towards the right. A symmetric half mesh
//! stops at the root, `y = 0`.

use ndarray::{Array1, Array3, Axis};
use ninterp::{
    interpolator::Extrapolate,
    prelude::{Interp1DOwned, Interpolator},
    strategy::Linear,
};
use serde::{Deserialize, Serialize};

use crate::InvalidConfiguration;

/// A structured grid of 3D points, shaped `(nx, ny, 3)`.
pub type Mesh = Array3<f64>;

/// Parameters for a rectangular planform mesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Planform {
    /// Chordwise node count.
    pub num_x: usize,

    /// Spanwise node count across the full span. A symmetric mesh keeps the
    /// `(num_y + 1) / 2` nodes from the left tip to the root, so `num_y` must
    /// be odd.
    pub num_y: usize,

    /// Full span in metres, tip to tip.
    pub span: f64,

    /// Chord in metres.
    pub chord: f64,
}

impl Default for Planform {
    fn default() -> Self {
        Self {
            num_x: 2,
            num_y: 5,
            span: 10.0,
            chord: 1.0,
        }
    }
}

impl Planform {
    /// Generates a flat rectangular mesh.
    ///
    /// The full span is divided by `num_y` nodes. With `symmetric` set only
    /// the left half, from the tip to the root node at `y = 0`, is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the node counts are below two, `num_y` is even for
    /// a symmetric mesh, or the dimensions are not positive.
    pub fn mesh(&self, surface: &str, symmetric: bool) -> Result<Mesh, InvalidConfiguration> {
        if self.num_x < 2 || self.num_y < 2 {
            return Err(InvalidConfiguration::MeshTooSmall {
                surface: surface.to_owned(),
                nx: self.num_x,
                ny: self.num_y,
            });
        }
        if symmetric && self.num_y % 2 == 0 {
            return Err(InvalidConfiguration::EvenSymmetricMesh {
                surface: surface.to_owned(),
                ny: self.num_y,
            });
        }
        for (field, value) in [("span", self.span), ("chord", self.chord)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(InvalidConfiguration::NotPositive {
                    surface: surface.to_owned(),
                    field,
                });
            }
        }

        let half = 0.5 * self.span;
        let mut ys = Array1::linspace(-half, half, self.num_y);
        let ny = if symmetric { self.num_y.div_ceil(2) } else { self.num_y };
        if symmetric {
            ys[ny - 1] = 0.0;
        }
        let xs = Array1::linspace(0.0, self.chord, self.num_x);

        Ok(Array3::from_shape_fn((self.num_x, ny, 3), |(i, j, k)| {
            match k {
                0 => xs[i],
                1 => ys[j],
                _ => 0.0,
            }
        }))
    }
}

/// Checks that `mesh` is a usable `(nx ≥ 2, ny ≥ 2, 3)` grid.
pub(crate) fn check_mesh(mesh: &Mesh, surface: &str) -> Result<(), InvalidConfiguration> {
    let (nx, ny, dim) = mesh.dim();
    if dim != 3 {
        return Err(InvalidConfiguration::MeshShape {
            surface: surface.to_owned(),
        });
    }
    if nx < 2 || ny < 2 {
        return Err(InvalidConfiguration::MeshTooSmall {
            surface: surface.to_owned(),
            nx,
            ny,
        });
    }
    if mesh.iter().any(|v| !v.is_finite()) {
        return Err(InvalidConfiguration::MeshShape {
            surface: surface.to_owned(),
        });
    }
    Ok(())
}

/// Linearly interpolates control points onto `n` evenly spaced stations.
///
/// The first control point maps to the first station (the left tip) and the
/// last to the last station.
///
/// # Errors
///
/// Returns an error if there are no control points or the interpolator
/// rejects them.
pub fn interpolate(control_points: &[f64], n: usize) -> Result<Vec<f64>, InvalidConfiguration> {
    match control_points {
        [] => Err(InvalidConfiguration::EmptyControlPoints),
        [value] => Ok(vec![*value; n]),
        _ => {
            let grid = Array1::linspace(0.0, 1.0, control_points.len());
            let values = Array1::from(control_points.to_vec());
            let interp = Interp1DOwned::new(grid, values, Linear, Extrapolate::Clamp)?;

            let stations = if n == 1 {
                Array1::from(vec![0.5])
            } else {
                Array1::linspace(0.0, 1.0, n)
            };
            stations
                .iter()
                .map(|s| interp.interpolate(&[*s]).map_err(Into::into))
                .collect()
        }
    }
}

/// Rotates each spanwise column of `mesh` about its quarter-chord point.
///
/// Positive twist (degrees) raises the leading edge.
#[must_use]
pub fn apply_twist(mesh: &Mesh, twist_deg: &[f64]) -> Mesh {
    let mut twisted = mesh.clone();
    let nx = mesh.len_of(Axis(0));

    for (j, theta) in twist_deg.iter().enumerate() {
        let le = point(mesh, 0, j);
        let te = point(mesh, nx - 1, j);
        let qc = lerp(le, te, 0.25);
        let (sin, cos) = theta.to_radians().sin_cos();

        for i in 0..nx {
            let p = point(mesh, i, j);
            let dx = p[0] - qc[0];
            let dz = p[2] - qc[2];
            twisted[[i, j, 0]] = qc[0] + dx * cos + dz * sin;
            twisted[[i, j, 2]] = qc[2] - dx * sin + dz * cos;
        }
    }

    twisted
}

/// Returns the chord length at each spanwise station.
#[must_use]
pub fn chords(mesh: &Mesh) -> Vec<f64> {
    let (nx, ny, _) = mesh.dim();
    (0..ny)
        .map(|j| norm(sub(point(mesh, nx - 1, j), point(mesh, 0, j))))
        .collect()
}

/// Returns the spar node at each spanwise station, `spar_origin` of the way
/// from the leading to the trailing edge.
#[must_use]
pub fn spar_nodes(mesh: &Mesh, spar_origin: f64) -> Vec<[f64; 3]> {
    let (nx, ny, _) = mesh.dim();
    (0..ny)
        .map(|j| lerp(point(mesh, 0, j), point(mesh, nx - 1, j), spar_origin))
        .collect()
}

/// Returns the tube radius of each spar element from the airfoil thickness.
#[must_use]
pub fn spar_radius(mesh: &Mesh, t_over_c: f64) -> Vec<f64> {
    chords(mesh)
        .windows(2)
        .map(|c| 0.25 * t_over_c * (c[0] + c[1]))
        .collect()
}

pub(crate) fn point(mesh: &Mesh, i: usize, j: usize) -> [f64; 3] {
    [mesh[[i, j, 0]], mesh[[i, j, 1]], mesh[[i, j, 2]]]
}

pub(crate) fn lerp(a: [f64; 3], b: [f64; 3], t: f64) -> [f64; 3] {
    [
        a[0] + t * (b[0] - a[0]),
        a[1] + t * (b[1] - a[1]),
        a[2] + t * (b[2] - a[2]),
    ]
}

pub(crate) fn add(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub(crate) fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub(crate) fn scale(a: [f64; 3], s: f64) -> [f64; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

pub(crate) fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub(crate) fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub(crate) fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn symmetric_mesh_ends_at_root() {
        let mesh = Planform::default().mesh("wing", true).unwrap();
        assert_eq!(mesh.dim(), (2, 3, 3));
        assert_relative_eq!(mesh[[0, 0, 1]], -5.0);
        assert_eq!(mesh[[0, 2, 1]], 0.0);
        assert_relative_eq!(mesh[[1, 2, 0]], 1.0);
    }

    #[test]
    fn full_mesh_spans_tip_to_tip() {
        let mesh = Planform::default().mesh("wing", false).unwrap();
        assert_relative_eq!(mesh[[0, 0, 1]], -5.0);
        assert_relative_eq!(mesh[[0, 4, 1]], 5.0);
    }

    #[test]
    fn symmetric_mesh_keeps_half_of_the_span_nodes() {
        let planform = Planform {
            num_y: 7,
            ..Planform::default()
        };
        let full = planform.mesh("wing", false).unwrap();
        let half = planform.mesh("wing", true).unwrap();

        assert_eq!(full.dim(), (2, 7, 3));
        assert_eq!(half.dim(), (2, 4, 3));
        assert_relative_eq!(half[[0, 0, 1]], -5.0);
        assert_eq!(half[[0, 3, 1]], 0.0);
        for j in 0..3 {
            assert_relative_eq!(half[[1, j, 1]], full[[1, j, 1]]);
        }

        let reference = Planform::default().mesh("wing", true).unwrap();
        assert_eq!(reference.dim(), (2, 3, 3));
    }

    #[test]
    fn rejects_even_symmetric_node_count() {
        let planform = Planform {
            num_y: 6,
            ..Planform::default()
        };
        assert!(matches!(
            planform.mesh("wing", true),
            Err(InvalidConfiguration::EvenSymmetricMesh { ny: 6, .. })
        ));
        assert_eq!(planform.mesh("wing", false).unwrap().dim(), (2, 6, 3));
    }

    #[test]
    fn rejects_single_chordwise_node() {
        let planform = Planform {
            num_x: 1,
            ..Planform::default()
        };
        assert!(matches!(
            planform.mesh("wing", true),
            Err(InvalidConfiguration::MeshTooSmall { nx: 1, ny: 5, .. })
        ));
    }

    #[test]
    fn control_points_run_tip_to_root() {
        let values = interpolate(&[-10.0, 15.0], 5).unwrap();
        assert_eq!(values.len(), 5);
        assert_relative_eq!(values[0], -10.0);
        assert_relative_eq!(values[2], 2.5);
        assert_relative_eq!(values[4], 15.0);

        assert_eq!(interpolate(&[0.075], 4).unwrap(), vec![0.075; 4]);
        assert!(interpolate(&[], 4).is_err());
    }

    #[test]
    fn twist_keeps_chord_and_quarter_chord() {
        let mesh = Planform::default().mesh("wing", true).unwrap();
        let twisted = apply_twist(&mesh, &[10.0, 0.0, -10.0]);

        for (c0, c1) in chords(&mesh).iter().zip(chords(&twisted)) {
            assert_relative_eq!(*c0, c1, max_relative = 1e-12);
        }

        let qc = lerp(point(&twisted, 0, 0), point(&twisted, 1, 0), 0.25);
        assert_abs_diff_eq!(qc[0], 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(qc[2], 0.0, epsilon = 1e-12);

        // Nose up at the tip, nose down at the root.
        assert!(twisted[[0, 0, 2]] > 0.0);
        assert!(twisted[[0, 2, 2]] < 0.0);
    }

    #[test]
    fn spar_sits_at_origin_fraction() {
        let mesh = Planform::default().mesh("wing", true).unwrap();
        let nodes = spar_nodes(&mesh, 0.35);
        assert_eq!(nodes.len(), 3);
        assert_relative_eq!(nodes[1][0], 0.35);
        assert_relative_eq!(nodes[1][1], -2.5);

        let radius = spar_radius(&mesh, 0.15);
        assert_eq!(radius.len(), 2);
        assert_relative_eq!(radius[0], 0.075);
    }
}
