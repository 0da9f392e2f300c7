//! Per-surface structural and aerodynamic performance of a coupled state.

use serde::Serialize;
use uom::si::pressure::pascal;

use crate::{
    FlightCondition, GRAVITY, StructuralModel,
    aero::{self, skin_friction_drag},
    coupled::{PreparedSurface, SurfaceState},
};

/// Aggregation weight of the Kreisselmeier–Steinhauser failure measure.
pub const KS_RHO: f64 = 100.0;

/// Performance of one surface at a coupled state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfacePerformance {
    pub name: String,

    /// Aggregated stress constraint: negative while every element is below
    /// yield.
    pub failure: f64,

    /// Wall thickness minus outer radius per element; must stay negative.
    pub thickness_intersects: Vec<f64>,

    /// Two von Mises stress measures per element, in pascals.
    pub von_mises: Vec<[f64; 2]>,

    /// Spar weight of the whole surface, in newtons.
    pub structural_weight: f64,

    /// Mass-weighted spar centroid, in metres.
    pub cg: [f64; 3],

    /// Reference area of the whole surface, in square metres.
    pub s_ref: f64,

    pub cl: f64,
    pub cdi: f64,
    pub cdv: f64,
    pub cd: f64,
}

/// Evaluates stresses, weight and coefficients of one surface.
///
/// `state` must come from a sweep of the analysis that prepared `surface`.
#[must_use]
pub fn evaluate<S: StructuralModel>(
    surface: &PreparedSurface<'_, S::Stiffness>,
    state: &SurfaceState,
    structures: &S,
    flight: &FlightCondition,
) -> SurfacePerformance {
    let definition = surface.definition;
    let beam = &surface.beam;
    let mirror = if definition.symmetric { 2.0 } else { 1.0 };

    let von_mises = structures.von_mises(beam, &state.displacements);
    let yield_stress = definition.material.yield_stress.get::<pascal>();
    let utilization: Vec<f64> = von_mises
        .iter()
        .flatten()
        .map(|vm| vm / yield_stress - 1.0)
        .collect();
    let failure = if definition.exact_failure_constraint {
        utilization.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    } else {
        ks(&utilization, KS_RHO)
    };

    let thickness_intersects = surface
        .sizing
        .thickness
        .iter()
        .zip(&surface.sizing.radius)
        .map(|(t, r)| t - r)
        .collect();

    let masses = beam.element_masses();
    let mass: f64 = masses.iter().sum();
    let structural_weight = mirror * mass * GRAVITY * definition.wing_weight_ratio;
    let mut cg = [0.0; 3];
    if mass > 0.0 {
        for (e, m) in masses.iter().enumerate() {
            let (a, b) = (beam.nodes[e], beam.nodes[e + 1]);
            for d in 0..3 {
                cg[d] += m * 0.5 * (a[d] + b[d]) / mass;
            }
        }
    }
    if definition.symmetric {
        cg[1] = 0.0;
    }

    let s_ref = aero::reference_area(&state.mesh, definition.reference_area, definition.symmetric);
    let q = flight.dynamic_pressure().get::<pascal>();
    let (lift_axis, drag_axis) = flight.wind_axes();
    let (mut lift, mut drag) = (0.0, 0.0);
    for f in state.forces.lanes(ndarray::Axis(2)) {
        lift += f[0] * lift_axis[0] + f[1] * lift_axis[1] + f[2] * lift_axis[2];
        drag += f[0] * drag_axis[0] + f[1] * drag_axis[1] + f[2] * drag_axis[2];
    }

    let cl = mirror * lift / (q * s_ref) + definition.cl0;
    let cdi = mirror * drag / (q * s_ref);
    let cdv = if definition.with_viscous {
        skin_friction_drag(&state.mesh, &definition.viscous, flight, s_ref / mirror)
    } else {
        0.0
    };

    SurfacePerformance {
        name: definition.name.clone(),
        failure,
        thickness_intersects,
        von_mises,
        structural_weight,
        cg,
        s_ref,
        cl,
        cdi,
        cdv,
        cd: cdi + cdv + definition.cd0,
    }
}

/// Smooth upper bound on `max(values)`:
/// `max + ln(Σ exp(ρ (v − max))) / ρ`.
#[must_use]
pub fn ks(values: &[f64], rho: f64) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = values.iter().map(|v| (rho * (v - max)).exp()).sum();
    max + sum.ln() / rho
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn ks_bounds_the_maximum() {
        let values = [-0.5, -0.2, -0.9];
        let aggregate = ks(&values, KS_RHO);
        assert!(aggregate >= -0.2);
        assert!(aggregate <= -0.2 + 3.0_f64.ln() / KS_RHO + 1e-15);
    }

    #[test]
    fn ks_of_single_value_is_exact() {
        assert_relative_eq!(ks(&[-0.3], KS_RHO), -0.3, epsilon = 1e-15);
    }

    #[test]
    fn ks_of_nothing_is_negative_infinity() {
        assert_eq!(ks(&[], KS_RHO), f64::NEG_INFINITY);
    }
}
