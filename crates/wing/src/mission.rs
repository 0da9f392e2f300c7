//! Whole-aircraft totals: Breguet fuel burn and lift-equals-weight.

use serde::Serialize;
use thiserror::Error;
use uom::si::{
    f64::Mass,
    frequency::hertz,
    length::meter,
    mass::kilogram,
    pressure::pascal,
    velocity::meter_per_second,
};

use crate::{FlightCondition, GRAVITY, performance::SurfacePerformance};

/// Mission-level results combining every surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mission {
    /// Fuel burned over the range, in kilograms.
    pub fuel_burn: f64,

    /// Normalized lift-equals-weight residual `(L − nW) / (nW)`.
    pub l_equals_w: f64,

    /// Area-weighted lift coefficient.
    pub cl: f64,

    /// Area-weighted drag coefficient.
    pub cd: f64,

    /// Total lift, in newtons.
    pub lift: f64,

    /// Total takeoff weight including fuel, in newtons.
    pub weight: f64,

    /// Total structural weight, in newtons.
    pub structural_weight: f64,

    /// Centre of gravity of the empty aircraft plus structure, in metres.
    pub cg: [f64; 3],
}

impl Mission {
    #[must_use]
    pub fn fuel_mass(&self) -> Mass {
        Mass::new::<kilogram>(self.fuel_burn)
    }
}

/// A coupled state the Breguet mission cannot be flown from.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum MissionError {
    /// Breguet range needs a positive lift-to-drag ratio.
    #[error("total lift coefficient {cl} is not positive")]
    NoLift { cl: f64 },

    #[error("{quantity} is not finite")]
    NonFinite { quantity: &'static str },
}

/// Combines per-surface performance into mission totals.
///
/// # Errors
///
/// Returns [`MissionError::NoLift`] if the area-weighted lift coefficient is
/// zero, negative or NaN, and [`MissionError::NonFinite`] if a mission total
/// overflows.
pub fn evaluate(
    surfaces: &[SurfacePerformance],
    flight: &FlightCondition,
) -> Result<Mission, MissionError> {
    let s_total: f64 = surfaces.iter().map(|s| s.s_ref).sum();
    let weighted = |f: fn(&SurfacePerformance) -> f64| {
        surfaces.iter().map(|s| f(s) * s.s_ref).sum::<f64>() / s_total
    };
    let cl = weighted(|s| s.cl);
    let cd = weighted(|s| s.cd);
    if !(cl > 0.0) {
        return Err(MissionError::NoLift { cl });
    }

    let structural_weight: f64 = surfaces.iter().map(|s| s.structural_weight).sum();
    let empty_mass = flight.empty_mass.get::<kilogram>();

    let ct = flight.ct.get::<hertz>();
    let range = flight.range.get::<meter>();
    let speed = flight.speed_of_sound.get::<meter_per_second>() * flight.mach;
    let fuel_burn =
        (empty_mass + structural_weight / GRAVITY) * ((range * ct / speed * cd / cl).exp() - 1.0);

    let q = flight.dynamic_pressure().get::<pascal>();
    let lift = q * s_total * cl;
    let weight = (empty_mass + fuel_burn) * GRAVITY + structural_weight;
    let n_weight = flight.load_factor * weight;

    let empty_weight = empty_mass * GRAVITY;
    let mut cg = [0.0; 3];
    for d in 0..3 {
        let moment: f64 = flight.empty_cg[d].get::<meter>() * empty_weight
            + surfaces
                .iter()
                .map(|s| s.cg[d] * s.structural_weight)
                .sum::<f64>();
        cg[d] = moment / (empty_weight + structural_weight);
    }

    let mission = Mission {
        fuel_burn,
        l_equals_w: (lift - n_weight) / n_weight,
        cl,
        cd,
        lift,
        weight,
        structural_weight,
        cg,
    };
    let totals = [
        ("cd", mission.cd),
        ("fuel_burn", mission.fuel_burn),
        ("l_equals_w", mission.l_equals_w),
        ("structural_weight", mission.structural_weight),
    ];
    if let Some((quantity, _)) = totals.into_iter().find(|(_, v)| !v.is_finite()) {
        return Err(MissionError::NonFinite { quantity });
    }
    Ok(mission)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn surface(cl: f64, cd: f64, s_ref: f64, weight: f64) -> SurfacePerformance {
        SurfacePerformance {
            name: "wing".into(),
            failure: -1.0,
            thickness_intersects: vec![],
            von_mises: vec![],
            structural_weight: weight,
            cg: [0.5, 0.0, 0.0],
            s_ref,
            cl,
            cdi: 0.0,
            cdv: 0.0,
            cd,
        }
    }

    #[test]
    fn breguet_fuel_burn() {
        let flight = FlightCondition::default();
        let mission = evaluate(&[surface(0.5, 0.02, 10.0, 0.0)], &flight).unwrap();

        let exponent: f64 = 11.165e6 * 9.806_65 * 17e-6 / (295.4 * 0.84) * 0.04;
        assert_relative_eq!(mission.fuel_burn, 120_000.0 * exponent.exp_m1(), max_relative = 1e-9);
    }

    #[test]
    fn coefficients_are_area_weighted() {
        let flight = FlightCondition::default();
        let mission = evaluate(
            &[surface(0.6, 0.03, 30.0, 1.0), surface(0.2, 0.01, 10.0, 1.0)],
            &flight,
        )
        .unwrap();
        assert_relative_eq!(mission.cl, 0.5, max_relative = 1e-12);
        assert_relative_eq!(mission.cd, 0.025, max_relative = 1e-12);
        assert_relative_eq!(mission.structural_weight, 2.0);
    }

    #[test]
    fn balanced_lift_has_zero_residual() {
        let flight = FlightCondition::default();
        let q = flight.dynamic_pressure().get::<pascal>();
        let first = evaluate(&[surface(0.5, 0.02, 100.0, 0.0)], &flight).unwrap();

        // Scale the lift coefficient to carry the weight the first pass found.
        let cl = first.weight * flight.load_factor / (q * 100.0);
        let balanced = evaluate(&[surface(cl, cl * 0.04, 100.0, 0.0)], &flight).unwrap();
        assert_relative_eq!(balanced.l_equals_w, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_or_negative_lift_cannot_fly_the_mission() {
        let flight = FlightCondition::default();
        assert_eq!(
            evaluate(&[surface(0.0, 0.01, 10.0, 1.0)], &flight),
            Err(MissionError::NoLift { cl: 0.0 })
        );
        assert!(matches!(
            evaluate(&[surface(-0.3, 0.01, 10.0, 1.0)], &flight),
            Err(MissionError::NoLift { cl }) if cl < 0.0
        ));
        assert!(matches!(
            evaluate(&[surface(f64::NAN, 0.01, 10.0, 1.0)], &flight),
            Err(MissionError::NoLift { .. })
        ));
    }

    #[test]
    fn overflowing_fuel_burn_is_rejected() {
        let flight = FlightCondition::default();
        assert_eq!(
            evaluate(&[surface(1e-9, 0.05, 10.0, 1.0)], &flight),
            Err(MissionError::NonFinite {
                quantity: "fuel_burn"
            })
        );
    }
}
