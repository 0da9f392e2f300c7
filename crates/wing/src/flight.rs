use uom::si::{
    angle::{degree, radian},
    f64::{Angle, Frequency, Length, Mass, MassDensity, Pressure, Velocity},
    frequency::hertz,
    length::meter,
    mass::kilogram,
    mass_density::kilogram_per_cubic_meter,
    velocity::meter_per_second,
};

use crate::InvalidConfiguration;

/// Standard gravitational acceleration in m/s².
pub const GRAVITY: f64 = 9.806_65;

/// The flight condition shared by every surface at one analysis point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightCondition {
    pub velocity: Velocity,
    pub alpha: Angle,
    pub mach: f64,

    /// Reynolds number per unit length, in 1/m.
    pub reynolds_per_length: f64,

    pub density: MassDensity,

    /// Thrust-specific fuel consumption times gravity.
    pub ct: Frequency,

    pub range: Length,

    /// Aircraft weight without wing structure or fuel.
    pub empty_mass: Mass,

    pub speed_of_sound: Velocity,
    pub load_factor: f64,
    pub empty_cg: [Length; 3],
}

impl Default for FlightCondition {
    /// Cruise of a mid-size transport at Mach 0.84.
    fn default() -> Self {
        Self {
            velocity: Velocity::new::<meter_per_second>(248.136),
            alpha: Angle::new::<degree>(9.0),
            mach: 0.84,
            reynolds_per_length: 1e6,
            density: MassDensity::new::<kilogram_per_cubic_meter>(0.38),
            ct: Frequency::new::<hertz>(GRAVITY * 17e-6),
            range: Length::new::<meter>(11.165e6),
            empty_mass: Mass::new::<kilogram>(0.4 * 3e5),
            speed_of_sound: Velocity::new::<meter_per_second>(295.4),
            load_factor: 1.0,
            empty_cg: [Length::new::<meter>(0.0); 3],
        }
    }
}

impl FlightCondition {
    /// Returns a copy at a different angle of attack.
    #[must_use]
    pub fn with_alpha(mut self, alpha: Angle) -> Self {
        self.alpha = alpha;
        self
    }

    /// Checks that every physical quantity is usable.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfiguration::Flight`] naming the first bad field.
    pub fn validate(&self) -> Result<(), InvalidConfiguration> {
        let positive = [
            ("velocity", self.velocity.get::<meter_per_second>()),
            ("mach", self.mach),
            ("reynolds_per_length", self.reynolds_per_length),
            ("density", self.density.get::<kilogram_per_cubic_meter>()),
            ("ct", self.ct.get::<hertz>()),
            ("range", self.range.get::<meter>()),
            ("empty_mass", self.empty_mass.get::<kilogram>()),
            ("speed_of_sound", self.speed_of_sound.get::<meter_per_second>()),
            ("load_factor", self.load_factor),
        ];
        if let Some((field, _)) = positive.iter().find(|(_, v)| !(v.is_finite() && *v > 0.0)) {
            return Err(InvalidConfiguration::Flight(*field));
        }
        if !self.alpha.get::<radian>().is_finite() {
            return Err(InvalidConfiguration::Flight("alpha"));
        }
        Ok(())
    }

    /// Returns the dynamic pressure `½ ρ V²`.
    #[must_use]
    pub fn dynamic_pressure(&self) -> Pressure {
        0.5 * self.density * self.velocity * self.velocity
    }

    /// Returns the freestream velocity vector in m/s.
    #[must_use]
    pub(crate) fn freestream(&self) -> [f64; 3] {
        let v = self.velocity.get::<meter_per_second>();
        let alpha = self.alpha.get::<radian>();
        [v * alpha.cos(), 0.0, v * alpha.sin()]
    }

    /// Returns the unit lift and drag directions.
    #[must_use]
    pub(crate) fn wind_axes(&self) -> ([f64; 3], [f64; 3]) {
        let alpha = self.alpha.get::<radian>();
        let (sin, cos) = alpha.sin_cos();
        ([-sin, 0.0, cos], [cos, 0.0, sin])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use uom::si::pressure::pascal;

    #[test]
    fn default_is_valid() {
        assert!(FlightCondition::default().validate().is_ok());
    }

    #[test]
    fn dynamic_pressure_uses_velocity_and_density() {
        let flight = FlightCondition::default();
        let q = flight.dynamic_pressure().get::<pascal>();
        assert_relative_eq!(q, 0.5 * 0.38 * 248.136 * 248.136, max_relative = 1e-12);
    }

    #[test]
    fn wind_axes_are_orthonormal() {
        let flight = FlightCondition::default().with_alpha(Angle::new::<degree>(7.0));
        let (lift, drag) = flight.wind_axes();
        let dot: f64 = lift.iter().zip(&drag).map(|(a, b)| a * b).sum();
        assert_relative_eq!(dot, 0.0, epsilon = 1e-15);

        let v = flight.freestream();
        let along: f64 = v.iter().zip(&drag).map(|(a, b)| a * b).sum();
        assert_relative_eq!(along, 248.136, max_relative = 1e-12);
    }

    #[test]
    fn rejects_zero_density() {
        let flight = FlightCondition {
            density: MassDensity::new::<kilogram_per_cubic_meter>(0.0),
            ..FlightCondition::default()
        };
        assert!(matches!(
            flight.validate(),
            Err(InvalidConfiguration::Flight("density"))
        ));
    }
}
