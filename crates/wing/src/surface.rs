use serde::{Deserialize, Serialize};
use uom::si::{
    f64::{MassDensity, Pressure},
    mass_density::kilogram_per_cubic_meter,
    pressure::pascal,
};

use crate::{
    InvalidConfiguration,
    geometry::{self, Mesh, Planform},
};

/// How a surface's reference area is measured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceArea {
    /// Sum of the true panel areas.
    #[default]
    Wetted,

    /// Panel areas projected onto the `x–y` plane.
    Projected,
}

/// Spar material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub youngs_modulus: Pressure,
    pub shear_modulus: Pressure,

    /// Allowable stress, already divided by any safety factor.
    pub yield_stress: Pressure,

    pub density: MassDensity,
}

impl Default for Material {
    /// Aluminium 7075 with a 2.5 safety factor on yield.
    fn default() -> Self {
        Self {
            youngs_modulus: Pressure::new::<pascal>(70e9),
            shear_modulus: Pressure::new::<pascal>(30e9),
            yield_stress: Pressure::new::<pascal>(500e6 / 2.5),
            density: MassDensity::new::<kilogram_per_cubic_meter>(3e3),
        }
    }
}

/// Airfoil parameters for the skin-friction drag estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viscous {
    /// Fraction of the chord with laminar flow.
    pub k_lam: f64,

    /// Thickness-to-chord ratio.
    pub t_over_c: f64,

    /// Chordwise location of maximum thickness.
    pub c_max_t: f64,
}

impl Default for Viscous {
    /// NACA 0015.
    fn default() -> Self {
        Self {
            k_lam: 0.05,
            t_over_c: 0.15,
            c_max_t: 0.303,
        }
    }
}

/// A lifting surface: geometry, material, and the initial sizing.
///
/// Definitions are built once and never mutated by an analysis. The design
/// values an optimizer varies are passed separately as a
/// [`DesignPoint`](crate::DesignPoint).
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceDefinition {
    pub name: String,

    /// Model only the left half and mirror it across `y = 0`.
    pub symmetric: bool,

    pub reference_area: ReferenceArea,
    pub cl0: f64,
    pub cd0: f64,
    pub viscous: Viscous,
    pub with_viscous: bool,
    pub material: Material,

    /// Chordwise position of the spar as a fraction of the chord.
    pub spar_origin: f64,

    /// Ratio of total wing weight to spar weight.
    pub wing_weight_ratio: f64,

    /// Use the exact maximum instead of the KS aggregate for failure.
    pub exact_failure_constraint: bool,

    /// Undeformed, untwisted mesh.
    pub mesh: Mesh,

    /// Twist control points in degrees, tip first.
    pub twist_cp: Vec<f64>,

    /// Spar wall thickness control points in metres, tip first.
    pub thickness_cp: Vec<f64>,
}

impl SurfaceDefinition {
    /// Creates the rectangular reference wing: a 10 m span, 1 m chord
    /// symmetric half wing with an aluminium tube spar.
    ///
    /// # Errors
    ///
    /// Returns an error if the default planform cannot be meshed.
    pub fn rectangular(name: impl Into<String>) -> Result<Self, InvalidConfiguration> {
        let name = name.into();
        let mesh = Planform::default().mesh(&name, true)?;
        Ok(Self {
            name,
            symmetric: true,
            reference_area: ReferenceArea::Wetted,
            cl0: 0.0,
            cd0: 0.015,
            viscous: Viscous::default(),
            with_viscous: true,
            material: Material::default(),
            spar_origin: 0.35,
            wing_weight_ratio: 2.0,
            exact_failure_constraint: false,
            mesh,
            twist_cp: vec![-10.0, 15.0],
            thickness_cp: vec![0.075, 0.075],
        })
    }

    /// Returns the spanwise node count, which is also the spar node count.
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.mesh.dim().1
    }

    /// Returns the number of spar elements.
    #[must_use]
    pub fn num_elements(&self) -> usize {
        self.num_nodes() - 1
    }

    /// Checks the definition for consistency.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), InvalidConfiguration> {
        geometry::check_mesh(&self.mesh, &self.name)?;

        let surface = || self.name.clone();
        let positive = [
            ("E", self.material.youngs_modulus.get::<pascal>()),
            ("G", self.material.shear_modulus.get::<pascal>()),
            ("yield", self.material.yield_stress.get::<pascal>()),
            ("material density", self.material.density.get::<kilogram_per_cubic_meter>()),
            ("wing_weight_ratio", self.wing_weight_ratio),
            ("t_over_c", self.viscous.t_over_c),
            ("c_max_t", self.viscous.c_max_t),
        ];
        if let Some((field, _)) = positive.iter().find(|(_, v)| !(v.is_finite() && *v > 0.0)) {
            return Err(InvalidConfiguration::NotPositive {
                surface: surface(),
                field: *field,
            });
        }

        let fractions = [("spar_origin", self.spar_origin), ("k_lam", self.viscous.k_lam)];
        if let Some((field, _)) = fractions.iter().find(|(_, v)| !(0.0..=1.0).contains(v)) {
            return Err(InvalidConfiguration::Fraction {
                surface: surface(),
                field: *field,
            });
        }

        if !(self.cl0.is_finite() && self.cd0.is_finite()) {
            return Err(InvalidConfiguration::NotFinite {
                surface: surface(),
                field: "CL0/CD0",
            });
        }

        check_control_points(&self.name, &self.twist_cp, &self.thickness_cp)
    }
}

/// Checks a pair of twist and thickness control-point arrays.
pub(crate) fn check_control_points(
    surface: &str,
    twist_cp: &[f64],
    thickness_cp: &[f64],
) -> Result<(), InvalidConfiguration> {
    if twist_cp.is_empty() || thickness_cp.is_empty() {
        return Err(InvalidConfiguration::EmptyControlPoints);
    }
    if twist_cp.iter().any(|v| !v.is_finite()) {
        return Err(InvalidConfiguration::NotFinite {
            surface: surface.to_owned(),
            field: "twist_cp",
        });
    }
    if thickness_cp.iter().any(|v| !(v.is_finite() && *v >= 0.0)) {
        return Err(InvalidConfiguration::Negative {
            surface: surface.to_owned(),
            field: "thickness_cp",
        });
    }
    Ok(())
}
