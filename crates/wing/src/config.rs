//! TOML problem files.
//!
//! A [`ProblemConfig`] describes a complete analysis or optimization: the
//! flight condition, every surface, the coupled solver, the design problem
//! and the optimizer. Physical inputs are plain numbers in SI units (angles
//! in degrees) with the unit in the key name. Every section and key is
//! optional; missing values fall back to the rectangular reference wing at
//! Mach 0.84 cruise.
//!
//! ```toml
//! [flight]
//! alpha_deg = 5.0
//!
//! [[surfaces]]
//! name = "wing"
//! thickness_cp = [0.05, 0.1]
//!
//! [solver]
//! nonlinear_solver = "newton"
//! maxiter = 10
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use spar_solvers::{
    coupled::{NonlinearSolver, gauss_seidel, newton},
    optimization,
};
use thiserror::Error;
use uom::si::{
    angle::degree,
    f64::{Angle, Frequency, Length, Mass, MassDensity, Pressure, Velocity},
    frequency::hertz,
    length::meter,
    mass::kilogram,
    mass_density::kilogram_per_cubic_meter,
    pressure::pascal,
    velocity::meter_per_second,
};

use crate::{
    Aerostructural, FlightCondition, InvalidConfiguration, Material, ReferenceArea,
    SurfaceDefinition, Viscous, design::DesignSettings, geometry::Planform,
};

/// Errors that can occur while loading or building a problem file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read problem file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to write TOML: {0}")]
    Write(#[from] toml::ser::Error),

    #[error(transparent)]
    Invalid(#[from] InvalidConfiguration),

    #[error("optimizer: {0}")]
    Optimizer(#[from] optimization::ConfigError),
}

/// A complete problem description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProblemConfig {
    pub flight: FlightConfig,
    pub surfaces: Vec<SurfaceConfig>,
    pub solver: SolverConfig,
    pub design: DesignSettings,
    pub optimizer: OptimizerConfig,
}

impl Default for ProblemConfig {
    fn default() -> Self {
        Self {
            flight: FlightConfig::default(),
            surfaces: vec![SurfaceConfig::default()],
            solver: SolverConfig::default(),
            design: DesignSettings::default(),
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl ProblemConfig {
    /// Parses a problem from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not a valid problem.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads a problem from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Serializes the problem as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Write`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Builds the aerostructural model.
    ///
    /// # Errors
    ///
    /// Returns an error if a surface, the flight condition or the solver
    /// settings are invalid.
    pub fn model(&self) -> Result<Aerostructural, InvalidConfiguration> {
        let surfaces = self
            .surfaces
            .iter()
            .map(SurfaceConfig::definition)
            .collect::<Result<Vec<_>, _>>()?;
        Aerostructural::new(surfaces, self.flight.condition(), self.solver.build()?)
    }

    /// Builds the validated optimizer configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Optimizer`] if a setting is out of range.
    pub fn optimizer_config(&self) -> Result<optimization::Config, ConfigError> {
        let config = self.optimizer.build();
        config.validate()?;
        Ok(config)
    }
}

/// Flight condition in SI units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    pub velocity_m_s: f64,
    pub alpha_deg: f64,
    pub mach: f64,
    pub reynolds_per_m: f64,
    pub density_kg_m3: f64,

    /// Thrust-specific fuel consumption times g, in 1/s.
    pub ct_per_s: f64,
    pub range_m: f64,
    pub empty_mass_kg: f64,
    pub speed_of_sound_m_s: f64,
    pub load_factor: f64,
    pub empty_cg_m: [f64; 3],
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self::from(&FlightCondition::default())
    }
}

impl From<&FlightCondition> for FlightConfig {
    fn from(flight: &FlightCondition) -> Self {
        Self {
            velocity_m_s: flight.velocity.get::<meter_per_second>(),
            alpha_deg: flight.alpha.get::<degree>(),
            mach: flight.mach,
            reynolds_per_m: flight.reynolds_per_length,
            density_kg_m3: flight.density.get::<kilogram_per_cubic_meter>(),
            ct_per_s: flight.ct.get::<hertz>(),
            range_m: flight.range.get::<meter>(),
            empty_mass_kg: flight.empty_mass.get::<kilogram>(),
            speed_of_sound_m_s: flight.speed_of_sound.get::<meter_per_second>(),
            load_factor: flight.load_factor,
            empty_cg_m: flight.empty_cg.map(|x| x.get::<meter>()),
        }
    }
}

impl FlightConfig {
    #[must_use]
    pub fn condition(&self) -> FlightCondition {
        FlightCondition {
            velocity: Velocity::new::<meter_per_second>(self.velocity_m_s),
            alpha: Angle::new::<degree>(self.alpha_deg),
            mach: self.mach,
            reynolds_per_length: self.reynolds_per_m,
            density: MassDensity::new::<kilogram_per_cubic_meter>(self.density_kg_m3),
            ct: Frequency::new::<hertz>(self.ct_per_s),
            range: Length::new::<meter>(self.range_m),
            empty_mass: Mass::new::<kilogram>(self.empty_mass_kg),
            speed_of_sound: Velocity::new::<meter_per_second>(self.speed_of_sound_m_s),
            load_factor: self.load_factor,
            empty_cg: self.empty_cg_m.map(Length::new::<meter>),
        }
    }
}

/// Material properties in SI units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    pub youngs_modulus_pa: f64,
    pub shear_modulus_pa: f64,
    pub yield_stress_pa: f64,
    pub density_kg_m3: f64,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        let material = Material::default();
        Self {
            youngs_modulus_pa: material.youngs_modulus.get::<pascal>(),
            shear_modulus_pa: material.shear_modulus.get::<pascal>(),
            yield_stress_pa: material.yield_stress.get::<pascal>(),
            density_kg_m3: material.density.get::<kilogram_per_cubic_meter>(),
        }
    }
}

impl MaterialConfig {
    #[must_use]
    pub fn material(&self) -> Material {
        Material {
            youngs_modulus: Pressure::new::<pascal>(self.youngs_modulus_pa),
            shear_modulus: Pressure::new::<pascal>(self.shear_modulus_pa),
            yield_stress: Pressure::new::<pascal>(self.yield_stress_pa),
            density: MassDensity::new::<kilogram_per_cubic_meter>(self.density_kg_m3),
        }
    }
}

/// One lifting surface meshed from a rectangular planform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub name: String,
    pub symmetric: bool,
    pub reference_area: ReferenceArea,
    pub cl0: f64,
    pub cd0: f64,
    pub with_viscous: bool,
    pub exact_failure_constraint: bool,
    pub spar_origin: f64,
    pub wing_weight_ratio: f64,
    pub twist_cp: Vec<f64>,
    pub thickness_cp: Vec<f64>,
    pub planform: Planform,
    pub viscous: Viscous,
    pub material: MaterialConfig,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            name: "wing".to_owned(),
            symmetric: true,
            reference_area: ReferenceArea::Wetted,
            cl0: 0.0,
            cd0: 0.015,
            with_viscous: true,
            exact_failure_constraint: false,
            spar_origin: 0.35,
            wing_weight_ratio: 2.0,
            twist_cp: vec![-10.0, 15.0],
            thickness_cp: vec![0.075, 0.075],
            planform: Planform::default(),
            viscous: Viscous::default(),
            material: MaterialConfig::default(),
        }
    }
}

impl SurfaceConfig {
    /// Meshes the planform and builds the surface definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the planform cannot be meshed or the definition
    /// is inconsistent.
    pub fn definition(&self) -> Result<SurfaceDefinition, InvalidConfiguration> {
        let definition = SurfaceDefinition {
            name: self.name.clone(),
            symmetric: self.symmetric,
            reference_area: self.reference_area,
            cl0: self.cl0,
            cd0: self.cd0,
            viscous: self.viscous,
            with_viscous: self.with_viscous,
            material: self.material.material(),
            spar_origin: self.spar_origin,
            wing_weight_ratio: self.wing_weight_ratio,
            exact_failure_constraint: self.exact_failure_constraint,
            mesh: self.planform.mesh(&self.name, self.symmetric)?,
            twist_cp: self.twist_cp.clone(),
            thickness_cp: self.thickness_cp.clone(),
        };
        definition.validate()?;
        Ok(definition)
    }
}

/// Nonlinear solver choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    /// Nonlinear block Gauss–Seidel.
    #[default]
    FixedPoint,
    Newton,
}

/// Bounds of the Aitken relaxation factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AitkenConfig {
    pub initial: f64,
    pub min: f64,
    pub max: f64,
}

/// Coupled solver settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub nonlinear_solver: SolverKind,
    pub maxiter: usize,
    pub atol: f64,
    pub rtol: f64,

    /// Relaxation for the fixed-point solver; off when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aitken: Option<AitkenConfig>,

    /// Relative Jacobian step for Newton.
    pub fd_step: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            nonlinear_solver: SolverKind::FixedPoint,
            maxiter: 20,
            atol: 1e-10,
            rtol: 1e-10,
            aitken: None,
            fd_step: newton::Config::default().fd_step(),
        }
    }
}

impl SolverConfig {
    /// Builds the validated solver strategy.
    ///
    /// # Errors
    ///
    /// Returns an error if an iteration limit, tolerance or relaxation bound
    /// is invalid.
    pub fn build(&self) -> Result<NonlinearSolver, InvalidConfiguration> {
        Ok(match self.nonlinear_solver {
            SolverKind::FixedPoint => {
                let mut config = gauss_seidel::Config::new(self.maxiter, self.atol, self.rtol)?;
                if let Some(AitkenConfig { initial, min, max }) = self.aitken {
                    config = config.with_aitken(initial, min, max)?;
                }
                NonlinearSolver::GaussSeidel(config)
            }
            SolverKind::Newton => NonlinearSolver::Newton(newton::Config::new(
                self.maxiter,
                self.atol,
                self.rtol,
                self.fd_step,
            )?),
        })
    }
}

/// Inner optimizer choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    #[default]
    Lbfgs,
    ProjectedGradient,
}

/// Augmented-Lagrangian optimizer settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub method: OptimizerKind,
    pub max_outer_iters: usize,
    pub max_inner_iters: usize,
    pub tolerance: f64,
    pub feasibility_tol: f64,
    pub initial_penalty: f64,
    pub fd_step: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        let config = optimization::Config::default();
        Self {
            method: OptimizerKind::Lbfgs,
            max_outer_iters: config.max_outer_iters,
            max_inner_iters: config.max_inner_iters,
            tolerance: config.tolerance,
            feasibility_tol: config.feasibility_tol,
            initial_penalty: config.initial_penalty,
            fd_step: config.fd_step,
        }
    }
}

impl OptimizerConfig {
    /// Returns the optimizer configuration, unvalidated.
    #[must_use]
    pub fn build(&self) -> optimization::Config {
        optimization::Config {
            optimizer: match self.method {
                OptimizerKind::Lbfgs => optimization::Optimizer::Preferred,
                OptimizerKind::ProjectedGradient => optimization::Optimizer::Fallback,
            },
            max_outer_iters: self.max_outer_iters,
            max_inner_iters: self.max_inner_iters,
            tolerance: self.tolerance,
            feasibility_tol: self.feasibility_tol,
            initial_penalty: self.initial_penalty,
            fd_step: self.fd_step,
            ..optimization::Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use spar_solvers::coupled::Method;

    #[test]
    fn empty_file_is_the_reference_problem() {
        let config = ProblemConfig::from_toml_str("").unwrap();
        assert_eq!(config, ProblemConfig::default());

        let model = config.model().unwrap();
        assert_eq!(model.surfaces().len(), 1);
        assert_eq!(model.surfaces()[0].mesh.dim(), (2, 5, 3));
        assert_eq!(model.solver().method(), Method::GaussSeidel);
        assert_eq!(model.solver().max_iters(), 20);
    }

    #[test]
    fn partial_file_overrides_selected_values() {
        let text = r#"
            [flight]
            alpha_deg = 5.0

            [[surfaces]]
            name = "tail"
            thickness_cp = [0.05, 0.1, 0.1]

            [surfaces.planform]
            num_y = 7

            [solver]
            nonlinear_solver = "newton"
            maxiter = 8

            [design]
            derivatives = "finite_difference"
        "#;
        let config = ProblemConfig::from_toml_str(text).unwrap();
        assert_relative_eq!(config.flight.alpha_deg, 5.0);
        assert_relative_eq!(config.flight.mach, 0.84);

        let surface = &config.surfaces[0];
        assert_eq!(surface.name, "tail");
        assert_eq!(surface.planform.num_x, 2);
        assert_eq!(surface.twist_cp, vec![-10.0, 15.0]);

        let model = config.model().unwrap();
        assert_eq!(model.solver().method(), Method::Newton);
        assert_eq!(model.surfaces()[0].num_nodes(), 4);
        assert_eq!(
            config.design.derivatives,
            crate::design::DerivativeMethod::FiniteDifference
        );
    }

    #[test]
    fn round_trips_through_toml() {
        let mut config = ProblemConfig::default();
        config.solver.aitken = Some(AitkenConfig {
            initial: 1.0,
            min: 0.25,
            max: 2.0,
        });
        config.optimizer.method = OptimizerKind::ProjectedGradient;

        let text = config.to_toml_string().unwrap();
        assert_eq!(ProblemConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn invalid_values_are_reported_before_solving() {
        let text = r#"
            [[surfaces]]
            spar_origin = 1.5
        "#;
        let config = ProblemConfig::from_toml_str(text).unwrap();
        assert!(matches!(
            config.model(),
            Err(InvalidConfiguration::Fraction {
                field: "spar_origin",
                ..
            })
        ));

        let text = r#"
            [solver]
            maxiter = 0
        "#;
        let config = ProblemConfig::from_toml_str(text).unwrap();
        assert!(config.model().is_err());

        let text = r#"
            [optimizer]
            max_outer_iters = 0
        "#;
        let config = ProblemConfig::from_toml_str(text).unwrap();
        assert!(matches!(
            config.optimizer_config(),
            Err(ConfigError::Optimizer(_))
        ));
    }
}
