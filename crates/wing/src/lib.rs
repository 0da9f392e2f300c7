//! Coupled aerostructural analysis and fuel-burn optimization of lifting
//! surfaces.
//!
//! A vortex-lattice aerodynamic model and a tube-spar beam model exchange
//! loads and displacements through a rigid-link [`LoadTransfer`] until the
//! coupled state converges. Stresses, weight and coefficients of the
//! converged state feed a Breguet-range mission model.
//!
//! # Pieces
//!
//! - [`Aerostructural`]: the [`Model`](spar_core::Model) running one coupled
//!   analysis per [`DesignPoint`]
//! - [`CoupledAnalysis`]: a design point prepared as a
//!   [`CoupledProblem`](spar_core::CoupledProblem)
//! - [`FuelBurn`]: the [`OptimizationProblem`](spar_core::OptimizationProblem)
//!   minimizing fuel burn, with coupled-adjoint derivatives
//! - [`ProblemConfig`]: TOML problem files
//!
//! # Example
//!
//! ```no_run
//! use spar_wing::{Aerostructural, FlightCondition, SurfaceDefinition};
//! use spar_solvers::coupled::NonlinearSolver;
//!
//! let wing = SurfaceDefinition::rectangular("wing")?;
//! let model = Aerostructural::new(vec![wing], FlightCondition::default(), NonlinearSolver::default())?;
//! let output = model.analyze(&model.initial_point())?;
//! println!("fuel burn: {:.1} kg", output.mission.fuel_burn);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod analysis;
mod error;
mod flight;
mod surface;
mod transfer;

pub mod aero;
pub mod config;
pub mod coupled;
pub mod design;
pub mod geometry;
pub mod mission;
pub mod performance;
pub mod structures;

pub use aero::{AeroModel, AeroSurface, VortexLattice};
pub use analysis::{Aerostructural, AnalysisOutput, DesignPoint};
pub use config::{ConfigError, ProblemConfig};
pub use coupled::{CoupledAnalysis, SurfaceSizing, SurfaceState};
pub use design::{DerivativeMethod, DesignSettings, FuelBurn};
pub use error::{Discipline, Error, InvalidConfiguration, Singular};
pub use flight::{FlightCondition, GRAVITY};
pub use mission::{Mission, MissionError};
pub use performance::SurfacePerformance;
pub use structures::{Beam, SpatialBeam, StructuralModel};
pub use surface::{Material, ReferenceArea, SurfaceDefinition, Viscous};
pub use transfer::LoadTransfer;
