//! Fuel-burn minimization as an [`OptimizationProblem`].
//!
//! The design vector holds, for every surface in definition order, its twist
//! control points (degrees) then its thickness control points (metres),
//! followed by the angle of attack (degrees). The constraint vector holds
//! `<surface>.failure` and `<surface>.thickness_intersects` for every
//! surface, followed by `l_equals_w`.
//!
//! # Derivatives
//!
//! [`DerivativeMethod::Adjoint`] linearizes the converged coupled system. With
//! `G(u, x)` the sweep map and `F(u, x)` the objective and constraints, the
//! adjoint `ψ` solves `(I − ∂G/∂u)ᵀ ψ = (∂F/∂u)ᵀ` and the total derivative is
//! `dF/dx = ∂F/∂x + ψᵀ ∂G/∂x`. The partials are forward differences of single
//! sweeps, so no coupled solve is repeated. [`DerivativeMethod::FiniteDifference`]
//! leaves derivatives to the optimizer, which re-solves the coupled system
//! once per variable.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use spar_core::{
    ConstraintKind, ConstraintSpec, CoupledProblem, DesignVariable, Observer, OptimizationProblem,
    TotalDerivatives,
};
use spar_solvers::{
    linalg::Factorization,
    optimization::{self, Action, Event},
};
use uom::si::{angle::degree, f64::Angle};

use crate::{
    AeroModel, Aerostructural, Discipline, Error, InvalidConfiguration, StructuralModel,
    analysis::{AnalysisOutput, DesignPoint},
    coupled::{CoupledAnalysis, SurfaceSizing},
    mission::Mission,
    performance::SurfacePerformance,
};

/// How total derivatives are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivativeMethod {
    /// Coupled adjoint with finite-difference partials.
    #[default]
    Adjoint,

    /// Full coupled re-solve per design variable.
    FiniteDifference,
}

/// Bounds, scalers and derivative settings of the fuel-burn problem.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignSettings {
    /// Twist control point bounds, in degrees.
    pub twist_bounds: [f64; 2],

    /// Thickness control point bounds, in metres.
    pub thickness_bounds: [f64; 2],
    pub thickness_scaler: f64,

    /// Angle of attack bounds, in degrees.
    pub alpha_bounds: [f64; 2],

    pub objective_scaler: f64,
    pub derivatives: DerivativeMethod,

    /// Relative step of the adjoint's partial derivatives.
    pub fd_step: f64,
}

impl Default for DesignSettings {
    fn default() -> Self {
        Self {
            twist_bounds: [-10.0, 15.0],
            thickness_bounds: [0.01, 0.5],
            thickness_scaler: 1e2,
            alpha_bounds: [-10.0, 10.0],
            objective_scaler: 1e-5,
            derivatives: DerivativeMethod::Adjoint,
            fd_step: 1e-6,
        }
    }
}

impl DesignSettings {
    /// Checks that every bound pair is ordered and every scaler positive.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfiguration::Bounds`] or
    /// [`InvalidConfiguration::Setting`] naming the offending setting.
    pub fn validate(&self) -> Result<(), InvalidConfiguration> {
        let bounds = [
            ("twist_bounds", self.twist_bounds),
            ("thickness_bounds", self.thickness_bounds),
            ("alpha_bounds", self.alpha_bounds),
        ];
        for (name, [lo, hi]) in bounds {
            if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
                return Err(InvalidConfiguration::Bounds { name });
            }
        }
        let positive = [
            ("thickness_scaler", self.thickness_scaler),
            ("objective_scaler", self.objective_scaler),
            ("fd_step", self.fd_step),
        ];
        if let Some((name, _)) = positive.into_iter().find(|(_, v)| !(v.is_finite() && *v > 0.0)) {
            return Err(InvalidConfiguration::Setting { name });
        }
        Ok(())
    }
}

/// Minimizes mission fuel burn over twist, spar thickness and angle of
/// attack, subject to stress, geometry and lift-equals-weight constraints.
pub struct FuelBurn<'m, A = crate::VortexLattice, S = crate::SpatialBeam> {
    model: &'m Aerostructural<A, S>,
    settings: DesignSettings,
    variables: Vec<DesignVariable>,
    constraints: Vec<ConstraintSpec>,
    upper: Vec<f64>,
}

impl<'m, A: AeroModel, S: StructuralModel> FuelBurn<'m, A, S> {
    /// Builds the problem over every surface of `model`.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid.
    pub fn new(
        model: &'m Aerostructural<A, S>,
        settings: DesignSettings,
    ) -> Result<Self, InvalidConfiguration> {
        settings.validate()?;

        let mut variables = Vec::new();
        let mut constraints = Vec::new();
        for surface in model.surfaces() {
            let name = &surface.name;
            let [lo, hi] = settings.twist_bounds;
            variables.push(DesignVariable::new(
                format!("{name}.twist_cp"),
                surface.twist_cp.len(),
                lo,
                hi,
            ));
            let [lo, hi] = settings.thickness_bounds;
            variables.push(
                DesignVariable::new(format!("{name}.thickness_cp"), surface.thickness_cp.len(), lo, hi)
                    .with_scaler(settings.thickness_scaler),
            );

            constraints.push(ConstraintSpec::new(
                format!("{name}.failure"),
                1,
                ConstraintKind::Upper(0.0),
            ));
            constraints.push(ConstraintSpec::new(
                format!("{name}.thickness_intersects"),
                surface.num_elements(),
                ConstraintKind::Upper(0.0),
            ));
        }
        let [lo, hi] = settings.alpha_bounds;
        variables.push(DesignVariable::new("alpha", 1, lo, hi));
        constraints.push(ConstraintSpec::new("l_equals_w", 1, ConstraintKind::Equals(0.0)));

        let upper = variables
            .iter()
            .flat_map(|v| std::iter::repeat_n(v.upper, v.size))
            .collect();

        Ok(Self {
            model,
            settings,
            variables,
            constraints,
            upper,
        })
    }

    #[must_use]
    pub fn model(&self) -> &'m Aerostructural<A, S> {
        self.model
    }

    #[must_use]
    pub fn settings(&self) -> &DesignSettings {
        &self.settings
    }

    /// Returns the design vector of the model's initial point.
    #[must_use]
    pub fn initial_design(&self) -> Vec<f64> {
        self.to_design(&self.model.initial_point())
    }

    /// Flattens a design point into a design vector.
    #[must_use]
    pub fn to_design(&self, point: &DesignPoint) -> Vec<f64> {
        let mut x: Vec<f64> = point
            .surfaces
            .iter()
            .flat_map(|s| s.twist_cp.iter().chain(&s.thickness_cp).copied())
            .collect();
        x.push(point.alpha.get::<degree>());
        x
    }

    /// Splits a design vector into a design point.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfiguration::DesignLength`] if `x` has the wrong
    /// length.
    pub fn to_point(&self, x: &[f64]) -> Result<DesignPoint, InvalidConfiguration> {
        let expected = self.upper.len();
        if x.len() != expected {
            return Err(InvalidConfiguration::DesignLength {
                expected,
                actual: x.len(),
            });
        }

        let mut rest = x;
        let mut take = |n: usize| {
            let (head, tail) = rest.split_at(n);
            rest = tail;
            head.to_vec()
        };
        let surfaces = self
            .model
            .surfaces()
            .iter()
            .map(|s| SurfaceSizing {
                twist_cp: take(s.twist_cp.len()),
                thickness_cp: take(s.thickness_cp.len()),
            })
            .collect();

        Ok(DesignPoint {
            surfaces,
            alpha: Angle::new::<degree>(take(1)[0]),
        })
    }

    /// Returns the objective followed by every constraint value.
    fn outputs(&self, performance: &[SurfacePerformance], mission: &Mission) -> Vec<f64> {
        let mut f = vec![mission.fuel_burn];
        f.extend(constraint_values(performance, mission));
        f
    }

    /// Runs one sweep at `coupling` and returns `G(u)` and `F(u)`.
    fn linearization_point(
        &self,
        analysis: &CoupledAnalysis<'_, A, S>,
        coupling: &[f64],
    ) -> Result<(Vec<f64>, Vec<f64>), Error> {
        let sweep = analysis.sweep(coupling)?;
        let (performance, mission) = self.model.evaluate(analysis, &sweep.state)?;
        Ok((sweep.coupling, self.outputs(&performance, &mission)))
    }
}

impl<A, S> FuelBurn<'_, A, S>
where
    A: AeroModel + Sync,
    S: StructuralModel + Sync,
{
    /// Computes total derivatives of the objective and constraints with the
    /// coupled adjoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SingularSystem`] if a perturbed sweep fails or the
    /// adjoint system is singular, and [`Error::Mission`] if a perturbed
    /// state cannot fly the mission.
    pub fn adjoint(
        &self,
        x: &[f64],
        point: &DesignPoint,
        output: &AnalysisOutput,
    ) -> Result<TotalDerivatives, Error> {
        let analysis = self.model.prepare(point)?;
        let u = output.coupling.as_slice();
        let (g0, f0) = self.linearization_point(&analysis, u)?;
        let step = self.settings.fd_step;
        let difference = |(g, f): (Vec<f64>, Vec<f64>), h: f64| {
            let dg: Vec<f64> = g.iter().zip(&g0).map(|(a, b)| (a - b) / h).collect();
            let df: Vec<f64> = f.iter().zip(&f0).map(|(a, b)| (a - b) / h).collect();
            (dg, df)
        };

        let du = (0..u.len())
            .into_par_iter()
            .map(|j| -> Result<_, Error> {
                let h = step * u[j].abs().max(1.0);
                let mut perturbed = u.to_vec();
                perturbed[j] += h;
                Ok(difference(self.linearization_point(&analysis, &perturbed)?, h))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let dx = (0..x.len())
            .into_par_iter()
            .map(|i| -> Result<_, Error> {
                let mut h = step * x[i].abs().max(1.0);
                if x[i] + h > self.upper[i] {
                    h = -h;
                }
                let mut perturbed = x.to_vec();
                perturbed[i] += h;
                let point = self.to_point(&perturbed)?;
                let analysis = self.model.prepare(&point)?;
                Ok(difference(self.linearization_point(&analysis, u)?, h))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let n = u.len();
        let system = DMatrix::from_fn(n, n, |row, col| {
            // (I − ∂G/∂u)ᵀ, where column j of ∂G/∂u is du[j].0.
            let identity = if row == col { 1.0 } else { 0.0 };
            identity - du[row].0[col]
        });
        let factorization = Factorization::new(system)
            .map_err(|_| Error::singular(Discipline::Coupled, analysis.label()))?;

        let mut totals = Vec::with_capacity(f0.len());
        for k in 0..f0.len() {
            let rhs = DVector::from_fn(n, |j, _| du[j].1[k]);
            let psi = factorization
                .solve(&rhs)
                .map_err(|_| Error::singular(Discipline::Coupled, analysis.label()))?;
            let row: Vec<f64> = dx
                .iter()
                .map(|(dg, df)| df[k] + dg.iter().zip(psi.iter()).map(|(g, p)| g * p).sum::<f64>())
                .collect();
            totals.push(row);
        }

        let mut totals = totals.into_iter();
        Ok(TotalDerivatives {
            objective: totals.next().unwrap_or_default(),
            constraints: totals.collect(),
        })
    }
}

/// Flattens per-surface constraints followed by `l_equals_w`.
#[must_use]
pub fn constraint_values(performance: &[SurfacePerformance], mission: &Mission) -> Vec<f64> {
    let mut values = Vec::new();
    for surface in performance {
        values.push(surface.failure);
        values.extend_from_slice(&surface.thickness_intersects);
    }
    values.push(mission.l_equals_w);
    values
}

impl<A, S> OptimizationProblem for FuelBurn<'_, A, S>
where
    A: AeroModel + Sync,
    S: StructuralModel + Sync,
{
    type Input = DesignPoint;
    type Output = AnalysisOutput;
    type Error = Error;

    fn design_variables(&self) -> &[DesignVariable] {
        &self.variables
    }

    fn constraints(&self) -> &[ConstraintSpec] {
        &self.constraints
    }

    fn objective_scaler(&self) -> f64 {
        self.settings.objective_scaler
    }

    fn input(&self, x: &[f64]) -> Result<DesignPoint, Error> {
        Ok(self.to_point(x)?)
    }

    fn objective(&self, _input: &DesignPoint, output: &AnalysisOutput) -> Result<f64, Error> {
        Ok(output.mission.fuel_burn)
    }

    fn constraint_values(&self, _input: &DesignPoint, output: &AnalysisOutput) -> Result<Vec<f64>, Error> {
        Ok(constraint_values(&output.performance, &output.mission))
    }

    fn total_derivatives(
        &self,
        x: &[f64],
        input: &DesignPoint,
        output: &AnalysisOutput,
    ) -> Option<Result<TotalDerivatives, Error>> {
        match self.settings.derivatives {
            DerivativeMethod::Adjoint => Some(self.adjoint(x, input, output)),
            DerivativeMethod::FiniteDifference => None,
        }
    }
}

/// Treats singular or unflyable evaluations as infeasible points.
///
/// Pass this as, or call it from, an optimization observer so the line
/// search backtracks instead of aborting the run.
pub fn assume_worse_if_infeasible<A, S>(
    event: &Event<'_, Aerostructural<A, S>, FuelBurn<'_, A, S>>,
) -> Option<Action>
where
    A: AeroModel + Sync,
    S: StructuralModel + Sync,
{
    match event {
        Event::ModelFailed { error, .. } | Event::ProblemFailed { error, .. } if error.is_infeasible() => {
            Some(Action::AssumeWorse)
        }
        _ => None,
    }
}

/// Minimizes fuel burn from the model's initial point.
///
/// # Errors
///
/// Returns an error if the optimizer configuration is invalid or an
/// evaluation fails and the observer does not recover it.
pub fn optimize<'m, A, S, Obs>(
    problem: &FuelBurn<'m, A, S>,
    config: &optimization::Config,
    observer: Obs,
) -> Result<optimization::Solution<DesignPoint, AnalysisOutput>, optimization::Error>
where
    A: AeroModel + Sync,
    S: StructuralModel + Sync,
    Obs: for<'a> Observer<Event<'a, Aerostructural<A, S>, FuelBurn<'m, A, S>>, Action>,
{
    let x0 = problem.initial_design();
    optimization::minimize(problem.model(), problem, &x0, config, observer)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use spar_solvers::coupled::NonlinearSolver;

    use crate::{FlightCondition, SurfaceDefinition};

    fn model() -> Aerostructural {
        let wing = SurfaceDefinition::rectangular("wing").unwrap();
        Aerostructural::new(vec![wing], FlightCondition::default(), NonlinearSolver::default()).unwrap()
    }

    #[test]
    fn names_and_sizes_follow_surfaces() {
        let model = model();
        let problem = FuelBurn::new(&model, DesignSettings::default()).unwrap();

        let names: Vec<&str> = problem.design_variables().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["wing.twist_cp", "wing.thickness_cp", "alpha"]);
        assert_eq!(problem.num_variables(), 5);
        assert_eq!(problem.design_variables()[1].scaler, 1e2);

        let names: Vec<&str> = problem.constraints().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["wing.failure", "wing.thickness_intersects", "l_equals_w"]);
        assert_eq!(problem.num_constraints(), 4);
        assert!(problem.constraints()[2].is_equality());
    }

    #[test]
    fn design_vector_round_trips_through_point() {
        let model = model();
        let problem = FuelBurn::new(&model, DesignSettings::default()).unwrap();

        let x = problem.initial_design();
        let expected = [-10.0, 15.0, 0.075, 0.075, 9.0];
        let round_trip = problem.to_design(&problem.to_point(&x).unwrap());
        for ((a, b), c) in x.iter().zip(expected).zip(&round_trip) {
            assert_relative_eq!(*a, b, max_relative = 1e-12);
            assert_relative_eq!(*c, b, max_relative = 1e-12);
        }
        assert!(matches!(
            problem.to_point(&x[..4]),
            Err(InvalidConfiguration::DesignLength {
                expected: 5,
                actual: 4
            })
        ));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let model = model();
        let settings = DesignSettings {
            alpha_bounds: [5.0, -5.0],
            ..DesignSettings::default()
        };
        assert!(matches!(
            FuelBurn::new(&model, settings),
            Err(InvalidConfiguration::Bounds {
                name: "alpha_bounds"
            })
        ));
    }

    #[test]
    fn equal_bounds_fix_a_variable() {
        let settings = DesignSettings {
            alpha_bounds: [3.0, 3.0],
            ..DesignSettings::default()
        };
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn non_positive_scalers_are_rejected() {
        let settings = DesignSettings {
            thickness_scaler: 0.0,
            ..DesignSettings::default()
        };
        let error = settings.validate().unwrap_err();
        assert!(matches!(
            error,
            InvalidConfiguration::Setting {
                name: "thickness_scaler"
            }
        ));
        assert_eq!(
            error.to_string(),
            "design setting `thickness_scaler` must be positive and finite"
        );
    }
}
