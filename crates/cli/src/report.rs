//! Human and JSON reports for the CLI commands.

use serde::Serialize;
use spar_core::OptimizationProblem;
use spar_solvers::optimization::Solution;
use spar_wing::{AnalysisOutput, DesignPoint, FuelBurn, Mission, SurfacePerformance};

/// Outcome of one coupled analysis.
#[derive(Debug, Serialize)]
pub struct AnalysisReport<'a> {
    pub solver: String,
    pub converged: bool,
    pub phase: String,
    pub iterations: usize,
    pub final_residual: Option<f64>,
    pub surfaces: &'a [SurfacePerformance],
    pub mission: &'a Mission,
}

impl<'a> AnalysisReport<'a> {
    pub fn new(output: &'a AnalysisOutput) -> Self {
        let record = &output.record;
        Self {
            solver: record.method().to_string(),
            converged: record.converged(),
            phase: format!("{:?}", record.phase()),
            iterations: record.iterations(),
            final_residual: record.final_residual(),
            surfaces: &output.performance,
            mission: &output.mission,
        }
    }

    pub fn print(&self) {
        println!(
            "coupled solve ({}): {} after {} iterations, residual {}",
            self.solver,
            self.phase,
            self.iterations,
            self.final_residual
                .map_or_else(|| "n/a".to_string(), |r| format!("{r:.3e}")),
        );
        for surface in self.surfaces {
            println!();
            println!("[{}]", surface.name);
            println!("  CL                 {:>12.5}", surface.cl);
            println!("  CD                 {:>12.5}", surface.cd);
            println!("    induced          {:>12.5}", surface.cdi);
            println!("    viscous          {:>12.5}", surface.cdv);
            println!("  failure            {:>12.5}", surface.failure);
            println!("  structural weight  {:>12.1} N", surface.structural_weight);
            println!(
                "  max thickness gap  {:>12.5} m",
                surface
                    .thickness_intersects
                    .iter()
                    .copied()
                    .fold(f64::NEG_INFINITY, f64::max)
            );
        }
        let mission = self.mission;
        println!();
        println!("[mission]");
        println!("  fuel burn          {:>12.2} kg", mission.fuel_burn);
        println!("  L/W - 1            {:>12.5}", mission.l_equals_w);
        println!("  CL                 {:>12.5}", mission.cl);
        println!("  CD                 {:>12.5}", mission.cd);
        println!(
            "  CG                 [{:.3}, {:.3}, {:.3}] m",
            mission.cg[0], mission.cg[1], mission.cg[2]
        );
    }
}

/// A named slice of the final design vector.
#[derive(Debug, Serialize)]
pub struct NamedVariable<'a> {
    pub name: &'a str,
    pub values: &'a [f64],
}

/// Outcome of a fuel-burn optimization.
#[derive(Debug, Serialize)]
pub struct OptimizationReport<'a> {
    pub status: String,
    pub optimizer: String,
    pub outer_iterations: usize,
    pub evaluations: usize,
    pub objective: f64,
    pub violation: f64,
    pub stationarity: f64,
    pub design: Vec<NamedVariable<'a>>,
    pub analysis: AnalysisReport<'a>,
}

impl<'a> OptimizationReport<'a> {
    pub fn new(
        problem: &'a FuelBurn<'_>,
        solution: &'a Solution<DesignPoint, AnalysisOutput>,
    ) -> Self {
        let mut offset = 0;
        let design = problem
            .design_variables()
            .iter()
            .map(|variable| {
                let values = &solution.x[offset..offset + variable.size];
                offset += variable.size;
                NamedVariable {
                    name: variable.name.as_str(),
                    values,
                }
            })
            .collect();

        Self {
            status: format!("{:?}", solution.status),
            optimizer: format!("{:?}", solution.optimizer),
            outer_iterations: solution.iters,
            evaluations: solution.evaluations,
            objective: solution.objective,
            violation: solution.violation,
            stationarity: solution.stationarity,
            design,
            analysis: AnalysisReport::new(&solution.snapshot.output),
        }
    }

    pub fn print(&self) {
        println!(
            "optimizer ({}): {} after {} outer iterations, {} evaluations",
            self.optimizer, self.status, self.outer_iterations, self.evaluations
        );
        println!("  fuel burn          {:>12.2} kg", self.objective);
        println!("  violation          {:>12.3e}", self.violation);
        println!("  stationarity       {:>12.3e}", self.stationarity);
        println!();
        println!("[design]");
        for variable in &self.design {
            let values: Vec<String> = variable.values.iter().map(|v| format!("{v:.5}")).collect();
            println!("  {:<24} [{}]", variable.name, values.join(", "));
        }
        println!();
        self.analysis.print();
    }
}
