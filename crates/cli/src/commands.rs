//! CLI command implementations.

use std::path::Path;

use anyhow::Context;
use spar_core::{Observer, OptimizationProblem};
use spar_observers::TracingObserver;
use spar_solvers::{coupled, optimization};
use spar_wing::{
    Aerostructural, FuelBurn, ProblemConfig, SurfaceState,
    design::{self, assume_worse_if_infeasible},
};
use tracing::info;

use crate::report::{AnalysisReport, OptimizationReport};

/// Writes the reference problem to `path`.
pub fn write_default(path: &Path) -> anyhow::Result<()> {
    let text = ProblemConfig::default().to_toml_string()?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "wrote reference problem");
    Ok(())
}

/// Runs one analysis at the initial design point.
pub fn analyze(path: &Path, json: bool) -> anyhow::Result<()> {
    let config = load(path)?;
    let model = config.model()?;

    let mut log = TracingObserver::new("analysis");
    let output = model.analyze_observed(
        &model.initial_point(),
        None,
        |event: &coupled::Event<'_, Vec<SurfaceState>>| log.observe(event),
    )?;

    let report = AnalysisReport::new(&output);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print();
    }
    Ok(())
}

/// Minimizes fuel burn from the initial design point.
pub fn optimize(path: &Path, json: bool) -> anyhow::Result<()> {
    let config = load(path)?;
    let model = config.model()?;
    let problem = FuelBurn::new(&model, config.design)?;
    let settings = config.optimizer_config()?;

    info!(
        variables = %describe(&problem),
        derivatives = ?config.design.derivatives,
        "starting optimization"
    );

    let mut log = TracingObserver::new("optimization");
    let observer = |event: &optimization::Event<'_, Aerostructural, FuelBurn<'_>>| {
        log.observe(event).or_else(|| assume_worse_if_infeasible(event))
    };
    let solution = design::optimize(&problem, &settings, observer)?;

    let report = OptimizationReport::new(&problem, &solution);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print();
    }
    Ok(())
}

fn load(path: &Path) -> anyhow::Result<ProblemConfig> {
    ProblemConfig::load(path).with_context(|| format!("loading {}", path.display()))
}

fn describe(problem: &FuelBurn<'_>) -> String {
    let variables: Vec<&str> = problem
        .design_variables()
        .iter()
        .map(|v| v.name.as_str())
        .collect();
    format!("{} ({} values)", variables.join(", "), problem.num_variables())
}
