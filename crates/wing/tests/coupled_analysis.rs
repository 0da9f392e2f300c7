use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndarray::Array3;
use spar_core::{CoupledProblem, Model, Observer};
use spar_observers::ResidualHistory;
use spar_solvers::coupled::{Event, NonlinearSolver, Phase, gauss_seidel, newton};
use spar_wing::{
    Aerostructural, DesignPoint, Discipline, Error, FlightCondition, MissionError,
    SurfaceDefinition, SurfaceSizing, SurfaceState, performance, structures::DOF,
};
use uom::si::{angle::degree, f64::Angle};

fn reference(solver: NonlinearSolver) -> Aerostructural {
    let wing = SurfaceDefinition::rectangular("wing").unwrap();
    Aerostructural::new(vec![wing], FlightCondition::default(), solver).unwrap()
}

fn flat_point(alpha_deg: f64) -> DesignPoint {
    DesignPoint {
        surfaces: vec![SurfaceSizing {
            twist_cp: vec![0.0, 0.0],
            thickness_cp: vec![0.075, 0.075],
        }],
        alpha: Angle::new::<degree>(alpha_deg),
    }
}

#[test]
fn flat_wing_at_zero_alpha_is_undeformed_and_safe() {
    let model = reference(NonlinearSolver::default());
    let analysis = model.prepare(&flat_point(0.0)).unwrap();
    let solution = model.solver().solve(&analysis, ()).unwrap();

    assert!(solution.converged());
    for u in &solution.coupling {
        assert_abs_diff_eq!(*u, 0.0, epsilon = 1e-12);
    }
    let wing = performance::evaluate(
        &analysis.surfaces()[0],
        &solution.state[0],
        analysis.structures(),
        analysis.flight(),
    );
    assert!(wing.failure < 0.0, "failure = {}", wing.failure);
    assert!(wing.thickness_intersects.iter().all(|v| *v <= 0.0));
    assert_abs_diff_eq!(wing.cl, 0.0, epsilon = 1e-12);
    assert!(wing.cd > 0.0);
}

#[test]
fn flat_wing_without_lift_cannot_fly_the_mission() {
    let model = reference(NonlinearSolver::default());

    match model.analyze(&flat_point(0.0)) {
        Err(Error::Mission(MissionError::NoLift { cl })) => {
            assert_abs_diff_eq!(cl, 0.0, epsilon = 1e-12);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(output) => panic!("expected no lift, got {:?}", output.mission),
    }

    let error = model.analyze(&flat_point(-3.0)).unwrap_err();
    assert!(
        matches!(error, Error::Mission(MissionError::NoLift { cl }) if cl < 0.0),
        "unexpected error: {error}"
    );
    assert!(error.is_infeasible());
    assert!(!error.is_singular());
}

#[test]
fn lifting_flat_wing_reports_a_physical_mission() {
    let model = reference(NonlinearSolver::default());
    let output = model.analyze(&flat_point(5.0)).unwrap();
    let mission = &output.mission;

    assert!(mission.cl > 0.0);
    assert!(mission.fuel_burn.is_finite() && mission.fuel_burn > 0.0);
    assert!(mission.l_equals_w.is_finite() && mission.l_equals_w > -1.0);
    assert!(mission.weight > mission.structural_weight);
}

#[test]
fn reference_analysis_converges_with_lift() {
    let model = reference(NonlinearSolver::default());
    let output = model.call(&model.initial_point()).unwrap();

    assert!(output.converged());
    assert_eq!(output.record.phase(), Phase::Converged);
    assert_eq!(output.coupling.len(), 3 * DOF);

    let wing = &output.performance[0];
    assert!(wing.cl > 0.0);
    assert!(wing.cd > wing.cdi);
    assert!(wing.structural_weight > 0.0);
    assert_eq!(wing.cg[1], 0.0);
    assert!(output.mission.fuel_burn.is_finite() && output.mission.fuel_burn > 0.0);
    assert!(output.mission.l_equals_w.is_finite());

    // The tip bends upward under positive lift.
    let tip_heave = output.coupling[2];
    assert!(tip_heave > 0.0, "tip heave = {tip_heave}");
}

#[test]
fn restarting_from_a_converged_state_reproduces_it() {
    let model = reference(NonlinearSolver::default());
    let point = model.initial_point();
    let first = model.analyze(&point).unwrap();
    let again = model.analyze_from(&point, first.coupling.clone()).unwrap();

    assert!(again.converged());
    assert!(again.record.iterations() <= first.record.iterations());
    for (a, b) in again.coupling.iter().zip(&first.coupling) {
        assert_relative_eq!(*a, *b, epsilon = 1e-9, max_relative = 1e-8);
    }
    assert_relative_eq!(
        again.mission.fuel_burn,
        first.mission.fuel_burn,
        max_relative = 1e-8
    );
}

#[test]
fn load_transfer_conserves_work() {
    let model = reference(NonlinearSolver::default());
    let analysis = model.prepare(&model.initial_point()).unwrap();
    let transfer = &analysis.surfaces()[0].transfer;

    let forces = Array3::from_shape_fn((1, 2, 3), |(i, j, d)| {
        ((3 * j + d + i) as f64 * 0.7).sin() * 1e3
    });
    let displacements: Vec<f64> = (0..transfer.num_dofs())
        .map(|k| (k as f64 * 1.3).cos() * 1e-2)
        .collect();

    let structural: f64 = transfer
        .structural_loads(&forces)
        .iter()
        .zip(&displacements)
        .map(|(f, u)| f * u)
        .sum();
    let aerodynamic: f64 = transfer
        .load_point_displacements(&displacements)
        .iter()
        .zip(forces.iter())
        .map(|(u, f)| f * u)
        .sum();

    assert_relative_eq!(structural, aerodynamic, max_relative = 1e-12);
}

#[test]
fn more_iterations_never_increase_the_residual() {
    let residuals: Vec<f64> = (1..=4)
        .map(|max_iters| {
            let config = gauss_seidel::Config::new(max_iters, 0.0, 0.0).unwrap();
            let model = reference(NonlinearSolver::GaussSeidel(config));
            let output = model.analyze(&model.initial_point()).unwrap();
            assert_eq!(output.record.phase(), Phase::MaxIterExceeded);
            output.record.final_residual().unwrap()
        })
        .collect();

    for pair in residuals.windows(2) {
        assert!(pair[1] <= pair[0], "residuals: {residuals:?}");
    }
}

#[test]
fn residual_history_tracks_every_sweep() {
    let model = reference(NonlinearSolver::default());
    let mut history = ResidualHistory::new();
    let output = model
        .analyze_observed(
            &model.initial_point(),
            None,
            |event: &Event<'_, Vec<SurfaceState>>| history.observe(event),
        )
        .unwrap();

    assert_eq!(history.residuals(), output.record.residuals());
}

#[test]
fn newton_matches_gauss_seidel() {
    let fixed_point = reference(NonlinearSolver::default());
    let newton = reference(NonlinearSolver::Newton(newton::Config::default()));
    let point = fixed_point.initial_point();

    let a = fixed_point.analyze(&point).unwrap();
    let b = newton.analyze(&point).unwrap();

    assert!(b.converged());
    for (u, v) in a.coupling.iter().zip(&b.coupling) {
        assert_relative_eq!(*u, *v, epsilon = 1e-8, max_relative = 1e-6);
    }
}

#[test]
fn zero_thickness_is_a_singular_structure() {
    let model = reference(NonlinearSolver::default());
    let mut point = model.initial_point();
    point.surfaces[0].thickness_cp = vec![0.0, 0.0];

    match model.analyze(&point) {
        Err(Error::SingularSystem {
            discipline,
            surface,
        }) => {
            assert_eq!(discipline, Discipline::Structural);
            assert_eq!(surface, "wing");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(output) => panic!("expected a singular system, got {:?}", output.mission),
    }
}

#[test]
fn mismatched_sizing_is_rejected_before_solving() {
    let model = reference(NonlinearSolver::default());
    let mut point = model.initial_point();
    point.surfaces.push(point.surfaces[0].clone());

    let error = model.analyze(&point).unwrap_err();
    assert!(matches!(error, Error::InvalidConfiguration(_)));
    assert!(!error.is_singular());
}

#[test]
fn two_surfaces_share_one_coupling_vector() {
    let wing = SurfaceDefinition::rectangular("wing").unwrap();
    let mut tail = SurfaceDefinition::rectangular("tail").unwrap();
    for x in tail.mesh.slice_mut(ndarray::s![.., .., 0]).iter_mut() {
        *x += 20.0;
    }
    let model = Aerostructural::new(
        vec![wing, tail],
        FlightCondition::default(),
        NonlinearSolver::default(),
    )
    .unwrap();

    let analysis = model.prepare(&model.initial_point()).unwrap();
    assert_eq!(analysis.num_coupling(), 2 * 3 * DOF);
    assert_eq!(analysis.initial_coupling().len(), 36);

    let output = model.analyze(&model.initial_point()).unwrap();
    assert_eq!(output.performance.len(), 2);
    assert!(output.performance.iter().all(|p| p.cl.is_finite()));
}
