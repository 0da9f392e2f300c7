use crate::{
    FlightCondition,
    geometry::{Mesh, chords, lerp, point},
    surface::Viscous,
};

/// Returns the skin-friction drag coefficient of a mesh.
///
/// Each strip gets a flat-plate friction coefficient blending laminar
/// (Blasius) and turbulent (Prandtl–Schlichting) flow at its chord Reynolds
/// number, scaled by a thickness and sweep form factor and applied to both
/// sides of the strip. The result is referenced to `s_ref`, which must use
/// the same half- or full-span convention as the mesh.
#[must_use]
pub fn skin_friction_drag(
    mesh: &Mesh,
    viscous: &Viscous,
    flight: &FlightCondition,
    s_ref: f64,
) -> f64 {
    let (nx, ny, _) = mesh.dim();
    let mach = flight.mach;
    let compressibility = (1.0 + 0.144 * mach * mach).powf(0.65);
    let turbulent = |re: f64| 0.455 / re.log10().powf(2.58) / compressibility;

    let node_chords = chords(mesh);
    let quarter: Vec<[f64; 3]> = (0..ny)
        .map(|j| lerp(point(mesh, 0, j), point(mesh, nx - 1, j), 0.25))
        .collect();

    let thickness_factor = 1.0
        + 0.6 / viscous.c_max_t * viscous.t_over_c
        + 100.0 * viscous.t_over_c.powi(4);

    let d_over_q: f64 = (0..ny - 1)
        .map(|j| {
            let chord = 0.5 * (node_chords[j] + node_chords[j + 1]);
            let dx = quarter[j + 1][0] - quarter[j][0];
            let dy = quarter[j + 1][1] - quarter[j][1];
            let dz = quarter[j + 1][2] - quarter[j][2];
            let width = (dy * dy + dz * dz).sqrt();
            let sweep = dx.abs().atan2(width);

            let re = flight.reynolds_per_length * chord;
            let mut cf = turbulent(re);
            if viscous.k_lam > 0.0 {
                let re_lam = re * viscous.k_lam;
                let laminar = 1.328 / re_lam.sqrt();
                let turbulent_lam = if viscous.k_lam < 1.0 { turbulent(re_lam) } else { 0.0 };
                cf += (laminar - turbulent_lam) * viscous.k_lam;
            }

            let form = thickness_factor * 1.34 * mach.powf(0.18) * sweep.cos().powf(0.28);
            2.0 * cf * chord * width * form
        })
        .sum();

    d_over_q / s_ref
}
