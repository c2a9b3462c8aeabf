use nalgebra::DMatrix;
use tracing::debug;

use crate::control::grid::TimeGrid;
use crate::control::sampled::SampledMatrixFunction;
use crate::ode::{integrate_backward, Rk45};
use crate::utils::packing::{flatten, unflatten};

/// Solve the matrix Riccati equation
///
///   dS/dt = -(A' S + S A - S B R^-1 B' S + phi)
///
/// backward from `S(grid.end()) = terminal`, returning S sampled on the grid
/// in ascending time order. `phi` is C'QC for the tracker and Q for the
/// regulator; `b_rinv_bt` is the constant product B R^-1 B'.
pub fn solve_riccati(
    a: &DMatrix<f64>,
    phi: &DMatrix<f64>,
    b_rinv_bt: &DMatrix<f64>,
    terminal: &DMatrix<f64>,
    grid: &TimeGrid,
    rk: &Rk45,
) -> SampledMatrixFunction {
    let n = a.nrows();
    let at = a.transpose();

    let samples = integrate_backward(
        rk,
        |_t, y| {
            let s = unflatten(y, n, n);
            let ds = -(&at * &s + &s * a - &s * b_rinv_bt * &s + phi);
            flatten(&ds)
        },
        grid.samples(),
        &flatten(terminal),
    );
    debug!(nodes = samples.len(), n, "riccati backward sweep complete");

    let matrices = samples.iter().map(|y| unflatten(y, n, n)).collect();
    SampledMatrixFunction::new(grid.start(), grid.step(), matrices)
}
