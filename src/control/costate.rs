use nalgebra::DMatrix;
use tracing::debug;

use crate::control::gain::FeedbackGain;
use crate::control::grid::TimeGrid;
use crate::control::sampled::{SampledMatrixFunction, SampledVectorFunction};
use crate::control::system::{LinearSystem, ReferenceSignal};
use crate::ode::{integrate_backward, Rk45};
use crate::utils::packing::{flatten, unflatten};

/// Tracker costate: solve
///
///   dV/dt = -((A - B K(t))' V + C' Q r(t))
///
/// backward from `V(grid.end()) = C' P r(end)`, sampled ascending. V feeds the
/// feedforward part of the tracking law.
pub fn solve_tracker_costate(
    sys: &LinearSystem,
    q: &DMatrix<f64>,
    terminal_weight: &DMatrix<f64>,
    reference: &dyn ReferenceSignal,
    gain: &FeedbackGain,
    grid: &TimeGrid,
    rk: &Rk45,
) -> SampledVectorFunction {
    let ct = sys.c.transpose();
    let ct_q = &ct * q;
    let terminal = &ct * terminal_weight * reference.output(grid.end());

    let samples = integrate_backward(
        rk,
        |t, v| {
            let acl_t = (&sys.a - &sys.b * gain.at_clamped(t)).transpose();
            -(acl_t * v + &ct_q * reference.output(t))
        },
        grid.samples(),
        &terminal,
    );
    debug!(nodes = samples.len(), "tracker costate sweep complete");
    SampledVectorFunction::new(grid.start(), grid.step(), samples)
}

/// Regulator costate (terminal constraint engaged): matrix form of the same
/// homogeneous equation,
///
///   dV/dt = -(A - B K(t))' V
///
/// backward from `V(grid.end()) = C'` (n x p). Columns propagate the terminal
/// output constraint back through the closed loop.
pub fn solve_regulator_costate(
    sys: &LinearSystem,
    gain: &FeedbackGain,
    grid: &TimeGrid,
    rk: &Rk45,
) -> SampledMatrixFunction {
    let (n, p) = (sys.n(), sys.p());
    let terminal = sys.c.transpose();

    let samples = integrate_backward(
        rk,
        |t, y| {
            let v = unflatten(y, n, p);
            let acl_t = (&sys.a - &sys.b * gain.at_clamped(t)).transpose();
            flatten(&-(acl_t * v))
        },
        grid.samples(),
        &flatten(&terminal),
    );
    debug!(nodes = samples.len(), "regulator costate sweep complete");

    let matrices = samples.iter().map(|y| unflatten(y, n, p)).collect();
    SampledMatrixFunction::new(grid.start(), grid.step(), matrices)
}

/// Terminal-correction matrix: solve
///
///   dP/dt = -V(t)' B R^-1 B' V(t)
///
/// backward from `P(grid.end()) = 0` (p x p). P measures the reachability gap
/// to the exact terminal output target; the law uses its inverse, so P must be
/// invertible at every queried node strictly before the end of the horizon.
pub fn solve_terminal_correction(
    v: &SampledMatrixFunction,
    b_rinv_bt: &DMatrix<f64>,
    grid: &TimeGrid,
    rk: &Rk45,
) -> SampledMatrixFunction {
    let p = v.node(0).ncols();
    let terminal = DMatrix::zeros(p, p);

    let samples = integrate_backward(
        rk,
        |t, _y| {
            let vt = v.eval_clamped(t);
            flatten(&-(vt.transpose() * b_rinv_bt * vt))
        },
        grid.samples(),
        &flatten(&terminal),
    );
    debug!(nodes = samples.len(), "terminal correction sweep complete");

    let matrices = samples.iter().map(|y| unflatten(y, p, p)).collect();
    SampledMatrixFunction::new(grid.start(), grid.step(), matrices)
}
