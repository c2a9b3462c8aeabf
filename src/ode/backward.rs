use nalgebra::DVector;

use crate::ode::Rk45;

/// Integrate `dy/dt = f(t, y)` backward from `y(times.last()) = terminal`,
/// returning the state at every entry of the ascending `times` sequence.
///
/// Callers work entirely in forward time: `f` receives the actual time
/// `t` in `[times[0], times.last()]` and the returned samples satisfy
/// `out[i] = y(times[i])`, with `out.last()` the terminal condition itself.
///
/// Internally the sweep runs over the substituted axis tau = -t, which is
/// ascending when `times` is reversed, and the sample order is flipped back
/// afterwards. `f` is never invoked outside the span of `times`.
pub fn integrate_backward<F>(
    rk: &Rk45,
    mut f: F,
    times: &[f64],
    terminal: &DVector<f64>,
) -> Vec<DVector<f64>>
where
    F: FnMut(f64, &DVector<f64>) -> DVector<f64>,
{
    // tau = -t: z(tau) = y(-tau)  =>  dz/dtau = -f(-tau, z)
    let tau: Vec<f64> = times.iter().rev().map(|t| -t).collect();
    let mut samples = rk.solve(|tau, z| -f(-tau, z), &tau, terminal);
    samples.reverse();
    samples
}
