use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::control::costate::{
    solve_regulator_costate, solve_terminal_correction, solve_tracker_costate,
};
use crate::control::error::ControlError;
use crate::control::gain::FeedbackGain;
use crate::control::grid::TimeGrid;
use crate::control::riccati::solve_riccati;
use crate::control::sampled::{SampledMatrixFunction, SampledVectorFunction};
use crate::control::system::{check_len, ControlLaw, LinearSystem, LqrProblem, LqtProblem};
use crate::ode::Rk45;

/// Closed-loop state history over the solve horizon.
///
/// `time` echoes the solve grid exactly; `states` holds one state vector per
/// time sample. Built once per solve, never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Trajectory {
    pub time: Vec<f64>,
    pub states: Vec<DVector<f64>>,
}

/// The assembled feedback law u(t, x) = -L(t) x + w(t), sampled per node and
/// linearly interpolated by the forward simulation. Assembly happens before
/// the simulation starts, so every fallible piece (the correction inverse) is
/// resolved up front and the integrator callback is total.
struct AssembledLaw {
    l: SampledMatrixFunction,
    w: SampledVectorFunction,
}

impl AssembledLaw {
    fn input(&self, t: f64, x: &DVector<f64>) -> DVector<f64> {
        self.w.eval_clamped(t) - self.l.eval_clamped(t) * x
    }
}

/// Finite-horizon linear quadratic solver.
///
/// Owns the integrator used for every sweep; each call to [`solve`] runs the
/// full backward-then-forward pipeline and owns its sampled arrays, so one
/// solver may be reused across solves without shared state.
///
/// [`solve`]: LqSolver::solve
#[derive(Debug, Clone, Copy, Default)]
pub struct LqSolver {
    pub ode: Rk45,
}

impl LqSolver {
    pub fn new(ode: Rk45) -> LqSolver {
        LqSolver { ode }
    }

    /// Compute the optimal closed-loop trajectory for `law` on `sys`,
    /// starting from `init_state` over `grid`.
    pub fn solve(
        &self,
        sys: &LinearSystem,
        law: &ControlLaw,
        grid: &TimeGrid,
        init_state: &DVector<f64>,
    ) -> Result<Trajectory, ControlError> {
        law.validate(sys)?;
        check_len("initial state", init_state, sys.n())?;
        debug!(control_type = %law.control_type(), n = sys.n(), m = sys.m(), p = sys.p(),
               nodes = grid.len(), "solve started");

        if grid.len() == 1 {
            // degenerate horizon: nothing to steer, echo the initial state
            return Ok(Trajectory {
                time: grid.samples().to_vec(),
                states: vec![init_state.clone()],
            });
        }

        // R is constant over the solve: factor it exactly once
        let r_inv = law
            .r()
            .clone()
            .try_inverse()
            .ok_or_else(|| ControlError::SingularMatrix { name: "R".to_owned() })?;
        let rinv_bt = &r_inv * sys.b.transpose();
        let b_rinv_bt = &sys.b * &rinv_bt;

        let assembled = match law {
            ControlLaw::Lqr(problem) => self.lqr_law(sys, problem, &rinv_bt, &b_rinv_bt, grid)?,
            ControlLaw::Lqt(problem) => self.lqt_law(sys, problem, &rinv_bt, &b_rinv_bt, grid)?,
        };

        let trajectory = self.simulate(sys, &assembled, grid, init_state);
        debug!(nodes = trajectory.time.len(), "solve finished");
        Ok(trajectory)
    }

    /// Regulator pipeline: Riccati -> gain -> (costate -> correction when a
    /// terminal target is present) -> assembled law.
    fn lqr_law(
        &self,
        sys: &LinearSystem,
        problem: &LqrProblem,
        rinv_bt: &DMatrix<f64>,
        b_rinv_bt: &DMatrix<f64>,
        grid: &TimeGrid,
    ) -> Result<AssembledLaw, ControlError> {
        let s = solve_riccati(&sys.a, &problem.q, b_rinv_bt, &problem.terminal, grid, &self.ode);
        let gain = FeedbackGain::new(rinv_bt, &s);

        let Some(target) = &problem.target else {
            // pure Riccati feedback u = -K(t) x
            let nodes = grid.len();
            let l = (0..nodes).map(|i| gain.node(i).clone()).collect();
            let w = (0..nodes).map(|_| DVector::zeros(sys.m())).collect();
            return Ok(AssembledLaw {
                l: SampledMatrixFunction::new(grid.start(), grid.step(), l),
                w: SampledVectorFunction::new(grid.start(), grid.step(), w),
            });
        };

        let v = solve_regulator_costate(sys, &gain, grid, &self.ode);
        let correction = solve_terminal_correction(&v, b_rinv_bt, grid, &self.ode);

        // u = -(K + R^-1 B' V P^-1 V') x + R^-1 B' V P^-1 target.
        // P(end) = 0 by construction, so the last node reuses the penultimate
        // node's correction (one-sided limit from below).
        let nodes = grid.len();
        let mut l = Vec::with_capacity(nodes);
        let mut w = Vec::with_capacity(nodes);
        for i in 0..nodes {
            let j = if i == nodes - 1 { nodes - 2 } else { i };
            let p_inv = correction.node(j).clone().try_inverse().ok_or_else(|| {
                ControlError::SingularMatrix {
                    name: format!("terminal correction P at t = {}", grid.samples()[j]),
                }
            })?;
            let v_j = v.node(j);
            let rb_v_pinv = rinv_bt * v_j * p_inv;
            l.push(gain.node(i) + &rb_v_pinv * v_j.transpose());
            w.push(&rb_v_pinv * target);
        }
        debug!("regulator law assembled with terminal correction");
        Ok(AssembledLaw {
            l: SampledMatrixFunction::new(grid.start(), grid.step(), l),
            w: SampledVectorFunction::new(grid.start(), grid.step(), w),
        })
    }

    /// Tracker pipeline: Riccati -> gain -> costate -> assembled law.
    fn lqt_law(
        &self,
        sys: &LinearSystem,
        problem: &LqtProblem,
        rinv_bt: &DMatrix<f64>,
        b_rinv_bt: &DMatrix<f64>,
        grid: &TimeGrid,
    ) -> Result<AssembledLaw, ControlError> {
        check_len(
            "reference output",
            &problem.reference.output(grid.start()),
            sys.p(),
        )?;

        let phi = sys.c.transpose() * &problem.q * &sys.c;
        let terminal_s = sys.c.transpose() * &problem.terminal * &sys.c;
        let s = solve_riccati(&sys.a, &phi, b_rinv_bt, &terminal_s, grid, &self.ode);
        let gain = FeedbackGain::new(rinv_bt, &s);

        let v = solve_tracker_costate(
            sys,
            &problem.q,
            &problem.terminal,
            problem.reference.as_ref(),
            &gain,
            grid,
            &self.ode,
        );

        // u = -K(t) x + R^-1 B' V(t)
        let nodes = grid.len();
        let l = (0..nodes).map(|i| gain.node(i).clone()).collect();
        let w = (0..nodes).map(|i| rinv_bt * v.node(i)).collect();
        Ok(AssembledLaw {
            l: SampledMatrixFunction::new(grid.start(), grid.step(), l),
            w: SampledVectorFunction::new(grid.start(), grid.step(), w),
        })
    }

    /// Forward closed-loop rollout x' = A x + B u(t, x) over the grid.
    fn simulate(
        &self,
        sys: &LinearSystem,
        law: &AssembledLaw,
        grid: &TimeGrid,
        init_state: &DVector<f64>,
    ) -> Trajectory {
        let states = self.ode.solve(
            |t, x| &sys.a * x + &sys.b * law.input(t, x),
            grid.samples(),
            init_state,
        );
        debug!("forward simulation complete");
        Trajectory {
            time: grid.samples().to_vec(),
            states,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LqSolver;
    use crate::control::error::ControlError;
    use crate::control::grid::TimeGrid;
    use crate::control::system::{ControlLaw, LinearSystem, LqrProblem, LqtProblem};
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, DVector};

    fn double_integrator() -> LinearSystem {
        LinearSystem::new(
            DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 0.0, 0.0]),
            DMatrix::from_row_slice(2, 1, &[0.0, 1.0]),
            DMatrix::from_row_slice(1, 2, &[1.0, 0.0]),
            DMatrix::zeros(1, 1),
        )
        .unwrap()
    }

    #[test]
    fn time_echoes_the_grid_exactly() {
        let sys = double_integrator();
        let grid = TimeGrid::new(0.0, 1.0, 0.1).unwrap();
        let law = ControlLaw::Lqt(LqtProblem {
            q: DMatrix::identity(1, 1),
            r: DMatrix::identity(1, 1),
            terminal: DMatrix::identity(1, 1),
            reference: Box::new(|_t: f64| DVector::zeros(1)),
        });
        let x0 = DVector::from_column_slice(&[1.0, 0.0]);
        let traj = LqSolver::default().solve(&sys, &law, &grid, &x0).unwrap();
        assert_eq!(traj.time, grid.samples());
        assert_eq!(traj.states.len(), grid.len());
    }

    #[test]
    fn trivial_system_stays_at_rest() {
        // n = 1, A = 0, B = 1, Q = 0, R = 1, terminal 0, x0 = 0:
        // the optimal input is identically zero and so is the state
        let sys = LinearSystem::new(
            DMatrix::zeros(1, 1),
            DMatrix::identity(1, 1),
            DMatrix::identity(1, 1),
            DMatrix::zeros(1, 1),
        )
        .unwrap();
        let grid = TimeGrid::new(0.0, 1.0, 0.1).unwrap();
        let law = ControlLaw::Lqr(LqrProblem {
            q: DMatrix::zeros(1, 1),
            r: DMatrix::identity(1, 1),
            terminal: DMatrix::zeros(1, 1),
            target: None,
        });
        let traj = LqSolver::default()
            .solve(&sys, &law, &grid, &DVector::zeros(1))
            .unwrap();
        for x in &traj.states {
            assert_eq!(x[0], 0.0);
        }
    }

    #[test]
    fn tracker_with_zero_reference_matches_regulator() {
        // with C = I the tracker weights C'QC = Q and C'PC = P; a zero
        // reference kills the feedforward, leaving exactly the regulator law
        let sys = LinearSystem::new(
            DMatrix::from_row_slice(2, 2, &[0.0, 1.0, -1.0, -0.5]),
            DMatrix::from_row_slice(2, 1, &[0.0, 1.0]),
            DMatrix::identity(2, 2),
            DMatrix::zeros(2, 1),
        )
        .unwrap();
        let grid = TimeGrid::new(0.0, 2.0, 0.05).unwrap();
        let q = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 2.0]);
        let p = DMatrix::from_row_slice(2, 2, &[3.0, 0.0, 0.0, 1.0]);
        let x0 = DVector::from_column_slice(&[1.0, -0.5]);

        let tracker = ControlLaw::Lqt(LqtProblem {
            q: q.clone(),
            r: DMatrix::identity(1, 1),
            terminal: p.clone(),
            reference: Box::new(|_t: f64| DVector::zeros(2)),
        });
        let regulator = ControlLaw::Lqr(LqrProblem {
            q,
            r: DMatrix::identity(1, 1),
            terminal: p,
            target: None,
        });

        let solver = LqSolver::default();
        let a = solver.solve(&sys, &tracker, &grid, &x0).unwrap();
        let b = solver.solve(&sys, &regulator, &grid, &x0).unwrap();
        for (xa, xb) in a.states.iter().zip(&b.states) {
            assert_relative_eq!(*xa, *xb, epsilon = 1e-10);
        }
    }

    #[test]
    fn regulator_hits_terminal_output_target() {
        // minimum-energy steering of a double integrator (Q = 0, ST = 0) to
        // position 1: along the analytic optimum x1(t) = a(tf t^2/2 - t^3/6)
        // with a = 3/tf^3
        let sys = double_integrator();
        let tf = 1.0;
        let grid = TimeGrid::new(0.0, tf, 0.02).unwrap();
        let law = ControlLaw::Lqr(LqrProblem {
            q: DMatrix::zeros(2, 2),
            r: DMatrix::identity(1, 1),
            terminal: DMatrix::zeros(2, 2),
            target: Some(DVector::from_element(1, 1.0)),
        });
        let traj = LqSolver::default()
            .solve(&sys, &law, &grid, &DVector::zeros(2))
            .unwrap();

        let alpha = 3.0 / tf.powi(3);
        let mid = &traj.states[grid.len() / 2];
        let t = traj.time[grid.len() / 2];
        assert_relative_eq!(
            mid[0],
            alpha * (tf * t * t / 2.0 - t.powi(3) / 6.0),
            epsilon = 0.02
        );
        let last = traj.states.last().unwrap();
        assert_relative_eq!(last[0], 1.0, epsilon = 0.05);
    }

    #[test]
    fn tracker_settles_on_analytic_level() {
        // scalar plant x' = -x + u, C = 1, Q = 5, R = 1: the stationary
        // Riccati value is sqrt(6) - 1, the closed-loop pole -sqrt(6), and a
        // unit reference settles at 5/6 in mid-horizon
        let sys = LinearSystem::new(
            DMatrix::from_element(1, 1, -1.0),
            DMatrix::identity(1, 1),
            DMatrix::identity(1, 1),
            DMatrix::zeros(1, 1),
        )
        .unwrap();
        let grid = TimeGrid::new(0.0, 10.0, 0.05).unwrap();
        let law = ControlLaw::Lqt(LqtProblem {
            q: DMatrix::from_element(1, 1, 5.0),
            r: DMatrix::identity(1, 1),
            terminal: DMatrix::from_element(1, 1, 5.0),
            reference: Box::new(|_t: f64| DVector::from_element(1, 1.0)),
        });
        let traj = LqSolver::default()
            .solve(&sys, &law, &grid, &DVector::zeros(1))
            .unwrap();

        let mid = grid.len() / 2;
        assert_relative_eq!(traj.states[mid][0], 5.0 / 6.0, epsilon = 1e-3);
    }

    #[test]
    fn singular_r_is_rejected() {
        let sys = double_integrator();
        let grid = TimeGrid::new(0.0, 1.0, 0.1).unwrap();
        let law = ControlLaw::Lqr(LqrProblem {
            q: DMatrix::zeros(2, 2),
            r: DMatrix::zeros(1, 1),
            terminal: DMatrix::zeros(2, 2),
            target: None,
        });
        let err = LqSolver::default()
            .solve(&sys, &law, &grid, &DVector::zeros(2))
            .unwrap_err();
        assert!(matches!(err, ControlError::SingularMatrix { name } if name == "R"));
    }

    #[test]
    fn mismatched_cost_shape_is_rejected() {
        let sys = double_integrator();
        let grid = TimeGrid::new(0.0, 1.0, 0.1).unwrap();
        let law = ControlLaw::Lqr(LqrProblem {
            q: DMatrix::zeros(3, 3),
            r: DMatrix::identity(1, 1),
            terminal: DMatrix::zeros(2, 2),
            target: None,
        });
        let err = LqSolver::default()
            .solve(&sys, &law, &grid, &DVector::zeros(2))
            .unwrap_err();
        assert!(matches!(err, ControlError::ShapeMismatch { name: "Q", .. }));
    }

    #[test]
    fn mismatched_initial_state_is_rejected() {
        let sys = double_integrator();
        let grid = TimeGrid::new(0.0, 1.0, 0.1).unwrap();
        let law = ControlLaw::Lqr(LqrProblem {
            q: DMatrix::zeros(2, 2),
            r: DMatrix::identity(1, 1),
            terminal: DMatrix::zeros(2, 2),
            target: None,
        });
        let err = LqSolver::default()
            .solve(&sys, &law, &grid, &DVector::zeros(3))
            .unwrap_err();
        assert!(matches!(
            err,
            ControlError::ShapeMismatch { name: "initial state", .. }
        ));
    }

    #[test]
    fn degenerate_horizon_echoes_initial_state() {
        let sys = double_integrator();
        let grid = TimeGrid::new(1.0, 1.0, 0.1).unwrap();
        let law = ControlLaw::Lqr(LqrProblem {
            q: DMatrix::zeros(2, 2),
            r: DMatrix::identity(1, 1),
            terminal: DMatrix::zeros(2, 2),
            target: None,
        });
        let x0 = DVector::from_column_slice(&[0.5, -0.5]);
        let traj = LqSolver::default().solve(&sys, &law, &grid, &x0).unwrap();
        assert_eq!(traj.time, vec![1.0]);
        assert_eq!(traj.states, vec![x0]);
    }
}
