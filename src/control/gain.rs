use nalgebra::DMatrix;

use crate::control::error::ControlError;
use crate::control::sampled::SampledMatrixFunction;

/// Time-varying feedback gain K(t) = R^-1 B' S(t), sampled on the solve grid.
///
/// `rinv_bt` is the cached R^-1 B' product; R is constant over a solve, so it
/// is factored exactly once. Interpolation between nodes is linear and exact
/// at the nodes themselves.
#[derive(Debug, Clone)]
pub struct FeedbackGain {
    samples: SampledMatrixFunction,
}

impl FeedbackGain {
    pub fn new(rinv_bt: &DMatrix<f64>, s: &SampledMatrixFunction) -> FeedbackGain {
        let gains = (0..s.len()).map(|i| rinv_bt * s.node(i)).collect();
        FeedbackGain {
            samples: SampledMatrixFunction::new(s.start(), s.step(), gains),
        }
    }

    /// K at grid node `i` (m x n).
    pub fn node(&self, i: usize) -> &DMatrix<f64> {
        self.samples.node(i)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// K at time `t`, bounds-checked.
    pub fn at(&self, t: f64) -> Result<DMatrix<f64>, ControlError> {
        self.samples.eval(t)
    }

    /// K at time `t` for integrator callbacks whose query times are in-span
    /// by construction.
    pub(crate) fn at_clamped(&self, t: f64) -> DMatrix<f64> {
        self.samples.eval_clamped(t)
    }
}
