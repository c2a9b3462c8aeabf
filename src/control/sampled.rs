//! Backward-solve products sampled on the solve grid.
//!
//! Entry `i` always corresponds to grid sample `i` (ascending time), whatever
//! direction the producing sweep ran in. Evaluation between nodes is linear
//! interpolation on the floor/ceil neighbor pair; queries landing on a node
//! (up to float fuzz) return the node value exactly.

use nalgebra::{DMatrix, DVector};

use crate::control::error::ControlError;

/// Relative distance to a node under which a query snaps to it.
const NODE_SNAP: f64 = 1e-9;

/// Floor/ceil indices and fractional weight for a query time, or `None` when
/// the query lies outside the sampled span.
fn locate(start: f64, step: f64, len: usize, t: f64) -> Option<(usize, usize, f64)> {
    let pos = (t - start) / step;
    let nearest = pos.round();
    if (pos - nearest).abs() <= NODE_SNAP * nearest.abs().max(1.0) {
        let i = nearest as isize;
        if i < 0 || i as usize >= len {
            return None;
        }
        return Some((i as usize, i as usize, 0.0));
    }
    if pos < 0.0 || pos > (len - 1) as f64 {
        return None;
    }
    let i0 = pos.floor() as usize;
    Some((i0, i0 + 1, pos - i0 as f64))
}

macro_rules! sampled_function {
    ($name:ident, $value:ty, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone)]
        pub struct $name {
            start: f64,
            step: f64,
            samples: Vec<$value>,
        }

        impl $name {
            pub fn new(start: f64, step: f64, samples: Vec<$value>) -> $name {
                assert!(!samples.is_empty(), "sampled function needs samples");
                $name {
                    start,
                    step,
                    samples,
                }
            }

            pub fn start(&self) -> f64 {
                self.start
            }

            pub fn step(&self) -> f64 {
                self.step
            }

            pub fn end(&self) -> f64 {
                self.start + (self.samples.len() - 1) as f64 * self.step
            }

            pub fn len(&self) -> usize {
                self.samples.len()
            }

            pub fn is_empty(&self) -> bool {
                self.samples.is_empty()
            }

            pub fn node(&self, i: usize) -> &$value {
                &self.samples[i]
            }

            /// Linear interpolation at `t`, bounds-checked.
            pub fn eval(&self, t: f64) -> Result<$value, ControlError> {
                match locate(self.start, self.step, self.samples.len(), t) {
                    Some((i0, i1, frac)) => Ok(self.blend(i0, i1, frac)),
                    None => Err(ControlError::OutOfRange {
                        t,
                        start: self.start,
                        end: self.end(),
                    }),
                }
            }

            /// Linear interpolation with the query clamped into the span.
            ///
            /// For integrator callbacks whose query times are inside the span
            /// by construction; clamping only absorbs endpoint float fuzz.
            pub fn eval_clamped(&self, t: f64) -> $value {
                let t = t.clamp(self.start, self.end());
                let (i0, i1, frac) = locate(self.start, self.step, self.samples.len(), t)
                    .expect("clamped query is always in range");
                self.blend(i0, i1, frac)
            }

            fn blend(&self, i0: usize, i1: usize, frac: f64) -> $value {
                if i0 == i1 {
                    self.samples[i0].clone()
                } else {
                    &self.samples[i0] * (1.0 - frac) + &self.samples[i1] * frac
                }
            }
        }
    };
}

sampled_function!(
    SampledMatrixFunction,
    DMatrix<f64>,
    "Matrix-valued quantity sampled per grid node, e.g. S(t) or K(t)."
);
sampled_function!(
    SampledVectorFunction,
    DVector<f64>,
    "Vector-valued quantity sampled per grid node, e.g. the tracker costate V(t)."
);
