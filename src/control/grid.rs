use crate::control::error::ControlError;

/// Uniform, ascending, non-negative time grid over the solve horizon.
///
/// Every sample is `start + k * step`; the grid is shared by the backward
/// sweeps, the interpolants and the forward simulation so that node indices
/// mean the same instant everywhere.
#[derive(Debug, Clone)]
pub struct TimeGrid {
    start: f64,
    step: f64,
    samples: Vec<f64>,
}

/// Alignment tolerance, relative to the step size.
const ALIGN_TOL: f64 = 1e-9;

impl TimeGrid {
    /// Grid from `start` to `end` inclusive with spacing `step`.
    ///
    /// `end - start` must be a whole number of steps.
    pub fn new(start: f64, end: f64, step: f64) -> Result<TimeGrid, ControlError> {
        if !(step > 0.0) {
            return Err(ControlError::InvalidTimeDomain(format!(
                "step size must be positive, got {step}"
            )));
        }
        if start < 0.0 {
            return Err(ControlError::InvalidTimeDomain(format!(
                "start time must be non-negative, got {start}"
            )));
        }
        if end < start {
            return Err(ControlError::InvalidTimeDomain(format!(
                "end time {end} precedes start time {start}"
            )));
        }
        let count = (end - start) / step;
        let rounded = count.round();
        if (count - rounded).abs() > ALIGN_TOL * count.max(1.0) {
            return Err(ControlError::InvalidTimeDomain(format!(
                "span [{start}, {end}] is not a whole number of steps of {step}"
            )));
        }
        let samples = (0..=rounded as usize)
            .map(|k| start + k as f64 * step)
            .collect();
        Ok(TimeGrid {
            start,
            step,
            samples,
        })
    }

    /// Validate an externally supplied sample sequence against a step size.
    ///
    /// The sequence must be non-negative, ascending and every entry must be
    /// expressible as `samples[0] + k * step`.
    pub fn from_samples(samples: Vec<f64>, step: f64) -> Result<TimeGrid, ControlError> {
        if !(step > 0.0) {
            return Err(ControlError::InvalidTimeDomain(format!(
                "step size must be positive, got {step}"
            )));
        }
        let Some(&start) = samples.first() else {
            return Err(ControlError::InvalidTimeDomain(
                "empty sample sequence".to_owned(),
            ));
        };
        if start < 0.0 {
            return Err(ControlError::InvalidTimeDomain(format!(
                "start time must be non-negative, got {start}"
            )));
        }
        for (k, &t) in samples.iter().enumerate() {
            let expected = start + k as f64 * step;
            if (t - expected).abs() > ALIGN_TOL * step {
                return Err(ControlError::InvalidTimeDomain(format!(
                    "sample {k} at {t} is not aligned to {expected}"
                )));
            }
        }
        Ok(TimeGrid {
            start,
            step,
            samples,
        })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        *self.samples.last().expect("grid is never empty")
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
