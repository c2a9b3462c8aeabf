use thiserror::Error;

/// Failure modes of a solve. Every stage aborts on the first error; there is
/// no retry and no partial trajectory.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Matrix or vector dimensions are inconsistent with the plant
    #[error("shape mismatch for {name}: expected {expected_rows}x{expected_cols}, got {rows}x{cols}")]
    ShapeMismatch {
        name: &'static str,
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    /// A matrix that the control law must invert is singular
    #[error("{name} is not invertible")]
    SingularMatrix { name: String },

    /// Control-type selector outside the supported set
    #[error("unsupported control type `{0}`")]
    UnsupportedControlType(String),

    /// Time grid not ascending, negative, or not aligned to the step size
    #[error("invalid time domain: {0}")]
    InvalidTimeDomain(String),

    /// Interpolation queried outside the sampled time span
    #[error("time {t} is outside the sampled span [{start}, {end}]")]
    OutOfRange { t: f64, start: f64, end: f64 },
}
