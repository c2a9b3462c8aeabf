use std::fmt;
use std::str::FromStr;

use nalgebra::{DMatrix, DVector};

use crate::control::error::ControlError;

/// Continuous-time plant x' = Ax + Bu, y = Cx + Du.
#[derive(Debug, Clone)]
pub struct LinearSystem {
    pub a: DMatrix<f64>,
    pub b: DMatrix<f64>,
    pub c: DMatrix<f64>,
    pub d: DMatrix<f64>,
}

pub(crate) fn check_shape(
    name: &'static str,
    m: &DMatrix<f64>,
    rows: usize,
    cols: usize,
) -> Result<(), ControlError> {
    if m.nrows() != rows || m.ncols() != cols {
        return Err(ControlError::ShapeMismatch {
            name,
            expected_rows: rows,
            expected_cols: cols,
            rows: m.nrows(),
            cols: m.ncols(),
        });
    }
    Ok(())
}

pub(crate) fn check_len(name: &'static str, v: &DVector<f64>, len: usize) -> Result<(), ControlError> {
    if v.len() != len {
        return Err(ControlError::ShapeMismatch {
            name,
            expected_rows: len,
            expected_cols: 1,
            rows: v.len(),
            cols: 1,
        });
    }
    Ok(())
}

impl LinearSystem {
    /// Build a plant, checking that B, C and D agree with A's state dimension.
    pub fn new(
        a: DMatrix<f64>,
        b: DMatrix<f64>,
        c: DMatrix<f64>,
        d: DMatrix<f64>,
    ) -> Result<LinearSystem, ControlError> {
        let n = a.nrows();
        check_shape("A", &a, n, n)?;
        check_shape("B", &b, n, b.ncols())?;
        check_shape("C", &c, c.nrows(), n)?;
        check_shape("D", &d, c.nrows(), b.ncols())?;
        Ok(LinearSystem { a, b, c, d })
    }

    /// State dimension.
    pub fn n(&self) -> usize {
        self.a.nrows()
    }

    /// Input dimension.
    pub fn m(&self) -> usize {
        self.b.ncols()
    }

    /// Output dimension.
    pub fn p(&self) -> usize {
        self.c.nrows()
    }
}

/// Time-varying reference r(t) followed by the tracker.
pub trait ReferenceSignal {
    /// Reference output at time `t`, length p.
    fn output(&self, t: f64) -> DVector<f64>;
}

impl<F> ReferenceSignal for F
where
    F: Fn(f64) -> DVector<f64>,
{
    fn output(&self, t: f64) -> DVector<f64> {
        self(t)
    }
}

/// Regulator objective: drive the state down against state cost Q (n x n) and
/// input cost R (m x m), with terminal Riccati value `terminal` (ST, n x n).
///
/// When `target` is present the law additionally enforces C x(end) = target
/// exactly through the costate/correction machinery; when absent the law is
/// pure Riccati feedback u = -K(t) x.
pub struct LqrProblem {
    pub q: DMatrix<f64>,
    pub r: DMatrix<f64>,
    pub terminal: DMatrix<f64>,
    pub target: Option<DVector<f64>>,
}

/// Tracker objective: follow `reference` against output cost Q (p x p), input
/// cost R (m x m) and terminal output weight `terminal` (P, p x p).
pub struct LqtProblem {
    pub q: DMatrix<f64>,
    pub r: DMatrix<f64>,
    pub terminal: DMatrix<f64>,
    pub reference: Box<dyn ReferenceSignal>,
}

/// The control-law selector dispatched on by the solver.
pub enum ControlLaw {
    Lqr(LqrProblem),
    Lqt(LqtProblem),
}

impl ControlLaw {
    pub fn control_type(&self) -> ControlType {
        match self {
            ControlLaw::Lqr(_) => ControlType::Lqr,
            ControlLaw::Lqt(_) => ControlType::Lqt,
        }
    }

    pub(crate) fn r(&self) -> &DMatrix<f64> {
        match self {
            ControlLaw::Lqr(p) => &p.r,
            ControlLaw::Lqt(p) => &p.r,
        }
    }

    /// Check every cost matrix against the plant dimensions.
    pub(crate) fn validate(&self, sys: &LinearSystem) -> Result<(), ControlError> {
        let (n, m, p) = (sys.n(), sys.m(), sys.p());
        match self {
            ControlLaw::Lqr(problem) => {
                check_shape("Q", &problem.q, n, n)?;
                check_shape("R", &problem.r, m, m)?;
                check_shape("ST", &problem.terminal, n, n)?;
                if let Some(target) = &problem.target {
                    check_len("terminal target", target, p)?;
                }
            }
            ControlLaw::Lqt(problem) => {
                check_shape("Q", &problem.q, p, p)?;
                check_shape("R", &problem.r, m, m)?;
                check_shape("P", &problem.terminal, p, p)?;
            }
        }
        Ok(())
    }
}

/// Plain pipeline selector, for drivers that pick the law from a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlType {
    Lqr,
    Lqt,
}

impl FromStr for ControlType {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<ControlType, ControlError> {
        match s.to_ascii_lowercase().as_str() {
            "lqr" => Ok(ControlType::Lqr),
            "lqt" => Ok(ControlType::Lqt),
            _ => Err(ControlError::UnsupportedControlType(s.to_owned())),
        }
    }
}

impl fmt::Display for ControlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlType::Lqr => write!(f, "lqr"),
            ControlType::Lqt => write!(f, "lqt"),
        }
    }
}
