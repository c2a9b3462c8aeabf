//! Matrix <-> vector packing for the ODE integrator.
//!
//! The integrator works on vector-valued states, so matrix-valued equations
//! (Riccati, matrix costate, terminal correction) pack their state through
//! these two functions. The layout is column-major, nalgebra's native storage
//! order: entry `(i, j)` of an `nrows x ncols` matrix lives at `j * nrows + i`.

use nalgebra::{DMatrix, DVector};

/// Pack a matrix into a column-major vector of length `nrows * ncols`.
pub fn flatten(m: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_column_slice(m.as_slice())
}

/// Rebuild an `nrows x ncols` matrix from its column-major vector form.
pub fn unflatten(v: &DVector<f64>, nrows: usize, ncols: usize) -> DMatrix<f64> {
    debug_assert_eq!(v.len(), nrows * ncols);
    DMatrix::from_column_slice(nrows, ncols, v.as_slice())
}
