//! Numerically guarded primitives.
//!
//! The likelihood takes logarithms of mixture densities that can underflow to
//! zero for extreme parameters, and the Metropolis rule exponentiates
//! objective differences that can be arbitrarily large. Both go through the
//! helpers here so the objective stays finite for every finite input.

use nalgebra::DMatrix;

/// Smallest argument passed to `ln`.
pub const LOG_FLOOR: f64 = 1e-300;

/// Exponent magnitude beyond which `exp` would overflow or flush to zero.
pub const EXP_LIMIT: f64 = 700.0;

/// `ln(max(x, LOG_FLOOR))`. NaN maps to the floor as well.
pub fn ln_floored(x: f64) -> f64 {
    x.max(LOG_FLOOR).ln()
}

/// `exp(x)` with `x` clamped to `[-EXP_LIMIT, EXP_LIMIT]`.
pub fn exp_clamped(x: f64) -> f64 {
    x.clamp(-EXP_LIMIT, EXP_LIMIT).exp()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (no bias correction) of each column of a
/// row-major table.
///
/// Returns `NaN` for every column when `rows` is empty.
pub fn column_population_std(rows: &[Vec<f64>], width: usize) -> Vec<f64> {
    if rows.is_empty() {
        return vec![f64::NAN; width];
    }
    let table = DMatrix::<f64>::from_fn(rows.len(), width, |i, j| rows[i][j]);
    table.row_variance().iter().map(|v| v.max(0.0).sqrt()).collect()
}
