//! Multi-exponential mixture model.
//!
//! Models are small, pure values/functions so that the fitter and bootstrap
//! code can stay generic over the model order:
//!
//! - `mixture`: mixture parameters, density/survival, raw-vector transform,
//!   canonical ordering
//! - `descriptor`: per-order registry (parameter names, initial guess, bounds)

pub mod descriptor;
pub mod mixture;

pub use descriptor::*;
pub use mixture::*;
