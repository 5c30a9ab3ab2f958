//! Mathematical utilities: guarded logs/exponentials, summary statistics and
//! per-stream seed derivation.

pub mod numeric;
pub mod seed;

pub use numeric::*;
pub use seed::*;
