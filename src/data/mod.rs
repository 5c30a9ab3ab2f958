//! Dwell data helpers that sit next to the fitting engine.
//!
//! - `sample`: synthetic dwells drawn from a known mixture
//! - `select`: range selection and flooring of raw dwells before fitting

pub mod sample;
pub mod select;

pub use sample::*;
pub use select::*;
