//! Fitting engine.
//!
//! Responsibilities:
//!
//! - evaluate the censored negative log-likelihood of a mixture
//! - minimize it by simulated annealing (parallel multi-start)
//! - bootstrap parameter errors
//! - orchestrate per-order fits and select an order by BIC

pub mod anneal;
pub mod bootstrap;
pub mod fitter;
pub mod likelihood;
pub mod progress;
pub mod selection;

pub use anneal::*;
pub use bootstrap::*;
pub use fitter::*;
pub use likelihood::*;
pub use progress::*;
pub use selection::*;
