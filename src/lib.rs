//! `dwell-kinetics` library crate.
//!
//! Maximum-likelihood fitting of censored multi-exponential dwell-time
//! distributions (1 to 4 components) by simulated annealing, with bootstrap
//! errors and BIC model selection.
//!
//! - `fit::fit` is the main entry point: raw dwells + [`FitConfig`] in,
//!   one [`FitResult`] per requested order out
//! - `app::fit_batch` runs the same configuration over many named datasets
//! - `data` holds dwell selection and synthetic dwell generation

pub mod app;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod math;
pub mod models;

pub use domain::{
    AnnealConfig, Bounds, FitConfig, FitResult, FitWarning, ModelOrder, ModelRequest, ParamEstimate,
    StepSize,
};
pub use error::FitError;
pub use fit::{CancelToken, FitContext, FitObserver, fit, fit_with, fitted_curve, select_by_bic};
pub use models::MixtureParams;
