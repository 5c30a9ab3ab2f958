//! Domain types used throughout the fitting engine.
//!
//! This module defines:
//!
//! - model identifiers (`ModelOrder`, `ModelRequest`)
//! - configuration (`FitConfig`, `AnnealConfig`, `StepSize`, `Bounds`)
//! - the censored dwell sample consumed by the likelihood (`CensoredSample`)
//! - fit outputs (`FitResult`, `ParamEstimate`, `FitWarning`)

pub mod types;

pub use types::*;
