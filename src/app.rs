//! Batch orchestration over many dwell datasets.
//!
//! The fitting engine works on one dataset per call; this module runs it over
//! a list of named datasets, applying a shared dwell selection first and
//! keeping one dataset's failure from stopping the others.

pub mod pipeline;

pub use pipeline::*;
