//! Shared batch pipeline: selection -> fit -> per-dataset outcome.

use serde::{Deserialize, Serialize};

use crate::data::DwellSelection;
use crate::domain::{FitConfig, FitResult};
use crate::error::FitError;
use crate::fit::progress::FitContext;
use crate::fit::selection::fit_with;

/// A named set of raw dwell times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub dwells: Vec<f64>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, dwells: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            dwells,
        }
    }
}

/// Outcome of fitting one dataset in a batch.
#[derive(Debug, Clone)]
pub struct DatasetOutcome {
    pub name: String,
    pub results: Result<Vec<FitResult>, FitError>,
}

/// Fit every dataset with the same configuration.
///
/// Each dataset's results carry its own name. Data-dependent failures
/// (empty or invalid dwells, nothing left after censoring) are logged and the
/// batch moves on. A configuration error or cancellation is recorded for the
/// dataset where it happened and ends the batch.
pub fn fit_batch(
    datasets: &[Dataset],
    selection: &DwellSelection,
    config: &FitConfig,
    ctx: FitContext<'_>,
) -> Vec<DatasetOutcome> {
    let mut outcomes = Vec::with_capacity(datasets.len());

    for dataset in datasets {
        let dwells = selection.apply(&dataset.dwells);
        log::info!(
            "{}: fitting {} of {} dwells",
            dataset.name,
            dwells.len(),
            dataset.dwells.len()
        );

        let config = FitConfig {
            dataset_name: dataset.name.clone(),
            ..config.clone()
        };
        let results = fit_with(&dwells, &config, ctx);

        let stop = match &results {
            Ok(_) => false,
            Err(e) if e.is_data_dependent() => {
                log::warn!("{}: skipped: {e}", dataset.name);
                false
            }
            Err(e) => {
                log::error!("{}: batch stopped: {e}", dataset.name);
                true
            }
        };

        outcomes.push(DatasetOutcome {
            name: dataset.name.clone(),
            results,
        });
        if stop {
            break;
        }
    }

    outcomes
}
