//! Progress reporting and cooperative cancellation.
//!
//! The engine never prints. Callers that want progress pass a [`FitObserver`]
//! inside a [`FitContext`]; observers are called from rayon worker threads, so
//! they must be `Sync`. Cancellation is checked only between annealing runs and
//! between bootstrap replicates, never inside one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::domain::{FitWarning, ModelOrder};
use crate::error::FitError;
use crate::fit::anneal::AnnealOutcome;
use crate::fit::bootstrap::ReplicateOutcome;

/// Where an annealing run belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunScope {
    /// The fit on the caller's data.
    Primary,
    /// A refit inside bootstrap replicate `n`.
    Replicate(usize),
}

pub trait FitObserver: Sync {
    fn run_finished(&self, _order: ModelOrder, _scope: RunScope, _run: usize, _outcome: &AnnealOutcome) {
    }

    fn replicate_finished(&self, _order: ModelOrder, _replicate: usize, _outcome: &ReplicateOutcome) {}

    fn warning(&self, _order: ModelOrder, _warning: &FitWarning) {}
}

/// Ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl FitObserver for NoopObserver {}

/// Forwards run and replicate events to the `log` facade at debug level.
///
/// Warnings are already logged by the orchestrator and are not repeated here.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl FitObserver for LogObserver {
    fn run_finished(&self, order: ModelOrder, scope: RunScope, run: usize, outcome: &AnnealOutcome) {
        log::debug!(
            "{order} {scope:?} run {run}: nll={:.4} accepted={} proposals={}",
            outcome.value,
            outcome.accepted,
            outcome.proposals
        );
    }

    fn replicate_finished(&self, order: ModelOrder, replicate: usize, outcome: &ReplicateOutcome) {
        match outcome {
            ReplicateOutcome::Fitted { n_cut, steps, .. } => {
                log::debug!("{order} boot {}: ncut={n_cut} steps={steps:?}", replicate + 1);
            }
            ReplicateOutcome::Excluded { reason } => {
                log::debug!("{order} boot {} excluded: {reason}", replicate + 1);
            }
        }
    }
}

/// Shared flag checked between runs and replicates.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Observer and optional cancellation for one fit call.
#[derive(Clone, Copy)]
pub struct FitContext<'a> {
    pub observer: &'a dyn FitObserver,
    pub cancel: Option<&'a CancelToken>,
}

impl FitContext<'static> {
    pub fn silent() -> Self {
        Self {
            observer: &NoopObserver,
            cancel: None,
        }
    }
}

impl<'a> FitContext<'a> {
    pub fn new(observer: &'a dyn FitObserver) -> Self {
        Self {
            observer,
            cancel: None,
        }
    }

    pub fn with_cancel(self, cancel: &'a CancelToken) -> Self {
        Self {
            cancel: Some(cancel),
            ..self
        }
    }

    /// Same observer, cancellation detached (used inside a replicate).
    pub fn uncancellable(self) -> Self {
        Self {
            cancel: None,
            ..self
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelToken::is_cancelled)
    }

    pub fn check_cancelled(&self) -> Result<(), FitError> {
        if self.is_cancelled() {
            Err(FitError::Cancelled)
        } else {
            Ok(())
        }
    }
}
