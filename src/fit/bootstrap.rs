//! Nonparametric bootstrap of fitted parameters.
//!
//! Each replicate resamples the pooled events (observed dwells plus `Ncut`
//! censored events) with replacement, keeps `Tmax`/`tcut`, and refits the
//! same order from the same starting point. Parameter errors are the
//! population standard deviation of the canonical replicate vectors.
//!
//! Replicates that draw no observed dwell, fail to fit, or produce a
//! non-finite result are excluded. If more than `max_failed_fraction` of them
//! are excluded the summary carries a [`FitWarning::DegradedBootstrap`].

use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::domain::{AnnealConfig, CensoredSample, FitWarning};
use crate::error::FitError;
use crate::fit::fitter::{FitProblem, solve};
use crate::fit::progress::{FitContext, RunScope};
use crate::math::{column_population_std, derive_seed};

#[derive(Debug, Clone, PartialEq)]
pub enum ReplicateOutcome {
    Fitted {
        /// Canonical reported vector `[p.., tau..]`.
        values: Vec<f64>,
        n_cut: usize,
        steps: Option<usize>,
    },
    Excluded {
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BootstrapPlan {
    pub repeats: usize,
    pub n_fits: usize,
    pub max_failed_fraction: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapSummary {
    /// Per-parameter standard error; NaN when every replicate was excluded.
    pub errors: Vec<f64>,
    pub replicates: Vec<Vec<f64>>,
    pub failed: usize,
    pub total: usize,
    pub warning: Option<FitWarning>,
}

/// Draw `dwells.len() + n_cut` events with replacement from the pooled set.
///
/// Returns the drawn observed dwells and the number of censored events drawn.
pub fn resample<R: Rng + ?Sized>(dwells: &[f64], n_cut: usize, rng: &mut R) -> (Vec<f64>, usize) {
    let total = dwells.len() + n_cut;
    let mut drawn = Vec::with_capacity(dwells.len());
    let mut drawn_cut = 0;
    for _ in 0..total {
        match dwells.get(rng.gen_range(0..total)) {
            Some(&d) => drawn.push(d),
            None => drawn_cut += 1,
        }
    }
    (drawn, drawn_cut)
}

pub fn run_bootstrap(
    problem: &FitProblem<'_>,
    plan: &BootstrapPlan,
    anneal_config: &AnnealConfig,
    ctx: FitContext<'_>,
) -> Result<BootstrapSummary, FitError> {
    let order = problem.order();

    let outcomes: Vec<ReplicateOutcome> = (0..plan.repeats)
        .into_par_iter()
        .map(|replicate| {
            ctx.check_cancelled()?;
            let seed = derive_seed(plan.seed, "bootstrap", replicate as u64);
            let mut rng = StdRng::seed_from_u64(seed);
            let (dwells, n_cut) = resample(&problem.sample.dwells, problem.sample.n_cut, &mut rng);
            let outcome = refit(problem, dwells, n_cut, plan, anneal_config, seed, replicate, ctx);
            ctx.observer.replicate_finished(order, replicate, &outcome);
            Ok(outcome)
        })
        .collect::<Result<_, FitError>>()?;

    let replicates: Vec<Vec<f64>> = outcomes
        .into_iter()
        .filter_map(|outcome| match outcome {
            ReplicateOutcome::Fitted { values, .. } => Some(values),
            ReplicateOutcome::Excluded { .. } => None,
        })
        .collect();

    let total = plan.repeats;
    let failed = total - replicates.len();
    let errors = column_population_std(&replicates, problem.descriptor.param_count());

    let warning = (total > 0 && failed as f64 / total as f64 > plan.max_failed_fraction).then(|| {
        FitWarning::DegradedBootstrap {
            failed,
            total,
            allowed: plan.max_failed_fraction,
        }
    });
    if let Some(w) = &warning {
        ctx.observer.warning(order, w);
    }

    Ok(BootstrapSummary {
        errors,
        replicates,
        failed,
        total,
        warning,
    })
}

#[allow(clippy::too_many_arguments)]
fn refit(
    problem: &FitProblem<'_>,
    dwells: Vec<f64>,
    n_cut: usize,
    plan: &BootstrapPlan,
    anneal_config: &AnnealConfig,
    seed: u64,
    replicate: usize,
    ctx: FitContext<'_>,
) -> ReplicateOutcome {
    if dwells.is_empty() {
        return ReplicateOutcome::Excluded {
            reason: "resample drew no observed dwells".to_string(),
        };
    }

    let sample = CensoredSample {
        dwells,
        n_cut,
        tmax: problem.sample.tmax,
        tcut: problem.sample.tcut,
    };
    let replicate_problem = problem.with_sample(&sample);

    // A replicate always runs to completion once started.
    match solve(
        &replicate_problem,
        plan.n_fits,
        anneal_config,
        seed,
        RunScope::Replicate(replicate),
        ctx.uncancellable(),
    ) {
        Ok(fit) if fit.params.is_finite() && fit.nll.is_finite() => ReplicateOutcome::Fitted {
            values: fit.params.values(),
            n_cut,
            steps: fit.steps,
        },
        Ok(fit) => ReplicateOutcome::Excluded {
            reason: format!("non-finite fit (nll={})", fit.nll),
        },
        Err(e) => ReplicateOutcome::Excluded {
            reason: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ModelOrder;
    use crate::fit::progress::CancelToken;

    fn plan(repeats: usize) -> BootstrapPlan {
        BootstrapPlan {
            repeats,
            n_fits: 1,
            max_failed_fraction: 0.1,
            seed: 3,
        }
    }

    #[test]
    fn resample_preserves_event_count() {
        let mut rng = StdRng::seed_from_u64(1);
        let dwells = [1.0, 2.0, 3.0, 4.0, 5.0];
        for _ in 0..50 {
            let (drawn, cut) = resample(&dwells, 3, &mut rng);
            assert_eq!(drawn.len() + cut, 8);
            assert!(drawn.iter().all(|d| dwells.contains(d)));
        }
    }

    #[test]
    fn resample_without_censoring_never_draws_cut_events() {
        let mut rng = StdRng::seed_from_u64(2);
        let (drawn, cut) = resample(&[1.0, 2.0], 0, &mut rng);
        assert_eq!((drawn.len(), cut), (2, 0));
    }

    #[test]
    fn single_exponential_errors_are_positive() {
        let sample = CensoredSample {
            dwells: (1..=50).map(|i| i as f64 * 0.2).collect(),
            n_cut: 5,
            tmax: 12.0,
            tcut: 0.0,
        };
        let problem = FitProblem::new(&sample, ModelOrder::One, None, 0.3).unwrap();
        let summary =
            run_bootstrap(&problem, &plan(30), &AnnealConfig::default(), FitContext::silent()).unwrap();
        assert_eq!(summary.total, 30);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.replicates.len(), 30);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0] > 0.0 && summary.errors[0].is_finite());
        assert!(summary.warning.is_none());
    }

    #[test]
    fn mostly_censored_data_degrades_bootstrap() {
        // One observed dwell among ten events: ~35% of resamples draw none.
        let sample = CensoredSample {
            dwells: vec![1.0],
            n_cut: 9,
            tmax: 5.0,
            tcut: 0.0,
        };
        let problem = FitProblem::new(&sample, ModelOrder::One, None, 0.3).unwrap();
        let summary =
            run_bootstrap(&problem, &plan(40), &AnnealConfig::default(), FitContext::silent()).unwrap();
        assert!(summary.failed > 4, "failed={}", summary.failed);
        assert_eq!(summary.failed + summary.replicates.len(), 40);
        assert!(matches!(
            summary.warning,
            Some(FitWarning::DegradedBootstrap { total: 40, .. })
        ));
    }

    #[test]
    fn same_seed_same_replicates() {
        let sample = CensoredSample {
            dwells: vec![0.5, 1.0, 2.0, 4.0, 8.0],
            n_cut: 1,
            tmax: 9.0,
            tcut: 0.0,
        };
        let problem = FitProblem::new(&sample, ModelOrder::One, None, 0.3).unwrap();
        let a = run_bootstrap(&problem, &plan(10), &AnnealConfig::default(), FitContext::silent()).unwrap();
        let b = run_bootstrap(&problem, &plan(10), &AnnealConfig::default(), FitContext::silent()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn cancellation_aborts_bootstrap() {
        let sample = CensoredSample {
            dwells: vec![1.0, 2.0],
            n_cut: 0,
            tmax: 2.0,
            tcut: 0.0,
        };
        let problem = FitProblem::new(&sample, ModelOrder::One, None, 0.3).unwrap();
        let token = CancelToken::new();
        token.cancel();
        let ctx = FitContext::silent().with_cancel(&token);
        let err = run_bootstrap(&problem, &plan(5), &AnnealConfig::default(), ctx).unwrap_err();
        assert_eq!(err, FitError::Cancelled);
    }
}
