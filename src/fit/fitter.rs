//! Multi-start fitting routines for a single model order.
//!
//! Given:
//! - a censored sample (observed dwells, `Ncut`, `Tmax`, `tcut`)
//! - a model descriptor (order, transform, canonical ordering)
//! - a starting raw vector and its search box
//!
//! we run `n_fits` independent annealing runs in parallel on the negative
//! log-likelihood and keep the run with the lowest objective. The single
//! exponential case has a closed form and skips the annealer entirely.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::domain::{AnnealConfig, Bounds, CensoredSample, ModelOrder};
use crate::error::FitError;
use crate::fit::anneal::{AnnealOutcome, anneal};
use crate::fit::likelihood::negative_log_likelihood;
use crate::fit::progress::{FitContext, RunScope};
use crate::math::derive_seed;
use crate::models::{MixtureParams, ModelDescriptor, descriptor};

/// Everything a fit of one order needs besides the optimizer settings.
#[derive(Debug, Clone)]
pub struct FitProblem<'a> {
    pub sample: &'a CensoredSample,
    pub descriptor: &'static ModelDescriptor,
    /// Starting raw vector (already inside `bounds`).
    pub initial: Vec<f64>,
    pub bounds: Bounds,
}

impl<'a> FitProblem<'a> {
    /// Build the problem for `order`, taking the initial guess from the
    /// observed mean and the search box from `bounds` or the model default.
    pub fn new(
        sample: &'a CensoredSample,
        order: ModelOrder,
        bounds: Option<&Bounds>,
        tau_floor: f64,
    ) -> Result<Self, FitError> {
        let descriptor = descriptor(order);
        let bounds = match bounds {
            Some(b) if b.len() != descriptor.param_count() => {
                return Err(FitError::config(format!(
                    "{order} needs {} bounds per side (got {})",
                    descriptor.param_count(),
                    b.len()
                )));
            }
            Some(b) => {
                b.validate()?;
                b.clone()
            }
            None => descriptor.default_bounds(sample.tmax, tau_floor),
        };
        let initial = bounds.clamp(&descriptor.initial_guess(sample.mean_observed()));
        Ok(Self {
            sample,
            descriptor,
            initial,
            bounds,
        })
    }

    /// Same order, start and box on different data (a bootstrap replicate).
    pub fn with_sample<'b>(&self, sample: &'b CensoredSample) -> FitProblem<'b> {
        FitProblem {
            sample,
            descriptor: self.descriptor,
            initial: self.initial.clone(),
            bounds: self.bounds.clone(),
        }
    }

    pub fn order(&self) -> ModelOrder {
        self.descriptor.order
    }

    pub fn objective(&self, raw: &[f64]) -> f64 {
        negative_log_likelihood(self.sample, &self.descriptor.transform(raw))
    }
}

/// Best of `n_fits` annealing runs.
#[derive(Debug, Clone)]
pub struct MultiStartFit {
    /// Canonical parameters of the winning run.
    pub params: MixtureParams,
    pub nll: f64,
    /// Index of the winning run.
    pub run: usize,
    /// Accepted moves of the winning run.
    pub accepted: usize,
}

/// Run `n_fits` independent annealing runs and keep the lowest final objective.
///
/// Run `i` draws from its own generator seeded with `derive_seed(seed, "anneal", i)`,
/// so the result is identical for a fixed seed no matter how the runs are
/// scheduled. Ties (and NaN objectives, ranked last) resolve to the lowest
/// run index.
pub fn fit_multistart(
    problem: &FitProblem<'_>,
    n_fits: usize,
    anneal_config: &AnnealConfig,
    seed: u64,
    scope: RunScope,
    ctx: FitContext<'_>,
) -> Result<MultiStartFit, FitError> {
    if n_fits == 0 {
        return Err(FitError::config("n_fits must be >= 1"));
    }

    let outcomes: Vec<AnnealOutcome> = (0..n_fits)
        .into_par_iter()
        .map(|run| {
            ctx.check_cancelled()?;
            let mut rng = StdRng::seed_from_u64(derive_seed(seed, "anneal", run as u64));
            let outcome = anneal(
                |raw: &[f64]| problem.objective(raw),
                &problem.initial,
                &problem.bounds,
                anneal_config,
                &mut rng,
            );
            ctx.observer.run_finished(problem.order(), scope, run, &outcome);
            Ok(outcome)
        })
        .collect::<Result<_, FitError>>()?;

    // Deterministic selection: minimum objective; ties go to the earlier run.
    let mut run = 0;
    for (i, outcome) in outcomes.iter().enumerate().skip(1) {
        if rank(outcome.value) < rank(outcomes[run].value) {
            run = i;
        }
    }
    let best = &outcomes[run];

    let params = problem.descriptor.canonicalize(&problem.descriptor.transform(&best.x));
    Ok(MultiStartFit {
        params,
        nll: best.value,
        run,
        accepted: best.accepted,
    })
}

fn rank(value: f64) -> f64 {
    if value.is_nan() { f64::INFINITY } else { value }
}

/// Censored single-exponential estimate `mean(observed) + Ncut · Tmax / N_obs`.
///
/// With `tcut > 0` the likelihood minimum lies `tcut / N_obs` below this value.
pub fn single_exponential_mle(sample: &CensoredSample) -> MixtureParams {
    let n_obs = sample.n_observed() as f64;
    let tau = sample.mean_observed() + sample.n_cut as f64 * sample.tmax / n_obs;
    MixtureParams::single(tau)
}

/// Result of solving one problem, closed form or annealed.
#[derive(Debug, Clone)]
pub struct ProblemFit {
    pub params: MixtureParams,
    pub nll: f64,
    /// Accepted annealing moves; `None` for the closed form.
    pub steps: Option<usize>,
}

/// Fit `problem` by the method its order calls for.
pub fn solve(
    problem: &FitProblem<'_>,
    n_fits: usize,
    anneal_config: &AnnealConfig,
    seed: u64,
    scope: RunScope,
    ctx: FitContext<'_>,
) -> Result<ProblemFit, FitError> {
    if problem.order() == ModelOrder::One {
        ctx.check_cancelled()?;
        let params = single_exponential_mle(problem.sample);
        let nll = negative_log_likelihood(problem.sample, &params);
        return Ok(ProblemFit {
            params,
            nll,
            steps: None,
        });
    }

    let fit = fit_multistart(problem, n_fits, anneal_config, seed, scope, ctx)?;
    Ok(ProblemFit {
        params: fit.params,
        nll: fit.nll,
        steps: Some(fit.accepted),
    })
}
