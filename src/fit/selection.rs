//! Model fitting orchestration and BIC-based selection.
//!
//! For each requested order the orchestrator:
//! 1. splits the raw dwells into observed and censored events (`Tmax`, `Ncut`)
//!    and drops dwells below `tcut`
//! 2. fits the order (closed form for 1Exp, multi-start annealing otherwise)
//! 3. optionally bootstraps parameter errors
//! 4. scores the fit with `BIC = ln(N) · (2k - 1) + 2 · NLL`, `N` the observed count
//!
//! Selection rules:
//! 1. Choose the result with minimum BIC
//! 2. If a simpler model is within 2 BIC points of the best, pick the simpler model

use crate::domain::{CensoredSample, FitConfig, FitResult, ModelOrder, ParamEstimate};
use crate::error::FitError;
use crate::fit::bootstrap::{BootstrapPlan, run_bootstrap};
use crate::fit::fitter::{FitProblem, solve};
use crate::fit::progress::{FitContext, LogObserver, RunScope};
use crate::math::derive_seed;

/// BIC difference below which the simpler model is preferred.
const SIMPLER_MODEL_MARGIN: f64 = 2.0;

/// Fit every order in `config.model`, reporting progress through `log`.
pub fn fit(dwells: &[f64], config: &FitConfig) -> Result<Vec<FitResult>, FitError> {
    fit_with(dwells, config, FitContext::new(&LogObserver))
}

/// [`fit`] with a caller-supplied observer and cancellation token.
///
/// Results come back in request order (`1Exp` before `2Exp` for the composite).
pub fn fit_with(
    dwells: &[f64],
    config: &FitConfig,
    ctx: FitContext<'_>,
) -> Result<Vec<FitResult>, FitError> {
    config.validate()?;
    let sample = CensoredSample::from_raw(dwells, config.include_over_tmax, config.tmax_margin, config.tcut)?;
    log::debug!(
        "{}: {} dwells, {} observed, ncut={} tmax={:.4} tcut={}",
        config.dataset_name,
        dwells.len(),
        sample.n_observed(),
        sample.n_cut,
        sample.tmax,
        sample.tcut
    );

    config
        .model
        .orders()
        .into_iter()
        .map(|order| fit_sample(&sample, order, config, ctx))
        .collect()
}

/// Fit a single order, ignoring `config.model`.
pub fn fit_order(
    dwells: &[f64],
    order: ModelOrder,
    config: &FitConfig,
    ctx: FitContext<'_>,
) -> Result<FitResult, FitError> {
    config.validate()?;
    let sample = CensoredSample::from_raw(dwells, config.include_over_tmax, config.tmax_margin, config.tcut)?;
    fit_sample(&sample, order, config, ctx)
}

fn fit_sample(
    sample: &CensoredSample,
    order: ModelOrder,
    config: &FitConfig,
    ctx: FitContext<'_>,
) -> Result<FitResult, FitError> {
    // 1Exp has no raw vector to bound.
    let bounds = match order {
        ModelOrder::One => None,
        _ => config.bounds.as_ref(),
    };
    let problem = FitProblem::new(sample, order, bounds, config.tau_floor)?;

    let fit = solve(
        &problem,
        config.n_fits,
        &config.anneal,
        derive_seed(config.seed, order.tag(), 0),
        RunScope::Primary,
        ctx,
    )?;
    log::debug!(
        "{}: {order} nll={:.4} taus={:?} fractions={:?}",
        config.dataset_name,
        fit.nll,
        fit.params.taus(),
        fit.params.fractions()
    );

    let param_count = order.param_count();
    let (errors, replicates, warnings, boot_repeats) = if config.bootstrap {
        let plan = BootstrapPlan {
            repeats: config.boot_repeats,
            n_fits: config.n_fits,
            max_failed_fraction: config.max_failed_fraction,
            seed: derive_seed(config.seed, order.tag(), 1),
        };
        let summary = run_bootstrap(&problem, &plan, &config.anneal, ctx)?;
        if let Some(warning) = &summary.warning {
            log::warn!("{}: {order}: {warning}", config.dataset_name);
        }
        (
            summary.errors,
            summary.replicates,
            summary.warning.into_iter().collect(),
            config.boot_repeats,
        )
    } else {
        (vec![0.0; param_count], Vec::new(), Vec::new(), 0)
    };

    let estimates = problem
        .descriptor
        .param_names
        .iter()
        .zip(fit.params.values())
        .zip(errors)
        .map(|((name, value), error)| ParamEstimate {
            name: (*name).to_string(),
            value,
            error,
        })
        .collect();

    let n_observed = sample.n_observed();
    Ok(FitResult {
        dataset: config.dataset_name.clone(),
        model: order,
        mixture: fit.params,
        estimates,
        tmax: sample.tmax,
        n_cut: sample.n_cut,
        tcut: sample.tcut,
        n_observed,
        boot_repeats,
        steps: fit.steps,
        nll: fit.nll,
        bic: bic(n_observed, param_count, fit.nll),
        replicates,
        warnings,
    })
}

/// `ln(n) · k + 2 · nll`.
pub fn bic(n: usize, k: usize, nll: f64) -> f64 {
    (n as f64).ln() * k as f64 + 2.0 * nll
}

/// Pick a model from results of different orders.
///
/// Returns `None` only for an empty slice.
pub fn select_by_bic(results: &[FitResult]) -> Option<&FitResult> {
    let score = |r: &FitResult| if r.bic.is_nan() { f64::INFINITY } else { r.bic };

    let best = results.iter().min_by(|a, b| score(*a).total_cmp(&score(*b)))?;
    let best_bic = score(best);

    // Walk orders from simplest and take the first one close enough to the best.
    for order in ModelOrder::ALL {
        if let Some(r) = results.iter().find(|r| r.model == order) {
            if score(r) <= best_bic + SIMPLER_MODEL_MARGIN {
                return Some(r);
            }
        }
    }
    Some(best)
}

/// Fitted dwell-time density on `times`, divided by `S(tcut)`.
///
/// The fit adds `ln S(tcut)` once rather than per dwell, so fitted time
/// constants carry an offset of about `tcut`. This curve therefore sits to
/// the right of a histogram of the kept dwells by roughly that offset.
pub fn fitted_curve(result: &FitResult, times: &[f64]) -> Vec<f64> {
    let norm = result.mixture.survival(result.tcut);
    times
        .iter()
        .map(|&t| result.mixture.density(t) / norm)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ModelRequest, StepSize};
    use crate::fit::likelihood::negative_log_likelihood;
    use crate::models::MixtureParams;

    fn result(model: ModelOrder, bic: f64) -> FitResult {
        FitResult {
            dataset: "Dwells".to_string(),
            model,
            mixture: MixtureParams::single(1.0),
            estimates: Vec::new(),
            tmax: 10.0,
            n_cut: 0,
            tcut: 0.0,
            n_observed: 10,
            boot_repeats: 0,
            steps: None,
            nll: bic / 2.0,
            bic,
            replicates: Vec::new(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn bic_formula() {
        let expected = 100_f64.ln() * 3.0 + 2.0 * 50.0;
        assert!((bic(100, 3, 50.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn bic_penalty_grows_with_parameter_count() {
        let scores: Vec<f64> = ModelOrder::ALL
            .iter()
            .map(|o| bic(250, o.param_count(), 400.0))
            .collect();
        assert!(scores.windows(2).all(|w| w[1] > w[0]), "{scores:?}");
    }

    #[test]
    fn bic_prefers_simpler_when_close() {
        let fits = vec![result(ModelOrder::One, 101.5), result(ModelOrder::Two, 100.0)];
        assert_eq!(select_by_bic(&fits).unwrap().model, ModelOrder::One);

        let fits = vec![result(ModelOrder::One, 110.0), result(ModelOrder::Two, 100.0)];
        assert_eq!(select_by_bic(&fits).unwrap().model, ModelOrder::Two);

        assert!(select_by_bic(&[]).is_none());
    }

    #[test]
    fn nan_bic_never_wins() {
        let fits = vec![result(ModelOrder::One, f64::NAN), result(ModelOrder::Three, 40.0)];
        assert_eq!(select_by_bic(&fits).unwrap().model, ModelOrder::Three);
    }

    #[test]
    fn single_exponential_fit_is_closed_form() {
        let config = FitConfig {
            include_over_tmax: false,
            ..FitConfig::default()
        };
        let results = fit(&[1.0, 2.0, 3.0, 4.0], &config).unwrap();
        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert_eq!(r.model, ModelOrder::One);
        assert!((r.values()[0] - 2.5).abs() < 1e-12);
        assert_eq!(r.errors(), vec![0.0]);
        assert_eq!(r.steps, None);
        assert_eq!((r.n_cut, r.n_observed, r.boot_repeats), (0, 4, 0));
        assert_eq!(r.tmax, 4.0);
        assert_eq!(r.estimate("tau").map(|e| e.name.as_str()), Some("tau"));
        assert!((r.bic - bic(4, 1, r.nll)).abs() < 1e-12);
    }

    #[test]
    fn censoring_moves_long_dwells_into_ncut() {
        let config = FitConfig::default();
        let dwells = [1.0, 2.0, 3.0, 20.0, 30.0];
        // Tmax = 30 - 5 = 25; 30 is censored, 20 is observed.
        let r = &fit(&dwells, &config).unwrap()[0];
        assert_eq!(r.tmax, 25.0);
        assert_eq!((r.n_observed, r.n_cut), (4, 1));
        assert!((r.values()[0] - (26.0 / 4.0 + 25.0 / 4.0)).abs() < 1e-12);
    }

    #[test]
    fn tcut_drops_short_dwells_and_is_reported() {
        let config = FitConfig {
            include_over_tmax: false,
            tcut: 1.5,
            ..FitConfig::default()
        };
        let r = &fit(&[1.0, 2.0, 3.0, 4.0], &config).unwrap()[0];
        assert_eq!(r.n_observed, 3);
        assert_eq!(r.tcut, 1.5);
        let curve = fitted_curve(r, &[1.5]);
        // At t = tcut the normalized density equals 1 / tau.
        assert!((curve[0] - 1.0 / r.values()[0]).abs() < 1e-12);
    }

    #[test]
    fn tcut_term_enters_once_so_taus_keep_the_offset() {
        let dwells = crate::data::simulate_dwells(&MixtureParams::single(10.0), 20_000, 17).unwrap();
        let config = FitConfig {
            include_over_tmax: false,
            tcut: 5.0,
            ..FitConfig::default()
        };
        let r = &fit(&dwells, &config).unwrap()[0];
        let tau = r.values()[0];
        // Exponential dwells kept above tcut average tcut + 10.
        assert!((tau - 15.0).abs() < 0.45, "tau={tau}");

        let sample = CensoredSample::from_raw(&dwells, false, config.tmax_margin, config.tcut).unwrap();
        let nll = |t: f64| negative_log_likelihood(&sample, &MixtureParams::single(t));
        assert!((nll(tau) - r.nll).abs() < 1e-9 * r.nll.abs());
        assert!(nll(tau) < nll(tau - config.tcut));
        assert!(nll(tau) < nll(tau * 1.01));
        assert!(nll(tau) < nll(tau * 0.99));
    }

    #[test]
    fn bounds_override_with_wrong_length_is_rejected() {
        let config = FitConfig {
            model: ModelRequest::Single(ModelOrder::Two),
            bounds: Some(crate::domain::Bounds::new(vec![0.0], vec![1.0]).unwrap()),
            ..FitConfig::default()
        };
        let err = fit(&[1.0, 2.0, 3.0, 40.0], &config).unwrap_err();
        assert!(matches!(err, FitError::Configuration(_)));
    }

    #[test]
    fn two_exponential_result_is_canonical_and_named() {
        let truth = MixtureParams::new(vec![0.7, 0.3], vec![1.0, 12.0]).unwrap();
        let dwells = crate::data::simulate_dwells(&truth, 500, 4).unwrap();
        let config = FitConfig {
            model: ModelRequest::Single(ModelOrder::Two),
            include_over_tmax: false,
            anneal: crate::domain::AnnealConfig {
                alpha: 0.9,
                step_size: StepSize::Uniform(0.5),
                ..Default::default()
            },
            ..FitConfig::default()
        };
        let r = &fit(&dwells, &config).unwrap()[0];
        let names: Vec<&str> = r.estimates.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["p", "tau1", "tau2"]);
        let v = r.values();
        assert!(v[1] <= v[2]);
        assert!((0.0..=1.0).contains(&v[0]));
        assert!(r.steps.is_some());
    }
}
