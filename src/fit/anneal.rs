//! Simulated annealing over a box-constrained parameter vector.
//!
//! Schedule: the temperature starts at `t_start` and is multiplied by `alpha`
//! every `steps_per_temperature` proposals until it reaches `t_final`. Run
//! length therefore depends only on the schedule (see
//! [`AnnealConfig::proposal_count`]), never on which moves were accepted.
//!
//! Each proposal redraws every coordinate uniformly from
//! `[max(x_i - δ_i, lo_i), min(x_i + δ_i, hi_i)]` and is accepted by the
//! Metropolis rule `u < exp(-ΔV / T)`.

use rand::Rng;

use crate::domain::{AnnealConfig, Bounds, StepSize};
use crate::math::exp_clamped;

/// Final state of one annealing run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnealOutcome {
    pub x: Vec<f64>,
    /// Objective at `x`.
    pub value: f64,
    /// Accepted moves.
    pub accepted: usize,
    pub proposals: usize,
}

/// Minimize `objective` starting from `initial` (projected into `bounds`).
pub fn anneal<F, R>(
    objective: F,
    initial: &[f64],
    bounds: &Bounds,
    config: &AnnealConfig,
    rng: &mut R,
) -> AnnealOutcome
where
    F: Fn(&[f64]) -> f64,
    R: Rng + ?Sized,
{
    debug_assert_eq!(initial.len(), bounds.len());

    let mut current = bounds.clamp(initial);
    let mut current_value = objective(&current);
    let mut trial = vec![0.0; current.len()];

    let mut temperature = config.t_start;
    let mut proposals = 0usize;
    let mut accepted = 0usize;

    while temperature > config.t_final {
        if config.max_proposals.is_some_and(|cap| proposals >= cap) {
            break;
        }
        proposals += 1;
        if proposals % config.steps_per_temperature == 0 {
            temperature *= config.alpha;
        }

        propose(&current, bounds, config.step_size, rng, &mut trial);
        let trial_value = objective(&trial);
        let u: f64 = rng.r#gen();

        let accept = trial_value.is_finite()
            && (!current_value.is_finite()
                || metropolis_accepts(trial_value - current_value, temperature, u));
        if accept {
            std::mem::swap(&mut current, &mut trial);
            current_value = trial_value;
            accepted += 1;
        }
    }

    AnnealOutcome {
        x: current,
        value: current_value,
        accepted,
        proposals,
    }
}

fn propose<R: Rng + ?Sized>(
    current: &[f64],
    bounds: &Bounds,
    step: StepSize,
    rng: &mut R,
    trial: &mut [f64],
) {
    for (i, (&x, slot)) in current.iter().zip(trial.iter_mut()).enumerate() {
        let delta = step.delta(i);
        let lo = (x - delta).max(bounds.lower[i]);
        let hi = (x + delta).min(bounds.upper[i]);
        *slot = if hi > lo { rng.gen_range(lo..=hi) } else { lo };
    }
}

/// `u < exp(-ΔV / T)` with the exponent clamped before exponentiating.
///
/// Improvements (`ΔV <= 0`) always pass since `u < 1`.
fn metropolis_accepts(delta: f64, temperature: f64, u: f64) -> bool {
    u < exp_clamped(-delta / temperature)
}
