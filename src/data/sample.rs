//! Synthetic dwell generation from a known exponential mixture.
//!
//! Used to validate the engine end to end: draw dwells from fixed
//! `(P, tau)`, fit, and compare the recovered parameters with the truth.

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Exp;

use crate::error::FitError;
use crate::models::MixtureParams;

/// Draw `n` dwells from `params` with a seeded RNG.
///
/// Each dwell picks a component with probability `P_i` and then an
/// exponential duration with mean `tau_i`.
pub fn simulate_dwells(params: &MixtureParams, n: usize, seed: u64) -> Result<Vec<f64>, FitError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let picker = WeightedIndex::new(params.fractions())
        .map_err(|e| FitError::input(format!("invalid mixture fractions: {e}")))?;
    let components: Vec<Exp<f64>> = params
        .taus()
        .iter()
        .map(|&tau| Exp::new(1.0 / tau))
        .collect::<Result<_, _>>()
        .map_err(|e| FitError::input(format!("invalid time constant: {e}")))?;

    let mut dwells = Vec::with_capacity(n);
    while dwells.len() < n {
        let component = &components[picker.sample(&mut rng)];
        let d: f64 = component.sample(&mut rng);
        // Exp can return exactly 0.0; dwells must be strictly positive.
        if d > 0.0 {
            dwells.push(d);
        }
    }
    Ok(dwells)
}
