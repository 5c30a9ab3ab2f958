//! Censored, truncated negative log-likelihood.
//!
//! ```text
//! NLL = -Σ ln f(d_i) - Ncut · ln S(Tmax) + ln S(tcut)
//! ```
//!
//! - `f` is the mixture density of the observed dwells
//! - each right-censored event contributes the log-probability of outlasting `Tmax`
//! - the truncation term `ln S(tcut)` enters once, not once per dwell, so it
//!   does not renormalize each observation
//!
//! All logarithms are floored, so the value is finite for any finite parameters.

use crate::domain::CensoredSample;
use crate::math::ln_floored;
use crate::models::MixtureParams;

pub fn negative_log_likelihood(sample: &CensoredSample, params: &MixtureParams) -> f64 {
    let observed = params.log_density_sum(&sample.dwells);

    let censored = if sample.n_cut == 0 {
        0.0
    } else {
        sample.n_cut as f64 * ln_floored(params.survival(sample.tmax))
    };

    let truncation = if sample.tcut > 0.0 {
        ln_floored(params.survival(sample.tcut))
    } else {
        0.0
    };

    -observed - censored + truncation
}
