//! Mixture of exponential dwell-time distributions.
//!
//! For `k` components with fractions `P_i` and time constants `tau_i`:
//!
//! - density:  `f(d) = Σ (P_i / tau_i) · exp(-d / tau_i)`
//! - survival: `S(t) = Σ P_i · exp(-t / tau_i)`
//!
//! The optimizer works on an unconstrained raw vector
//! `[Z_1..Z_{k-1}, T_1..T_k]` mapped to valid parameters by
//! `P_i = exp(Z_i) / (1 + Σ exp(Z_j))` and `tau_i = exp(T_i)`.

use serde::{Deserialize, Serialize};

use crate::domain::ModelOrder;
use crate::error::FitError;
use crate::math::{exp_clamped, ln_floored};

/// Fractions (all `k`, including the implied last one) and time constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureParams {
    fractions: Vec<f64>,
    taus: Vec<f64>,
}

impl MixtureParams {
    /// Validated constructor: `1..=4` components, fractions in `[0, 1]` summing
    /// to 1, time constants finite and positive.
    pub fn new(fractions: Vec<f64>, taus: Vec<f64>) -> Result<Self, FitError> {
        if fractions.len() != taus.len() || ModelOrder::from_components(taus.len()).is_none() {
            return Err(FitError::input(format!(
                "mixture needs 1..=4 components with one fraction per time constant (got {} fractions, {} taus)",
                fractions.len(),
                taus.len()
            )));
        }
        if taus.iter().any(|t| !(t.is_finite() && *t > 0.0)) {
            return Err(FitError::input("time constants must be finite and > 0"));
        }
        if fractions.iter().any(|p| !(0.0..=1.0).contains(p)) {
            return Err(FitError::input("fractions must lie in [0, 1]"));
        }
        let total: f64 = fractions.iter().sum();
        if (total - 1.0).abs() > 1e-9 {
            return Err(FitError::input(format!("fractions must sum to 1 (got {total})")));
        }
        Ok(Self { fractions, taus })
    }

    pub fn single(tau: f64) -> Self {
        Self {
            fractions: vec![1.0],
            taus: vec![tau],
        }
    }

    /// Map a raw optimizer vector of length `2k - 1` to mixture parameters.
    ///
    /// Any finite input gives fractions on the simplex and strictly positive,
    /// finite time constants: the logits are max-shifted before exponentiating
    /// and the log time constants are clamped to `±EXP_LIMIT`.
    pub fn from_raw(raw: &[f64], components: usize) -> Self {
        debug_assert_eq!(raw.len(), 2 * components - 1);
        let (logits, log_taus) = raw.split_at(components - 1);

        let shift = logits.iter().fold(0.0_f64, |m, &z| m.max(z));
        let reference = (-shift).exp();
        let weights: Vec<f64> = logits.iter().map(|&z| (z - shift).exp()).collect();
        let denom = reference + weights.iter().sum::<f64>();

        let mut fractions: Vec<f64> = weights.iter().map(|w| w / denom).collect();
        fractions.push(reference / denom);
        let taus = log_taus.iter().map(|&t| exp_clamped(t)).collect();

        Self { fractions, taus }
    }

    /// Inverse of [`MixtureParams::from_raw`]: `Z_i = ln(P_i / P_k)`, `T_i = ln(tau_i)`.
    pub fn to_raw(&self) -> Vec<f64> {
        let k = self.components();
        let last = self.fractions[k - 1];
        self.fractions[..k - 1]
            .iter()
            .map(|&p| ln_floored(p) - ln_floored(last))
            .chain(self.taus.iter().map(|&t| t.ln()))
            .collect()
    }

    /// Rebuild from a reported vector `[p_1..p_{k-1}, tau_1..tau_k]`; the last
    /// fraction is implied as `1 - Σ p`.
    pub fn from_values(order: ModelOrder, values: &[f64]) -> Result<Self, FitError> {
        let k = order.components();
        if values.len() != order.param_count() {
            return Err(FitError::input(format!(
                "{order} expects {} parameters (got {})",
                order.param_count(),
                values.len()
            )));
        }
        let (given, taus) = values.split_at(k - 1);
        let mut fractions = given.to_vec();
        fractions.push(1.0 - given.iter().sum::<f64>());
        Self::new(fractions, taus.to_vec())
    }

    pub fn components(&self) -> usize {
        self.taus.len()
    }

    pub fn fractions(&self) -> &[f64] {
        &self.fractions
    }

    pub fn taus(&self) -> &[f64] {
        &self.taus
    }

    /// Reported vector: the first `k - 1` fractions followed by all time constants.
    pub fn values(&self) -> Vec<f64> {
        let k = self.components();
        self.fractions[..k - 1]
            .iter()
            .chain(self.taus.iter())
            .copied()
            .collect()
    }

    pub fn density(&self, d: f64) -> f64 {
        self.fractions
            .iter()
            .zip(self.taus.iter())
            .map(|(&p, &tau)| p / tau * (-d / tau).exp())
            .sum()
    }

    pub fn survival(&self, t: f64) -> f64 {
        self.fractions
            .iter()
            .zip(self.taus.iter())
            .map(|(&p, &tau)| p * (-t / tau).exp())
            .sum()
    }

    /// Sum of `ln f(d)` over `dwells`, with every density floored before the log.
    pub fn log_density_sum(&self, dwells: &[f64]) -> f64 {
        let terms: Vec<(f64, f64)> = self
            .fractions
            .iter()
            .zip(self.taus.iter())
            .map(|(&p, &tau)| (p / tau, 1.0 / tau))
            .collect();
        dwells
            .iter()
            .map(|&d| {
                let density: f64 = terms.iter().map(|&(w, rate)| w * (-d * rate).exp()).sum();
                ln_floored(density)
            })
            .sum()
    }

    /// Canonical representative under component relabelling: components sorted
    /// by ascending time constant (ties broken by fraction).
    pub fn canonical(&self) -> Self {
        let mut ranking: Vec<usize> = (0..self.components()).collect();
        ranking.sort_by(|&a, &b| {
            self.taus[a]
                .total_cmp(&self.taus[b])
                .then(self.fractions[a].total_cmp(&self.fractions[b]))
        });
        Self {
            fractions: ranking.iter().map(|&c| self.fractions[c]).collect(),
            taus: ranking.iter().map(|&c| self.taus[c]).collect(),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.fractions.iter().chain(self.taus.iter()).all(|v| v.is_finite())
    }
}
