//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - handed to downstream export/plotting code as-is
//! - loaded from a configuration file by a driver

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::FitError;
use crate::models::MixtureParams;

/// Number of exponential components in the mixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelOrder {
    #[serde(rename = "1Exp")]
    One,
    #[serde(rename = "2Exp")]
    Two,
    #[serde(rename = "3Exp")]
    Three,
    #[serde(rename = "4Exp")]
    Four,
}

impl ModelOrder {
    pub const ALL: [ModelOrder; 4] = [
        ModelOrder::One,
        ModelOrder::Two,
        ModelOrder::Three,
        ModelOrder::Four,
    ];

    /// Tag used in configuration and results (`"1Exp"` .. `"4Exp"`).
    pub fn tag(self) -> &'static str {
        match self {
            ModelOrder::One => "1Exp",
            ModelOrder::Two => "2Exp",
            ModelOrder::Three => "3Exp",
            ModelOrder::Four => "4Exp",
        }
    }

    /// Number of exponential components `k`.
    pub fn components(self) -> usize {
        match self {
            ModelOrder::One => 1,
            ModelOrder::Two => 2,
            ModelOrder::Three => 3,
            ModelOrder::Four => 4,
        }
    }

    pub fn from_components(k: usize) -> Option<Self> {
        match k {
            1 => Some(ModelOrder::One),
            2 => Some(ModelOrder::Two),
            3 => Some(ModelOrder::Three),
            4 => Some(ModelOrder::Four),
            _ => None,
        }
    }

    /// Length of the reported parameter vector: `k - 1` fractions plus `k` time constants.
    pub fn param_count(self) -> usize {
        2 * self.components() - 1
    }
}

impl fmt::Display for ModelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ModelOrder {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        ModelOrder::ALL
            .into_iter()
            .find(|order| order.tag().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| FitError::config(format!("unknown model order '{trimmed}'")))
    }
}

/// Which model(s) a single `fit` call produces.
///
/// `OneAndTwo` is the composite `"1Exp+2Exp"` request: both orders are fitted
/// independently and returned in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModelRequest {
    Single(ModelOrder),
    OneAndTwo,
}

impl ModelRequest {
    pub fn orders(self) -> Vec<ModelOrder> {
        match self {
            ModelRequest::Single(order) => vec![order],
            ModelRequest::OneAndTwo => vec![ModelOrder::One, ModelOrder::Two],
        }
    }
}

impl fmt::Display for ModelRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelRequest::Single(order) => f.write_str(order.tag()),
            ModelRequest::OneAndTwo => f.write_str("1Exp+2Exp"),
        }
    }
}

impl FromStr for ModelRequest {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("1Exp+2Exp") {
            return Ok(ModelRequest::OneAndTwo);
        }
        s.parse().map(ModelRequest::Single)
    }
}

impl TryFrom<String> for ModelRequest {
    type Error = FitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModelRequest> for String {
    fn from(value: ModelRequest) -> Self {
        value.to_string()
    }
}

/// Proposal half-width `δ` per coordinate of the raw optimizer vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepSize {
    /// One `δ` shared by every coordinate.
    Uniform(f64),
    /// A separate (usually smaller) `δ` for the first coordinate.
    SplitFirst { first: f64, rest: f64 },
}

impl StepSize {
    pub fn delta(self, coordinate: usize) -> f64 {
        match self {
            StepSize::Uniform(delta) => delta,
            StepSize::SplitFirst { first, rest } => {
                if coordinate == 0 {
                    first
                } else {
                    rest
                }
            }
        }
    }

    fn is_valid(self) -> bool {
        let ok = |d: f64| d.is_finite() && d > 0.0;
        match self {
            StepSize::Uniform(delta) => ok(delta),
            StepSize::SplitFirst { first, rest } => ok(first) && ok(rest),
        }
    }
}

impl Default for StepSize {
    fn default() -> Self {
        StepSize::Uniform(1.0)
    }
}

/// Simulated-annealing schedule.
///
/// The temperature is multiplied by `alpha` every `steps_per_temperature`
/// proposals, starting at `t_start`, until it drops to `t_final` or below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealConfig {
    pub t_start: f64,
    pub t_final: f64,
    pub alpha: f64,
    pub steps_per_temperature: usize,
    pub step_size: StepSize,
    /// Optional hard cap on proposals per run. `None` keeps the run length a
    /// pure function of the schedule.
    pub max_proposals: Option<usize>,
}

impl Default for AnnealConfig {
    fn default() -> Self {
        Self {
            t_start: 100.0,
            t_final: 0.001,
            alpha: 0.99,
            steps_per_temperature: 100,
            step_size: StepSize::default(),
            max_proposals: None,
        }
    }
}

impl AnnealConfig {
    /// Number of proposals a run makes under this schedule.
    ///
    /// Uses the same repeated multiplication as the annealing loop, so the two
    /// always agree: `steps_per_temperature · ⌈ln(t_final/t_start)/ln(alpha)⌉`
    /// (capped by `max_proposals`).
    pub fn proposal_count(&self) -> usize {
        let mut temperature = self.t_start;
        let mut coolings = 0usize;
        while temperature > self.t_final {
            temperature *= self.alpha;
            coolings += 1;
        }
        let total = coolings.saturating_mul(self.steps_per_temperature);
        match self.max_proposals {
            Some(cap) => total.min(cap),
            None => total,
        }
    }

    pub fn validate(&self) -> Result<(), FitError> {
        if !(self.t_start.is_finite() && self.t_start > 0.0) {
            return Err(FitError::config(format!(
                "anneal t_start must be finite and > 0 (got {})",
                self.t_start
            )));
        }
        if !(self.t_final.is_finite() && self.t_final > 0.0 && self.t_final < self.t_start) {
            return Err(FitError::config(format!(
                "anneal t_final must be in (0, t_start) (got {})",
                self.t_final
            )));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(FitError::config(format!(
                "anneal alpha must be in (0, 1) (got {})",
                self.alpha
            )));
        }
        if self.steps_per_temperature == 0 {
            return Err(FitError::config("anneal steps_per_temperature must be >= 1"));
        }
        if !self.step_size.is_valid() {
            return Err(FitError::config("anneal step sizes must be finite and > 0"));
        }
        if self.max_proposals == Some(0) {
            return Err(FitError::config("anneal max_proposals must be >= 1 when set"));
        }
        Ok(())
    }
}

/// Box constraints on the raw optimizer vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Bounds {
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self, FitError> {
        let bounds = Self { lower, upper };
        bounds.validate()?;
        Ok(bounds)
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// Project `x` onto the box.
    pub fn clamp(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.lower.iter().zip(self.upper.iter()))
            .map(|(&v, (&lo, &hi))| v.clamp(lo, hi))
            .collect()
    }

    pub fn validate(&self) -> Result<(), FitError> {
        if self.lower.len() != self.upper.len() {
            return Err(FitError::config(format!(
                "bounds length mismatch: {} lower vs {} upper",
                self.lower.len(),
                self.upper.len()
            )));
        }
        for (i, (&lo, &hi)) in self.lower.iter().zip(self.upper.iter()).enumerate() {
            if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
                return Err(FitError::config(format!(
                    "invalid bounds for coordinate {i}: [{lo}, {hi}]"
                )));
            }
        }
        Ok(())
    }
}

/// Configuration of a single `fit` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    pub model: ModelRequest,
    /// Independent annealing runs per fit; the lowest objective wins.
    pub n_fits: usize,
    /// Treat the longest dwells as right-censored at `max(dwells) - tmax_margin`.
    pub include_over_tmax: bool,
    pub tmax_margin: f64,
    /// Left-truncation threshold. Dwells below it are dropped and the likelihood
    /// gains one `ln S(tcut)` term (not one per dwell), so fitted time constants
    /// include an offset of about `tcut`.
    pub tcut: f64,
    pub bootstrap: bool,
    pub boot_repeats: usize,
    /// Fraction of failed bootstrap replicates tolerated before a warning is raised.
    pub max_failed_fraction: f64,
    pub seed: u64,
    /// Lower edge of the time-constant search range.
    pub tau_floor: f64,
    /// Overrides the model's default raw-vector bounds when set.
    pub bounds: Option<Bounds>,
    pub anneal: AnnealConfig,
    pub dataset_name: String,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            model: ModelRequest::Single(ModelOrder::One),
            n_fits: 1,
            include_over_tmax: true,
            tmax_margin: 5.0,
            tcut: 0.0,
            bootstrap: false,
            boot_repeats: 100,
            max_failed_fraction: 0.1,
            seed: 0,
            tau_floor: 0.3,
            bounds: None,
            anneal: AnnealConfig::default(),
            dataset_name: "Dwells".to_string(),
        }
    }
}

impl FitConfig {
    pub fn validate(&self) -> Result<(), FitError> {
        if self.n_fits == 0 {
            return Err(FitError::config("n_fits must be >= 1"));
        }
        if !(self.tcut.is_finite() && self.tcut >= 0.0) {
            return Err(FitError::config(format!(
                "tcut must be finite and >= 0 (got {})",
                self.tcut
            )));
        }
        if !(self.tmax_margin.is_finite() && self.tmax_margin >= 0.0) {
            return Err(FitError::config(format!(
                "tmax_margin must be finite and >= 0 (got {})",
                self.tmax_margin
            )));
        }
        if self.bootstrap && self.boot_repeats == 0 {
            return Err(FitError::config("boot_repeats must be >= 1 when bootstrap is enabled"));
        }
        if !(0.0..=1.0).contains(&self.max_failed_fraction) {
            return Err(FitError::config(format!(
                "max_failed_fraction must be in [0, 1] (got {})",
                self.max_failed_fraction
            )));
        }
        if !(self.tau_floor.is_finite() && self.tau_floor > 0.0) {
            return Err(FitError::config(format!(
                "tau_floor must be finite and > 0 (got {})",
                self.tau_floor
            )));
        }
        if let Some(bounds) = &self.bounds {
            bounds.validate()?;
        }
        self.anneal.validate()
    }
}

/// Observed dwells together with their censoring/truncation bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct CensoredSample {
    /// Observed (uncensored, untruncated) durations.
    pub dwells: Vec<f64>,
    /// Number of right-censored events (dwells that reached `tmax`).
    pub n_cut: usize,
    /// Censoring threshold.
    pub tmax: f64,
    /// Left-truncation threshold.
    pub tcut: f64,
}

impl CensoredSample {
    /// Split raw dwells into observed and censored events.
    ///
    /// With `include_over_tmax`, `tmax = max(dwells) - margin` and every dwell
    /// at or above it is counted as censored. Otherwise `tmax = max(dwells)`,
    /// every dwell is observed and nothing is censored. Dwells below `tcut` are
    /// dropped in both cases.
    pub fn from_raw(
        dwells_all: &[f64],
        include_over_tmax: bool,
        margin: f64,
        tcut: f64,
    ) -> Result<Self, FitError> {
        if dwells_all.is_empty() {
            return Err(FitError::input("dwell array is empty"));
        }
        if let Some((index, value)) = dwells_all
            .iter()
            .enumerate()
            .find(|(_, d)| !(d.is_finite() && **d > 0.0))
        {
            return Err(FitError::input(format!(
                "dwell #{index} must be finite and > 0 (got {value})"
            )));
        }

        let longest = dwells_all.iter().copied().fold(f64::MIN, f64::max);
        let (tmax, dwells, n_cut) = if include_over_tmax {
            let tmax = longest - margin;
            let dwells: Vec<f64> = dwells_all
                .iter()
                .copied()
                .filter(|&d| d < tmax && d >= tcut)
                .collect();
            let n_cut = dwells_all.iter().filter(|&&d| d >= tmax).count();
            (tmax, dwells, n_cut)
        } else {
            let dwells: Vec<f64> = dwells_all.iter().copied().filter(|&d| d >= tcut).collect();
            (longest, dwells, 0)
        };

        if dwells.is_empty() {
            return Err(FitError::InsufficientData {
                tmax,
                tcut,
                total: dwells_all.len(),
            });
        }

        Ok(Self {
            dwells,
            n_cut,
            tmax,
            tcut,
        })
    }

    pub fn n_observed(&self) -> usize {
        self.dwells.len()
    }

    pub fn mean_observed(&self) -> f64 {
        crate::math::mean(&self.dwells).unwrap_or(0.0)
    }
}

/// One reported parameter with its bootstrap standard error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamEstimate {
    pub name: String,
    pub value: f64,
    pub error: f64,
}

/// Non-fatal conditions attached to a result.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum FitWarning {
    #[error(
        "degraded bootstrap: {failed} of {total} replicates excluded (allowed fraction {allowed})"
    )]
    DegradedBootstrap {
        failed: usize,
        total: usize,
        allowed: f64,
    },
}

/// Fit output for a single model order. Built once per fit and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub dataset: String,
    pub model: ModelOrder,
    /// Canonical mixture (time constants ascending).
    pub mixture: MixtureParams,
    /// Reported parameters, `[p.., tau..]`, with bootstrap errors (0 without bootstrap).
    pub estimates: Vec<ParamEstimate>,
    pub tmax: f64,
    pub n_cut: usize,
    pub tcut: f64,
    pub n_observed: usize,
    /// Effective bootstrap repeat count: replicates requested, or 0 when bootstrap was off.
    pub boot_repeats: usize,
    /// Accepted moves of the winning annealing run; `None` for the closed-form 1Exp fit.
    pub steps: Option<usize>,
    pub nll: f64,
    pub bic: f64,
    /// Canonical parameter vectors of the successful bootstrap replicates.
    pub replicates: Vec<Vec<f64>>,
    pub warnings: Vec<FitWarning>,
}

impl FitResult {
    pub fn values(&self) -> Vec<f64> {
        self.estimates.iter().map(|e| e.value).collect()
    }

    pub fn errors(&self) -> Vec<f64> {
        self.estimates.iter().map(|e| e.error).collect()
    }

    pub fn estimate(&self, name: &str) -> Option<&ParamEstimate> {
        self.estimates.iter().find(|e| e.name == name)
    }
}
