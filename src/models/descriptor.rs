//! Per-order model registry.
//!
//! Each supported order has one static `ModelDescriptor` describing how the
//! fitter should treat it: reported parameter names, the raw-vector starting
//! point and the default search box. Callers select a descriptor with
//! [`descriptor`] instead of branching on the order.

use crate::domain::{Bounds, ModelOrder};
use crate::models::MixtureParams;

/// Bounds on the fraction logits `Z_i`.
const LOGIT_BOUND: f64 = 12.0;

/// Upper edge of the time-constant range, as a multiple of `Tmax`.
const TAU_CEILING_FACTOR: f64 = 3.0;

#[derive(Debug)]
pub struct ModelDescriptor {
    pub order: ModelOrder,
    /// Reported names, `[p.., tau..]`.
    pub param_names: &'static [&'static str],
    /// Starting time constants as multiples of the mean observed dwell.
    tau_multipliers: &'static [f64],
    /// Interior edges splitting the time-constant range between components.
    /// Empty means every component searches the whole range.
    tau_edges: &'static [f64],
}

static REGISTRY: [ModelDescriptor; 4] = [
    ModelDescriptor {
        order: ModelOrder::One,
        param_names: &["tau"],
        tau_multipliers: &[1.0],
        tau_edges: &[],
    },
    ModelDescriptor {
        order: ModelOrder::Two,
        param_names: &["p", "tau1", "tau2"],
        tau_multipliers: &[1.0, 2.0],
        tau_edges: &[],
    },
    ModelDescriptor {
        order: ModelOrder::Three,
        param_names: &["p1", "p2", "tau1", "tau2", "tau3"],
        tau_multipliers: &[0.5, 1.0, 2.0],
        tau_edges: &[1.5, 30.0],
    },
    ModelDescriptor {
        order: ModelOrder::Four,
        param_names: &["p1", "p2", "p3", "tau1", "tau2", "tau3", "tau4"],
        tau_multipliers: &[0.25, 0.5, 2.0, 4.0],
        tau_edges: &[],
    },
];

pub fn descriptor(order: ModelOrder) -> &'static ModelDescriptor {
    &REGISTRY[order.components() - 1]
}

impl ModelDescriptor {
    pub fn components(&self) -> usize {
        self.order.components()
    }

    pub fn param_count(&self) -> usize {
        self.param_names.len()
    }

    pub fn transform(&self, raw: &[f64]) -> MixtureParams {
        MixtureParams::from_raw(raw, self.components())
    }

    pub fn canonicalize(&self, params: &MixtureParams) -> MixtureParams {
        params.canonical()
    }

    /// Equal fractions (`Z = 0`) and time constants spread around the mean dwell.
    pub fn initial_guess(&self, mean_dwell: f64) -> Vec<f64> {
        let mean_dwell = mean_dwell.max(f64::MIN_POSITIVE);
        std::iter::repeat_n(0.0, self.components() - 1)
            .chain(self.tau_multipliers.iter().map(|m| (m * mean_dwell).ln()))
            .collect()
    }

    /// Logits in `[-12, 12]`, log time constants in `[ln tau_floor, ln 3·Tmax]`.
    ///
    /// 3Exp splits that range at 1.5 and 30 so that `tau1 <= 1.5 <= tau2 <= 30 <= tau3`.
    /// Edges are clamped into the range, so a short trace can collapse a
    /// component's interval to a single point.
    pub fn default_bounds(&self, tmax: f64, tau_floor: f64) -> Bounds {
        let k = self.components();
        let floor = tau_floor;
        let ceiling = (TAU_CEILING_FACTOR * tmax).max(10.0 * tau_floor);

        let (tau_lower, tau_upper): (Vec<f64>, Vec<f64>) = if self.tau_edges.is_empty() {
            (vec![floor.ln(); k], vec![ceiling.ln(); k])
        } else {
            let edges: Vec<f64> = std::iter::once(floor)
                .chain(self.tau_edges.iter().map(|e| e.clamp(floor, ceiling)))
                .chain(std::iter::once(ceiling))
                .collect();
            edges.windows(2).map(|w| (w[0].ln(), w[1].ln())).unzip()
        };

        let lower = std::iter::repeat_n(-LOGIT_BOUND, k - 1).chain(tau_lower).collect();
        let upper = std::iter::repeat_n(LOGIT_BOUND, k - 1).chain(tau_upper).collect();
        Bounds { lower, upper }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_indexed_by_order() {
        for order in ModelOrder::ALL {
            let d = descriptor(order);
            assert_eq!(d.order, order);
            assert_eq!(d.param_count(), order.param_count());
        }
    }

    #[test]
    fn initial_guess_sits_inside_default_bounds() {
        for order in ModelOrder::ALL {
            let d = descriptor(order);
            let bounds = d.default_bounds(500.0, 0.3);
            assert_eq!(bounds.len(), d.param_count());
            assert!(bounds.validate().is_ok());
            for mean in [0.1, 1.0, 20.0, 5_000.0] {
                let guess = bounds.clamp(&d.initial_guess(mean));
                assert_eq!(guess.len(), d.param_count());
                for (i, g) in guess.iter().enumerate() {
                    assert!(
                        *g >= bounds.lower[i] && *g <= bounds.upper[i],
                        "{order} coordinate {i} out of bounds for mean {mean}"
                    );
                }
            }
        }
        let d = descriptor(ModelOrder::Two);
        let guess = d.initial_guess(20.0);
        assert_eq!(d.default_bounds(500.0, 0.3).clamp(&guess), guess);
    }

    #[test]
    fn two_exp_guess_matches_mean_and_double_mean() {
        let guess = descriptor(ModelOrder::Two).initial_guess(10.0);
        assert_eq!(guess[0], 0.0);
        assert!((guess[1] - 10.0_f64.ln()).abs() < 1e-12);
        assert!((guess[2] - 20.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn tau_range_spans_floor_to_three_tmax() {
        let bounds = descriptor(ModelOrder::Two).default_bounds(100.0, 0.3);
        assert!((bounds.lower[1] - 0.3_f64.ln()).abs() < 1e-12);
        assert!((bounds.upper[2] - 300.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn three_exp_time_constants_are_staggered() {
        let bounds = descriptor(ModelOrder::Three).default_bounds(100.0, 0.3);
        let lo: Vec<f64> = bounds.lower[2..].iter().map(|v| v.exp()).collect();
        let hi: Vec<f64> = bounds.upper[2..].iter().map(|v| v.exp()).collect();
        let want_lo = [0.3, 1.5, 30.0];
        let want_hi = [1.5, 30.0, 300.0];
        for i in 0..3 {
            assert!((lo[i] - want_lo[i]).abs() < 1e-9, "lo={lo:?}");
            assert!((hi[i] - want_hi[i]).abs() < 1e-9, "hi={hi:?}");
        }
        assert_eq!(&bounds.lower[..2], &[-LOGIT_BOUND, -LOGIT_BOUND]);

        // Other orders keep one shared range.
        let four = descriptor(ModelOrder::Four).default_bounds(100.0, 0.3);
        assert!(four.lower[3..].iter().all(|v| *v == four.lower[3]));
        assert!(four.upper[3..].iter().all(|v| *v == four.upper[3]));
    }

    #[test]
    fn staggered_edges_stay_inside_a_short_range() {
        // Ceiling = max(3 · 2, 10 · 0.3) = 6, below the 30 edge.
        let bounds = descriptor(ModelOrder::Three).default_bounds(2.0, 0.3);
        assert!(bounds.validate().is_ok());
        assert!((bounds.lower[4] - 6.0_f64.ln()).abs() < 1e-12);
        assert_eq!(bounds.lower[4], bounds.upper[4]);
        assert!((bounds.upper[3] - 6.0_f64.ln()).abs() < 1e-12);
    }
}
