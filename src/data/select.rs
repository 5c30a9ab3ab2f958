//! Dwell selection applied before fitting.
//!
//! Upstream step detection occasionally emits zero/negative or absurdly short
//! dwells. A selection keeps dwells strictly inside `(min, max)` and can raise
//! anything shorter than `floor` to `floor` (the detection limit).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DwellSelection {
    /// Exclusive lower limit; values `<= min` are dropped.
    pub min: f64,
    /// Exclusive upper limit; `None` keeps everything above `min`.
    pub max: Option<f64>,
    /// Raise kept dwells shorter than this to this value.
    pub floor: Option<f64>,
}

impl Default for DwellSelection {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: None,
            floor: None,
        }
    }
}

impl DwellSelection {
    /// Detection-limit flooring at 0.3 s, no range limits.
    pub fn with_detection_floor() -> Self {
        Self {
            floor: Some(0.3),
            ..Self::default()
        }
    }

    pub fn apply(&self, dwells: &[f64]) -> Vec<f64> {
        let min = self.min.max(0.0);
        dwells
            .iter()
            .copied()
            .filter(|d| d.is_finite() && *d > min)
            .filter(|d| self.max.is_none_or(|max| *d < max))
            .map(|d| match self.floor {
                Some(floor) => d.max(floor),
                None => d,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_drops_only_invalid_dwells() {
        let kept = DwellSelection::default().apply(&[0.0, -1.0, f64::NAN, 0.1, 5.0]);
        assert_eq!(kept, vec![0.1, 5.0]);
    }

    #[test]
    fn range_and_floor_apply_together() {
        let selection = DwellSelection {
            min: 0.05,
            max: Some(10.0),
            floor: Some(0.3),
        };
        let kept = selection.apply(&[0.01, 0.1, 0.5, 9.0, 10.0, 12.0]);
        assert_eq!(kept, vec![0.3, 0.5, 9.0]);
    }

    #[test]
    fn detection_floor_preset() {
        let kept = DwellSelection::with_detection_floor().apply(&[0.2, 1.0]);
        assert_eq!(kept, vec![0.3, 1.0]);
    }
}
