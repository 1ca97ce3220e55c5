//! Front-loaded growth curve used to reconstruct unobserved view history

use tracing::warn;

use crate::error::{EstimatorError, EstimatorResult};

/// Model assumption behind every reconstructed trajectory. It is a heuristic,
/// not something derived from the snapshot data.
pub const FRONT_LOADED_ACCUMULATION: &str =
    "views accrue monotonically and disproportionately early in a video's life";

pub const DEFAULT_GROWTH_EXPONENT: f64 = 0.8;

/// Exponents outside this range are accepted but unusual for upload traffic
const TYPICAL_EXPONENT_RANGE: (f64, f64) = (0.7, 0.9);

/// Power-law curve `views(d) = total * (d / age) ^ k` with `0 < k <= 1`.
///
/// Smaller `k` puts more of the total into the first days; `k = 1` is a
/// straight line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthCurve {
    exponent: f64,
}

impl GrowthCurve {
    pub fn new(exponent: f64) -> EstimatorResult<Self> {
        if !exponent.is_finite() || exponent <= 0.0 || exponent > 1.0 {
            return Err(EstimatorError::InvalidExponent(exponent));
        }

        let (low, high) = TYPICAL_EXPONENT_RANGE;
        if exponent < low || exponent > high {
            warn!(
                "Growth exponent {exponent} is outside the typical range [{low}, {high}]"
            );
        }

        Ok(Self { exponent })
    }

    pub fn exponent(&self) -> f64 {
        self.exponent
    }

    /// Estimated cumulative views on lifecycle `day` for a video that has
    /// `view_count` views after `age_days` days.
    ///
    /// Non-decreasing in `day`; returns exactly `view_count` from `age_days`
    /// onwards and 0 for day 0 or a video younger than a day.
    pub fn estimate(&self, view_count: u64, age_days: u32, day: u32) -> f64 {
        if day == 0 || age_days == 0 {
            return 0.0;
        }
        let total = view_count as f64;
        if day >= age_days {
            return total;
        }

        total * (f64::from(day) / f64::from(age_days)).powf(self.exponent)
    }
}

impl Default for GrowthCurve {
    fn default() -> Self {
        Self {
            exponent: DEFAULT_GROWTH_EXPONENT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_out_of_range_exponent() {
        assert!(GrowthCurve::new(0.0).is_err());
        assert!(GrowthCurve::new(-0.5).is_err());
        assert!(GrowthCurve::new(1.2).is_err());
        assert!(GrowthCurve::new(f64::NAN).is_err());
        assert!(GrowthCurve::new(1.0).is_ok());
        assert!(GrowthCurve::new(0.5).is_ok());
    }

    #[test]
    fn test_reproduces_total_at_current_age() {
        let curve = GrowthCurve::default();
        assert_eq!(curve.estimate(5000, 5, 5), 5000.0);
        assert_eq!(curve.estimate(1000, 1, 1), 1000.0);
        assert_eq!(curve.estimate(123_456_789, 400, 400), 123_456_789.0);
    }

    #[test]
    fn test_monotonic_in_day() {
        for exponent in [0.7, 0.8, 0.85, 1.0] {
            let curve = GrowthCurve::new(exponent).unwrap();
            let mut previous = 0.0;
            for day in 1..=60 {
                let value = curve.estimate(987_654, 45, day);
                assert!(value >= previous, "k={exponent} day={day}");
                previous = value;
            }
        }
    }

    #[test]
    fn test_front_loaded_above_linear() {
        let curve = GrowthCurve::new(0.8).unwrap();
        let linear = GrowthCurve::new(1.0).unwrap();
        let day = 10;
        assert!(curve.estimate(100_000, 40, day) > linear.estimate(100_000, 40, day));
        assert_eq!(linear.estimate(100_000, 40, day), 25_000.0);
    }

    #[test]
    fn test_known_value() {
        let curve = GrowthCurve::new(0.8).unwrap();
        let expected = 100_000.0 * (1.0_f64 / 40.0).powf(0.8);
        assert_eq!(curve.estimate(100_000, 40, 1), expected);
    }

    #[test]
    fn test_degenerate_inputs() {
        let curve = GrowthCurve::default();
        assert_eq!(curve.estimate(100, 0, 1), 0.0);
        assert_eq!(curve.estimate(100, 10, 0), 0.0);
        assert_eq!(curve.estimate(0, 10, 3), 0.0);
    }
}
