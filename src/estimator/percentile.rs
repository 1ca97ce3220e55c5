//! Order statistics over finite samples
//!
//! Percentiles use linear interpolation between closest ranks
//! (`rank = p / 100 * (n - 1)`), the same convention as numpy's default.

use statrs::statistics::Statistics;

/// Linear-interpolated percentile of an ascending sample, `p` in `[0, 100]`
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let p = p.clamp(0.0, 100.0);
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let (a, b) = (sorted[lower], sorted[upper]);
    if lower == upper {
        return Some(a);
    }

    // Clamp so rounding can never step outside the bracketing order statistics
    let value = a + (b - a) * (rank - lower as f64);
    Some(value.clamp(a, b))
}

/// Summary of one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub min: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub max: f64,
    pub mean: f64,
}

/// Sort the sample in place and summarise it; `None` for an empty sample
pub fn summarize(values: &mut [f64]) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let sorted: &[f64] = values;
    let at = |p: f64| percentile(sorted, p).unwrap_or_default();

    Some(Summary {
        count: sorted.len(),
        min: sorted[0],
        p10: at(10.0),
        p25: at(25.0),
        p50: at(50.0),
        p75: at(75.0),
        p90: at(90.0),
        max: sorted[sorted.len() - 1],
        mean: sorted.iter().mean(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sample() {
        assert_eq!(percentile(&[], 50.0), None);
        let mut empty: Vec<f64> = Vec::new();
        assert_eq!(summarize(&mut empty), None);
    }

    #[test]
    fn test_single_value() {
        let sample = [42.0];
        assert_eq!(percentile(&sample, 0.0), Some(42.0));
        assert_eq!(percentile(&sample, 25.0), Some(42.0));
        assert_eq!(percentile(&sample, 100.0), Some(42.0));
    }

    #[test]
    fn test_linear_interpolation() {
        // numpy.percentile([1, 2, 3, 4], [25, 50, 75]) == [1.75, 2.5, 3.25]
        let sample = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&sample, 25.0), Some(1.75));
        assert_eq!(percentile(&sample, 50.0), Some(2.5));
        assert_eq!(percentile(&sample, 75.0), Some(3.25));
        assert_eq!(percentile(&sample, 0.0), Some(1.0));
        assert_eq!(percentile(&sample, 100.0), Some(4.0));
    }

    #[test]
    fn test_out_of_range_p_is_clamped() {
        let sample = [10.0, 20.0];
        assert_eq!(percentile(&sample, -5.0), Some(10.0));
        assert_eq!(percentile(&sample, 250.0), Some(20.0));
    }

    #[test]
    fn test_summary_ordering() {
        let mut sample = vec![900.0, 3.0, 77.5, 12.0, 12.0, 450.25, 1.0, 60.0, 8.0];
        let summary = summarize(&mut sample).unwrap();
        assert_eq!(summary.count, 9);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 900.0);
        assert_eq!(summary.p50, 12.0);
        assert!(summary.min <= summary.p10);
        assert!(summary.p10 <= summary.p25);
        assert!(summary.p25 <= summary.p50);
        assert!(summary.p50 <= summary.p75);
        assert!(summary.p75 <= summary.p90);
        assert!(summary.p90 <= summary.max);
        assert!((summary.mean - 1523.75 / 9.0).abs() < 1e-9);
    }
}
