//! Cross-sectional day-by-day percentile table
//!
//! Every qualifying video contributes a reconstructed cumulative view count
//! for each lifecycle day it has lived through (up to the horizon). Those
//! contributions are summarised per day into percentile bands.

use serde::Serialize;
use tracing::debug;

use crate::error::{EstimatorError, EstimatorResult};
use crate::estimator::classify::{classify, KindFilter, DEFAULT_SHORTS_MAX_DURATION_SECS};
use crate::estimator::growth::GrowthCurve;
use crate::estimator::models::{EstimatedDailyCohortStat, SnapshotBatch};
use crate::estimator::percentile::summarize;
use crate::estimator::round2;

/// Longest horizon a cohort table may cover (about a century)
pub const MAX_HORIZON_DAYS: u32 = 36_500;

/// Dense per-day table plus bookkeeping on which videos were left out
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortTable {
    pub days: Vec<EstimatedDailyCohortStat>,
    /// Videos that contributed to at least one day
    pub contributing_videos: usize,
    pub excluded_zero_views: usize,
    pub excluded_by_kind: usize,
    /// Videos published less than a full day before the snapshot
    pub excluded_too_young: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CohortEstimator {
    curve: GrowthCurve,
    max_days: u32,
    filter: KindFilter,
    shorts_max_duration_secs: u64,
}

impl CohortEstimator {
    /// Fails when `max_days` exceeds [`MAX_HORIZON_DAYS`]
    pub fn new(curve: GrowthCurve, max_days: u32) -> EstimatorResult<Self> {
        if max_days > MAX_HORIZON_DAYS {
            return Err(EstimatorError::HorizonTooLarge {
                requested: max_days,
                max: MAX_HORIZON_DAYS,
            });
        }

        Ok(Self {
            curve,
            max_days,
            filter: KindFilter::All,
            shorts_max_duration_secs: DEFAULT_SHORTS_MAX_DURATION_SECS,
        })
    }

    pub fn with_filter(mut self, filter: KindFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_shorts_threshold(mut self, shorts_max_duration_secs: u64) -> Self {
        self.shorts_max_duration_secs = shorts_max_duration_secs;
        self
    }

    pub fn max_days(&self) -> u32 {
        self.max_days
    }

    pub fn curve(&self) -> GrowthCurve {
        self.curve
    }

    /// One row per day in `[1, max_days]`, ascending
    pub fn estimate(&self, batch: &SnapshotBatch) -> Vec<EstimatedDailyCohortStat> {
        self.estimate_detailed(batch).days
    }

    pub fn estimate_detailed(&self, batch: &SnapshotBatch) -> CohortTable {
        let as_of = batch.as_of();
        let mut cohorts: Vec<Vec<f64>> = vec![Vec::new(); self.max_days as usize];
        let mut table = CohortTable {
            days: Vec::with_capacity(self.max_days as usize),
            contributing_videos: 0,
            excluded_zero_views: 0,
            excluded_by_kind: 0,
            excluded_too_young: 0,
        };

        for video in batch.videos() {
            if video.view_count == 0 {
                table.excluded_zero_views += 1;
                continue;
            }
            if !self
                .filter
                .admits(classify(video.duration_seconds, self.shorts_max_duration_secs))
            {
                table.excluded_by_kind += 1;
                continue;
            }

            let age_days = video.age_days(as_of);
            if age_days == 0 {
                table.excluded_too_young += 1;
                continue;
            }

            let last_day = age_days.min(self.max_days);
            for day in 1..=last_day {
                cohorts[(day - 1) as usize].push(self.curve.estimate(
                    video.view_count,
                    age_days,
                    day,
                ));
            }
            if last_day > 0 {
                table.contributing_videos += 1;
            }
        }

        table.days = cohorts
            .into_iter()
            .zip(1..)
            .map(|(mut values, day)| daily_stat(day, &mut values))
            .collect();

        debug!(
            "Cohort estimated over {} days from {} of {} videos",
            self.max_days,
            table.contributing_videos,
            batch.len()
        );

        table
    }
}

fn daily_stat(day: u32, values: &mut [f64]) -> EstimatedDailyCohortStat {
    match summarize(values) {
        None => EstimatedDailyCohortStat::empty(day),
        Some(summary) => EstimatedDailyCohortStat {
            day,
            sample_size: summary.count,
            min: Some(round2(summary.min)),
            p10: Some(round2(summary.p10)),
            lower_bound: Some(round2(summary.p25)),
            median: Some(round2(summary.p50)),
            upper_bound: Some(round2(summary.p75)),
            p90: Some(round2(summary.p90)),
            max: Some(round2(summary.max)),
            mean: Some(round2(summary.mean)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::models::VideoSnapshot;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn video(id: &str, views: u64, age_days: i64, duration_seconds: u64) -> VideoSnapshot {
        VideoSnapshot {
            id: id.to_string(),
            title: None,
            published_at: as_of() - Duration::days(age_days) - Duration::hours(2),
            view_count: views,
            like_count: 0,
            comment_count: 0,
            duration_seconds,
        }
    }

    fn batch(videos: Vec<VideoSnapshot>) -> SnapshotBatch {
        SnapshotBatch::from_snapshots(videos, as_of()).unwrap()
    }

    #[test]
    fn test_days_are_dense_and_ascending() {
        let estimator = CohortEstimator::new(GrowthCurve::default(), 7).unwrap();
        let days = estimator.estimate(&batch(vec![video("a", 100, 2, 300)]));
        assert_eq!(days.len(), 7);
        let numbers: Vec<u32> = days.iter().map(|d| d.day).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(days[0].sample_size, 1);
        assert_eq!(days[1].sample_size, 1);
        assert_eq!(days[2], EstimatedDailyCohortStat::empty(3));
    }

    #[test]
    fn test_zero_horizon() {
        let estimator = CohortEstimator::new(GrowthCurve::default(), 0).unwrap();
        let table = estimator.estimate_detailed(&batch(vec![video("a", 100, 2, 300)]));
        assert!(table.days.is_empty());
        assert_eq!(table.contributing_videos, 0);
    }

    #[test]
    fn test_horizon_is_capped() {
        assert!(CohortEstimator::new(GrowthCurve::default(), MAX_HORIZON_DAYS).is_ok());
        assert_eq!(
            CohortEstimator::new(GrowthCurve::default(), u32::MAX),
            Err(EstimatorError::HorizonTooLarge {
                requested: u32::MAX,
                max: MAX_HORIZON_DAYS
            })
        );
    }

    #[test]
    fn test_exclusions_are_counted() {
        let estimator = CohortEstimator::new(GrowthCurve::default(), 10).unwrap()
            .with_filter(KindFilter::LongForm);
        let table = estimator.estimate_detailed(&batch(vec![
            video("zero", 0, 5, 300),
            video("short", 900, 5, 30),
            video("fresh", 900, 0, 300),
            video("long", 900, 5, 300),
        ]));
        assert_eq!(table.excluded_zero_views, 1);
        assert_eq!(table.excluded_by_kind, 1);
        assert_eq!(table.excluded_too_young, 1);
        assert_eq!(table.contributing_videos, 1);
        assert_eq!(table.days[4].median, Some(900.0));
    }

    #[test]
    fn test_shorts_threshold_is_configurable() {
        let videos = vec![video("a", 500, 3, 90)];
        let default = CohortEstimator::new(GrowthCurve::default(), 3).unwrap()
            .with_filter(KindFilter::Short)
            .estimate(&batch(videos.clone()));
        assert_eq!(default[0].sample_size, 0);

        let widened = CohortEstimator::new(GrowthCurve::default(), 3).unwrap()
            .with_filter(KindFilter::Short)
            .with_shorts_threshold(120)
            .estimate(&batch(videos));
        assert_eq!(widened[0].sample_size, 1);
    }

    #[test]
    fn test_percentile_bands() {
        let estimator = CohortEstimator::new(GrowthCurve::new(1.0).unwrap(), 1).unwrap();
        let days = estimator.estimate(&batch(vec![
            video("a", 100, 1, 300),
            video("b", 200, 1, 300),
            video("c", 300, 1, 300),
            video("d", 400, 1, 300),
        ]));
        let day = &days[0];
        assert_eq!(day.sample_size, 4);
        assert_eq!(day.min, Some(100.0));
        assert_eq!(day.p10, Some(130.0));
        assert_eq!(day.lower_bound, Some(175.0));
        assert_eq!(day.median, Some(250.0));
        assert_eq!(day.upper_bound, Some(325.0));
        assert_eq!(day.p90, Some(370.0));
        assert_eq!(day.max, Some(400.0));
        assert_eq!(day.mean, Some(250.0));
    }
}
