//! Data models for view-trajectory estimation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{EstimatorError, EstimatorResult};
use crate::estimator::classify::VideoKind;

/// Floor applied to a video's age in all rate arithmetic
pub const MIN_AGE_HOURS: f64 = 1.0;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Video record as supplied by a metrics provider, before validation.
///
/// Counters are signed so that upstream corruption (negative values) can be
/// detected and rejected rather than silently wrapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVideoRecord {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Publish time (RFC 3339)
    pub published_at: DateTime<Utc>,

    pub view_count: i64,

    #[serde(default)]
    pub like_count: i64,

    #[serde(default)]
    pub comment_count: i64,

    #[serde(default)]
    pub duration_seconds: i64,
}

/// Validated point-in-time view of a single video
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoSnapshot {
    pub id: String,
    pub title: Option<String>,
    pub published_at: DateTime<Utc>,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub duration_seconds: u64,
}

fn non_negative(id: &str, field: &'static str, value: i64) -> EstimatorResult<u64> {
    u64::try_from(value).map_err(|_| EstimatorError::NegativeCounter {
        id: id.to_string(),
        field,
        value,
    })
}

impl VideoSnapshot {
    /// Validate a raw record against the snapshot time.
    ///
    /// Negative counters and publish times after `as_of` are rejected.
    pub fn from_record(record: RawVideoRecord, as_of: DateTime<Utc>) -> EstimatorResult<Self> {
        if record.id.trim().is_empty() {
            return Err(EstimatorError::MissingId);
        }

        let view_count = non_negative(&record.id, "view_count", record.view_count)?;
        let like_count = non_negative(&record.id, "like_count", record.like_count)?;
        let comment_count = non_negative(&record.id, "comment_count", record.comment_count)?;
        let duration_seconds =
            non_negative(&record.id, "duration_seconds", record.duration_seconds)?;

        if record.published_at > as_of {
            return Err(EstimatorError::PublishedInFuture {
                id: record.id,
                published_at: record.published_at,
                as_of,
            });
        }

        Ok(Self {
            id: record.id,
            title: record.title,
            published_at: record.published_at,
            view_count,
            like_count,
            comment_count,
            duration_seconds,
        })
    }

    /// Age in hours, floored at [`MIN_AGE_HOURS`]
    pub fn age_hours(&self, as_of: DateTime<Utc>) -> f64 {
        let seconds = (as_of - self.published_at).num_seconds().max(0);
        (seconds as f64 / SECONDS_PER_HOUR).max(MIN_AGE_HOURS)
    }

    /// Whole days elapsed since publish (the 1-based lifecycle day reached so far)
    pub fn age_days(&self, as_of: DateTime<Utc>) -> u32 {
        let days = (as_of - self.published_at).num_days().max(0);
        u32::try_from(days).unwrap_or(u32::MAX)
    }
}

/// A validated, de-duplicated collection of snapshots taken at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotBatch {
    as_of: DateTime<Utc>,
    videos: Vec<VideoSnapshot>,
}

impl SnapshotBatch {
    /// Validate raw provider records, failing on the first bad record
    pub fn new(records: Vec<RawVideoRecord>, as_of: DateTime<Utc>) -> EstimatorResult<Self> {
        let videos = records
            .into_iter()
            .map(|record| VideoSnapshot::from_record(record, as_of))
            .collect::<EstimatorResult<Vec<_>>>()?;

        Self::from_snapshots(videos, as_of)
    }

    /// Build a batch from already-typed snapshots
    pub fn from_snapshots(
        videos: Vec<VideoSnapshot>,
        as_of: DateTime<Utc>,
    ) -> EstimatorResult<Self> {
        let mut seen = HashSet::with_capacity(videos.len());
        for video in &videos {
            if video.published_at > as_of {
                return Err(EstimatorError::PublishedInFuture {
                    id: video.id.clone(),
                    published_at: video.published_at,
                    as_of,
                });
            }
            if !seen.insert(video.id.as_str()) {
                return Err(EstimatorError::DuplicateId(video.id.clone()));
            }
        }

        Ok(Self { as_of, videos })
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    pub fn videos(&self) -> &[VideoSnapshot] {
        &self.videos
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    /// Age in days of the oldest video that has any views, or 0
    pub fn oldest_age_days(&self) -> u32 {
        self.videos
            .iter()
            .filter(|v| v.view_count > 0)
            .map(|v| v.age_days(self.as_of))
            .max()
            .unwrap_or(0)
    }
}

/// Time span over which a views-per-hour figure is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AnalysisWindow {
    /// The most recent `hours` of a video's life
    Bounded { hours: u32 },
    /// The video's full age
    Lifetime,
}

impl AnalysisWindow {
    pub const fn hours(hours: u32) -> Self {
        Self::Bounded { hours }
    }

    pub const fn days(days: u32) -> Self {
        Self::Bounded { hours: days * 24 }
    }

    /// Default reporting windows: 24h, 3d, 7d, 30d and lifetime
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::hours(24),
            Self::days(3),
            Self::days(7),
            Self::days(30),
            Self::Lifetime,
        ]
    }

    /// Canonical name, e.g. `24h`, `3d` or `lifetime`.
    ///
    /// Whole multiples of a day from 48 hours up are named in days, everything
    /// else in hours, so `48h` and `2d` both report as `2d` and `1d` as `24h`.
    pub fn name(&self) -> String {
        match self {
            Self::Lifetime => "lifetime".to_string(),
            Self::Bounded { hours } if *hours >= 48 && hours % 24 == 0 => {
                format!("{}d", hours / 24)
            }
            Self::Bounded { hours } => format!("{hours}h"),
        }
    }
}

impl fmt::Display for AnalysisWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for AnalysisWindow {
    type Err = EstimatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_lowercase();
        if trimmed == "lifetime" {
            return Ok(Self::Lifetime);
        }

        let invalid = || EstimatorError::InvalidWindow(s.to_string());
        let (number, multiplier) = if let Some(days) = trimmed.strip_suffix('d') {
            (days, 24)
        } else if let Some(hours) = trimmed.strip_suffix('h') {
            (hours, 1)
        } else {
            (trimmed.as_str(), 1)
        };

        let value: u32 = number.trim().parse().map_err(|_| invalid())?;
        let hours = value.checked_mul(multiplier).ok_or_else(invalid)?;
        if hours == 0 {
            return Err(invalid());
        }

        Ok(Self::Bounded { hours })
    }
}

impl TryFrom<String> for AnalysisWindow {
    type Error = EstimatorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AnalysisWindow> for String {
    fn from(window: AnalysisWindow) -> Self {
        window.name()
    }
}

/// Views per hour for one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowRate {
    pub window: String,
    pub vph: f64,
}

/// One row of the per-video rate table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRates {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub kind: VideoKind,

    /// Age used for rate arithmetic (already floored at one hour)
    pub age_hours: f64,

    pub age_days: u32,

    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,

    /// (likes + comments) / views, as a percentage
    pub engagement_rate: f64,

    /// Rates in the calculator's window order, lifetime last
    pub rates: Vec<WindowRate>,
}

impl VideoRates {
    /// Look up the rate reported for a window. Any spelling of the same
    /// span matches, so `48h` finds the `2d` column.
    pub fn rate(&self, window: &str) -> Option<f64> {
        let name = window
            .parse::<AnalysisWindow>()
            .map(|w| w.name())
            .unwrap_or_else(|_| window.to_string());
        self.rates
            .iter()
            .find(|r| r.window == name)
            .map(|r| r.vph)
    }
}

/// Distribution of estimated cumulative views across the cohort on one lifecycle day.
///
/// Statistics are `None` when no video contributed to the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatedDailyCohortStat {
    /// 1-based lifecycle day
    pub day: u32,
    pub sample_size: usize,
    pub min: Option<f64>,
    pub p10: Option<f64>,
    /// 25th percentile
    pub lower_bound: Option<f64>,
    /// 50th percentile
    pub median: Option<f64>,
    /// 75th percentile
    pub upper_bound: Option<f64>,
    pub p90: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

impl EstimatedDailyCohortStat {
    /// Row for a day nobody contributed to
    pub fn empty(day: u32) -> Self {
        Self {
            day,
            sample_size: 0,
            min: None,
            p10: None,
            lower_bound: None,
            median: None,
            upper_bound: None,
            p90: None,
            max: None,
            mean: None,
        }
    }
}
