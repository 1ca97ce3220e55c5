//! Multi-window views-per-hour calculator
//!
//! Only the lifetime rate is exact: a snapshot carries one cumulative view
//! count, so views accrued during the last `W` hours are never observed and
//! bounded windows are estimated by a [`RatePolicy`].

use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{EstimatorError, EstimatorResult};
use crate::estimator::classify::{classify, DEFAULT_SHORTS_MAX_DURATION_SECS};
use crate::estimator::models::{AnalysisWindow, SnapshotBatch, VideoRates, VideoSnapshot, WindowRate};
use crate::estimator::round2;

/// How a bounded window's rate is derived from the single observed total
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum RatePolicy {
    /// `views / min(age_hours, W)`. No free parameters.
    #[default]
    ClampedLifetime,
    /// Lifetime rate scaled by an age-bucketed decay multiplier, optionally
    /// jittered by up to `±jitter`. Jitter is drawn from an RNG seeded with
    /// `seed`, the video id and the window, so results are reproducible.
    DecayMultiplier { seed: u64, jitter: f64 },
}

/// Age-bucketed share of the lifetime rate still attributed to recent windows
pub fn decay_multiplier(age_hours: f64) -> f64 {
    match age_hours {
        h if h <= 24.0 => 1.0,
        h if h <= 72.0 => 0.85,
        h if h <= 168.0 => 0.7,
        h if h <= 720.0 => 0.5,
        _ => 0.3,
    }
}

fn jitter_rng(seed: u64, video_id: &str, window_hours: u32) -> StdRng {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(video_id.as_bytes());
    hasher.update(window_hours.to_le_bytes());
    StdRng::from_seed(hasher.finalize().into())
}

/// Per-video views-per-hour over a fixed set of windows
#[derive(Debug, Clone, PartialEq)]
pub struct RateCalculator {
    policy: RatePolicy,
    windows: Vec<AnalysisWindow>,
    shorts_max_duration_secs: u64,
}

impl RateCalculator {
    /// Build a calculator. Duplicate windows are dropped and the lifetime
    /// window is always reported, last.
    pub fn new(policy: RatePolicy, windows: Vec<AnalysisWindow>) -> EstimatorResult<Self> {
        if let RatePolicy::DecayMultiplier { jitter, .. } = policy {
            if !jitter.is_finite() || !(0.0..1.0).contains(&jitter) {
                return Err(EstimatorError::InvalidJitter(jitter));
            }
        }

        let mut ordered: Vec<AnalysisWindow> = Vec::with_capacity(windows.len() + 1);
        for window in windows {
            if window != AnalysisWindow::Lifetime && !ordered.contains(&window) {
                ordered.push(window);
            }
        }
        ordered.push(AnalysisWindow::Lifetime);

        Ok(Self {
            policy,
            windows: ordered,
            shorts_max_duration_secs: DEFAULT_SHORTS_MAX_DURATION_SECS,
        })
    }

    pub fn with_shorts_threshold(mut self, shorts_max_duration_secs: u64) -> Self {
        self.shorts_max_duration_secs = shorts_max_duration_secs;
        self
    }

    pub fn policy(&self) -> RatePolicy {
        self.policy
    }

    pub fn windows(&self) -> &[AnalysisWindow] {
        &self.windows
    }

    /// `views / max(age_hours, 1)`, rounded
    pub fn lifetime_rate(video: &VideoSnapshot, as_of: DateTime<Utc>) -> f64 {
        round2(video.view_count as f64 / video.age_hours(as_of))
    }

    /// Rate for one window, rounded. Windows at least as long as the video's
    /// age collapse to the lifetime rate under every policy.
    pub fn window_rate(
        &self,
        video: &VideoSnapshot,
        window: AnalysisWindow,
        as_of: DateTime<Utc>,
    ) -> f64 {
        let age_hours = video.age_hours(as_of);
        let views = video.view_count as f64;

        let hours = match window {
            AnalysisWindow::Lifetime => return Self::lifetime_rate(video, as_of),
            AnalysisWindow::Bounded { hours } if f64::from(hours) >= age_hours => {
                return Self::lifetime_rate(video, as_of)
            }
            AnalysisWindow::Bounded { hours } => hours,
        };

        let rate = match self.policy {
            RatePolicy::ClampedLifetime => views / age_hours.min(f64::from(hours)),
            RatePolicy::DecayMultiplier { seed, jitter } => {
                let mut rate = views / age_hours * decay_multiplier(age_hours);
                if jitter > 0.0 {
                    let mut rng = jitter_rng(seed, &video.id, hours);
                    rate *= 1.0 + rng.random_range(-jitter..=jitter);
                }
                rate
            }
        };

        round2(rate.max(0.0))
    }

    /// Rate-table row for one video
    pub fn rates_for(&self, video: &VideoSnapshot, as_of: DateTime<Utc>) -> VideoRates {
        let rates = self
            .windows
            .iter()
            .map(|window| WindowRate {
                window: window.name(),
                vph: self.window_rate(video, *window, as_of),
            })
            .collect();

        let engagement_rate = if video.view_count == 0 {
            0.0
        } else {
            let engaged = video.like_count.saturating_add(video.comment_count) as f64;
            round2(engaged / video.view_count as f64 * 100.0)
        };

        VideoRates {
            id: video.id.clone(),
            title: video.title.clone(),
            kind: classify(video.duration_seconds, self.shorts_max_duration_secs),
            age_hours: round2(video.age_hours(as_of)),
            age_days: video.age_days(as_of),
            view_count: video.view_count,
            like_count: video.like_count,
            comment_count: video.comment_count,
            engagement_rate,
            rates,
        }
    }

    /// Rate table for a whole batch, in batch order
    pub fn rates_table(&self, batch: &SnapshotBatch) -> Vec<VideoRates> {
        batch
            .videos()
            .iter()
            .map(|video| self.rates_for(video, batch.as_of()))
            .collect()
    }
}

impl Default for RateCalculator {
    fn default() -> Self {
        Self {
            policy: RatePolicy::default(),
            windows: AnalysisWindow::defaults(),
            shorts_max_duration_secs: DEFAULT_SHORTS_MAX_DURATION_SECS,
        }
    }
}
