//! Combined rate and cohort report for one channel snapshot

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::EstimatorConfig;
use crate::error::EstimatorResult;
use crate::estimator::classify::KindFilter;
use crate::estimator::growth::FRONT_LOADED_ACCUMULATION;
use crate::estimator::models::{EstimatedDailyCohortStat, SnapshotBatch, VideoRates};

#[derive(Debug, Clone, Serialize)]
pub struct ChannelReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    pub as_of: DateTime<Utc>,
    pub max_days: u32,
    pub kind_filter: KindFilter,
    pub growth_exponent: f64,
    pub model_assumption: &'static str,
    pub videos_analysed: usize,
    pub contributing_videos: usize,
    pub excluded_zero_views: usize,
    pub excluded_by_kind: usize,
    pub excluded_too_young: usize,
    pub rates: Vec<VideoRates>,
    pub cohort: Vec<EstimatedDailyCohortStat>,
}

/// Horizon for a batch: the requested value, else the configured default,
/// else the age of the oldest video with views
pub fn resolve_horizon(
    batch: &SnapshotBatch,
    requested: Option<u32>,
    config: &EstimatorConfig,
) -> u32 {
    requested
        .or(config.default_max_days)
        .unwrap_or_else(|| batch.oldest_age_days())
}

pub fn build_report(
    batch: &SnapshotBatch,
    config: &EstimatorConfig,
    channel_id: Option<&str>,
    max_days: Option<u32>,
    kind_filter: Option<KindFilter>,
) -> EstimatorResult<ChannelReport> {
    let max_days = resolve_horizon(batch, max_days, config);
    let kind_filter = kind_filter.unwrap_or(config.kind_filter);

    let rates = config.rate_calculator()?.rates_table(batch);
    let cohort = config
        .cohort_estimator(max_days)?
        .with_filter(kind_filter)
        .estimate_detailed(batch);

    info!(
        "Built report for {} videos over {} days ({} contributing)",
        batch.len(),
        max_days,
        cohort.contributing_videos
    );

    Ok(ChannelReport {
        channel_id: channel_id.map(str::to_string),
        as_of: batch.as_of(),
        max_days,
        kind_filter,
        growth_exponent: config.growth_exponent,
        model_assumption: FRONT_LOADED_ACCUMULATION,
        videos_analysed: batch.len(),
        contributing_videos: cohort.contributing_videos,
        excluded_zero_views: cohort.excluded_zero_views,
        excluded_by_kind: cohort.excluded_by_kind,
        excluded_too_young: cohort.excluded_too_young,
        rates,
        cohort: cohort.days,
    })
}
