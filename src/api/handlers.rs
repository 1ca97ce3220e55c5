use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::EstimatorConfig;
use crate::error::EstimatorError;
use crate::estimator::report::resolve_horizon;
use crate::estimator::{
    build_report, AnalysisWindow, ChannelReport, EstimatedDailyCohortStat, KindFilter,
    RateCalculator, RawVideoRecord, SnapshotBatch, VideoRates,
};
use crate::provider::VideoMetricsProvider;

pub struct AppState {
    pub config: EstimatorConfig,
    pub provider: Option<Arc<dyn VideoMetricsProvider>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

/// Invalid snapshot data supplied by the caller
fn rejected(err: EstimatorError) -> ApiError {
    api_error(StatusCode::UNPROCESSABLE_ENTITY, err)
}

/// Settings errors are server-side
fn misconfigured(err: EstimatorError) -> ApiError {
    warn!("Estimator settings rejected: {}", err);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, err)
}

/// Errors from building an estimator for a request: an oversized horizon is
/// the caller's fault, anything else is configuration
fn estimator_failure(err: EstimatorError) -> ApiError {
    match err {
        EstimatorError::HorizonTooLarge { .. } => rejected(err),
        other => misconfigured(other),
    }
}

/// Body or query that failed to deserialize
fn malformed(body_text: String) -> ApiError {
    api_error(StatusCode::UNPROCESSABLE_ENTITY, body_text)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RatesRequest {
    /// Snapshot time; defaults to now
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
    /// Overrides the configured windows
    #[serde(default)]
    pub windows: Option<Vec<AnalysisWindow>>,
    pub videos: Vec<RawVideoRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RatesResponse {
    pub as_of: DateTime<Utc>,
    pub rows: Vec<VideoRates>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CohortRequest {
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_days: Option<u32>,
    #[serde(default)]
    pub kind: Option<KindFilter>,
    pub videos: Vec<RawVideoRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CohortResponse {
    pub as_of: DateTime<Utc>,
    pub max_days: u32,
    pub days: Vec<EstimatedDailyCohortStat>,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub max_days: Option<u32>,
    pub kind: Option<KindFilter>,
}

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Per-video views-per-hour table
pub async fn compute_rates(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RatesRequest>, JsonRejection>,
) -> Result<Json<RatesResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| malformed(e.body_text()))?;
    let as_of = payload.as_of.unwrap_or_else(Utc::now);
    let batch = SnapshotBatch::new(payload.videos, as_of).map_err(rejected)?;

    let calculator = match payload.windows {
        Some(windows) => RateCalculator::new(state.config.rate_policy, windows)
            .map(|c| c.with_shorts_threshold(state.config.shorts_max_duration_secs))
            .map_err(rejected)?,
        None => state.config.rate_calculator().map_err(misconfigured)?,
    };

    debug!("Computing rates for {} videos", batch.len());
    Ok(Json(RatesResponse {
        as_of,
        rows: calculator.rates_table(&batch),
    }))
}

/// Day-by-day cohort percentile table
pub async fn compute_cohort(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CohortRequest>, JsonRejection>,
) -> Result<Json<CohortResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| malformed(e.body_text()))?;
    let as_of = payload.as_of.unwrap_or_else(Utc::now);
    let batch = SnapshotBatch::new(payload.videos, as_of).map_err(rejected)?;
    let max_days = resolve_horizon(&batch, payload.max_days, &state.config);

    let estimator = state
        .config
        .cohort_estimator(max_days)
        .map_err(estimator_failure)?
        .with_filter(payload.kind.unwrap_or(state.config.kind_filter));

    debug!(
        "Computing cohort for {} videos over {} days",
        batch.len(),
        max_days
    );
    Ok(Json(CohortResponse {
        as_of,
        max_days,
        days: estimator.estimate(&batch),
    }))
}

/// Fetch a channel through the configured provider and report on it
pub async fn channel_report(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<Json<ChannelReport>, ApiError> {
    let Query(query) = query.map_err(|e| malformed(e.body_text()))?;
    let Some(provider) = state.provider.as_ref() else {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "No video metrics provider is configured",
        ));
    };

    let records = provider.fetch_channel(&channel_id).await.map_err(|e| {
        warn!(
            "Provider '{}' failed for channel {}: {:#}",
            provider.name(),
            channel_id,
            e
        );
        api_error(
            StatusCode::BAD_GATEWAY,
            format!("Failed to fetch channel: {e}"),
        )
    })?;

    // Bad records here come from upstream, not from the caller
    let batch = SnapshotBatch::new(records, Utc::now()).map_err(|e| {
        warn!("Provider '{}' returned invalid data: {}", provider.name(), e);
        api_error(StatusCode::BAD_GATEWAY, e)
    })?;

    let report = build_report(
        &batch,
        &state.config,
        Some(&channel_id),
        query.max_days,
        query.kind,
    )
    .map_err(estimator_failure)?;

    Ok(Json(report))
}
