use chrono::{DateTime, Utc};
use thiserror::Error;

/// Contract violations detected while validating snapshots or estimator settings
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimatorError {
    #[error("video id must not be empty")]
    MissingId,
    #[error("video '{id}' has negative {field} ({value})")]
    NegativeCounter {
        id: String,
        field: &'static str,
        value: i64,
    },
    #[error("video '{id}' was published at {published_at}, after the snapshot time {as_of}")]
    PublishedInFuture {
        id: String,
        published_at: DateTime<Utc>,
        as_of: DateTime<Utc>,
    },
    #[error("duplicate video id '{0}' in snapshot batch")]
    DuplicateId(String),
    #[error("growth exponent must be in (0, 1], got {0}")]
    InvalidExponent(f64),
    #[error("decay jitter must be in [0, 1), got {0}")]
    InvalidJitter(f64),
    #[error("invalid analysis window '{0}'")]
    InvalidWindow(String),
    #[error("horizon of {requested} days exceeds the maximum of {max} days")]
    HorizonTooLarge { requested: u32, max: u32 },
    #[error("unknown video kind filter '{0}' (expected all, short or long_form)")]
    InvalidKindFilter(String),
}

pub type EstimatorResult<T> = Result<T, EstimatorError>;
