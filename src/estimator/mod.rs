//! View-trajectory estimation
//!
//! Works from a single point-in-time snapshot of a channel's videos (current
//! counters plus publish time) and derives:
//!
//! - per-video views-per-hour estimates over several windows ([`RateCalculator`])
//! - a dense day-by-day percentile table of estimated cumulative views
//!   across the cohort ([`CohortEstimator`])
//!
//! Everything here is a pure function of the snapshot batch and the
//! configured settings: no I/O, no shared state, no hidden randomness.

pub mod classify;
pub mod cohort;
pub mod growth;
pub mod models;
pub mod percentile;
pub mod rates;
pub mod report;

pub use classify::{classify, KindFilter, VideoKind};
pub use cohort::{CohortEstimator, CohortTable};
pub use growth::{GrowthCurve, FRONT_LOADED_ACCUMULATION};
pub use models::{
    AnalysisWindow, EstimatedDailyCohortStat, RawVideoRecord, SnapshotBatch, VideoRates,
    VideoSnapshot, WindowRate,
};
pub use rates::{RateCalculator, RatePolicy};
pub use report::{build_report, ChannelReport};

/// Round to two decimal digits, the precision of every published figure
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
