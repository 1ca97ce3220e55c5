use anyhow::Result;
use async_trait::async_trait;

use crate::estimator::RawVideoRecord;

/// Source of point-in-time video records for a channel.
///
/// Implementations resolve pagination themselves and return each video once.
#[async_trait]
pub trait VideoMetricsProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Fetch the current counters of every upload on a channel
    async fn fetch_channel(&self, channel_id: &str) -> Result<Vec<RawVideoRecord>>;
}
