mod file;
mod trait_def;
mod youtube;

pub use file::JsonFileProvider;
pub use trait_def::VideoMetricsProvider;
pub use youtube::{parse_iso8601_duration, YouTubeProvider};

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::config::{ProviderBackend, ProviderConfig};

/// Build the provider selected by configuration, if any
pub fn from_config(config: &ProviderConfig) -> Result<Option<Arc<dyn VideoMetricsProvider>>> {
    let provider: Arc<dyn VideoMetricsProvider> = match config.backend {
        ProviderBackend::None => {
            info!("No video metrics provider configured; channel reports are disabled");
            return Ok(None);
        }
        ProviderBackend::Youtube => {
            let youtube = config
                .youtube
                .as_ref()
                .context("YouTube provider selected without YouTube settings")?;
            info!("Using YouTube Data API provider: {}", youtube.base_url);
            Arc::new(YouTubeProvider::new(youtube)?)
        }
        ProviderBackend::File => {
            let path = config
                .snapshot_file
                .as_deref()
                .context("file provider selected without SNAPSHOT_FILE")?;
            info!("Using snapshot file provider: {}", path);
            Arc::new(JsonFileProvider::new(path))
        }
    };

    Ok(Some(provider))
}
