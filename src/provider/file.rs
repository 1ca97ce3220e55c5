use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::estimator::RawVideoRecord;

use super::trait_def::VideoMetricsProvider;

/// Accepted snapshot file layouts
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    /// A bare array of records, served for any channel id
    Records(Vec<RawVideoRecord>),
    /// Records keyed by channel id
    ByChannel(HashMap<String, Vec<RawVideoRecord>>),
}

/// Provider backed by a JSON snapshot exported earlier
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    path: PathBuf,
}

impl JsonFileProvider {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    async fn read(&self) -> Result<SnapshotFile> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read snapshot file {}", self.path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse snapshot file {}", self.path.display()))
    }

    /// Every record in the file regardless of channel
    pub async fn load_all(&self) -> Result<Vec<RawVideoRecord>> {
        Ok(match self.read().await? {
            SnapshotFile::Records(records) => records,
            SnapshotFile::ByChannel(channels) => channels.into_values().flatten().collect(),
        })
    }
}

#[async_trait]
impl VideoMetricsProvider for JsonFileProvider {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn fetch_channel(&self, channel_id: &str) -> Result<Vec<RawVideoRecord>> {
        let records = match self.read().await? {
            SnapshotFile::Records(records) => records,
            SnapshotFile::ByChannel(mut channels) => channels
                .remove(channel_id)
                .ok_or_else(|| anyhow!("channel '{channel_id}' not found in snapshot file"))?,
        };
        debug!(
            "Loaded {} records for channel {} from {}",
            records.len(),
            channel_id,
            self.path.display()
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "viewcurve-{}-{}.json",
            name,
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    const RECORD: &str =
        r#"{"id":"v1","published_at":"2024-05-01T00:00:00Z","view_count":10}"#;

    #[tokio::test]
    async fn test_array_file_serves_any_channel() {
        let path = write_temp("array", &format!("[{RECORD}]"));
        let provider = JsonFileProvider::new(&path);

        let records = provider.fetch_channel("UCanything").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "v1");

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_keyed_file_selects_channel() {
        let path = write_temp("keyed", &format!(r#"{{"UCa":[{RECORD}],"UCb":[]}}"#));
        let provider = JsonFileProvider::new(&path);

        assert_eq!(provider.fetch_channel("UCa").await.unwrap().len(), 1);
        assert!(provider.fetch_channel("UCb").await.unwrap().is_empty());
        assert!(provider.fetch_channel("UCmissing").await.is_err());
        assert_eq!(provider.load_all().await.unwrap().len(), 1);

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let provider = JsonFileProvider::new("/nonexistent/viewcurve/snapshot.json");
        assert!(provider.load_all().await.is_err());
    }
}
