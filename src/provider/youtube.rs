//! YouTube Data API v3 provider
//!
//! Walks a channel's uploads playlist and batches video lookups 50 ids at a
//! time. Channel ids must already be resolved (`UC...`).

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::config::YouTubeConfig;
use crate::estimator::RawVideoRecord;

use super::trait_def::VideoMetricsProvider;

/// Largest page / id batch the API accepts
const MAX_RESULTS: usize = 50;

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default, rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelItem {
    content_details: ChannelContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    content_details: PlaylistItemDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemDetails {
    video_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    snippet: VideoSnippet,
    #[serde(default)]
    statistics: VideoStatistics,
    #[serde(default)]
    content_details: Option<VideoContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    published_at: DateTime<Utc>,
    #[serde(default)]
    title: Option<String>,
}

/// Counters arrive as decimal strings and are omitted when hidden
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoContentDetails {
    duration: String,
}

/// Parse an ISO-8601 duration such as `PT1H2M3S` or `P1DT30M` into seconds.
///
/// Year and month designators are not used by the API and are rejected.
pub fn parse_iso8601_duration(value: &str) -> Option<u64> {
    let rest = value.strip_prefix('P')?;
    let mut total: u64 = 0;
    let mut number = String::new();
    let mut in_time = false;
    let mut saw_component = false;

    for c in rest.chars() {
        match c {
            '0'..='9' => number.push(c),
            'T' if !in_time && number.is_empty() => in_time = true,
            unit => {
                let amount: u64 = number.parse().ok()?;
                number.clear();
                let seconds_per_unit = match (in_time, unit) {
                    (false, 'W') => 7 * 86_400,
                    (false, 'D') => 86_400,
                    (true, 'H') => 3_600,
                    (true, 'M') => 60,
                    (true, 'S') => 1,
                    _ => return None,
                };
                total = total.checked_add(amount.checked_mul(seconds_per_unit)?)?;
                saw_component = true;
            }
        }
    }

    if !number.is_empty() || !saw_component {
        return None;
    }
    Some(total)
}

fn parse_counter(id: &str, field: &str, value: Option<&str>) -> Result<i64> {
    match value {
        None => Ok(0),
        Some(v) => v
            .parse::<i64>()
            .with_context(|| format!("video '{id}' has a malformed {field} '{v}'")),
    }
}

fn into_record(item: VideoItem) -> Result<RawVideoRecord> {
    let duration_seconds = match item.content_details.as_ref() {
        Some(details) => match parse_iso8601_duration(&details.duration) {
            Some(seconds) => seconds,
            None => {
                warn!(
                    "Video {} has unparseable duration '{}', treating as 0",
                    item.id, details.duration
                );
                0
            }
        },
        None => 0,
    };

    let stats = &item.statistics;
    Ok(RawVideoRecord {
        view_count: parse_counter(&item.id, "viewCount", stats.view_count.as_deref())?,
        like_count: parse_counter(&item.id, "likeCount", stats.like_count.as_deref())?,
        comment_count: parse_counter(&item.id, "commentCount", stats.comment_count.as_deref())?,
        duration_seconds: i64::try_from(duration_seconds).unwrap_or(i64::MAX),
        published_at: item.snippet.published_at,
        title: item.snippet.title,
        id: item.id,
    })
}

#[derive(Clone)]
pub struct YouTubeProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl YouTubeProvider {
    pub fn new(config: &YouTubeConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent("viewcurve/0.1.0")
            .build()
            .context("failed to build HTTP client for the YouTube Data API")?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = Url::parse_with_params(
            &format!("{}/{}", self.base_url, endpoint),
            params
                .iter()
                .copied()
                .chain(std::iter::once(("key", self.api_key.as_str()))),
        )
        .with_context(|| format!("failed to build URL for {endpoint}"))?;

        self.client
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to request {endpoint}"))?
            .error_for_status()
            .with_context(|| format!("{endpoint} request was rejected"))?
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode {endpoint} response"))
    }

    async fn uploads_playlist(&self, channel_id: &str) -> Result<String> {
        let response: ListResponse<ChannelItem> = self
            .get_json("channels", &[("part", "contentDetails"), ("id", channel_id)])
            .await?;

        response
            .items
            .into_iter()
            .next()
            .map(|item| item.content_details.related_playlists.uploads)
            .ok_or_else(|| anyhow!("channel '{channel_id}' not found"))
    }

    async fn playlist_video_ids(&self, playlist_id: &str) -> Result<Vec<String>> {
        let max_results = MAX_RESULTS.to_string();
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("part", "contentDetails"),
                ("playlistId", playlist_id),
                ("maxResults", max_results.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let page: ListResponse<PlaylistItem> = self.get_json("playlistItems", &params).await?;
            for item in page.items {
                let id = item.content_details.video_id;
                if seen.insert(id.clone()) {
                    ids.push(id);
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("Playlist {} lists {} videos", playlist_id, ids.len());
        Ok(ids)
    }

    async fn videos(&self, ids: &[String]) -> Result<Vec<RawVideoRecord>> {
        let mut records = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_RESULTS) {
            let joined = chunk.join(",");
            let response: ListResponse<VideoItem> = self
                .get_json(
                    "videos",
                    &[("part", "snippet,statistics,contentDetails"), ("id", joined.as_str())],
                )
                .await?;
            for item in response.items {
                records.push(into_record(item)?);
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl VideoMetricsProvider for YouTubeProvider {
    fn name(&self) -> &'static str {
        "youtube"
    }

    async fn fetch_channel(&self, channel_id: &str) -> Result<Vec<RawVideoRecord>> {
        let playlist = self.uploads_playlist(channel_id).await?;
        let ids = self.playlist_video_ids(&playlist).await?;
        let records = self.videos(&ids).await?;
        info!(
            "Fetched {} videos for channel {} from YouTube",
            records.len(),
            channel_id
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_durations() {
        assert_eq!(parse_iso8601_duration("PT4M13S"), Some(253));
        assert_eq!(parse_iso8601_duration("PT1H"), Some(3600));
        assert_eq!(parse_iso8601_duration("PT45S"), Some(45));
        assert_eq!(parse_iso8601_duration("P1DT2H"), Some(93_600));
        assert_eq!(parse_iso8601_duration("P0D"), Some(0));
        assert_eq!(parse_iso8601_duration("P1W"), Some(604_800));
    }

    #[test]
    fn test_reject_bad_durations() {
        assert_eq!(parse_iso8601_duration(""), None);
        assert_eq!(parse_iso8601_duration("P"), None);
        assert_eq!(parse_iso8601_duration("PT"), None);
        assert_eq!(parse_iso8601_duration("4M13S"), None);
        assert_eq!(parse_iso8601_duration("P1M"), None);
        assert_eq!(parse_iso8601_duration("PT5"), None);
        assert_eq!(parse_iso8601_duration("PT1X"), None);
    }

    #[test]
    fn test_video_item_into_record() {
        let json = r#"{
            "items": [
                {
                    "id": "abc123",
                    "snippet": {"publishedAt": "2024-05-20T15:00:00Z", "title": "Launch"},
                    "statistics": {"viewCount": "15230", "likeCount": "812", "commentCount": "64"},
                    "contentDetails": {"duration": "PT12M3S"}
                },
                {
                    "id": "hidden",
                    "snippet": {"publishedAt": "2024-05-21T15:00:00Z"},
                    "statistics": {"viewCount": "9"}
                }
            ]
        }"#;
        let response: ListResponse<VideoItem> = serde_json::from_str(json).unwrap();
        assert!(response.next_page_token.is_none());

        let records: Vec<RawVideoRecord> = response
            .items
            .into_iter()
            .map(|item| into_record(item).unwrap())
            .collect();

        assert_eq!(records[0].id, "abc123");
        assert_eq!(records[0].title.as_deref(), Some("Launch"));
        assert_eq!(records[0].view_count, 15_230);
        assert_eq!(records[0].like_count, 812);
        assert_eq!(records[0].comment_count, 64);
        assert_eq!(records[0].duration_seconds, 723);

        assert_eq!(records[1].view_count, 9);
        assert_eq!(records[1].like_count, 0);
        assert_eq!(records[1].duration_seconds, 0);
    }

    #[test]
    fn test_malformed_counter_is_an_error() {
        let json = r#"{
            "id": "bad",
            "snippet": {"publishedAt": "2024-05-20T15:00:00Z"},
            "statistics": {"viewCount": "lots"}
        }"#;
        let item: VideoItem = serde_json::from_str(json).unwrap();
        assert!(into_record(item).is_err());
    }

    #[test]
    fn test_playlist_page_token() {
        let json = r#"{"nextPageToken":"CAUQAA","items":[{"contentDetails":{"videoId":"v1"}}]}"#;
        let page: ListResponse<PlaylistItem> = serde_json::from_str(json).unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("CAUQAA"));
        assert_eq!(page.items[0].content_details.video_id, "v1");
    }
}
