//! YouTube Data API catalog adapter.

use std::io::Read;
use std::time::Duration;

use log::debug;
use serde_json::Value;

use crate::sources::{CatalogError, CatalogSource, VideoHit, VideoMetadata};

const API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
const MUSIC_CATEGORY_ID: &str = "10";
const USER_AGENT: &str = "tunescout/0.1.0 (similar-song discovery)";

/// Thumbnail slots in descending resolution order.
const THUMBNAIL_LADDER: [&str; 4] = ["maxres", "high", "medium", "default"];

/// Catalog adapter backed by `ureq`.
pub struct YoutubeClient {
    http_client: ureq::Agent,
    api_key: String,
}

impl YoutubeClient {
    /// Creates a new catalog adapter.
    pub fn new(api_key: String) -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(10))
            .timeout_write(Duration::from_secs(10))
            .build();
        Self {
            http_client,
            api_key,
        }
    }

    fn api_url(&self, endpoint: &str, params: &[(&str, &str)]) -> String {
        let mut url = format!("{API_BASE_URL}/{endpoint}?key={}", self.api_key);
        for (key, value) in params {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(urlencoding::encode(value).as_ref());
        }
        url
    }

    fn http_get_json(&self, url: &str) -> Result<Value, String> {
        let response = self
            .http_client
            .get(url)
            .set("User-Agent", USER_AGENT)
            .set("Accept", "application/json")
            .call()
            .map_err(|error| format!("Request failed: {error}"))?;
        let mut body = String::new();
        response
            .into_reader()
            .read_to_string(&mut body)
            .map_err(|error| format!("Failed to read response: {error}"))?;
        serde_json::from_str(&body).map_err(|error| format!("Invalid JSON response: {error}"))
    }
}

/// Picks the best thumbnail URL from a snippet's `thumbnails` object,
/// walking the resolution ladder until a slot carries a non-empty URL.
fn best_thumbnail_url(thumbnails: &Value) -> Option<String> {
    for slot in THUMBNAIL_LADDER {
        if let Some(url) = thumbnails[slot]["url"].as_str() {
            let trimmed = url.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

impl CatalogSource for YoutubeClient {
    fn video_metadata(&self, video_id: &str) -> Result<VideoMetadata, CatalogError> {
        let url = self.api_url("videos", &[("part", "snippet"), ("id", video_id)]);
        let payload = self
            .http_get_json(&url)
            .map_err(CatalogError::Upstream)?;

        let Some(item) = payload["items"].as_array().and_then(|items| items.first()) else {
            return Err(CatalogError::NotFound);
        };

        let snippet = &item["snippet"];
        let title = snippet["title"].as_str().unwrap_or_default().to_string();
        let channel_title = snippet["channelTitle"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let thumbnail_url = best_thumbnail_url(&snippet["thumbnails"]).unwrap_or_default();

        debug!(
            "Catalog[{}]: resolved metadata title=\"{}\" channel=\"{}\"",
            video_id, title, channel_title
        );
        Ok(VideoMetadata {
            video_id: video_id.to_string(),
            title,
            channel_title,
            thumbnail_url,
        })
    }

    fn search_music_video(&self, query: &str) -> Result<Option<VideoHit>, String> {
        let url = self.api_url(
            "search",
            &[
                ("part", "snippet"),
                ("q", query),
                ("type", "video"),
                ("videoCategoryId", MUSIC_CATEGORY_ID),
                ("maxResults", "1"),
            ],
        );
        let payload = self.http_get_json(&url)?;

        let Some(item) = payload["items"].as_array().and_then(|items| items.first()) else {
            return Ok(None);
        };
        let Some(video_id) = item["id"]["videoId"].as_str() else {
            return Ok(None);
        };

        Ok(Some(VideoHit {
            video_id: video_id.to_string(),
            thumbnail_url: best_thumbnail_url(&item["snippet"]["thumbnails"]),
        }))
    }
}
