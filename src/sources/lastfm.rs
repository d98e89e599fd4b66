//! Last.fm similarity adapter implementation.

use std::io::Read;
use std::time::Duration;

use log::debug;
use serde_json::Value;

use crate::sources::{ImageSizeClass, SimilarTrack, SimilaritySource, TrackIdentity, TrackImage};

const API_BASE_URL: &str = "https://ws.audioscrobbler.com/2.0/";
const USER_AGENT: &str = "tunescout/0.1.0 (similar-song discovery)";

/// Similarity adapter backed by `ureq`.
pub struct LastfmClient {
    http_client: ureq::Agent,
    api_key: String,
}

impl LastfmClient {
    /// Creates a new similarity adapter.
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

    fn api_url(&self, method: &str, params: &[(&str, &str)]) -> String {
        let mut url = format!(
            "{API_BASE_URL}?method={method}&api_key={}&format=json",
            self.api_key
        );
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

/// The service reports a single result as a bare object instead of a
/// one-element array; normalize both shapes into a slice of values.
fn track_values(node: &Value) -> Vec<&Value> {
    match node {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![node],
        _ => Vec::new(),
    }
}

/// The artist field is a plain string on search results and an object with
/// a `name` on similar/top-track results.
fn artist_name(node: &Value) -> String {
    node.as_str()
        .or_else(|| node["name"].as_str())
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn parse_images(node: &Value) -> Vec<TrackImage> {
    let Some(items) = node.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| TrackImage {
            url: item["#text"].as_str().unwrap_or_default().trim().to_string(),
            size: ImageSizeClass::from_label(item["size"].as_str().unwrap_or_default()),
        })
        .collect()
}

fn parse_track(node: &Value) -> Option<SimilarTrack> {
    let name = node["name"].as_str().unwrap_or_default().trim().to_string();
    if name.is_empty() {
        return None;
    }
    Some(SimilarTrack {
        name,
        artist_name: artist_name(&node["artist"]),
        images: parse_images(&node["image"]),
    })
}

fn parse_track_list(node: &Value) -> Vec<SimilarTrack> {
    track_values(node).into_iter().filter_map(parse_track).collect()
}

impl SimilaritySource for LastfmClient {
    fn match_track(&self, title: &str, artist: &str) -> Result<Option<TrackIdentity>, String> {
        let url = self.api_url(
            "track.search",
            &[("track", title), ("artist", artist), ("limit", "1")],
        );
        let payload = self.http_get_json(&url)?;
        let matches = parse_track_list(&payload["results"]["trackmatches"]["track"]);
        let Some(best) = matches.into_iter().next() else {
            debug!(
                "Similarity: no track match for title=\"{}\" artist=\"{}\"",
                title, artist
            );
            return Ok(None);
        };
        Ok(Some(TrackIdentity {
            name: best.name,
            artist_name: best.artist_name,
        }))
    }

    fn similar_tracks(
        &self,
        name: &str,
        artist: &str,
        limit: u32,
    ) -> Result<Vec<SimilarTrack>, String> {
        let limit_text = limit.to_string();
        let url = self.api_url(
            "track.getsimilar",
            &[
                ("track", name),
                ("artist", artist),
                ("autocorrect", "1"),
                ("limit", limit_text.as_str()),
            ],
        );
        let payload = self.http_get_json(&url)?;
        Ok(parse_track_list(&payload["similartracks"]["track"]))
    }

    fn artist_top_tracks(&self, artist: &str, limit: u32) -> Result<Vec<SimilarTrack>, String> {
        let limit_text = limit.to_string();
        let url = self.api_url(
            "artist.gettoptracks",
            &[("artist", artist), ("limit", limit_text.as_str())],
        );
        let payload = self.http_get_json(&url)?;
        Ok(parse_track_list(&payload["toptracks"]["track"]))
    }

    fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<SimilarTrack>, String> {
        let limit_text = limit.to_string();
        let url = self.api_url(
            "track.search",
            &[("track", query), ("limit", limit_text.as_str())],
        );
        let payload = self.http_get_json(&url)?;
        Ok(parse_track_list(&payload["results"]["trackmatches"]["track"]))
    }
}
