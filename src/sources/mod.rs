//! Source adapter abstractions and concrete implementations.

pub mod lastfm;
pub mod youtube;

/// Video metadata resolved from the catalog service.
///
/// Immutable once resolved; one instance per analysis request.
#[derive(Debug, Clone)]
pub struct VideoMetadata {
    pub video_id: String,
    pub title: String,
    pub channel_title: String,
    pub thumbnail_url: String,
}

/// Canonical (track, artist) identity used as the similarity lookup key.
/// `artist_name` may be empty when the artist could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackIdentity {
    pub name: String,
    pub artist_name: String,
}

/// Size label attached to an embedded track image by the similarity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSizeClass {
    Small,
    Medium,
    Large,
    ExtraLarge,
    Mega,
    Unknown,
}

impl ImageSizeClass {
    /// Maps the similarity service's size label to a class.
    pub fn from_label(label: &str) -> Self {
        match label {
            "small" => Self::Small,
            "medium" => Self::Medium,
            "large" => Self::Large,
            "extralarge" => Self::ExtraLarge,
            "mega" => Self::Mega,
            _ => Self::Unknown,
        }
    }
}

/// One embedded image slot on a similar-track candidate.
#[derive(Debug, Clone)]
pub struct TrackImage {
    pub url: String,
    pub size: ImageSizeClass,
}

/// Raw candidate track returned by the similarity service.
#[derive(Debug, Clone)]
pub struct SimilarTrack {
    pub name: String,
    pub artist_name: String,
    pub images: Vec<TrackImage>,
}

/// Catalog search hit used for artwork fallback and exact-video links.
#[derive(Debug, Clone)]
pub struct VideoHit {
    pub video_id: String,
    pub thumbnail_url: Option<String>,
}

/// Failure modes of the catalog metadata lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The catalog has no record for the requested video id.
    NotFound,
    /// Non-success response, transport failure, or unparseable payload.
    Upstream(String),
}

/// Interface implemented by the catalog (video platform) adapter.
pub trait CatalogSource: Send + Sync {
    /// Resolves title/channel/thumbnail for a video id. A single failed
    /// call surfaces immediately; no retries.
    fn video_metadata(&self, video_id: &str) -> Result<VideoMetadata, CatalogError>;

    /// Free-text music-video search, limit 1. `Ok(None)` means no hit.
    fn search_music_video(&self, query: &str) -> Result<Option<VideoHit>, String>;
}

/// Interface implemented by the music-similarity adapter.
pub trait SimilaritySource: Send + Sync {
    /// Best-match track for a (title, artist) pair, limit 1.
    /// `Ok(None)` is a valid outcome, not an error.
    fn match_track(&self, title: &str, artist: &str) -> Result<Option<TrackIdentity>, String>;

    /// Ordered similar-track candidates for a canonical identity,
    /// with autocorrection enabled upstream.
    fn similar_tracks(
        &self,
        name: &str,
        artist: &str,
        limit: u32,
    ) -> Result<Vec<SimilarTrack>, String>;

    /// Ordered top tracks for an artist (first fallback source).
    fn artist_top_tracks(&self, artist: &str, limit: u32) -> Result<Vec<SimilarTrack>, String>;

    /// Title-only general track search (second fallback source).
    fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<SimilarTrack>, String>;
}
