//! Outbound listening-link construction. Pure, no I/O.

/// Builds the YouTube link for a track. When the artwork search actually
/// located a video, that exact watch link is preferred over a generic
/// search link.
pub fn youtube_url(video_id: Option<&str>, title: &str, artist: &str) -> String {
    if let Some(id) = video_id {
        let trimmed = id.trim();
        if !trimmed.is_empty() {
            return format!("https://www.youtube.com/watch?v={trimmed}");
        }
    }
    let query = search_query(title, artist);
    format!(
        "https://www.youtube.com/results?search_query={}",
        urlencoding::encode(&query)
    )
}

/// Builds a Spotify search link for a (title, artist) pair. Search-based,
/// so no authentication or lookup is needed.
pub fn spotify_search_url(title: &str, artist: &str) -> String {
    let query = search_query(title, artist);
    format!(
        "https://open.spotify.com/search/{}",
        urlencoding::encode(&query)
    )
}

fn search_query(title: &str, artist: &str) -> String {
    let title = title.trim();
    let artist = artist.trim();
    if artist.is_empty() {
        title.to_string()
    } else {
        format!("{title} {artist}")
    }
}
