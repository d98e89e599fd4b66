//! Catalog URL parsing into canonical video identifiers.

/// Hosts accepted as catalog URLs.
const ACCEPTED_HOSTS: [&str; 4] = [
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "youtu.be",
];

/// Extracts the canonical video id from a freeform URL string.
///
/// Accepted shapes are `watch?v=ID`, `youtu.be/ID`, and `embed/ID`;
/// anything else yields `None`. The id grammar is alphanumeric plus
/// `-` and `_`. Pure function, no I/O.
pub fn extract_video_id(url: &str) -> Option<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return None;
    }

    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);

    let (host, rest) = match without_scheme.split_once('/') {
        Some((host, rest)) => (host, rest),
        None => return None,
    };
    if !ACCEPTED_HOSTS.contains(&host) {
        return None;
    }

    let candidate = if host == "youtu.be" {
        rest
    } else if let Some(after) = rest.strip_prefix("embed/") {
        after
    } else if let Some(after) = rest.strip_prefix("watch?") {
        query_param(after, "v")?
    } else {
        return None;
    };

    // Strip trailing query/fragment from path-style shapes.
    let id = candidate
        .split(['?', '&', '#', '/'])
        .next()
        .unwrap_or_default();
    if is_valid_video_id(id) {
        Some(id.to_string())
    } else {
        None
    }
}

fn query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        if name == key {
            Some(value)
        } else {
            None
        }
    })
}

fn is_valid_video_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::extract_video_id;

    #[test]
    fn test_extracts_id_from_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_extracts_id_from_short_url() {
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_extracts_id_from_embed_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_surrounding_query_parameters_are_ignored() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?list=PL123&v=abc-_123&t=42s"),
            Some("abc-_123".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtu.be/abc-_123?si=share"),
            Some("abc-_123".to_string())
        );
    }

    #[test]
    fn test_accepts_mobile_host_and_plain_http() {
        assert_eq!(
            extract_video_id("http://m.youtube.com/watch?v=xyz"),
            Some("xyz".to_string())
        );
    }

    #[test]
    fn test_rejects_empty_and_whitespace_input() {
        assert_eq!(extract_video_id(""), None);
        assert_eq!(extract_video_id("   "), None);
    }

    #[test]
    fn test_rejects_non_catalog_domain() {
        assert_eq!(extract_video_id("https://vimeo.com/watch?v=abc123"), None);
        assert_eq!(extract_video_id("https://example.com/abc123"), None);
    }

    #[test]
    fn test_rejects_malformed_id() {
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v="), None);
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=abc%20def"),
            None
        );
    }

    #[test]
    fn test_rejects_unrecognized_path_shape() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/playlist?list=PL123"),
            None
        );
        assert_eq!(extract_video_id("https://www.youtube.com/"), None);
    }
}
