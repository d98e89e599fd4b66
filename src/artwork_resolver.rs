//! Cover art resolution for recommendation candidates.
//!
//! Resolution walks three tiers and returns on the first usable URL:
//! embedded images from the similarity service, a catalog music-video
//! search, and finally a fixed pool of generic placeholder covers. The
//! result is never empty.

use log::debug;
use rand::Rng;

use crate::sources::{CatalogSource, ImageSizeClass, SimilarTrack};

/// Generic music-themed covers used when no real artwork can be found.
const PLACEHOLDER_COVERS: [&str; 6] = [
    "https://images.unsplash.com/photo-1470225620780-dba8ba36b745?w=500&q=80",
    "https://images.unsplash.com/photo-1493225457124-a3eb161ffa5f?w=500&q=80",
    "https://images.unsplash.com/photo-1511671782779-c97d3d27a1d4?w=500&q=80",
    "https://images.unsplash.com/photo-1514320291840-2e0a9bf2a9ae?w=500&q=80",
    "https://images.unsplash.com/photo-1458560871784-56d23406c091?w=500&q=80",
    "https://images.unsplash.com/photo-1487180144351-b8472da7d491?w=500&q=80",
];

/// Artwork resolved for one candidate track.
#[derive(Debug, Clone)]
pub struct ResolvedArtwork {
    /// Cover image URL; guaranteed non-empty.
    pub cover_url: String,
    /// Catalog video located during the search fallback, when any.
    /// The cross-link builder prefers this over a generic search link.
    pub catalog_video_id: Option<String>,
}

/// Embedded-image preference ladder: large/extralarge, then medium, then
/// small. Empty-string URLs are rejected even when the size slot exists.
fn best_embedded_image(track: &SimilarTrack) -> Option<String> {
    let usable = |classes: &[ImageSizeClass]| {
        track.images.iter().find_map(|image| {
            let trimmed = image.url.trim();
            if classes.contains(&image.size) && !trimmed.is_empty() {
                Some(trimmed.to_string())
            } else {
                None
            }
        })
    };

    usable(&[ImageSizeClass::Large, ImageSizeClass::ExtraLarge])
        .or_else(|| usable(&[ImageSizeClass::Medium]))
        .or_else(|| usable(&[ImageSizeClass::Small]))
}

/// Picks a pseudo-random cover from the fixed placeholder pool.
pub fn placeholder_cover(rng: &mut impl Rng) -> String {
    PLACEHOLDER_COVERS[rng.random_range(0..PLACEHOLDER_COVERS.len())].to_string()
}

/// Resolves the best available cover for one candidate track.
///
/// Never fails and never returns an empty URL. The catalog search tier also
/// reports the video it located so the outbound link can point at it.
pub fn resolve_artwork(
    catalog: &dyn CatalogSource,
    track: &SimilarTrack,
    rng: &mut impl Rng,
) -> ResolvedArtwork {
    if let Some(url) = best_embedded_image(track) {
        return ResolvedArtwork {
            cover_url: url,
            catalog_video_id: None,
        };
    }

    if !track.name.trim().is_empty() {
        let query = if track.artist_name.trim().is_empty() {
            track.name.trim().to_string()
        } else {
            format!("{} {}", track.artist_name.trim(), track.name.trim())
        };
        match catalog.search_music_video(&query) {
            Ok(Some(hit)) => {
                let video_id = Some(hit.video_id);
                if let Some(url) = hit.thumbnail_url.filter(|url| !url.trim().is_empty()) {
                    return ResolvedArtwork {
                        cover_url: url,
                        catalog_video_id: video_id,
                    };
                }
                // A located video without a usable thumbnail still improves
                // the outbound link.
                return ResolvedArtwork {
                    cover_url: placeholder_cover(rng),
                    catalog_video_id: video_id,
                };
            }
            Ok(None) => {}
            Err(error) => {
                debug!(
                    "Artwork: catalog search failed for \"{}\": {}",
                    track.name, error
                );
            }
        }
    }

    ResolvedArtwork {
        cover_url: placeholder_cover(rng),
        catalog_video_id: None,
    }
}
