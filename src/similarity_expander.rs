//! Cascading widening search over the similarity source.
//!
//! Builds the recommendation candidate list for one canonical track
//! identity. When the primary similar-tracks lookup comes back sparse, the
//! cascade widens to the artist's top tracks and then to a title-only
//! search, unioning each stage's results before a single final truncation.

use std::collections::HashSet;

use log::{debug, warn};

use crate::sources::{SimilarTrack, SimilaritySource, TrackIdentity};

/// Tuning knobs for the cascade, taken from `AnalysisConfig`.
#[derive(Debug, Clone, Copy)]
pub struct ExpanderLimits {
    /// Candidate count requested from the primary stage.
    pub similar_limit: u32,
    /// Below this count the next cascade stage is consulted.
    pub min_cascade_results: usize,
    /// Hard cap applied once, after all unions.
    pub max_recommendations: usize,
}

/// Outcome of one cascade stage. Stage errors are demoted to `Empty` so a
/// failing upstream can never abort the pipeline.
#[derive(Debug, Clone)]
pub enum StageOutcome {
    Tracks(Vec<SimilarTrack>),
    Empty,
}

impl StageOutcome {
    fn from_result(stage: &str, result: Result<Vec<SimilarTrack>, String>) -> Self {
        match result {
            Ok(tracks) if !tracks.is_empty() => Self::Tracks(tracks),
            Ok(_) => {
                debug!("Expander: {} stage returned no tracks", stage);
                Self::Empty
            }
            Err(error) => {
                warn!("Expander: {} stage failed: {}", stage, error);
                Self::Empty
            }
        }
    }
}

/// Canonical equality key for deduplication across cascade stages.
///
/// The same track can come back from different stages with differing
/// incidental fields (image lists in particular), so identity is the
/// lower-cased trimmed (name, artist) pair, not the whole record.
fn dedup_key(track: &SimilarTrack) -> String {
    format!(
        "{}\u{001f}{}",
        track.name.trim().to_lowercase(),
        track.artist_name.trim().to_lowercase()
    )
}

fn union_stage(
    collected: &mut Vec<SimilarTrack>,
    seen: &mut HashSet<String>,
    outcome: StageOutcome,
) {
    let StageOutcome::Tracks(tracks) = outcome else {
        return;
    };
    for track in tracks {
        if seen.insert(dedup_key(&track)) {
            collected.push(track);
        }
    }
}

/// Produces the deduplicated, size-bounded candidate list for one identity.
///
/// Upstream ranking order is preserved within each stage and fallback
/// results append after primary results. Truncation happens only once, at
/// the end, so a primary result can still be dropped if the unions overflow
/// the cap. An empty return is a valid outcome, not an error.
pub fn expand_similar(
    source: &dyn SimilaritySource,
    identity: &TrackIdentity,
    limits: ExpanderLimits,
) -> Vec<SimilarTrack> {
    let mut collected = Vec::new();
    let mut seen = HashSet::new();

    let primary = StageOutcome::from_result(
        "similar-tracks",
        source.similar_tracks(&identity.name, &identity.artist_name, limits.similar_limit),
    );
    union_stage(&mut collected, &mut seen, primary);

    if collected.len() < limits.min_cascade_results {
        if identity.artist_name.trim().is_empty() {
            debug!("Expander: skipping artist-top-tracks stage, no artist name");
        } else {
            let top_tracks = StageOutcome::from_result(
                "artist-top-tracks",
                source.artist_top_tracks(&identity.artist_name, limits.similar_limit),
            );
            union_stage(&mut collected, &mut seen, top_tracks);
        }
    }

    if collected.len() < limits.min_cascade_results {
        let general = StageOutcome::from_result(
            "general-search",
            source.search_tracks(&identity.name, limits.similar_limit),
        );
        union_stage(&mut collected, &mut seen, general);
    }

    collected.truncate(limits.max_recommendations);
    collected
}
