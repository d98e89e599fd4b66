//! Analysis pipeline runtime component.
//!
//! This manager owns end-to-end resolution of one submitted URL: identifier
//! extraction, catalog metadata, track matching, similarity expansion, and
//! per-candidate artwork/link resolution. Each accepted request gets a
//! monotonically increasing token; a finished resolution is committed only
//! while its token is still the most recently issued one, so a stale
//! request can never overwrite the result of a newer submission.

use std::sync::Arc;
use std::thread;

use log::{debug, info, warn};
use rand::{rngs::StdRng, SeedableRng};
use tokio::sync::broadcast::{error::RecvError, Receiver, Sender};

use crate::artwork_resolver::{placeholder_cover, resolve_artwork};
use crate::config::AnalysisConfig;
use crate::crosslink;
use crate::history::SearchHistory;
use crate::protocol::{
    AnalysisError, AnalysisMessage, AnalysisOutcome, AnalysisStage, HistoryMessage, Message,
    ResolvedSong,
};
use crate::similarity_expander::{expand_similar, ExpanderLimits};
use crate::sources::{
    CatalogError, CatalogSource, SimilarTrack, SimilaritySource, TrackIdentity, VideoMetadata,
};
use crate::video_url;

/// Resolves submitted URLs into recommendation sets and owns the
/// search-history side effect.
pub struct AnalysisManager {
    bus_consumer: Receiver<Message>,
    bus_producer: Sender<Message>,
    catalog: Arc<dyn CatalogSource>,
    similarity: Arc<dyn SimilaritySource>,
    history: SearchHistory,
    limits: ExpanderLimits,
    next_request_id: u64,
    active_request_id: u64,
}

impl AnalysisManager {
    /// Creates a new manager bound to one bus receiver/sender pair.
    pub fn new(
        bus_consumer: Receiver<Message>,
        bus_producer: Sender<Message>,
        catalog: Arc<dyn CatalogSource>,
        similarity: Arc<dyn SimilaritySource>,
        history: SearchHistory,
        analysis_config: &AnalysisConfig,
    ) -> Self {
        Self {
            bus_consumer,
            bus_producer,
            catalog,
            similarity,
            history,
            limits: ExpanderLimits {
                similar_limit: analysis_config.similar_limit,
                min_cascade_results: analysis_config.min_cascade_results,
                max_recommendations: analysis_config.max_recommendations,
            },
            next_request_id: 0,
            active_request_id: 0,
        }
    }

    /// Drives the manager until the bus closes.
    pub fn run(&mut self) {
        self.publish_history();
        loop {
            match self.bus_consumer.blocking_recv() {
                Ok(Message::Analysis(AnalysisMessage::StartAnalysis { url })) => {
                    self.start_analysis(url);
                }
                Ok(Message::Analysis(AnalysisMessage::ResolutionFinished {
                    request_id,
                    result,
                })) => {
                    self.commit_resolution(request_id, result);
                }
                Ok(Message::History(HistoryMessage::RequestHistory)) => self.publish_history(),
                Ok(Message::History(HistoryMessage::ClearHistory)) => {
                    self.history.clear();
                    self.publish_history();
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        "Analysis manager lagged on control bus, skipped {} message(s)",
                        skipped
                    );
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    fn start_analysis(&mut self, url: String) {
        self.next_request_id += 1;
        let request_id = self.next_request_id;
        self.active_request_id = request_id;
        info!("Analysis[{}]: starting for {}", request_id, url);
        let _ = self
            .bus_producer
            .send(Message::Analysis(AnalysisMessage::AnalysisStarted {
                request_id,
                url: url.clone(),
            }));

        let catalog = Arc::clone(&self.catalog);
        let similarity = Arc::clone(&self.similarity);
        let limits = self.limits;
        let bus_producer = self.bus_producer.clone();
        thread::spawn(move || {
            let result = run_analysis(
                catalog.as_ref(),
                similarity.as_ref(),
                limits,
                &url,
                request_id,
                &bus_producer,
            );
            let _ = bus_producer.send(Message::Analysis(AnalysisMessage::ResolutionFinished {
                request_id,
                result,
            }));
        });
    }

    /// Commits a finished resolution unless a newer request was issued in
    /// the meantime. Returns whether the outcome was committed.
    fn commit_resolution(
        &mut self,
        request_id: u64,
        result: Result<AnalysisOutcome, AnalysisError>,
    ) -> bool {
        if request_id != self.active_request_id {
            debug!(
                "Analysis[{}]: dropping stale outcome, current request is {}",
                request_id, self.active_request_id
            );
            return false;
        }

        match result {
            Ok(outcome) => {
                info!(
                    "Analysis[{}]: found {} similar songs for \"{}\"",
                    request_id,
                    outcome.recommendations.len(),
                    outcome.current.title
                );
                self.history.record(
                    &outcome.source_url,
                    &outcome.current.title,
                    &outcome.current.artist,
                );
                self.publish_history();
                let _ = self
                    .bus_producer
                    .send(Message::Analysis(AnalysisMessage::AnalysisCompleted {
                        request_id,
                        outcome,
                    }));
            }
            Err(error) => {
                info!("Analysis[{}]: failed: {}", request_id, error);
                let _ = self
                    .bus_producer
                    .send(Message::Analysis(AnalysisMessage::AnalysisFailed {
                        request_id,
                        error,
                    }));
            }
        }
        true
    }

    fn publish_history(&self) {
        let _ = self
            .bus_producer
            .send(Message::History(HistoryMessage::HistoryChanged(
                self.history.entries().to_vec(),
            )));
    }
}

fn raw_identity(metadata: &VideoMetadata) -> TrackIdentity {
    TrackIdentity {
        name: metadata.title.clone(),
        artist_name: metadata.channel_title.clone(),
    }
}

/// Runs the sequential pipeline stages for one request on a worker thread.
fn run_analysis(
    catalog: &dyn CatalogSource,
    similarity: &dyn SimilaritySource,
    limits: ExpanderLimits,
    url: &str,
    request_id: u64,
    bus_producer: &Sender<Message>,
) -> Result<AnalysisOutcome, AnalysisError> {
    let report_stage = |stage: AnalysisStage| {
        let _ = bus_producer.send(Message::Analysis(AnalysisMessage::StageChanged {
            request_id,
            stage,
        }));
    };

    report_stage(AnalysisStage::ExtractingId);
    let video_id = video_url::extract_video_id(url).ok_or(AnalysisError::InvalidUrl)?;

    report_stage(AnalysisStage::ResolvingMetadata);
    let metadata = catalog
        .video_metadata(&video_id)
        .map_err(|error| match error {
            CatalogError::NotFound => AnalysisError::UpstreamNotFound,
            CatalogError::Upstream(message) => AnalysisError::UpstreamError(message),
        })?;

    report_stage(AnalysisStage::MatchingTrack);
    let identity = match similarity.match_track(&metadata.title, &metadata.channel_title) {
        Ok(Some(identity)) => identity,
        Ok(None) => raw_identity(&metadata),
        Err(error) => {
            // A matching miss must never fail the pipeline; the raw
            // title/channel pair becomes the identity instead.
            debug!("Analysis[{}]: track match error: {}", request_id, error);
            raw_identity(&metadata)
        }
    };

    report_stage(AnalysisStage::ExpandingSimilarity);
    let candidates = expand_similar(similarity, &identity, limits);

    report_stage(AnalysisStage::ResolvingArtwork);
    let recommendations = resolve_candidates(catalog, &candidates);

    let cover_art_url = if metadata.thumbnail_url.trim().is_empty() {
        placeholder_cover(&mut StdRng::from_os_rng())
    } else {
        metadata.thumbnail_url.clone()
    };
    let current = ResolvedSong {
        title: identity.name.clone(),
        artist: identity.artist_name.clone(),
        cover_art_url,
        youtube_url: crosslink::youtube_url(
            Some(&metadata.video_id),
            &identity.name,
            &identity.artist_name,
        ),
        spotify_url: crosslink::spotify_search_url(&identity.name, &identity.artist_name),
    };

    Ok(AnalysisOutcome {
        current,
        recommendations,
        source_url: url.to_string(),
    })
}

/// Fans per-candidate artwork and link resolution out across scoped
/// threads. Result order follows candidate order, not completion order;
/// every candidate record is owned by exactly one worker.
fn resolve_candidates(
    catalog: &dyn CatalogSource,
    candidates: &[SimilarTrack],
) -> Vec<ResolvedSong> {
    thread::scope(|scope| {
        let handles: Vec<_> = candidates
            .iter()
            .map(|track| {
                scope.spawn(move || {
                    let mut rng = StdRng::from_os_rng();
                    let artwork = resolve_artwork(catalog, track, &mut rng);
                    ResolvedSong {
                        title: track.name.clone(),
                        artist: track.artist_name.clone(),
                        cover_art_url: artwork.cover_url,
                        youtube_url: crosslink::youtube_url(
                            artwork.catalog_video_id.as_deref(),
                            &track.name,
                            &track.artist_name,
                        ),
                        spotify_url: crosslink::spotify_search_url(
                            &track.name,
                            &track.artist_name,
                        ),
                    }
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("artwork resolution thread panicked"))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::{run_analysis, AnalysisManager};
    use crate::config::AnalysisConfig;
    use crate::history::{HistoryStore, SearchHistory};
    use crate::protocol::{AnalysisError, AnalysisOutcome, Message, ResolvedSong};
    use crate::similarity_expander::ExpanderLimits;
    use crate::sources::{
        CatalogError, CatalogSource, ImageSizeClass, SimilarTrack, SimilaritySource, TrackIdentity,
        TrackImage, VideoHit, VideoMetadata,
    };
    use std::sync::{Arc, Mutex};
    use tokio::sync::broadcast;

    const TEST_LIMITS: ExpanderLimits = ExpanderLimits {
        similar_limit: 12,
        min_cascade_results: 5,
        max_recommendations: 10,
    };

    struct ScriptedCatalog {
        metadata: Result<VideoMetadata, CatalogError>,
        search: Result<Option<VideoHit>, String>,
    }

    impl CatalogSource for ScriptedCatalog {
        fn video_metadata(&self, _video_id: &str) -> Result<VideoMetadata, CatalogError> {
            self.metadata.clone()
        }

        fn search_music_video(&self, _query: &str) -> Result<Option<VideoHit>, String> {
            self.search.clone()
        }
    }

    struct ScriptedSimilarity {
        matched: Result<Option<TrackIdentity>, String>,
        similar: Vec<SimilarTrack>,
    }

    impl SimilaritySource for ScriptedSimilarity {
        fn match_track(&self, _title: &str, _artist: &str) -> Result<Option<TrackIdentity>, String> {
            self.matched.clone()
        }

        fn similar_tracks(
            &self,
            _name: &str,
            _artist: &str,
            _limit: u32,
        ) -> Result<Vec<SimilarTrack>, String> {
            Ok(self.similar.clone())
        }

        fn artist_top_tracks(
            &self,
            _artist: &str,
            _limit: u32,
        ) -> Result<Vec<SimilarTrack>, String> {
            Ok(Vec::new())
        }

        fn search_tracks(&self, _query: &str, _limit: u32) -> Result<Vec<SimilarTrack>, String> {
            Ok(Vec::new())
        }
    }

    #[derive(Clone, Default)]
    struct MemoryStore {
        blob: Arc<Mutex<Option<String>>>,
    }

    impl HistoryStore for MemoryStore {
        fn load(&self) -> Result<Option<String>, String> {
            Ok(self.blob.lock().expect("store lock poisoned").clone())
        }

        fn save(&self, blob: &str) -> Result<(), String> {
            *self.blob.lock().expect("store lock poisoned") = Some(blob.to_string());
            Ok(())
        }
    }

    fn metadata() -> VideoMetadata {
        VideoMetadata {
            video_id: "abc123".to_string(),
            title: "Blinding Lights (Official Video)".to_string(),
            channel_title: "TheWeekndVEVO".to_string(),
            thumbnail_url: "https://img.example/high.jpg".to_string(),
        }
    }

    fn candidate(name: &str) -> SimilarTrack {
        SimilarTrack {
            name: name.to_string(),
            artist_name: "Artist".to_string(),
            images: vec![TrackImage {
                url: format!("https://img.example/{name}.png"),
                size: ImageSizeClass::Large,
            }],
        }
    }

    fn song(title: &str) -> ResolvedSong {
        ResolvedSong {
            title: title.to_string(),
            artist: "Artist".to_string(),
            cover_art_url: "https://img.example/cover.png".to_string(),
            youtube_url: "https://www.youtube.com/watch?v=x".to_string(),
            spotify_url: "https://open.spotify.com/search/x".to_string(),
        }
    }

    fn outcome(url: &str, title: &str) -> AnalysisOutcome {
        AnalysisOutcome {
            current: song(title),
            recommendations: Vec::new(),
            source_url: url.to_string(),
        }
    }

    fn manager_with(
        store: MemoryStore,
    ) -> (AnalysisManager, broadcast::Sender<Message>) {
        let (bus_sender, _) = broadcast::channel(64);
        let catalog = ScriptedCatalog {
            metadata: Ok(metadata()),
            search: Ok(None),
        };
        let similarity = ScriptedSimilarity {
            matched: Ok(None),
            similar: Vec::new(),
        };
        let manager = AnalysisManager::new(
            bus_sender.subscribe(),
            bus_sender.clone(),
            Arc::new(catalog),
            Arc::new(similarity),
            SearchHistory::load(Box::new(store)),
            &AnalysisConfig::default(),
        );
        (manager, bus_sender)
    }

    fn bus() -> broadcast::Sender<Message> {
        broadcast::channel(64).0
    }

    #[test]
    fn test_invalid_url_fails_before_any_network_stage() {
        let catalog = ScriptedCatalog {
            metadata: Err(CatalogError::Upstream(
                "metadata must not be requested".to_string(),
            )),
            search: Ok(None),
        };
        let similarity = ScriptedSimilarity {
            matched: Ok(None),
            similar: Vec::new(),
        };
        let result = run_analysis(
            &catalog,
            &similarity,
            TEST_LIMITS,
            "https://example.com/not-a-video",
            1,
            &bus(),
        );
        assert_eq!(result.unwrap_err(), AnalysisError::InvalidUrl);
    }

    #[test]
    fn test_catalog_miss_surfaces_as_upstream_not_found() {
        let catalog = ScriptedCatalog {
            metadata: Err(CatalogError::NotFound),
            search: Ok(None),
        };
        let similarity = ScriptedSimilarity {
            matched: Ok(None),
            similar: Vec::new(),
        };
        let result = run_analysis(
            &catalog,
            &similarity,
            TEST_LIMITS,
            "https://www.youtube.com/watch?v=abc123",
            1,
            &bus(),
        );
        assert_eq!(result.unwrap_err(), AnalysisError::UpstreamNotFound);
    }

    #[test]
    fn test_zero_recommendations_is_a_success() {
        let catalog = ScriptedCatalog {
            metadata: Ok(metadata()),
            search: Ok(None),
        };
        let similarity = ScriptedSimilarity {
            matched: Ok(Some(TrackIdentity {
                name: "Blinding Lights".to_string(),
                artist_name: "The Weeknd".to_string(),
            })),
            similar: Vec::new(),
        };
        let outcome = run_analysis(
            &catalog,
            &similarity,
            TEST_LIMITS,
            "https://www.youtube.com/watch?v=abc123",
            1,
            &bus(),
        )
        .expect("empty cascades still complete");
        assert!(outcome.recommendations.is_empty());
        assert_eq!(outcome.current.title, "Blinding Lights");
        assert_eq!(outcome.current.artist, "The Weeknd");
    }

    #[test]
    fn test_match_miss_falls_back_to_raw_metadata_identity() {
        let catalog = ScriptedCatalog {
            metadata: Ok(metadata()),
            search: Ok(None),
        };
        let similarity = ScriptedSimilarity {
            matched: Err("similarity service unreachable".to_string()),
            similar: Vec::new(),
        };
        let outcome = run_analysis(
            &catalog,
            &similarity,
            TEST_LIMITS,
            "https://www.youtube.com/watch?v=abc123",
            1,
            &bus(),
        )
        .expect("matcher errors are non-fatal");
        assert_eq!(outcome.current.title, "Blinding Lights (Official Video)");
        assert_eq!(outcome.current.artist, "TheWeekndVEVO");
    }

    #[test]
    fn test_recommendations_follow_candidate_order() {
        let catalog = ScriptedCatalog {
            metadata: Ok(metadata()),
            search: Ok(None),
        };
        let similarity = ScriptedSimilarity {
            matched: Ok(None),
            similar: vec![
                candidate("First"),
                candidate("Second"),
                candidate("Third"),
                candidate("Fourth"),
                candidate("Fifth"),
            ],
        };
        let outcome = run_analysis(
            &catalog,
            &similarity,
            TEST_LIMITS,
            "https://www.youtube.com/watch?v=abc123",
            1,
            &bus(),
        )
        .expect("pipeline should complete");
        let titles: Vec<&str> = outcome
            .recommendations
            .iter()
            .map(|song| song.title.as_str())
            .collect();
        assert_eq!(titles, vec!["First", "Second", "Third", "Fourth", "Fifth"]);
        assert!(outcome
            .recommendations
            .iter()
            .all(|song| !song.cover_art_url.is_empty()));
        assert_eq!(
            outcome.current.youtube_url,
            "https://www.youtube.com/watch?v=abc123"
        );
    }

    #[test]
    fn test_stale_outcome_is_dropped_and_leaves_no_history() {
        let store = MemoryStore::default();
        let (mut manager, _bus_sender) = manager_with(store.clone());
        manager.next_request_id = 2;
        manager.active_request_id = 2;

        let committed = manager.commit_resolution(1, Ok(outcome("https://a", "Old Song")));
        assert!(!committed);
        assert!(manager.history.entries().is_empty());

        let committed = manager.commit_resolution(2, Ok(outcome("https://b", "New Song")));
        assert!(committed);
        assert_eq!(manager.history.entries().len(), 1);
        assert_eq!(manager.history.entries()[0].title, "New Song");
    }

    #[test]
    fn test_failed_resolution_records_no_history() {
        let store = MemoryStore::default();
        let (mut manager, _bus_sender) = manager_with(store);
        manager.next_request_id = 1;
        manager.active_request_id = 1;

        let committed = manager.commit_resolution(1, Err(AnalysisError::UpstreamNotFound));
        assert!(committed);
        assert!(manager.history.entries().is_empty());
    }
}
