//! Event-bus protocol shared by all runtime components.
//!
//! This module defines the message payloads exchanged between the analysis
//! manager and the presentation shell.

use thiserror::Error;

use crate::history::SearchHistoryEntry;

/// Top-level envelope for all bus traffic.
#[derive(Debug, Clone)]
pub enum Message {
    Analysis(AnalysisMessage),
    History(HistoryMessage),
}

/// Pipeline stage reported while a request is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStage {
    ExtractingId,
    ResolvingMetadata,
    MatchingTrack,
    ExpandingSimilarity,
    ResolvingArtwork,
}

impl AnalysisStage {
    /// Short human-readable label for progress display.
    pub fn label(self) -> &'static str {
        match self {
            Self::ExtractingId => "extracting video id",
            Self::ResolvingMetadata => "resolving metadata",
            Self::MatchingTrack => "matching track",
            Self::ExpandingSimilarity => "expanding similar tracks",
            Self::ResolvingArtwork => "resolving artwork",
        }
    }
}

/// Terminal failure taxonomy for one analysis request.
///
/// Only identifier extraction and metadata resolution can fail a request;
/// every later stage degrades to a fallback or an empty result instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("not a recognized video URL")]
    InvalidUrl,
    #[error("the catalog has no record for this video")]
    UpstreamNotFound,
    #[error("catalog request failed: {0}")]
    UpstreamError(String),
}

/// Final, display-ready track entity.
///
/// `cover_art_url` is always non-empty once resolution completes; both
/// outbound links are always present because search links need no lookup.
#[derive(Debug, Clone)]
pub struct ResolvedSong {
    pub title: String,
    pub artist: String,
    pub cover_art_url: String,
    pub youtube_url: String,
    pub spotify_url: String,
}

/// Committed result of one analysis request.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    /// The song the submitted URL points at.
    pub current: ResolvedSong,
    /// Up to ten recommendations, most relevant first.
    pub recommendations: Vec<ResolvedSong>,
    /// The URL the user submitted, as entered.
    pub source_url: String,
}

/// Analysis-domain commands and notifications.
#[derive(Debug, Clone)]
pub enum AnalysisMessage {
    /// Presentation layer submitted a raw URL for resolution.
    StartAnalysis { url: String },
    /// A request was accepted and assigned a token.
    AnalysisStarted { request_id: u64, url: String },
    /// Worker progress notification.
    StageChanged {
        request_id: u64,
        stage: AnalysisStage,
    },
    /// Internal: a worker finished; the manager decides whether the
    /// outcome is still current before committing it.
    ResolutionFinished {
        request_id: u64,
        result: Result<AnalysisOutcome, AnalysisError>,
    },
    /// The most recent request completed and its result was committed.
    AnalysisCompleted {
        request_id: u64,
        outcome: AnalysisOutcome,
    },
    /// The most recent request failed terminally.
    AnalysisFailed {
        request_id: u64,
        error: AnalysisError,
    },
}

/// Search-history commands and notifications.
#[derive(Debug, Clone)]
pub enum HistoryMessage {
    /// Presentation layer asked for the current history snapshot.
    RequestHistory,
    /// Presentation layer asked to drop all saved entries.
    ClearHistory,
    /// History changed (or a snapshot was requested).
    HistoryChanged(Vec<SearchHistoryEntry>),
}
