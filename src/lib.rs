//! # mixmatch - playlist mixability engine
//!
//! mixmatch ingests playlist exports (CSV of track metadata) and computes
//! pairwise mixability between tracks: tempo compatibility (direct, half-time,
//! double-time) and musical-key compatibility (identical or relative
//! major/minor), optionally ranked by a composite similarity score over
//! secondary audio attributes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│  Normalizer │────▶│   Matcher   │────▶│   Scorer    │
//! │  (playlist) │     │  (-> Track) │     │  (pairs)    │     │  (0-100)    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! The three engine stages are pure and synchronous; tempo and key are hard
//! gates, the score only ranks pairs that already passed both.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mixmatch::{normalize, find_matches, score_pair, ScoreToggles};
//!
//! let tracks = normalize(&csv_text)?;
//! let pairs = find_matches(&tracks, 5.0, true);
//! for pair in &pairs {
//!     let score = score_pair(&tracks[pair.a], &tracks[pair.b],
//!                            ScoreToggles::new(true, false, false));
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Domain models (Track, Key, MatchPair, ScoredPair)
//! - [`parser`] - CSV normalization with encoding auto-detection
//! - [`matching`] - Tempo and key gates, pair discovery
//! - [`scoring`] - Composite similarity scoring
//! - [`library`] - Track-set lifecycle and match memoization
//! - [`ingest`] - Streaming-API ingestion (token-bearer REST pull)
//! - [`pipeline`] - High-level analysis API
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Normalization
pub mod parser;

// Matching and scoring
pub mod matching;
pub mod scoring;

// Track-set lifecycle
pub mod library;

// Ingestion
pub mod ingest;

// Orchestration
pub mod pipeline;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{CsvError, IngestError, PipelineError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Key,
    KeyRelation,
    MatchPair,
    Mode,
    PitchClass,
    ScoreToggles,
    ScoredPair,
    TempoRelation,
    Track,
};

// =============================================================================
// Re-exports - Normalizer
// =============================================================================

pub use parser::{normalize, normalize_bytes, normalize_file, NormalizeResult, REQUIRED_COLUMNS};

// =============================================================================
// Re-exports - Matcher
// =============================================================================

pub use matching::{find_matches, match_key, match_tempo};

// =============================================================================
// Re-exports - Scorer
// =============================================================================

pub use scoring::{score_match, score_pair};

// =============================================================================
// Re-exports - Library
// =============================================================================

pub use library::{MatchCache, TrackLibrary};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use pipeline::{analyze_bytes, analyze_file, analyze_tracks, AnalysisResult, AnalyzeOptions, CsvInfo};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::server::start_server;
pub use api::types::{error_response, upload_response, UploadResponse};
