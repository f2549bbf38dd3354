//! High-level pipeline API: CSV (or pre-built tracks) to scored match pairs.
//!
//! Combines all engine steps - normalization, deduplication, matching,
//! scoring - behind easy-to-use functions with a single options struct.
//!
//! # Example
//!
//! ```rust,ignore
//! use mixmatch::pipeline::{analyze_file, AnalyzeOptions};
//! use std::path::Path;
//!
//! let result = analyze_file(Path::new("playlist.csv"), AnalyzeOptions::default())?;
//! println!("{} mixable pairs", result.pairs.len());
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::api::logs::{log_info, log_success, log_warning};
use crate::error::PipelineError;
use crate::library::TrackLibrary;
use crate::matching::find_matches;
use crate::models::{ScoreToggles, ScoredPair, Track};
use crate::parser::{normalize_bytes, NormalizeResult};
use crate::scoring::score_match;

/// Options for one analysis run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AnalyzeOptions {
    /// Tempo tolerance in BPM. The engine accepts any non-negative value;
    /// delivery surfaces clamp to [0, 50] by convention.
    pub tolerance_bpm: f64,

    /// Accept relative major/minor key pairs.
    pub allow_relative_key: bool,

    /// Scoring category switches. With all three off, pairs stay unscored.
    pub toggles: ScoreToggles,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            tolerance_bpm: 5.0,
            allow_relative_key: true,
            toggles: ScoreToggles::default(),
        }
    }
}

/// Source-file information carried through to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvInfo {
    pub encoding: String,
    pub headers: Vec<String>,
    pub rows_read: usize,
    pub rows_dropped: usize,
}

/// Result of a complete analysis run.
///
/// `pairs` reference `tracks` by index and come back sorted ascending by
/// tempo delta, the matcher's canonical order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub tracks: Vec<Track>,
    pub pairs: Vec<ScoredPair>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub csv_info: Option<CsvInfo>,
}

/// Analyze a CSV file.
pub fn analyze_file(path: &Path, options: AnalyzeOptions) -> Result<AnalysisResult, PipelineError> {
    log_info(format!("Reading {}", path.display()));
    let bytes = std::fs::read(path)?;
    analyze_bytes(&bytes, options)
}

/// Analyze raw CSV bytes (encoding auto-detected).
pub fn analyze_bytes(bytes: &[u8], options: AnalyzeOptions) -> Result<AnalysisResult, PipelineError> {
    log_info("Normalizing CSV...");
    let normalized = normalize_bytes(bytes)?;
    log_success(format!(
        "Detected encoding: {}, {} rows",
        normalized.encoding, normalized.rows_read
    ));

    let NormalizeResult {
        tracks,
        encoding,
        headers,
        rows_read,
        rows_dropped,
    } = normalized;

    if rows_dropped > 0 {
        log_warning(format!("{rows_dropped} malformed rows excluded"));
    }

    let csv_info = CsvInfo {
        encoding,
        headers,
        rows_read,
        rows_dropped,
    };

    let mut result = analyze_tracks(tracks, options)?;
    result.csv_info = Some(csv_info);
    Ok(result)
}

/// Analyze an already-normalized track set (e.g. from the ingest client).
pub fn analyze_tracks(tracks: Vec<Track>, options: AnalyzeOptions) -> Result<AnalysisResult, PipelineError> {
    if tracks.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    // Apply the load-time dedup discipline.
    let mut library = TrackLibrary::new();
    library.load_replace(tracks);
    log_success(format!("{} unique tracks", library.len()));

    log_info(format!(
        "Matching (tolerance {} BPM, relative keys {})...",
        options.tolerance_bpm,
        if options.allow_relative_key { "on" } else { "off" },
    ));
    let pairs = find_matches(library.tracks(), options.tolerance_bpm, options.allow_relative_key);
    log_success(format!("{} mixable pairs", pairs.len()));

    let scored: Vec<ScoredPair> = pairs
        .iter()
        .map(|p| score_match(p, library.tracks(), options.toggles))
        .collect();

    if options.toggles.any() {
        let unscored = scored.iter().filter(|s| s.score.is_none()).count();
        if unscored > 0 {
            log_warning(format!("{unscored} pairs had no overlapping attributes to score"));
        }
    }

    Ok(AnalysisResult {
        tracks: library.into_tracks(),
        pairs: scored,
        csv_info: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = AnalyzeOptions::default();
        assert_eq!(opts.tolerance_bpm, 5.0);
        assert!(opts.allow_relative_key);
        assert!(!opts.toggles.any());
    }

    #[test]
    fn test_analyze_bytes_end_to_end() {
        let csv = "Track Name,Artist Name(s),Key,Mode,Tempo,Valence\n\
                   Alpha,X,0,1,128,0.8\n\
                   Beta,Y,9,0,127.6,0.8\n";
        let options = AnalyzeOptions {
            toggles: ScoreToggles::new(true, false, false),
            ..AnalyzeOptions::default()
        };
        let result = analyze_bytes(csv.as_bytes(), options).unwrap();

        assert_eq!(result.tracks.len(), 2);
        assert_eq!(result.pairs.len(), 1);
        // C major vs A min at 128 vs 128: relative key match, delta 0.
        assert_eq!(result.pairs[0].pair.tempo_delta, 0.0);
        // Mood score: valence 8*1, mode differs 5*0 -> 8/13 -> 62.
        assert_eq!(result.pairs[0].score, Some(62));

        let info = result.csv_info.unwrap();
        assert_eq!(info.rows_read, 2);
        assert_eq!(info.rows_dropped, 0);
    }

    #[test]
    fn test_analyze_bytes_unscored_without_toggles() {
        let csv = "Track Name,Artist Name(s),Key,Mode,Tempo\nAlpha,X,0,1,128\nBeta,Y,0,1,128\n";
        let result = analyze_bytes(csv.as_bytes(), AnalyzeOptions::default()).unwrap();
        assert_eq!(result.pairs.len(), 1);
        assert_eq!(result.pairs[0].score, None);
    }

    #[test]
    fn test_analyze_empty_input() {
        let csv = "Track Name,Artist Name(s),Key,Mode,Tempo\n";
        let err = analyze_bytes(csv.as_bytes(), AnalyzeOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
    }

    #[test]
    fn test_missing_columns_propagate() {
        let err = analyze_bytes(b"Track Name,Tempo\nAlpha,128\n", AnalyzeOptions::default()).unwrap_err();
        assert!(err.to_string().contains("Artist Name(s)"));
    }
}
