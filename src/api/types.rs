//! REST API types for frontend integration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::{ScoredPair, Track};
use crate::pipeline::{AnalysisResult, AnalyzeOptions, CsvInfo};

/// Response sent to the frontend after CSV upload and analysis.
///
/// `pairs` reference `tracks` by index, in the matcher's canonical
/// tempo-delta order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Unique job identifier.
    pub job_id: String,

    /// "ready" when every row was usable, "warning" when rows were dropped.
    pub status: String,

    /// Deduplicated track set.
    pub tracks: Vec<Track>,

    /// Scored mixable pairs.
    pub pairs: Vec<ScoredPair>,

    /// Metadata about the run.
    pub metadata: ResponseMetadata,
}

/// Metadata about one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub track_count: usize,
    pub pair_count: usize,

    /// Engine parameters the run used.
    pub options: AnalyzeOptions,

    /// CSV info (absent for non-CSV sources).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub csv_info: Option<CsvInfo>,

    /// Completion timestamp.
    pub processed_at: DateTime<Utc>,
}

/// Build the upload response for a finished run.
pub fn upload_response(result: AnalysisResult, options: AnalyzeOptions) -> UploadResponse {
    let dropped = result.csv_info.as_ref().map(|i| i.rows_dropped).unwrap_or(0);

    UploadResponse {
        job_id: Uuid::new_v4().to_string(),
        status: if dropped == 0 { "ready" } else { "warning" }.to_string(),
        metadata: ResponseMetadata {
            track_count: result.tracks.len(),
            pair_count: result.pairs.len(),
            options,
            csv_info: result.csv_info.clone(),
            processed_at: Utc::now(),
        },
        tracks: result.tracks,
        pairs: result.pairs,
    }
}

/// Create an error response.
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "tracks": [],
        "pairs": [],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Key, ScoreToggles};

    #[test]
    fn test_upload_response_status() {
        let track = Track::new("A", "X", 128, Key::from_label("C").unwrap());
        let result = AnalysisResult {
            tracks: vec![track],
            pairs: vec![],
            csv_info: Some(CsvInfo {
                encoding: "utf-8".into(),
                headers: vec![],
                rows_read: 2,
                rows_dropped: 1,
            }),
        };
        let response = upload_response(result, AnalyzeOptions::default());
        assert_eq!(response.status, "warning");
        assert_eq!(response.metadata.track_count, 1);
        assert_eq!(response.metadata.pair_count, 0);
    }

    #[test]
    fn test_upload_response_serialization() {
        let result = AnalysisResult {
            tracks: vec![Track::new("A", "X", 128, Key::from_label("A min").unwrap())],
            pairs: vec![],
            csv_info: None,
        };
        let options = AnalyzeOptions {
            tolerance_bpm: 3.0,
            allow_relative_key: false,
            toggles: ScoreToggles::new(true, false, false),
        };
        let json = serde_json::to_value(upload_response(result, options)).unwrap();

        assert_eq!(json["status"], "ready");
        assert_eq!(json["tracks"][0]["key"], "A min");
        assert_eq!(json["metadata"]["options"]["tolerance_bpm"], 3.0);
        assert!(json.get("metadata").unwrap().get("csvInfo").is_none());
    }

    #[test]
    fn test_error_response_shape() {
        let value = error_response("No file provided");
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "No file provided");
    }
}
