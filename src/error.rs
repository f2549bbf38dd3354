//! Error types for the mixmatch engine and its delivery surfaces.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`CsvError`] - CSV normalization errors
//! - [`IngestError`] - Streaming-API ingestion errors
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.
//!
//! Row-level malformation (unparseable tempo/key/mode, empty title or artist,
//! a literal `#` in either) is NOT an error: such rows are silently excluded
//! by the normalizer. Only load-fatal conditions surface here.

use thiserror::Error;

// =============================================================================
// CSV Normalization Errors
// =============================================================================

/// Errors during CSV normalization.
///
/// All variants are fatal to the load attempt but recoverable by the caller
/// (prompt for a different file, retry). They are returned as values, never
/// panicked.
#[derive(Debug, Error)]
pub enum CsvError {
    /// One or more required header columns are absent.
    /// Carries the missing column names, in required-column order.
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// The input has no header row at all.
    #[error("CSV file is empty")]
    EmptyFile,

    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),
}

// =============================================================================
// Ingestion Errors
// =============================================================================

/// Errors from the streaming-API ingestion client.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Missing access token.
    #[error("Missing SPOTIFY_ACCESS_TOKEN environment variable")]
    MissingToken,

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Unexpected response payload.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::pipeline::analyze_file`].
/// It wraps all lower-level errors and adds pipeline-specific variants.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV normalization error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Ingestion error.
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Every row of the source was dropped or the source had no rows.
    #[error("No usable tracks in input")]
    EmptyInput,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV normalization.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message() {
        let err = CsvError::MissingColumns(vec!["Key".into(), "Tempo".into()]);
        let msg = err.to_string();
        assert!(msg.contains("Key, Tempo"));
    }

    #[test]
    fn test_error_conversion_chain() {
        // CsvError -> PipelineError
        let csv_err = CsvError::EmptyFile;
        let pipeline_err: PipelineError = csv_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        // IngestError -> PipelineError
        let ingest_err = IngestError::MissingToken;
        let pipeline_err: PipelineError = ingest_err.into();
        assert!(pipeline_err.to_string().contains("SPOTIFY_ACCESS_TOKEN"));
    }
}
