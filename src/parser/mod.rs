//! CSV normalizer: raw playlist exports to validated [`Track`] records.
//!
//! Accepts comma-delimited text with a header row. Double-quote-enclosed
//! fields are permitted: a quote character toggles inside-field state and is
//! itself stripped from output (no escaped-quote support, matching the export
//! format). Rows with fewer cells than headers are filled with empty strings.
//!
//! Required columns are verified before any row processing; a missing one is
//! fatal to the load attempt ([`CsvError::MissingColumns`]). Malformed rows
//! are silently excluded, deliberately: these exports are noisy and per-row
//! errors would drown the caller.

use std::collections::BTreeSet;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CsvError, CsvResult};
use crate::models::{Key, Mode, PitchClass, Track};

/// Header names that must be present, in reporting order.
pub const REQUIRED_COLUMNS: [&str; 5] = ["Track Name", "Artist Name(s)", "Key", "Mode", "Tempo"];

/// Genre labels split on comma or semicolon.
static GENRE_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,;]").expect("valid regex"));

/// Result of normalizing a source, with ingestion metadata.
#[derive(Debug, Clone)]
pub struct NormalizeResult {
    /// Validated tracks, in source order (duplicates not yet removed;
    /// dedup is a load-operation concern, see [`crate::library`]).
    pub tracks: Vec<Track>,
    /// Detected or assumed character encoding.
    pub encoding: String,
    /// Column headers as read.
    pub headers: Vec<String>,
    /// Non-blank data rows seen.
    pub rows_read: usize,
    /// Rows silently excluded by the per-row validation policy.
    pub rows_dropped: usize,
}

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to text using the specified encoding.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.to_string(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.to_string(),
        // UTF-8, ASCII and anything unrecognized: lossy UTF-8
        _ => String::from_utf8_lossy(bytes).to_string(),
    }
}

/// Normalize raw delimited text into validated tracks.
///
/// This is the engine-level operation: text in, `Track` sequence out.
/// Fails only when the header row is unusable; see the module docs for the
/// per-row drop policy.
///
/// # Example
/// ```ignore
/// use mixmatch::normalize;
///
/// let csv = "Track Name,Artist Name(s),Key,Mode,Tempo\nStrobe,deadmau5,9,0,128.04";
/// let tracks = normalize(csv).unwrap();
/// assert_eq!(tracks[0].tempo, 128);
/// assert_eq!(tracks[0].key.label(), "A min");
/// ```
pub fn normalize(raw: &str) -> CsvResult<Vec<Track>> {
    normalize_content(raw, "utf-8".to_string()).map(|r| r.tracks)
}

/// Normalize raw bytes with encoding auto-detection.
pub fn normalize_bytes(bytes: &[u8]) -> CsvResult<NormalizeResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    normalize_content(&content, encoding)
}

/// Normalize a CSV file with encoding auto-detection.
pub fn normalize_file<P: AsRef<Path>>(path: P) -> CsvResult<NormalizeResult> {
    let bytes = std::fs::read(path.as_ref())?;
    normalize_bytes(&bytes)
}

/// Internal: normalize decoded text.
fn normalize_content(content: &str, encoding: String) -> CsvResult<NormalizeResult> {
    let mut lines = content.lines();

    let header_line = lines.next().ok_or(CsvError::EmptyFile)?;
    let headers: Vec<String> = split_cells(header_line)
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();

    // Verify required columns before touching any row.
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !headers.iter().any(|h| h == *c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(CsvError::MissingColumns(missing));
    }

    let column = |name: &str| -> usize {
        headers.iter().position(|h| h == name).unwrap_or(usize::MAX)
    };
    let title_idx = column("Track Name");
    let artist_idx = column("Artist Name(s)");
    let key_idx = column("Key");
    let mode_idx = column("Mode");
    let tempo_idx = column("Tempo");

    let mut tracks = Vec::new();
    let mut rows_read = 0;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        rows_read += 1;

        let cells = split_cells(line);
        let cell = |idx: usize| cells.get(idx).map(String::as_str).unwrap_or("");

        if let Some(track) = build_track(
            cell(title_idx),
            cell(artist_idx),
            cell(key_idx),
            cell(mode_idx),
            cell(tempo_idx),
            &headers,
            &cells,
        ) {
            tracks.push(track);
        }
    }

    let rows_dropped = rows_read - tracks.len();
    Ok(NormalizeResult {
        tracks,
        encoding,
        headers,
        rows_read,
        rows_dropped,
    })
}

/// Split one line into cells: comma-delimited, a `"` toggles quoted state and
/// is stripped, commas inside quotes are literal.
fn split_cells(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_quote = false;

    for c in line.chars() {
        match c {
            '"' => in_quote = !in_quote,
            ',' if !in_quote => cells.push(std::mem::take(&mut cell)),
            _ => cell.push(c),
        }
    }
    cells.push(cell);
    cells
}

/// Validate and convert one row. `None` means the row is excluded.
fn build_track(
    raw_title: &str,
    raw_artist: &str,
    raw_key: &str,
    raw_mode: &str,
    raw_tempo: &str,
    headers: &[String],
    cells: &[String],
) -> Option<Track> {
    let title = raw_title.trim();
    let artist = raw_artist.trim();
    // Rows with a literal '#' in identity fields are historically
    // corrupt/truncated in this export format.
    if title.is_empty() || artist.is_empty() || title.contains('#') || artist.contains('#') {
        return None;
    }

    let tempo_f = raw_tempo.trim().parse::<f64>().ok()?;
    if !tempo_f.is_finite() || tempo_f <= 0.0 {
        return None;
    }
    let tempo = tempo_f.round() as u32;
    if tempo == 0 {
        return None;
    }

    let pitch_class = PitchClass::from_index(raw_key.trim().parse::<i64>().ok()?)?;
    let mode = Mode::from_index(raw_mode.trim().parse::<i64>().ok()?);

    let mut track = Track::new(title, artist, tempo, Key::new(pitch_class, mode));

    let optional = |name: &str| -> Option<f64> {
        let idx = headers.iter().position(|h| h == name)?;
        parse_optional(cells.get(idx).map(String::as_str).unwrap_or(""))
    };

    track.valence = optional("Valence");
    track.energy = optional("Energy");
    track.danceability = optional("Danceability");
    track.loudness = optional("Loudness");
    track.instrumentalness = optional("Instrumentalness");
    track.speechiness = optional("Speechiness");
    track.acousticness = optional("Acousticness");
    track.popularity = optional("Popularity");
    track.time_signature = optional("Time Signature")
        .filter(|v| *v > 0.0)
        .map(|v| v.round() as u32);

    if let Some(idx) = headers.iter().position(|h| h == "Genres") {
        track.genre_tags = split_genres(cells.get(idx).map(String::as_str).unwrap_or(""));
    }

    Some(track)
}

/// Lenient optional-number parsing: present-and-finite or absent, never an error.
fn parse_optional(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Tokenize free-text genre labels: lowercased, split on comma/semicolon,
/// trimmed, empties removed.
pub fn split_genres(raw: &str) -> BTreeSet<String> {
    GENRE_SPLIT
        .split(raw)
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}
