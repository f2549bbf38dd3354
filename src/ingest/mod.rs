//! Streaming-API ingestion: populate [`Track`] records without a CSV.
//!
//! A thin token-bearer REST client for the Spotify Web API. It pulls a
//! playlist's items plus their audio features and maps them through the same
//! invariants the CSV normalizer enforces, so downstream code cannot tell the
//! two sources apart. The engine itself never depends on this module.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mixmatch::ingest::SpotifyClient;
//!
//! let client = SpotifyClient::from_env()?;
//! let tracks = client.fetch_playlist("37i9dQZF1DXcBWIGoYBM5M").await?;
//! ```

use serde::Deserialize;
use std::env;

use crate::error::{IngestError, IngestResult};
use crate::models::{Key, Mode, PitchClass, Track};

/// Default number of retries per request.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Page size for playlist items and the audio-features batch endpoint.
const PAGE_SIZE: usize = 100;

/// Spotify Web API client.
#[derive(Clone)]
pub struct SpotifyClient {
    token: String,
    base_url: String,
    http: reqwest::Client,
}

// =============================================================================
// Wire types (lenient: anything unexpected becomes an absent field)
// =============================================================================

#[derive(Debug, Deserialize)]
struct PlaylistPage {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    track: Option<ApiTrack>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiTrack {
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    artists: Vec<ApiArtist>,
    popularity: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiArtist {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct AudioFeaturesPage {
    #[serde(default)]
    audio_features: Vec<Option<ApiFeatures>>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiFeatures {
    #[serde(default)]
    id: String,
    tempo: Option<f64>,
    key: Option<i64>,
    mode: Option<i64>,
    valence: Option<f64>,
    energy: Option<f64>,
    danceability: Option<f64>,
    loudness: Option<f64>,
    instrumentalness: Option<f64>,
    speechiness: Option<f64>,
    acousticness: Option<f64>,
    time_signature: Option<i64>,
}

impl SpotifyClient {
    /// Create a new client with an explicit bearer token.
    pub fn new(token: String) -> Self {
        Self {
            token,
            base_url: "https://api.spotify.com/v1".to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Create a client from the SPOTIFY_ACCESS_TOKEN environment variable.
    pub fn from_env() -> IngestResult<Self> {
        // Try loading .env file
        let _ = dotenvy::dotenv();

        let token = env::var("SPOTIFY_ACCESS_TOKEN").map_err(|_| IngestError::MissingToken)?;
        Ok(Self::new(token))
    }

    /// Override the API base URL (for tests and proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch a playlist and map it to validated tracks.
    ///
    /// Rows the CSV normalizer would drop (non-positive tempo, unresolvable
    /// key or mode, empty or '#'-bearing identity fields) are dropped here
    /// too.
    pub async fn fetch_playlist(&self, playlist_id: &str) -> IngestResult<Vec<Track>> {
        let api_tracks = self.fetch_items(playlist_id).await?;

        let ids: Vec<String> = api_tracks.iter().filter_map(|t| t.id.clone()).collect();
        let mut features = Vec::new();
        for chunk in ids.chunks(PAGE_SIZE) {
            features.extend(self.fetch_features(chunk).await?);
        }

        let tracks = api_tracks
            .iter()
            .filter_map(|t| {
                let id = t.id.as_deref()?;
                let f = features.iter().find(|f| f.id == id)?;
                build_track(t, f)
            })
            .collect();

        Ok(tracks)
    }

    /// Pull every page of playlist items.
    async fn fetch_items(&self, playlist_id: &str) -> IngestResult<Vec<ApiTrack>> {
        let mut url = format!(
            "{}/playlists/{}/tracks?limit={}",
            self.base_url, playlist_id, PAGE_SIZE
        );
        let mut tracks = Vec::new();

        loop {
            let page: PlaylistPage = self.get_json(&url).await?;
            tracks.extend(page.items.into_iter().filter_map(|i| i.track));
            match page.next {
                Some(next) => url = next,
                None => break,
            }
        }
        Ok(tracks)
    }

    /// Batch audio-features lookup.
    async fn fetch_features(&self, ids: &[String]) -> IngestResult<Vec<ApiFeatures>> {
        let url = format!("{}/audio-features?ids={}", self.base_url, ids.join(","));
        let page: AudioFeaturesPage = self.get_json(&url).await?;
        Ok(page.audio_features.into_iter().flatten().collect())
    }

    /// Authorized GET with retries.
    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> IngestResult<T> {
        let mut last_error = None;

        for attempt in 1..=DEFAULT_MAX_RETRIES {
            match self.try_get_json(url).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    eprintln!("   Attempt {}/{} failed: {}", attempt, DEFAULT_MAX_RETRIES, e);
                    last_error = Some(e);

                    if attempt < DEFAULT_MAX_RETRIES {
                        tokio::time::sleep(tokio::time::Duration::from_millis(RETRY_DELAY_MS)).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| IngestError::HttpError("Unknown error".to_string())))
    }

    async fn try_get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> IngestResult<T> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| IngestError::HttpError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::HttpError(format!("{status}: {body}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| IngestError::InvalidResponse(e.to_string()))
    }
}

/// Map one API track + its features onto the domain model, applying the
/// normalizer's row invariants. `None` means the entry is excluded.
fn build_track(api: &ApiTrack, features: &ApiFeatures) -> Option<Track> {
    let title = api.name.trim();
    let artist = api
        .artists
        .iter()
        .map(|a| a.name.trim())
        .filter(|n| !n.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    if title.is_empty() || artist.is_empty() || title.contains('#') || artist.contains('#') {
        return None;
    }

    let tempo_f = features.tempo.filter(|t| t.is_finite() && *t > 0.0)?;
    let tempo = tempo_f.round() as u32;
    if tempo == 0 {
        return None;
    }

    let pitch_class = PitchClass::from_index(features.key?)?;
    let mode = Mode::from_index(features.mode?);

    let mut track = Track::new(title, artist, tempo, Key::new(pitch_class, mode));
    track.valence = finite(features.valence);
    track.energy = finite(features.energy);
    track.danceability = finite(features.danceability);
    track.loudness = finite(features.loudness);
    track.instrumentalness = finite(features.instrumentalness);
    track.speechiness = finite(features.speechiness);
    track.acousticness = finite(features.acousticness);
    track.popularity = finite(api.popularity);
    track.time_signature = features.time_signature.filter(|v| *v > 0).map(|v| v as u32);

    Some(track)
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn api_track(name: &str, artists: &[&str]) -> ApiTrack {
        serde_json::from_value(json!({
            "id": "t1",
            "name": name,
            "artists": artists.iter().map(|a| json!({ "name": a })).collect::<Vec<_>>(),
            "popularity": 64,
        }))
        .unwrap()
    }

    fn features(tempo: f64, key: i64, mode: i64) -> ApiFeatures {
        serde_json::from_value(json!({
            "id": "t1",
            "tempo": tempo,
            "key": key,
            "mode": mode,
            "energy": 0.8,
        }))
        .unwrap()
    }

    #[test]
    fn test_build_track_maps_fields() {
        let track = build_track(&api_track("Strobe", &["deadmau5"]), &features(128.04, 9, 0)).unwrap();
        assert_eq!(track.title, "Strobe");
        assert_eq!(track.artist, "deadmau5");
        assert_eq!(track.tempo, 128);
        assert_eq!(track.key.label(), "A min");
        assert_eq!(track.energy, Some(0.8));
        assert_eq!(track.popularity, Some(64.0));
        assert_eq!(track.valence, None);
    }

    #[test]
    fn test_build_track_joins_artists() {
        let track = build_track(
            &api_track("Get Lucky", &["Daft Punk", "Pharrell Williams"]),
            &features(116.0, 1, 0),
        )
        .unwrap();
        assert_eq!(track.artist, "Daft Punk, Pharrell Williams");
    }

    #[test]
    fn test_build_track_applies_row_invariants() {
        // Same drop policy as the CSV normalizer.
        assert!(build_track(&api_track("Track #4", &["X"]), &features(128.0, 0, 1)).is_none());
        assert!(build_track(&api_track("", &["X"]), &features(128.0, 0, 1)).is_none());
        assert!(build_track(&api_track("A", &[]), &features(128.0, 0, 1)).is_none());
        assert!(build_track(&api_track("A", &["X"]), &features(0.0, 0, 1)).is_none());
        assert!(build_track(&api_track("A", &["X"]), &features(128.0, 12, 1)).is_none());
    }

    #[test]
    fn test_missing_features_drop_entry() {
        let empty = ApiFeatures::default();
        assert!(build_track(&api_track("A", &["X"]), &empty).is_none());
    }

    #[test]
    fn test_from_env_requires_token() {
        // Only assert the error path; a set token belongs to integration use.
        if env::var("SPOTIFY_ACCESS_TOKEN").is_err() {
            assert!(matches!(SpotifyClient::from_env(), Err(IngestError::MissingToken)));
        }
    }
}
