//! Track-set lifecycle and match memoization.
//!
//! [`TrackLibrary`] owns the current track set. Loads either replace it or
//! merge-append to it; both deduplicate by the `title|||artist` identity key,
//! keeping the first occurrence in iteration order (existing tracks precede
//! incoming ones on merge). Tracks are immutable once loaded; every load bumps
//! a version counter.
//!
//! [`MatchCache`] memoizes [`crate::matching::find_matches`] on its three
//! declared inputs - (library version, tolerance, relative-key flag) - so
//! callers re-rendering views do not pay the O(N²) pass again. There is no
//! partial invalidation: any key change recomputes the whole set.

use std::collections::HashSet;

use crate::matching::find_matches;
use crate::models::{MatchPair, Track};

// =============================================================================
// TrackLibrary
// =============================================================================

/// The current track set, with load semantics and a version counter.
#[derive(Debug, Default)]
pub struct TrackLibrary {
    tracks: Vec<Track>,
    version: u64,
}

impl TrackLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tracks, in load order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Monotonically increasing load counter; part of the memoization key.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Replace the whole set with `incoming` (deduplicated, first kept).
    pub fn load_replace(&mut self, incoming: Vec<Track>) {
        self.tracks = dedup_by_identity(incoming);
        self.version += 1;
    }

    /// Merge-append `incoming` to the existing set. Existing tracks come
    /// first, so on an identity collision the already-loaded track wins.
    pub fn load_merge(&mut self, incoming: Vec<Track>) {
        let mut combined = std::mem::take(&mut self.tracks);
        combined.extend(incoming);
        self.tracks = dedup_by_identity(combined);
        self.version += 1;
    }

    /// Consume the library, yielding the deduplicated track set.
    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }
}

/// Keep the first occurrence per `title|||artist` key, preserving order.
fn dedup_by_identity(tracks: Vec<Track>) -> Vec<Track> {
    let mut seen = HashSet::new();
    tracks
        .into_iter()
        .filter(|t| seen.insert(t.dedup_key()))
        .collect()
}

// =============================================================================
// MatchCache
// =============================================================================

/// Memoization key: the three inputs the matcher is declared over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CacheKey {
    library_version: u64,
    tolerance_bits: u64,
    allow_relative_key: bool,
}

/// Memoizes the match set for one (tracks, tolerance, relative-flag) triple.
#[derive(Debug, Default)]
pub struct MatchCache {
    key: Option<CacheKey>,
    pairs: Vec<MatchPair>,
    recomputes: u64,
}

impl MatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The match set for the given inputs, recomputed only when one of them
    /// changed since the previous call.
    pub fn matches(
        &mut self,
        library: &TrackLibrary,
        tolerance_bpm: f64,
        allow_relative_key: bool,
    ) -> &[MatchPair] {
        let key = CacheKey {
            library_version: library.version(),
            tolerance_bits: tolerance_bpm.to_bits(),
            allow_relative_key,
        };

        if self.key != Some(key) {
            self.pairs = find_matches(library.tracks(), tolerance_bpm, allow_relative_key);
            self.key = Some(key);
            self.recomputes += 1;
        }
        &self.pairs
    }

    /// How many times the underlying match pass has actually run.
    pub fn recomputes(&self) -> u64 {
        self.recomputes
    }
}
