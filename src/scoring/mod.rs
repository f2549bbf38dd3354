//! Composite similarity scoring over matched pairs.
//!
//! Scoring is a secondary ranking signal on top of pairs the matcher already
//! deemed eligible - never a gate. Three independent category toggles select
//! which attribute groups participate:
//!
//! | Group   | Attributes (weight)                                          |
//! |---------|--------------------------------------------------------------|
//! | mood    | valence (8), mode (5), genre overlap (10)                    |
//! | energy  | energy (10), danceability (5), loudness (5), popularity (4)  |
//! | texture | instrumentalness (5), speechiness (5), acousticness (2)      |
//!
//! The weights are fixed constants, part of the contract. An attribute
//! contributes only when present on BOTH tracks; absence skips it from the
//! numerator and the weight total alike. With no toggle active - or no
//! attribute present on both sides - the pair is unscored (`None`), meaning
//! "unranked by this dimension", not zero.

use std::collections::BTreeSet;

use crate::models::{MatchPair, ScoreToggles, ScoredPair, Track};

// Mood group
const W_VALENCE: f64 = 8.0;
const W_MODE: f64 = 5.0;
const W_GENRE: f64 = 10.0;

// Energy group
const W_ENERGY: f64 = 10.0;
const W_DANCEABILITY: f64 = 5.0;
const W_LOUDNESS: f64 = 5.0;
const W_POPULARITY: f64 = 4.0;

// Texture group
const W_INSTRUMENTALNESS: f64 = 5.0;
const W_SPEECHINESS: f64 = 5.0;
const W_ACOUSTICNESS: f64 = 2.0;

/// dB difference treated as full mismatch for loudness.
const LOUDNESS_SPAN_DB: f64 = 20.0;
/// Popularity scale span.
const POPULARITY_SPAN: f64 = 100.0;

/// Weighted-sum accumulator over the attributes present on both sides.
#[derive(Debug, Default)]
struct Accumulator {
    numerator: f64,
    weight_total: f64,
}

impl Accumulator {
    /// Record one attribute: `closeness` in [0, 1], scaled by `weight`.
    fn add(&mut self, closeness: f64, weight: f64) {
        self.numerator += closeness * weight;
        self.weight_total += weight;
    }

    /// Bounded [0, 1] attribute: closeness = max(0, 1 - |va - vb|).
    fn add_bounded(&mut self, a: Option<f64>, b: Option<f64>, weight: f64) {
        if let (Some(va), Some(vb)) = (a, b) {
            self.add((1.0 - (va - vb).abs()).max(0.0), weight);
        }
    }

    /// Unbounded attribute normalized by a full-mismatch span.
    fn add_span(&mut self, a: Option<f64>, b: Option<f64>, span: f64, weight: f64) {
        if let (Some(va), Some(vb)) = (a, b) {
            self.add((1.0 - (va - vb).abs() / span).max(0.0), weight);
        }
    }

    fn score(&self) -> Option<u8> {
        if self.weight_total > 0.0 {
            Some((100.0 * self.numerator / self.weight_total).round() as u8)
        } else {
            None
        }
    }
}

/// Genre-overlap closeness, or `None` when either side has no tags.
///
/// Counts tokens of the smaller set that appear as a substring of (or contain
/// as a substring) some token of the other set - intentional fuzziness, so
/// "hip hop" and "hip" agree. Normalized by the smaller set size, capped at 1.
fn genre_overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let overlap = small
        .iter()
        .filter(|t| large.iter().any(|u| t.contains(u.as_str()) || u.contains(t.as_str())))
        .count();
    Some((overlap as f64 / small.len() as f64).min(1.0))
}

/// Composite 0-100 similarity score for a pair of tracks, or `None` when
/// unscored (no toggle active, or no attribute present on both sides).
pub fn score_pair(a: &Track, b: &Track, toggles: ScoreToggles) -> Option<u8> {
    if !toggles.any() {
        return None;
    }

    let mut acc = Accumulator::default();

    if toggles.mood {
        acc.add_bounded(a.valence, b.valence, W_VALENCE);
        // Mode is categorical and always present on a valid Track.
        acc.add(if a.key.mode == b.key.mode { 1.0 } else { 0.0 }, W_MODE);
        if let Some(closeness) = genre_overlap(&a.genre_tags, &b.genre_tags) {
            acc.add(closeness, W_GENRE);
        }
    }

    if toggles.energy {
        acc.add_bounded(a.energy, b.energy, W_ENERGY);
        acc.add_bounded(a.danceability, b.danceability, W_DANCEABILITY);
        acc.add_span(a.loudness, b.loudness, LOUDNESS_SPAN_DB, W_LOUDNESS);
        acc.add_span(a.popularity, b.popularity, POPULARITY_SPAN, W_POPULARITY);
    }

    if toggles.texture {
        acc.add_bounded(a.instrumentalness, b.instrumentalness, W_INSTRUMENTALNESS);
        acc.add_bounded(a.speechiness, b.speechiness, W_SPEECHINESS);
        acc.add_bounded(a.acousticness, b.acousticness, W_ACOUSTICNESS);
    }

    acc.score()
}

/// Annotate a match pair with its score.
///
/// `tracks` must be the slice the pair was computed against.
pub fn score_match(pair: &MatchPair, tracks: &[Track], toggles: ScoreToggles) -> ScoredPair {
    let score = score_pair(&tracks[pair.a], &tracks[pair.b], toggles);
    ScoredPair {
        pair: pair.clone(),
        score,
    }
}
