//! Pairwise compatibility: the tempo and key gates.
//!
//! A pair of tracks is mixable iff it passes BOTH gates:
//!
//! - [`match_tempo`] - direct, half-time or double-time BPM proximity within
//!   a tolerance
//! - [`match_key`] - identical key, or relative major/minor when enabled
//!
//! The gates are hard: the similarity score (see [`crate::scoring`]) ranks
//! eligible pairs but never admits or rejects one.
//!
//! [`find_matches`] is a plain O(N²) pass. Callers with large sets should
//! memoize through [`crate::library::MatchCache`] rather than re-invoking per
//! view change.

use std::collections::HashSet;

use crate::models::{KeyRelation, MatchPair, TempoRelation, Track};

/// Tempo gate.
///
/// The three relations are tested in priority order - same, half, double -
/// and the first one within `tolerance` BPM determines both the reported
/// relation and the adjusted reference tempo:
///
/// 1. `|a - b| <= T` -> Same, adjusted = b
/// 2. `|a - b/2| <= T` -> Half, adjusted = b/2
/// 3. `|a - 2b| <= T` -> Double, adjusted = 2b
///
/// Returns the relation and `|a - adjusted|` (the tempo delta), or `None`
/// when no relation fits.
pub fn match_tempo(a: &Track, b: &Track, tolerance: f64) -> Option<(TempoRelation, f64)> {
    let a_bpm = f64::from(a.tempo);
    let b_bpm = f64::from(b.tempo);

    let candidates = [
        (TempoRelation::Same, b_bpm),
        (TempoRelation::Half, b_bpm / 2.0),
        (TempoRelation::Double, b_bpm * 2.0),
    ];

    for (relation, adjusted) in candidates {
        let delta = (a_bpm - adjusted).abs();
        if delta <= tolerance {
            return Some((relation, delta));
        }
    }
    None
}

/// Key gate.
///
/// Identical labels are an exact match; with `allow_relative` enabled, a
/// relative major/minor pair also qualifies. Symmetric in its arguments.
pub fn match_key(a: &Track, b: &Track, allow_relative: bool) -> Option<KeyRelation> {
    if a.key == b.key {
        return Some(KeyRelation::Exact);
    }
    if allow_relative && (a.relative_key() == b.key || b.relative_key() == a.key) {
        return Some(KeyRelation::Relative);
    }
    None
}

/// Compute all mixable pairs in a track set.
///
/// Every unordered pair is inspected once; a pair is kept iff both gates
/// pass. Output is sorted ascending by tempo delta, stable on ties
/// (discovery order). Pairs are deduplicated by the sorted identity
/// (title, artist) of their constituents, so a caller passing a slice with
/// duplicate tracks still gets each pairing once.
///
/// `tolerance_bpm` must be non-negative; a negative value is a caller bug
/// (it cannot match anything) and trips a debug assertion.
pub fn find_matches(tracks: &[Track], tolerance_bpm: f64, allow_relative_key: bool) -> Vec<MatchPair> {
    debug_assert!(tolerance_bpm >= 0.0, "tolerance must be non-negative");

    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut pairs = Vec::new();

    for i in 0..tracks.len() {
        for j in (i + 1)..tracks.len() {
            let Some((tempo_relation, tempo_delta)) = match_tempo(&tracks[i], &tracks[j], tolerance_bpm)
            else {
                continue;
            };
            let Some(key_relation) = match_key(&tracks[i], &tracks[j], allow_relative_key) else {
                continue;
            };

            let mut identity = (tracks[i].dedup_key(), tracks[j].dedup_key());
            if identity.0 == identity.1 {
                // Two copies of the same track are not a pair.
                continue;
            }
            if identity.0 > identity.1 {
                std::mem::swap(&mut identity.0, &mut identity.1);
            }
            if !seen.insert(identity) {
                continue;
            }

            pairs.push(MatchPair {
                a: i,
                b: j,
                tempo_delta,
                tempo_relation,
                key_relation,
            });
        }
    }

    pairs.sort_by(|x, y| x.tempo_delta.total_cmp(&y.tempo_delta));
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Key;

    fn track(title: &str, tempo: u32, key: &str) -> Track {
        Track::new(title, "Artist", tempo, Key::from_label(key).unwrap())
    }

    #[test]
    fn test_tempo_same_relation() {
        let a = track("A", 128, "C");
        let b = track("B", 125, "C");
        let (relation, delta) = match_tempo(&a, &b, 5.0).unwrap();
        assert_eq!(relation, TempoRelation::Same);
        assert_eq!(delta, 3.0);
    }

    #[test]
    fn test_tempo_half_relation() {
        let a = track("A", 64, "C");
        let b = track("B", 128, "C");
        let (relation, delta) = match_tempo(&a, &b, 5.0).unwrap();
        assert_eq!(relation, TempoRelation::Half);
        assert_eq!(delta, 0.0);
    }

    #[test]
    fn test_tempo_double_relation() {
        let a = track("A", 140, "C");
        let b = track("B", 71, "C");
        let (relation, delta) = match_tempo(&a, &b, 5.0).unwrap();
        assert_eq!(relation, TempoRelation::Double);
        assert_eq!(delta, 2.0);
    }

    #[test]
    fn test_tempo_priority_same_wins() {
        // Degenerate tolerance where every relation would qualify.
        let a = track("A", 100, "C");
        let b = track("B", 100, "C");
        let (relation, delta) = match_tempo(&a, &b, 5.0).unwrap();
        assert_eq!(relation, TempoRelation::Same);
        assert_eq!(delta, 0.0);

        let (relation, _) = match_tempo(&a, &b, 500.0).unwrap();
        assert_eq!(relation, TempoRelation::Same);
    }

    #[test]
    fn test_tempo_priority_half_over_double() {
        // |60 - 121| = 61 (no), |60 - 60.5| = 0.5 (yes, half).
        let a = track("A", 60, "C");
        let b = track("B", 121, "C");
        let (relation, delta) = match_tempo(&a, &b, 5.0).unwrap();
        assert_eq!(relation, TempoRelation::Half);
        assert_eq!(delta, 0.5);
    }

    #[test]
    fn test_tempo_no_relation() {
        let a = track("A", 100, "C");
        let b = track("B", 130, "C");
        assert!(match_tempo(&a, &b, 5.0).is_none());
    }

    #[test]
    fn test_tempo_boundary_inclusive() {
        let a = track("A", 128, "C");
        let b = track("B", 123, "C");
        let (_, delta) = match_tempo(&a, &b, 5.0).unwrap();
        assert_eq!(delta, 5.0);
        assert!(match_tempo(&a, &b, 4.9).is_none());
    }

    #[test]
    fn test_key_exact() {
        let a = track("A", 128, "C# min");
        let b = track("B", 128, "C# min");
        assert_eq!(match_key(&a, &b, false), Some(KeyRelation::Exact));
    }

    #[test]
    fn test_key_relative_requires_flag() {
        let a = track("A", 128, "C");
        let b = track("B", 128, "A min");
        assert_eq!(match_key(&a, &b, true), Some(KeyRelation::Relative));
        assert_eq!(match_key(&a, &b, false), None);
    }

    #[test]
    fn test_key_symmetry() {
        let keys = ["C", "A min", "F#", "D# min"];
        for ka in keys {
            for kb in keys {
                let a = track("A", 128, ka);
                let b = track("B", 128, kb);
                for flag in [false, true] {
                    assert_eq!(
                        match_key(&a, &b, flag),
                        match_key(&b, &a, flag),
                        "asymmetric for {ka} / {kb} flag={flag}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_find_matches_end_to_end() {
        let a = track("A", 128, "C");
        let b = track("B", 128, "A min");

        let pairs = find_matches(&[a.clone(), b.clone()], 5.0, true);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].tempo_relation, TempoRelation::Same);
        assert_eq!(pairs[0].tempo_delta, 0.0);
        assert_eq!(pairs[0].key_relation, KeyRelation::Relative);

        let pairs = find_matches(&[a, b], 5.0, false);
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_both_gates_required() {
        // Tempo fits, key does not.
        let pairs = find_matches(&[track("A", 128, "C"), track("B", 128, "D")], 5.0, true);
        assert!(pairs.is_empty());

        // Key fits, tempo does not.
        let pairs = find_matches(&[track("A", 128, "C"), track("B", 170, "C")], 5.0, true);
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_three_mutually_eligible_tracks() {
        let tracks = vec![track("A", 128, "C"), track("B", 128, "C"), track("C", 128, "C")];
        let pairs = find_matches(&tracks, 5.0, false);
        assert_eq!(pairs.len(), 3);

        let mut index_pairs: Vec<(usize, usize)> = pairs.iter().map(|p| (p.a, p.b)).collect();
        index_pairs.sort();
        assert_eq!(index_pairs, vec![(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn test_duplicate_identity_deduplicated() {
        // The same (title, artist) twice: only one pairing with C survives.
        let tracks = vec![track("A", 128, "C"), track("A", 128, "C"), track("B", 128, "C")];
        let pairs = find_matches(&tracks, 5.0, false);
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].a, pairs[0].b), (0, 2));
    }

    #[test]
    fn test_same_title_different_artists_both_pair() {
        // Distinct tracks sharing a title must not collide.
        let mut cover = track("Hallelujah", 128, "C");
        cover.artist = "Other Artist".into();
        let tracks = vec![track("Hallelujah", 128, "C"), cover, track("B", 128, "C")];
        let pairs = find_matches(&tracks, 5.0, false);
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn test_output_sorted_by_delta() {
        let tracks = vec![
            track("A", 120, "C"),
            track("B", 124, "C"),
            track("C", 121, "C"),
        ];
        let pairs = find_matches(&tracks, 5.0, false);
        let deltas: Vec<f64> = pairs.iter().map(|p| p.tempo_delta).collect();
        assert_eq!(deltas, vec![1.0, 3.0, 4.0]);
    }

    #[test]
    fn test_zero_tolerance() {
        let pairs = find_matches(&[track("A", 128, "C"), track("B", 128, "C")], 0.0, false);
        assert_eq!(pairs.len(), 1);
        let pairs = find_matches(&[track("A", 128, "C"), track("B", 129, "C")], 0.0, false);
        assert!(pairs.is_empty());
    }
}
