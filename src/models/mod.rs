//! Domain models for the mixmatch engine.
//!
//! This module contains the core data structures that flow through the
//! pipeline:
//!
//! - [`PitchClass`] / [`Mode`] / [`Key`] - musical key primitives
//! - [`Track`] - a normalized song record
//! - [`MatchPair`] - two tracks found mutually eligible under the tempo and
//!   key gates
//! - [`ScoredPair`] - a match pair with its optional similarity score
//! - [`ScoreToggles`] - the three independent scoring category switches

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

// =============================================================================
// Musical primitives
// =============================================================================

/// The 12 pitch classes in Western music.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PitchClass {
    C,
    Cs, // C#/Db
    D,
    Ds, // D#/Eb
    E,
    F,
    Fs, // F#/Gb
    G,
    Gs, // G#/Ab
    A,
    As, // A#/Bb
    B,
}

/// Chromatic order, used for interval arithmetic.
const PITCH_CLASSES: [PitchClass; 12] = [
    PitchClass::C,
    PitchClass::Cs,
    PitchClass::D,
    PitchClass::Ds,
    PitchClass::E,
    PitchClass::F,
    PitchClass::Fs,
    PitchClass::G,
    PitchClass::Gs,
    PitchClass::A,
    PitchClass::As,
    PitchClass::B,
];

impl PitchClass {
    /// Convert from a numeric index (0 = C, 1 = C#, ..., 11 = B).
    ///
    /// Strict: indices outside 0-11 are rejected, matching the source-row
    /// contract where an out-of-range pitch class drops the row.
    pub fn from_index(index: i64) -> Option<Self> {
        if (0..12).contains(&index) {
            Some(PITCH_CLASSES[index as usize])
        } else {
            None
        }
    }

    /// Convert to a numeric index (0 = C, 1 = C#, ..., 11 = B).
    pub fn to_index(self) -> u8 {
        match self {
            PitchClass::C => 0,
            PitchClass::Cs => 1,
            PitchClass::D => 2,
            PitchClass::Ds => 3,
            PitchClass::E => 4,
            PitchClass::F => 5,
            PitchClass::Fs => 6,
            PitchClass::G => 7,
            PitchClass::Gs => 8,
            PitchClass::A => 9,
            PitchClass::As => 10,
            PitchClass::B => 11,
        }
    }

    /// Sharp notation (e.g. "C", "F#", "A#").
    pub fn notation(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::Cs => "C#",
            PitchClass::D => "D",
            PitchClass::Ds => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::Fs => "F#",
            PitchClass::G => "G",
            PitchClass::Gs => "G#",
            PitchClass::A => "A",
            PitchClass::As => "A#",
            PitchClass::B => "B",
        }
    }

    /// Parse sharp notation back into a pitch class.
    pub fn from_notation(s: &str) -> Option<Self> {
        PITCH_CLASSES.iter().copied().find(|p| p.notation() == s)
    }

    /// Transpose up by `interval` semitones, wrapping at the octave.
    fn transpose(self, interval: u8) -> Self {
        PITCH_CLASSES[((self.to_index() + interval) % 12) as usize]
    }
}

/// Major or minor scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Major,
    Minor,
}

impl Mode {
    /// Interpret a source mode index: 0 = minor, any other value = major.
    pub fn from_index(index: i64) -> Self {
        if index == 0 {
            Mode::Minor
        } else {
            Mode::Major
        }
    }
}

// =============================================================================
// Key
// =============================================================================

/// A musical key: pitch class plus mode.
///
/// Displays as the source label convention: "C#" for C# major,
/// "C# min" for C# minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    pub pitch_class: PitchClass,
    pub mode: Mode,
}

impl Key {
    pub fn new(pitch_class: PitchClass, mode: Mode) -> Self {
        Self { pitch_class, mode }
    }

    /// The relative major (of a minor key) or relative minor (of a major key).
    ///
    /// Realizes the fixed bidirectional 12-entry table (C <-> A min,
    /// G <-> E min, ...) arithmetically: the relative minor lies a major
    /// sixth above the major tonic, the relative major a minor third above
    /// the minor tonic. Involutive: `k.relative().relative() == k`.
    pub fn relative(self) -> Self {
        match self.mode {
            Mode::Major => Key::new(self.pitch_class.transpose(9), Mode::Minor),
            Mode::Minor => Key::new(self.pitch_class.transpose(3), Mode::Major),
        }
    }

    /// The displayable label, e.g. "G#" or "G# min".
    pub fn label(self) -> String {
        self.to_string()
    }

    /// Parse a label produced by [`Key::label`].
    pub fn from_label(label: &str) -> Option<Self> {
        match label.strip_suffix(" min") {
            Some(pitch) => Some(Key::new(PitchClass::from_notation(pitch)?, Mode::Minor)),
            None => Some(Key::new(PitchClass::from_notation(label)?, Mode::Major)),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            Mode::Major => write!(f, "{}", self.pitch_class.notation()),
            Mode::Minor => write!(f, "{} min", self.pitch_class.notation()),
        }
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Key::from_label(&label).ok_or_else(|| D::Error::custom(format!("invalid key label: {label}")))
    }
}

// =============================================================================
// Track
// =============================================================================

/// A normalized song record.
///
/// Immutable once produced by the normalizer. `tempo` is always positive and
/// `key` always resolvable; rows failing either never become a `Track`.
/// Optional audio-feature attributes are `None` when the source column was
/// absent or non-numeric, never a sentinel value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Track title (trimmed, non-empty, no literal '#').
    pub title: String,
    /// Artist name(s) (trimmed, non-empty, no literal '#').
    pub artist: String,
    /// Beats per minute, rounded to the nearest integer from the source float.
    pub tempo: u32,
    /// Musical key (pitch class + mode), serialized as its label.
    pub key: Key,
    /// Musical positiveness, 0.0 - 1.0.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub valence: Option<f64>,
    /// Perceived intensity, 0.0 - 1.0.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub energy: Option<f64>,
    /// Rhythmic suitability for dancing, 0.0 - 1.0.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub danceability: Option<f64>,
    /// Overall loudness in dB (practically negative).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub loudness: Option<f64>,
    /// Likelihood the track contains no vocals, 0.0 - 1.0.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub instrumentalness: Option<f64>,
    /// Presence of spoken words, 0.0 - 1.0.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub speechiness: Option<f64>,
    /// Confidence the track is acoustic, 0.0 - 1.0.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub acousticness: Option<f64>,
    /// Popularity, 0 - 100.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub popularity: Option<f64>,
    /// Beats per bar.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub time_signature: Option<u32>,
    /// Lowercased free-text genre labels, split on comma/semicolon.
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub genre_tags: BTreeSet<String>,
}

impl Track {
    /// Create a track with the required fields; optional attributes absent.
    pub fn new(title: impl Into<String>, artist: impl Into<String>, tempo: u32, key: Key) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            tempo,
            key,
            valence: None,
            energy: None,
            danceability: None,
            loudness: None,
            instrumentalness: None,
            speechiness: None,
            acousticness: None,
            popularity: None,
            time_signature: None,
            genre_tags: BTreeSet::new(),
        }
    }

    /// The relative major/minor of this track's key.
    pub fn relative_key(&self) -> Key {
        self.key.relative()
    }

    /// Identity key used for deduplication across loads.
    /// Exact string pair, case-sensitive.
    pub fn dedup_key(&self) -> String {
        format!("{}|||{}", self.title, self.artist)
    }
}

// =============================================================================
// Match pairs
// =============================================================================

/// How two tempos line up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TempoRelation {
    /// Direct match within tolerance.
    Same,
    /// The second track at half time matches the first.
    Half,
    /// The second track at double time matches the first.
    Double,
}

/// How two keys relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyRelation {
    /// Identical key labels.
    Exact,
    /// Relative major/minor pair.
    Relative,
}

/// Two tracks found mutually eligible under the tempo and key gates.
///
/// `a` and `b` index into the track slice handed to
/// [`crate::matching::find_matches`]; the pair is unordered and appears at
/// most once in a match set. Ephemeral: recomputed in full whenever the track
/// set, tolerance, or relative-key flag changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPair {
    /// Index of the first track.
    pub a: usize,
    /// Index of the second track.
    pub b: usize,
    /// Absolute BPM difference after applying the best-fit tempo relation.
    pub tempo_delta: f64,
    pub tempo_relation: TempoRelation,
    pub key_relation: KeyRelation,
}

/// A match pair plus its optional similarity score.
///
/// `score` is a view-time annotation: `None` means "unranked by this
/// dimension", not zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPair {
    pub pair: MatchPair,
    pub score: Option<u8>,
}

// =============================================================================
// Scoring toggles
// =============================================================================

/// The three independent scoring category switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreToggles {
    /// Valence, mode, genre overlap.
    pub mood: bool,
    /// Energy, danceability, loudness, popularity.
    pub energy: bool,
    /// Instrumentalness, speechiness, acousticness.
    pub texture: bool,
}

impl ScoreToggles {
    pub fn new(mood: bool, energy: bool, texture: bool) -> Self {
        Self { mood, energy, texture }
    }

    /// True when at least one category is active.
    pub fn any(self) -> bool {
        self.mood || self.energy || self.texture
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_class_index_roundtrip() {
        for i in 0..12 {
            let pc = PitchClass::from_index(i).unwrap();
            assert_eq!(pc.to_index() as i64, i);
        }
        assert!(PitchClass::from_index(-1).is_none());
        assert!(PitchClass::from_index(12).is_none());
    }

    #[test]
    fn test_mode_from_index() {
        assert_eq!(Mode::from_index(0), Mode::Minor);
        assert_eq!(Mode::from_index(1), Mode::Major);
        assert_eq!(Mode::from_index(-3), Mode::Major);
    }

    #[test]
    fn test_key_labels() {
        let cs_major = Key::new(PitchClass::Cs, Mode::Major);
        let cs_minor = Key::new(PitchClass::Cs, Mode::Minor);
        assert_eq!(cs_major.label(), "C#");
        assert_eq!(cs_minor.label(), "C# min");
    }

    #[test]
    fn test_key_label_roundtrip() {
        for i in 0..12 {
            let pc = PitchClass::from_index(i).unwrap();
            for mode in [Mode::Major, Mode::Minor] {
                let key = Key::new(pc, mode);
                assert_eq!(Key::from_label(&key.label()), Some(key));
            }
        }
        assert!(Key::from_label("H").is_none());
        assert!(Key::from_label("C minor").is_none());
    }

    #[test]
    fn test_relative_key_table() {
        // Reference points from the source table.
        let cases = [
            ("C", "A min"),
            ("C#", "A# min"),
            ("D", "B min"),
            ("G", "E min"),
            ("B", "G# min"),
            ("F min", "G#"),
        ];
        for (from, to) in cases {
            let key = Key::from_label(from).unwrap();
            assert_eq!(key.relative().label(), to, "relative of {from}");
        }
    }

    #[test]
    fn test_relative_key_involutive() {
        for i in 0..12 {
            let pc = PitchClass::from_index(i).unwrap();
            for mode in [Mode::Major, Mode::Minor] {
                let key = Key::new(pc, mode);
                assert_eq!(key.relative().relative(), key);
            }
        }
    }

    #[test]
    fn test_track_dedup_key() {
        let key = Key::new(PitchClass::C, Mode::Major);
        let t = Track::new("Strobe", "deadmau5", 128, key);
        assert_eq!(t.dedup_key(), "Strobe|||deadmau5");

        // Case-sensitive, exact.
        let t2 = Track::new("strobe", "deadmau5", 128, key);
        assert_ne!(t.dedup_key(), t2.dedup_key());
    }

    #[test]
    fn test_track_serialization_skips_absent() {
        let key = Key::new(PitchClass::A, Mode::Minor);
        let mut t = Track::new("Breathe", "Telepopmusik", 120, key);
        t.energy = Some(0.5);

        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["key"], "A min");
        assert_eq!(json["energy"], 0.5);
        assert!(json.get("valence").is_none());
        assert!(json.get("genreTags").is_none());
    }

    #[test]
    fn test_toggles_any() {
        assert!(!ScoreToggles::default().any());
        assert!(ScoreToggles::new(false, true, false).any());
    }
}
