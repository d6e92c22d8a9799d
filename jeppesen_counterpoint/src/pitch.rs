// Diatonic pitch representation and interval arithmetic.
//
// A pitch is a scale degree (1 = C through 7 = B), an octave (C4 = middle C)
// and an accidental. Intervals are always reported in two forms:
// - tonal: signed, 1-indexed count of scale steps (unison = 1, octave = 8,
//   a step down = -2). There is no zero tonal interval.
// - chromatic: signed difference in semitones.
// Consonance and legality checks need both, because the same tonal size can
// be perfect, major, minor, augmented or diminished (see intervals.rs).
//
// Also defines `RhythmicValue` (a note or a rest with a duration counted in
// eighth notes) and `DurationSet`, the small bitset the rhythmic filters
// shrink.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semitone offset of each natural scale degree above C.
const NATURAL_SEMITONES: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

const DEGREE_NAMES: [&str; 7] = ["C", "D", "E", "F", "G", "A", "B"];

/// Every duration a note or rest may have, in eighth notes.
pub const LEGAL_DURATIONS: [u8; 7] = [1, 2, 4, 6, 8, 12, 16];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Accidental {
    Flat,
    Natural,
    Sharp,
}

impl Accidental {
    /// Semitone adjustment applied to the natural degree.
    pub fn offset(self) -> i32 {
        match self {
            Accidental::Flat => -1,
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Accidental::Flat => "b",
            Accidental::Natural => "",
            Accidental::Sharp => "#",
        }
    }
}

/// A spelled pitch. Degrees run 1..=7; octave 4 holds middle C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pitch {
    pub degree: u8,
    pub octave: i8,
    pub accidental: Accidental,
}

impl Pitch {
    pub fn new(degree: u8, octave: i8, accidental: Accidental) -> Self {
        assert!(
            (1..=7).contains(&degree),
            "scale degree must be 1..=7, got {degree}"
        );
        Pitch {
            degree,
            octave,
            accidental,
        }
    }

    pub fn natural(degree: u8, octave: i8) -> Self {
        Pitch::new(degree, octave, Accidental::Natural)
    }

    /// Pitch class 0..=11 (C = 0).
    pub fn chromatic(self) -> i32 {
        self.unreduced().rem_euclid(12)
    }

    /// Absolute semitone position, `chromatic + 12 * octave` (C4 = 48).
    ///
    /// Computed from the unreduced class so that spellings such as B# keep
    /// their octave.
    pub fn absolute(self) -> i32 {
        self.unreduced() + 12 * self.octave as i32
    }

    fn unreduced(self) -> i32 {
        NATURAL_SEMITONES[(self.degree - 1) as usize] + self.accidental.offset()
    }

    /// Position on the diatonic staff, counted in steps from C0.
    pub fn staff_position(self) -> i32 {
        self.octave as i32 * 7 + (self.degree as i32 - 1)
    }

    /// Signed, 1-indexed tonal interval from `self` to `other`.
    pub fn tonal_interval(self, other: Pitch) -> i32 {
        let diff = other.staff_position() - self.staff_position();
        if diff >= 0 { diff + 1 } else { diff - 1 }
    }

    /// Signed semitone distance from `self` to `other`.
    pub fn chromatic_interval(self, other: Pitch) -> i32 {
        other.absolute() - self.absolute()
    }

    /// `(tonal, chromatic)` from `self` to `other`.
    pub fn intervals(self, other: Pitch) -> (i32, i32) {
        (self.tonal_interval(other), self.chromatic_interval(other))
    }

    /// Same degree, octave and accidental.
    pub fn is_unison(self, other: Pitch) -> bool {
        self == other
    }

    /// Same degree with a different accidental, a unison, octave or double
    /// octave apart (e.g. F against F# an octave higher).
    pub fn is_cross_relation(self, other: Pitch) -> bool {
        self.degree == other.degree
            && self.accidental != other.accidental
            && matches!(self.tonal_interval(other).abs(), 1 | 8 | 15)
    }

    pub fn is_sharp(self) -> bool {
        self.accidental == Accidental::Sharp
    }

    /// MIDI key number (C4 = 60).
    pub fn midi_key(self) -> u8 {
        (self.absolute() + 12).clamp(0, 127) as u8
    }

    /// Transpose by whole octaves.
    pub fn octave_shift(self, octaves: i8) -> Pitch {
        Pitch {
            octave: self.octave + octaves,
            ..self
        }
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            DEGREE_NAMES[(self.degree - 1) as usize],
            self.accidental.suffix(),
            self.octave
        )
    }
}

/// A note or a rest. Durations are in eighth notes and always one of
/// `LEGAL_DURATIONS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RhythmicValue {
    Note { pitch: Pitch, duration: u8 },
    Rest { duration: u8 },
}

impl RhythmicValue {
    pub fn note(pitch: Pitch, duration: u8) -> Self {
        assert_legal_duration(duration);
        RhythmicValue::Note { pitch, duration }
    }

    pub fn rest(duration: u8) -> Self {
        assert_legal_duration(duration);
        RhythmicValue::Rest { duration }
    }

    pub fn duration(self) -> u8 {
        match self {
            RhythmicValue::Note { duration, .. } | RhythmicValue::Rest { duration } => duration,
        }
    }

    pub fn pitch(self) -> Option<Pitch> {
        match self {
            RhythmicValue::Note { pitch, .. } => Some(pitch),
            RhythmicValue::Rest { .. } => None,
        }
    }

    pub fn is_rest(self) -> bool {
        matches!(self, RhythmicValue::Rest { .. })
    }

    /// The same value with a different duration.
    pub fn with_duration(self, duration: u8) -> Self {
        match self {
            RhythmicValue::Note { pitch, .. } => RhythmicValue::note(pitch, duration),
            RhythmicValue::Rest { .. } => RhythmicValue::rest(duration),
        }
    }
}

impl fmt::Display for RhythmicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RhythmicValue::Note { pitch, duration } => write!(f, "{pitch}/{duration}"),
            RhythmicValue::Rest { duration } => write!(f, "r/{duration}"),
        }
    }
}

fn assert_legal_duration(duration: u8) {
    assert!(
        LEGAL_DURATIONS.contains(&duration),
        "illegal duration {duration}"
    );
}

/// Set of legal durations, one bit per eighth-note count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DurationSet(u32);

impl DurationSet {
    pub const EMPTY: DurationSet = DurationSet(0);
    /// Just the two-bar closing note.
    pub const FINAL: DurationSet = DurationSet(1 << 16);

    pub fn of(durations: &[u8]) -> Self {
        durations.iter().copied().collect()
    }

    pub fn contains(self, duration: u8) -> bool {
        duration < 32 && self.0 & (1 << duration) != 0
    }

    pub fn insert(&mut self, duration: u8) {
        assert_legal_duration(duration);
        self.0 |= 1 << duration;
    }

    pub fn remove(&mut self, duration: u8) {
        if duration < 32 {
            self.0 &= !(1 << duration);
        }
    }

    pub fn without(mut self, duration: u8) -> Self {
        self.remove(duration);
        self
    }

    pub fn intersect(self, other: DurationSet) -> Self {
        DurationSet(self.0 & other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Durations in ascending order.
    pub fn iter(self) -> impl Iterator<Item = u8> {
        LEGAL_DURATIONS.into_iter().filter(move |&d| self.contains(d))
    }
}

impl FromIterator<u8> for DurationSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut set = DurationSet::EMPTY;
        for d in iter {
            set.insert(d);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(degree: u8, octave: i8) -> Pitch {
        Pitch::natural(degree, octave)
    }

    #[test]
    fn test_tonal_interval_conventions() {
        assert_eq!(p(1, 4).tonal_interval(p(1, 4)), 1);
        assert_eq!(p(1, 4).tonal_interval(p(2, 4)), 2);
        assert_eq!(p(2, 4).tonal_interval(p(1, 4)), -2);
        assert_eq!(p(1, 4).tonal_interval(p(1, 5)), 8);
        assert_eq!(p(5, 3).tonal_interval(p(3, 4)), 6);
        assert_eq!(p(3, 4).tonal_interval(p(5, 3)), -6);
    }

    #[test]
    fn test_interval_symmetry() {
        let pitches = [
            p(1, 3),
            p(4, 3),
            Pitch::new(7, 3, Accidental::Flat),
            p(7, 3),
            Pitch::new(1, 4, Accidental::Sharp),
            p(5, 4),
            Pitch::new(4, 4, Accidental::Sharp),
            p(3, 5),
        ];
        for &a in &pitches {
            for &b in &pitches {
                let (t_ab, c_ab) = a.intervals(b);
                let (t_ba, c_ba) = b.intervals(a);
                assert_eq!(c_ab, -c_ba, "chromatic {a}->{b} should negate");
                if a.degree == b.degree && a.octave == b.octave {
                    assert_eq!((t_ab, t_ba), (1, 1), "unison {a}->{b}");
                } else {
                    assert_eq!(t_ab, -t_ba, "tonal {a}->{b} should negate");
                }
            }
        }
    }

    #[test]
    fn test_chromatic_values() {
        assert_eq!(p(1, 4).absolute(), 48);
        assert_eq!(p(1, 4).midi_key(), 60);
        assert_eq!(Pitch::new(7, 3, Accidental::Flat).chromatic(), 10);
        assert_eq!(Pitch::new(1, 4, Accidental::Sharp).chromatic(), 1);
        assert_eq!(p(5, 4).chromatic_interval(p(1, 5)), 5);
    }

    #[test]
    fn test_cross_relation() {
        let f = p(4, 4);
        let f_sharp = Pitch::new(4, 4, Accidental::Sharp);
        assert!(f.is_cross_relation(f_sharp));
        assert!(f.is_cross_relation(f_sharp.octave_shift(1)));
        assert!(!f.is_cross_relation(f));
        assert!(!f.is_cross_relation(p(5, 4)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Pitch::new(7, 3, Accidental::Flat).to_string(), "Bb3");
        assert_eq!(RhythmicValue::rest(4).to_string(), "r/4");
        assert_eq!(RhythmicValue::note(p(2, 4), 8).to_string(), "D4/8");
    }

    #[test]
    fn test_duration_set_operations() {
        let mut set = DurationSet::of(&[2, 4, 8]);
        assert_eq!(set.len(), 3);
        assert!(set.contains(4));
        set.remove(4);
        assert!(!set.contains(4));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![2, 8]);
        assert!(set.intersect(DurationSet::of(&[16])).is_empty());
        assert_eq!(set.without(2), DurationSet::of(&[8]));
    }

    #[test]
    #[should_panic(expected = "illegal duration")]
    fn test_illegal_duration_panics() {
        let _ = RhythmicValue::rest(3);
    }
}
