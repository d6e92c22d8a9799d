// Interval legality tables.
//
// Melodic and harmonic legality is decided by table lookup on the
// `(tonal, chromatic)` pair from pitch.rs. The tables are plain data so a
// variant can swap them (the cantus firmus forbids repeated notes, for
// example) and so they can be dumped or loaded as JSON.
//
// The forbidden-combination table is keyed on `(|tonal| % 7, |chromatic| % 12)`
// and catches augmented and diminished spellings that the per-axis tables
// would let through (an augmented fourth has a legal tonal size and a legal
// semitone count, just not together).

use crate::pitch::Pitch;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalIntervals {
    /// Tonal intervals a voice may move by directly.
    pub tonal_adjacent: Vec<i32>,
    /// Chromatic intervals a voice may move by directly.
    pub chromatic_adjacent: Vec<i32>,
    /// Tonal intervals a voice may outline over a run in one direction.
    pub tonal_outline: Vec<i32>,
    /// Chromatic intervals a voice may outline.
    pub chromatic_outline: Vec<i32>,
    /// `(|tonal| % 7, |chromatic| % 12)` pairs that are never allowed.
    pub forbidden_combinations: Vec<(i32, i32)>,
    /// Consonant vertical intervals, `|tonal| % 7`.
    pub harmonic_tonal_consonant: Vec<i32>,
    /// Consonant vertical intervals, `|chromatic| % 12`.
    pub harmonic_chromatic_consonant: Vec<i32>,
    /// Signed tonal intervals (counterpoint minus cantus) a suspension may
    /// form and then resolve downward.
    pub resolvable_dissonance: Vec<i32>,
}

impl Default for LegalIntervals {
    fn default() -> Self {
        LegalIntervals {
            tonal_adjacent: vec![-8, -5, -4, -3, -2, 1, 2, 3, 4, 5, 6, 8],
            chromatic_adjacent: vec![-12, -7, -5, -4, -3, -2, -1, 0, 1, 2, 3, 4, 5, 7, 8, 12],
            tonal_outline: vec![-10, -8, -6, -5, -4, -3, -2, 1, 2, 3, 4, 5, 6, 8, 10],
            chromatic_outline: vec![
                -16, -15, -12, -9, -8, -7, -5, -4, -3, -2, -1, 0, 1, 2, 3, 4, 5, 7, 8, 9, 12, 15, 16,
            ],
            forbidden_combinations: vec![
                (1, 1),
                (2, 3),
                (3, 2),
                (4, 4),
                (4, 6),
                (5, 6),
                (5, 8),
                (6, 10),
            ],
            harmonic_tonal_consonant: vec![1, 3, 5, 6],
            harmonic_chromatic_consonant: vec![0, 3, 4, 7, 8, 9],
            resolvable_dissonance: vec![-9, -2, 4, 7, 11, 14, 18, 21],
        }
    }
}

impl LegalIntervals {
    /// Tables for a cantus firmus: no repeated notes.
    pub fn cantus_firmus() -> Self {
        LegalIntervals {
            tonal_adjacent: vec![-8, -5, -4, -3, -2, 2, 3, 4, 5, 6, 8],
            chromatic_adjacent: vec![-12, -7, -5, -4, -3, -2, -1, 1, 2, 3, 4, 5, 7, 8, 12],
            ..LegalIntervals::default()
        }
    }

    pub fn is_forbidden(&self, tonal: i32, chromatic: i32) -> bool {
        let key = (tonal.abs() % 7, chromatic.abs() % 12);
        self.forbidden_combinations.contains(&key)
    }

    /// Whether a voice may move directly from `from` to `to`.
    pub fn is_valid_adjacent(&self, from: Pitch, to: Pitch) -> bool {
        let (tonal, chromatic) = from.intervals(to);
        self.tonal_adjacent.contains(&tonal)
            && self.chromatic_adjacent.contains(&chromatic)
            && !self.is_forbidden(tonal, chromatic)
    }

    /// Whether a voice may outline the interval `from`..`to` across a run.
    pub fn is_valid_outline(&self, from: Pitch, to: Pitch) -> bool {
        let (tonal, chromatic) = from.intervals(to);
        self.tonal_outline.contains(&tonal)
            && self.chromatic_outline.contains(&chromatic)
            && !self.is_forbidden(tonal, chromatic)
    }

    /// Vertical consonance between two simultaneous pitches.
    pub fn is_consonant(&self, a: Pitch, b: Pitch) -> bool {
        let (tonal, chromatic) = a.intervals(b);
        self.harmonic_tonal_consonant.contains(&(tonal.abs() % 7))
            && self
                .harmonic_chromatic_consonant
                .contains(&(chromatic.abs() % 12))
            && !self.is_forbidden(tonal, chromatic)
    }

    /// Whether `upper` against `lower` is a dissonance a suspension may form.
    pub fn is_resolvable_dissonance(&self, lower: Pitch, upper: Pitch) -> bool {
        self.resolvable_dissonance
            .contains(&lower.tonal_interval(upper))
    }
}

/// A perfect unison, fifth or octave compound, by semitones.
pub fn is_perfect(chromatic: i32) -> bool {
    matches!(chromatic.abs() % 12, 0 | 7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::Accidental;

    fn n(degree: u8, octave: i8) -> Pitch {
        Pitch::natural(degree, octave)
    }

    #[test]
    fn test_tritone_is_forbidden() {
        let legal = LegalIntervals::default();
        // F up to B is an augmented fourth.
        assert!(!legal.is_valid_adjacent(n(4, 4), n(7, 4)));
        // F up to Bb is a perfect fourth.
        assert!(legal.is_valid_adjacent(n(4, 4), Pitch::new(7, 4, Accidental::Flat)));
    }

    #[test]
    fn test_augmented_unison_forbidden() {
        let legal = LegalIntervals::default();
        let c = n(1, 4);
        let c_sharp = Pitch::new(1, 4, Accidental::Sharp);
        assert!(legal.is_forbidden(1, 1));
        assert!(!legal.is_valid_adjacent(c, c_sharp));
    }

    #[test]
    fn test_repeated_note_only_outside_cantus_firmus() {
        let c = n(1, 4);
        assert!(LegalIntervals::default().is_valid_adjacent(c, c));
        assert!(!LegalIntervals::cantus_firmus().is_valid_adjacent(c, c));
    }

    #[test]
    fn test_major_sixth_not_adjacent_but_outline() {
        let legal = LegalIntervals::default();
        // C up to A: nine semitones.
        assert!(!legal.is_valid_adjacent(n(1, 4), n(6, 4)));
        assert!(legal.is_valid_outline(n(1, 4), n(6, 4)));
    }

    #[test]
    fn test_harmonic_consonance() {
        let legal = LegalIntervals::default();
        assert!(legal.is_consonant(n(1, 3), n(5, 3)), "fifth");
        assert!(legal.is_consonant(n(1, 3), n(3, 4)), "tenth");
        assert!(legal.is_consonant(n(1, 3), n(1, 4)), "octave");
        assert!(!legal.is_consonant(n(1, 3), n(4, 3)), "fourth");
        assert!(!legal.is_consonant(n(1, 3), n(2, 3)), "second");
        assert!(!legal.is_consonant(n(7, 3), n(4, 4)), "diminished fifth");
    }

    #[test]
    fn test_resolvable_dissonance_is_signed() {
        let legal = LegalIntervals::default();
        // A fourth above the cantus resolves down to a third.
        assert!(legal.is_resolvable_dissonance(n(1, 3), n(4, 3)));
        // A fourth below does not.
        assert!(!legal.is_resolvable_dissonance(n(4, 3), n(1, 3)));
    }

    #[test]
    fn test_is_perfect() {
        assert!(is_perfect(0));
        assert!(is_perfect(-19));
        assert!(is_perfect(12));
        assert!(!is_perfect(4));
    }
}
