// Church modes, vocal ranges and modal spelling.
//
// Jeppesen's counterpoint is written in the six untransposed church modes,
// all on the white notes. The mode fixes the final (the resting pitch every
// voice cadences on), which accidentals a degree may carry, and which degree
// acts as the leading tone into the final.
//
// This module provides:
// - `Mode` and `VocalRange` as read-only configuration
// - `ModeResolver`: default and alternate spellings, "pitches a given
//   interval away", leading-tone identification
// - `Hexachord`: the outline an imitative theme is built on
//
// Everything here is pure. Modes are never mutated during a run.

use crate::intervals::LegalIntervals;
use crate::pitch::{Accidental, Pitch};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The six church modes, named by their final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// C Ionian: C D E F G A B C
    Ionian,
    /// D Dorian: D E F G A B(b) C D, B usually flattened
    Dorian,
    /// E Phrygian: E F G A B C D E, half step above the final
    Phrygian,
    /// F Lydian: F G A Bb C D E F, B flattened to avoid the tritone
    Lydian,
    /// G Mixolydian: G A B C D E F G
    Mixolydian,
    /// A Aeolian: A B C D E F G A
    Aeolian,
}

impl Mode {
    pub const ALL: [Mode; 6] = [
        Mode::Ionian,
        Mode::Dorian,
        Mode::Phrygian,
        Mode::Lydian,
        Mode::Mixolydian,
        Mode::Aeolian,
    ];

    /// Scale degree of the final (1 = C).
    pub fn final_degree(self) -> u8 {
        match self {
            Mode::Ionian => 1,
            Mode::Dorian => 2,
            Mode::Phrygian => 3,
            Mode::Lydian => 4,
            Mode::Mixolydian => 5,
            Mode::Aeolian => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Mode::Ionian => "ionian",
            Mode::Dorian => "dorian",
            Mode::Phrygian => "phrygian",
            Mode::Lydian => "lydian",
            Mode::Mixolydian => "mixolydian",
            Mode::Aeolian => "aeolian",
        }
    }

    /// Hexachords an imitative theme in this mode may outline: those whose
    /// answer does not outline a tritone. Over E the hard outline would be
    /// answered B-F; over C and F the soft one would be answered F-B and
    /// Bb-E.
    pub fn hexachords(self) -> &'static [Hexachord] {
        match self {
            Mode::Ionian | Mode::Lydian => &[Hexachord::Durum],
            Mode::Phrygian => &[Hexachord::Molle],
            Mode::Dorian | Mode::Mixolydian | Mode::Aeolian => &Hexachord::ALL,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown mode '{s}'"))
    }
}

/// Standard choral ranges, bottom to top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VocalRange {
    Bass,
    Tenor,
    Alto,
    Soprano,
}

impl VocalRange {
    /// Tonal span of every range (a twelfth).
    pub const SPAN: i32 = 12;

    pub fn lowest(self) -> Pitch {
        match self {
            VocalRange::Bass => Pitch::natural(4, 2),
            VocalRange::Tenor => Pitch::natural(1, 3),
            VocalRange::Alto => Pitch::natural(4, 3),
            VocalRange::Soprano => Pitch::natural(1, 4),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VocalRange::Bass => "Bass",
            VocalRange::Tenor => "Tenor",
            VocalRange::Alto => "Alto",
            VocalRange::Soprano => "Soprano",
        }
    }
}

/// Hexachord used to seed imitative themes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hexachord {
    /// Hard hexachord: the theme outlines the final and the fifth above.
    Durum,
    /// Soft hexachord: the theme outlines the final and the fourth above.
    Molle,
}

impl Hexachord {
    pub const ALL: [Hexachord; 2] = [Hexachord::Durum, Hexachord::Molle];

    /// Tonal interval from the final to the second outline note.
    pub fn outline_interval(self) -> i32 {
        match self {
            Hexachord::Durum => 5,
            Hexachord::Molle => 4,
        }
    }

    /// Upward tonal interval that takes an answer note back to the degree of
    /// the theme note it answers.
    pub fn transposition_interval(self) -> i32 {
        match self {
            Hexachord::Durum => 4,
            Hexachord::Molle => 5,
        }
    }

    /// Signed tonal interval from a theme note to its answer. The soft answer
    /// lies a fifth below; the hard one, a fourth below, is taken up an
    /// octave so that it too sounds a fifth from the theme.
    pub fn answer_interval(self) -> i32 {
        match self {
            Hexachord::Durum => 5,
            Hexachord::Molle => -5,
        }
    }

    /// Whether the answering voice sits above the theme.
    pub fn answers_above(self) -> bool {
        self.answer_interval() > 0
    }

    /// The hexachord the answering voice takes when the theme has `self`.
    pub fn other(self) -> Hexachord {
        match self {
            Hexachord::Durum => Hexachord::Molle,
            Hexachord::Molle => Hexachord::Durum,
        }
    }
}

/// Spelling and interval lookups for one mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeResolver {
    pub mode: Mode,
}

impl ModeResolver {
    pub fn new(mode: Mode) -> Self {
        ModeResolver { mode }
    }

    pub fn final_degree(&self) -> u8 {
        self.mode.final_degree()
    }

    /// Accidental a degree carries when nothing asks for an alteration.
    pub fn default_accidental(&self, degree: u8) -> Accidental {
        match (self.mode, degree) {
            (Mode::Dorian | Mode::Lydian, 7) => Accidental::Flat,
            _ => Accidental::Natural,
        }
    }

    /// Every accidental the mode allows on a degree, default first. C, F and
    /// G may be raised in any mode.
    pub fn spellings(&self, degree: u8) -> &'static [Accidental] {
        use Accidental::*;
        match (self.mode, degree) {
            (Mode::Dorian | Mode::Lydian, 7) => &[Flat, Natural],
            (_, 1 | 4 | 5) => &[Natural, Sharp],
            _ => &[Natural],
        }
    }

    pub fn default_pitch(&self, degree: u8, octave: i8) -> Pitch {
        Pitch::new(degree, octave, self.default_accidental(degree))
    }

    /// The final in the given octave.
    pub fn final_pitch(&self, octave: i8) -> Pitch {
        Pitch::natural(self.final_degree(), octave)
    }

    pub fn is_final(&self, pitch: Pitch) -> bool {
        pitch.degree == self.final_degree() && pitch.accidental == Accidental::Natural
    }

    /// Degree and octave `interval` tonal steps from `from`.
    fn step(from: Pitch, interval: i32) -> (u8, i8) {
        debug_assert!(interval != 0, "tonal intervals are 1-indexed");
        let offset = if interval > 0 { interval - 1 } else { interval + 1 };
        let staff = from.staff_position() + offset;
        ((staff.rem_euclid(7) + 1) as u8, staff.div_euclid(7) as i8)
    }

    /// The default spelling `interval` steps away.
    pub fn default_pitch_from_interval(&self, from: Pitch, interval: i32) -> Pitch {
        let (degree, octave) = Self::step(from, interval);
        self.default_pitch(degree, octave)
    }

    /// Every spelling the mode allows `interval` steps away, unfiltered.
    pub fn spellings_at(&self, from: Pitch, interval: i32) -> Vec<Pitch> {
        let (degree, octave) = Self::step(from, interval);
        self.spellings(degree)
            .iter()
            .map(|&acc| Pitch::new(degree, octave, acc))
            .collect()
    }

    /// Spellings `interval` steps away that do not form an augmented or
    /// diminished interval with `from`. May be empty.
    pub fn pitches_from_interval(
        &self,
        from: Pitch,
        interval: i32,
        legal: &LegalIntervals,
    ) -> Vec<Pitch> {
        self.spellings_at(from, interval)
            .into_iter()
            .filter(|&p| {
                let (tonal, chromatic) = from.intervals(p);
                !legal.is_forbidden(tonal, chromatic)
            })
            .collect()
    }

    /// Degree that leads into the final from below.
    pub fn leading_tone_degree(&self) -> u8 {
        match self.final_degree() {
            1 => 7,
            d => d - 1,
        }
    }

    /// Accidental of the leading tone: raised where the natural degree lies
    /// a whole step below the final.
    pub fn leading_tone_accidental(&self) -> Accidental {
        match self.mode {
            Mode::Dorian | Mode::Mixolydian | Mode::Aeolian => Accidental::Sharp,
            Mode::Ionian | Mode::Phrygian | Mode::Lydian => Accidental::Natural,
        }
    }

    pub fn is_leading_tone(&self, pitch: Pitch) -> bool {
        pitch.degree == self.leading_tone_degree()
            && pitch.accidental == self.leading_tone_accidental()
    }

    /// The leading tone directly below `final_pitch`.
    pub fn leading_tone_below(&self, final_pitch: Pitch) -> Pitch {
        let (degree, octave) = Self::step(final_pitch, -2);
        Pitch::new(degree, octave, self.leading_tone_accidental())
    }

    /// The final that sits a fourth to a tenth above the bottom of `range`,
    /// leaving room for melodies to dip below it.
    pub fn final_in_range(&self, range: VocalRange) -> Pitch {
        let low = range.lowest();
        (4..=10)
            .map(|interval| self.default_pitch_from_interval(low, interval))
            .find(|p| p.degree == self.final_degree())
            .unwrap_or_else(|| self.final_pitch(low.octave + 1))
    }

    /// Both notes of the `hexachord` outline starting on the final near
    /// `range`.
    pub fn hexachord_outline(&self, range: VocalRange, hexachord: Hexachord) -> [Pitch; 2] {
        let final_pitch = self.final_in_range(range);
        let upper = self.default_pitch_from_interval(final_pitch, hexachord.outline_interval());
        [final_pitch, upper]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_b_flat_modes() {
        for mode in Mode::ALL {
            let resolver = ModeResolver::new(mode);
            let expected = if matches!(mode, Mode::Dorian | Mode::Lydian) {
                Accidental::Flat
            } else {
                Accidental::Natural
            };
            assert_eq!(resolver.default_accidental(7), expected, "{mode}");
        }
    }

    #[test]
    fn test_spellings_only_legal_alterations() {
        for mode in Mode::ALL {
            let resolver = ModeResolver::new(mode);
            for degree in 1..=7u8 {
                for &acc in resolver.spellings(degree) {
                    let flat_ok = acc != Accidental::Flat || degree == 7;
                    let sharp_ok = acc != Accidental::Sharp || matches!(degree, 1 | 4 | 5);
                    assert!(flat_ok && sharp_ok, "{mode}: degree {degree} {acc:?}");
                }
            }
        }
    }

    #[test]
    fn test_sharps_on_c_f_and_g_in_every_mode() {
        for mode in Mode::ALL {
            let resolver = ModeResolver::new(mode);
            for degree in [1, 4, 5] {
                assert!(resolver.spellings(degree).contains(&Accidental::Sharp), "{mode}: {degree}");
                assert_eq!(resolver.spellings(degree)[0], Accidental::Natural);
            }
            for degree in [2, 3, 6, 7] {
                assert!(!resolver.spellings(degree).contains(&Accidental::Sharp), "{mode}: {degree}");
            }
        }
    }

    #[test]
    fn test_answer_returns_to_the_theme_degree() {
        for mode in Mode::ALL {
            let resolver = ModeResolver::new(mode);
            for hexachord in Hexachord::ALL {
                let [first, _] = resolver.hexachord_outline(VocalRange::Tenor, hexachord);
                let answer = resolver.default_pitch_from_interval(first, hexachord.answer_interval());
                assert_eq!(answer.tonal_interval(first).abs(), 5, "{mode} {hexachord:?}");
                assert_eq!(answer.absolute() > first.absolute(), hexachord.answers_above());
                let back = resolver.default_pitch_from_interval(answer, hexachord.transposition_interval());
                assert_eq!(back.degree, first.degree, "{mode} {hexachord:?}");
            }
        }
    }

    #[test]
    fn test_offered_hexachords_answer_without_tritones() {
        let legal = LegalIntervals::default();
        for mode in Mode::ALL {
            let resolver = ModeResolver::new(mode);
            for hexachord in Hexachord::ALL {
                let outline = resolver.hexachord_outline(VocalRange::Tenor, hexachord);
                let [a, b] = outline.map(|p| resolver.default_pitch_from_interval(p, hexachord.answer_interval()));
                let (tonal, chromatic) = a.intervals(b);
                assert_eq!(
                    mode.hexachords().contains(&hexachord),
                    !legal.is_forbidden(tonal, chromatic),
                    "{mode} {hexachord:?}: {a} to {b}"
                );
            }
        }
    }

    #[test]
    fn test_pitches_from_interval_drops_tritone() {
        let resolver = ModeResolver::new(Mode::Lydian);
        let legal = LegalIntervals::default();
        let f = Pitch::natural(4, 3);
        let fourths = resolver.pitches_from_interval(f, 4, &legal);
        assert_eq!(fourths, vec![Pitch::new(7, 3, Accidental::Flat)]);
        // Both B spellings exist before filtering.
        assert_eq!(resolver.spellings_at(f, 4).len(), 2);
    }

    #[test]
    fn test_interval_steps_cross_octaves() {
        let resolver = ModeResolver::new(Mode::Ionian);
        let c4 = Pitch::natural(1, 4);
        assert_eq!(resolver.default_pitch_from_interval(c4, 8), Pitch::natural(1, 5));
        assert_eq!(resolver.default_pitch_from_interval(c4, -2), Pitch::natural(7, 3));
        assert_eq!(resolver.default_pitch_from_interval(c4, 1), c4);
        assert_eq!(resolver.default_pitch_from_interval(c4, -5), Pitch::natural(4, 3));
    }

    #[test]
    fn test_leading_tones() {
        let dorian = ModeResolver::new(Mode::Dorian);
        let d4 = dorian.final_pitch(4);
        let lt = dorian.leading_tone_below(d4);
        assert_eq!(lt, Pitch::new(1, 4, Accidental::Sharp));
        assert!(dorian.is_leading_tone(lt));
        assert_eq!(lt.chromatic_interval(d4), 1);

        let ionian = ModeResolver::new(Mode::Ionian);
        let b3 = ionian.leading_tone_below(ionian.final_pitch(4));
        assert_eq!(b3, Pitch::natural(7, 3));
    }

    #[test]
    fn test_final_in_range() {
        for mode in Mode::ALL {
            let resolver = ModeResolver::new(mode);
            for range in [VocalRange::Bass, VocalRange::Tenor, VocalRange::Alto, VocalRange::Soprano] {
                let f = resolver.final_in_range(range);
                let above = range.lowest().tonal_interval(f);
                assert!((4..=10).contains(&above), "{mode} {range:?}: {above}");
                assert!(resolver.is_final(f));
            }
        }
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("Dorian".parse::<Mode>(), Ok(Mode::Dorian));
        assert!("locrian".parse::<Mode>().is_err());
    }
}
