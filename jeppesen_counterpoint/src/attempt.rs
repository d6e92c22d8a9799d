// Per-attempt parameters.
//
// At the start of every attempt the variant's draw function picks, for each
// voice, an ambitus (lowest and highest pitch), the bars by which each must
// have appeared, rhythmic quotas and any variant material (quarter-note run
// windows, hexachord outline, "answers the theme"). These are fixed for the
// attempt.
//
// The only part that changes during search is `VoiceFlags`: a small `Copy`
// record mutated after each placement ("highest has been placed", "two
// on-beat whole notes used"). The engine snapshots a voice's flags before
// every placement and copies them back on removal, so mutation predicates
// never need an inverse.

use crate::intervals::LegalIntervals;
use crate::mode::{Hexachord, ModeResolver, VocalRange};
use crate::pitch::{Pitch, RhythmicValue};
use crate::timeline::Position;
use jeppesen_prng::SeededRng;
use serde::{Deserialize, Serialize};

/// Mutable per-voice state, restored by plain copy on backtrack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoiceFlags {
    pub lowest_placed: bool,
    pub highest_placed: bool,
    /// Whole (or longer) notes starting on a downbeat.
    pub on_beat_whole_notes: u8,
    /// Pairs of eighth notes placed.
    pub eighth_pairs: u8,
    /// Melodic octave leaps placed.
    pub octave_leaps: u8,
    /// How many theme notes an answering voice has reproduced.
    pub theme_index: u8,
    /// Whether the second hexachord outline note has sounded.
    pub second_outline_placed: bool,
}

/// Rhythmic and melodic limits drawn per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quotas {
    pub max_on_beat_whole_notes: u8,
    pub max_eighth_pairs: u8,
    pub max_octave_leaps: u8,
}

impl Default for Quotas {
    fn default() -> Self {
        Quotas {
            max_on_beat_whole_notes: u8::MAX,
            max_eighth_pairs: u8::MAX,
            max_octave_leaps: u8::MAX,
        }
    }
}

/// A window of consecutive quarter notes the voice must fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterRun {
    pub start: Position,
    pub quarters: u8,
}

impl QuarterRun {
    pub fn covers(&self, position: Position) -> bool {
        let start = self.start.eighths();
        let end = start + 2 * self.quarters as usize;
        (start..end).contains(&position.eighths())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceParameters {
    pub range: VocalRange,
    pub lowest: Pitch,
    pub highest: Pitch,
    pub lowest_must_appear_by: usize,
    pub highest_must_appear_by: usize,
    /// Every pitch the voice may use this attempt.
    pub palette: Vec<Pitch>,
    pub quotas: Quotas,
    pub runs: Vec<QuarterRun>,
    /// The last interval must be a descending step.
    pub end_by_descending_step: bool,
    /// Hexachord drawn for this voice. A theme voice outlines its own; an
    /// answering voice holds the other one and answers at the interval of
    /// the theme voice's.
    pub hexachord: Option<Hexachord>,
    /// Hexachord outline notes, in the order the theme presents them.
    pub outline: Option<[Pitch; 2]>,
    pub second_outline_must_appear_by: usize,
    /// The voice reproduces the frozen theme (transposed) once it enters.
    pub answers_theme: bool,
    /// Bar by which an answering voice must have entered.
    pub entry_must_appear_by: usize,
    /// The voice is frozen material and is never searched.
    pub fixed: bool,
    pub flags: VoiceFlags,
}

impl VoiceParameters {
    /// A searched voice spanning `lowest..=highest`.
    pub fn new(range: VocalRange, lowest: Pitch, highest: Pitch, palette: Vec<Pitch>) -> Self {
        VoiceParameters {
            range,
            lowest,
            highest,
            lowest_must_appear_by: usize::MAX,
            highest_must_appear_by: usize::MAX,
            palette,
            quotas: Quotas::default(),
            runs: Vec::new(),
            end_by_descending_step: false,
            hexachord: None,
            outline: None,
            second_outline_must_appear_by: usize::MAX,
            answers_theme: false,
            entry_must_appear_by: usize::MAX,
            fixed: false,
            flags: VoiceFlags::default(),
        }
    }

    /// A frozen voice. Its ambitus is read off the material; deadlines are
    /// trivially met.
    pub fn fixed(range: VocalRange, values: &[RhythmicValue]) -> Self {
        let pitches: Vec<Pitch> = values.iter().filter_map(|v| v.pitch()).collect();
        let lowest = pitches
            .iter()
            .copied()
            .min_by_key(|p| p.absolute())
            .unwrap_or_else(|| range.lowest());
        let highest = pitches
            .iter()
            .copied()
            .max_by_key(|p| p.absolute())
            .unwrap_or(lowest);
        let mut params = VoiceParameters::new(range, lowest, highest, Vec::new());
        params.fixed = true;
        params.lowest_must_appear_by = 0;
        params.highest_must_appear_by = 0;
        params.flags.lowest_placed = true;
        params.flags.highest_placed = true;
        params
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptParameters {
    pub voices: Vec<VoiceParameters>,
}

/// Pitches from `lowest` to `highest` inclusive: both endpoints plus every
/// spelling the mode allows on the degrees between them.
pub fn palette_between(resolver: &ModeResolver, lowest: Pitch, highest: Pitch) -> Vec<Pitch> {
    let span = lowest.tonal_interval(highest);
    let mut palette = vec![lowest, highest];
    for interval in 2..span {
        palette.extend(resolver.spellings_at(lowest, interval));
    }
    palette
}

/// Draw an ambitus inside `range`: a span of `span_min..=span_max` steps
/// placed at a random height, with deadlines for its extremes.
///
/// Returns `None` when the draw spells a forbidden interval between the
/// extremes; the orchestrator redraws.
pub fn draw_ambitus(
    rng: &mut SeededRng,
    resolver: &ModeResolver,
    legal: &LegalIntervals,
    range: VocalRange,
    span: (i32, i32),
    length: usize,
) -> Option<VoiceParameters> {
    let span = rng.range_i64_inclusive(span.0 as i64, span.1 as i64) as i32;
    let room = (VocalRange::SPAN + 1 - span).max(1);
    let offset = rng.range_i64_inclusive(1, room as i64) as i32;
    let lowest = resolver.default_pitch_from_interval(range.lowest(), offset);
    let highest = resolver.default_pitch_from_interval(lowest, span);
    let (tonal, chromatic) = lowest.intervals(highest);
    if legal.is_forbidden(tonal, chromatic) {
        return None;
    }

    let last = length.saturating_sub(1).max(1);
    let highest_by = rng.range_usize_inclusive(3.min(last), last);
    let lowest_floor = if highest_by >= 5 { 3 } else { 5 };
    let lowest_by = rng.range_usize_inclusive(lowest_floor.min(last), last);

    let palette = palette_between(resolver, lowest, highest);
    let mut params = VoiceParameters::new(range, lowest, highest, palette);
    params.highest_must_appear_by = highest_by;
    params.lowest_must_appear_by = lowest_by;
    Some(params)
}
