// Duration sources and filters.
//
// Sources say which durations a voice may choose at a position before any
// pitch is known; a variant registers one or more and the pipeline unions
// them. Filters then shrink that set for a concrete pitch. Positions that a
// duration would skip past are buried by the timeline, so a source may
// offer durations the grid cannot hold; `Timeline::fits` drops those.
//
// Harmonic-rhythmic filters at the bottom also look at the other voices:
// a note that will still be sounding on the next downbeat must not clash
// there unless the clash is a suspension that can resolve.

use crate::pipeline::Context;
use crate::pitch::{DurationSet, Pitch};
use crate::timeline::{BEAT_1, BEAT_1_AND, BEAT_2, BEAT_3, Position};

/// Florid defaults: a long final, otherwise anything from an eighth to a
/// dotted whole depending on the beat.
pub fn default_durations(ctx: &Context, _voice: usize, position: Position) -> DurationSet {
    if ctx.is_final_position(position) {
        return DurationSet::FINAL;
    }
    match position.offset {
        0 => DurationSet::of(&[4, 6, 8, 12]),
        BEAT_1 => DurationSet::of(&[1, 2]),
        BEAT_1_AND => DurationSet::of(&[1]),
        BEAT_2 => DurationSet::of(&[2, 4, 6, 8]),
        BEAT_3 => DurationSet::of(&[2]),
        _ => DurationSet::EMPTY,
    }
}

/// A half rest may open the piece.
pub fn opening_half_rest(_ctx: &Context, _voice: usize, position: Position) -> DurationSet {
    if position == Position::downbeat(0) {
        DurationSet::of(&[4])
    } else {
        DurationSet::EMPTY
    }
}

/// A half or whole rest may open the piece.
pub fn opening_rests(_ctx: &Context, _voice: usize, position: Position) -> DurationSet {
    if position == Position::downbeat(0) {
        DurationSet::of(&[4, 8])
    } else {
        DurationSet::EMPTY
    }
}

/// Whole notes only.
pub fn cantus_firmus_notes(_ctx: &Context, _voice: usize, _position: Position) -> DurationSet {
    DurationSet::of(&[8])
}

pub fn whole_notes(ctx: &Context, _voice: usize, position: Position) -> DurationSet {
    if ctx.is_final_position(position) {
        DurationSet::FINAL
    } else {
        DurationSet::of(&[8])
    }
}

pub fn half_notes(ctx: &Context, _voice: usize, position: Position) -> DurationSet {
    if ctx.is_final_position(position) {
        DurationSet::FINAL
    } else {
        DurationSet::of(&[4])
    }
}

pub fn quarter_notes(ctx: &Context, _voice: usize, position: Position) -> DurationSet {
    if ctx.is_final_position(position) {
        DurationSet::FINAL
    } else {
        DurationSet::of(&[2])
    }
}

/// Fourth species: halves on the downbeat, halves or tied wholes from the
/// weak half.
pub fn syncopated_halves(ctx: &Context, _voice: usize, position: Position) -> DurationSet {
    if ctx.is_final_position(position) {
        return DurationSet::FINAL;
    }
    match position.offset {
        0 => DurationSet::of(&[4]),
        BEAT_2 => DurationSet::of(&[4, 8]),
        _ => DurationSet::EMPTY,
    }
}

/// Fifth species vocabulary. The first note is long.
pub fn florid_durations(ctx: &Context, voice: usize, position: Position) -> DurationSet {
    if ctx.is_final_position(position) {
        return DurationSet::FINAL;
    }
    if ctx.is_first_note(voice) {
        return DurationSet::of(&[4, 6, 8, 12]);
    }
    match position.offset {
        0 => DurationSet::of(&[2, 4, 6, 8]),
        BEAT_1 => DurationSet::of(&[1, 2]),
        BEAT_1_AND => DurationSet::of(&[1]),
        BEAT_2 => DurationSet::of(&[2, 4, 6, 8]),
        BEAT_3 => DurationSet::of(&[2]),
        _ => DurationSet::EMPTY,
    }
}

/// Theme vocabulary: a long opening, then halves and quarters with the
/// occasional whole.
pub fn theme_durations(ctx: &Context, voice: usize, position: Position) -> DurationSet {
    if ctx.is_first_note(voice) {
        return if ctx.length() <= 3 {
            DurationSet::of(&[6])
        } else {
            DurationSet::of(&[6, 8, 12, 16])
        };
    }
    match position.offset {
        0 => DurationSet::of(&[2, 4, 6, 8, 12]),
        BEAT_1 | BEAT_3 => DurationSet::of(&[2]),
        BEAT_2 => DurationSet::of(&[2, 4, 6, 8]),
        _ => DurationSet::EMPTY,
    }
}

/// Whole-bar rests for an answering voice that has not entered yet, as long
/// as there is still room to fit the theme.
pub fn rests_before_entry(ctx: &Context, voice: usize, position: Position) -> DurationSet {
    let params = ctx.voice(voice);
    let waiting = params.answers_theme && params.flags.theme_index == 0;
    if waiting && position.is_downbeat() && position.bar + 1 < params.entry_must_appear_by {
        DurationSet::of(&[8])
    } else {
        DurationSet::EMPTY
    }
}

fn start_of_previous(ctx: &Context, voice: usize) -> Option<(Position, u8)> {
    ctx.previous(voice).map(|p| (p.position, p.duration()))
}

/// Quarter-note run windows are filled with quarters, and no longer note
/// may swallow a window's first position.
pub fn runs_force_quarters(
    ctx: &Context,
    voice: usize,
    position: Position,
    _pitch: Pitch,
    durations: DurationSet,
) -> DurationSet {
    let mut durations = durations;
    for run in &ctx.voice(voice).runs {
        if run.covers(position) {
            return durations.intersect(DurationSet::of(&[2]));
        }
        if position < run.start {
            let room = run.start.eighths() - position.eighths();
            durations = durations.iter().filter(|&d| d as usize <= room).collect();
        }
    }
    durations
}

/// Whole notes on the downbeat stay within their quota.
pub fn whole_note_quota(
    ctx: &Context,
    voice: usize,
    position: Position,
    _pitch: Pitch,
    durations: DurationSet,
) -> DurationSet {
    let params = ctx.voice(voice);
    if position.is_downbeat() && params.flags.on_beat_whole_notes >= params.quotas.max_on_beat_whole_notes {
        durations.without(8).without(12)
    } else {
        durations
    }
}

/// Eighth pairs stay within their quota and are entered by step.
pub fn eighth_pairs(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
    durations: DurationSet,
) -> DurationSet {
    if position.offset != BEAT_1 || !durations.contains(1) {
        return durations;
    }
    let params = ctx.voice(voice);
    let by_step = matches!(ctx.previous_note(voice), Some(prev) if prev.tonal_interval(pitch).abs() == 2);
    if params.flags.eighth_pairs >= params.quotas.max_eighth_pairs || !by_step {
        durations.without(1)
    } else {
        durations
    }
}

/// No quarter directly after a whole note or longer.
pub fn no_quarters_after_long_notes(
    ctx: &Context,
    voice: usize,
    _position: Position,
    _pitch: Pitch,
    durations: DurationSet,
) -> DurationSet {
    match start_of_previous(ctx, voice) {
        Some((_, duration)) if duration >= 8 => durations.without(2),
        _ => durations,
    }
}

/// No two long notes in a row.
pub fn no_consecutive_long_notes(
    ctx: &Context,
    voice: usize,
    _position: Position,
    _pitch: Pitch,
    durations: DurationSet,
) -> DurationSet {
    match start_of_previous(ctx, voice) {
        Some((_, duration)) if duration >= 8 => durations.without(8).without(12).without(16),
        _ => durations,
    }
}

/// A syncopation across the barline is not followed directly by another.
pub fn no_chained_syncopations(
    ctx: &Context,
    voice: usize,
    position: Position,
    _pitch: Pitch,
    durations: DurationSet,
) -> DurationSet {
    if position.offset != BEAT_2 {
        return durations;
    }
    match start_of_previous(ctx, voice) {
        Some((start, duration)) if start.offset == BEAT_2 && duration >= 6 => durations.without(6).without(8),
        _ => durations,
    }
}

/// The bar before the final holds the cadence: no eighths, and the weak
/// half is a plain half note.
pub fn penultimate_bar_cadence(
    ctx: &Context,
    _voice: usize,
    position: Position,
    _pitch: Pitch,
    durations: DurationSet,
) -> DurationSet {
    if position.bar + 2 != ctx.length() {
        return durations;
    }
    let durations = durations.without(1);
    match position.offset {
        0 => durations.intersect(DurationSet::of(&[2, 4, 8])),
        BEAT_2 => durations.intersect(DurationSet::of(&[4])),
        _ => durations,
    }
}

/// A theme starts slowly: no short values in its first bars.
pub fn slow_beginning(
    ctx: &Context,
    _voice: usize,
    position: Position,
    _pitch: Pitch,
    durations: DurationSet,
) -> DurationSet {
    let length = ctx.length();
    if position.bar + 6 <= length {
        durations.without(2).without(4).without(6)
    } else if position.bar + 5 <= length {
        durations.without(2).without(4)
    } else {
        durations
    }
}

/// Two quarters in a row call for a third.
pub fn quarter_pairs_continue(
    ctx: &Context,
    voice: usize,
    _position: Position,
    _pitch: Pitch,
    durations: DurationSet,
) -> DurationSet {
    let entities = ctx.timeline(voice).entities();
    let pair = match entities {
        [.., x, a, b] => x.duration() != 2 && a.duration() == 2 && b.duration() == 2,
        [a, b] => a.duration() == 2 && b.duration() == 2,
        _ => false,
    };
    if pair {
        durations.intersect(DurationSet::of(&[2]))
    } else {
        durations
    }
}

/// An answering voice copies the theme's rhythm note for note.
pub fn theme_rhythm(
    ctx: &Context,
    voice: usize,
    _position: Position,
    _pitch: Pitch,
    durations: DurationSet,
) -> DurationSet {
    let params = ctx.voice(voice);
    let Some(theme) = &ctx.config.theme else {
        return durations;
    };
    if !params.answers_theme {
        return durations;
    }
    match theme.notes.get(params.flags.theme_index as usize) {
        Some(value) => DurationSet::of(&[value.duration()]),
        None => durations,
    }
}

/// A note that will still sound on the next downbeat must be consonant
/// there, or form a suspension that can resolve.
pub fn prepares_suspensions(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
    durations: DurationSet,
) -> DurationSet {
    let legal = ctx.legal();
    let next_bar = Position::downbeat(position.bar + 1);
    let to_barline = next_bar.eighths() - position.eighths();
    let others = ctx.sounding_with(voice, next_bar);
    if others.is_empty() {
        return durations;
    }
    let clash_resolves = others
        .iter()
        .all(|&(_, other)| legal.is_consonant(other, pitch) || legal.is_resolvable_dissonance(other, pitch));
    if clash_resolves {
        return durations;
    }
    durations.iter().filter(|&d| d as usize <= to_barline).collect()
}

/// A dissonance off the strong beats lasts no more than a quarter.
pub fn short_weak_dissonances(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
    durations: DurationSet,
) -> DurationSet {
    if !matches!(position.offset, BEAT_1 | BEAT_1_AND | BEAT_3) {
        return durations;
    }
    let legal = ctx.legal();
    let dissonant = ctx
        .sounding_with(voice, position)
        .iter()
        .any(|&(_, other)| !legal.is_consonant(other, pitch));
    if dissonant {
        durations.intersect(DurationSet::of(&[1, 2]))
    } else {
        durations
    }
}
