// Whole-solution acceptance checks, run once every voice is complete.
//
// Fixed voices are skipped throughout; they were accepted when they were
// generated.

use crate::pipeline::Context;
use crate::pitch::Pitch;
use crate::timeline::Position;

/// Indices of the voices the search filled in.
fn searched_voices(ctx: &Context) -> impl Iterator<Item = usize> {
    (0..ctx.voice_count()).filter(move |&v| !ctx.voice(v).fixed)
}

/// Every searched voice with deadlines reached its lowest and highest pitch.
pub fn extremes_placed(ctx: &Context) -> bool {
    searched_voices(ctx).all(|v| {
        let params = ctx.voice(v);
        let flags = params.flags;
        (flags.lowest_placed || params.lowest_must_appear_by == usize::MAX)
            && (flags.highest_placed || params.highest_must_appear_by == usize::MAX)
    })
}

/// Every ascending leap larger than a third is later filled in: some later
/// note lies strictly between its two ends.
pub fn ascending_leaps_filled_in(ctx: &Context) -> bool {
    searched_voices(ctx).all(|v| {
        let notes = ctx.timeline(v).pitches();
        notes.windows(2).enumerate().all(|(i, pair)| {
            let (from, to) = (pair[0], pair[1]);
            if from.tonal_interval(to) <= 3 {
                return true;
            }
            notes[i + 2..]
                .iter()
                .any(|p| p.absolute() > from.absolute() && p.absolute() < to.absolute())
        })
    })
}

fn intervals(notes: &[Pitch]) -> Vec<i32> {
    notes.windows(2).map(|w| w[0].tonal_interval(w[1])).collect()
}

fn has_repeated_window<T: PartialEq>(items: &[T], size: usize) -> bool {
    let windows: Vec<&[T]> = items.windows(size).collect();
    windows
        .iter()
        .enumerate()
        .any(|(i, a)| windows[i + 1..].iter().any(|b| a == b))
}

/// No sequence of three melodic intervals occurs twice.
pub fn no_repeated_interval_sequence(ctx: &Context) -> bool {
    searched_voices(ctx).all(|v| !has_repeated_window(&intervals(&ctx.timeline(v).pitches()), 3))
}

/// No three-note figure occurs twice.
pub fn no_repeated_three_notes(ctx: &Context) -> bool {
    searched_voices(ctx).all(|v| !has_repeated_window(&ctx.timeline(v).pitches(), 3))
}

/// Fourth species ties at least half its bars: no more than one and a half
/// notes per bar.
pub fn mostly_syncopated(ctx: &Context) -> bool {
    let limit = ctx.length() as f64 * ctx.config.style.max_syncopated_notes_per_bar;
    searched_voices(ctx).all(|v| (ctx.timeline(v).pitches().len() as f64) <= limit)
}

pub fn octave_leaps_within_quota(ctx: &Context) -> bool {
    searched_voices(ctx).all(|v| {
        let octaves = intervals(&ctx.timeline(v).pitches())
            .into_iter()
            .filter(|i| i.abs() == 8)
            .count();
        octaves <= ctx.voice(v).quotas.max_octave_leaps as usize
    })
}

/// Every sharpened note is followed by a note a step above.
pub fn sharps_resolve(ctx: &Context) -> bool {
    searched_voices(ctx).all(|v| {
        let entities = ctx.timeline(v).entities();
        entities.iter().enumerate().all(|(i, placed)| match placed.pitch() {
            Some(p) if p.is_sharp() => entities
                .get(i + 1)
                .and_then(|next| next.pitch())
                .is_some_and(|next| p.tonal_interval(next) == 2),
            _ => true,
        })
    })
}

/// Lines of eight bars or more contain at least one note tied across a
/// barline.
pub fn has_syncopation(ctx: &Context) -> bool {
    if ctx.length() < 8 {
        return true;
    }
    searched_voices(ctx).all(|v| {
        ctx.timeline(v).entities().iter().any(|placed| {
            placed.pitch().is_some()
                && placed.position.offset != 0
                && placed.end() > Position::downbeat(placed.position.bar + 1)
        })
    })
}

/// Answering voices have reproduced the entire theme.
pub fn theme_completed(ctx: &Context) -> bool {
    let Some(theme) = &ctx.config.theme else {
        return true;
    };
    searched_voices(ctx)
        .filter(|&v| ctx.voice(v).answers_theme)
        .all(|v| ctx.voice(v).flags.theme_index as usize >= theme.notes.len())
}

/// A theme has presented both notes of its outline.
pub fn outline_completed(ctx: &Context) -> bool {
    searched_voices(ctx).all(|v| {
        let params = ctx.voice(v);
        params.outline.is_none() || params.flags.second_outline_placed
    })
}

/// A third in the opening chord comes with a fifth.
pub fn opening_chord_complete(ctx: &Context) -> bool {
    let start = Position::downbeat(0);
    let Some(bass) = ctx.pitch_at(0, start) else {
        return true;
    };
    let classes: Vec<i32> = (1..ctx.voice_count())
        .filter_map(|v| ctx.pitch_at(v, start))
        .map(|p| bass.tonal_interval(p).abs() % 7)
        .collect();
    !classes.contains(&3) || classes.contains(&5)
}
