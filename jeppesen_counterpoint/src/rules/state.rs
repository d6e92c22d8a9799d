// Index checks and flag mutations.
//
// Index checks decide whether the search may continue at a position at all,
// before any candidate is generated. They enforce the per-attempt deadlines:
// the ambitus extremes, a theme's second outline note, an answering voice's
// entry. Mutations are the only writers of `VoiceFlags`; each receives the
// flags from before the placement and returns the new ones.

use crate::attempt::VoiceFlags;
use crate::pipeline::Context;
use crate::timeline::{BEAT_1, Placed, Position};

/// The lowest and highest pitch must have sounded before their deadline bar.
pub fn extremes_by_deadline(ctx: &Context, voice: usize, position: Position) -> bool {
    let params = ctx.voice(voice);
    let flags = params.flags;
    (flags.lowest_placed || position.bar < params.lowest_must_appear_by)
        && (flags.highest_placed || position.bar < params.highest_must_appear_by)
}

pub fn track_extremes(
    ctx: &Context,
    voice: usize,
    placed: &Placed,
    mut flags: VoiceFlags,
) -> VoiceFlags {
    let params = ctx.voice(voice);
    if let Some(pitch) = placed.pitch() {
        flags.lowest_placed |= pitch == params.lowest;
        flags.highest_placed |= pitch == params.highest;
    }
    flags
}

/// Counts whole (or longer) notes starting on a downbeat.
pub fn count_on_beat_whole_notes(
    _ctx: &Context,
    _voice: usize,
    placed: &Placed,
    mut flags: VoiceFlags,
) -> VoiceFlags {
    if placed.pitch().is_some() && placed.position.is_downbeat() && placed.duration() >= 8 {
        flags.on_beat_whole_notes = flags.on_beat_whole_notes.saturating_add(1);
    }
    flags
}

/// Counts eighth pairs by their first eighth.
pub fn count_eighth_pairs(
    _ctx: &Context,
    _voice: usize,
    placed: &Placed,
    mut flags: VoiceFlags,
) -> VoiceFlags {
    if placed.duration() == 1 && placed.position.offset == BEAT_1 {
        flags.eighth_pairs = flags.eighth_pairs.saturating_add(1);
    }
    flags
}

pub fn count_octave_leaps(
    ctx: &Context,
    voice: usize,
    placed: &Placed,
    mut flags: VoiceFlags,
) -> VoiceFlags {
    let entities = ctx.timeline(voice).entities();
    let [.., before, last] = entities else {
        return flags;
    };
    debug_assert_eq!(last, placed);
    let octave = match (before.pitch(), placed.pitch()) {
        (Some(a), Some(b)) => a.tonal_interval(b).abs() == 8,
        _ => false,
    };
    if octave {
        flags.octave_leaps = flags.octave_leaps.saturating_add(1);
    }
    flags
}

/// A theme must present its second outline note before the deadline bar.
pub fn second_outline_by_deadline(ctx: &Context, voice: usize, position: Position) -> bool {
    let params = ctx.voice(voice);
    params.outline.is_none()
        || params.flags.second_outline_placed
        || position.bar < params.second_outline_must_appear_by
}

pub fn track_second_outline(
    ctx: &Context,
    voice: usize,
    placed: &Placed,
    mut flags: VoiceFlags,
) -> VoiceFlags {
    if let (Some([_, second]), Some(pitch)) = (ctx.voice(voice).outline, placed.pitch()) {
        flags.second_outline_placed |= pitch.degree == second.degree;
    }
    flags
}

/// An answering voice must have entered with the theme before its deadline.
pub fn theme_entry_by_deadline(ctx: &Context, voice: usize, position: Position) -> bool {
    let params = ctx.voice(voice);
    !params.answers_theme || params.flags.theme_index > 0 || position.bar < params.entry_must_appear_by
}

/// Advances an answering voice through the theme, one note per onset.
pub fn advance_theme_index(
    ctx: &Context,
    voice: usize,
    placed: &Placed,
    mut flags: VoiceFlags,
) -> VoiceFlags {
    let Some(theme) = &ctx.config.theme else {
        return flags;
    };
    let params = ctx.voice(voice);
    if params.answers_theme && placed.pitch().is_some() && (flags.theme_index as usize) < theme.notes.len() {
        flags.theme_index += 1;
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attempt::{AttemptParameters, VoiceParameters};
    use crate::generator::{GeneratorConfig, VoiceSpec};
    use crate::mode::{Mode, VocalRange};
    use crate::pipeline::Pipeline;
    use crate::pitch::{Pitch, RhythmicValue};
    use crate::timeline::{BeatGrid, Timeline};
    use jeppesen_prng::SeededRng;

    fn no_draw(_: &GeneratorConfig, _: &mut SeededRng) -> Option<AttemptParameters> {
        None
    }

    fn config() -> GeneratorConfig {
        GeneratorConfig::new(
            "test",
            Mode::Ionian,
            BeatGrid::closing(6, &[0, 4]),
            vec![VoiceSpec::free(VocalRange::Tenor)],
            Pipeline::base(),
            no_draw,
        )
    }

    fn params(lowest_by: usize, highest_by: usize) -> AttemptParameters {
        let low = Pitch::natural(1, 3);
        let high = Pitch::natural(1, 4);
        let mut voice = VoiceParameters::new(VocalRange::Tenor, low, high, vec![low, high]);
        voice.lowest_must_appear_by = lowest_by;
        voice.highest_must_appear_by = highest_by;
        AttemptParameters { voices: vec![voice] }
    }

    #[test]
    fn test_deadline_blocks_at_its_bar() {
        let config = config();
        let timelines = vec![Timeline::new(config.grid.clone())];
        let params = params(3, 4);
        let ctx = Context {
            config: &config,
            timelines: &timelines,
            params: &params,
        };
        assert!(extremes_by_deadline(&ctx, 0, Position::new(2, 4)));
        assert!(!extremes_by_deadline(&ctx, 0, Position::downbeat(3)));
    }

    #[test]
    fn test_track_extremes_sets_flags() {
        let config = config();
        let mut timeline = Timeline::new(config.grid.clone());
        let placed = timeline.place(Position::downbeat(0), RhythmicValue::note(Pitch::natural(1, 4), 4));
        let timelines = vec![timeline];
        let params = params(3, 4);
        let ctx = Context {
            config: &config,
            timelines: &timelines,
            params: &params,
        };
        let flags = track_extremes(&ctx, 0, &placed, VoiceFlags::default());
        assert!(flags.highest_placed);
        assert!(!flags.lowest_placed);
    }

    #[test]
    fn test_octave_leaps_counted() {
        let config = config();
        let mut timeline = Timeline::new(config.grid.clone());
        timeline.place(Position::downbeat(0), RhythmicValue::note(Pitch::natural(1, 3), 4));
        let placed = timeline.place(Position::new(0, 4), RhythmicValue::note(Pitch::natural(1, 4), 4));
        let timelines = vec![timeline];
        let params = params(3, 4);
        let ctx = Context {
            config: &config,
            timelines: &timelines,
            params: &params,
        };
        let flags = count_octave_leaps(&ctx, 0, &placed, VoiceFlags::default());
        assert_eq!(flags.octave_leaps, 1);
    }
}
