// Melodic insertion checks: a voice against its own past.
//
// Every function here has the `PitchCheck` shape and looks only at the
// voice being filled. "Previous note" means the entity directly before the
// position; a rest breaks melodic continuity, so most checks pass
// trivially after one. Checks that reason about melodic shape (segments,
// leap chains, repetitions) read the placed notes with rests skipped.

use crate::pipeline::Context;
use crate::pitch::Pitch;
use crate::timeline::{BEAT_1, BEAT_1_AND, BEAT_2, BEAT_3, Position};

/// The move from the previous note is in the adjacent-interval tables and is
/// not an augmented or diminished spelling.
pub fn valid_melodic_interval(
    ctx: &Context,
    voice: usize,
    _position: Position,
    pitch: Pitch,
) -> bool {
    match ctx.previous_note(voice) {
        Some(prev) => ctx.legal().is_valid_adjacent(prev, pitch),
        None => true,
    }
}

/// The highest pitch of the ambitus sounds only once.
pub fn prevent_highest_duplicates(
    ctx: &Context,
    voice: usize,
    _position: Position,
    pitch: Pitch,
) -> bool {
    let params = ctx.voice(voice);
    !(params.flags.highest_placed && pitch == params.highest)
}

/// First note on the final, last note equal to the first.
pub fn begin_and_end_on_mode_final(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
) -> bool {
    if ctx.is_first_note(voice) {
        return ctx.resolver().is_final(pitch);
    }
    if ctx.is_final_position(position) {
        return ctx.timeline(voice).pitches().first() == Some(&pitch);
    }
    true
}

/// A degree keeps one spelling for the whole line (no B and Bb together).
pub fn no_mixed_spellings(ctx: &Context, voice: usize, _position: Position, pitch: Pitch) -> bool {
    !ctx.timeline(voice)
        .entities()
        .iter()
        .filter_map(|p| p.pitch())
        .any(|p| p.degree == pitch.degree && p.accidental != pitch.accidental)
}

/// Direction of motion, with repeated notes counted as none.
fn direction(from: Pitch, to: Pitch) -> i32 {
    match from.tonal_interval(to) {
        -1 | 1 => 0,
        t => t.signum(),
    }
}

/// Start of the run of same-direction motion ending at the last note.
/// Needs at least two notes.
fn segment_start(notes: &[Pitch]) -> usize {
    let last = notes.len() - 1;
    let dir = direction(notes[last - 1], notes[last]);
    let mut start = last - 1;
    while start > 0 && direction(notes[start - 1], notes[start]) == dir {
        start -= 1;
    }
    start
}

/// A run of three or more notes in one direction must outline a legal
/// melodic interval (no tritone or seventh across a scale run). Checked when
/// the run ends, either by a change of direction or at the final note.
pub fn segments_outline_consonances(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
) -> bool {
    let legal = ctx.legal();
    let mut notes = ctx.timeline(voice).pitches();
    notes.push(pitch);
    let n = notes.len();
    if n < 3 {
        return true;
    }

    let closing = direction(notes[n - 3], notes[n - 2]);
    if closing != 0 && direction(notes[n - 2], notes[n - 1]) != closing {
        let start = segment_start(&notes[..n - 1]);
        if n - 2 - start >= 2 && !legal.is_valid_outline(notes[start], notes[n - 2]) {
            return false;
        }
    }

    if ctx.is_final_position(position) && direction(notes[n - 2], notes[n - 1]) != 0 {
        let start = segment_start(&notes);
        if n - 1 - start >= 2 && !legal.is_valid_outline(notes[start], notes[n - 1]) {
            return false;
        }
    }
    true
}

/// Consecutive leaps must outline legal intervals from every earlier note of
/// the chain to the new one.
pub fn leap_chains_outline_consonances(
    ctx: &Context,
    voice: usize,
    _position: Position,
    pitch: Pitch,
) -> bool {
    let mut notes = ctx.timeline(voice).pitches();
    notes.push(pitch);
    let n = notes.len();
    if n < 3 || notes[n - 2].tonal_interval(pitch).abs() <= 2 {
        return true;
    }
    let mut start = n - 2;
    while start > 0 && notes[start - 1].tonal_interval(notes[start]).abs() > 2 {
        start -= 1;
    }
    notes[start..n - 2]
        .iter()
        .all(|&from| ctx.legal().is_valid_outline(from, pitch))
}

/// Within a run in one direction, intervals never grow (large intervals
/// first, then steps).
pub fn intervals_shrink_within_segment(
    ctx: &Context,
    voice: usize,
    _position: Position,
    pitch: Pitch,
) -> bool {
    let recent = ctx.timeline(voice).recent_pitches(2);
    let [a, b] = recent[..] else {
        return true;
    };
    let before = a.tonal_interval(b);
    let now = b.tonal_interval(pitch);
    if before.abs() <= 1 || now.abs() <= 1 || before.signum() != now.signum() {
        return true;
    }
    now.abs() <= before.abs()
}

/// An ascending minor sixth turns back down by a half step.
pub fn ascending_minor_sixth_turns_down(
    ctx: &Context,
    voice: usize,
    _position: Position,
    pitch: Pitch,
) -> bool {
    let recent = ctx.timeline(voice).recent_pitches(2);
    let [a, b] = recent[..] else {
        return true;
    };
    a.chromatic_interval(b) != 8 || b.chromatic_interval(pitch) == -1
}

/// No immediate back-and-forth between two notes (A B A B).
pub fn no_immediate_two_note_repetition(
    ctx: &Context,
    voice: usize,
    _position: Position,
    pitch: Pitch,
) -> bool {
    let recent = ctx.timeline(voice).recent_pitches(3);
    let [x, y, z] = recent[..] else {
        return true;
    };
    !(x == z && y == pitch)
}

/// The last interval is a step (a descending one when the voice requires it).
pub fn ends_by_step(ctx: &Context, voice: usize, position: Position, pitch: Pitch) -> bool {
    if !ctx.is_final_position(position) {
        return true;
    }
    let Some(prev) = ctx.previous_note(voice) else {
        return true;
    };
    let interval = prev.tonal_interval(pitch);
    if ctx.voice(voice).end_by_descending_step {
        interval == -2
    } else {
        interval.abs() == 2
    }
}

/// No cross relation between a note and the one two notes earlier.
pub fn no_cross_relation_one_note_apart(
    ctx: &Context,
    voice: usize,
    _position: Position,
    pitch: Pitch,
) -> bool {
    let recent = ctx.timeline(voice).recent_pitches(2);
    match recent[..] {
        [earlier, _] => !earlier.is_cross_relation(pitch),
        _ => true,
    }
}

/// A sharpened note rises by step.
pub fn sharps_resolve_upward(
    ctx: &Context,
    voice: usize,
    _position: Position,
    pitch: Pitch,
) -> bool {
    match ctx.previous_note(voice) {
        Some(prev) if prev.is_sharp() => prev.tonal_interval(pitch) == 2,
        _ => true,
    }
}

/// Two leaps in one direction stay small and span no more than a sixth.
pub fn consecutive_leaps_stay_small(
    ctx: &Context,
    voice: usize,
    _position: Position,
    pitch: Pitch,
) -> bool {
    let recent = ctx.timeline(voice).recent_pitches(2);
    let [a, b] = recent[..] else {
        return true;
    };
    let before = a.tonal_interval(b);
    let now = b.tonal_interval(pitch);
    if before.abs() <= 2 || now.abs() <= 2 || before.signum() != now.signum() {
        return true;
    }
    before.abs() <= 4 && now.abs() <= 4 && before.abs() + now.abs() - 1 <= 6
}

/// A leap larger than a fourth is followed by motion the other way.
pub fn large_leaps_turn_back(
    ctx: &Context,
    voice: usize,
    _position: Position,
    pitch: Pitch,
) -> bool {
    let recent = ctx.timeline(voice).recent_pitches(2);
    let [a, b] = recent[..] else {
        return true;
    };
    let before = a.tonal_interval(b);
    let now = b.tonal_interval(pitch);
    before.abs() <= 4 || now.abs() <= 1 || now.signum() != before.signum()
}

/// No ascending leap from an accented quarter, and none onto one from a
/// weak quarter.
pub fn no_ascending_leap_around_accented_quarters(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
) -> bool {
    let Some(prev) = ctx.previous(voice) else {
        return true;
    };
    let Some(prev_pitch) = prev.pitch() else {
        return true;
    };
    if prev_pitch.tonal_interval(pitch) <= 2 || prev.duration() != 2 {
        return true;
    }
    let from_accented = matches!(prev.position.offset, 0 | BEAT_2);
    let onto_accented = matches!(prev.position.offset, BEAT_1 | BEAT_3) && matches!(position.offset, 0 | BEAT_2);
    !(from_accented || onto_accented)
}

/// Eighth notes move by step, in and out.
pub fn eighths_move_by_step(ctx: &Context, voice: usize, position: Position, pitch: Pitch) -> bool {
    let Some(prev) = ctx.previous(voice) else {
        return true;
    };
    let Some(prev_pitch) = prev.pitch() else {
        return true;
    };
    let second_eighth = position.offset == BEAT_1_AND;
    let after_eighths = prev.duration() == 1 && prev.position.offset == BEAT_1_AND;
    !(second_eighth || after_eighths) || prev_pitch.tonal_interval(pitch).abs() == 2
}

/// Melodic octaves stay within the attempt's quota.
pub fn octave_leaps_within_quota(
    ctx: &Context,
    voice: usize,
    _position: Position,
    pitch: Pitch,
) -> bool {
    let params = ctx.voice(voice);
    match ctx.previous_note(voice) {
        Some(prev) if prev.tonal_interval(pitch).abs() == 8 => {
            params.flags.octave_leaps < params.quotas.max_octave_leaps
        }
        _ => true,
    }
}

/// The final is reached from the leading tone below it.
pub fn final_from_leading_tone(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
) -> bool {
    if !ctx.is_final_position(position) {
        return true;
    }
    let resolver = ctx.resolver();
    resolver.is_final(pitch) && ctx.previous_note(voice) == Some(resolver.leading_tone_below(pitch))
}

/// The final is reached by step: from above freely, from below only from
/// the leading tone.
pub fn final_from_step(ctx: &Context, voice: usize, position: Position, pitch: Pitch) -> bool {
    if !ctx.is_final_position(position) {
        return true;
    }
    let resolver = ctx.resolver();
    let Some(prev) = ctx.previous_note(voice) else {
        return false;
    };
    if !resolver.is_final(pitch) {
        return false;
    }
    match prev.tonal_interval(pitch) {
        2 => prev == resolver.leading_tone_below(pitch),
        -2 => true,
        _ => false,
    }
}

/// Wherever a voice rises a step onto the final at the close, it does so
/// from the leading tone.
pub fn rising_step_into_final_is_raised(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
) -> bool {
    if !ctx.is_final_position(position) || pitch.degree != ctx.resolver().final_degree() {
        return true;
    }
    match ctx.previous_note(voice) {
        Some(prev) if prev.tonal_interval(pitch) == 2 => prev == ctx.resolver().leading_tone_below(pitch),
        _ => true,
    }
}

/// A theme opens on the first note of its hexachord outline.
pub fn theme_opens_on_outline(
    ctx: &Context,
    voice: usize,
    _position: Position,
    pitch: Pitch,
) -> bool {
    match ctx.voice(voice).outline {
        Some([first, _]) if ctx.is_first_note(voice) => pitch == first,
        _ => true,
    }
}

/// Leaps start or land on an outline degree.
pub fn leaps_touch_outline(ctx: &Context, voice: usize, _position: Position, pitch: Pitch) -> bool {
    let Some([a, b]) = ctx.voice(voice).outline else {
        return true;
    };
    let Some(prev) = ctx.previous_note(voice) else {
        return true;
    };
    if prev.tonal_interval(pitch).abs() <= 2 {
        return true;
    }
    let outline = [a.degree, b.degree];
    outline.contains(&prev.degree) || outline.contains(&pitch.degree)
}

/// The pitch an answering voice opens with: the theme's first note moved by
/// the answer interval of the hexachord the theme voice carries this attempt.
pub fn answer_pitch(ctx: &Context, theme_first: Pitch) -> Option<Pitch> {
    let hexachord = (0..ctx.voice_count())
        .map(|v| ctx.voice(v))
        .find(|params| !params.answers_theme)
        .and_then(|params| params.hexachord)?;
    Some(ctx.resolver().default_pitch_from_interval(theme_first, hexachord.answer_interval()))
}

/// An answering voice enters after a rest and reproduces the theme's tonal
/// intervals, note by note, until the theme is exhausted.
pub fn answers_theme(ctx: &Context, voice: usize, _position: Position, pitch: Pitch) -> bool {
    let params = ctx.voice(voice);
    let Some(theme) = &ctx.config.theme else {
        return true;
    };
    if !params.answers_theme {
        return true;
    }
    let notes = theme.pitches();
    let index = params.flags.theme_index as usize;
    if index >= notes.len() {
        return true;
    }
    if index == 0 {
        return !ctx.timeline(voice).entities().is_empty() && answer_pitch(ctx, notes[0]) == Some(pitch);
    }
    match ctx.previous_note(voice) {
        Some(prev) => prev.tonal_interval(pitch) == notes[index - 1].tonal_interval(notes[index]),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attempt::{AttemptParameters, VoiceParameters};
    use crate::generator::{GeneratorConfig, VoiceSpec};
    use crate::intervals::LegalIntervals;
    use crate::mode::{Mode, VocalRange};
    use crate::pipeline::Pipeline;
    use crate::pitch::{Accidental, RhythmicValue};
    use crate::timeline::{BeatGrid, Timeline};
    use jeppesen_prng::SeededRng;

    fn no_draw(_: &GeneratorConfig, _: &mut SeededRng) -> Option<AttemptParameters> {
        None
    }

    fn n(degree: u8, octave: i8) -> Pitch {
        Pitch::natural(degree, octave)
    }

    /// A whole-note line in one voice plus the config and parameters to
    /// build a context over it.
    struct Fixture {
        config: GeneratorConfig,
        timelines: Vec<Timeline>,
        params: AttemptParameters,
    }

    impl Fixture {
        fn new(mode: Mode, bars: usize, line: &[Pitch]) -> Self {
            let mut config = GeneratorConfig::new(
                "test",
                mode,
                BeatGrid::closing(bars, &[0]),
                vec![VoiceSpec::free(VocalRange::Tenor)],
                Pipeline::base(),
                no_draw,
            );
            config.legal = LegalIntervals::cantus_firmus();
            let mut timeline = Timeline::new(config.grid.clone());
            for &pitch in line {
                let Some(position) = timeline.next_open() else {
                    panic!("line longer than the grid");
                };
                timeline.place(position, RhythmicValue::note(pitch, 8));
            }
            let params = AttemptParameters {
                voices: vec![VoiceParameters::new(VocalRange::Tenor, n(1, 3), n(1, 4), Vec::new())],
            };
            Fixture {
                config,
                timelines: vec![timeline],
                params,
            }
        }

        fn ctx(&self) -> Context<'_> {
            Context {
                config: &self.config,
                timelines: &self.timelines,
                params: &self.params,
            }
        }

        fn next(&self) -> Position {
            self.timelines[0].next_open().unwrap()
        }
    }

    #[test]
    fn test_begin_and_end_on_final() {
        let f = Fixture::new(Mode::Dorian, 4, &[]);
        let ctx = f.ctx();
        assert!(begin_and_end_on_mode_final(&ctx, 0, f.next(), n(2, 4)));
        assert!(!begin_and_end_on_mode_final(&ctx, 0, f.next(), n(1, 4)));

        let f = Fixture::new(Mode::Dorian, 4, &[n(2, 4), n(4, 4), n(3, 4)]);
        let ctx = f.ctx();
        assert!(begin_and_end_on_mode_final(&ctx, 0, f.next(), n(2, 4)));
        assert!(!begin_and_end_on_mode_final(&ctx, 0, f.next(), n(2, 3)));
    }

    #[test]
    fn test_tritone_scale_run_rejected() {
        // F G A B then down: the run outlines an augmented fourth.
        let f = Fixture::new(Mode::Ionian, 8, &[n(4, 3), n(5, 3), n(6, 3), n(7, 3)]);
        assert!(!segments_outline_consonances(&f.ctx(), 0, f.next(), n(6, 3)));
        // C D E F then down: a perfect fourth.
        let f = Fixture::new(Mode::Ionian, 8, &[n(1, 4), n(2, 4), n(3, 4), n(4, 4)]);
        assert!(segments_outline_consonances(&f.ctx(), 0, f.next(), n(3, 4)));
    }

    #[test]
    fn test_leap_chain_outline() {
        // C up to G up to C: fifth then fourth outline an octave.
        let f = Fixture::new(Mode::Ionian, 8, &[n(1, 3), n(5, 3)]);
        assert!(leap_chains_outline_consonances(&f.ctx(), 0, f.next(), n(1, 4)));
        // B up to E up to A: the chain spans a seventh.
        let f = Fixture::new(Mode::Ionian, 8, &[n(7, 2), n(3, 3)]);
        assert!(!leap_chains_outline_consonances(&f.ctx(), 0, f.next(), n(6, 3)));
    }

    #[test]
    fn test_intervals_shrink() {
        let f = Fixture::new(Mode::Ionian, 8, &[n(1, 4), n(2, 4)]);
        assert!(!intervals_shrink_within_segment(&f.ctx(), 0, f.next(), n(5, 4)));
        assert!(intervals_shrink_within_segment(&f.ctx(), 0, f.next(), n(3, 4)));
        assert!(intervals_shrink_within_segment(&f.ctx(), 0, f.next(), n(7, 3)));
    }

    #[test]
    fn test_minor_sixth_must_fall_by_half_step() {
        let f = Fixture::new(Mode::Ionian, 8, &[n(3, 3), n(1, 4)]);
        assert!(ascending_minor_sixth_turns_down(&f.ctx(), 0, f.next(), n(7, 3)));
        assert!(!ascending_minor_sixth_turns_down(&f.ctx(), 0, f.next(), n(6, 3)));
    }

    #[test]
    fn test_two_note_repetition() {
        let f = Fixture::new(Mode::Ionian, 8, &[n(1, 4), n(2, 4), n(1, 4)]);
        assert!(!no_immediate_two_note_repetition(&f.ctx(), 0, f.next(), n(2, 4)));
        assert!(no_immediate_two_note_repetition(&f.ctx(), 0, f.next(), n(7, 3)));
    }

    #[test]
    fn test_mixed_spellings() {
        let b_flat = Pitch::new(7, 3, Accidental::Flat);
        let f = Fixture::new(Mode::Dorian, 8, &[n(2, 3), b_flat]);
        assert!(!no_mixed_spellings(&f.ctx(), 0, f.next(), n(7, 3)));
        assert!(no_mixed_spellings(&f.ctx(), 0, f.next(), Pitch::new(7, 2, Accidental::Flat)));
    }

    #[test]
    fn test_ends_by_descending_step() {
        let mut f = Fixture::new(Mode::Ionian, 4, &[n(1, 4), n(3, 4), n(2, 4)]);
        assert!(ends_by_step(&f.ctx(), 0, f.next(), n(1, 4)));
        assert!(ends_by_step(&f.ctx(), 0, f.next(), n(3, 4)));
        f.params.voices[0].end_by_descending_step = true;
        assert!(!ends_by_step(&f.ctx(), 0, f.next(), n(3, 4)));
    }

    #[test]
    fn test_sharps_resolve_upward() {
        let c_sharp = Pitch::new(1, 4, Accidental::Sharp);
        let f = Fixture::new(Mode::Dorian, 8, &[n(2, 4), c_sharp]);
        assert!(sharps_resolve_upward(&f.ctx(), 0, f.next(), n(2, 4)));
        assert!(!sharps_resolve_upward(&f.ctx(), 0, f.next(), n(7, 3)));
    }

    #[test]
    fn test_final_from_leading_tone() {
        let c_sharp = Pitch::new(1, 4, Accidental::Sharp);
        let f = Fixture::new(Mode::Dorian, 3, &[n(2, 4), c_sharp]);
        assert!(final_from_leading_tone(&f.ctx(), 0, f.next(), n(2, 4)));
        let f = Fixture::new(Mode::Dorian, 3, &[n(2, 4), n(1, 4)]);
        assert!(!final_from_leading_tone(&f.ctx(), 0, f.next(), n(2, 4)));
        assert!(!final_from_step(&f.ctx(), 0, f.next(), n(2, 4)));
        let f = Fixture::new(Mode::Dorian, 3, &[n(2, 4), n(3, 4)]);
        assert!(final_from_step(&f.ctx(), 0, f.next(), n(2, 4)));
    }
}
