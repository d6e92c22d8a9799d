// Harmonic insertion checks: a candidate pitch against the other voices.
//
// "Sounding" voices are those with a note under the position being filled,
// whether it starts there or was struck earlier. "Onsets" are only voices
// whose note starts exactly there; motion-based rules (hidden perfects,
// Landini figures, parallel leaps) need both voices to move. Voices that
// have not reached the position yet are simply absent; their own checks
// compare against this voice once they get there.

use crate::intervals::is_perfect;
use crate::pipeline::Context;
use crate::pitch::{Accidental, Pitch};
use crate::timeline::{BEAT_1, BEAT_2, BEAT_3, Placed, Position};

/// Resolution shapes `(approach, departure)` around a dissonant weak
/// quarter, as tonal intervals.
const THIRD_SPECIES_RESOLUTIONS: [(i32, i32); 4] = [(2, 2), (-2, -2), (-2, 2), (-2, -3)];

/// Florid writing also allows the upper neighbour.
const FLORID_RESOLUTIONS: [(i32, i32); 5] = [(2, 2), (-2, -2), (-2, 2), (-2, -3), (2, -2)];

fn consonant_with_all(ctx: &Context, voice: usize, position: Position, pitch: Pitch) -> bool {
    let legal = ctx.legal();
    ctx.sounding_with(voice, position)
        .iter()
        .all(|&(_, other)| legal.is_consonant(other, pitch))
}

/// Whether a placed note was dissonant against what sounded at its onset.
fn was_dissonant(ctx: &Context, voice: usize, placed: &Placed) -> bool {
    match placed.pitch() {
        Some(pitch) => !consonant_with_all(ctx, voice, placed.position, pitch),
        None => false,
    }
}

/// Consonant with every sounding voice.
pub fn consonant_with_sounding(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
) -> bool {
    consonant_with_all(ctx, voice, position, pitch)
}

/// Notes struck on a downbeat are consonant.
pub fn downbeat_onsets_consonant(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
) -> bool {
    !position.is_downbeat() || consonant_with_all(ctx, voice, position, pitch)
}

/// Notes struck on either half of the bar are consonant.
pub fn strong_beats_consonant(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
) -> bool {
    !matches!(position.offset, 0 | BEAT_2) || consonant_with_all(ctx, voice, position, pitch)
}

/// A dissonant half note on the weak beat is a passing tone: approached by
/// step.
pub fn weak_half_passes_by_step(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
) -> bool {
    if position.offset != BEAT_2 || consonant_with_all(ctx, voice, position, pitch) {
        return true;
    }
    matches!(ctx.previous_note(voice), Some(prev) if prev.tonal_interval(pitch).abs() == 2)
}

/// A passing tone on the weak half continues in the direction it came from.
pub fn passing_tones_continue(
    ctx: &Context,
    voice: usize,
    _position: Position,
    pitch: Pitch,
) -> bool {
    let entities = ctx.timeline(voice).entities();
    let [.., a, b] = entities else {
        return true;
    };
    if b.position.offset != BEAT_2 || !was_dissonant(ctx, voice, b) {
        return true;
    }
    match (a.pitch(), b.pitch()) {
        (Some(a), Some(b)) => a.tonal_interval(b) == b.tonal_interval(pitch),
        _ => true,
    }
}

/// A dissonant weak quarter is approached by step.
pub fn weak_quarters_approached_by_step(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
) -> bool {
    if !matches!(position.offset, BEAT_1 | BEAT_3) || consonant_with_all(ctx, voice, position, pitch) {
        return true;
    }
    matches!(ctx.previous_note(voice), Some(prev) if prev.tonal_interval(pitch).abs() == 2)
}

fn weak_quarter_resolves(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
    shapes: &[(i32, i32)],
) -> bool {
    if !matches!(position.offset, 0 | BEAT_2) {
        return true;
    }
    let entities = ctx.timeline(voice).entities();
    let [.., a, b] = entities else {
        return true;
    };
    if b.duration() != 2 || !matches!(b.position.offset, BEAT_1 | BEAT_3) || !was_dissonant(ctx, voice, b) {
        return true;
    }
    match (a.pitch(), b.pitch()) {
        (Some(a), Some(b)) => shapes.contains(&(a.tonal_interval(b), b.tonal_interval(pitch))),
        _ => true,
    }
}

/// A dissonant weak quarter leaves by a passing, neighbour or cambiata
/// shape.
pub fn third_species_dissonance_resolves(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
) -> bool {
    weak_quarter_resolves(ctx, voice, position, pitch, &THIRD_SPECIES_RESOLUTIONS)
}

/// As `third_species_dissonance_resolves`, with upper neighbours allowed.
pub fn florid_dissonance_resolves(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
) -> bool {
    weak_quarter_resolves(ctx, voice, position, pitch, &FLORID_RESOLUTIONS)
}

/// After a cambiata's third down from the dissonance, the line rises by step.
pub fn cambiata_rises(ctx: &Context, voice: usize, _position: Position, pitch: Pitch) -> bool {
    let entities = ctx.timeline(voice).entities();
    let [.., d, r] = entities else {
        return true;
    };
    let (Some(dp), Some(rp)) = (d.pitch(), r.pitch()) else {
        return true;
    };
    if dp.tonal_interval(rp) != -3 || d.duration() != 2 || !matches!(d.position.offset, BEAT_1 | BEAT_3) {
        return true;
    }
    !was_dissonant(ctx, voice, d) || rp.tonal_interval(pitch) == 2
}

/// No parallel (or contrary) motion between two perfect intervals of the
/// same kind when both voices move.
pub fn no_parallel_perfects(ctx: &Context, voice: usize, position: Position, pitch: Pitch) -> bool {
    let Some(last) = ctx.previous(voice) else {
        return true;
    };
    let Some(prev) = last.pitch() else {
        return true;
    };
    if prev == pitch {
        return true;
    }
    for other in ctx.others(voice) {
        let (Some(other_prev), Some(other_now)) =
            (ctx.pitch_at(other, last.position), ctx.pitch_at(other, position))
        else {
            continue;
        };
        if other_prev == other_now {
            continue;
        }
        let before = other_prev.chromatic_interval(prev);
        let after = other_now.chromatic_interval(pitch);
        if is_perfect(before) && before.abs() % 12 == after.abs() % 12 {
            return false;
        }
    }
    true
}

fn approaches_perfect_similarly(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
    other: usize,
    other_now: Pitch,
) -> bool {
    if !is_perfect(other_now.chromatic_interval(pitch)) {
        return false;
    }
    let (Some(prev), Some(other_prev)) = (ctx.pitch_before(voice, position), ctx.pitch_before(other, position))
    else {
        return false;
    };
    let mine = prev.tonal_interval(pitch);
    let theirs = other_prev.tonal_interval(other_now);
    mine.abs() > 1 && theirs.abs() > 1 && mine.signum() == theirs.signum()
}

/// No perfect interval reached by similar motion.
pub fn no_hidden_perfects(ctx: &Context, voice: usize, position: Position, pitch: Pitch) -> bool {
    ctx.onsets_with(voice, position)
        .into_iter()
        .all(|(other, other_now)| !approaches_perfect_similarly(ctx, voice, position, pitch, other, other_now))
}

/// Hidden perfects, checked between the outer voices only.
pub fn no_hidden_perfects_between_outer_voices(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
) -> bool {
    let top = ctx.voice_count() - 1;
    let other = match voice {
        0 => top,
        v if v == top => 0,
        _ => return true,
    };
    match ctx.onset_at(other, position) {
        Some(other_now) => !approaches_perfect_similarly(ctx, voice, position, pitch, other, other_now),
        None => true,
    }
}

/// No unisons on downbeats except in the first and last bar.
pub fn no_interior_downbeat_unisons(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
) -> bool {
    if !position.is_downbeat() || position.bar == 0 || ctx.is_final_position(position) {
        return true;
    }
    ctx.sounding_with(voice, position)
        .iter()
        .all(|&(_, other)| other != pitch)
}

/// Above the sounding voice a perfect octave, fifth or unison; below it an
/// octave or unison only.
fn perfect_against_sounding(ctx: &Context, voice: usize, position: Position, pitch: Pitch) -> bool {
    ctx.sounding_with(voice, position).iter().all(|&(_, other)| {
        let interval = other.chromatic_interval(pitch);
        match interval {
            i if i > 0 => matches!(i % 12, 0 | 7),
            i if i < 0 => i.rem_euclid(12) == 0,
            _ => true,
        }
    })
}

/// First note and final note form perfect consonances.
pub fn perfect_start_and_end(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
) -> bool {
    if !ctx.is_first_note(voice) && !ctx.is_final_position(position) {
        return true;
    }
    perfect_against_sounding(ctx, voice, position, pitch)
}

pub fn perfect_ending(ctx: &Context, voice: usize, position: Position, pitch: Pitch) -> bool {
    !ctx.is_final_position(position) || perfect_against_sounding(ctx, voice, position, pitch)
}

/// A florid line enters on a natural unison, fifth or octave above, or an
/// octave below. Without another voice sounding it enters on the final.
pub fn florid_opening(ctx: &Context, voice: usize, position: Position, pitch: Pitch) -> bool {
    if !ctx.is_first_note(voice) {
        return true;
    }
    if pitch.accidental != Accidental::Natural {
        return false;
    }
    let sounding = ctx.sounding_with(voice, position);
    if sounding.is_empty() {
        return ctx.resolver().is_final(pitch);
    }
    let legal = ctx.legal();
    sounding.iter().all(|&(_, other)| {
        let (tonal, chromatic) = other.intervals(pitch);
        matches!(tonal, -8 | 1 | 5 | 8) && is_perfect(chromatic) && !legal.is_forbidden(tonal, chromatic)
    })
}

/// No more than four downbeats in a row with the same vertical interval.
pub fn limited_repeated_intervals(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
) -> bool {
    if !position.is_downbeat() || position.bar < 4 {
        return true;
    }
    ctx.sounding_with(voice, position).iter().all(|&(other, other_now)| {
        let now = other_now.tonal_interval(pitch).abs();
        !(1..=4).all(|back| {
            let earlier = Position::downbeat(position.bar - back);
            match (ctx.pitch_at(voice, earlier), ctx.pitch_at(other, earlier)) {
                (Some(a), Some(b)) => b.tonal_interval(a).abs() == now,
                _ => false,
            }
        })
    })
}

fn neighbours_within(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
    span: i32,
) -> bool {
    let below = voice.checked_sub(1);
    let above = (voice + 1 < ctx.voice_count()).then_some(voice + 1);
    below.into_iter().chain(above).all(|other| match ctx.pitch_at(other, position) {
        Some(p) => p.tonal_interval(pitch).abs() <= span,
        None => true,
    })
}

/// Adjacent voices stay within a tenth.
pub fn adjacent_voices_within_tenth(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
) -> bool {
    neighbours_within(ctx, voice, position, pitch, 10)
}

/// Adjacent voices stay within a twelfth.
pub fn adjacent_voices_within_twelfth(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
) -> bool {
    neighbours_within(ctx, voice, position, pitch, 12)
}

/// Adjacent upper voices stay within an octave; the bass may lie further
/// below.
pub fn adjacent_upper_voices_within_octave(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
) -> bool {
    if voice == 0 {
        return true;
    }
    let below = (voice > 1).then(|| voice - 1);
    let above = (voice + 1 < ctx.voice_count()).then_some(voice + 1);
    below.into_iter().chain(above).all(|other| match ctx.pitch_at(other, position) {
        Some(p) => p.chromatic_interval(pitch).abs() <= 12,
        None => true,
    })
}

/// A sharpened note or a leading tone is never doubled.
pub fn sharps_not_doubled(ctx: &Context, voice: usize, position: Position, pitch: Pitch) -> bool {
    if !pitch.is_sharp() && !ctx.resolver().is_leading_tone(pitch) {
        return true;
    }
    ctx.sounding_with(voice, position)
        .iter()
        .all(|&(_, other)| other.chromatic_interval(pitch).rem_euclid(12) != 0)
}

/// No cross relation between a voice's previous note and the other voice's
/// current one, either way round.
pub fn no_diagonal_cross_relations(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
) -> bool {
    let prev = ctx.pitch_before(voice, position);
    ctx.sounding_with(voice, position).into_iter().all(|(other, other_now)| {
        let other_prev = ctx.pitch_before(other, position);
        !other_prev.is_some_and(|p| p.is_cross_relation(pitch))
            && !prev.is_some_and(|p| p.is_cross_relation(other_now))
    })
}

/// No Landini figure into an open fifth: one voice rising a half step while
/// the other falls a whole step.
pub fn no_landini_cadence(ctx: &Context, voice: usize, position: Position, pitch: Pitch) -> bool {
    let Some(prev) = ctx.pitch_before(voice, position) else {
        return true;
    };
    let mine = prev.chromatic_interval(pitch);
    ctx.onsets_with(voice, position).into_iter().all(|(other, other_now)| {
        if other_now.chromatic_interval(pitch).abs() % 12 != 7 {
            return true;
        }
        let Some(other_prev) = ctx.pitch_before(other, position) else {
            return true;
        };
        let theirs = other_prev.chromatic_interval(other_now);
        !matches!((mine, theirs), (-2, 1) | (1, -2))
    })
}

/// Both voices leaping the same way is allowed only for thirds and fourths.
pub fn no_large_parallel_leaps(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
) -> bool {
    let Some(prev) = ctx.pitch_before(voice, position) else {
        return true;
    };
    let mine = prev.tonal_interval(pitch);
    ctx.onsets_with(voice, position).into_iter().all(|(other, other_now)| {
        let Some(other_prev) = ctx.pitch_before(other, position) else {
            return true;
        };
        let theirs = other_prev.tonal_interval(other_now);
        let same_way = (mine > 2 && theirs > 2) || (mine < -2 && theirs < -2);
        !(same_way && (mine.abs() > 4 || theirs.abs() > 4))
    })
}

/// A note tied into a bar and dissonant on its downbeat resolves down by
/// step with the next onset.
pub fn suspensions_resolve_down(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
) -> bool {
    if !matches!(position.offset, BEAT_1 | BEAT_2) {
        return true;
    }
    let bar_start = Position::downbeat(position.bar);
    let timeline = ctx.timeline(voice);
    if timeline.at(bar_start).is_some() {
        return true;
    }
    let Some(last) = timeline.last() else {
        return true;
    };
    let Some(suspended) = last.pitch() else {
        return true;
    };
    if last.position >= bar_start {
        return true;
    }
    let legal = ctx.legal();
    ctx.sounding_with(voice, bar_start).iter().all(|&(_, other)| {
        legal.is_consonant(other, suspended)
            || !legal.is_resolvable_dissonance(other, suspended)
            || suspended.tonal_interval(pitch) == -2
    })
}

/// Full-texture vertical check: the bass is consonant with everything, the
/// upper voices with the bass, and no seconds, sevenths or altered
/// intervals arise between upper voices.
pub fn multi_part_vertical(ctx: &Context, voice: usize, position: Position, pitch: Pitch) -> bool {
    let legal = ctx.legal();
    ctx.sounding_with(voice, position).iter().all(|&(other, other_pitch)| {
        if voice == 0 || other == 0 {
            return legal.is_consonant(other_pitch, pitch);
        }
        let (tonal, chromatic) = other_pitch.intervals(pitch);
        !matches!(tonal.abs() % 7, 0 | 2) && !legal.is_forbidden(tonal, chromatic)
    })
}

/// At most two voices share a pitch.
pub fn no_three_voice_unison(
    ctx: &Context,
    voice: usize,
    position: Position,
    pitch: Pitch,
) -> bool {
    ctx.sounding_with(voice, position)
        .iter()
        .filter(|&&(_, other)| other.absolute() == pitch.absolute())
        .count()
        < 2
}

/// Voices keep their order, bass lowest.
pub fn voices_do_not_cross(ctx: &Context, voice: usize, position: Position, pitch: Pitch) -> bool {
    let below_ok = voice
        .checked_sub(1)
        .and_then(|v| ctx.pitch_at(v, position))
        .is_none_or(|p| p.absolute() <= pitch.absolute());
    let above_ok = (voice + 1 < ctx.voice_count())
        .then(|| ctx.pitch_at(voice + 1, position))
        .flatten()
        .is_none_or(|p| p.absolute() >= pitch.absolute());
    below_ok && above_ok
}

/// Whether `pitch` above `bass` is a unison/octave, third or fifth of it.
fn in_triad_above(bass: Pitch, pitch: Pitch) -> bool {
    let tonal = bass.tonal_interval(pitch);
    tonal > 0 && matches!(tonal % 7, 1 | 3 | 5)
}

/// The opening chord stands on the final in the bass with octaves, thirds
/// and fifths above.
pub fn opening_chord(ctx: &Context, voice: usize, position: Position, pitch: Pitch) -> bool {
    if position != Position::downbeat(0) {
        return true;
    }
    if voice == 0 {
        return ctx.resolver().is_final(pitch)
            && ctx
                .sounding_with(voice, position)
                .iter()
                .all(|&(_, upper)| in_triad_above(pitch, upper));
    }
    ctx.pitch_at(0, position).is_none_or(|bass| in_triad_above(bass, pitch))
}

/// The closing chord stands on the final in the bass.
pub fn closing_chord(ctx: &Context, voice: usize, position: Position, pitch: Pitch) -> bool {
    if !ctx.is_final_position(position) {
        return true;
    }
    if voice == 0 {
        return ctx.resolver().is_final(pitch)
            && ctx
                .sounding_with(voice, position)
                .iter()
                .all(|&(_, upper)| in_triad_above(pitch, upper));
    }
    ctx.pitch_at(0, position).is_none_or(|bass| in_triad_above(bass, pitch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attempt::{AttemptParameters, VoiceParameters};
    use crate::generator::{GeneratorConfig, VoiceSpec};
    use crate::mode::{Mode, VocalRange};
    use crate::pipeline::Pipeline;
    use crate::pitch::RhythmicValue;
    use crate::timeline::{BeatGrid, Timeline};
    use jeppesen_prng::SeededRng;

    fn no_draw(_: &GeneratorConfig, _: &mut SeededRng) -> Option<AttemptParameters> {
        None
    }

    fn n(degree: u8, octave: i8) -> Pitch {
        Pitch::natural(degree, octave)
    }

    /// Two voices on a half-note grid: a frozen lower line and the upper
    /// line placed so far.
    struct Fixture {
        config: GeneratorConfig,
        timelines: Vec<Timeline>,
        params: AttemptParameters,
    }

    impl Fixture {
        fn new(mode: Mode, bars: usize, lower: &[RhythmicValue], upper: &[RhythmicValue]) -> Self {
            let config = GeneratorConfig::new(
                "test",
                mode,
                BeatGrid::closing(bars, &[0, 2, 4, 6]),
                vec![
                    VoiceSpec::fixed(VocalRange::Tenor, lower.to_vec()),
                    VoiceSpec::free(VocalRange::Alto),
                ],
                Pipeline::base(),
                no_draw,
            );
            let timelines = vec![
                Timeline::from_values(config.grid.clone(), lower),
                Timeline::from_values(config.grid.clone(), upper),
            ];
            let params = AttemptParameters {
                voices: vec![
                    VoiceParameters::fixed(VocalRange::Tenor, lower),
                    VoiceParameters::new(VocalRange::Alto, n(1, 4), n(1, 5), Vec::new()),
                ],
            };
            Fixture {
                config,
                timelines,
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
            self.timelines[1].next_open().unwrap()
        }
    }

    fn whole(pitches: &[Pitch]) -> Vec<RhythmicValue> {
        let mut values: Vec<RhythmicValue> = pitches.iter().map(|&p| RhythmicValue::note(p, 8)).collect();
        if let Some(last) = values.last_mut() {
            *last = last.with_duration(16);
        }
        values
    }

    fn notes(values: &[(Pitch, u8)]) -> Vec<RhythmicValue> {
        values.iter().map(|&(p, d)| RhythmicValue::note(p, d)).collect()
    }

    #[test]
    fn test_parallel_fifths_rejected() {
        let lower = whole(&[n(1, 3), n(2, 3), n(3, 3), n(1, 3)]);
        let f = Fixture::new(Mode::Ionian, 4, &lower, &notes(&[(n(5, 3), 8)]));
        assert!(!no_parallel_perfects(&f.ctx(), 1, f.next(), n(6, 3)));
        assert!(no_parallel_perfects(&f.ctx(), 1, f.next(), n(4, 3)));
    }

    #[test]
    fn test_contrary_octaves_rejected() {
        let lower = whole(&[n(1, 3), n(2, 3), n(3, 3), n(1, 3)]);
        let f = Fixture::new(Mode::Ionian, 4, &lower, &notes(&[(n(1, 4), 8)]));
        assert!(!no_parallel_perfects(&f.ctx(), 1, f.next(), n(2, 3)));
    }

    #[test]
    fn test_hidden_octave_rejected() {
        // Lower C to D, upper G leaps up to D: similar motion into an octave.
        let lower = whole(&[n(1, 3), n(2, 3), n(3, 3), n(1, 3)]);
        let f = Fixture::new(Mode::Ionian, 4, &lower, &notes(&[(n(5, 3), 8)]));
        assert!(!no_hidden_perfects(&f.ctx(), 1, f.next(), n(2, 4)));
        assert!(no_hidden_perfects(&f.ctx(), 1, f.next(), n(4, 3)));
    }

    #[test]
    fn test_perfect_start_and_end() {
        let lower = whole(&[n(1, 3), n(2, 3), n(3, 3), n(1, 3)]);
        let f = Fixture::new(Mode::Ionian, 4, &lower, &[]);
        assert!(perfect_start_and_end(&f.ctx(), 1, f.next(), n(5, 3)));
        assert!(perfect_start_and_end(&f.ctx(), 1, f.next(), n(1, 4)));
        assert!(!perfect_start_and_end(&f.ctx(), 1, f.next(), n(3, 3)));
        // Below the lower voice only octaves and unisons.
        assert!(!perfect_start_and_end(&f.ctx(), 1, f.next(), n(4, 2)));
        assert!(perfect_start_and_end(&f.ctx(), 1, f.next(), n(1, 2)));
    }

    #[test]
    fn test_weak_half_passing_tone() {
        let lower = whole(&[n(1, 3), n(2, 3), n(3, 3), n(1, 3)]);
        let f = Fixture::new(Mode::Ionian, 4, &lower, &notes(&[(n(3, 3), 4)]));
        // E to F over C: a passing fourth approached by step.
        assert!(weak_half_passes_by_step(&f.ctx(), 1, f.next(), n(4, 3)));
        // A leap to the dissonant D.
        let f = Fixture::new(Mode::Ionian, 4, &lower, &notes(&[(n(5, 3), 4)]));
        assert!(!weak_half_passes_by_step(&f.ctx(), 1, f.next(), n(2, 3)));
    }

    #[test]
    fn test_passing_tone_continues() {
        let lower = whole(&[n(1, 3), n(2, 3), n(3, 3), n(1, 3)]);
        let f = Fixture::new(Mode::Ionian, 4, &lower, &notes(&[(n(3, 3), 4), (n(4, 3), 4)]));
        assert!(passing_tones_continue(&f.ctx(), 1, f.next(), n(5, 3)));
        assert!(!passing_tones_continue(&f.ctx(), 1, f.next(), n(3, 3)));
    }

    #[test]
    fn test_cambiata_tail() {
        // Over C the dissonant D falls a third to B and must rise to C.
        let lower = whole(&[n(1, 3), n(1, 3), n(3, 3), n(1, 3)]);
        let upper = notes(&[(n(3, 3), 2), (n(2, 3), 2), (n(7, 2), 2)]);
        let f = Fixture::new(Mode::Ionian, 4, &lower, &upper);
        assert!(cambiata_rises(&f.ctx(), 1, f.next(), n(1, 3)));
        assert!(!cambiata_rises(&f.ctx(), 1, f.next(), n(6, 2)));
    }

    #[test]
    fn test_third_species_resolution_shapes() {
        let lower = whole(&[n(1, 3), n(1, 3), n(3, 3), n(1, 3)]);
        // C4 then D4 (a ninth, dissonant) on the weak quarter.
        let upper = notes(&[(n(1, 4), 2), (n(2, 4), 2)]);
        let f = Fixture::new(Mode::Ionian, 4, &lower, &upper);
        assert_eq!(f.next(), Position::new(0, BEAT_2));
        assert!(third_species_dissonance_resolves(&f.ctx(), 1, f.next(), n(3, 4)));
        // Upper neighbour: only florid writing allows it.
        assert!(!third_species_dissonance_resolves(&f.ctx(), 1, f.next(), n(1, 4)));
        assert!(florid_dissonance_resolves(&f.ctx(), 1, f.next(), n(1, 4)));
    }

    #[test]
    fn test_suspension_resolves_down() {
        // A tied over into the bar where the lower voice moves to B: a
        // seventh, resolving to G.
        let lower = whole(&[n(1, 3), n(7, 2), n(1, 3), n(1, 3)]);
        let upper = notes(&[(n(1, 4), 4), (n(6, 3), 8)]);
        let f = Fixture::new(Mode::Ionian, 4, &lower, &upper);
        assert_eq!(f.next(), Position::new(1, BEAT_2));
        assert!(suspensions_resolve_down(&f.ctx(), 1, f.next(), n(5, 3)));
        assert!(!suspensions_resolve_down(&f.ctx(), 1, f.next(), n(7, 3)));
    }

    #[test]
    fn test_sharp_not_doubled() {
        let c_sharp = Pitch::new(1, 4, Accidental::Sharp);
        let lower = whole(&[n(2, 3), c_sharp.octave_shift(-1), n(2, 3)]);
        let f = Fixture::new(Mode::Dorian, 3, &lower, &notes(&[(n(2, 4), 8)]));
        assert!(!sharps_not_doubled(&f.ctx(), 1, f.next(), c_sharp));
        assert!(sharps_not_doubled(&f.ctx(), 1, f.next(), n(3, 4)));
    }

    #[test]
    fn test_landini_figure_rejected() {
        let lower = whole(&[n(7, 2), n(1, 3), n(1, 3)]);
        let f = Fixture::new(Mode::Ionian, 3, &lower, &notes(&[(n(6, 3), 8)]));
        // Lower B up to C, upper A down to G: an open fifth.
        assert!(!no_landini_cadence(&f.ctx(), 1, f.next(), n(5, 3)));
    }
}
