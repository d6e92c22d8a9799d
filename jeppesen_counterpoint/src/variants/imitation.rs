// Imitation: a short theme, and a duet in which one voice answers it.
//
// The theme is a solo line of three to six bars on a quarter-note grid with
// no closing bar. Each attempt draws one of the hexachords the mode offers.
// The theme opens on the first note of its outline, starts slowly, touches
// the outline with every leap and must present the second outline note early.
//
// The duet runs a theme engine first and keeps the hexachord of the winning
// theme. One voice (the dux) opens with the frozen theme and carries on
// freely; the other (the comes) rests, then reproduces the theme a fifth
// away, copying its rhythm and tonal intervals note by note, and finishes as
// a free florid line. Under the hard hexachord the comes answers a fifth
// above, under the soft one a fifth below, so its first note always returns
// to the dux's opening degree by the hexachord's transposition interval.
// Both voices close on the final with a florid cadence.

use crate::attempt::{AttemptParameters, VoiceParameters, palette_between};
use crate::error::{GenerateError, Result};
use crate::generator::{AttemptBudget, Generator, GeneratorConfig, Theme, VoiceSpec};
use crate::mode::{Hexachord, Mode, ModeResolver, VocalRange};
use crate::pipeline::{DurationFilter, FinalCheck, Mutation, Pipeline, PitchCheck, ScoreFn};
use crate::pitch::{Pitch, RhythmicValue};
use crate::rules::{final_checks, harmonic, melodic, rhythmic, state};
use crate::scoring;
use crate::timeline::{BeatGrid, EIGHTHS_PER_BAR};
use crate::variants::check_length;
use crate::variants::fifth_species::FLORID_OFFSETS;
use jeppesen_prng::SeededRng;
use log::info;

/// Extend an ambitus by up to two steps at each end, in tonal intervals.
const EXTENSIONS: [i32; 3] = [1, 2, 3];

/// A theme of `bars` bars.
pub fn build_theme_config(mode: Mode, bars: usize) -> Result<GeneratorConfig> {
    check_length("theme", bars, 3..=6)?;

    let mut pipeline = Pipeline::base();
    pipeline.durations = vec![rhythmic::theme_durations];
    pipeline.rests.clear();
    pipeline.index.push(state::second_outline_by_deadline);
    pipeline.melodic.extend([
        melodic::theme_opens_on_outline as PitchCheck,
        melodic::leaps_touch_outline,
        melodic::no_ascending_leap_around_accented_quarters,
        melodic::consecutive_leaps_stay_small,
        melodic::large_leaps_turn_back,
        melodic::no_immediate_two_note_repetition,
        melodic::no_mixed_spellings,
    ]);
    pipeline.rhythmic.extend([
        rhythmic::slow_beginning as DurationFilter,
        rhythmic::no_consecutive_long_notes,
        rhythmic::no_chained_syncopations,
        rhythmic::quarter_pairs_continue,
        rhythmic::no_quarters_after_long_notes,
    ]);
    pipeline.mutations.push(state::track_second_outline);
    pipeline.finals.push(final_checks::outline_completed);
    pipeline.scores.push(scoring::theme_shape);

    let mut config = GeneratorConfig::new(
        "theme",
        mode,
        BeatGrid::open_ended(bars, &[0, 2, 4, 6]),
        vec![VoiceSpec::free(VocalRange::Tenor)],
        pipeline,
        draw_theme,
    );
    config.attempts = AttemptBudget {
        target_solutions: 10,
        max_attempts: 100,
    };
    config.search.max_solutions = 10;
    config.search.max_backtracks = 3_000;
    config.search.max_backtracks_without_solution = 3_000;
    config.search.max_backtracks_without_leaf = 2_000;
    Ok(config)
}

fn draw_theme(config: &GeneratorConfig, rng: &mut SeededRng) -> Option<AttemptParameters> {
    let resolver = &config.resolver;
    let range = config.voices[0].range;
    let hexachord = *rng.choose(config.mode.hexachords())?;
    let [first, second] = resolver.hexachord_outline(range, hexachord);
    let lowest = resolver.default_pitch_from_interval(first, *rng.choose(&[1, -2, -3])?);
    let highest = resolver.default_pitch_from_interval(second, *rng.choose(&[1, 2, 3])?);
    let (tonal, chromatic) = lowest.intervals(highest);
    if config.legal.is_forbidden(tonal, chromatic) {
        return None;
    }

    let palette = palette_between(resolver, lowest, highest)
        .into_iter()
        .filter(|p| !p.is_sharp())
        .collect();
    let bars = config.length();
    let mut voice = VoiceParameters::new(range, lowest, highest, palette);
    voice.hexachord = Some(hexachord);
    voice.outline = Some([first, second]);
    voice.second_outline_must_appear_by = (bars - 1).min(3);
    voice.lowest_must_appear_by = bars;
    voice.highest_must_appear_by = bars;
    Some(AttemptParameters {
        voices: vec![voice],
    })
}

/// Run a theme engine on a forked stream and freeze its best line together
/// with the hexachord that line was drawn with.
pub fn generate_theme(mode: Mode, bars: usize, rng: &mut SeededRng) -> Result<Theme> {
    let mut config = build_theme_config(mode, bars)?;
    config.attempts.target_solutions = 1;
    let mut generator = Generator::new(config, rng.fork());
    generator.generate();
    let mut best = generator.into_best()?;
    if best.voices.len() != 1 {
        return Err(GenerateError::InvalidConfig(format!(
            "theme engine returned {} voices",
            best.voices.len()
        )));
    }
    let hexachord = best
        .parameters
        .voices
        .first()
        .and_then(|v| v.hexachord)
        .ok_or_else(|| GenerateError::InvalidConfig("theme drawn without a hexachord".to_string()))?;
    info!("theme frozen on the {hexachord:?} hexachord with score {}", best.score);
    Ok(Theme::new(best.voices.swap_remove(0), hexachord))
}

/// Theme length, in bars, that a duet of `length` bars is built on.
pub fn duet_theme_bars(length: usize) -> usize {
    length.saturating_sub(2) / 2
}

/// Generate a theme and build a duet of `length` bars around it.
pub fn build_duet_config(mode: Mode, length: usize, rng: &mut SeededRng) -> Result<GeneratorConfig> {
    check_length("duet", length, 8..=14)?;
    let theme = generate_theme(mode, duet_theme_bars(length), rng)?;
    with_theme(mode, &theme.notes, theme.hexachord)
}

/// Build a duet on a given theme built on `hexachord`. The theme must fill
/// whole bars.
pub fn with_theme(mode: Mode, theme: &[RhythmicValue], hexachord: Hexachord) -> Result<GeneratorConfig> {
    let eighths: usize = theme.iter().map(|v| v.duration() as usize).sum();
    if eighths % EIGHTHS_PER_BAR != 0 || theme.iter().any(|v| v.is_rest()) {
        return Err(GenerateError::InvalidConfig(
            "a theme is notes only and fills whole bars".to_string(),
        ));
    }
    if !mode.hexachords().contains(&hexachord) {
        return Err(GenerateError::InvalidConfig(format!(
            "{mode} cannot answer a theme on the {hexachord:?} hexachord"
        )));
    }
    let theme_bars = eighths / EIGHTHS_PER_BAR;
    check_length("theme", theme_bars, 3..=6)?;
    let bars = 2 * theme_bars + 2;

    let mut pipeline = Pipeline::base();
    pipeline.durations = vec![rhythmic::florid_durations];
    pipeline.rests = vec![rhythmic::rests_before_entry];
    pipeline.index.push(state::theme_entry_by_deadline);
    pipeline.melodic.extend([
        melodic::answers_theme as PitchCheck,
        melodic::no_cross_relation_one_note_apart,
        melodic::sharps_resolve_upward,
        melodic::consecutive_leaps_stay_small,
        melodic::large_leaps_turn_back,
        melodic::no_ascending_leap_around_accented_quarters,
        melodic::eighths_move_by_step,
        melodic::final_from_step,
    ]);
    pipeline.harmonic.extend([
        harmonic::strong_beats_consonant as PitchCheck,
        harmonic::weak_quarters_approached_by_step,
        harmonic::florid_dissonance_resolves,
        harmonic::cambiata_rises,
        harmonic::suspensions_resolve_down,
        harmonic::no_parallel_perfects,
        harmonic::no_hidden_perfects,
        harmonic::no_interior_downbeat_unisons,
        harmonic::perfect_ending,
        harmonic::adjacent_voices_within_twelfth,
        harmonic::sharps_not_doubled,
        harmonic::no_diagonal_cross_relations,
    ]);
    pipeline.rhythmic.extend([
        rhythmic::theme_rhythm as DurationFilter,
        rhythmic::eighth_pairs,
        rhythmic::no_quarters_after_long_notes,
        rhythmic::no_chained_syncopations,
        rhythmic::penultimate_bar_cadence,
    ]);
    pipeline.harmonic_rhythmic.extend([
        rhythmic::prepares_suspensions as DurationFilter,
        rhythmic::short_weak_dissonances,
    ]);
    pipeline.mutations.extend([
        state::advance_theme_index as Mutation,
        state::count_eighth_pairs,
    ]);
    pipeline.finals.extend([
        final_checks::theme_completed as FinalCheck,
        final_checks::sharps_resolve,
    ]);
    pipeline.scores.extend([scoring::early_entry as ScoreFn, scoring::florid_style]);

    // Bottom voice first.
    let voices = if hexachord.answers_above() {
        vec![
            VoiceSpec::seeded(VocalRange::Tenor, theme.to_vec()),
            VoiceSpec::free(VocalRange::Alto),
        ]
    } else {
        vec![
            VoiceSpec::free(VocalRange::Tenor),
            VoiceSpec::seeded(VocalRange::Alto, theme.to_vec()),
        ]
    };
    let mut config = GeneratorConfig::new(
        "duet",
        mode,
        BeatGrid::closing(bars, &FLORID_OFFSETS),
        voices,
        pipeline,
        draw_duet,
    );
    config.theme = Some(Theme::new(theme.to_vec(), hexachord));
    config.search.max_solutions = 5;
    config.search.max_backtracks = 10_000;
    config.search.max_backtracks_without_solution = 8_000;
    config.search.max_backtracks_without_leaf = 5_000;
    Ok(config)
}

/// `pitch` moved out by a tonal `interval`, downward when `down`. An
/// interval of 1 leaves it where it is.
fn extend(resolver: &ModeResolver, pitch: Pitch, interval: i32, down: bool) -> Pitch {
    let interval = if down && interval > 1 { -interval } else { interval };
    resolver.default_pitch_from_interval(pitch, interval)
}

/// A searched voice spanning `low..=high` widened by a random zero to two
/// steps at each end, or `None` if the result is unusable.
fn widened_voice(
    config: &GeneratorConfig,
    rng: &mut SeededRng,
    range: VocalRange,
    low: Pitch,
    high: Pitch,
) -> Option<VoiceParameters> {
    let resolver = &config.resolver;
    let lowest = extend(resolver, low, *rng.choose(&EXTENSIONS)?, true);
    let highest = extend(resolver, high, *rng.choose(&EXTENSIONS)?, false);
    let (tonal, chromatic) = lowest.intervals(highest);
    if config.legal.is_forbidden(tonal, chromatic) {
        return None;
    }
    let palette = palette_between(resolver, lowest, highest);
    if !palette.iter().any(|&p| resolver.is_final(p)) {
        return None;
    }
    let mut voice = VoiceParameters::new(range, lowest, highest, palette);
    let deadline = config.length() - 1;
    voice.lowest_must_appear_by = deadline;
    voice.highest_must_appear_by = deadline;
    voice.quotas.max_eighth_pairs = 1;
    Some(voice)
}

fn draw_duet(config: &GeneratorConfig, rng: &mut SeededRng) -> Option<AttemptParameters> {
    let theme = config.theme.as_ref()?;
    let notes = theme.pitches();
    let low = notes.iter().copied().min_by_key(|p| p.absolute())?;
    let high = notes.iter().copied().max_by_key(|p| p.absolute())?;
    let above = theme.hexachord.answers_above();
    let (dux_voice, comes_voice) = if above { (0, 1) } else { (1, 0) };

    let mut dux = widened_voice(config, rng, config.voices[dux_voice].range, low, high)?;
    dux.hexachord = Some(theme.hexachord);

    let resolver = &config.resolver;
    let answer = theme.hexachord.answer_interval();
    let mut comes = widened_voice(
        config,
        rng,
        config.voices[comes_voice].range,
        resolver.default_pitch_from_interval(low, answer),
        resolver.default_pitch_from_interval(high, answer),
    )?;
    comes.answers_theme = true;
    comes.hexachord = Some(theme.hexachord.other());
    comes.entry_must_appear_by = theme_bars(&theme.notes).saturating_sub(1).max(2);
    let voices = if above { vec![dux, comes] } else { vec![comes, dux] };
    Some(AttemptParameters { voices })
}

fn theme_bars(theme: &[RhythmicValue]) -> usize {
    theme.iter().map(|v| v.duration() as usize).sum::<usize>() / EIGHTHS_PER_BAR
}
