// Cantus firmus: a single line of whole notes that opens and closes on the
// mode's final.
//
// The ambitus is drawn around the final rather than anywhere in the range:
// the highest note sits a step to an octave above it, and the lowest is
// picked from a table keyed on that upper interval so the line never spans
// more than a tenth. A cantus firmus never repeats a note, so it swaps in
// the no-repetition interval tables.
//
// The species variants run this engine first and freeze its best line; see
// `generate_cantus_firmus`.

use crate::attempt::{AttemptParameters, VoiceParameters, palette_between};
use crate::error::{GenerateError, Result};
use crate::generator::{AttemptBudget, Generator, GeneratorConfig, ParameterDraw, VoiceSpec};
use crate::intervals::LegalIntervals;
use crate::mode::{Mode, VocalRange};
use crate::pipeline::{FinalCheck, Pipeline, PitchCheck};
use crate::pitch::RhythmicValue;
use crate::rules::{final_checks, melodic, rhythmic};
use crate::scoring;
use crate::timeline::BeatGrid;
use crate::variants::check_length;
use jeppesen_prng::SeededRng;
use log::info;

/// Intervals from the final to the highest note.
const HIGHEST_INTERVALS: [i32; 6] = [2, 3, 4, 5, 6, 8];

/// Intervals from the final to the lowest note, by the highest interval.
fn lowest_intervals(highest: i32) -> &'static [i32] {
    match highest {
        2 => &[-6, -5, -4],
        3 => &[-5, -4, -3],
        4 => &[-5, -4, -3, -2],
        5 => &[-4, -3, -2, 1],
        6 => &[-2, 1],
        _ => &[1],
    }
}

/// A cantus firmus of `length` whole notes. With `descending_end` the line
/// must close by falling a step onto the final.
pub fn build_cantus_firmus_config(
    mode: Mode,
    length: usize,
    descending_end: bool,
) -> Result<GeneratorConfig> {
    check_length("cantus firmus", length, 4..=16)?;

    let mut pipeline = Pipeline::base();
    pipeline.durations = vec![rhythmic::cantus_firmus_notes];
    pipeline.rests.clear();
    pipeline.melodic.extend([
        melodic::begin_and_end_on_mode_final as PitchCheck,
        melodic::no_mixed_spellings,
        melodic::segments_outline_consonances,
        melodic::leap_chains_outline_consonances,
        melodic::intervals_shrink_within_segment,
        melodic::ascending_minor_sixth_turns_down,
        melodic::no_immediate_two_note_repetition,
        melodic::ends_by_step,
    ]);
    pipeline.finals.extend([
        final_checks::ascending_leaps_filled_in as FinalCheck,
        final_checks::no_repeated_interval_sequence,
        final_checks::no_repeated_three_notes,
    ]);
    pipeline.scores.push(scoring::stepwise_motion);
    pipeline.scores.push(scoring::unanswered_ascending_leaps);

    let draw: ParameterDraw = if descending_end {
        draw_descending_cantus_firmus
    } else {
        draw_cantus_firmus
    };
    let mut config = GeneratorConfig::new(
        "cantus firmus",
        mode,
        BeatGrid::closing(length, &[0]),
        vec![VoiceSpec::free(VocalRange::Tenor)],
        pipeline,
        draw,
    );
    config.legal = LegalIntervals::cantus_firmus();
    config.attempts = AttemptBudget {
        target_solutions: 10,
        max_attempts: 100,
    };
    config.search.max_solutions = 10;
    config.search.max_backtracks = 3_000;
    config.search.max_backtracks_without_solution = 3_000;
    config.search.max_backtracks_without_leaf = 1_500;
    Ok(config)
}

fn draw_cantus_firmus(config: &GeneratorConfig, rng: &mut SeededRng) -> Option<AttemptParameters> {
    draw(config, rng, false)
}

fn draw_descending_cantus_firmus(
    config: &GeneratorConfig,
    rng: &mut SeededRng,
) -> Option<AttemptParameters> {
    draw(config, rng, true)
}

fn draw(
    config: &GeneratorConfig,
    rng: &mut SeededRng,
    descending_end: bool,
) -> Option<AttemptParameters> {
    let resolver = &config.resolver;
    let range = config.voices[0].range;
    let final_pitch = resolver.final_in_range(range);

    let up = *rng.choose(&HIGHEST_INTERVALS)?;
    let highest = resolver.default_pitch_from_interval(final_pitch, up);
    // An F on top of a Phrygian line sits a tritone over its B.
    if config.mode == Mode::Phrygian && highest.degree == 4 {
        return None;
    }
    let down = *rng.choose(lowest_intervals(up))?;
    let lowest = resolver.default_pitch_from_interval(final_pitch, down);
    let (tonal, chromatic) = lowest.intervals(highest);
    if config.legal.is_forbidden(tonal, chromatic) {
        return None;
    }

    let palette = palette_between(resolver, lowest, highest)
        .into_iter()
        .filter(|p| !p.is_sharp())
        .collect();
    let mut voice = VoiceParameters::new(range, lowest, highest, palette);
    let deadline = config.length() - 1;
    voice.lowest_must_appear_by = deadline;
    voice.highest_must_appear_by = deadline;
    voice.end_by_descending_step = descending_end;
    Some(AttemptParameters {
        voices: vec![voice],
    })
}

/// Run a cantus firmus engine to completion on a forked stream and return
/// its best line.
pub fn generate_cantus_firmus(
    mode: Mode,
    length: usize,
    descending_end: bool,
    rng: &mut SeededRng,
) -> Result<Vec<RhythmicValue>> {
    let mut config = build_cantus_firmus_config(mode, length, descending_end)?;
    config.attempts.target_solutions = 1;
    let mut generator = Generator::new(config, rng.fork());
    generator.generate();
    let mut best = generator.into_best()?;
    info!("cantus firmus frozen with score {}", best.score);
    if best.voices.len() != 1 {
        return Err(GenerateError::InvalidConfig(format!(
            "cantus firmus engine returned {} voices",
            best.voices.len()
        )));
    }
    Ok(best.voices.swap_remove(0))
}
