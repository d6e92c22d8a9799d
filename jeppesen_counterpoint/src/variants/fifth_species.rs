// Fifth species: florid counterpoint against a frozen cantus firmus.
//
// The counterpoint mixes every value from the eighth to the dotted whole on
// the grid {0, 1, 1.5, 2, 3} beats. On top of the species ambitus each
// attempt draws florid extras: how many on-beat whole notes, eighth pairs
// and melodic octaves the line may use, and up to one window of quarter
// notes the line must run through. Free counterpoint draws the same extras
// and registers the same florid vocabulary.

use crate::attempt::{AttemptParameters, QuarterRun, Quotas, VoiceParameters};
use crate::error::{GenerateError, Result};
use crate::generator::GeneratorConfig;
use crate::mode::Mode;
use crate::pipeline::{DurationFilter, FinalCheck, Mutation, Pipeline, PitchCheck};
use crate::pitch::RhythmicValue;
use crate::rules::{final_checks, harmonic, melodic, rhythmic, state};
use crate::scoring;
use crate::timeline::{BEAT_1, BEAT_1_AND, BEAT_2, BEAT_3, BeatGrid, Position};
use crate::variants::cantus_firmus::generate_cantus_firmus;
use crate::variants::check_length;
use crate::variants::species::{draw_around_cantus, voices_around_cantus};
use jeppesen_prng::SeededRng;

/// Beat grid of every florid line.
pub const FLORID_OFFSETS: [u8; 5] = [0, BEAT_1, BEAT_1_AND, BEAT_2, BEAT_3];

/// Generate a cantus firmus and build a florid line against it.
pub fn build_fifth_species_config(
    mode: Mode,
    length: usize,
    rng: &mut SeededRng,
) -> Result<GeneratorConfig> {
    check_length("fifth species", length, 5..=16)?;
    let cantus = generate_cantus_firmus(mode, length, true, rng)?;
    let cf_index = rng.range_usize(0, 2);
    with_cantus_firmus(mode, &cantus, cf_index)
}

/// Build the fifth species against a given cantus firmus.
pub fn with_cantus_firmus(
    mode: Mode,
    cantus: &[RhythmicValue],
    cf_index: usize,
) -> Result<GeneratorConfig> {
    let length = cantus.len();
    check_length("fifth species", length, 5..=16)?;
    if cantus.iter().any(|v| v.is_rest() || v.duration() != 8) {
        return Err(GenerateError::InvalidConfig(
            "a cantus firmus is whole notes only".to_string(),
        ));
    }

    let mut pipeline = Pipeline::base();
    add_florid_rules(&mut pipeline);
    pipeline.melodic.push(melodic::final_from_leading_tone);
    pipeline.harmonic.insert(0, harmonic::florid_opening);
    pipeline.harmonic.push(harmonic::perfect_ending);

    let mut config = GeneratorConfig::new(
        "fifth species",
        mode,
        BeatGrid::closing(length, &FLORID_OFFSETS),
        voices_around_cantus(cantus, cf_index)?,
        pipeline,
        draw_fifth_species,
    );
    config.search.max_solutions = 5;
    config.search.max_backtracks = 8_000;
    config.search.max_backtracks_without_solution = 6_000;
    config.search.max_backtracks_without_leaf = 4_000;
    Ok(config)
}

/// Florid vocabulary shared by the fifth species, the duet and free
/// counterpoint: melodic hygiene, dissonance treatment, the rhythmic
/// filters, quota bookkeeping and the florid score.
pub(crate) fn add_florid_rules(pipeline: &mut Pipeline) {
    pipeline.durations = vec![rhythmic::florid_durations];
    pipeline.melodic.extend([
        melodic::no_cross_relation_one_note_apart as PitchCheck,
        melodic::sharps_resolve_upward,
        melodic::consecutive_leaps_stay_small,
        melodic::large_leaps_turn_back,
        melodic::no_ascending_leap_around_accented_quarters,
        melodic::eighths_move_by_step,
        melodic::octave_leaps_within_quota,
        melodic::no_immediate_two_note_repetition,
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
        harmonic::adjacent_voices_within_twelfth,
        harmonic::sharps_not_doubled,
        harmonic::no_diagonal_cross_relations,
    ]);
    pipeline.rhythmic.extend([
        rhythmic::runs_force_quarters as DurationFilter,
        rhythmic::whole_note_quota,
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
        state::count_on_beat_whole_notes as Mutation,
        state::count_eighth_pairs,
        state::count_octave_leaps,
    ]);
    pipeline.finals.extend([
        final_checks::octave_leaps_within_quota as FinalCheck,
        final_checks::sharps_resolve,
        final_checks::has_syncopation,
    ]);
    pipeline.scores.push(scoring::florid_style);
}

/// Quotas and an optional quarter-note run for one florid voice.
pub(crate) fn draw_florid_extras(rng: &mut SeededRng, params: &mut VoiceParameters, length: usize) {
    params.quotas = Quotas {
        max_on_beat_whole_notes: rng.range_i64_inclusive(1, 3) as u8,
        max_eighth_pairs: rng.range_i64_inclusive(0, 2) as u8,
        max_octave_leaps: rng.range_i64_inclusive(0, 1) as u8,
    };
    params.runs.clear();
    if length >= 6 && rng.random_bool(0.5) {
        let bar = rng.range_usize_inclusive(1, length - 4);
        let offset = if rng.random_bool(0.5) { 0 } else { BEAT_2 };
        params.runs.push(QuarterRun {
            start: Position::new(bar, offset),
            quarters: rng.range_i64_inclusive(3, 4) as u8,
        });
    }
}

fn draw_fifth_species(config: &GeneratorConfig, rng: &mut SeededRng) -> Option<AttemptParameters> {
    let mut params = draw_around_cantus(config, rng, (8, 10))?;
    let length = config.length();
    for voice in params.voices.iter_mut().filter(|v| !v.fixed) {
        draw_florid_extras(rng, voice, length);
    }
    Some(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::VocalRange;
    use crate::pitch::Pitch;

    fn cantus() -> Vec<RhythmicValue> {
        [1, 3, 2, 4, 3, 5, 4, 2, 1]
            .iter()
            .map(|&d| RhythmicValue::note(Pitch::natural(d, 4), 8))
            .collect()
    }

    #[test]
    fn test_florid_extras_stay_in_bounds() {
        let mut rng = SeededRng::new(17);
        let mut params = VoiceParameters::new(
            VocalRange::Alto,
            Pitch::natural(6, 3),
            Pitch::natural(3, 5),
            Vec::new(),
        );
        let mut with_run = 0;
        for _ in 0..200 {
            draw_florid_extras(&mut rng, &mut params, 10);
            assert!((1..=3).contains(&params.quotas.max_on_beat_whole_notes));
            assert!(params.quotas.max_eighth_pairs <= 2);
            assert!(params.quotas.max_octave_leaps <= 1);
            assert!(params.runs.len() <= 1);
            if let Some(run) = params.runs.first() {
                with_run += 1;
                assert!((1..=6).contains(&run.start.bar), "{}", run.start);
                assert!(matches!(run.start.offset, 0 | BEAT_2));
                assert!((3..=4).contains(&run.quarters));
            }
        }
        assert!(with_run > 0);
    }

    #[test]
    fn test_short_lines_get_no_run() {
        let mut rng = SeededRng::new(18);
        let mut params = VoiceParameters::new(
            VocalRange::Alto,
            Pitch::natural(6, 3),
            Pitch::natural(3, 5),
            Vec::new(),
        );
        for _ in 0..50 {
            draw_florid_extras(&mut rng, &mut params, 5);
            assert!(params.runs.is_empty());
        }
    }

    #[test]
    fn test_config_shape() {
        let config = with_cantus_firmus(Mode::Ionian, &cantus(), 0).unwrap();
        assert_eq!(config.grid.offsets, FLORID_OFFSETS.to_vec());
        assert!(config.grid.closing);
        assert_eq!(config.pipeline.durations.len(), 1);
        let mut rng = SeededRng::new(19);
        let drawn = (0..50).filter_map(|_| (config.draw)(&config, &mut rng)).next();
        let params = drawn.expect("some draw succeeds");
        assert!(params.voices[0].fixed);
        assert!(params.voices[1].quotas.max_on_beat_whole_notes >= 1);
    }

    #[test]
    fn test_solutions_end_on_leading_tone_cadence() {
        let config = with_cantus_firmus(Mode::Dorian, &cantus_in_dorian(), 0).unwrap();
        let resolver = config.resolver;
        let generator = (23..29)
            .map(|seed| {
                let mut generator = crate::generator::Generator::new(config.clone(), SeededRng::new(seed));
                generator.generate();
                generator
            })
            .find(|g| !g.get_all_solutions().is_empty())
            .expect("a fifth species line against the Dorian cantus");
        for solution in generator.get_all_solutions() {
            let line: Vec<Pitch> = solution.voices[1].iter().filter_map(|v| v.pitch()).collect();
            let [.., penultimate, last] = line[..] else {
                panic!("line too short: {line:?}");
            };
            assert!(resolver.is_final(last));
            assert_eq!(penultimate, resolver.leading_tone_below(last));
            assert_eq!(solution.voices[1].last().map(|v| v.duration()), Some(16));
        }
    }

    fn cantus_in_dorian() -> Vec<RhythmicValue> {
        [2, 4, 3, 5, 4, 6, 5, 3, 2]
            .iter()
            .map(|&d| RhythmicValue::note(Pitch::natural(d, 4), 8))
            .collect()
    }
}
