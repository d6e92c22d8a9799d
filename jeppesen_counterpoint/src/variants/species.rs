// First to fourth species: one counterpoint line against a frozen cantus
// firmus.
//
// The cantus firmus comes from a nested cantus firmus engine (closing by a
// descending step) or from the caller. It is frozen as a fixed tenor and
// the counterpoint is searched either above it (alto) or below it (bass);
// voices are always ordered bottom first. The cantus firmus's last note is
// stretched over the whole closing bar so both voices end together.
//
// Species differ only in their beat grid, duration source and a handful of
// dissonance rules; everything else (perfect start and end, parallels,
// hidden perfects, cross relations, Landini cadences) is shared and also
// reused by the fifth species.

use crate::attempt::{AttemptParameters, VoiceParameters, draw_ambitus};
use crate::error::{GenerateError, Result};
use crate::generator::{GeneratorConfig, VoiceSpec};
use crate::mode::{Mode, VocalRange};
use crate::pipeline::{Pipeline, PitchCheck};
use crate::pitch::{Pitch, RhythmicValue};
use crate::rules::{final_checks, harmonic, melodic, rhythmic};
use crate::scoring;
use crate::timeline::{BEAT_2, BeatGrid};
use crate::variants::cantus_firmus::generate_cantus_firmus;
use crate::variants::check_length;
use jeppesen_prng::SeededRng;
use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Species {
    /// Whole notes against whole notes.
    First,
    /// Two halves per bar.
    Second,
    /// Four quarters per bar.
    Third,
    /// Halves tied across the barline.
    Fourth,
}

impl Species {
    pub fn name(self) -> &'static str {
        match self {
            Species::First => "first species",
            Species::Second => "second species",
            Species::Third => "third species",
            Species::Fourth => "fourth species",
        }
    }

    fn offsets(self) -> &'static [u8] {
        match self {
            Species::First => &[0],
            Species::Second | Species::Fourth => &[0, BEAT_2],
            Species::Third => &[0, 2, 4, 6],
        }
    }
}

/// Generate a cantus firmus, then build the species against it with the
/// cantus firmus randomly above or below.
pub fn build_species_config(
    species: Species,
    mode: Mode,
    length: usize,
    rng: &mut SeededRng,
) -> Result<GeneratorConfig> {
    check_length(species.name(), length, 4..=16)?;
    let cantus = generate_cantus_firmus(mode, length, true, rng)?;
    let cf_index = rng.range_usize(0, 2);
    info!(
        "{}: cantus firmus placed {}",
        species.name(),
        if cf_index == 0 { "below" } else { "above" }
    );
    with_cantus_firmus(species, mode, &cantus, cf_index)
}

/// The cantus firmus as a frozen voice, its last note held through the
/// closing bar.
pub(crate) fn frozen_cantus(cantus: &[RhythmicValue]) -> Vec<RhythmicValue> {
    let mut values = cantus.to_vec();
    if let Some(last) = values.last_mut() {
        *last = last.with_duration(16);
    }
    values
}

/// Voices for a cantus firmus at `cf_index` (0 = bottom) and one searched
/// line on the other side of it.
pub(crate) fn voices_around_cantus(
    cantus: &[RhythmicValue],
    cf_index: usize,
) -> Result<Vec<VoiceSpec>> {
    let frozen = VoiceSpec::fixed(VocalRange::Tenor, frozen_cantus(cantus));
    match cf_index {
        0 => Ok(vec![frozen, VoiceSpec::free(VocalRange::Alto)]),
        1 => Ok(vec![VoiceSpec::free(VocalRange::Bass), frozen]),
        _ => Err(GenerateError::InvalidConfig(format!(
            "cantus firmus index {cf_index} out of range for two voices"
        ))),
    }
}

/// Build a species against a given cantus firmus of whole notes.
pub fn with_cantus_firmus(
    species: Species,
    mode: Mode,
    cantus: &[RhythmicValue],
    cf_index: usize,
) -> Result<GeneratorConfig> {
    let length = cantus.len();
    check_length(species.name(), length, 3..=16)?;
    if cantus.iter().any(|v| v.is_rest() || v.duration() != 8) {
        return Err(GenerateError::InvalidConfig(
            "a cantus firmus is whole notes only".to_string(),
        ));
    }

    let mut pipeline = Pipeline::base();
    add_two_voice_rules(&mut pipeline);
    match species {
        Species::First => {
            pipeline.durations = vec![rhythmic::whole_notes];
            pipeline.rests.clear();
            pipeline.harmonic.push(harmonic::consonant_with_sounding);
            pipeline.scores.push(scoring::stepwise_motion);
        }
        Species::Second => {
            pipeline.durations = vec![rhythmic::half_notes];
            pipeline.harmonic.extend([
                harmonic::downbeat_onsets_consonant as PitchCheck,
                harmonic::weak_half_passes_by_step,
                harmonic::passing_tones_continue,
            ]);
            pipeline.scores.push(scoring::second_species_style);
        }
        Species::Third => {
            pipeline.durations = vec![rhythmic::quarter_notes];
            pipeline
                .melodic
                .push(melodic::no_ascending_leap_around_accented_quarters);
            pipeline.harmonic.extend([
                harmonic::strong_beats_consonant as PitchCheck,
                harmonic::weak_quarters_approached_by_step,
                harmonic::third_species_dissonance_resolves,
                harmonic::cambiata_rises,
            ]);
            pipeline.scores.push(scoring::stepwise_motion);
        }
        Species::Fourth => {
            pipeline.durations = vec![rhythmic::syncopated_halves];
            pipeline.harmonic.extend([
                harmonic::strong_beats_consonant as PitchCheck,
                harmonic::suspensions_resolve_down,
            ]);
            pipeline
                .harmonic_rhythmic
                .push(rhythmic::prepares_suspensions);
            pipeline.finals.push(final_checks::mostly_syncopated);
            pipeline.scores.push(scoring::fourth_species_ties);
        }
    }

    let mut config = GeneratorConfig::new(
        species.name(),
        mode,
        BeatGrid::closing(length, species.offsets()),
        voices_around_cantus(cantus, cf_index)?,
        pipeline,
        draw_against_cantus,
    );
    config.search.max_solutions = 10;
    Ok(config)
}

/// Rules every two-voice species shares.
fn add_two_voice_rules(pipeline: &mut Pipeline) {
    pipeline.melodic.extend([
        melodic::no_cross_relation_one_note_apart as PitchCheck,
        melodic::sharps_resolve_upward,
        melodic::consecutive_leaps_stay_small,
        melodic::large_leaps_turn_back,
        melodic::no_immediate_two_note_repetition,
        melodic::ends_by_step,
        melodic::rising_step_into_final_is_raised,
    ]);
    pipeline.harmonic.extend([
        harmonic::perfect_start_and_end as PitchCheck,
        harmonic::no_parallel_perfects,
        harmonic::no_hidden_perfects,
        harmonic::no_interior_downbeat_unisons,
        harmonic::limited_repeated_intervals,
        harmonic::adjacent_voices_within_tenth,
        harmonic::sharps_not_doubled,
        harmonic::no_diagonal_cross_relations,
        harmonic::no_landini_cadence,
        harmonic::no_large_parallel_leaps,
    ]);
    pipeline.finals.push(final_checks::sharps_resolve);
}

/// Whether `pitch` forms a perfect consonance against the cantus firmus:
/// unison, fifth or octave above it, unison or octave below.
pub(crate) fn perfect_against(cantus: Pitch, pitch: Pitch) -> bool {
    match cantus.chromatic_interval(pitch) {
        i if i > 0 => matches!(i % 12, 0 | 7),
        i => i.rem_euclid(12) == 0,
    }
}

/// The first and last pitch of the fixed voice, if there is one.
pub(crate) fn cantus_ends(config: &GeneratorConfig) -> Option<(Pitch, Pitch)> {
    let fixed = config.voices.iter().find(|v| !v.material.is_empty())?;
    let mut pitches = fixed.material.iter().filter_map(|v| v.pitch());
    let first = pitches.next()?;
    let last = pitches.last().unwrap_or(first);
    Some((first, last))
}

/// Parameters for the fixed cantus firmus plus an ambitus for every free
/// voice.
pub(crate) fn draw_around_cantus(
    config: &GeneratorConfig,
    rng: &mut SeededRng,
    span: (i32, i32),
) -> Option<AttemptParameters> {
    let (first, last) = cantus_ends(config)?;
    let mut voices = Vec::with_capacity(config.voices.len());
    for spec in &config.voices {
        if !spec.material.is_empty() {
            voices.push(VoiceParameters::fixed(spec.range, &spec.material));
            continue;
        }
        let params = draw_ambitus(
            rng,
            &config.resolver,
            &config.legal,
            spec.range,
            span,
            config.length(),
        )?;
        let opens = params.palette.iter().any(|&p| perfect_against(first, p));
        let closes = params.palette.iter().any(|&p| perfect_against(last, p));
        if !opens || !closes {
            return None;
        }
        voices.push(params);
    }
    Some(AttemptParameters { voices })
}

fn draw_against_cantus(config: &GeneratorConfig, rng: &mut SeededRng) -> Option<AttemptParameters> {
    draw_around_cantus(config, rng, (8, 10))
}
