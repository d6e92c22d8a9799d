// First species in three to six voices.
//
// Every voice is searched; there is no cantus firmus. The bass carries the
// harmony: it opens and closes on the final with the upper voices on the
// octave, third or fifth above, and every other voice must be consonant
// with it. Upper voices only avoid seconds, sevenths and altered intervals
// among themselves. Each voice gets a narrow ambitus so the parts keep to
// their own registers.

use crate::attempt::{AttemptParameters, draw_ambitus};
use crate::error::{GenerateError, Result};
use crate::generator::{GeneratorConfig, VoiceSpec};
use crate::mode::{Mode, VocalRange};
use crate::pipeline::{FinalCheck, Pipeline, PitchCheck, ScoreFn};
use crate::rules::{final_checks, harmonic, melodic, rhythmic};
use crate::scoring;
use crate::timeline::BeatGrid;
use crate::variants::check_length;
use jeppesen_prng::SeededRng;

/// Vocal ranges for a texture of `voices` parts, bass first.
pub fn voice_set(voices: usize) -> Option<Vec<VocalRange>> {
    use VocalRange::*;
    let set: &[VocalRange] = match voices {
        3 => &[Bass, Alto, Soprano],
        4 => &[Bass, Tenor, Alto, Soprano],
        5 => &[Bass, Tenor, Alto, Soprano, Soprano],
        6 => &[Bass, Tenor, Tenor, Alto, Soprano, Soprano],
        _ => return None,
    };
    Some(set.to_vec())
}

pub fn build_multi_part_config(
    mode: Mode,
    length: usize,
    voices: usize,
) -> Result<GeneratorConfig> {
    check_length("multi-part", length, 3..=16)?;
    let Some(ranges) = voice_set(voices) else {
        return Err(GenerateError::InvalidConfig(format!(
            "multi-part counterpoint takes 3 to 6 voices, not {voices}"
        )));
    };

    let mut pipeline = Pipeline::base();
    pipeline.durations = vec![rhythmic::whole_notes];
    pipeline.rests.clear();
    pipeline.melodic.extend([
        melodic::no_cross_relation_one_note_apart as PitchCheck,
        melodic::sharps_resolve_upward,
        melodic::consecutive_leaps_stay_small,
        melodic::large_leaps_turn_back,
        melodic::rising_step_into_final_is_raised,
    ]);
    pipeline.harmonic.extend([
        harmonic::multi_part_vertical as PitchCheck,
        harmonic::opening_chord,
        harmonic::closing_chord,
        harmonic::no_parallel_perfects,
        harmonic::no_hidden_perfects_between_outer_voices,
        harmonic::adjacent_upper_voices_within_octave,
        harmonic::no_three_voice_unison,
        harmonic::voices_do_not_cross,
        harmonic::sharps_not_doubled,
    ]);
    pipeline.finals.extend([
        final_checks::opening_chord_complete as FinalCheck,
        final_checks::sharps_resolve,
    ]);
    pipeline.scores.extend([scoring::stepwise_motion as ScoreFn, scoring::shared_degrees]);

    let mut config = GeneratorConfig::new(
        "multi-part",
        mode,
        BeatGrid::closing(length, &[0]),
        ranges.into_iter().map(VoiceSpec::free).collect(),
        pipeline,
        draw_multi_part,
    );
    config.search.max_solutions = 5;
    config.search.max_backtracks = 10_000;
    config.search.max_backtracks_without_solution = 8_000;
    config.search.max_backtracks_without_leaf = 5_000;
    Ok(config)
}

fn draw_multi_part(config: &GeneratorConfig, rng: &mut SeededRng) -> Option<AttemptParameters> {
    let resolver = &config.resolver;
    let mut voices = Vec::with_capacity(config.voices.len());
    for (index, spec) in config.voices.iter().enumerate() {
        let params = draw_ambitus(rng, resolver, &config.legal, spec.range, (6, 8), config.length())?;
        if index == 0 && !params.palette.iter().any(|&p| resolver.is_final(p)) {
            return None;
        }
        voices.push(params);
    }
    Some(AttemptParameters { voices })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Generator;
    use crate::pitch::Pitch;

    #[test]
    fn test_voice_sets() {
        assert_eq!(voice_set(2), None);
        assert_eq!(voice_set(7), None);
        for voices in 3..=6 {
            let set = voice_set(voices).unwrap();
            assert_eq!(set.len(), voices);
            assert_eq!(set[0], VocalRange::Bass);
            assert!(set.windows(2).all(|w| w[0] <= w[1]), "{set:?}");
        }
    }

    #[test]
    fn test_rejects_unsupported_voice_counts() {
        assert!(build_multi_part_config(Mode::Ionian, 8, 2).is_err());
        assert!(build_multi_part_config(Mode::Ionian, 8, 4).is_ok());
    }

    #[test]
    fn test_bass_palette_holds_a_final() {
        let config = build_multi_part_config(Mode::Mixolydian, 8, 4).unwrap();
        let mut rng = SeededRng::new(31);
        let mut drawn = 0;
        for _ in 0..100 {
            let Some(params) = (config.draw)(&config, &mut rng) else {
                continue;
            };
            drawn += 1;
            assert_eq!(params.voices.len(), 4);
            assert!(params.voices[0].palette.iter().any(|&p| config.resolver.is_final(p)));
            for voice in &params.voices {
                let span = voice.lowest.tonal_interval(voice.highest);
                assert!((6..=8).contains(&span), "span {span}");
            }
        }
        assert!(drawn > 0);
    }

    #[test]
    fn test_solutions_keep_voice_order() {
        let config = build_multi_part_config(Mode::Ionian, 6, 3).unwrap();
        let resolver = config.resolver;
        let generator = (37..43)
            .map(|seed| {
                let mut generator = Generator::new(config.clone(), SeededRng::new(seed));
                generator.generate();
                generator
            })
            .find(|g| !g.get_all_solutions().is_empty())
            .expect("a three-part Ionian texture");
        for solution in generator.get_all_solutions() {
            let lines: Vec<Vec<Pitch>> = solution
                .voices
                .iter()
                .map(|v| v.iter().filter_map(|r| r.pitch()).collect())
                .collect();
            assert!(resolver.is_final(lines[0][0]));
            assert!(resolver.is_final(lines[0][5]));
            for bar in 0..6 {
                for pair in lines.windows(2) {
                    assert!(pair[0][bar].absolute() <= pair[1][bar].absolute());
                }
            }
        }
    }
}
