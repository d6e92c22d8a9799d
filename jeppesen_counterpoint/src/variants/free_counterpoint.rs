// Free counterpoint: two florid voices and no cantus firmus.
//
// Tenor and alto are both searched with the fifth species vocabulary. Either
// may open with a rest; whichever enters first starts on the final, and the
// other enters on a perfect consonance against it. Both close on the final.

use crate::attempt::{AttemptParameters, draw_ambitus};
use crate::error::Result;
use crate::generator::{GeneratorConfig, VoiceSpec};
use crate::mode::{Mode, VocalRange};
use crate::pipeline::Pipeline;
use crate::rules::{harmonic, melodic, rhythmic};
use crate::timeline::BeatGrid;
use crate::variants::check_length;
use crate::variants::fifth_species::{FLORID_OFFSETS, add_florid_rules, draw_florid_extras};
use jeppesen_prng::SeededRng;

pub fn build_free_counterpoint_config(mode: Mode, length: usize) -> Result<GeneratorConfig> {
    check_length("free counterpoint", length, 5..=16)?;

    let mut pipeline = Pipeline::base();
    add_florid_rules(&mut pipeline);
    pipeline.rests = vec![rhythmic::opening_rests];
    pipeline.melodic.push(melodic::final_from_step);
    pipeline.harmonic.insert(0, harmonic::florid_opening);
    pipeline.harmonic.push(harmonic::perfect_ending);

    let mut config = GeneratorConfig::new(
        "free counterpoint",
        mode,
        BeatGrid::closing(length, &FLORID_OFFSETS),
        vec![VoiceSpec::free(VocalRange::Tenor), VoiceSpec::free(VocalRange::Alto)],
        pipeline,
        draw_free_counterpoint,
    );
    config.search.max_solutions = 5;
    config.search.max_backtracks = 10_000;
    config.search.max_backtracks_without_solution = 8_000;
    config.search.max_backtracks_without_leaf = 5_000;
    Ok(config)
}

fn draw_free_counterpoint(
    config: &GeneratorConfig,
    rng: &mut SeededRng,
) -> Option<AttemptParameters> {
    let resolver = &config.resolver;
    let length = config.length();
    let mut voices = Vec::with_capacity(config.voices.len());
    for spec in &config.voices {
        let mut params = draw_ambitus(rng, resolver, &config.legal, spec.range, (8, 10), length)?;
        if !params.palette.iter().any(|&p| resolver.is_final(p)) {
            return None;
        }
        draw_florid_extras(rng, &mut params, length);
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
    fn test_both_voices_can_close_on_the_final() {
        let config = build_free_counterpoint_config(Mode::Aeolian, 8).unwrap();
        let mut rng = SeededRng::new(53);
        let mut drawn = 0;
        for _ in 0..100 {
            let Some(params) = (config.draw)(&config, &mut rng) else {
                continue;
            };
            drawn += 1;
            for voice in &params.voices {
                assert!(!voice.fixed);
                assert!(voice.palette.iter().any(|&p| config.resolver.is_final(p)));
            }
        }
        assert!(drawn > 0);
    }

    #[test]
    fn test_solutions_close_together_on_the_final() {
        let config = build_free_counterpoint_config(Mode::Ionian, 6).unwrap();
        let resolver = config.resolver;
        let generator = (59..65)
            .map(|seed| {
                let mut generator = Generator::new(config.clone(), SeededRng::new(seed));
                generator.generate();
                generator
            })
            .find(|g| !g.get_all_solutions().is_empty())
            .expect("a free counterpoint texture in Ionian");
        for solution in generator.get_all_solutions() {
            for voice in &solution.voices {
                let last: Option<Pitch> = voice.last().and_then(|v| v.pitch());
                assert!(last.is_some_and(|p| resolver.is_final(p)), "{voice:?}");
            }
        }
    }
}
