//! Search benchmarks: a full generator run per iteration.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use jeppesen_counterpoint::generator::{Generator, GeneratorConfig};
use jeppesen_counterpoint::mode::Mode;
use jeppesen_counterpoint::pitch::{Pitch, RhythmicValue};
use jeppesen_counterpoint::variants::cantus_firmus::build_cantus_firmus_config;
use jeppesen_counterpoint::variants::species::{Species, with_cantus_firmus};
use jeppesen_prng::SeededRng;

fn run(config: &GeneratorConfig, seed: u64) -> usize {
    let mut generator = Generator::new(config.clone(), SeededRng::new(seed));
    generator.generate();
    generator.get_all_solutions().len()
}

fn dorian_cantus() -> Vec<RhythmicValue> {
    [2, 4, 3, 2, 5, 4, 6, 5, 3, 2]
        .iter()
        .map(|&d| RhythmicValue::note(Pitch::natural(d, 3), 8))
        .collect()
}

fn bench_cantus_firmus(c: &mut Criterion) {
    let Ok(config) = build_cantus_firmus_config(Mode::Dorian, 10, false) else {
        return;
    };
    c.bench_function("cantus_firmus_dorian_10", |b| {
        b.iter(|| black_box(run(&config, 42)))
    });
}

fn bench_first_species(c: &mut Criterion) {
    let Ok(config) = with_cantus_firmus(Species::First, Mode::Dorian, &dorian_cantus(), 0) else {
        return;
    };
    c.bench_function("first_species_dorian_10", |b| {
        b.iter(|| black_box(run(&config, 42)))
    });
}

fn bench_third_species(c: &mut Criterion) {
    let Ok(config) = with_cantus_firmus(Species::Third, Mode::Dorian, &dorian_cantus(), 1) else {
        return;
    };
    c.bench_function("third_species_dorian_10", |b| {
        b.iter(|| black_box(run(&config, 42)))
    });
}

criterion_group!(benches, bench_cantus_firmus, bench_first_species, bench_third_species);
criterion_main!(benches);
