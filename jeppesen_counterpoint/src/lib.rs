// Jeppesen Counterpoint Generator
//
// Generates Renaissance vocal counterpoint in the style Knud Jeppesen
// teaches: a cantus firmus, the five species against it, multi-part first
// species, imitative themes and duets, and free two-voice counterpoint.
// Every variant is the same engine (a bounded, randomized depth-first
// search over per-voice timelines) configured with a different beat grid,
// voice layout and list of rules.
//
// Architecture:
// - pitch.rs: Pitch as degree + octave + accidental, tonal and chromatic
//   intervals, rhythmic values, duration sets
// - mode.rs: Church modes, vocal ranges, modal spelling and leading tones,
//   hexachords
// - intervals.rs: Melodic and harmonic legality tables
// - timeline.rs: Beat grids and per-voice occupancy with LIFO bury/unbury
// - attempt.rs: Per-attempt parameters (ambitus, deadlines, quotas) and the
//   mutable voice flags
// - pipeline.rs: Ordered predicate lists and the read-only search context
// - rules/: The predicates themselves (melodic, harmonic, rhythmic, state,
//   final checks)
// - engine.rs: One bounded backtracking search
// - generator.rs: Attempt orchestration, scoring and selection
// - scoring.rs: Style penalties and their targets
// - variants/: `build_*_config` functions, one per kind of counterpoint
// - midi.rs: MIDI file output from solutions
// - error.rs: Error types
//
// The generator is deterministic given a seed, supporting reproducible output.

pub mod attempt;
pub mod engine;
pub mod error;
pub mod generator;
pub mod intervals;
pub mod midi;
pub mod mode;
pub mod pipeline;
pub mod pitch;
pub mod rules;
pub mod scoring;
pub mod timeline;
pub mod variants;
