// Solution scoring: penalties summed over a finished composition.
//
// Lower is better. Each function here has the `ScoreFn` shape and is
// registered by the variants that care about it; `Generator::generate`
// replays every solution onto fresh timelines and sums the registered
// functions. Fixed voices (a cantus firmus, a frozen theme) are never
// scored.
//
// The targets and weights live in `StyleTargets` on the generator config so
// tests and the CLI can adjust them without touching the rules:
//
// Melodic: share of stepwise motion against an ideal, ascending leaps that
//   are not answered by a step down, repeated pitches.
// Vertical: fifths and octaves on downbeats.
// Rhythmic: number and spread of syncopations, short quarter runs, fourth
//   species note count.
// Texture: how late an answering voice enters, voices sharing a degree.

use crate::pipeline::Context;
use crate::pitch::Pitch;
use crate::timeline::Position;

/// Targets and penalty weights for scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleTargets {
    // Melodic
    /// Share of melodic intervals that should be steps.
    pub ideal_step_ratio: f64,
    /// Penalty per unit of shortfall below the ideal step ratio.
    pub too_few_steps: f64,
    /// Penalty per unit of excess above the ideal step ratio.
    pub too_many_steps: f64,
    /// Florid lines weigh step-ratio deviation in both directions alike.
    pub florid_step_deviation: f64,
    /// Ascending leap not followed by a descending step.
    pub unanswered_ascending_leap: i64,
    /// Second species: penalty when a line never leaps beyond a third.
    pub no_leaps: i64,
    /// Second species: occurrences of the most frequent pitch allowed free.
    pub max_pitch_repetitions: usize,
    pub repeated_pitch: i64,

    // Vertical
    pub downbeat_fifth: i64,
    pub downbeat_octave: i64,

    // Rhythmic
    /// Fifth species: syncopations per bar aimed for.
    pub ideal_syncopations_per_bar: f64,
    pub syncopation_deviation: i64,
    /// Difference in syncopations between the two halves of the line.
    pub syncopation_imbalance: i64,
    /// A run of exactly two quarters.
    pub short_quarter_run: i64,
    /// Fourth species: penalty per note (fewer notes means more ties).
    pub fourth_species_note: i64,
    /// Fourth species final check: at most this many notes per bar.
    pub max_syncopated_notes_per_bar: f64,
    /// Theme: a note struck on the penultimate downbeat is preferred.
    pub theme_without_penultimate_onset: i64,

    // Texture
    /// Per bar an answering voice rests before entering.
    pub late_entry: i64,
    /// Per pair of voices on the same degree at a downbeat.
    pub shared_degree: i64,
}

impl Default for StyleTargets {
    fn default() -> Self {
        StyleTargets {
            ideal_step_ratio: 0.712,
            too_few_steps: 100.0,
            too_many_steps: 50.0,
            florid_step_deviation: 150.0,
            unanswered_ascending_leap: 20,
            no_leaps: 15,
            max_pitch_repetitions: 4,
            repeated_pitch: 15,

            downbeat_fifth: 40,
            downbeat_octave: 10,

            ideal_syncopations_per_bar: 0.25,
            syncopation_deviation: 10,
            syncopation_imbalance: 5,
            short_quarter_run: 60,
            fourth_species_note: 5,
            max_syncopated_notes_per_bar: 1.5,
            theme_without_penultimate_onset: 500,

            late_entry: 10,
            shared_degree: 10,
        }
    }
}

/// Indices of the voices the search filled in.
fn searched_voices(ctx: &Context) -> impl Iterator<Item = usize> {
    (0..ctx.voice_count()).filter(move |&v| !ctx.voice(v).fixed)
}

fn melodic_intervals(notes: &[Pitch]) -> Vec<i32> {
    notes.windows(2).map(|w| w[0].tonal_interval(w[1])).collect()
}

/// Share of steps among the melodic intervals, `None` for a single note.
fn step_ratio(notes: &[Pitch]) -> Option<f64> {
    let intervals = melodic_intervals(notes);
    if intervals.is_empty() {
        return None;
    }
    let steps = intervals.iter().filter(|i| i.abs() == 2).count();
    Some(steps as f64 / intervals.len() as f64)
}

fn asymmetric_step_penalty(ratio: f64, ideal: f64, below: f64, above: f64) -> i64 {
    let diff = ratio - ideal;
    if diff < 0.0 {
        (-diff * below).floor() as i64
    } else {
        (diff * above).floor() as i64
    }
}

/// Distance from the ideal share of stepwise motion, heavier when the line
/// leaps too much. In textures of three or more voices the bass is exempt.
pub fn stepwise_motion(ctx: &Context) -> i64 {
    let style = &ctx.config.style;
    let skip_bass = ctx.voice_count() >= 3;
    searched_voices(ctx)
        .filter(|&v| !(skip_bass && v == 0))
        .filter_map(|v| step_ratio(&ctx.timeline(v).pitches()))
        .map(|ratio| {
            asymmetric_step_penalty(
                ratio,
                style.ideal_step_ratio,
                style.too_few_steps,
                style.too_many_steps,
            )
        })
        .sum()
}

/// Ascending leaps should be answered by a step down.
pub fn unanswered_ascending_leaps(ctx: &Context) -> i64 {
    let weight = ctx.config.style.unanswered_ascending_leap;
    searched_voices(ctx)
        .map(|v| {
            let intervals = melodic_intervals(&ctx.timeline(v).pitches());
            let count = intervals
                .windows(2)
                .filter(|w| w[0] > 2 && w[1] != -2)
                .count();
            count as i64 * weight
        })
        .sum()
}

/// Downbeat fifths and octaves between a searched voice and the others,
/// first and last bar excluded.
fn downbeat_perfects(ctx: &Context, fifth: i64, octave: i64) -> i64 {
    let last = ctx.length().saturating_sub(1);
    let mut total = 0;
    for v in searched_voices(ctx) {
        for bar in 1..last {
            let at = Position::downbeat(bar);
            let Some(pitch) = ctx.pitch_at(v, at) else {
                continue;
            };
            for (_, other) in ctx.sounding_with(v, at) {
                total += match other.tonal_interval(pitch).abs() {
                    5 | 12 => fifth,
                    1 | 8 | 15 => octave,
                    _ => 0,
                };
            }
        }
    }
    total
}

/// Second species: steps near the ideal, some leaps, little pitch
/// repetition, few perfect downbeats.
pub fn second_species_style(ctx: &Context) -> i64 {
    let style = &ctx.config.style;
    let mut total = downbeat_perfects(ctx, style.downbeat_fifth, style.downbeat_octave);
    for v in searched_voices(ctx) {
        let notes = ctx.timeline(v).pitches();
        if let Some(ratio) = step_ratio(&notes) {
            total += asymmetric_step_penalty(ratio, style.ideal_step_ratio, style.too_few_steps, 20.0);
        }
        if melodic_intervals(&notes).iter().all(|i| i.abs() <= 3) {
            total += style.no_leaps;
        }
        let most = notes
            .iter()
            .map(|p| notes.iter().filter(|q| *q == p).count())
            .max()
            .unwrap_or(0);
        total += most.saturating_sub(style.max_pitch_repetitions) as i64 * style.repeated_pitch;
    }
    total
}

/// Fourth species: fewer notes means more ties.
pub fn fourth_species_ties(ctx: &Context) -> i64 {
    let weight = ctx.config.style.fourth_species_note;
    searched_voices(ctx)
        .map(|v| ctx.timeline(v).pitches().len() as i64 * weight)
        .sum()
}

/// Bars whose downbeat is covered by a note struck earlier.
fn syncopated_bars(ctx: &Context, voice: usize) -> Vec<usize> {
    ctx.timeline(voice)
        .entities()
        .iter()
        .filter(|p| p.pitch().is_some() && p.position.offset != 0)
        .filter(|p| p.end() > Position::downbeat(p.position.bar + 1))
        .map(|p| p.position.bar + 1)
        .collect()
}

/// Runs of quarters as lengths, in order.
fn quarter_runs(ctx: &Context, voice: usize) -> Vec<usize> {
    let mut runs = Vec::new();
    let mut current = 0;
    for placed in ctx.timeline(voice).entities() {
        if placed.duration() == 2 && placed.pitch().is_some() {
            current += 1;
        } else if current > 0 {
            runs.push(current);
            current = 0;
        }
    }
    if current > 0 {
        runs.push(current);
    }
    runs
}

/// Florid style: syncopations near the ideal and spread over the line, no
/// two-quarter runs, few perfect downbeats, steps near the ideal.
pub fn florid_style(ctx: &Context) -> i64 {
    let style = &ctx.config.style;
    let length = ctx.length();
    let half = length / 2;
    let target = (style.ideal_syncopations_per_bar * length as f64).round() as i64;
    let mut total = downbeat_perfects(ctx, 30, 10);
    for v in searched_voices(ctx) {
        let bars = syncopated_bars(ctx, v);
        total += (bars.len() as i64 - target).abs() * style.syncopation_deviation;
        let early = bars.iter().filter(|&&b| b < half).count() as i64;
        let late = bars.len() as i64 - early;
        total += (early - late).abs() * style.syncopation_imbalance;

        let short_runs = quarter_runs(ctx, v).into_iter().filter(|&r| r == 2).count();
        total += short_runs as i64 * style.short_quarter_run;

        if let Some(ratio) = step_ratio(&ctx.timeline(v).pitches()) {
            total += ((style.ideal_step_ratio - ratio).abs() * style.florid_step_deviation).floor() as i64;
        }
    }
    total
}

/// A theme should keep moving into its close: penalize one with no onset
/// on the penultimate downbeat.
pub fn theme_shape(ctx: &Context) -> i64 {
    let penalty = ctx.config.style.theme_without_penultimate_onset;
    let Some(bar) = ctx.length().checked_sub(2) else {
        return 0;
    };
    searched_voices(ctx)
        .filter(|&v| ctx.timeline(v).at(Position::downbeat(bar)).is_none())
        .map(|_| penalty)
        .sum()
}

/// Answering voices should enter early.
pub fn early_entry(ctx: &Context) -> i64 {
    let weight = ctx.config.style.late_entry;
    searched_voices(ctx)
        .filter(|&v| ctx.voice(v).answers_theme)
        .map(|v| {
            let rest_bars: usize = ctx
                .timeline(v)
                .entities()
                .iter()
                .take_while(|p| p.value.is_rest())
                .map(|p| p.duration() as usize / 8)
                .sum();
            rest_bars as i64 * weight
        })
        .sum()
}

/// Pairs of voices sounding the same degree on a downbeat.
pub fn shared_degrees(ctx: &Context) -> i64 {
    let weight = ctx.config.style.shared_degree;
    let voices = ctx.voice_count();
    let mut total = 0;
    for bar in 0..ctx.length() {
        let at = Position::downbeat(bar);
        let degrees: Vec<u8> = (0..voices)
            .filter_map(|v| ctx.pitch_at(v, at))
            .map(|p| p.degree)
            .collect();
        for (i, a) in degrees.iter().enumerate() {
            total += degrees[i + 1..].iter().filter(|&b| b == a).count() as i64 * weight;
        }
    }
    total
}
