// Attempt orchestration, scoring and selection.
//
// `GeneratorConfig` is a whole variant as data: grid, voices (free or
// carrying frozen material), interval tables, the predicate pipeline,
// budgets, and the function that draws fresh `AttemptParameters`. Variants
// build one with a `build_*_config` function (see variants/).
//
// `Generator::generate` runs the outer loop:
//   1. draw parameters (a `None` draw is a cheap redraw, still counted)
//   2. run one bounded `Search` on fresh timelines
//   3. collect its solutions
// until the attempt budget's solution target or attempt ceiling is reached.
// Afterwards every solution is replayed onto read-only timelines, scored by
// the pipeline's score functions and sorted ascending (stable, so ties keep
// discovery order). The lowest score is the answer; the highest is kept
// around as a deliberately poor example.
//
// Each attempt searches with its own forked random stream, so attempts are
// independent and a run is reproducible from the top-level seed alone.

use crate::attempt::AttemptParameters;
use crate::engine::{self, SearchBudget};
use crate::error::{GenerateError, Result};
use crate::intervals::LegalIntervals;
use crate::mode::{Hexachord, Mode, ModeResolver, VocalRange};
use crate::pipeline::{Context, Pipeline};
use crate::pitch::{Pitch, RhythmicValue};
use crate::scoring::StyleTargets;
use crate::timeline::{BeatGrid, Timeline};
use jeppesen_prng::SeededRng;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Draws one attempt's parameters, or `None` to ask for a redraw.
pub type ParameterDraw = fn(&GeneratorConfig, &mut SeededRng) -> Option<AttemptParameters>;

/// One voice of a variant.
#[derive(Debug, Clone)]
pub struct VoiceSpec {
    pub range: VocalRange,
    /// Values placed before the search starts. Covers the whole grid for a
    /// frozen voice, a prefix for a seeded one, nothing for a free one.
    pub material: Arc<[RhythmicValue]>,
}

impl VoiceSpec {
    pub fn free(range: VocalRange) -> Self {
        VoiceSpec {
            range,
            material: Arc::from(Vec::new()),
        }
    }

    pub fn fixed(range: VocalRange, values: Vec<RhythmicValue>) -> Self {
        VoiceSpec {
            range,
            material: Arc::from(values),
        }
    }

    /// A voice whose opening is given and whose remainder is searched.
    pub fn seeded(range: VocalRange, prefix: Vec<RhythmicValue>) -> Self {
        VoiceSpec::fixed(range, prefix)
    }
}

/// A frozen imitation theme and the hexachord it was built on.
#[derive(Debug, Clone)]
pub struct Theme {
    pub notes: Arc<[RhythmicValue]>,
    pub hexachord: Hexachord,
}

impl Theme {
    pub fn new(notes: Vec<RhythmicValue>, hexachord: Hexachord) -> Self {
        Theme {
            notes: Arc::from(notes),
            hexachord,
        }
    }

    pub fn pitches(&self) -> Vec<Pitch> {
        self.notes.iter().filter_map(|v| v.pitch()).collect()
    }
}

/// How many attempts to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptBudget {
    /// Stop once this many solutions have been collected.
    pub target_solutions: usize,
    /// Hard ceiling on attempts, redraws included.
    pub max_attempts: usize,
}

impl Default for AttemptBudget {
    fn default() -> Self {
        AttemptBudget {
            target_solutions: 10,
            max_attempts: 50,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Variant name, for logs and errors.
    pub name: &'static str,
    pub mode: Mode,
    pub resolver: ModeResolver,
    pub grid: BeatGrid,
    pub voices: Vec<VoiceSpec>,
    pub legal: LegalIntervals,
    pub pipeline: Pipeline,
    pub search: SearchBudget,
    pub attempts: AttemptBudget,
    pub draw: ParameterDraw,
    pub style: StyleTargets,
    /// Frozen melodic material the variant's rules refer to.
    pub theme: Option<Theme>,
}

impl GeneratorConfig {
    pub fn new(
        name: &'static str,
        mode: Mode,
        grid: BeatGrid,
        voices: Vec<VoiceSpec>,
        pipeline: Pipeline,
        draw: ParameterDraw,
    ) -> Self {
        GeneratorConfig {
            name,
            mode,
            resolver: ModeResolver::new(mode),
            grid,
            voices,
            legal: LegalIntervals::default(),
            pipeline,
            search: SearchBudget::default(),
            attempts: AttemptBudget::default(),
            draw,
            style: StyleTargets::default(),
            theme: None,
        }
    }

    pub fn length(&self) -> usize {
        self.grid.bars
    }
}

/// A finished, accepted composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// One value sequence per voice, bottom voice first in species variants.
    pub voices: Vec<Vec<RhythmicValue>>,
    pub score: i64,
    pub parameters: AttemptParameters,
}

/// Counters accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationStats {
    pub attempts: usize,
    /// Attempts whose parameter draw was rejected.
    pub redraws: usize,
    pub backtracks: u64,
    /// Largest backtrack count of any single attempt.
    pub max_attempt_backtracks: u64,
    /// Largest number of search nodes (leaves plus interior) any single
    /// attempt visited.
    pub max_attempt_nodes: u64,
    pub leaves: u64,
}

pub struct Generator {
    config: GeneratorConfig,
    rng: SeededRng,
    solutions: Vec<Solution>,
    stats: GenerationStats,
}

impl Generator {
    pub fn new(config: GeneratorConfig, rng: SeededRng) -> Self {
        Generator {
            config,
            rng,
            solutions: Vec::new(),
            stats: GenerationStats::default(),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn stats(&self) -> &GenerationStats {
        &self.stats
    }

    /// Run attempts until the budget is met, then score and rank.
    pub fn generate(&mut self) {
        let budget = self.config.attempts;
        while self.solutions.len() < budget.target_solutions
            && self.stats.attempts < budget.max_attempts
        {
            self.stats.attempts += 1;
            let Some(params) = (self.config.draw)(&self.config, &mut self.rng) else {
                self.stats.redraws += 1;
                debug!(
                    "{}: attempt {} drew unusable parameters, redrawing",
                    self.config.name, self.stats.attempts
                );
                continue;
            };

            let mut attempt_rng = self.rng.fork();
            let outcome = engine::search(&self.config, params.clone(), &mut attempt_rng);
            self.stats.backtracks += outcome.backtracks;
            self.stats.max_attempt_backtracks =
                self.stats.max_attempt_backtracks.max(outcome.backtracks);
            self.stats.max_attempt_nodes = self.stats.max_attempt_nodes.max(outcome.nodes_visited());
            self.stats.leaves += outcome.leaves;
            debug!(
                "{}: attempt {} stopped ({:?}) with {} solutions after {} backtracks",
                self.config.name,
                self.stats.attempts,
                outcome.stop,
                outcome.solutions.len(),
                outcome.backtracks
            );
            self.solutions
                .extend(outcome.solutions.into_iter().map(|voices| Solution {
                    voices,
                    score: 0,
                    parameters: params.clone(),
                }));
        }

        for solution in &mut self.solutions {
            solution.score = score_solution(&self.config, solution);
        }
        self.solutions.sort_by_key(|s| s.score);
        info!(
            "{}: {} solutions in {} attempts ({} redraws), best score {:?}",
            self.config.name,
            self.solutions.len(),
            self.stats.attempts,
            self.stats.redraws,
            self.solutions.first().map(|s| s.score)
        );
    }

    /// The best-scored solution, if any.
    pub fn get_one_solution(&self) -> Option<&Solution> {
        self.solutions.first()
    }

    /// Every solution, best first.
    pub fn get_all_solutions(&self) -> &[Solution] {
        &self.solutions
    }

    /// The worst-scored solution, a deliberately poor but legal example.
    pub fn get_worst_solution(&self) -> Option<&Solution> {
        self.solutions.last()
    }

    /// Take the best solution, or fail if every attempt came back empty.
    pub fn into_best(mut self) -> Result<Solution> {
        if self.solutions.is_empty() {
            return Err(GenerateError::NoSolution {
                variant: self.config.name,
                attempts: self.stats.attempts,
            });
        }
        Ok(self.solutions.swap_remove(0))
    }
}

/// Replay a solution onto read-only timelines and sum the score functions.
pub fn score_solution(config: &GeneratorConfig, solution: &Solution) -> i64 {
    let timelines: Vec<Timeline> = solution
        .voices
        .iter()
        .map(|values| Timeline::from_values(config.grid.clone(), values))
        .collect();
    let ctx = Context {
        config,
        timelines: &timelines,
        params: &solution.parameters,
    };
    config.pipeline.score(&ctx)
}
