// Bounded backtracking search over the voices' timelines.
//
// One `Search` runs one attempt: a fixed set of `AttemptParameters`, fresh
// timelines, and a depth-first walk that fills the chronologically earliest
// open position (across all voices, ties broken at random) with every
// candidate the pipeline allows, in shuffled order. The walk is strictly
// insert, recurse, remove:
//
//   place(voice, value)   timeline buries covered positions, flags snapshot
//                         pushed, mutations fold into new flags
//   descend()             recurse
//   unplace(voice)        timeline unburies, flags snapshot popped and
//                         copied back
//
// There is no separate failure path; removal is unconditional, so after any
// subtree returns the search state is bit-for-bit what it was before.
//
// Every entry into the recursion, leaf or not, counts as one backtrack.
// Termination comes only from the budgets in `SearchBudget`, checked before
// every recursive call so that no call is made once a budget is spent: a
// solution cap, an absolute backtrack ceiling, and two "no progress"
// ceilings (backtracks since the last solution, since the last leaf). The walk is not complete in the CSP
// sense; it is a bounded stochastic search, and output diversity comes
// entirely from the candidate shuffle.
//
// Nothing here is global. A variant may run a whole nested `Search` (through
// a nested `Generator`) before building its own, e.g. to freeze a cantus
// firmus; each search owns its state and borrows only read-only config.

use crate::attempt::{AttemptParameters, VoiceFlags};
use crate::generator::GeneratorConfig;
use crate::pipeline::Context;
use crate::pitch::RhythmicValue;
use crate::timeline::{Position, Timeline};
use jeppesen_prng::SeededRng;
use log::trace;
use std::ops::ControlFlow;

/// Per-attempt search limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchBudget {
    /// Stop once this many solutions have been collected.
    pub max_solutions: usize,
    /// Absolute ceiling on recursive calls, whether or not solutions exist.
    pub max_backtracks: u64,
    /// Give up after this many calls without a new solution.
    pub max_backtracks_without_solution: u64,
    /// Give up after this many calls without reaching a full timeline.
    pub max_backtracks_without_leaf: u64,
}

impl Default for SearchBudget {
    fn default() -> Self {
        SearchBudget {
            max_solutions: 20,
            max_backtracks: 5_000,
            max_backtracks_without_solution: 5_000,
            max_backtracks_without_leaf: 5_000,
        }
    }
}

/// Why a search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every candidate was explored.
    Exhausted,
    SolutionLimit,
    BacktrackLimit,
    /// A "without solution" or "without leaf" ceiling was hit.
    NoProgress,
}

/// Result of one attempt.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// One value sequence per voice, per accepted leaf.
    pub solutions: Vec<Vec<Vec<RhythmicValue>>>,
    /// Recursive calls, the quantity the budget bounds.
    pub backtracks: u64,
    /// Calls that found every voice complete.
    pub leaves: u64,
    /// Calls that had a position left to fill.
    pub interior: u64,
    pub stop: StopReason,
}

impl SearchOutcome {
    /// Calls counted node by node rather than by the budget counter.
    pub fn nodes_visited(&self) -> u64 {
        self.leaves + self.interior
    }
}

pub struct Search<'a> {
    config: &'a GeneratorConfig,
    timelines: Vec<Timeline>,
    params: AttemptParameters,
    /// Flags of the voice touched by each live placement, innermost last.
    undo: Vec<VoiceFlags>,
    rng: &'a mut SeededRng,
    backtracks: u64,
    since_solution: u64,
    since_leaf: u64,
    leaves: u64,
    interior: u64,
    solutions: Vec<Vec<Vec<RhythmicValue>>>,
}

impl<'a> Search<'a> {
    /// Fresh timelines for every voice, with frozen and seeded material
    /// placed up front.
    pub fn new(
        config: &'a GeneratorConfig,
        params: AttemptParameters,
        rng: &'a mut SeededRng,
    ) -> Self {
        assert_eq!(
            config.voices.len(),
            params.voices.len(),
            "attempt parameters drawn for the wrong number of voices"
        );
        let timelines = config
            .voices
            .iter()
            .map(|_| Timeline::new(config.grid.clone()))
            .collect();
        let mut search = Search {
            config,
            timelines,
            params,
            undo: Vec::new(),
            rng,
            backtracks: 0,
            since_solution: 0,
            since_leaf: 0,
            leaves: 0,
            interior: 0,
            solutions: Vec::new(),
        };
        for (voice, spec) in config.voices.iter().enumerate() {
            for &value in spec.material.iter() {
                let Some(position) = search.timelines[voice].next_open() else {
                    panic!("material for voice {voice} overruns the grid");
                };
                search.place(voice, position, value);
            }
        }
        search
    }

    pub fn run(mut self) -> SearchOutcome {
        let flow = match self.budget_exceeded() {
            Some(reason) => ControlFlow::Break(reason),
            None => self.descend(),
        };
        let stop = match flow {
            ControlFlow::Continue(()) => StopReason::Exhausted,
            ControlFlow::Break(reason) => reason,
        };
        trace!(
            "search stopped ({stop:?}) after {} backtracks, {} leaves, {} solutions",
            self.backtracks,
            self.leaves,
            self.solutions.len()
        );
        SearchOutcome {
            solutions: self.solutions,
            backtracks: self.backtracks,
            leaves: self.leaves,
            interior: self.interior,
            stop,
        }
    }

    fn context(&self) -> Context<'_> {
        Context {
            config: self.config,
            timelines: &self.timelines,
            params: &self.params,
        }
    }

    fn budget_exceeded(&self) -> Option<StopReason> {
        let budget = &self.config.search;
        if self.solutions.len() >= budget.max_solutions {
            Some(StopReason::SolutionLimit)
        } else if self.backtracks >= budget.max_backtracks {
            Some(StopReason::BacktrackLimit)
        } else if self.since_solution >= budget.max_backtracks_without_solution
            || self.since_leaf >= budget.max_backtracks_without_leaf
        {
            Some(StopReason::NoProgress)
        } else {
            None
        }
    }

    /// Callers check the budget first; this call is always counted.
    fn descend(&mut self) -> ControlFlow<StopReason> {
        self.backtracks += 1;
        self.since_solution += 1;
        self.since_leaf += 1;
        let Some((voice, position)) = self.next_slot() else {
            self.leaf();
            return ControlFlow::Continue(());
        };
        self.interior += 1;

        for value in self.candidates(voice, position) {
            if let Some(reason) = self.budget_exceeded() {
                return ControlFlow::Break(reason);
            }
            self.place(voice, position, value);
            let flow = self.descend();
            self.unplace(voice);
            if flow.is_break() {
                return flow;
            }
        }
        ControlFlow::Continue(())
    }

    /// The earliest open position over all voices, ties broken at random.
    fn next_slot(&mut self) -> Option<(usize, Position)> {
        let open: Vec<(usize, Position)> = self
            .timelines
            .iter()
            .enumerate()
            .filter_map(|(voice, t)| t.next_open().map(|p| (voice, p)))
            .collect();
        let earliest = open.iter().map(|&(_, p)| p).min()?;
        let tied: Vec<(usize, Position)> = open.into_iter().filter(|&(_, p)| p == earliest).collect();
        self.rng.choose(&tied).copied()
    }

    /// Every note and rest the pipeline accepts at `position`, shuffled.
    fn candidates(&mut self, voice: usize, position: Position) -> Vec<RhythmicValue> {
        let pipeline = &self.config.pipeline;
        let ctx = self.context();
        if !pipeline.passes_index(&ctx, voice, position) {
            return Vec::new();
        }
        let timeline = ctx.timeline(voice);
        let mut out = Vec::new();
        for &pitch in &ctx.voice(voice).palette {
            if !pipeline.passes_insertion(&ctx, voice, position, pitch) {
                continue;
            }
            for duration in pipeline.valid_durations(&ctx, voice, position, pitch).iter() {
                if timeline.fits(position, duration) {
                    out.push(RhythmicValue::note(pitch, duration));
                }
            }
        }
        for duration in pipeline.rest_durations(&ctx, voice, position).iter() {
            if timeline.fits(position, duration) {
                out.push(RhythmicValue::rest(duration));
            }
        }
        self.rng.shuffle(&mut out);
        out
    }

    fn place(&mut self, voice: usize, position: Position, value: RhythmicValue) {
        let placed = self.timelines[voice].place(position, value);
        let before = self.params.voices[voice].flags;
        self.undo.push(before);
        let after = self
            .config
            .pipeline
            .mutate(&self.context(), voice, &placed, before);
        self.params.voices[voice].flags = after;
    }

    fn unplace(&mut self, voice: usize) {
        self.timelines[voice].unplace();
        let Some(flags) = self.undo.pop() else {
            panic!("flag snapshot stack underflow");
        };
        self.params.voices[voice].flags = flags;
    }

    fn leaf(&mut self) {
        self.leaves += 1;
        self.since_leaf = 0;
        if !self.config.pipeline.passes_final(&self.context()) {
            return;
        }
        self.since_solution = 0;
        self.solutions
            .push(self.timelines.iter().map(|t| t.values()).collect());
    }
}

/// Run one attempt to its budget.
pub fn search(
    config: &GeneratorConfig,
    params: AttemptParameters,
    rng: &mut SeededRng,
) -> SearchOutcome {
    Search::new(config, params, rng).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attempt::VoiceParameters;
    use crate::generator::{GeneratorConfig, VoiceSpec};
    use crate::mode::{Mode, VocalRange};
    use crate::pipeline::Pipeline;
    use crate::pitch::{DurationSet, Pitch};
    use crate::timeline::BeatGrid;
    use std::cell::Cell;

    fn whole_notes(_: &Context, _: usize, _: Position) -> DurationSet {
        DurationSet::of(&[8])
    }

    fn no_draw(_: &GeneratorConfig, _: &mut SeededRng) -> Option<AttemptParameters> {
        None
    }

    /// One voice, three bars of whole notes over a two-pitch palette, no
    /// constraints: the tree has exactly 2^3 leaves.
    fn tiny_config(budget: SearchBudget) -> (GeneratorConfig, AttemptParameters) {
        two_pitch_config(3, budget)
    }

    fn two_pitch_config(bars: usize, budget: SearchBudget) -> (GeneratorConfig, AttemptParameters) {
        let mut pipeline = Pipeline::empty();
        pipeline.durations.push(whole_notes);
        let mut config = GeneratorConfig::new(
            "test",
            Mode::Ionian,
            BeatGrid::open_ended(bars, &[0]),
            vec![VoiceSpec::free(VocalRange::Tenor)],
            pipeline,
            no_draw,
        );
        config.search = budget;
        let c = Pitch::natural(1, 4);
        let d = Pitch::natural(2, 4);
        let params = AttemptParameters {
            voices: vec![VoiceParameters::new(VocalRange::Tenor, c, d, vec![c, d])],
        };
        (config, params)
    }

    #[test]
    fn test_exhaustive_search_finds_every_leaf() {
        let budget = SearchBudget {
            max_solutions: 100,
            max_backtracks: 100,
            max_backtracks_without_solution: 100,
            max_backtracks_without_leaf: 100,
        };
        let (config, params) = tiny_config(budget);
        let mut rng = SeededRng::new(1);
        let outcome = search(&config, params, &mut rng);
        assert_eq!(outcome.stop, StopReason::Exhausted);
        assert_eq!(outcome.solutions.len(), 8);
        assert_eq!(outcome.leaves, 8);
        let mut unique = outcome.solutions.clone();
        unique.sort_by_key(|s| format!("{s:?}"));
        unique.dedup();
        assert_eq!(unique.len(), 8);
    }

    #[test]
    fn test_solution_limit_stops_search() {
        let budget = SearchBudget {
            max_solutions: 3,
            ..SearchBudget::default()
        };
        let (config, params) = tiny_config(budget);
        let mut rng = SeededRng::new(2);
        let outcome = search(&config, params, &mut rng);
        assert_eq!(outcome.stop, StopReason::SolutionLimit);
        assert_eq!(outcome.solutions.len(), 3);
    }

    #[test]
    fn test_backtrack_ceiling_respected() {
        let budget = SearchBudget {
            max_solutions: 100,
            max_backtracks: 2,
            max_backtracks_without_solution: 100,
            max_backtracks_without_leaf: 100,
        };
        let (config, params) = tiny_config(budget);
        let mut rng = SeededRng::new(3);
        let outcome = search(&config, params, &mut rng);
        assert_eq!(outcome.stop, StopReason::BacktrackLimit);
        assert_eq!(outcome.backtracks, 2);
    }

    thread_local! {
        static INTERIOR_SEEN: Cell<u64> = const { Cell::new(0) };
        static LEAVES_SEEN: Cell<u64> = const { Cell::new(0) };
    }

    fn count_interior(_: &Context, _: usize, _: Position) -> bool {
        INTERIOR_SEEN.with(|c| c.set(c.get() + 1));
        true
    }

    fn count_leaf(_: &Context) -> bool {
        LEAVES_SEEN.with(|c| c.set(c.get() + 1));
        true
    }

    /// Leaves and interior nodes both count against the ceiling, so a
    /// deep tree with a tiny ceiling never reaches a leaf.
    #[test]
    fn test_ceiling_bounds_every_call() {
        for ceiling in [0, 2, 5, 7, 20] {
            INTERIOR_SEEN.with(|c| c.set(0));
            LEAVES_SEEN.with(|c| c.set(0));
            let budget = SearchBudget {
                max_solutions: 100,
                max_backtracks: ceiling,
                max_backtracks_without_solution: 100,
                max_backtracks_without_leaf: 100,
            };
            let (mut config, params) = two_pitch_config(6, budget);
            config.pipeline.index.push(count_interior);
            config.pipeline.finals.push(count_leaf);
            let outcome = search(&config, params, &mut SeededRng::new(ceiling));
            let interior = INTERIOR_SEEN.with(Cell::get);
            let leaves = LEAVES_SEEN.with(Cell::get);
            assert!(interior + leaves <= ceiling, "{interior} + {leaves} > {ceiling}");
            assert_eq!(outcome.nodes_visited(), interior + leaves);
            assert_eq!(outcome.backtracks, interior + leaves);
            assert_eq!(outcome.leaves, leaves);
            assert_eq!(outcome.stop, StopReason::BacktrackLimit);
            // Six bars need seven calls to reach the first leaf.
            assert_eq!(leaves > 0, ceiling >= 7, "ceiling {ceiling}");
        }
    }

    #[test]
    fn test_same_seed_same_order() {
        let budget = SearchBudget {
            max_solutions: 100,
            max_backtracks: 100,
            max_backtracks_without_solution: 100,
            max_backtracks_without_leaf: 100,
        };
        let (config, params) = tiny_config(budget);
        let a = search(&config, params.clone(), &mut SeededRng::new(9));
        let b = search(&config, params, &mut SeededRng::new(9));
        assert_eq!(a.solutions, b.solutions);
    }

    #[test]
    fn test_fixed_material_is_placed_before_search() {
        let (mut config, mut params) = tiny_config(SearchBudget::default());
        let e = Pitch::natural(3, 4);
        let material = vec![RhythmicValue::note(e, 8); 3];
        config.voices.push(VoiceSpec::fixed(VocalRange::Alto, material.clone()));
        params
            .voices
            .push(VoiceParameters::fixed(VocalRange::Alto, &material));
        let outcome = search(&config, params, &mut SeededRng::new(4));
        assert!(!outcome.solutions.is_empty());
        for solution in &outcome.solutions {
            assert_eq!(solution[1], material);
        }
    }
}
