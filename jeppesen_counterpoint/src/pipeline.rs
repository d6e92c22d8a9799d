// Constraint pipeline: ordered lists of predicates a variant assembles.
//
// A variant's style is data: a `Pipeline` holds plain function pointers in
// several ordered lists, and the engine runs them at fixed points of the
// search. The kinds are:
//
// - index checks: may the search continue at this position at all?
//   (deadlines for the lowest and highest pitch, theme entry)
// - melodic and harmonic insertion checks: is this pitch acceptable here?
//   Melodic checks look at one voice's own past; harmonic checks compare it
//   with the other voices at or before the same time.
// - duration sources: the durations (and rest durations) on offer at a
//   position
// - rhythmic and harmonic-rhythmic filters: shrink the candidate duration
//   set for a chosen pitch
// - mutations: update a voice's `VoiceFlags` after a placement
// - final checks: whole-line acceptance once every voice is complete
// - scores: penalties summed over a finished solution, lower is better
//
// Lists run in registration order and stop at the first rejection. Every
// predicate receives a read-only `Context`; none may mutate search state.
// Checks must only read positions at or before the one being filled, except
// in frozen voices, which are placed in full before the search starts.

use crate::attempt::{AttemptParameters, VoiceFlags, VoiceParameters};
use crate::generator::GeneratorConfig;
use crate::intervals::LegalIntervals;
use crate::mode::ModeResolver;
use crate::pitch::{DurationSet, Pitch};
use crate::rules::{final_checks, melodic, rhythmic, state};
use crate::timeline::{Placed, Position, Timeline};

/// Read-only view of the search handed to every predicate.
pub struct Context<'a> {
    pub config: &'a GeneratorConfig,
    pub timelines: &'a [Timeline],
    pub params: &'a AttemptParameters,
}

impl<'a> Context<'a> {
    pub fn legal(&self) -> &'a LegalIntervals {
        &self.config.legal
    }

    pub fn resolver(&self) -> &'a ModeResolver {
        &self.config.resolver
    }

    /// Length of the piece in bars.
    pub fn length(&self) -> usize {
        self.config.grid.bars
    }

    pub fn voice_count(&self) -> usize {
        self.timelines.len()
    }

    pub fn timeline(&self, voice: usize) -> &'a Timeline {
        &self.timelines[voice]
    }

    pub fn voice(&self, voice: usize) -> &'a VoiceParameters {
        &self.params.voices[voice]
    }

    pub fn flags(&self, voice: usize) -> VoiceFlags {
        self.params.voices[voice].flags
    }

    /// Every voice except `voice`.
    pub fn others(&self, voice: usize) -> impl Iterator<Item = usize> + 'a {
        (0..self.timelines.len()).filter(move |&v| v != voice)
    }

    pub fn is_final_position(&self, position: Position) -> bool {
        self.config.grid.is_final(position)
    }

    /// The pitch immediately preceding the next placement in `voice`.
    /// `None` at the start or directly after a rest.
    pub fn previous_note(&self, voice: usize) -> Option<Pitch> {
        self.timelines[voice].last().and_then(|p| p.pitch())
    }

    /// The most recent placement in `voice`, note or rest.
    pub fn previous(&self, voice: usize) -> Option<&'a Placed> {
        self.timelines[voice].last()
    }

    /// Whether `voice` has sounded no notes yet.
    pub fn is_first_note(&self, voice: usize) -> bool {
        self.timelines[voice]
            .entities()
            .iter()
            .all(|p| p.value.is_rest())
    }

    /// Pitch sounding in `voice` at `position`.
    pub fn pitch_at(&self, voice: usize, position: Position) -> Option<Pitch> {
        self.timelines[voice].pitch_at(position)
    }

    /// Pitch of the note that starts exactly at `position` in `voice`.
    pub fn onset_at(&self, voice: usize, position: Position) -> Option<Pitch> {
        self.timelines[voice].at(position).and_then(|p| p.pitch())
    }

    /// Pitch sounding in `voice` one eighth before `position`.
    pub fn pitch_before(&self, voice: usize, position: Position) -> Option<Pitch> {
        position.rewind(1).and_then(|p| self.pitch_at(voice, p))
    }

    /// `(other voice, its pitch)` for each voice sounding at `position`.
    pub fn sounding_with(&self, voice: usize, position: Position) -> Vec<(usize, Pitch)> {
        self.others(voice)
            .filter_map(|v| self.pitch_at(v, position).map(|p| (v, p)))
            .collect()
    }

    /// `(other voice, its pitch)` for each voice with an onset at `position`.
    pub fn onsets_with(&self, voice: usize, position: Position) -> Vec<(usize, Pitch)> {
        self.others(voice)
            .filter_map(|v| self.onset_at(v, position).map(|p| (v, p)))
            .collect()
    }
}

pub type IndexCheck = fn(&Context, usize, Position) -> bool;
pub type PitchCheck = fn(&Context, usize, Position, Pitch) -> bool;
pub type DurationSource = fn(&Context, usize, Position) -> DurationSet;
pub type DurationFilter = fn(&Context, usize, Position, Pitch, DurationSet) -> DurationSet;
pub type Mutation = fn(&Context, usize, &Placed, VoiceFlags) -> VoiceFlags;
pub type FinalCheck = fn(&Context) -> bool;
pub type ScoreFn = fn(&Context) -> i64;

/// Ordered predicate lists for one variant.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub index: Vec<IndexCheck>,
    pub melodic: Vec<PitchCheck>,
    pub harmonic: Vec<PitchCheck>,
    /// Durations on offer before filtering. Sources are unioned.
    pub durations: Vec<DurationSource>,
    pub rhythmic: Vec<DurationFilter>,
    pub harmonic_rhythmic: Vec<DurationFilter>,
    /// Rest durations on offer. Sources are unioned.
    pub rests: Vec<DurationSource>,
    pub mutations: Vec<Mutation>,
    pub finals: Vec<FinalCheck>,
    pub scores: Vec<ScoreFn>,
}

impl Pipeline {
    /// An empty pipeline: every pitch is legal and no durations are offered.
    pub fn empty() -> Self {
        Pipeline {
            index: Vec::new(),
            melodic: Vec::new(),
            harmonic: Vec::new(),
            durations: Vec::new(),
            rhythmic: Vec::new(),
            harmonic_rhythmic: Vec::new(),
            rests: Vec::new(),
            mutations: Vec::new(),
            finals: Vec::new(),
            scores: Vec::new(),
        }
    }

    /// The defaults every variant starts from: extremes must appear by their
    /// deadlines, melodic intervals must be legal, the highest pitch sounds
    /// once, florid durations with an opening half rest.
    pub fn base() -> Self {
        let mut pipeline = Pipeline::empty();
        pipeline.index.push(state::extremes_by_deadline);
        pipeline.melodic.push(melodic::valid_melodic_interval);
        pipeline.melodic.push(melodic::prevent_highest_duplicates);
        pipeline.durations.push(rhythmic::default_durations);
        pipeline.rests.push(rhythmic::opening_half_rest);
        pipeline.mutations.push(state::track_extremes);
        pipeline.finals.push(final_checks::extremes_placed);
        pipeline
    }

    pub fn passes_index(&self, ctx: &Context, voice: usize, position: Position) -> bool {
        self.index.iter().all(|check| check(ctx, voice, position))
    }

    /// Melodic checks, then harmonic checks, stopping at the first failure.
    pub fn passes_insertion(
        &self,
        ctx: &Context,
        voice: usize,
        position: Position,
        pitch: Pitch,
    ) -> bool {
        self.melodic
            .iter()
            .chain(self.harmonic.iter())
            .all(|check| check(ctx, voice, position, pitch))
    }

    /// Durations for `pitch` at `position` after every filter. Stops as soon
    /// as the set is empty.
    pub fn valid_durations(
        &self,
        ctx: &Context,
        voice: usize,
        position: Position,
        pitch: Pitch,
    ) -> DurationSet {
        let mut durations = self.available(ctx, voice, position);
        for filter in self.rhythmic.iter().chain(self.harmonic_rhythmic.iter()) {
            if durations.is_empty() {
                break;
            }
            durations = filter(ctx, voice, position, pitch, durations);
        }
        durations
    }

    pub fn available(&self, ctx: &Context, voice: usize, position: Position) -> DurationSet {
        union(&self.durations, ctx, voice, position)
    }

    pub fn rest_durations(&self, ctx: &Context, voice: usize, position: Position) -> DurationSet {
        union(&self.rests, ctx, voice, position)
    }

    /// Fold every mutation over the flags a placement started from.
    pub fn mutate(
        &self,
        ctx: &Context,
        voice: usize,
        placed: &Placed,
        flags: VoiceFlags,
    ) -> VoiceFlags {
        self.mutations
            .iter()
            .fold(flags, |flags, mutation| mutation(ctx, voice, placed, flags))
    }

    pub fn passes_final(&self, ctx: &Context) -> bool {
        self.finals.iter().all(|check| check(ctx))
    }

    pub fn score(&self, ctx: &Context) -> i64 {
        self.scores.iter().map(|score| score(ctx)).sum()
    }
}

fn union(
    sources: &[DurationSource],
    ctx: &Context,
    voice: usize,
    position: Position,
) -> DurationSet {
    sources
        .iter()
        .flat_map(|source| source(ctx, voice, position).iter())
        .collect()
}
