// Per-voice timeline with multi-beat occupancy.
//
// Each voice is laid out on a grid of addressable positions (bar plus an
// offset in eighth notes). A variant picks which offsets exist: whole-note
// species only address downbeats, florid counterpoint addresses beats
// 0, 1, 1.5, 2 and 3 (offsets 0, 2, 3, 4, 6). In a closing grid the last bar
// holds a single position for the final note.
//
// Every grid position is in exactly one state:
// - Open: not yet reached by the search
// - Filled: a note or rest starts here
// - Buried: covered by a longer note that started earlier
//
// Placing a value of duration d at p fills p and buries every grid position
// strictly inside [p, p + d). Removing the value unburies exactly those
// positions. The engine only ever places at the earliest open position and
// removes in reverse order, so the open positions form a stack (earliest on
// top) and the burial records form a second stack; both are restored
// bit-for-bit on removal. Breaking the LIFO discipline is a programming
// error and panics.

use crate::pitch::{Pitch, RhythmicValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Eighth notes per bar (4/2 time counted in eighths).
pub const EIGHTHS_PER_BAR: usize = 8;

/// Offsets of the beats the variants address.
pub const BEAT_1: u8 = 2;
pub const BEAT_1_AND: u8 = 3;
pub const BEAT_2: u8 = 4;
pub const BEAT_3: u8 = 6;

/// A bar and an offset into it in eighth notes. Ordered by (bar, offset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub bar: usize,
    pub offset: u8,
}

impl Position {
    pub fn new(bar: usize, offset: u8) -> Self {
        assert!(
            (offset as usize) < EIGHTHS_PER_BAR,
            "offset {offset} outside the bar"
        );
        Position { bar, offset }
    }

    pub fn downbeat(bar: usize) -> Self {
        Position { bar, offset: 0 }
    }

    /// Absolute time in eighth notes from the start of the piece.
    pub fn eighths(self) -> usize {
        self.bar * EIGHTHS_PER_BAR + self.offset as usize
    }

    pub fn from_eighths(eighths: usize) -> Self {
        Position {
            bar: eighths / EIGHTHS_PER_BAR,
            offset: (eighths % EIGHTHS_PER_BAR) as u8,
        }
    }

    /// Position `eighths` later.
    pub fn advance(self, eighths: usize) -> Self {
        Position::from_eighths(self.eighths() + eighths)
    }

    /// Position `eighths` earlier, or `None` before the start.
    pub fn rewind(self, eighths: usize) -> Option<Self> {
        self.eighths().checked_sub(eighths).map(Position::from_eighths)
    }

    pub fn is_downbeat(self) -> bool {
        self.offset == 0
    }

    /// Beat number in quarter notes, e.g. 1.5 for offset 3.
    pub fn beat(self) -> f32 {
        self.offset as f32 / 2.0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.bar, self.beat())
    }
}

/// The set of addressable positions for one voice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeatGrid {
    pub bars: usize,
    pub offsets: Vec<u8>,
    /// A closing grid reserves the last bar for a single final note.
    pub closing: bool,
}

impl BeatGrid {
    pub fn closing(bars: usize, offsets: &[u8]) -> Self {
        BeatGrid {
            bars,
            offsets: offsets.to_vec(),
            closing: true,
        }
    }

    pub fn open_ended(bars: usize, offsets: &[u8]) -> Self {
        BeatGrid {
            bars,
            offsets: offsets.to_vec(),
            closing: false,
        }
    }

    /// Every addressable position in chronological order.
    pub fn positions(&self) -> Vec<Position> {
        let full_bars = if self.closing {
            self.bars.saturating_sub(1)
        } else {
            self.bars
        };
        let mut out: Vec<Position> = (0..full_bars)
            .flat_map(|bar| self.offsets.iter().map(move |&o| Position::new(bar, o)))
            .collect();
        if self.closing && self.bars > 0 {
            out.push(Position::downbeat(self.bars - 1));
        }
        out
    }

    /// The final position of a closing grid.
    pub fn final_position(&self) -> Option<Position> {
        (self.closing && self.bars > 0).then(|| Position::downbeat(self.bars - 1))
    }

    pub fn is_final(&self, position: Position) -> bool {
        self.final_position() == Some(position)
    }

    /// Time (in eighths) at which material on this grid may end.
    fn end_eighths(&self) -> usize {
        if self.closing {
            (self.bars.saturating_sub(1)) * EIGHTHS_PER_BAR
        } else {
            self.bars * EIGHTHS_PER_BAR
        }
    }
}

/// A value that has been placed on a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placed {
    pub position: Position,
    pub value: RhythmicValue,
}

impl Placed {
    pub fn end(&self) -> Position {
        self.position.advance(self.value.duration() as usize)
    }

    pub fn pitch(&self) -> Option<Pitch> {
        self.value.pitch()
    }

    pub fn duration(&self) -> u8 {
        self.value.duration()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Open,
    Filled,
    Buried,
}

/// One voice's positions, placed values and undo records.
#[derive(Debug, Clone)]
pub struct Timeline {
    grid: BeatGrid,
    positions: Vec<Position>,
    states: Vec<SlotState>,
    entities: Vec<Placed>,
    /// Indices into `positions`, earliest open position last.
    open: Vec<usize>,
    /// Indices buried by each placement, one record per entity.
    burials: Vec<Vec<usize>>,
}

impl Timeline {
    pub fn new(grid: BeatGrid) -> Self {
        let positions = grid.positions();
        let states = vec![SlotState::Open; positions.len()];
        let open = (0..positions.len()).rev().collect();
        Timeline {
            grid,
            positions,
            states,
            entities: Vec::new(),
            open,
            burials: Vec::new(),
        }
    }

    /// A timeline holding `values` laid end to end. Panics if they do not
    /// tile the grid.
    pub fn from_values(grid: BeatGrid, values: &[RhythmicValue]) -> Self {
        let mut timeline = Timeline::new(grid);
        for &value in values {
            let Some(position) = timeline.next_open() else {
                panic!("more values than open positions");
            };
            timeline.place(position, value);
        }
        timeline
    }

    pub fn grid(&self) -> &BeatGrid {
        &self.grid
    }

    /// Earliest open position, `None` when the voice is complete.
    pub fn next_open(&self) -> Option<Position> {
        self.open.last().map(|&i| self.positions[i])
    }

    pub fn is_complete(&self) -> bool {
        self.open.is_empty()
    }

    /// Whether a value of `duration` placed at `position` ends on a grid
    /// position (or at the end of the piece).
    pub fn fits(&self, position: Position, duration: u8) -> bool {
        if self.grid.is_final(position) {
            return true;
        }
        let end = position.eighths() + duration as usize;
        if end == self.grid.end_eighths() {
            return true;
        }
        end < self.grid.end_eighths()
            && self
                .positions
                .binary_search(&Position::from_eighths(end))
                .is_ok()
    }

    /// Place `value` at the earliest open position, burying the positions
    /// it covers. Panics if `position` is not the earliest open position.
    pub fn place(&mut self, position: Position, value: RhythmicValue) -> Placed {
        let Some(index) = self.open.pop() else {
            panic!("place at {position}: timeline is complete");
        };
        assert_eq!(
            self.positions[index], position,
            "placement out of order: expected {}, got {position}",
            self.positions[index]
        );
        self.states[index] = SlotState::Filled;

        let end = position.eighths() + value.duration() as usize;
        let mut buried = Vec::new();
        while let Some(&next) = self.open.last() {
            if self.positions[next].eighths() >= end {
                break;
            }
            self.open.pop();
            self.states[next] = SlotState::Buried;
            buried.push(next);
        }
        self.burials.push(buried);

        let placed = Placed { position, value };
        self.entities.push(placed);
        placed
    }

    /// Remove the most recent placement and unbury what it covered.
    pub fn unplace(&mut self) -> Placed {
        let (Some(placed), Some(buried)) = (self.entities.pop(), self.burials.pop()) else {
            panic!("unplace on an empty timeline");
        };
        for &index in buried.iter().rev() {
            self.states[index] = SlotState::Open;
            self.open.push(index);
        }
        let Ok(index) = self.positions.binary_search(&placed.position) else {
            panic!("placed value at {} is off the grid", placed.position);
        };
        self.states[index] = SlotState::Open;
        self.open.push(index);
        placed
    }

    pub fn entities(&self) -> &[Placed] {
        &self.entities
    }

    pub fn values(&self) -> Vec<RhythmicValue> {
        self.entities.iter().map(|p| p.value).collect()
    }

    pub fn last(&self) -> Option<&Placed> {
        self.entities.last()
    }

    /// The value starting exactly at `position`.
    pub fn at(&self, position: Position) -> Option<&Placed> {
        self.entities
            .binary_search_by(|p| p.position.cmp(&position))
            .ok()
            .map(|i| &self.entities[i])
    }

    /// The value sounding (started and not yet ended) at `position`.
    pub fn sounding_at(&self, position: Position) -> Option<&Placed> {
        let i = self.entities.partition_point(|p| p.position <= position);
        let placed = self.entities.get(i.checked_sub(1)?)?;
        let ends_after = placed.end() > position || self.grid.is_final(placed.position);
        ends_after.then_some(placed)
    }

    /// The pitch sounding at `position`, `None` for rests and unplaced time.
    pub fn pitch_at(&self, position: Position) -> Option<Pitch> {
        self.sounding_at(position).and_then(|p| p.pitch())
    }

    /// The most recent `n` placed notes (rests skipped), oldest first.
    pub fn recent_pitches(&self, n: usize) -> Vec<Pitch> {
        let mut out: Vec<Pitch> = self
            .entities
            .iter()
            .rev()
            .filter_map(|p| p.pitch())
            .take(n)
            .collect();
        out.reverse();
        out
    }

    /// Every placed note in order, rests skipped.
    pub fn pitches(&self) -> Vec<Pitch> {
        self.entities.iter().filter_map(|p| p.pitch()).collect()
    }

    pub fn state(&self, position: Position) -> Option<SlotState> {
        self.positions
            .binary_search(&position)
            .ok()
            .map(|i| self.states[i])
    }

    /// Open positions, earliest first.
    pub fn open_positions(&self) -> Vec<Position> {
        self.open.iter().rev().map(|&i| self.positions[i]).collect()
    }

    pub fn all_positions(&self) -> &[Position] {
        &self.positions
    }
}
