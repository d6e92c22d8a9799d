// MIDI output from solutions.
//
// Converts a Solution into a Standard MIDI File (SMF) for playback. Each
// voice maps to its own track and channel, named after its vocal range and
// voiced as choir aahs. One eighth of duration is 240 ticks at 480 ticks
// per quarter; rests only advance time.
//
// Uses the `midly` crate for MIDI writing. Output is SMF Format 1 (multi-track)
// with a tempo track first.

use crate::error::Result;
use crate::generator::Solution;
use crate::mode::VocalRange;
use crate::pitch::RhythmicValue;
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;

/// Ticks per quarter note in MIDI output.
const TICKS_PER_QUARTER: u16 = 480;

/// Ticks per eighth note (half a quarter note).
const TICKS_PER_EIGHTH: u32 = TICKS_PER_QUARTER as u32 / 2;

/// General MIDI choir aahs.
const CHOIR_AAHS: u8 = 52;

const VELOCITY: u8 = 80;

/// Convert a solution to MIDI and write it to a file. `ranges` names the
/// voices, bottom first like the solution.
pub fn write_midi(
    solution: &Solution,
    ranges: &[VocalRange],
    tempo_bpm: u16,
    path: &Path,
) -> Result<()> {
    let smf = solution_to_smf(solution, ranges, tempo_bpm);
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    std::fs::write(path, &buf)?;
    Ok(())
}

/// Convert a solution to an in-memory SMF.
pub fn solution_to_smf(solution: &Solution, ranges: &[VocalRange], tempo_bpm: u16) -> Smf<'static> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    // Track 0: tempo track
    let tempo_microseconds = 60_000_000 / tempo_bpm.max(1) as u32;
    smf.tracks.push(vec![
        meta(0, MetaMessage::Tempo(u24::new(tempo_microseconds))),
        meta(0, MetaMessage::EndOfTrack),
    ]);

    for (index, values) in solution.voices.iter().enumerate() {
        let name = ranges.get(index).map_or("Voice", |r| r.name());
        let channel = u4::new((index % 16) as u8);
        smf.tracks.push(voice_track(values, name, channel));
    }
    smf
}

fn meta(delta: u32, message: MetaMessage<'static>) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Meta(message),
    }
}

fn midi(delta: u32, channel: u4, message: MidiMessage) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Midi { channel, message },
    }
}

fn voice_track(values: &[RhythmicValue], name: &'static str, channel: u4) -> Track<'static> {
    let mut track: Track<'static> = vec![
        meta(0, MetaMessage::TrackName(name.as_bytes())),
        midi(
            0,
            channel,
            MidiMessage::ProgramChange {
                program: u7::new(CHOIR_AAHS),
            },
        ),
    ];

    // Ticks since the last event; rests accumulate here.
    let mut pending: u32 = 0;
    for value in values {
        let ticks = value.duration() as u32 * TICKS_PER_EIGHTH;
        let Some(pitch) = value.pitch() else {
            pending += ticks;
            continue;
        };
        let key = u7::new(pitch.midi_key());
        track.push(midi(
            pending,
            channel,
            MidiMessage::NoteOn {
                key,
                vel: u7::new(VELOCITY),
            },
        ));
        track.push(midi(ticks, channel, MidiMessage::NoteOff { key, vel: u7::new(0) }));
        pending = 0;
    }

    track.push(meta(pending, MetaMessage::EndOfTrack));
    track
}
