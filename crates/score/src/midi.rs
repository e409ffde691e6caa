//! Event compilation: beat-relative note lists to MIDI tracks.
//!
//! Output is Standard MIDI File (SMF) format 0, one track per instrument.
//! Compilation is pure and deterministic: the same instrument and tempo
//! always produce byte-identical output.

use crate::model::{InstrumentSpec, ProgramRef};
use crate::{validate, ScoreError};

/// Largest absolute tick: delta-times encode as at most four VLQ bytes.
const MAX_TICK: u32 = 0x0FFF_FFFF;

/// One delta-encoded track event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEvent {
    /// Ticks since the previous event in the track.
    pub delta: u32,
    /// Raw event bytes: status + payload, or a complete meta event.
    pub data: Vec<u8>,
}

/// A compiled single-instrument track.
///
/// Events are fully ordered and delta-encoded; the end-of-track meta event
/// is always last.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTrack {
    ticks_per_beat: u16,
    events: Vec<TrackEvent>,
}

impl CompiledTrack {
    /// The division this track was compiled at, in ticks per quarter note.
    pub fn ticks_per_beat(&self) -> u16 {
        self.ticks_per_beat
    }

    /// The ordered events, end-of-track last.
    pub fn events(&self) -> &[TrackEvent] {
        &self.events
    }

    /// Serialize to a complete SMF format 0 file.
    pub fn to_bytes(&self) -> Vec<u8> {
        let track = self.track_bytes();

        let mut out = Vec::with_capacity(track.len() + 22);

        // Header chunk: MThd
        out.extend_from_slice(b"MThd");
        out.extend_from_slice(&6u32.to_be_bytes()); // chunk length
        out.extend_from_slice(&0u16.to_be_bytes()); // format 0
        out.extend_from_slice(&1u16.to_be_bytes()); // 1 track
        out.extend_from_slice(&self.ticks_per_beat.to_be_bytes());

        // Track chunk: MTrk
        out.extend_from_slice(b"MTrk");
        out.extend_from_slice(&(track.len() as u32).to_be_bytes());
        out.extend(track);

        out
    }

    /// Raw MTrk payload: VLQ delta then event bytes, for every event.
    pub fn track_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for event in &self.events {
            out.extend(encode_vlq(event.delta));
            out.extend_from_slice(&event.data);
        }
        out
    }
}

/// Compile one instrument into a delta-encoded MIDI track.
///
/// Emits a tempo meta event (`60_000_000 / bpm` microseconds per beat), a
/// track-name meta event when the instrument is named, a program-change
/// unless the instrument is percussion, then every note flattened into
/// note-on/note-off pairs. Events sort by absolute tick with note-offs
/// ahead of note-ons at a shared tick, so a note ending exactly where
/// another begins never masks the new onset.
pub fn compile(
    instrument: &InstrumentSpec,
    tempo: u16,
    ticks_per_beat: u16,
) -> Result<CompiledTrack, ScoreError> {
    validate::validate_tempo(tempo)?;
    if ticks_per_beat == 0 {
        return Err(ScoreError::invalid(
            "ticks_per_beat",
            "must be greater than zero",
        ));
    }
    validate::validate_instrument(instrument, "")?;

    let mut writer = TrackWriter::new(instrument.midi_channel());

    writer.tempo(tempo);
    if !instrument.name.is_empty() {
        writer.track_name(&instrument.name);
    }
    if let ProgramRef::Melodic(program) = instrument.program {
        writer.program_change(program);
    }

    // Patterns share one timeline; starts are absolute beat offsets
    for (p, pattern) in instrument.patterns.iter().enumerate() {
        for (n, note) in pattern.notes.iter().enumerate() {
            let on = beats_to_ticks(note.start, ticks_per_beat);
            let off = beats_to_ticks(note.start + note.duration, ticks_per_beat);
            if off > MAX_TICK {
                let field = if on > MAX_TICK { "start" } else { "duration" };
                return Err(ScoreError::invalid(
                    format!("patterns[{p}].notes[{n}].{field}"),
                    format!("exceeds the last encodable tick {MAX_TICK}"),
                ));
            }
            writer.note_on(on, note.pitch, note.velocity);
            writer.note_off(off, note.pitch);
        }
    }

    let events = writer.finish()?;
    Ok(CompiledTrack {
        ticks_per_beat,
        events,
    })
}

/// Beat offsets round to the nearest tick.
fn beats_to_ticks(beats: f64, ticks_per_beat: u16) -> u32 {
    (beats * ticks_per_beat as f64).round() as u32
}

/// Ordering class for events that share a tick: setup metas first, then
/// note-offs, then note-ons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EventClass {
    Setup,
    NoteOff,
    NoteOn,
}

struct TimedEvent {
    tick: u32,
    class: EventClass,
    data: Vec<u8>,
}

/// Accumulates absolute-tick events, then settles them into delta order.
struct TrackWriter {
    channel: u8,
    events: Vec<TimedEvent>,
}

impl TrackWriter {
    fn new(channel: u8) -> Self {
        TrackWriter {
            channel: channel & 0x0F,
            events: Vec::new(),
        }
    }

    fn tempo(&mut self, bpm: u16) {
        let us_per_beat = 60_000_000u32 / bpm as u32;
        self.meta(
            0x51,
            vec![
                ((us_per_beat >> 16) & 0xFF) as u8,
                ((us_per_beat >> 8) & 0xFF) as u8,
                (us_per_beat & 0xFF) as u8,
            ],
        );
    }

    fn track_name(&mut self, name: &str) {
        self.meta(0x03, name.as_bytes().to_vec());
    }

    fn program_change(&mut self, program: u8) {
        self.push(
            0,
            EventClass::Setup,
            vec![0xC0 | self.channel, program & 0x7F],
        );
    }

    fn note_on(&mut self, tick: u32, pitch: u8, velocity: u8) {
        self.push(
            tick,
            EventClass::NoteOn,
            vec![0x90 | self.channel, pitch, velocity],
        );
    }

    fn note_off(&mut self, tick: u32, pitch: u8) {
        self.push(tick, EventClass::NoteOff, vec![0x80 | self.channel, pitch, 0]);
    }

    fn meta(&mut self, meta_type: u8, data: Vec<u8>) {
        let mut bytes = vec![0xFF, meta_type];
        bytes.extend(encode_vlq(data.len() as u32));
        bytes.extend(data);
        self.push(0, EventClass::Setup, bytes);
    }

    fn push(&mut self, tick: u32, class: EventClass, data: Vec<u8>) {
        self.events.push(TimedEvent { tick, class, data });
    }

    fn finish(mut self) -> Result<Vec<TrackEvent>, ScoreError> {
        // Stable sort: equal (tick, class) keeps note input order
        self.events.sort_by_key(|e| (e.tick, e.class));

        let mut out = Vec::with_capacity(self.events.len() + 1);
        let mut last_tick = 0u32;
        for event in self.events {
            let delta = event
                .tick
                .checked_sub(last_tick)
                .ok_or(ScoreError::EventOrder {
                    prev: last_tick,
                    tick: event.tick,
                })?;
            last_tick = event.tick;
            out.push(TrackEvent {
                delta,
                data: event.data,
            });
        }

        // End of track
        out.push(TrackEvent {
            delta: 0,
            data: vec![0xFF, 0x2F, 0x00],
        });
        Ok(out)
    }
}

/// Encode a value as a MIDI variable-length quantity.
fn encode_vlq(value: u32) -> Vec<u8> {
    let mut bytes = vec![(value & 0x7F) as u8];
    let mut rest = value >> 7;
    while rest > 0 {
        bytes.push(((rest & 0x7F) | 0x80) as u8);
        rest >>= 7;
    }
    bytes.reverse();
    bytes
}
