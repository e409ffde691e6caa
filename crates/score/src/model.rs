//! Music description data model.
//!
//! These types mirror the JSON wire format produced by the composition step:
//! a titled, tempo-tagged set of instruments, each carrying beat-relative
//! note lists grouped into patterns.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// MIDI channel reserved for General MIDI percussion (0-indexed channel 10).
pub const PERCUSSION_CHANNEL: u8 = 9;

/// A complete composition description, the unit of one generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicDescription {
    /// Display title, also the basis of the output directory name.
    pub title: String,
    /// Beats per minute, must be at least 4.
    pub tempo: u16,
    /// Musical key label. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Informational; event timing is beat-relative and ignores the meter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_signature: Option<TimeSignature>,
    pub instruments: Vec<InstrumentSpec>,
}

impl MusicDescription {
    pub fn new(title: impl Into<String>, tempo: u16) -> Self {
        MusicDescription {
            title: title.into(),
            tempo,
            key: None,
            time_signature: None,
            instruments: Vec::new(),
        }
    }

    pub fn with_instrument(mut self, instrument: InstrumentSpec) -> Self {
        self.instruments.push(instrument);
        self
    }
}

/// Time signature as (numerator, denominator).
///
/// Wire format is a two-element array, e.g. `[4, 4]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature(pub u8, pub u8);

/// One instrument's definition: program selection, channel, and notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSpec {
    pub program: ProgramRef,
    /// Display/track name. May be empty on the wire.
    #[serde(default)]
    pub name: String,
    /// Intended playback soundfont; becomes the output file's base name.
    /// Falls back to `name`, then to a generated label, when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soundfont_name: Option<String>,
    /// MIDI channel 0-15. Channel 9 is reserved for percussion by GM
    /// convention; melodic instruments declaring it are honored as-is.
    #[serde(default)]
    pub channel: u8,
    #[serde(default)]
    pub patterns: Vec<Pattern>,
}

impl InstrumentSpec {
    /// New instrument with an empty timeline on channel 0.
    pub fn new(program: ProgramRef, name: impl Into<String>) -> Self {
        InstrumentSpec {
            program,
            name: name.into(),
            soundfont_name: None,
            channel: 0,
            patterns: Vec::new(),
        }
    }

    pub fn with_soundfont(mut self, soundfont_name: impl Into<String>) -> Self {
        self.soundfont_name = Some(soundfont_name.into());
        self
    }

    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    /// The channel events are emitted on: the declared channel for melodic
    /// instruments, always 9 for percussion.
    pub fn midi_channel(&self) -> u8 {
        match self.program {
            ProgramRef::Percussion => PERCUSSION_CHANNEL,
            ProgramRef::Melodic(_) => self.channel,
        }
    }
}

/// General MIDI program selector.
///
/// Percussion is channel-selected rather than program-selected: it forces
/// channel 9 and suppresses the program-change event. The wire format is a
/// program number 0-127 or the literal string `"percussion"`, resolved here
/// once so nothing downstream compares strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramRef {
    Melodic(u8),
    Percussion,
}

impl ProgramRef {
    pub fn is_percussion(&self) -> bool {
        matches!(self, ProgramRef::Percussion)
    }
}

impl Serialize for ProgramRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ProgramRef::Melodic(program) => serializer.serialize_u8(*program),
            ProgramRef::Percussion => serializer.serialize_str("percussion"),
        }
    }
}

impl<'de> Deserialize<'de> for ProgramRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ProgramRefVisitor;

        impl Visitor<'_> for ProgramRefVisitor {
            type Value = ProgramRef;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a program number 0-127 or the string \"percussion\"")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<ProgramRef, E> {
                if value <= 127 {
                    Ok(ProgramRef::Melodic(value as u8))
                } else {
                    Err(E::custom(format!("program {} out of range 0-127", value)))
                }
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<ProgramRef, E> {
                if (0..=127).contains(&value) {
                    Ok(ProgramRef::Melodic(value as u8))
                } else {
                    Err(E::custom(format!("program {} out of range 0-127", value)))
                }
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<ProgramRef, E> {
                if value.eq_ignore_ascii_case("percussion") {
                    Ok(ProgramRef::Percussion)
                } else {
                    Err(E::custom(format!("unknown program name {:?}", value)))
                }
            }
        }

        deserializer.deserialize_any(ProgramRefVisitor)
    }
}

/// A named group of notes.
///
/// Grouping is descriptive (melody, bassline, rhythm); all of an
/// instrument's patterns share one beat timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    #[serde(rename = "type", default)]
    pub pattern_type: String,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl Pattern {
    pub fn with_notes(pattern_type: impl Into<String>, notes: Vec<Note>) -> Self {
        Pattern {
            pattern_type: pattern_type.into(),
            notes,
        }
    }
}

/// A single timed note. `start` and `duration` are in beats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// MIDI note number 0-127 (60 = middle C).
    pub pitch: u8,
    /// Beat offset from the instrument's timeline origin. Non-negative.
    pub start: f64,
    /// Length in beats. Must be positive.
    pub duration: f64,
    /// MIDI velocity 1-127.
    pub velocity: u8,
}

impl Note {
    pub fn new(pitch: u8, start: f64, duration: f64, velocity: u8) -> Self {
        Note {
            pitch,
            start,
            duration,
            velocity,
        }
    }
}
