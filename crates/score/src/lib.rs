//! Music description to MIDI compiler.
//!
//! This crate takes a declarative composition (title, tempo, instruments
//! with beat-relative note lists) and renders one Standard MIDI File per
//! instrument, each named after the soundfont it is meant to play on.
//!
//! # Example
//!
//! ```
//! use score::{compile, InstrumentSpec, Note, Pattern, ProgramRef, DEFAULT_TICKS_PER_BEAT};
//!
//! # fn main() -> Result<(), score::ScoreError> {
//! let piano = InstrumentSpec::new(ProgramRef::Melodic(0), "Piano")
//!     .with_soundfont("Grand Piano")
//!     .with_pattern(Pattern::with_notes(
//!         "melody",
//!         vec![Note::new(60, 0.0, 1.0, 80)],
//!     ));
//!
//! let track = compile(&piano, 120, DEFAULT_TICKS_PER_BEAT)?;
//! let midi = track.to_bytes();
//! // midi is a valid SMF format 0 file
//! # Ok(())
//! # }
//! ```

pub mod midi;
pub mod model;
pub mod render;
mod validate;

pub use midi::{compile, CompiledTrack, TrackEvent};
pub use model::*;
pub use render::{generate_separate, InstrumentResult};

use std::path::PathBuf;

use thiserror::Error;

/// Default MIDI resolution in ticks per quarter note.
pub const DEFAULT_TICKS_PER_BEAT: u16 = 480;

/// Errors from description validation, event compilation, or file output.
#[derive(Debug, Error)]
pub enum ScoreError {
    /// A mandatory field of the music description is absent or blank.
    #[error("missing required field in music description: {0}")]
    MissingField(&'static str),

    /// A field value breaks the model invariants.
    #[error("invalid {field}: {message}")]
    InvalidField { field: String, message: String },

    /// Event ordering regressed during delta encoding. Unreachable for
    /// validated input; indicates a compiler defect.
    #[error("event ordering regressed from tick {prev} to tick {tick}")]
    EventOrder { prev: u32, tick: u32 },

    #[error("failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read back {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ScoreError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ScoreError::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    /// True when the error names bad caller input rather than an internal
    /// or I/O failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ScoreError::MissingField(_) | ScoreError::InvalidField { .. }
        )
    }
}
