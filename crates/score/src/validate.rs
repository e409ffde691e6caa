//! Input validation for music descriptions.
//!
//! Every check runs before any event is compiled or any file is written, so
//! a rejected description produces zero output. Error messages name the
//! offending field with its instrument/pattern/note index.

use crate::model::{InstrumentSpec, MusicDescription, Note, ProgramRef};
use crate::ScoreError;

pub(crate) fn validate_description(description: &MusicDescription) -> Result<(), ScoreError> {
    if description.title.trim().is_empty() {
        return Err(ScoreError::MissingField("title"));
    }
    validate_tempo(description.tempo)?;
    for (index, instrument) in description.instruments.iter().enumerate() {
        validate_instrument(instrument, &format!("instruments[{index}]."))?;
    }
    Ok(())
}

/// Slowest encodable tempo. The tempo meta event stores microseconds per
/// beat in three bytes; below 4 BPM `60_000_000 / bpm` exceeds 0xFFFFFF.
const MIN_TEMPO_BPM: u16 = 4;

pub(crate) fn validate_tempo(tempo: u16) -> Result<(), ScoreError> {
    if tempo < MIN_TEMPO_BPM {
        return Err(ScoreError::invalid(
            "tempo",
            format!("must be at least {MIN_TEMPO_BPM} BPM"),
        ));
    }
    Ok(())
}

/// `prefix` scopes field names when the instrument sits inside a
/// description, e.g. `instruments[2].`. Empty for a standalone instrument.
pub(crate) fn validate_instrument(spec: &InstrumentSpec, prefix: &str) -> Result<(), ScoreError> {
    if let ProgramRef::Melodic(program) = spec.program {
        if program > 127 {
            return Err(ScoreError::invalid(
                format!("{prefix}program"),
                "must be 0-127",
            ));
        }
    }
    if spec.channel > 15 {
        return Err(ScoreError::invalid(
            format!("{prefix}channel"),
            "must be 0-15",
        ));
    }
    for (p, pattern) in spec.patterns.iter().enumerate() {
        for (n, note) in pattern.notes.iter().enumerate() {
            validate_note(note, &format!("{prefix}patterns[{p}].notes[{n}]"))?;
        }
    }
    Ok(())
}

fn validate_note(note: &Note, field: &str) -> Result<(), ScoreError> {
    if note.pitch > 127 {
        return Err(ScoreError::invalid(format!("{field}.pitch"), "must be 0-127"));
    }
    if note.velocity == 0 || note.velocity > 127 {
        return Err(ScoreError::invalid(
            format!("{field}.velocity"),
            "must be 1-127",
        ));
    }
    if !note.start.is_finite() || note.start < 0.0 {
        return Err(ScoreError::invalid(
            format!("{field}.start"),
            "must be a finite beat offset >= 0",
        ));
    }
    if !note.duration.is_finite() || note.duration <= 0.0 {
        return Err(ScoreError::invalid(
            format!("{field}.duration"),
            "must be a positive number of beats",
        ));
    }
    Ok(())
}
