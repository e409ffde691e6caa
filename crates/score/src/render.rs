//! Composition splitting and file output.
//!
//! Renders a whole music description into one MIDI file per instrument
//! inside a fresh per-composition directory, and reports each file back as
//! a base64 payload for in-process transport.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::midi::compile;
use crate::model::{InstrumentSpec, MusicDescription};
use crate::{validate, ScoreError, DEFAULT_TICKS_PER_BEAT};

/// Per-instrument output record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentResult {
    pub instrument_name: String,
    pub soundfont_name: String,
    pub file_path: PathBuf,
    /// The written file's bytes, base64-encoded.
    pub midi_data: String,
    pub track_count: u32,
}

/// Render every instrument of a description to its own MIDI file.
///
/// Files land in `output_root/<sanitized-title>-<token>/`, one per
/// instrument, named after the resolved soundfont. Results come back in
/// input-instrument order and all share the same parent directory. An empty
/// instrument list yields an empty result list and no directory.
///
/// Validation runs up front, so a rejected description writes nothing; a
/// failure partway through removes the composition directory again.
pub fn generate_separate(
    description: &MusicDescription,
    output_root: &Path,
) -> Result<Vec<InstrumentResult>, ScoreError> {
    validate::validate_description(description)?;

    if description.instruments.is_empty() {
        return Ok(Vec::new());
    }

    let dir_name = format!("{}-{}", sanitize_title(&description.title), unique_token());
    let composition_dir = output_root.join(dir_name);
    fs::create_dir_all(&composition_dir).map_err(|source| ScoreError::CreateDir {
        path: composition_dir.clone(),
        source,
    })?;

    match write_instruments(description, &composition_dir) {
        Ok(results) => Ok(results),
        Err(err) => {
            // A failed composition leaves no files behind
            let _ = fs::remove_dir_all(&composition_dir);
            Err(err)
        }
    }
}

fn write_instruments(
    description: &MusicDescription,
    composition_dir: &Path,
) -> Result<Vec<InstrumentResult>, ScoreError> {
    let mut results = Vec::with_capacity(description.instruments.len());
    let mut used_names: HashSet<String> = HashSet::new();

    for (index, instrument) in description.instruments.iter().enumerate() {
        let soundfont_name = resolve_soundfont_name(instrument, index);

        let mut base = sanitize_file_name(&soundfont_name);
        if base.is_empty() {
            base = format!("Instrument_{index}");
        }
        let file_stem = dedupe_name(&base, &used_names);
        used_names.insert(file_stem.clone());

        let track = compile(instrument, description.tempo, DEFAULT_TICKS_PER_BEAT)?;

        let path = composition_dir.join(format!("{file_stem}.mid"));
        fs::write(&path, track.to_bytes()).map_err(|source| ScoreError::WriteFile {
            path: path.clone(),
            source,
        })?;

        // Read back what actually landed on disk
        let bytes = fs::read(&path).map_err(|source| ScoreError::ReadFile {
            path: path.clone(),
            source,
        })?;

        results.push(InstrumentResult {
            instrument_name: display_name(instrument, index),
            soundfont_name,
            file_path: path,
            midi_data: BASE64.encode(&bytes),
            track_count: 1,
        });
    }

    Ok(results)
}

/// Soundfont name fallback chain: `soundfont_name`, then `name`, then a
/// generated label. Every instrument must map to exactly one named file.
fn resolve_soundfont_name(instrument: &InstrumentSpec, index: usize) -> String {
    if let Some(soundfont) = &instrument.soundfont_name {
        if !soundfont.trim().is_empty() {
            return soundfont.clone();
        }
    }
    display_name(instrument, index)
}

fn display_name(instrument: &InstrumentSpec, index: usize) -> String {
    if instrument.name.trim().is_empty() {
        format!("Instrument_{index}")
    } else {
        instrument.name.clone()
    }
}

fn dedupe_name(base: &str, used: &HashSet<String>) -> String {
    if !used.contains(base) {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}_{n}");
        if !used.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn keep_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Directory-safe form of a composition title: drop unsafe characters,
/// collapse whitespace runs to `_`.
fn sanitize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for word in title.split_whitespace() {
        let word: String = word.chars().filter(|c| keep_char(*c)).collect();
        if word.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('_');
        }
        out.push_str(&word);
    }
    if out.is_empty() {
        "untitled".to_string()
    } else {
        out
    }
}

/// File-safe form of a soundfont or instrument name. Single spaces survive;
/// path separators and other unsafe characters do not.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name.chars().filter(|c| keep_char(*c) || *c == ' ').collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn unique_token() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProgramRef;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("Test"), "Test");
        assert_eq!(sanitize_title("Midnight  Blues"), "Midnight_Blues");
        assert_eq!(sanitize_title("  a/b\\c  "), "abc");
        assert_eq!(sanitize_title("../escape"), "..escape");
        assert_eq!(sanitize_title("///"), "untitled");
        assert_eq!(sanitize_title(""), "untitled");
    }

    #[test]
    fn test_sanitize_file_name_keeps_spaces() {
        assert_eq!(sanitize_file_name("Grand Piano"), "Grand Piano");
        assert_eq!(sanitize_file_name("Electric Bass (Finger)"), "Electric Bass Finger");
        assert_eq!(sanitize_file_name("a/b"), "ab");
        assert_eq!(sanitize_file_name("  two   words  "), "two words");
    }

    #[test]
    fn test_soundfont_name_fallback_chain() {
        let with_soundfont = InstrumentSpec::new(ProgramRef::Melodic(0), "Piano")
            .with_soundfont("Grand Piano");
        assert_eq!(resolve_soundfont_name(&with_soundfont, 0), "Grand Piano");

        let name_only = InstrumentSpec::new(ProgramRef::Melodic(0), "Piano");
        assert_eq!(resolve_soundfont_name(&name_only, 0), "Piano");

        let blank_soundfont =
            InstrumentSpec::new(ProgramRef::Melodic(0), "Piano").with_soundfont("  ");
        assert_eq!(resolve_soundfont_name(&blank_soundfont, 0), "Piano");

        let nameless = InstrumentSpec::new(ProgramRef::Melodic(0), "");
        assert_eq!(resolve_soundfont_name(&nameless, 4), "Instrument_4");
    }

    #[test]
    fn test_dedupe_name() {
        let mut used = HashSet::new();
        assert_eq!(dedupe_name("Drums", &used), "Drums");
        used.insert("Drums".to_string());
        assert_eq!(dedupe_name("Drums", &used), "Drums_2");
        used.insert("Drums_2".to_string());
        assert_eq!(dedupe_name("Drums", &used), "Drums_3");
    }

    #[test]
    fn test_unique_token_shape() {
        let a = unique_token();
        let b = unique_token();
        assert_eq!(a.len(), 8);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
