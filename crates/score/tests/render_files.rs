//! End-to-end tests for composition rendering.
//!
//! Every test writes real files into a tempdir and inspects what landed on
//! disk.

use std::fs;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use score::{
    generate_separate, InstrumentSpec, MusicDescription, Note, Pattern, ProgramRef, ScoreError,
};
use tempfile::TempDir;

fn piano() -> InstrumentSpec {
    InstrumentSpec::new(ProgramRef::Melodic(0), "Piano")
        .with_soundfont("Grand Piano")
        .with_pattern(Pattern::with_notes(
            "melody",
            vec![Note::new(60, 0.0, 1.0, 80)],
        ))
}

fn bass() -> InstrumentSpec {
    InstrumentSpec::new(ProgramRef::Melodic(33), "Bass")
        .with_soundfont("Electric Bass Finger")
        .with_channel(1)
        .with_pattern(Pattern::with_notes(
            "bassline",
            vec![Note::new(33, 0.0, 2.0, 90), Note::new(36, 2.0, 2.0, 90)],
        ))
}

fn drums() -> InstrumentSpec {
    InstrumentSpec::new(ProgramRef::Percussion, "Drums")
        .with_soundfont("Standard Drum Kit")
        .with_channel(9)
        .with_pattern(Pattern::with_notes(
            "rhythm",
            vec![
                Note::new(36, 0.0, 0.5, 100),
                Note::new(42, 0.5, 0.5, 70),
                Note::new(38, 1.0, 0.5, 95),
            ],
        ))
}

#[test]
fn test_one_file_per_instrument() {
    let root = TempDir::new().unwrap();
    let desc = MusicDescription::new("Test Song", 120)
        .with_instrument(piano())
        .with_instrument(bass())
        .with_instrument(drums());

    let results = generate_separate(&desc, root.path()).unwrap();
    assert_eq!(results.len(), 3);

    // Input order preserved
    assert_eq!(results[0].instrument_name, "Piano");
    assert_eq!(results[1].instrument_name, "Bass");
    assert_eq!(results[2].instrument_name, "Drums");
    assert_eq!(results[0].soundfont_name, "Grand Piano");

    // All files share one composition directory named after the title
    let dir = results[0].file_path.parent().unwrap();
    for result in &results {
        assert_eq!(result.file_path.parent().unwrap(), dir);
        assert!(result.file_path.exists());
        assert_eq!(result.track_count, 1);
    }
    let dir_name = dir.file_name().unwrap().to_str().unwrap();
    assert!(dir_name.starts_with("Test_Song-"), "got {dir_name}");

    // Each file is an independently loadable single-track MIDI file
    for result in &results {
        let bytes = fs::read(&result.file_path).unwrap();
        assert_eq!(&bytes[0..4], b"MThd");
        assert_eq!(&bytes[8..10], [0, 0], "format 0");
        assert_eq!(&bytes[10..12], [0, 1], "one track");
        assert_eq!(&bytes[14..18], b"MTrk");
    }
}

#[test]
fn test_files_named_after_soundfonts() {
    let root = TempDir::new().unwrap();
    let desc = MusicDescription::new("Test", 120)
        .with_instrument(piano())
        .with_instrument(drums());

    let results = generate_separate(&desc, root.path()).unwrap();
    assert_eq!(
        results[0].file_path.file_name().unwrap(),
        "Grand Piano.mid"
    );
    assert_eq!(
        results[1].file_path.file_name().unwrap(),
        "Standard Drum Kit.mid"
    );
}

#[test]
fn test_base64_matches_disk_bytes() {
    let root = TempDir::new().unwrap();
    let desc = MusicDescription::new("Test", 120).with_instrument(piano());

    let results = generate_separate(&desc, root.path()).unwrap();
    let on_disk = fs::read(&results[0].file_path).unwrap();
    assert_eq!(BASE64.decode(&results[0].midi_data).unwrap(), on_disk);
}

#[test]
fn test_name_collisions_get_suffixes() {
    let root = TempDir::new().unwrap();
    let desc = MusicDescription::new("Test", 120)
        .with_instrument(piano())
        .with_instrument(
            InstrumentSpec::new(ProgramRef::Melodic(1), "Second Piano")
                .with_soundfont("Grand Piano"),
        )
        .with_instrument(
            InstrumentSpec::new(ProgramRef::Melodic(2), "Third Piano")
                .with_soundfont("Grand Piano"),
        );

    let results = generate_separate(&desc, root.path()).unwrap();
    assert_eq!(results[0].file_path.file_name().unwrap(), "Grand Piano.mid");
    assert_eq!(
        results[1].file_path.file_name().unwrap(),
        "Grand Piano_2.mid"
    );
    assert_eq!(
        results[2].file_path.file_name().unwrap(),
        "Grand Piano_3.mid"
    );
}

#[test]
fn test_nameless_instrument_gets_generated_label() {
    let root = TempDir::new().unwrap();
    let desc = MusicDescription::new("Test", 120)
        .with_instrument(piano())
        .with_instrument(InstrumentSpec::new(ProgramRef::Melodic(48), ""));

    let results = generate_separate(&desc, root.path()).unwrap();
    assert_eq!(results[1].instrument_name, "Instrument_1");
    assert_eq!(results[1].soundfont_name, "Instrument_1");
    assert_eq!(
        results[1].file_path.file_name().unwrap(),
        "Instrument_1.mid"
    );
}

#[test]
fn test_empty_instruments_yield_no_directory() {
    let root = TempDir::new().unwrap();
    let desc = MusicDescription::new("Nothing Here", 120);

    let results = generate_separate(&desc, root.path()).unwrap();
    assert!(results.is_empty());

    let entries: Vec<_> = fs::read_dir(root.path()).unwrap().collect();
    assert!(entries.is_empty(), "no composition directory expected");
}

#[test]
fn test_invalid_note_writes_nothing() {
    let root = TempDir::new().unwrap();
    let bad = InstrumentSpec::new(ProgramRef::Melodic(0), "Piano").with_pattern(
        Pattern::with_notes("melody", vec![Note::new(60, 0.0, -0.5, 80)]),
    );
    let desc = MusicDescription::new("Broken", 120)
        .with_instrument(piano())
        .with_instrument(bad);

    let err = generate_separate(&desc, root.path()).unwrap_err();
    assert!(err.is_validation());
    assert!(err
        .to_string()
        .contains("instruments[1].patterns[0].notes[0].duration"));

    // Zero files: the valid first instrument must not have been written
    let entries: Vec<_> = fs::read_dir(root.path()).unwrap().collect();
    assert!(entries.is_empty());
}

#[test]
fn test_zero_tempo_writes_nothing() {
    let root = TempDir::new().unwrap();
    let desc = MusicDescription::new("Test", 0).with_instrument(piano());

    let err = generate_separate(&desc, root.path()).unwrap_err();
    assert!(matches!(err, ScoreError::InvalidField { .. }));
    assert!(fs::read_dir(root.path()).unwrap().next().is_none());
}

#[test]
fn test_two_runs_never_collide() {
    let root = TempDir::new().unwrap();
    let desc = MusicDescription::new("Same Title", 120).with_instrument(piano());

    let first = generate_separate(&desc, root.path()).unwrap();
    let second = generate_separate(&desc, root.path()).unwrap();

    let dir_a = first[0].file_path.parent().unwrap().to_path_buf();
    let dir_b = second[0].file_path.parent().unwrap().to_path_buf();
    assert_ne!(dir_a, dir_b, "the uniqueness token keeps retries apart");
    assert!(dir_a.exists() && dir_b.exists());
}

#[test]
fn test_unicode_title_sanitized() {
    let root = TempDir::new().unwrap();
    let desc = MusicDescription::new("Nuit d'été / prelude", 140).with_instrument(piano());

    let results = generate_separate(&desc, root.path()).unwrap();
    let dir_name = results[0]
        .file_path
        .parent()
        .unwrap()
        .file_name()
        .unwrap()
        .to_str()
        .unwrap();
    assert!(!dir_name.contains('/'));
    assert!(!dir_name.contains('\''));
}
