//! Searchable soundfont catalog.
//!
//! Seeded from the General MIDI tables; deployments can append their own
//! entries for the soundfonts actually installed.

use score::ProgramRef;
use serde::{Deserialize, Serialize};

use crate::gm::{family_of, GM_INSTRUMENTS};

/// Name of the channel-10 drum kit entry. Drum kits carry no program
/// number, so the catalog represents them as percussion.
pub const STANDARD_DRUM_KIT: &str = "Standard Drum Kit";

/// One playable soundfont and where it maps in General MIDI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundfontInfo {
    pub name: String,
    pub program: ProgramRef,
    pub family: String,
}

impl SoundfontInfo {
    pub fn new(name: impl Into<String>, program: ProgramRef, family: impl Into<String>) -> Self {
        SoundfontInfo {
            name: name.into(),
            program,
            family: family.into(),
        }
    }
}

/// The queryable set of known soundfonts.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<SoundfontInfo>,
}

impl Catalog {
    /// Catalog of the full General MIDI sound set: all 128 melodic programs
    /// plus the standard drum kit.
    pub fn general_midi() -> Self {
        let mut entries: Vec<SoundfontInfo> = GM_INSTRUMENTS
            .iter()
            .enumerate()
            .map(|(program, name)| {
                SoundfontInfo::new(
                    *name,
                    ProgramRef::Melodic(program as u8),
                    family_of(program as u8),
                )
            })
            .collect();
        entries.push(SoundfontInfo::new(
            STANDARD_DRUM_KIT,
            ProgramRef::Percussion,
            "Percussion",
        ));
        Catalog { entries }
    }

    /// Append deployment-specific entries.
    pub fn with_extra(mut self, extra: impl IntoIterator<Item = SoundfontInfo>) -> Self {
        self.entries.extend(extra);
        self
    }

    /// Every entry, in program order with extras appended.
    pub fn all(&self) -> &[SoundfontInfo] {
        &self.entries
    }

    /// Case-insensitive substring search over entry names.
    pub fn find(&self, query: &str) -> Vec<&SoundfontInfo> {
        let needle = query.to_lowercase();
        self.entries
            .iter()
            .filter(|e| e.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Entries belonging to a named family.
    pub fn by_family(&self, family: &str) -> Vec<&SoundfontInfo> {
        self.entries
            .iter()
            .filter(|e| e.family.eq_ignore_ascii_case(family))
            .collect()
    }

    /// Family names present in the catalog, in first-seen order.
    pub fn families(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !seen.contains(&entry.family.as_str()) {
                seen.push(entry.family.as_str());
            }
        }
        seen
    }

    /// Exact (case-insensitive) lookup of a single entry.
    pub fn metadata(&self, name: &str) -> Option<&SoundfontInfo> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }
}
