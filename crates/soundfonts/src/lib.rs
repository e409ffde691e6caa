//! General MIDI soundfont catalog and search.
//!
//! Maps soundfont display names to GM program numbers and families, so the
//! composition step can name real instruments and the API can answer
//! catalog queries.

pub mod catalog;
pub mod gm;

pub use catalog::{Catalog, SoundfontInfo, STANDARD_DRUM_KIT};
pub use gm::{family_of, GM_FAMILIES, GM_INSTRUMENTS};
