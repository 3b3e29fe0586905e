//! Key-space join of the spawn and species indices

use crate::index::{SpawnIndex, SpeciesIndex, SpeciesRecord};
use crate::scanner::ArchiveEntry;
use std::collections::BTreeMap;
use tracing::info;

/// What each side of the join holds for one dex number
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchedEntry<'i, 'a> {
    pub spawn: Option<&'a ArchiveEntry>,
    pub species: Option<&'i SpeciesRecord<'a>>,
}

impl<'i, 'a> MatchedEntry<'i, 'a> {
    /// Spawn file path inside its archive
    pub fn spawn_path(&self) -> Option<&'a str> {
        self.spawn.map(|e| e.path.as_str())
    }

    /// Archive that supplied the spawn file
    pub fn spawn_archive(&self) -> Option<&'a str> {
        self.spawn.map(|e| e.archive.as_str())
    }

    /// Species file path inside its archive
    pub fn species_path(&self) -> Option<&'a str> {
        self.species.map(|s| s.entry.path.as_str())
    }

    /// Directory directly containing the species file
    pub fn species_dir(&self) -> Option<&'a str> {
        self.species.map(|s| s.entry.dir_leaf.as_str())
    }

    /// Archive that supplied the species file
    pub fn species_archive(&self) -> Option<&'a str> {
        self.species.map(|s| s.entry.archive.as_str())
    }
}

/// Join result keyed by dex number
pub type MatchedDex<'i, 'a> = BTreeMap<String, MatchedEntry<'i, 'a>>;

/// Produce one entry for every dex number found on either side.
pub fn match_dex_numbers<'i, 'a>(
    spawn_index: &SpawnIndex<'a>,
    species_index: &'i SpeciesIndex<'a>,
) -> MatchedDex<'i, 'a> {
    let mut matched = MatchedDex::new();
    for dex in spawn_index.keys().chain(species_index.keys()) {
        if matched.contains_key(dex) {
            continue;
        }
        matched.insert(
            dex.clone(),
            MatchedEntry {
                spawn: spawn_index.get(dex).copied(),
                species: species_index.get(dex),
            },
        );
    }
    info!(count = matched.len(), "matched dex numbers");
    matched
}
