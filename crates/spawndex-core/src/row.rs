//! Output row types and their fixed CSV column schemas

use serde::{Deserialize, Serialize};

/// Columns of the main and species-addition CSV outputs
pub const MAIN_COLUMNS: [&str; 27] = [
    "Dex Number",
    "Pokemon Name",
    "Primary Type",
    "Secondary Type",
    "Rarity",
    "Sky",
    "Light",
    "Time",
    "Weather",
    "Biomes",
    "Anti-Biomes",
    "Structures",
    "Anti-Structures",
    "Base Blocks",
    "Nearby Blocks",
    "Moon Phase",
    "Anti-Moon Phase",
    "Presets",
    "Generation",
    "Labels",
    "Egg Groups",
    "Weight",
    "Context",
    "Spawn ID",
    "Species Archive",
    "Original Spawn Archive",
    "Original Species Archive",
];

/// Columns of the skipped-entries CSV output
pub const SKIPPED_COLUMNS: [&str; 8] = [
    "Dex Number",
    "Pokemon Name",
    "Primary Type",
    "Secondary Type",
    "Egg Groups",
    "Generation",
    "Labels",
    "Species Archive",
];

/// A row that can be written under a fixed column schema and sorted by
/// column name.
pub trait CsvRow {
    /// Column names, in output order
    fn columns() -> &'static [&'static str];

    /// Cell values, in the same order as [`CsvRow::columns`]
    fn values(&self) -> Vec<&str>;

    /// Look up a cell by column name
    fn field(&self, column: &str) -> Option<&str> {
        Self::columns()
            .iter()
            .position(|c| *c == column)
            .and_then(|i| self.values().get(i).copied())
    }
}

/// One flattened spawn condition joined with its species attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedRow {
    pub dex_number: String,
    pub pokemon_name: String,
    pub primary_type: String,
    pub secondary_type: String,
    pub rarity: String,
    pub sky: String,
    pub light: String,
    pub time: String,
    pub weather: String,
    pub biomes: String,
    pub anti_biomes: String,
    pub structures: String,
    pub anti_structures: String,
    pub base_blocks: String,
    pub nearby_blocks: String,
    pub moon_phase: String,
    pub anti_moon_phase: String,
    pub presets: String,
    pub generation: String,
    pub labels: String,
    pub egg_groups: String,
    pub weight: String,
    pub context: String,
    pub spawn_id: String,
    pub species_archive: String,
    pub original_spawn_archive: String,
    pub original_species_archive: String,
}

impl CsvRow for MergedRow {
    fn columns() -> &'static [&'static str] {
        &MAIN_COLUMNS
    }

    fn values(&self) -> Vec<&str> {
        vec![
            self.dex_number.as_str(),
            self.pokemon_name.as_str(),
            self.primary_type.as_str(),
            self.secondary_type.as_str(),
            self.rarity.as_str(),
            self.sky.as_str(),
            self.light.as_str(),
            self.time.as_str(),
            self.weather.as_str(),
            self.biomes.as_str(),
            self.anti_biomes.as_str(),
            self.structures.as_str(),
            self.anti_structures.as_str(),
            self.base_blocks.as_str(),
            self.nearby_blocks.as_str(),
            self.moon_phase.as_str(),
            self.anti_moon_phase.as_str(),
            self.presets.as_str(),
            self.generation.as_str(),
            self.labels.as_str(),
            self.egg_groups.as_str(),
            self.weight.as_str(),
            self.context.as_str(),
            self.spawn_id.as_str(),
            self.species_archive.as_str(),
            self.original_spawn_archive.as_str(),
            self.original_species_archive.as_str(),
        ]
    }
}

/// A species identifier that had no spawn data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkippedEntry {
    /// Bare 4-digit identifier, without the leading '#'
    pub dex_number: String,
    pub pokemon_name: String,
    pub primary_type: String,
    pub secondary_type: String,
    pub egg_groups: String,
    pub generation: String,
    pub labels: String,
    /// File name of the archive that supplied the species record
    pub species_archive: String,
}

impl CsvRow for SkippedEntry {
    fn columns() -> &'static [&'static str] {
        &SKIPPED_COLUMNS
    }

    fn values(&self) -> Vec<&str> {
        vec![
            self.dex_number.as_str(),
            self.pokemon_name.as_str(),
            self.primary_type.as_str(),
            self.secondary_type.as_str(),
            self.egg_groups.as_str(),
            self.generation.as_str(),
            self.labels.as_str(),
            self.species_archive.as_str(),
        ]
    }
}
