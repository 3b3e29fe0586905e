//! Merge engine: flattens each spawn condition into a row with its species
//! attributes

use crate::error::Result;
use crate::format::{
    generation_label, is_generation_label, joined_locations, light_condition, list_field,
    moon_phase_name, sky_condition, str_field, sub_object, title_case, value_text,
    weather_condition,
};
use crate::matcher::{MatchedDex, MatchedEntry};
use crate::pool::WorkerPool;
use crate::row::{MergedRow, SkippedEntry};
use rayon::prelude::*;
use serde_json::Value;
use tracing::{error, info};

/// Secondary type of a species that has none
pub const NO_SECONDARY_TYPE: &str = "-----";

static NO_SPECIES: Value = Value::Null;

/// Species fields reported for a dex number as a whole
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeciesSummary {
    pub name: String,
    pub primary_type: String,
    pub secondary_type: String,
    pub egg_groups: String,
    /// "Gen N" from the first label starting with "gen"
    pub generation: String,
    pub labels: String,
}

impl SpeciesSummary {
    pub fn from_species(data: &Value) -> Self {
        let labels = list_field(data, "labels");
        let generation = labels
            .iter()
            .find(|l| is_generation_label(l))
            .map(|l| generation_label(l))
            .unwrap_or_default();

        Self {
            name: str_field(data, "name", "Unknown").to_string(),
            primary_type: str_field(data, "primaryType", "").to_string(),
            secondary_type: str_field(data, "secondaryType", "").to_string(),
            egg_groups: list_field(data, "eggGroups").join(", "),
            generation,
            labels: display_labels(&labels),
        }
    }
}

/// Non-generation labels, title-cased with '_' as space
fn display_labels(labels: &[String]) -> String {
    labels
        .iter()
        .filter(|l| !is_generation_label(l))
        .map(|l| title_case(&l.replace('_', " ")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pick the species form whose name appears in `pokemon_name`
/// (case-insensitive substring), falling back to the species itself.
pub fn find_species_form<'v>(pokemon_name: &str, species: &'v Value) -> &'v Value {
    let wanted = pokemon_name.to_lowercase();
    species
        .get("forms")
        .and_then(Value::as_array)
        .and_then(|forms| {
            forms
                .iter()
                .filter(|f| f.is_object())
                .find(|f| wanted.contains(&str_field(f, "name", "").to_lowercase()))
        })
        .unwrap_or(species)
}

/// Where a row's species data came from, shared by all rows of one spawn file
#[derive(Debug, Clone, Default)]
pub struct RowSource<'a> {
    /// Value of the "Dex Number" column ("#0025", or "#----" for additions)
    pub dex_label: String,
    pub species: Option<&'a Value>,
    pub generation: &'a str,
    pub species_path: Option<&'a str>,
    pub species_dir: Option<&'a str>,
    pub spawn_archive: Option<&'a str>,
    pub species_archive: Option<&'a str>,
}

impl<'a> RowSource<'a> {
    /// Source for a dex-matched entry
    pub fn for_matched(dex: &str, matched: &MatchedEntry<'a, '_>, generation: &'a str) -> Self {
        Self {
            dex_label: format!("#{}", dex),
            species: matched.species.map(|s| &s.data),
            generation,
            species_path: matched.species_path(),
            species_dir: matched.species_dir(),
            spawn_archive: matched.spawn_archive(),
            species_archive: matched.species_archive(),
        }
    }

    fn species_archive_column(&self) -> String {
        match (self.species_dir, self.species_path) {
            (Some(dir), Some(path)) if !dir.is_empty() && !path.is_empty() => {
                format!("{}/{}", dir, base_name(path))
            }
            _ => "Unknown".to_string(),
        }
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn archive_column(archive: Option<&str>) -> String {
    match archive {
        Some(a) if !a.is_empty() => base_name(a).to_string(),
        _ => "Unknown".to_string(),
    }
}

/// Spawn condition objects of a parsed spawn file
pub fn spawn_conditions(spawn_data: &Value) -> impl Iterator<Item = &Value> {
    spawn_data
        .get("spawns")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|s| s.is_object())
}

/// Build the row for one spawn condition. Returns None for a blank name.
pub fn build_row(source: &RowSource<'_>, spawn: &Value, pokemon_name: &str) -> Option<MergedRow> {
    let pokemon_name = pokemon_name.trim();
    if pokemon_name.is_empty() {
        return None;
    }

    let species = source.species.unwrap_or(&NO_SPECIES);
    let form = find_species_form(pokemon_name, species);
    let condition = sub_object(spawn, "condition");
    let anticondition = sub_object(spawn, "anticondition");

    Some(MergedRow {
        dex_number: source.dex_label.clone(),
        pokemon_name: title_case(pokemon_name),
        primary_type: title_case(str_field(form, "primaryType", "")),
        secondary_type: title_case(str_field(form, "secondaryType", NO_SECONDARY_TYPE)),
        rarity: title_case(str_field(spawn, "bucket", "")),
        sky: sky_condition(spawn).to_string(),
        light: light_condition(condition),
        time: title_case(condition.map_or("Any", |c| str_field(c, "timeRange", "Any"))),
        weather: weather_condition(condition).to_string(),
        biomes: joined_locations(condition, "biomes"),
        anti_biomes: joined_locations(anticondition, "biomes"),
        structures: joined_locations(condition, "structures"),
        anti_structures: joined_locations(anticondition, "structures"),
        base_blocks: joined_locations(condition, "neededBaseBlocks"),
        nearby_blocks: joined_locations(condition, "neededNearbyBlocks"),
        moon_phase: moon_phase_name(condition.and_then(|c| c.get("moonPhase"))),
        anti_moon_phase: moon_phase_name(anticondition.and_then(|c| c.get("moonPhase"))),
        presets: title_case(&list_field(spawn, "presets").join(", ")),
        generation: source.generation.to_string(),
        labels: display_labels(&list_field(species, "labels")),
        egg_groups: title_case(&list_field(form, "eggGroups").join(", ")),
        weight: spawn.get("weight").map(value_text).unwrap_or_default(),
        context: title_case(str_field(spawn, "context", "")),
        spawn_id: spawn
            .get("id")
            .map(value_text)
            .unwrap_or_else(|| "Unknown".to_string()),
        species_archive: source.species_archive_column(),
        original_spawn_archive: archive_column(source.spawn_archive),
        original_species_archive: archive_column(source.species_archive),
    })
}

/// Result of merging one dex number
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// One row per spawn condition
    Rows(Vec<MergedRow>),
    /// Species data without any spawn data
    Skipped(SkippedEntry),
    /// The spawn file could not be parsed
    Dropped,
}

/// Merge the spawn and species sides of one dex number.
pub fn merge_entry(dex: &str, matched: &MatchedEntry<'_, '_>) -> MergeOutcome {
    let summary = matched
        .species
        .map(|s| SpeciesSummary::from_species(&s.data))
        .unwrap_or_default();

    let Some(spawn) = matched.spawn else {
        info!(dex = %dex, name = %summary.name, "skipping dex: no spawn data");
        return MergeOutcome::Skipped(SkippedEntry {
            dex_number: dex.to_string(),
            pokemon_name: summary.name,
            primary_type: summary.primary_type,
            secondary_type: summary.secondary_type,
            egg_groups: summary.egg_groups,
            generation: summary.generation,
            labels: summary.labels,
            species_archive: matched.species_archive().unwrap_or_default().to_string(),
        });
    };

    let spawn_data: Value = match serde_json::from_slice(&spawn.bytes) {
        Ok(data) => data,
        Err(e) => {
            error!(dex = %dex, path = %spawn.path, error = %e, "bad spawn JSON");
            return MergeOutcome::Dropped;
        }
    };

    let source = RowSource::for_matched(dex, matched, &summary.generation);
    let rows = spawn_conditions(&spawn_data)
        .filter_map(|condition| {
            let name = condition.get("pokemon").and_then(Value::as_str).unwrap_or("");
            build_row(&source, condition, name)
        })
        .collect();

    MergeOutcome::Rows(rows)
}

/// Rows and skipped entries from the dex-number join
#[derive(Debug, Clone, Default)]
pub struct DexMerge {
    pub rows: Vec<MergedRow>,
    pub skipped: Vec<SkippedEntry>,
}

/// Merge every matched dex number on `pool`.
///
/// Dex numbers without a species record are only merged when
/// `include_spawn_without_species` is set.
pub fn merge_matched(
    matched: &MatchedDex<'_, '_>,
    include_spawn_without_species: bool,
    pool: WorkerPool,
) -> Result<DexMerge> {
    let work: Vec<(&String, &MatchedEntry<'_, '_>)> = matched
        .iter()
        .filter(|(_, m)| include_spawn_without_species || m.species.is_some())
        .collect();

    let outcomes: Vec<MergeOutcome> = pool.install(|| {
        work.par_iter()
            .map(|(dex, entry)| merge_entry(dex, entry))
            .collect()
    })?;

    let mut merge = DexMerge::default();
    let mut dropped = 0usize;
    for outcome in outcomes {
        match outcome {
            MergeOutcome::Rows(rows) => merge.rows.extend(rows),
            MergeOutcome::Skipped(skipped) => merge.skipped.push(skipped),
            MergeOutcome::Dropped => dropped += 1,
        }
    }

    info!(
        dex_numbers = work.len(),
        rows = merge.rows.len(),
        skipped = merge.skipped.len(),
        dropped,
        "merged dex entries"
    );
    Ok(merge)
}
