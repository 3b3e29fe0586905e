//! Name-keyed join for species additions
//!
//! Addition records carry no dex number, so they are matched against spawn
//! conditions by lower-cased creature name instead.

use crate::error::Result;
use crate::format::is_truthy;
use crate::merger::{build_row, spawn_conditions, RowSource};
use crate::pool::WorkerPool;
use crate::row::MergedRow;
use crate::scanner::{ArchiveEntry, EntryMap};
use rayon::prelude::*;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{error, info, warn};

/// "Dex Number" column of every addition row
pub const ADDITION_DEX_LABEL: &str = "#----";

/// Addition records by normalized name
pub type AdditionIndex = BTreeMap<String, Value>;

/// Normalized name of an addition record: the name segment of
/// `target_id`/`targetId` ("cobblemon:pikachu" -> "pikachu"), else `name`.
pub fn addition_name(data: &Value) -> Option<String> {
    let target_id = ["target_id", "targetId"]
        .iter()
        .filter_map(|key| data.get(*key))
        .find(|v| is_truthy(v))
        .and_then(Value::as_str)
        .unwrap_or("");
    let from_id = target_id.rsplit(':').next().unwrap_or("");

    let raw = if from_id.is_empty() {
        data.get("name").and_then(Value::as_str).unwrap_or("")
    } else {
        from_id
    };

    let normalized = raw.trim().to_lowercase();
    (!normalized.is_empty()).then_some(normalized)
}

/// Parse addition files into a name-keyed map. Missing `forms`/`labels`
/// default to empty lists.
pub fn parse_species_additions(files: &EntryMap) -> AdditionIndex {
    let mut additions = AdditionIndex::new();
    for entry in files.values() {
        let mut data: Value = match serde_json::from_slice(&entry.bytes) {
            Ok(data) => data,
            Err(e) => {
                error!(path = %entry.path, archive = %entry.archive, error = %e, "bad addition JSON");
                continue;
            }
        };

        let Some(name) = addition_name(&data) else {
            warn!(path = %entry.path, "addition file missing target_id/name; skipping");
            continue;
        };
        let Some(object) = data.as_object_mut() else {
            warn!(path = %entry.path, "addition file is not a JSON object; skipping");
            continue;
        };
        object
            .entry("forms")
            .or_insert_with(|| Value::Array(Vec::new()));
        object
            .entry("labels")
            .or_insert_with(|| Value::Array(Vec::new()));

        additions.insert(name, data);
    }
    info!(count = additions.len(), "parsed species_addition records");
    additions
}

/// Creature name from a spawn file name: "0025_pikachu.json" -> "pikachu"
pub fn name_from_spawn_filename(file_name: &str) -> String {
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    };
    let without_digits = stem.trim_start_matches(|c: char| c.is_ascii_digit());
    let name = if without_digits.len() < stem.len() {
        without_digits.trim_start_matches(['_', '-'])
    } else {
        stem
    };
    name.to_lowercase().trim().to_string()
}

fn merge_spawn_file(entry: &ArchiveEntry, additions: &AdditionIndex) -> Vec<MergedRow> {
    let spawn_data: Value = match serde_json::from_slice(&entry.bytes) {
        Ok(data) => data,
        Err(e) => {
            error!(path = %entry.path, error = %e, "bad spawn JSON");
            return Vec::new();
        }
    };

    let fallback_name = name_from_spawn_filename(entry.file_name());
    let mut rows = Vec::new();
    for condition in spawn_conditions(&spawn_data) {
        let pokemon = condition
            .get("pokemon")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or("");
        let display_name = if pokemon.is_empty() {
            fallback_name.as_str()
        } else {
            pokemon
        };

        let Some(species) = additions.get(&display_name.to_lowercase()) else {
            continue;
        };

        let source = RowSource {
            dex_label: ADDITION_DEX_LABEL.to_string(),
            species: Some(species),
            generation: "",
            spawn_archive: Some(entry.archive.as_str()),
            ..Default::default()
        };
        rows.extend(build_row(&source, condition, display_name));
    }
    rows
}

/// Match every spawn condition in every spawn file against the additions by
/// name, on `pool`.
pub fn merge_additions(
    spawn_files: &EntryMap,
    additions: &AdditionIndex,
    pool: WorkerPool,
) -> Result<Vec<MergedRow>> {
    if additions.is_empty() {
        info!("no species_addition records; nothing to merge");
        return Ok(Vec::new());
    }

    let entries: Vec<&ArchiveEntry> = spawn_files.values().collect();
    let per_file: Vec<Vec<MergedRow>> = pool.install(|| {
        entries
            .par_iter()
            .map(|entry| merge_spawn_file(entry, additions))
            .collect()
    })?;

    let rows: Vec<MergedRow> = per_file.into_iter().flatten().collect();
    info!(count = rows.len(), "merged species_addition rows by name");
    Ok(rows)
}
