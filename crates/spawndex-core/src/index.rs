//! Lookup indices keyed by 4-digit dex number
//!
//! Spawn files are keyed by the number at the front of their file name,
//! species files by the `nationalPokedexNumber` inside them. Both keys go
//! through [`pad_dex`].

use crate::scanner::{ArchiveEntry, EntryMap};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, error, info};

/// Spawn entries by dex number
pub type SpawnIndex<'a> = BTreeMap<String, &'a ArchiveEntry>;

/// Parsed species records by dex number
pub type SpeciesIndex<'a> = BTreeMap<String, SpeciesRecord<'a>>;

/// A species file together with its parsed body
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesRecord<'a> {
    pub entry: &'a ArchiveEntry,
    pub data: Value,
}

/// Strip leading zeros from a digit string and left-pad it to width 4.
/// Idempotent: `pad_dex(&pad_dex(x)) == pad_dex(x)`.
pub fn pad_dex(digits: &str) -> String {
    format!("{:0>4}", digits.trim_start_matches('0'))
}

/// Dex number from a spawn file name: "0025_pikachu.json" -> "0025".
/// Returns None when the leading token carries no digits.
pub fn dex_from_filename(file_name: &str) -> Option<String> {
    let stem = file_name.strip_suffix(".json").unwrap_or(file_name);
    let token = stem.split('_').next().unwrap_or(stem);
    let token = token.trim_start_matches(|c: char| !c.is_ascii_digit());
    let end = token
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(token.len());
    let digits = &token[..end];
    if digits.is_empty() {
        None
    } else {
        Some(pad_dex(digits))
    }
}

/// Dex number from a parsed species body, if it has a usable
/// `nationalPokedexNumber`.
pub fn dex_from_species(data: &Value) -> Option<String> {
    match data.get("nationalPokedexNumber")? {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Some(pad_dex(&u.to_string()))
            } else {
                n.as_f64()
                    .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                    .map(|f| pad_dex(&(f as u64).to_string()))
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
                Some(pad_dex(s))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Index spawn entries by the dex number in their file name.
///
/// Entries are visited in map order and a later entry with the same number
/// replaces an earlier one.
pub fn build_spawn_index(spawn_files: &EntryMap) -> SpawnIndex<'_> {
    let mut index = SpawnIndex::new();
    for entry in spawn_files.values() {
        match dex_from_filename(entry.file_name()) {
            Some(dex) => {
                if let Some(previous) = index.insert(dex.clone(), entry) {
                    debug!(dex = %dex, replaced = %previous.path, by = %entry.path, "spawn dex collision");
                }
            }
            None => debug!(path = %entry.path, "spawn file name has no dex number"),
        }
    }
    info!(count = index.len(), "built spawn dex index");
    index
}

/// Parse species entries and index them by `nationalPokedexNumber`.
///
/// Unparseable files are logged and dropped; files without a usable number
/// are left out.
pub fn build_species_index(species_files: &EntryMap) -> SpeciesIndex<'_> {
    let mut index = SpeciesIndex::new();
    for entry in species_files.values() {
        let data: Value = match serde_json::from_slice(&entry.bytes) {
            Ok(data) => data,
            Err(e) => {
                error!(path = %entry.path, archive = %entry.archive, error = %e, "bad species JSON");
                continue;
            }
        };
        match dex_from_species(&data) {
            Some(dex) => {
                index.insert(dex, SpeciesRecord { entry, data });
            }
            None => debug!(path = %entry.path, "species file has no nationalPokedexNumber"),
        }
    }
    info!(count = index.len(), "built species dex index");
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(files: &[(&str, &str, &str)]) -> EntryMap {
        files
            .iter()
            .map(|(path, body, archive)| {
                (path.to_string(), ArchiveEntry::new(*path, body.as_bytes().to_vec(), *archive))
            })
            .collect()
    }

    #[test]
    fn test_pad_dex_idempotent() {
        assert_eq!(pad_dex("25"), "0025");
        assert_eq!(pad_dex("0025"), "0025");
        assert_eq!(pad_dex(&pad_dex("7")), pad_dex("7"));
        assert_eq!(pad_dex("0000"), "0000");
        assert_eq!(pad_dex("10001"), "10001");
    }

    #[test]
    fn test_dex_from_filename() {
        assert_eq!(dex_from_filename("0025_pikachu.json"), Some("0025".to_string()));
        assert_eq!(dex_from_filename("25_pikachu.json"), Some("0025".to_string()));
        assert_eq!(dex_from_filename("0133.json"), Some("0133".to_string()));
        assert_eq!(dex_from_filename("x0150_mewtwo.json"), Some("0150".to_string()));
        assert_eq!(dex_from_filename("pikachu.json"), None);
    }

    #[test]
    fn test_species_number_forms() {
        assert_eq!(dex_from_species(&serde_json::json!({"nationalPokedexNumber": 25})), Some("0025".to_string()));
        assert_eq!(dex_from_species(&serde_json::json!({"nationalPokedexNumber": "025"})), Some("0025".to_string()));
        assert_eq!(dex_from_species(&serde_json::json!({"nationalPokedexNumber": null})), None);
        assert_eq!(dex_from_species(&serde_json::json!({"name": "missingno"})), None);
        assert_eq!(dex_from_species(&serde_json::json!({"nationalPokedexNumber": "None"})), None);
    }

    #[test]
    fn test_species_retrievable_at_padded_key() {
        let files = entries(&[(
            "data/cobblemon/species/generation1/pikachu.json",
            r#"{"nationalPokedexNumber": 25, "name": "Pikachu"}"#,
            "cobblemon.jar",
        )]);
        let index = build_species_index(&files);
        let record = &index["0025"];
        assert_eq!(record.data["name"], "Pikachu");
        assert_eq!(record.entry.dir_leaf, "generation1");
    }

    #[test]
    fn test_bad_species_json_is_dropped() {
        let files = entries(&[
            ("data/cobblemon/species/generation1/bad.json", "{ nope", "a.jar"),
            ("data/cobblemon/species/generation1/raichu.json", r#"{"nationalPokedexNumber": 26}"#, "a.jar"),
        ]);
        let index = build_species_index(&files);
        assert_eq!(index.len(), 1);
        assert!(index.contains_key("0026"));
    }

    #[test]
    fn test_spawn_index_last_indexed_wins() {
        // Map order is path order, so the nested file is indexed second.
        // Which one wins depends only on that iteration order.
        let files = entries(&[
            ("data/cobblemon/spawn_pool_world/0025_pikachu.json", "{}", "base.jar"),
            ("data/cobblemon/spawn_pool_world/extra/025_pikachu.json", "{}", "addon.jar"),
        ]);
        let order: Vec<&str> = files.values().map(|e| e.archive.as_str()).collect();
        assert_eq!(order, vec!["base.jar", "addon.jar"]);

        let index = build_spawn_index(&files);
        assert_eq!(index.len(), 1);
        assert_eq!(index["0025"].archive, *order.last().unwrap());
    }
}
