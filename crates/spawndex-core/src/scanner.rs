//! Archive scanner for pulling spawn and species JSON out of mod jars

use crate::config::Config;
use crate::error::{Error, Result};
use crate::pool::WorkerPool;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

/// Largest entry read out of an archive. Spawn and species files are a few
/// kilobytes; anything past this is not one of them.
pub const MAX_ENTRY_BYTES: u64 = 16 * 1024 * 1024;

/// Entries keyed by their path inside the archive
pub type EntryMap = BTreeMap<String, ArchiveEntry>;

/// One JSON file read out of an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path inside the archive (e.g. "data/cobblemon/species/generation1/pikachu.json")
    pub path: String,
    /// Raw file contents
    pub bytes: Vec<u8>,
    /// File name of the archive it came from
    pub archive: String,
    /// Name of the directory directly containing the file
    pub dir_leaf: String,
}

impl ArchiveEntry {
    pub fn new(path: impl Into<String>, bytes: impl Into<Vec<u8>>, archive: impl Into<String>) -> Self {
        let path = path.into();
        let dir_leaf = dir_leaf(&path).to_string();
        Self {
            path,
            bytes: bytes.into(),
            archive: archive.into(),
            dir_leaf,
        }
    }

    /// Last path segment, e.g. "0025_pikachu.json"
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

fn dir_leaf(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some((dir, _)) => dir.rsplit('/').next().unwrap_or(""),
        None => "",
    }
}

/// Which record type an entry holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryCategory {
    Spawn,
    Species,
    SpeciesAddition,
}

/// Directory prefixes that select the entries worth reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPrefixes {
    pub spawn: String,
    pub species: String,
    pub species_addition: String,
}

impl ScanPrefixes {
    pub fn from_config(config: &Config) -> Self {
        Self {
            spawn: config.spawn_prefix.clone(),
            species: config.species_prefix.clone(),
            species_addition: config.species_addition_prefix.clone(),
        }
    }

    /// Category of an archive path, or None when it is not a target JSON file.
    /// Prefixes match whole directories, so "species_addition/x.json" is never
    /// mistaken for "species/...".
    pub fn categorize(&self, path: &str) -> Option<EntryCategory> {
        if !path.ends_with(".json") {
            return None;
        }
        let under = |prefix: &str| {
            path.strip_prefix(prefix.trim_end_matches('/'))
                .is_some_and(|rest| rest.starts_with('/'))
        };
        if under(&self.spawn) {
            Some(EntryCategory::Spawn)
        } else if under(&self.species_addition) {
            Some(EntryCategory::SpeciesAddition)
        } else if under(&self.species) {
            Some(EntryCategory::Species)
        } else {
            None
        }
    }
}

impl Default for ScanPrefixes {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Per-archive outcome, reported by the scan command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveScan {
    pub archive: String,
    /// Target entries read from this archive
    pub entries: usize,
    /// Why the archive contributed nothing, if it failed to open
    pub error: Option<String>,
}

/// Entry counts per category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCounts {
    pub spawn: usize,
    pub species: usize,
    pub species_addition: usize,
}

/// Result of scanning an archive directory
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Archives in the order they were merged
    pub archives: Vec<ArchiveScan>,
    pub spawn_files: EntryMap,
    pub species_files: EntryMap,
    pub species_addition_files: EntryMap,
}

impl ScanResult {
    /// Split a flat path -> entry map into the three categories
    pub fn partition(all_files: EntryMap, prefixes: &ScanPrefixes) -> Self {
        let mut result = ScanResult::default();
        for (path, entry) in all_files {
            match prefixes.categorize(&path) {
                Some(EntryCategory::Spawn) => {
                    result.spawn_files.insert(path, entry);
                }
                Some(EntryCategory::Species) => {
                    result.species_files.insert(path, entry);
                }
                Some(EntryCategory::SpeciesAddition) => {
                    result.species_addition_files.insert(path, entry);
                }
                None => {}
            }
        }
        result
    }

    pub fn counts(&self) -> ScanCounts {
        ScanCounts {
            spawn: self.spawn_files.len(),
            species: self.species_files.len(),
            species_addition: self.species_addition_files.len(),
        }
    }

    /// Total number of target files found
    pub fn total_files(&self) -> usize {
        self.spawn_files.len() + self.species_files.len() + self.species_addition_files.len()
    }

    /// Every entry, regardless of category
    pub fn all_files(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.spawn_files
            .values()
            .chain(self.species_files.values())
            .chain(self.species_addition_files.values())
    }
}

/// List the .zip/.jar files directly inside `dir`, sorted by file name
pub fn list_archives(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::ArchiveDirNotFound(dir.to_path_buf()));
    }

    let mut archives = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry?;
        let path = entry.path();
        let is_archive = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip") || ext.eq_ignore_ascii_case("jar"));

        if entry.file_type().is_file() && is_archive {
            archives.push(path.to_path_buf());
        }
    }

    Ok(archives)
}

/// Read every target JSON entry out of one archive.
///
/// An entry that cannot be read is logged and skipped; an archive that cannot
/// be opened is an error for the caller to absorb.
pub fn extract_from_archive(archive_path: &Path, prefixes: &ScanPrefixes) -> Result<EntryMap> {
    let archive_name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file = File::open(archive_path).map_err(|e| Error::FileRead {
        path: archive_path.to_path_buf(),
        source: e,
    })?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|e| Error::Archive {
        archive: archive_name.clone(),
        source: e,
    })?;

    let mut results = EntryMap::new();
    for i in 0..archive.len() {
        let mut entry = match archive.by_index(i) {
            Ok(entry) => entry,
            Err(e) => {
                error!(archive = %archive_name, index = i, error = %e, "failed to read archive entry");
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }

        let path = entry.name().to_string();
        if prefixes.categorize(&path).is_none() {
            continue;
        }

        let bytes = match read_bounded(&mut entry, MAX_ENTRY_BYTES) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                warn!(archive = %archive_name, path = %path, limit = MAX_ENTRY_BYTES, "archive entry too large; skipping");
                continue;
            }
            Err(e) => {
                error!(archive = %archive_name, path = %path, error = %e, "failed to read archive entry");
                continue;
            }
        };

        results.insert(path.clone(), ArchiveEntry::new(path, bytes, archive_name.clone()));
    }

    debug!(archive = %archive_name, count = results.len(), "extracted target files");
    Ok(results)
}

/// Read at most `limit` bytes. Returns None when the reader holds more.
///
/// The size an archive header claims is never trusted for allocation.
fn read_bounded<R: Read>(reader: R, limit: u64) -> std::io::Result<Option<Vec<u8>>> {
    let mut bytes = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > limit {
        return Ok(None);
    }
    Ok(Some(bytes))
}

/// Scan every archive in `dir` on `pool` and categorize the target entries.
///
/// Archives are merged in file-name order; when two archives carry the same
/// internal path, the later one wins.
pub fn scan_archives(dir: &Path, prefixes: &ScanPrefixes, pool: WorkerPool) -> Result<ScanResult> {
    let archives = list_archives(dir)?;
    info!(dir = %dir.display(), archives = archives.len(), "scanning archives");

    let extracted: Vec<Result<EntryMap>> = pool.install(|| {
        archives
            .par_iter()
            .map(|path| extract_from_archive(path, prefixes))
            .collect()
    })?;

    let mut all_files = EntryMap::new();
    let mut summaries = Vec::with_capacity(archives.len());
    for (path, outcome) in archives.iter().zip(extracted) {
        let archive = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match outcome {
            Ok(entries) => {
                summaries.push(ArchiveScan {
                    archive,
                    entries: entries.len(),
                    error: None,
                });
                for (key, entry) in entries {
                    if let Some(previous) = all_files.insert(key, entry) {
                        debug!(path = %previous.path, archive = %previous.archive, "entry overridden by a later archive");
                    }
                }
            }
            Err(e) => {
                error!(archive = %archive, error = %e, "skipping archive");
                summaries.push(ArchiveScan {
                    archive,
                    entries: 0,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    let mut result = ScanResult::partition(all_files, prefixes);
    result.archives = summaries;

    let counts = result.counts();
    info!(
        total = result.total_files(),
        spawn = counts.spawn,
        species = counts.species,
        species_addition = counts.species_addition,
        "archive scan complete"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{patch_bytes, patch_central_size, write_archive, write_stored_archive};
    use std::fs;
    use std::io::Cursor;

    #[test]
    fn test_categorize_prefixes() {
        let prefixes = ScanPrefixes::default();
        assert_eq!(
            prefixes.categorize("data/cobblemon/spawn_pool_world/0025_pikachu.json"),
            Some(EntryCategory::Spawn)
        );
        assert_eq!(
            prefixes.categorize("data/cobblemon/species/generation1/pikachu.json"),
            Some(EntryCategory::Species)
        );
        assert_eq!(
            prefixes.categorize("data/cobblemon/species_addition/mewtwo.json"),
            Some(EntryCategory::SpeciesAddition)
        );
        assert_eq!(prefixes.categorize("data/cobblemon/species_features/x.json"), None);
        assert_eq!(prefixes.categorize("data/cobblemon/species/readme.txt"), None);
        assert_eq!(prefixes.categorize("assets/cobblemon/species/x.json"), None);
    }

    #[test]
    fn test_dir_leaf() {
        let entry = ArchiveEntry::new("data/cobblemon/species/generation1/pikachu.json", b"{}".to_vec(), "a.jar");
        assert_eq!(entry.dir_leaf, "generation1");
        assert_eq!(entry.file_name(), "pikachu.json");
        assert_eq!(ArchiveEntry::new("top.json", Vec::new(), "a.jar").dir_leaf, "");
    }

    #[test]
    fn test_missing_directory() {
        let err = list_archives(Path::new("/no/such/archive/dir")).unwrap_err();
        assert!(matches!(err, Error::ArchiveDirNotFound(_)));
    }

    #[test]
    fn test_list_archives_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        write_archive(dir.path(), "b.jar", &[]);
        write_archive(dir.path(), "a.ZIP", &[]);
        fs::write(dir.path().join("notes.txt"), "hi").unwrap();

        let names: Vec<String> = list_archives(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.ZIP", "b.jar"]);
    }

    #[test]
    fn test_scan_only_keeps_target_json() {
        let dir = tempfile::tempdir().unwrap();
        write_archive(
            dir.path(),
            "cobblemon.jar",
            &[
                ("data/cobblemon/spawn_pool_world/0025_pikachu.json", r#"{"spawns":[]}"#),
                ("data/cobblemon/species/generation1/pikachu.json", r#"{"nationalPokedexNumber":25}"#),
                ("data/cobblemon/species_addition/pikachu.json", r#"{"target_id":"cobblemon:pikachu"}"#),
                ("data/cobblemon/species_features/shiny.json", "{}"),
                ("assets/cobblemon/lang/en_us.json", "{}"),
                ("data/cobblemon/spawn_pool_world/README.md", "text"),
            ],
        );

        let result = scan_archives(dir.path(), &ScanPrefixes::default(), WorkerPool::with_workers(2)).unwrap();
        assert_eq!(
            result.counts(),
            ScanCounts {
                spawn: 1,
                species: 1,
                species_addition: 1
            }
        );

        let prefixes = ScanPrefixes::default();
        for entry in result.all_files() {
            assert!(entry.path.ends_with(".json"));
            assert!(prefixes.categorize(&entry.path).is_some());
            assert_eq!(entry.archive, "cobblemon.jar");
        }
    }

    #[test]
    fn test_corrupt_archive_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.zip"), b"definitely not a zip").unwrap();
        write_archive(
            dir.path(),
            "good.jar",
            &[("data/cobblemon/spawn_pool_world/0001_bulbasaur.json", "{}")],
        );

        let result = scan_archives(dir.path(), &ScanPrefixes::default(), WorkerPool::with_workers(2)).unwrap();
        assert_eq!(result.total_files(), 1);
        assert_eq!(result.archives.len(), 2);

        let broken = result.archives.iter().find(|a| a.archive == "broken.zip").unwrap();
        assert_eq!(broken.entries, 0);
        assert!(broken.error.is_some());
    }

    #[test]
    fn test_later_archive_wins_same_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = "data/cobblemon/spawn_pool_world/0025_pikachu.json";
        write_archive(dir.path(), "a_base.jar", &[(path, r#"{"from":"a"}"#)]);
        write_archive(dir.path(), "b_addon.jar", &[(path, r#"{"from":"b"}"#)]);

        let result = scan_archives(dir.path(), &ScanPrefixes::default(), WorkerPool::with_workers(2)).unwrap();
        assert_eq!(result.spawn_files[path].archive, "b_addon.jar");
    }

    #[test]
    fn test_read_bounded_limit() {
        assert_eq!(read_bounded(Cursor::new(b"abcd"), 4).unwrap(), Some(b"abcd".to_vec()));
        assert_eq!(read_bounded(Cursor::new(b"abcde"), 4).unwrap(), None);
        assert_eq!(read_bounded(Cursor::new(b""), 4).unwrap(), Some(Vec::new()));
    }

    #[test]
    fn test_bogus_entry_size_does_not_abort_scan() {
        let dir = tempfile::tempdir().unwrap();
        let good = "data/cobblemon/spawn_pool_world/0001_bulbasaur.json";
        let bad = "data/cobblemon/spawn_pool_world/0004_charmander.json";
        write_archive(dir.path(), "a_good.jar", &[(good, r#"{"spawns":[]}"#)]);
        let bad_archive = write_stored_archive(dir.path(), "b_bad.jar", &[(bad, r#"{"spawns":[]}"#)]);
        patch_central_size(&bad_archive, bad, 0xFFFF_FFF0);

        let result = scan_archives(dir.path(), &ScanPrefixes::default(), WorkerPool::with_workers(2)).unwrap();
        assert!(result.spawn_files.contains_key(good));
        assert_eq!(result.spawn_files[good].archive, "a_good.jar");
        assert_eq!(result.archives.len(), 2);
    }

    #[test]
    fn test_unreadable_entry_skips_only_that_entry() {
        let dir = tempfile::tempdir().unwrap();
        let ok = "data/cobblemon/spawn_pool_world/0001_bulbasaur.json";
        let broken = "data/cobblemon/spawn_pool_world/0002_ivysaur.json";
        let archive = write_stored_archive(
            dir.path(),
            "cobblemon.jar",
            &[(ok, r#"{"spawns":[]}"#), (broken, r#"{"note":"CHECKSUM-ME"}"#)],
        );
        // Same length, so only the CRC check can notice.
        patch_bytes(&archive, b"CHECKSUM-ME", b"CHECKSUM-XX");

        let result = scan_archives(dir.path(), &ScanPrefixes::default(), WorkerPool::with_workers(2)).unwrap();
        assert!(result.spawn_files.contains_key(ok));
        assert!(!result.spawn_files.contains_key(broken));

        let scanned = &result.archives[0];
        assert_eq!(scanned.archive, "cobblemon.jar");
        assert_eq!(scanned.entries, 1);
        assert!(scanned.error.is_none());
    }
}
