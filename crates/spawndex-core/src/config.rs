//! Run configuration
//!
//! The config file is JSON and keeps the key names of the processor's
//! existing `config.json`, so old files load unchanged. Values are threaded
//! explicitly through [`crate::pipeline::run`]; nothing here is global.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Archive path prefixes that select spawn, species and addition entries
pub const DEFAULT_SPAWN_PREFIX: &str = "data/cobblemon/spawn_pool_world";
pub const DEFAULT_SPECIES_PREFIX: &str = "data/cobblemon/species";
pub const DEFAULT_SPECIES_ADDITION_PREFIX: &str = "data/cobblemon/species_addition";

/// Settings for one processing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the .zip/.jar archives
    #[serde(rename = "ARCHIVES_DIR", skip_serializing_if = "Option::is_none")]
    pub archives_dir: Option<PathBuf>,

    /// Worker threads used to read archives
    #[serde(rename = "MAX_WORKERS")]
    pub max_workers: usize,

    /// Worker threads used to merge identifiers
    #[serde(rename = "MERGE_CONCURRENCY")]
    pub merge_concurrency: usize,

    /// Colourful console logging
    #[serde(rename = "FUN_MODE")]
    pub fun_mode: bool,

    #[serde(rename = "LOG_LEVEL")]
    pub log_level: String,

    #[serde(rename = "LOG_FILENAME")]
    pub log_filename: PathBuf,

    pub output_filename: String,
    pub skipped_entries_filename: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub species_additions_filename: Option<String>,

    pub primary_sorting_key: String,
    pub secondary_sorting_key: String,

    /// Also merge identifiers that have spawn data but no species record
    pub include_spawn_without_species: bool,

    /// Rows buffered per CSV flush
    pub batch_size: usize,

    pub spawn_prefix: String,
    pub species_prefix: String,
    pub species_addition_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            archives_dir: None,
            max_workers: 8,
            merge_concurrency: 10,
            fun_mode: false,
            log_level: "INFO".to_string(),
            log_filename: PathBuf::from("process_log.txt"),
            output_filename: "output.csv".to_string(),
            skipped_entries_filename: "skipped_entries.csv".to_string(),
            species_additions_filename: None,
            primary_sorting_key: "Pokemon Name".to_string(),
            secondary_sorting_key: "Spawn ID".to_string(),
            include_spawn_without_species: false,
            batch_size: 1000,
            spawn_prefix: DEFAULT_SPAWN_PREFIX.to_string(),
            species_prefix: DEFAULT_SPECIES_PREFIX.to_string(),
            species_addition_prefix: DEFAULT_SPECIES_ADDITION_PREFIX.to_string(),
        }
    }
}

impl Config {
    /// Load a config file. A relative `ARCHIVES_DIR` is resolved against the
    /// directory containing the file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config: Config = serde_json::from_str(&content).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })?;

        if let Some(dir) = config.archives_dir.take() {
            let base = path.parent().unwrap_or_else(|| Path::new(""));
            config.archives_dir = Some(if dir.is_absolute() { dir } else { base.join(dir) });
        }

        Ok(config)
    }

    /// Save the config as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| Error::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }

    /// The archive directory, which every run needs
    pub fn archives_dir(&self) -> Result<&Path> {
        self.archives_dir.as_deref().ok_or(Error::MissingArchivesDir)
    }

    /// Main CSV file name
    pub fn main_output(&self) -> PathBuf {
        with_csv_extension(&self.output_filename)
    }

    /// Skipped-entries CSV file name
    pub fn skipped_output(&self) -> PathBuf {
        with_csv_extension(&self.skipped_entries_filename)
    }

    /// Species-addition CSV file name, derived from the main output name
    /// when not set explicitly
    pub fn additions_output(&self) -> PathBuf {
        match &self.species_additions_filename {
            Some(name) => with_csv_extension(name),
            None => {
                let base = &self.output_filename;
                let stem = if base.to_lowercase().ends_with(".csv") {
                    &base[..base.len() - 4]
                } else {
                    base.as_str()
                };
                with_csv_extension(&format!("{}_species_addition_entries", stem))
            }
        }
    }
}

fn with_csv_extension(name: &str) -> PathBuf {
    if name.ends_with(".csv") {
        PathBuf::from(name)
    } else {
        PathBuf::from(format!("{}.csv", name))
    }
}

/// Which outputs a run produces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Dex-matched rows only
    #[default]
    Default,
    /// Species-addition rows only
    Additions,
    /// Species without spawn data only
    Skipped,
    /// Every output
    Full,
}

/// The stages and outputs selected by a [`RunMode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPlan {
    /// Run the dex-number join
    pub include_normal: bool,
    pub write_main: bool,
    pub write_skipped: bool,
    /// Run the name-keyed species-addition join
    pub include_additions: bool,
}

impl RunMode {
    pub fn plan(self) -> RunPlan {
        match self {
            RunMode::Default => RunPlan {
                include_normal: true,
                write_main: true,
                write_skipped: false,
                include_additions: false,
            },
            RunMode::Additions => RunPlan {
                include_normal: false,
                write_main: false,
                write_skipped: false,
                include_additions: true,
            },
            // The dex join still runs: it is what finds the skipped entries.
            RunMode::Skipped => RunPlan {
                include_normal: true,
                write_main: false,
                write_skipped: true,
                include_additions: false,
            },
            RunMode::Full => RunPlan {
                include_normal: true,
                write_main: true,
                write_skipped: true,
                include_additions: true,
            },
        }
    }
}
