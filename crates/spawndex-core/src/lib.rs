//! spawndex-core: Core library for building Cobblemon spawn tables
//!
//! This library provides functionality to:
//! - Scan a directory of zip/jar archives for spawn, species and
//!   species_addition JSON files
//! - Index both sides by national dex number and join them
//! - Flatten every spawn condition into a row with its species attributes
//! - Match species additions to spawn conditions by name
//! - Sort the rows and write them as CSV

pub mod additions;
pub mod config;
pub mod error;
pub mod format;
pub mod index;
pub mod matcher;
pub mod merger;
pub mod pipeline;
pub mod pool;
pub mod row;
pub mod scanner;
pub mod sink;

#[cfg(test)]
mod test_support;

pub use additions::{merge_additions, parse_species_additions, AdditionIndex};
pub use config::{Config, RunMode, RunPlan};
pub use error::{Error, Result};
pub use index::{build_spawn_index, build_species_index, SpawnIndex, SpeciesIndex, SpeciesRecord};
pub use matcher::{match_dex_numbers, MatchedDex, MatchedEntry};
pub use merger::{merge_entry, merge_matched, DexMerge, MergeOutcome};
pub use pipeline::{process, run, PipelineOutput, RunSummary, WrittenOutput};
pub use pool::WorkerPool;
pub use row::{CsvRow, MergedRow, SkippedEntry, MAIN_COLUMNS, SKIPPED_COLUMNS};
pub use scanner::{list_archives, scan_archives, ArchiveEntry, EntryMap, ScanCounts, ScanPrefixes, ScanResult};
pub use sink::{sort_rows, write_csv, write_rows};
