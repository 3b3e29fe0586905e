//! End-to-end run: scan, index, match, merge, sort, write

use crate::additions::{merge_additions, parse_species_additions};
use crate::config::{Config, RunMode, RunPlan};
use crate::error::Result;
use crate::index::{build_spawn_index, build_species_index};
use crate::matcher::match_dex_numbers;
use crate::merger::merge_matched;
use crate::pool::WorkerPool;
use crate::row::{MergedRow, SkippedEntry};
use crate::scanner::{scan_archives, ScanCounts, ScanPrefixes};
use crate::sink::{sort_rows, write_csv};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Sorted rows produced by a run, before anything is written
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub counts: ScanCounts,
    pub rows: Vec<MergedRow>,
    pub skipped: Vec<SkippedEntry>,
    pub additions: Vec<MergedRow>,
}

/// A CSV file written by a run
#[derive(Debug, Clone, Serialize)]
pub struct WrittenOutput {
    pub path: PathBuf,
    pub rows: usize,
}

/// What a completed run did
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub counts: ScanCounts,
    pub outputs: Vec<WrittenOutput>,
}

impl RunSummary {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Scan the archives and build every row set selected by `plan`.
pub fn process(config: &Config, plan: RunPlan) -> Result<PipelineOutput> {
    let archives_dir = config.archives_dir()?;

    if config.fun_mode {
        info!("~*~ spinning up archive scanners! whirr-click ~*~");
    }
    let scan = scan_archives(
        archives_dir,
        &ScanPrefixes::from_config(config),
        WorkerPool::with_workers(config.max_workers),
    )?;
    if config.fun_mode {
        info!("~*~ archives dutifully raided ~*~");
    }

    let merge_pool = WorkerPool::with_workers(config.merge_concurrency);
    let mut output = PipelineOutput {
        counts: scan.counts(),
        ..Default::default()
    };

    if plan.include_normal {
        let spawn_index = build_spawn_index(&scan.spawn_files);
        let species_index = build_species_index(&scan.species_files);
        let matched = match_dex_numbers(&spawn_index, &species_index);
        let merge = merge_matched(&matched, config.include_spawn_without_species, merge_pool)?;
        output.rows = merge.rows;
        output.skipped = merge.skipped;
    }

    if plan.include_additions {
        let additions = parse_species_additions(&scan.species_addition_files);
        output.additions = merge_additions(&scan.spawn_files, &additions, merge_pool)?;
    }

    let (primary, secondary) = (&config.primary_sorting_key, &config.secondary_sorting_key);
    sort_rows(&mut output.rows, primary, secondary);
    sort_rows(&mut output.skipped, primary, secondary);
    sort_rows(&mut output.additions, primary, secondary);

    Ok(output)
}

/// Run the pipeline in `mode` and write the selected CSV files.
///
/// Nothing is written unless the archive scan succeeds.
pub fn run(config: &Config, mode: RunMode) -> Result<RunSummary> {
    let started_at = Utc::now();
    let plan = mode.plan();
    info!(
        ?mode,
        normal = plan.include_normal,
        additions = plan.include_additions,
        skipped_csv = plan.write_skipped,
        write_main = plan.write_main,
        "starting run"
    );

    let output = process(config, plan)?;

    let mut outputs = Vec::new();
    if plan.include_normal && plan.write_main {
        let path = config.main_output();
        write_csv(&path, &output.rows, config.batch_size)?;
        outputs.push(WrittenOutput {
            path,
            rows: output.rows.len(),
        });
    }
    if plan.include_normal && plan.write_skipped {
        let path = config.skipped_output();
        write_csv(&path, &output.skipped, config.batch_size)?;
        outputs.push(WrittenOutput {
            path,
            rows: output.skipped.len(),
        });
    }
    if plan.include_additions {
        let path = config.additions_output();
        write_csv(&path, &output.additions, config.batch_size)?;
        outputs.push(WrittenOutput {
            path,
            rows: output.additions.len(),
        });
    }

    let summary = RunSummary {
        mode,
        started_at,
        finished_at: Utc::now(),
        counts: output.counts,
        outputs,
    };
    info!(
        elapsed_ms = summary.elapsed().num_milliseconds(),
        files = summary.outputs.len(),
        "done"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::test_support::write_archive;
    use std::path::Path;

    fn fixture(dir: &Path) {
        write_archive(
            dir,
            "cobblemon.jar",
            &[
                (
                    "data/cobblemon/spawn_pool_world/0025_pikachu.json",
                    r#"{"spawns":[
                        {"id":"pikachu-2","pokemon":"pikachu","bucket":"common","condition":{"isRaining":true}},
                        {"id":"pikachu-1","pokemon":"Pikachu","bucket":"rare","condition":{"moonPhase":[0,4]}}
                    ]}"#,
                ),
                (
                    "data/cobblemon/spawn_pool_world/0001_bulbasaur.json",
                    r#"{"spawns":[{"id":"bulbasaur-1","pokemon":"bulbasaur","canSeeSky":false}]}"#,
                ),
                (
                    "data/cobblemon/spawn_pool_world/9001_missingmon.json",
                    r#"{"spawns":[{"id":"missingmon-1","pokemon":"missingmon"}]}"#,
                ),
                (
                    "data/cobblemon/species/generation1/pikachu.json",
                    r#"{"nationalPokedexNumber":25,"name":"Pikachu","primaryType":"electric","labels":["gen1"]}"#,
                ),
                (
                    "data/cobblemon/species/generation1/bulbasaur.json",
                    r#"{"nationalPokedexNumber":1,"name":"Bulbasaur","primaryType":"grass","secondaryType":"poison"}"#,
                ),
                (
                    "data/cobblemon/species/generation1/raichu.json",
                    r#"{"nationalPokedexNumber":26,"name":"Raichu","primaryType":"electric"}"#,
                ),
            ],
        );
        write_archive(
            dir,
            "addon.zip",
            &[(
                "data/cobblemon/species_addition/missingmon.json",
                r#"{"target_id":"addon:missingmon","primaryType":"ghost"}"#,
            )],
        );
    }

    fn config_for(archives: &Path, out: &Path) -> Config {
        Config {
            archives_dir: Some(archives.to_path_buf()),
            max_workers: 2,
            merge_concurrency: 2,
            output_filename: out.join("output.csv").to_string_lossy().into_owned(),
            skipped_entries_filename: out.join("skipped").to_string_lossy().into_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn test_process_full() {
        let archives = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fixture(archives.path());
        let config = config_for(archives.path(), out.path());

        let output = process(&config, RunMode::Full.plan()).unwrap();
        assert_eq!(
            output.counts,
            ScanCounts {
                spawn: 3,
                species: 3,
                species_addition: 1
            }
        );

        // Sorted by Pokemon Name, then Spawn ID; 9001 has no species record.
        let ids: Vec<&str> = output.rows.iter().map(|r| r.spawn_id.as_str()).collect();
        assert_eq!(ids, vec!["bulbasaur-1", "pikachu-1", "pikachu-2"]);

        let bulbasaur = &output.rows[0];
        assert_eq!(bulbasaur.dex_number, "#0001");
        assert_eq!(bulbasaur.secondary_type, "Poison");
        assert_eq!(bulbasaur.sky, "CANNOT SEE");

        let pikachu = &output.rows[1];
        assert_eq!(pikachu.moon_phase, "Full Moon, New Moon");
        assert_eq!(pikachu.generation, "Gen 1");
        assert_eq!(output.rows[2].weather, "Rain");

        assert_eq!(output.skipped.len(), 1);
        assert_eq!(output.skipped[0].dex_number, "0026");

        assert_eq!(output.additions.len(), 1);
        assert_eq!(output.additions[0].dex_number, "#----");
        assert_eq!(output.additions[0].primary_type, "Ghost");
    }

    #[test]
    fn test_run_writes_selected_outputs() {
        let archives = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fixture(archives.path());
        let config = config_for(archives.path(), out.path());

        let summary = run(&config, RunMode::Skipped).unwrap();
        assert_eq!(summary.outputs.len(), 1);
        assert_eq!(summary.outputs[0].path, out.path().join("skipped.csv"));
        assert!(!out.path().join("output.csv").exists());

        let content = std::fs::read_to_string(out.path().join("skipped.csv")).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("Dex Number,Pokemon Name"));
        assert!(lines.next().unwrap().starts_with("0026,Raichu,electric"));
        assert!(lines.next().is_none());

        let summary = run(&config, RunMode::Full).unwrap();
        assert_eq!(summary.outputs.len(), 3);
        assert!(out.path().join("output_species_addition_entries.csv").exists());
    }

    #[test]
    fn test_missing_archive_dir_writes_nothing() {
        let out = tempfile::tempdir().unwrap();
        let config = config_for(&out.path().join("nope"), out.path());

        let err = run(&config, RunMode::Full).unwrap_err();
        assert!(matches!(err, Error::ArchiveDirNotFound(_)));
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }
}
