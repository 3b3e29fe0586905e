//! Spawndex CLI
//!
//! Command-line tool for exporting Cobblemon spawn and species data from
//! mod archives to CSV.

mod logging;

use clap::{Args, Parser, Subcommand, ValueEnum};
use spawndex_core::{scan_archives, Config, RunMode, ScanPrefixes, WorkerPool};
use std::path::{Path, PathBuf};
use tracing::info;

/// Config file picked up from the working directory when `--config` is absent
const DEFAULT_CONFIG_FILE: &str = "config.json";

#[derive(Parser)]
#[command(name = "spawndex")]
#[command(about = "Cobblemon spawn table exporter", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan archives, merge spawn and species data, and write CSV files
    Run {
        #[command(flatten)]
        source: SourceArgs,

        /// Which outputs to produce
        #[arg(short, long, value_enum, default_value_t = Mode::Default)]
        mode: Mode,

        #[command(flatten)]
        overrides: RunOverrides,
    },

    /// Scan archives and report what was found, without writing anything
    Scan {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Write a default config file
    InitConfig {
        /// Output path for the config file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        output: PathBuf,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Config file (defaults to ./config.json when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the .zip/.jar archives
    #[arg(short, long)]
    archives_dir: Option<PathBuf>,
}

#[derive(Args, Default)]
struct RunOverrides {
    /// Archive reader threads
    #[arg(long)]
    max_workers: Option<usize>,

    /// Main CSV file
    #[arg(long)]
    output_main: Option<String>,

    /// Skipped-entries CSV file
    #[arg(long)]
    output_skipped: Option<String>,

    /// Species-addition CSV file
    #[arg(long)]
    output_additions: Option<String>,

    /// Primary sort column
    #[arg(long)]
    sort_primary: Option<String>,

    /// Secondary sort column
    #[arg(long)]
    sort_secondary: Option<String>,
}

impl RunOverrides {
    fn apply(self, config: &mut Config) {
        if let Some(n) = self.max_workers {
            config.max_workers = n;
        }
        if let Some(name) = self.output_main {
            config.output_filename = name;
        }
        if let Some(name) = self.output_skipped {
            config.skipped_entries_filename = name;
        }
        if let Some(name) = self.output_additions {
            config.species_additions_filename = Some(name);
        }
        if let Some(key) = self.sort_primary {
            config.primary_sorting_key = key;
        }
        if let Some(key) = self.sort_secondary {
            config.secondary_sorting_key = key;
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Dex-matched rows
    Default,
    /// Species-addition rows only
    Additions,
    /// Species without spawn data only
    Skipped,
    /// All three outputs
    Full,
}

impl From<Mode> for RunMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Default => RunMode::Default,
            Mode::Additions => RunMode::Additions,
            Mode::Skipped => RunMode::Skipped,
            Mode::Full => RunMode::Full,
        }
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> spawndex_core::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            source,
            mode,
            overrides,
        } => {
            let mut config = resolve_config(&source)?;
            overrides.apply(&mut config);
            cmd_run(&config, mode.into())
        }
        Commands::Scan { source } => cmd_scan(&resolve_config(&source)?),
        Commands::InitConfig { output } => cmd_init_config(&output),
    }
}

/// `--config` if given, else ./config.json if present, else defaults; then
/// `--archives-dir` on top.
fn resolve_config(source: &SourceArgs) -> spawndex_core::Result<Config> {
    let mut config = match &source.config {
        Some(path) => Config::load(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Config::load(DEFAULT_CONFIG_FILE)?,
        None => Config::default(),
    };
    if let Some(dir) = &source.archives_dir {
        config.archives_dir = Some(dir.clone());
    }
    Ok(config)
}

fn cmd_run(config: &Config, mode: RunMode) -> spawndex_core::Result<()> {
    let _guards = logging::init(config)?;
    if config.fun_mode {
        info!("~*~ fun mode engaged, let's catch 'em all ~*~");
    }

    let summary = spawndex_core::run(config, mode)?;

    println!(
        "Scanned {} spawn, {} species and {} species_addition files",
        summary.counts.spawn, summary.counts.species, summary.counts.species_addition
    );
    for output in &summary.outputs {
        println!("Wrote {} rows to {}", output.rows, output.path.display());
    }
    println!(
        "Finished in {:.2}s",
        summary.elapsed().num_milliseconds() as f64 / 1000.0
    );

    Ok(())
}

fn cmd_scan(config: &Config) -> spawndex_core::Result<()> {
    let _guards = logging::init(config)?;

    let dir = config.archives_dir()?;
    let result = scan_archives(
        dir,
        &ScanPrefixes::from_config(config),
        WorkerPool::with_workers(config.max_workers),
    )?;

    println!("Scanned {} archive(s) in {}:", result.archives.len(), dir.display());
    for archive in &result.archives {
        match &archive.error {
            Some(err) => println!("  {} (failed: {})", archive.archive, err),
            None => println!("  {} ({} target files)", archive.archive, archive.entries),
        }
    }
    println!();

    let counts = result.counts();
    println!("Found {} files:", result.total_files());
    println!("  spawn:            {}", counts.spawn);
    println!("  species:          {}", counts.species);
    println!("  species_addition: {}", counts.species_addition);

    Ok(())
}

fn cmd_init_config(output: &Path) -> spawndex_core::Result<()> {
    Config::default().save(output)?;
    println!("Created config template: {}", output.display());
    println!("Set ARCHIVES_DIR before running.");
    Ok(())
}
