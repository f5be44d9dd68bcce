//! Forgelog CLI - record and inspect structured logs

use clap::{Args, Parser, Subcommand};
use forgelog::config::{self, BackendKind, SinkOptions};
use forgelog::delimited;
use forgelog::storage::{LogStats, LogStore, StoredEntry};
use forgelog::ui::{self, Icons};
use forgelog::LogSink;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "forgelog")]
#[command(version)]
#[command(about = "Structured log sink with console, delimited-file and SQLite backends")]
#[command(long_about = r#"
Forgelog writes leveled, timestamped records to one of three backends:
  • console         formatted lines on stdout
  • delimited-file  quoted CSV with a timestamp,level,message header
  • embedded-table  a `logs` table in a SQLite database

Example usage:
  forgelog init --backend embedded-table --database logs/app.db
  forgelog record --level warn --message "disk almost full"
  forgelog tail --limit 20
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (defaults to forgelog.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Backend selection; overrides the config file when given
#[derive(Args, Clone, Default)]
struct TargetArgs {
    /// Backend kind (console, delimited-file, embedded-table)
    #[arg(short, long)]
    backend: Option<BackendKind>,

    /// Delimited-file destination
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Embedded-table database
    #[arg(short, long)]
    database: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Append one record
    Record {
        /// Level name (info, warn, error, debug, or any other label)
        #[arg(short, long, default_value = "info")]
        level: String,

        /// Message text
        #[arg(short, long)]
        message: String,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Show the most recent records
    Tail {
        /// Maximum number of records
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Count records per level
    Stats {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Write a config file
    Init {
        #[command(flatten)]
        target: TargetArgs,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Record { level, message, target } => {
            let options = resolve_options(cli.config.as_deref(), &target)?;
            tracing::debug!("Recording to {} backend", options.backend);

            let mut sink = LogSink::new(options)?;
            sink.record(&level, &message);
            sink.close();
        }

        Commands::Tail { limit, format, target } => {
            let options = resolve_options(cli.config.as_deref(), &target)?;
            let entries = read_recent(&options, limit)?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("∅ No records found.");
            } else {
                for entry in entries {
                    println!("{}", ui::styled_entry(&entry.timestamp, &entry.level, &entry.message));
                }
            }
        }

        Commands::Stats { target } => {
            let options = resolve_options(cli.config.as_deref(), &target)?;
            let (icon, location, stats) = match options.backend {
                BackendKind::Console => anyhow::bail!("the console backend keeps no history"),
                BackendKind::DelimitedFile => {
                    let path = required_path(options.file_path, "--file")?;
                    let entries = delimited::read_entries(&path)?;
                    (Icons::FILE, path, count_levels(entries.iter().map(|e| e.level.as_str())))
                }
                BackendKind::EmbeddedTable => {
                    let path = required_path(options.database_path, "--database")?;
                    let store = LogStore::open(&path)?;
                    let stats = store.stats()?;
                    store.close()?;
                    (Icons::DATABASE, path, stats)
                }
            };

            ui::header(icon, &format!("Forgelog Statistics ({})", location.display()));
            ui::info("Backend", options.backend.as_str());
            if stats.total == 0 {
                println!("∅ No records found.");
            } else {
                println!("{}", ui::stats_table(&stats));
            }
        }

        Commands::Init { target, force } => {
            let path = cli.config.unwrap_or_else(config::default_config_path);
            let options = options_from_args(&target).unwrap_or_default();
            options.validate()?;

            config::write_config(&path, &options, force)?;
            ui::success(&format!("Wrote {} ({} backend)", path.display(), options.backend));
        }
    }

    Ok(())
}

/// Command-line flags win; otherwise the config file; otherwise console
fn resolve_options(
    config_path: Option<&std::path::Path>,
    target: &TargetArgs,
) -> anyhow::Result<SinkOptions> {
    if let Some(options) = options_from_args(target) {
        return Ok(options);
    }
    Ok(config::load_config(config_path)?.unwrap_or_default())
}

fn options_from_args(target: &TargetArgs) -> Option<SinkOptions> {
    let backend = match (target.backend, &target.file, &target.database) {
        (Some(kind), _, _) => kind,
        (None, Some(_), _) => BackendKind::DelimitedFile,
        (None, None, Some(_)) => BackendKind::EmbeddedTable,
        (None, None, None) => return None,
    };

    Some(SinkOptions {
        backend,
        file_path: target.file.clone(),
        database_path: target.database.clone(),
    })
}

fn required_path(path: Option<PathBuf>, flag: &str) -> anyhow::Result<PathBuf> {
    path.ok_or_else(|| anyhow::anyhow!("{} (or a config file) is required for this backend", flag))
}

fn read_recent(options: &SinkOptions, limit: usize) -> anyhow::Result<Vec<StoredEntry>> {
    match options.backend {
        BackendKind::Console => anyhow::bail!("the console backend keeps no history"),
        BackendKind::DelimitedFile => {
            let path = required_path(options.file_path.clone(), "--file")?;
            let entries = delimited::read_entries(&path)?;
            let skip = entries.len().saturating_sub(limit);
            Ok(entries
                .into_iter()
                .enumerate()
                .skip(skip)
                .map(|(i, e)| StoredEntry {
                    id: i as i64 + 1,
                    timestamp: e.timestamp,
                    level: e.level,
                    message: e.message,
                })
                .collect())
        }
        BackendKind::EmbeddedTable => {
            let path = required_path(options.database_path.clone(), "--database")?;
            let store = LogStore::open(&path)?;
            let entries = store.recent_entries(limit)?;
            store.close()?;
            Ok(entries)
        }
    }
}

fn count_levels<'a>(levels: impl Iterator<Item = &'a str>) -> LogStats {
    let mut counts: std::collections::BTreeMap<String, usize> = std::collections::BTreeMap::new();
    for level in levels {
        *counts.entry(level.to_string()).or_default() += 1;
    }
    LogStats::from_levels(counts.into_iter().collect())
}
