//! `stratactl`: run the library scan pipeline from a shell.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use strata_config::{FolderConfig, ScannerConfig, ScannerConfigSource};
use strata_core::media::DefaultTagReader;
use strata_core::memory::{MemoryAuditLog, MemoryCatalog, MemoryIndex};
use strata_core::scan::{ScanPorts, ScanService};
use strata_model::ScanEventType;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "stratactl", about = "Strata library scanner", version)]
struct Cli {
    /// Scanner config file (TOML or JSON). Overrides the environment lookup.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan music folders once and print the audit trail
    Scan {
        /// Music folder to scan; repeatable. Replaces folders from the config.
        #[arg(long = "folder", value_name = "PATH")]
        folders: Vec<PathBuf>,
        /// Ignore file timestamps and rebuild everything
        #[arg(long)]
        force: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the fixed phase sequence with progress fractions
    Phases,
    /// Print the effective scanner settings and where they came from
    Config,
}

fn load_config(path: Option<PathBuf>) -> Result<(ScannerConfig, ScannerConfigSource)> {
    let loaded = match path {
        Some(path) => {
            let config = ScannerConfig::load_from_file(&path)?;
            (config, ScannerConfigSource::File(path))
        }
        None => ScannerConfig::load_from_env()?,
    };
    let warnings = loaded.0.warnings();
    warnings.log();
    info!(target: "scan::config", source = %loaded.1, warnings = warnings.len(), "scanner config loaded");
    Ok(loaded)
}

async fn scan(
    mut config: ScannerConfig,
    folders: Vec<PathBuf>,
    force: bool,
    json: bool,
) -> Result<()> {
    if !folders.is_empty() {
        config.folders = folders
            .into_iter()
            .map(|path| FolderConfig { path, name: None })
            .collect();
    }
    if config.folders.is_empty() {
        bail!("no music folders: pass --folder or list [[folders]] in the config");
    }
    config.settings.scan.ignore_file_timestamps |= force;

    let catalog = MemoryCatalog::new();
    for folder in &config.folders {
        let path = folder
            .path
            .canonicalize()
            .with_context(|| format!("music folder {} is not accessible", folder.path.display()))?;
        catalog.add_folder(path, folder.display_name()).await;
    }
    let audit = MemoryAuditLog::new();
    let ports = ScanPorts::in_memory(
        catalog.clone(),
        MemoryIndex::new(),
        audit.clone(),
        Arc::new(DefaultTagReader::default()),
        &config.settings,
    );
    let service = ScanService::new(ports, config.settings);

    let report = service
        .run_scan()
        .await
        .context("maintenance lock unexpectedly held")?;
    let events = audit.all().await;
    let entries = catalog.entries().await;
    let albums = catalog.albums().await;
    let artists = catalog.artists().await;

    if json {
        let body = serde_json::json!({
            "run_id": report.run_id,
            "scan_date": report.scan_date,
            "outcome": report.outcome.to_string(),
            "processed": report.processed,
            "error": report.error,
            "entries": entries.len(),
            "albums": albums.len(),
            "artists": artists.len(),
            "events": events,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        for event in &events {
            println!(
                "{}  {:<28} {}",
                event.emitted_at.format("%H:%M:%S%.3f"),
                event.event_type,
                event.comment.as_deref().unwrap_or("")
            );
        }
        println!();
        println!(
            "{}: {} entries processed, {} catalog rows, {} albums, {} artists",
            report.outcome,
            report.processed,
            entries.len(),
            albums.len(),
            artists.len()
        );
        if let Some(error) = &report.error {
            println!("error: {error}");
        }
    }

    if report.error.is_some() {
        bail!("scan failed");
    }
    Ok(())
}

fn phases() {
    for (index, tag) in ScanEventType::SEQUENCE.iter().enumerate() {
        println!(
            "{:>2}  {:<28} {:>5.1}%",
            index + 1,
            tag,
            ScanEventType::progress(Some(*tag)) * 100.0
        );
    }
}

fn show_config(config: &ScannerConfig, source: &ScannerConfigSource) -> Result<()> {
    println!("# source: {source}");
    for warning in config.warnings().iter() {
        println!("# warning: {warning}");
    }
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,scan::progress=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Scan {
            folders,
            force,
            json,
        } => {
            let (config, _) = load_config(cli.config)?;
            scan(config, folders, force, json).await
        }
        Command::Phases => {
            phases();
            Ok(())
        }
        Command::Config => {
            let (config, source) = load_config(cli.config)?;
            show_config(&config, &source)
        }
    }
}
