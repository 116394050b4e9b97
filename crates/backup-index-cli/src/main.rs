mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::path::Path;
use std::process;

use anyhow::{Context, Result};
use backup_index_core::storage::{Resource, ResourceFilter, SyncState};
use backup_index_core::{AppConfig, Database, SyncEngine};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use progress::CliReporter;
use tracing::{error, info};

fn main() -> Result<()> {
    dotenv().ok();

    let args = Cli::parse();

    let _guard = logging::init_logger(args.debug, args.verbose, args.log_path.as_deref());

    let config = match backup_index_core::config::load_configuration(args.settings.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let result = match args.command {
        Some(Commands::Scan) => run_scan(&config),
        Some(Commands::Sync) => run_sync(&config),
        Some(Commands::Run) => run_all(&config),
        Some(Commands::List { csv }) => match csv {
            Some(path) => write_csv(&config, &path),
            None => print_listing(&config, ResourceFilter::All),
        },
        Some(Commands::Status) => print_status(&config),
        Some(Commands::Stalled) => print_listing(&config, ResourceFilter::Stalled),
        Some(Commands::Restore { target }) => run_restore(&config, &target),
        Some(Commands::Flush { yes }) => run_flush(&config, yes),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
            Ok(())
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        process::exit(1);
    }

    Ok(())
}

fn run_scan(config: &AppConfig) -> Result<()> {
    let engine = SyncEngine::new(config.clone());
    let stats = engine.scan(&CliReporter::new())?;

    info!(
        "{} registered, {} refreshed, {} unchanged, {} skipped",
        format!("{}", stats.registered).green(),
        format!("{}", stats.refreshed).yellow(),
        format!("{}", stats.unchanged).cyan(),
        format!("{}", stats.skipped).red(),
    );
    Ok(())
}

fn run_sync(config: &AppConfig) -> Result<()> {
    let engine = SyncEngine::new(config.clone());
    let store = engine.remote_store();
    let stats = engine.sync(&store, &CliReporter::new())?;

    info!(
        "{} synced, {} failed, {} stalled, {} skipped",
        format!("{}", stats.synced).green(),
        format!("{}", stats.failed).yellow(),
        format!("{}", stats.stalled).red(),
        format!("{}", stats.skipped).cyan(),
    );
    Ok(())
}

fn run_all(config: &AppConfig) -> Result<()> {
    let engine = SyncEngine::new(config.clone());
    let store = engine.remote_store();
    let result = engine.run(&store, &CliReporter::new())?;

    println!();
    info!(
        "Scan: {}, Sync: {}",
        format!("{:.2}s", result.scan_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.drain_duration.as_secs_f64()).green(),
    );
    info!(
        "{} registered, {} refreshed, {} unchanged",
        format!("{}", result.scan.registered).green(),
        format!("{}", result.scan.refreshed).yellow(),
        format!("{}", result.scan.unchanged).cyan(),
    );
    info!(
        "{} synced, {} failed, {} stalled",
        format!("{}", result.drain.synced).green(),
        format!("{}", result.drain.failed).yellow(),
        format!("{}", result.drain.stalled).red(),
    );
    Ok(())
}

fn open_database(config: &AppConfig) -> Result<Database> {
    Database::open(&config.database_path)
        .with_context(|| format!("opening database {}", config.database_path))
}

fn print_listing(config: &AppConfig, filter: ResourceFilter) -> Result<()> {
    let db = open_database(config)?;
    let mut shown = 0usize;

    let header = format!(
        "{:<12} {:>12} {:>6}  {:<20} {}",
        "STATE", "SIZE", "FAILS", "LAST SYNC", "NAME"
    );
    println!("{}", header.bold());
    for group in db.groups(filter, config.chunk_size)? {
        for resource in group? {
            println!("{}", format_row(&resource));
            shown += 1;
        }
    }
    info!("{} resources listed", shown);
    Ok(())
}

fn format_row(resource: &Resource) -> String {
    let state = resource.state();
    let label = format!("{:<12}", state.as_str());
    let label = match state {
        SyncState::Synced => label.green(),
        SyncState::Stalled => label.red(),
        SyncState::Queued | SyncState::InProgress => label.yellow(),
        SyncState::Directory | SyncState::Idle => label.normal(),
    };
    let last_sync = resource
        .last_synchronized
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} {:>12} {:>6}  {:<20} {}",
        label, resource.size, resource.times_failed, last_sync, resource.filename
    )
}

fn write_csv(config: &AppConfig, path: &Path) -> Result<()> {
    let db = open_database(config)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    writer.write_record([
        "id",
        "filename",
        "size",
        "last_modified",
        "add_date",
        "last_synchronized",
        "state",
        "times_failed",
        "checksum",
        "is_directory",
    ])?;

    let mut rows = 0usize;
    for group in db.ordered_groups(config.chunk_size)? {
        for resource in group? {
            writer.write_record([
                resource.id.to_string(),
                resource.filename.clone(),
                resource.size.to_string(),
                resource.last_modified.to_rfc3339(),
                resource.add_date.to_rfc3339(),
                resource
                    .last_synchronized
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default(),
                resource.state().to_string(),
                resource.times_failed.to_string(),
                resource.checksum.clone().unwrap_or_default(),
                resource.is_directory.to_string(),
            ])?;
            rows += 1;
        }
    }
    writer.flush()?;

    info!("Wrote {} rows to {}", rows, path.display());
    Ok(())
}

fn print_status(config: &AppConfig) -> Result<()> {
    let db = open_database(config)?;
    let summary = db.status_summary()?;

    println!("{:<12} {}", "Total:", summary.total);
    println!("{:<12} {}", "Directories:", summary.directories);
    println!("{:<12} {}", "Queued:", format!("{}", summary.queued).yellow());
    println!("{:<12} {}", "In progress:", format!("{}", summary.in_progress).yellow());
    println!("{:<12} {}", "Synced:", format!("{}", summary.synced).green());
    println!("{:<12} {}", "Stalled:", format!("{}", summary.stalled).red());
    Ok(())
}

fn run_restore(config: &AppConfig, target: &Path) -> Result<()> {
    let engine = SyncEngine::new(config.clone());
    let store = engine.remote_store();
    let stats = engine
        .restore(&store, target)
        .with_context(|| format!("restoring into {}", target.display()))?;

    info!(
        "{} files, {} directories restored, {} never synchronized, {} failed",
        format!("{}", stats.files).green(),
        format!("{}", stats.directories).cyan(),
        format!("{}", stats.skipped).yellow(),
        format!("{}", stats.failed).red(),
    );
    Ok(())
}

fn run_flush(config: &AppConfig, yes: bool) -> Result<()> {
    if !yes
        && !prompt_confirm(
            "Are you SURE you want to COMPLETELY FLUSH the file index?",
            Some(false),
        )?
    {
        return Ok(());
    }

    let db = open_database(config)?;
    db.truncate_all()?;
    println!("File index flushed");
    Ok(())
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
