mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::process;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{AppArgs, Cli, Commands, HistoryAction};
use dotenv::dotenv;
use exterminator_core::model::{DeletionOutcome, DeletionRecord, RestoreOutcome};
use exterminator_core::{running, AppConfig, ApplicationIdentity, Engine, OutcomeStatus, ScanResult};
use indicatif::HumanBytes;
use progress::CliReporter;
use tracing::{error, info, warn};
use uuid::Uuid;

const QUIT_TIMEOUT: Duration = Duration::from_secs(5);

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match exterminator_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    let result = match args.command {
        Some(Commands::Scan { app }) => run_scan(&config, &app),
        Some(Commands::Delete {
            app,
            include_elevated,
            yes,
            quit,
            force,
        }) => run_delete(&config, &app, include_elevated, yes, quit, force),
        Some(Commands::History { action }) => run_history(&config, action),
        Some(Commands::Restore { record_id }) => run_restore(&config, record_id),
        Some(Commands::PrintConfig) => print_config(&config),
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn resolve_identity(app: &AppArgs) -> anyhow::Result<ApplicationIdentity> {
    let identity = ApplicationIdentity::from_bundle_path(&app.app, &app.bundle_id, app.name.as_deref())?;
    Ok(identity)
}

fn run_scan(config: &AppConfig, app: &AppArgs) -> anyhow::Result<()> {
    let identity = resolve_identity(app)?;
    let engine = Engine::new(config.clone())?;
    let reporter = CliReporter::new();
    let result = engine.scan(&identity, &reporter)?;
    print_scan(&result);
    Ok(())
}

fn run_delete(
    config: &AppConfig,
    app: &AppArgs,
    include_elevated: bool,
    yes: bool,
    quit: bool,
    force: bool,
) -> anyhow::Result<()> {
    let identity = resolve_identity(app)?;
    identity.ensure_deletable()?;

    if running::is_running(&identity) {
        if quit {
            info!("Quitting {}", identity.display_name);
            if !running::terminate_and_wait(&identity, force, QUIT_TIMEOUT) {
                bail!("{} did not quit", identity.display_name);
            }
        } else if force {
            warn!("{} is running, deleting anyway", identity.display_name);
        } else {
            bail!(
                "{} is running; quit it first, or pass --quit or --force",
                identity.display_name
            );
        }
    }

    let engine = Engine::new(config.clone())?;
    let reporter = CliReporter::new();
    let result = engine.scan(&identity, &reporter)?;
    print_scan(&result);

    let elevated = result.elevated_count();
    if elevated > 0 && !include_elevated {
        println!(
            "{} item(s) need administrator privileges and will be skipped (use --include-elevated)",
            elevated.to_string().yellow()
        );
    }

    if !yes {
        let prompt = format!(
            "Move {} item(s) ({}) to the trash?",
            result.files.len(),
            HumanBytes(result.total_size_bytes)
        );
        if !prompt_confirm(&prompt, Some(false))? {
            info!("Deletion cancelled");
            return Ok(());
        }
    }

    let (outcome, record) = engine.delete(&identity, &result.files, include_elevated, &reporter)?;
    print_deletion(&outcome);
    if let Some(record) = record {
        println!("Recorded as {}", record.id.to_string().cyan());
    }
    Ok(())
}

fn run_history(config: &AppConfig, action: HistoryAction) -> anyhow::Result<()> {
    let engine = Engine::new(config.clone())?;
    let history = engine.history();

    match action {
        HistoryAction::List => {
            let records = history.all();
            if records.is_empty() {
                println!("No deletions recorded");
            }
            for record in &records {
                println!(
                    "{}  {}  {} ({}, {} files, {})",
                    record.id.to_string().cyan(),
                    record.timestamp.format("%Y-%m-%d %H:%M"),
                    record.app_display_name.bold(),
                    record.bundle_identifier,
                    record.file_count(),
                    HumanBytes(record.total_size_reclaimed())
                );
            }
        }
        HistoryAction::Show { record_id } => {
            let record = history
                .get(record_id)
                .with_context(|| format!("No deletion record with id {record_id}"))?;
            print_record(&record, engine.restorer());
        }
        HistoryAction::Remove { record_id } => {
            if history.remove(record_id)? {
                println!("Removed {}", record_id);
            } else {
                bail!("No deletion record with id {record_id}");
            }
        }
        HistoryAction::Clear => {
            if prompt_confirm("Forget ALL recorded deletions?", Some(false))? {
                history.clear()?;
                println!("History cleared");
            }
        }
    }
    Ok(())
}

fn run_restore(config: &AppConfig, record_id: Uuid) -> anyhow::Result<()> {
    let engine = Engine::new(config.clone())?;
    let reporter = CliReporter::new();
    let outcome = engine.restore(record_id, &reporter)?;
    print_restore(&outcome);
    Ok(())
}

fn print_config(config: &AppConfig) -> anyhow::Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    println!("{rendered}");
    Ok(())
}

fn print_scan(result: &ScanResult) {
    println!();
    println!(
        "{} ({})",
        result.identity.display_name.bold(),
        result.identity.bundle_identifier
    );
    for (category, files) in result.files_by_category() {
        println!("  {}", category.as_str().green());
        for file in files {
            let marker = if file.requires_elevated_privilege { " [admin]".yellow() } else { "".normal() };
            println!(
                "    {} {}{}",
                file.path.display(),
                HumanBytes(file.size_bytes).to_string().dimmed(),
                marker
            );
        }
    }
    println!(
        "{} items, {} total, scanned in {:.2}s",
        result.files.len(),
        HumanBytes(result.total_size_bytes),
        result.scan_duration_secs()
    );
}

fn status_label(status: OutcomeStatus) -> ColoredString {
    match status {
        OutcomeStatus::Complete => "complete".green(),
        OutcomeStatus::Partial => "partial".yellow(),
        OutcomeStatus::Failed => "failed".red(),
    }
}

fn print_deletion(outcome: &DeletionOutcome) {
    println!(
        "Deletion {}: {} trashed ({}), {} failed, {} skipped",
        status_label(outcome.status()),
        outcome.total_deleted(),
        HumanBytes(outcome.size_reclaimed()),
        outcome.total_failed(),
        outcome.total_skipped()
    );
    for (file, err) in &outcome.failed {
        println!("  {} {}: {}", "failed".red(), file.path.display(), err);
    }
    for file in &outcome.skipped_privileged {
        println!("  {} {}", "skipped".yellow(), file.path.display());
    }
}

fn print_record(record: &DeletionRecord, restorer: &exterminator_core::removal::TrashRestorer) {
    println!(
        "{} {} ({}) at {}",
        record.id.to_string().cyan(),
        record.app_display_name.bold(),
        record.bundle_identifier,
        record.timestamp.to_rfc3339()
    );
    for file in &record.deleted_files {
        let state = if restorer.can_restore(file) { "in trash".green() } else { "gone".dimmed() };
        println!(
            "  [{}] {} {} {}",
            file.category.as_str(),
            file.original_path.display(),
            HumanBytes(file.size_bytes),
            state
        );
    }
}

fn print_restore(outcome: &RestoreOutcome) {
    println!(
        "Restore {}: {} restored ({}), {} failed, {} no longer in trash",
        status_label(outcome.status()),
        outcome.total_restored(),
        HumanBytes(outcome.restored_size()),
        outcome.total_failed(),
        outcome.total_not_in_trash()
    );
    for (file, err) in &outcome.failed {
        println!("  {} {}: {}", "failed".red(), file.original_path.display(), err);
    }
    for file in &outcome.not_found_in_trash {
        println!("  {} {}", "missing".yellow(), file.original_path.display());
    }
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
