use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "exterminator")]
#[command(about = "Remove an application and the files it left behind", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// The application to operate on.
#[derive(Debug, Args)]
pub struct AppArgs {
    /// Path to the .app bundle
    #[arg(long)]
    pub app: PathBuf,
    /// Bundle identifier, e.g. com.acme.widget
    #[arg(long)]
    pub bundle_id: String,
    /// Display name (defaults to the bundle file name)
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the application's bundle and leftover files
    Scan {
        #[command(flatten)]
        app: AppArgs,
    },
    /// Move the application and its leftovers to the trash
    Delete {
        #[command(flatten)]
        app: AppArgs,
        /// Also remove files that need administrator privileges
        #[arg(long)]
        include_elevated: bool,
        /// Do not ask for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
        /// Quit the application first if it is running (SIGTERM, or SIGKILL with --force)
        #[arg(long)]
        quit: bool,
        /// Delete even if the application is running
        #[arg(long)]
        force: bool,
    },
    /// Inspect or prune the deletion history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Put the files of a recorded deletion back where they were
    Restore { record_id: Uuid },
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Subcommand)]
pub enum HistoryAction {
    /// List recorded deletions, most recent first
    List,
    /// Show the files of one recorded deletion
    Show { record_id: Uuid },
    /// Forget one recorded deletion
    Remove { record_id: Uuid },
    /// Forget all recorded deletions
    Clear,
}
