use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "curriculum-sync")]
#[command(about = "Local-first study plan store with remote sync")]
pub struct Cli {
    /// TOML configuration file; environment variables are used when absent
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the local data directory
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List every local plan with its sync status
    List,
    /// List unsynced plans and pending remote deletions
    Dirty,
    /// Fetch the remote snapshot and merge it into the local store
    Pull {
        /// Discard local edits to plans that also exist remotely
        #[arg(long)]
        force: bool,
    },
    /// Upload unsynced plans and pending deletions
    Push,
    /// Import plans from a JSON file as local edits
    Import { file: PathBuf },
    /// Write all local plans to a JSON file
    Export { file: PathBuf },
    /// Remove a plan locally; the remote copy is tombstoned on the next push
    Remove { id: String },
    /// Delete all local data
    Reset,
    /// List local study schedules
    Schedules {
        /// Only schedules of this study plan
        #[arg(long)]
        plan: Option<String>,
        /// Only schedules of this user
        #[arg(long)]
        user: Option<String>,
        /// Refresh from the remote store first
        #[arg(long)]
        pull: bool,
    },
    /// Copy one learner's progress to or from the remote store
    Progress {
        #[command(subcommand)]
        action: ProgressAction,
    },
}

#[derive(Subcommand)]
pub enum ProgressAction {
    /// Upload local progress
    Push {
        #[arg(long)]
        user: String,
        #[arg(long)]
        schedule: String,
    },
    /// Replace local progress with the remote copy
    Pull {
        #[arg(long)]
        user: String,
        #[arg(long)]
        schedule: String,
    },
}

impl Command {
    /// Whether the command changes curriculum content
    pub fn is_privileged(&self) -> bool {
        !matches!(
            self,
            Command::List
                | Command::Dirty
                | Command::Export { .. }
                | Command::Schedules { .. }
                | Command::Progress { .. }
        )
    }
}
