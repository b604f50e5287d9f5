mod cli;
mod commands;

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;

use cli::{Cli, Command, ProgressAction};
use curriculum_sync::curriculum::StudyPlan;
use curriculum_sync::local::FileStore;
use curriculum_sync::shared::telemetry::init_tracing;
use curriculum_sync::sync::{LearnerSync, SyncEngine};
use curriculum_sync::{Identity, Result, SyncConfig};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    init_tracing("curriculum_sync=info");

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => SyncConfig::from_toml_file(path)?,
        None => SyncConfig::from_env()?,
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    if cli.cmd.is_privileged() {
        Identity::from_env().require_privileged()?;
    }

    let kv = Arc::new(FileStore::open(&config.data_dir)?);
    let remotes = commands::remotes_for(&config)?;
    let learner = LearnerSync::new(kv.clone(), remotes.progress, remotes.schedules);
    let engine: SyncEngine<StudyPlan> = SyncEngine::with_config(kv, remotes.plans, &config);
    tracing::debug!(data_dir = %config.data_dir.display(), "store opened");

    match cli.cmd {
        Command::List => commands::run_list(&engine),
        Command::Dirty => commands::run_dirty(&engine),
        Command::Pull { force } => commands::run_pull(&engine, force).await,
        Command::Push => commands::run_push(&engine).await,
        Command::Import { file } => commands::run_import(&engine, &file),
        Command::Export { file } => commands::run_export(&engine, &file),
        Command::Remove { id } => commands::run_remove(&engine, &id),
        Command::Reset => commands::run_reset(&engine),
        Command::Schedules { plan, user, pull } => {
            commands::run_schedules(&learner, plan.as_deref(), user.as_deref(), pull).await
        }
        Command::Progress { action } => match action {
            ProgressAction::Push { user, schedule } => commands::run_progress_push(&learner, &user, &schedule).await,
            ProgressAction::Pull { user, schedule } => commands::run_progress_pull(&learner, &user, &schedule).await,
        },
    }
}
