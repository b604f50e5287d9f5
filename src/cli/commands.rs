use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use curriculum_sync::curriculum::{export_plans, parse_import, StudyPlan};
use curriculum_sync::local::Record;
use curriculum_sync::remote::{
    FetchFilter, HttpRemote, RemoteDocument, RemoteStore, PROGRESS_COLLECTION, SCHEDULES_COLLECTION,
};
use curriculum_sync::sync::{LearnerSync, SyncEngine};
use curriculum_sync::{ConfigError, Result, SyncConfig, SyncError};

type Engine = SyncEngine<StudyPlan>;

/// Stand-in used when no remote URL is configured; local commands still work
#[derive(Debug)]
struct Unconfigured;

impl Unconfigured {
    fn error() -> SyncError {
        ConfigError::MissingValue("remote_url").into()
    }
}

#[async_trait]
impl RemoteStore for Unconfigured {
    async fn fetch_all(&self, _filter: FetchFilter) -> Result<Vec<RemoteDocument>> {
        Err(Self::error())
    }

    async fn batch_write(&self, _documents: Vec<RemoteDocument>) -> Result<()> {
        Err(Self::error())
    }

    async fn soft_delete(&self, _id: &str) -> Result<()> {
        Err(Self::error())
    }
}

/// Remote handles for the plan, progress and schedule collections
pub struct Remotes {
    pub plans: Arc<dyn RemoteStore>,
    pub progress: Arc<dyn RemoteStore>,
    pub schedules: Arc<dyn RemoteStore>,
}

pub fn remotes_for(config: &SyncConfig) -> Result<Remotes> {
    if config.remote_url.is_none() {
        return Ok(Remotes {
            plans: Arc::new(Unconfigured),
            progress: Arc::new(Unconfigured),
            schedules: Arc::new(Unconfigured),
        });
    }
    let plans = HttpRemote::new(config)?;
    Ok(Remotes {
        progress: Arc::new(plans.with_collection(PROGRESS_COLLECTION)),
        schedules: Arc::new(plans.with_collection(SCHEDULES_COLLECTION)),
        plans: Arc::new(plans),
    })
}

fn print_records(records: &[Record<StudyPlan>]) {
    for record in records {
        println!(
            "{:<40} {:<9} {} ({})",
            record.id, record.sync_status, record.payload.name, record.payload.subject_name
        );
    }
}

pub fn run_list(engine: &Engine) -> Result<()> {
    let records = engine.list_all();
    print_records(&records);
    println!("{} plans, {} unsynced", records.len(), engine.dirty_count());
    Ok(())
}

pub fn run_dirty(engine: &Engine) -> Result<()> {
    print_records(&engine.list_dirty());
    for id in engine.pending_deletions() {
        println!("{id:<40} deleted");
    }
    Ok(())
}

pub async fn run_pull(engine: &Engine, force: bool) -> Result<()> {
    let pulled = engine
        .pull_from_remote_confirmed(|at_risk| {
            if !force {
                eprintln!("pulling would discard local edits to: {}", at_risk.join(", "));
                eprintln!("push first, or re-run with --force");
            }
            force
        })
        .await?;

    match pulled {
        Some(outcome) => {
            let report = &outcome.report;
            println!(
                "{} plans: {} new from remote, {} refreshed, {} local edits discarded, {} local only",
                outcome.records.len(),
                report.adopted.len(),
                report.refreshed.len(),
                report.overwritten.len(),
                report.kept_local.len()
            );
        }
        None => println!("pull cancelled, nothing changed"),
    }
    Ok(())
}

pub async fn run_push(engine: &Engine) -> Result<()> {
    let report = engine.push_to_remote().await?;
    if report.is_noop() {
        println!("nothing to upload");
        return Ok(());
    }
    println!(
        "{} uploaded, {} deleted remotely",
        report.uploaded.len(),
        report.tombstoned.len()
    );
    if !report.changed_during_upload.is_empty() {
        println!("edited during upload, still unsynced: {}", report.changed_during_upload.join(", "));
    }
    if !report.tombstones_pending.is_empty() {
        println!("deletions to retry: {}", report.tombstones_pending.join(", "));
    }
    Ok(())
}

pub fn run_import(engine: &Engine, file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)?;
    let outcome = parse_import(&text)?;
    for error in &outcome.errors {
        eprintln!("{error}");
    }
    if outcome.is_empty() {
        return Err(SyncError::validation("file", "No valid study plans found in the JSON file"));
    }
    let ids = engine.import(&outcome)?;
    println!("imported {} study plans to local edits", ids.len());
    Ok(())
}

pub fn run_export(engine: &Engine, file: &Path) -> Result<()> {
    let records = engine.list_all();
    std::fs::write(file, export_plans(&records)?)?;
    println!("exported {} study plans to {}", records.len(), file.display());
    Ok(())
}

pub fn run_remove(engine: &Engine, id: &str) -> Result<()> {
    match engine.remove_local(id)? {
        Some(record) if record.ever_synced() => println!("removed {id}; remote copy is deleted on next push"),
        Some(_) => println!("removed {id}"),
        None => println!("no plan with id {id}"),
    }
    Ok(())
}

pub fn run_reset(engine: &Engine) -> Result<()> {
    engine.clear_local_data()?;
    println!("local data cleared");
    Ok(())
}

pub async fn run_schedules(
    learner: &LearnerSync,
    plan: Option<&str>,
    user: Option<&str>,
    pull: bool,
) -> Result<()> {
    if pull {
        let fetched = learner.pull_schedules(user).await?;
        println!("{} schedules refreshed from remote", fetched.len());
    }
    let schedules = learner
        .schedules()
        .list()
        .into_iter()
        .filter(|s| plan.map_or(true, |plan| s.study_plan_id == plan))
        .filter(|s| user.map_or(true, |user| s.user_id == user));
    for schedule in schedules {
        println!(
            "{:<24} {:<16} {:<24} {} ({}h/day, {})",
            schedule.id,
            schedule.user_id,
            schedule.study_plan_id,
            schedule.name,
            schedule.hours_per_day,
            schedule.study_days.join(",")
        );
    }
    Ok(())
}

pub async fn run_progress_push(learner: &LearnerSync, user: &str, schedule: &str) -> Result<()> {
    if learner.push_progress(user, schedule).await? {
        println!("uploaded progress for {user} on {schedule}");
    } else {
        println!("no local progress for {user} on {schedule}");
    }
    Ok(())
}

pub async fn run_progress_pull(learner: &LearnerSync, user: &str, schedule: &str) -> Result<()> {
    match learner.pull_progress(user, schedule).await? {
        Some(progress) => println!(
            "downloaded progress for {user} on {schedule}: {} lessons completed, streak {}",
            progress.lesson_completions.values().filter(|c| c.is_completed).count(),
            progress.current_streak
        ),
        None => println!("no remote progress for {user} on {schedule}"),
    }
    Ok(())
}
