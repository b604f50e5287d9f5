//! End-to-end scenarios against in-memory local and remote stores

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use std::time::Duration;

use crate::common::{harness, plan, remote_plan, reopen};
use curriculum_sync::remote::{FetchFilter, RemoteFailure, RemoteOp, RemoteStore};
use curriculum_sync::sync::{LoadSource, SyncStatus};
use curriculum_sync::SyncError;

#[tokio::test]
async fn test_create_push_scenario() {
    let h = harness();
    let badge = h.engine.subscribe();

    crate::assert_ok!(h.engine.upsert_local("p1", plan("Algebra")));
    assert_eq!(h.engine.dirty_count(), 1);
    assert_eq!(badge.count(), 1);

    let report = crate::assert_ok!(h.engine.push_to_remote().await);
    assert_eq!(report.uploaded, vec!["p1".to_string()]);

    assert_eq!(h.engine.dirty_count(), 0);
    assert_eq!(badge.count(), 0);
    let record = h.engine.get_one("p1").unwrap();
    assert_eq!(record.sync_status, SyncStatus::Synced);
    assert!(record.last_synced_at.unwrap() >= record.updated_at);
}

#[tokio::test]
async fn test_upsert_then_get_returns_payload() {
    let h = harness();
    let payload = plan("Geometry");
    h.engine.upsert_local("p1", payload.clone()).unwrap();
    assert_eq!(h.engine.get_one("p1").unwrap().payload, payload);
}

#[tokio::test]
async fn test_remove_never_uploaded() {
    let h = harness();
    h.engine.upsert_local("a", plan("A")).unwrap();
    h.engine.upsert_local("b", plan("B")).unwrap();

    h.engine.remove_local("a").unwrap();

    assert_eq!(h.engine.dirty_count(), 1);
    crate::assert_ids!(h.engine.list_all(), ["b"]);
    assert!(h.engine.pending_deletions().is_empty());
}

#[tokio::test]
async fn test_push_twice_is_idempotent() {
    let h = harness();
    h.engine.upsert_local("p1", plan("A")).unwrap();
    h.engine.push_to_remote().await.unwrap();
    let remote_after_first = h.remote.documents();

    let second = h.engine.push_to_remote().await.unwrap();

    assert!(second.is_noop());
    assert_eq!(h.remote.write_calls(), 1);
    assert_eq!(h.remote.documents(), remote_after_first);
    assert_eq!(h.engine.get_one("p1").unwrap().sync_status, SyncStatus::Synced);
}

#[tokio::test]
async fn test_pull_then_push_leaves_nothing_dirty() {
    let h = harness();
    h.remote.seed(remote_plan("r1", "Remote", 10));
    h.remote.seed(remote_plan("r2", "Remote 2", 11));

    h.engine.pull_from_remote().await.unwrap();
    h.engine.push_to_remote().await.unwrap();

    assert!(h.engine.list_dirty().is_empty());
    assert_eq!(h.remote.write_calls(), 0);
}

#[tokio::test]
async fn test_merge_keeps_local_only_and_remote_wins() {
    let h = harness();
    h.engine.upsert_local("B", plan("B first")).unwrap();
    h.engine.push_to_remote().await.unwrap();
    h.engine.upsert_local("B", plan("B local edit")).unwrap();
    h.engine.upsert_local("A", plan("A local")).unwrap();

    assert_eq!(h.engine.get_one("A").unwrap().sync_status, SyncStatus::New);
    assert_eq!(h.engine.get_one("B").unwrap().sync_status, SyncStatus::Modified);

    h.remote.seed(remote_plan("B", "B remote", 50));
    h.remote.seed(remote_plan("C", "C remote", 60));

    let pulled = h.engine.pull_from_remote().await.unwrap();
    assert_eq!(pulled.report.overwritten, vec!["B".to_string()]);
    assert_eq!(pulled.report.adopted, vec!["C".to_string()]);

    let a = h.engine.get_one("A").unwrap();
    assert_eq!(a.sync_status, SyncStatus::New);
    assert_eq!(a.payload.name, "A local");

    let b = h.engine.get_one("B").unwrap();
    assert_eq!(b.sync_status, SyncStatus::Synced);
    assert_eq!(b.payload.name, "B remote");

    let c = h.engine.get_one("C").unwrap();
    assert_eq!(c.sync_status, SyncStatus::Synced);
    crate::assert_ids!(h.engine.list_all(), ["A", "B", "C"]);
}

#[tokio::test]
async fn test_failed_batch_keeps_dirty_set() {
    let h = harness();
    h.engine.upsert_local("A", plan("A")).unwrap();
    h.engine.push_to_remote().await.unwrap();
    h.engine.upsert_local("A", plan("A edited")).unwrap();
    h.engine.upsert_local("B", plan("B")).unwrap();

    h.remote.set_failure(RemoteOp::BatchWrite, Some(RemoteFailure::Unavailable));
    let result = h.engine.push_to_remote().await;

    crate::assert_err!(result, SyncError::RemoteUnavailable { .. });
    assert_eq!(h.engine.dirty_count(), 2);
    assert_eq!(h.engine.get_one("A").unwrap().sync_status, SyncStatus::Modified);
    assert_eq!(h.engine.get_one("B").unwrap().sync_status, SyncStatus::New);

    h.remote.set_failure(RemoteOp::BatchWrite, None);
    h.engine.push_to_remote().await.unwrap();
    assert_eq!(h.engine.dirty_count(), 0);
}

#[tokio::test]
async fn test_failed_fetch_changes_nothing() {
    let h = harness();
    h.engine.upsert_local("A", plan("A")).unwrap();
    h.remote.seed(remote_plan("C", "C", 1));
    h.remote.set_failure(RemoteOp::Fetch, Some(RemoteFailure::Unavailable));

    let result = h.engine.pull_from_remote().await;

    assert_matches!(result, Err(SyncError::RemoteUnavailable { .. }));
    crate::assert_ids!(h.engine.list_all(), ["A"]);
}

#[tokio::test]
async fn test_rejected_write_surfaces_status() {
    let h = harness();
    h.engine.upsert_local("A", plan("A")).unwrap();
    h.remote.set_failure(RemoteOp::BatchWrite, Some(RemoteFailure::Rejected(403)));

    let err = h.engine.push_to_remote().await.unwrap_err();
    assert_matches!(err, SyncError::RemoteRejected { status: Some(403), .. });
    assert!(!err.is_retryable());
    assert_eq!(h.engine.dirty_count(), 1);
}

#[tokio::test]
async fn test_deleted_plan_is_tombstoned_remotely() {
    let h = harness();
    h.engine.upsert_local("A", plan("A")).unwrap();
    h.engine.push_to_remote().await.unwrap();

    h.engine.remove_local("A").unwrap();
    let report = h.engine.push_to_remote().await.unwrap();

    assert_eq!(report.tombstoned, vec!["A".to_string()]);
    assert!(h.remote.get("A").unwrap().is_deleted);
    let live = h.remote.fetch_all(FetchFilter::live()).await.unwrap();
    assert!(live.is_empty());

    h.engine.pull_from_remote().await.unwrap();
    assert!(h.engine.get_one("A").is_none());
}

#[tokio::test]
async fn test_recreated_plan_is_not_tombstoned() {
    let h = harness();
    h.engine.upsert_local("p1", plan("First")).unwrap();
    h.engine.push_to_remote().await.unwrap();

    h.engine.remove_local("p1").unwrap();
    assert_eq!(h.engine.pending_deletions(), vec!["p1".to_string()]);
    h.engine.upsert_local("p1", plan("Second")).unwrap();
    assert!(h.engine.pending_deletions().is_empty());

    let report = h.engine.push_to_remote().await.unwrap();
    assert_eq!(report.uploaded, vec!["p1".to_string()]);
    assert!(report.tombstoned.is_empty());

    let remote_copy = h.remote.get("p1").unwrap();
    assert!(!remote_copy.is_deleted);
    assert_eq!(remote_copy.fields["name"], "Second");
    assert_eq!(h.engine.get_one("p1").unwrap().sync_status, SyncStatus::Synced);

    h.engine.pull_from_remote().await.unwrap();
    let record = h.engine.get_one("p1").unwrap();
    assert_eq!(record.payload.name, "Second");
    assert_eq!(h.engine.dirty_count(), 0);
}

#[tokio::test]
async fn test_pending_tombstone_survives_restart() {
    let h = harness();
    h.engine.upsert_local("A", plan("A")).unwrap();
    h.engine.push_to_remote().await.unwrap();
    h.engine.remove_local("A").unwrap();

    let restarted = reopen(&h);
    assert_eq!(restarted.pending_deletions(), vec!["A".to_string()]);
    restarted.push_to_remote().await.unwrap();
    assert!(h.remote.get("A").unwrap().is_deleted);
}

#[tokio::test]
async fn test_edit_during_upload_stays_dirty() {
    let h = harness();
    h.engine.upsert_local("A", plan("A")).unwrap();
    h.remote.set_latency(Some(Duration::from_millis(50)));

    let (pushed, ()) = tokio::join!(h.engine.push_to_remote(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.engine.upsert_local("A", plan("A edited mid-flight")).unwrap();
    });

    let report = pushed.unwrap();
    assert!(report.uploaded.is_empty());
    assert_eq!(report.changed_during_upload, vec!["A".to_string()]);
    assert_eq!(h.engine.dirty_count(), 1);
    assert_eq!(h.engine.get_one("A").unwrap().payload.name, "A edited mid-flight");
}

#[tokio::test]
async fn test_concurrent_push_rejected() {
    let h = harness();
    h.engine.upsert_local("A", plan("A")).unwrap();
    h.remote.set_latency(Some(Duration::from_millis(50)));

    let (first, second) = tokio::join!(h.engine.push_to_remote(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.engine.push_to_remote().await
    });

    assert!(first.is_ok());
    assert_matches!(second, Err(SyncError::UploadInProgress));
    assert_eq!(h.remote.write_calls(), 1);
}

#[tokio::test]
async fn test_load_fresh_cache_skips_network() {
    let h = harness();
    h.remote.seed(remote_plan("r1", "Remote", 1));

    let first = h.engine.load(false).await;
    assert_eq!(first.source, LoadSource::Remote);
    crate::assert_ids!(first.records, ["r1"]);

    let second = h.engine.load(false).await;
    assert_eq!(second.source, LoadSource::Cache);
    assert_eq!(h.remote.fetch_calls(), 1);

    let forced = h.engine.load(true).await;
    assert_eq!(forced.source, LoadSource::Remote);
    assert_eq!(h.remote.fetch_calls(), 2);
}

#[tokio::test]
async fn test_invalid_payload_rejected_before_write() {
    let h = harness();
    let mut bad = plan("A");
    bad.chapters[0].lessons[0].name.clear();

    crate::assert_err!(h.engine.upsert_local("A", bad), SyncError::Validation { .. });
    assert!(h.engine.list_all().is_empty());
}

#[tokio::test]
async fn test_progress_is_not_dirty() {
    let h = harness();
    let progress = curriculum_sync::curriculum::UserProgress::new("u1", "s1");
    h.engine.progress().save(&progress).unwrap();

    assert_eq!(h.engine.dirty_count(), 0);
    assert_eq!(h.engine.progress().list_for_user("u1").unwrap().len(), 1);

    h.engine.clear_local_data().unwrap();
    assert!(h.engine.progress().list_for_user("u1").unwrap().is_empty());
}

#[tokio::test]
async fn test_progress_for_plan_prefers_schedules() {
    use curriculum_sync::curriculum::{LessonCompletion, StudySchedule, UserProgress};

    let h = harness();
    h.engine.upsert_local("p1", plan("Algebra")).unwrap();
    assert_eq!(h.engine.progress_for_plan("u1", "p1").unwrap(), None);

    // No schedule yet: matched through a completed lesson of the plan
    let mut loose = UserProgress::new("u1", "old");
    loose.lesson_completions.insert(
        "lesson_1_1".to_string(),
        LessonCompletion {
            lesson_id: "lesson_1_1".to_string(),
            is_completed: true,
            completed_at: Some(5),
            completed_video_ids: vec![],
        },
    );
    h.engine.progress().save(&loose).unwrap();
    h.engine.progress().save(&UserProgress::new("u1", "unrelated")).unwrap();
    assert_eq!(h.engine.progress_for_plan("u1", "p1").unwrap(), Some(loose));

    // Once the user has a schedule for the plan, its progress is used
    h.engine
        .schedules()
        .save(StudySchedule::new("s1", "u1", "p1", "Exam prep"))
        .unwrap();
    assert_eq!(h.engine.progress_for_plan("u1", "p1").unwrap(), None);

    let mut scheduled = UserProgress::new("u1", "s1");
    scheduled.current_streak = 2;
    h.engine.progress().save(&scheduled).unwrap();
    assert_eq!(h.engine.progress_for_plan("u1", "p1").unwrap(), Some(scheduled));
    assert_eq!(h.engine.dirty_count(), 1);

    h.engine.clear_local_data().unwrap();
    assert!(h.engine.schedules().list().is_empty());
}
