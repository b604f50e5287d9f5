//! HTTP remote against a wiremock gateway

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{plan, remote_plan, MockGateway, TEST_TOKEN};
use curriculum_sync::curriculum::StudyPlan;
use curriculum_sync::local::MemoryStore;
use curriculum_sync::remote::{FetchFilter, RemoteStore};
use curriculum_sync::sync::{SyncEngine, SyncStatus};
use curriculum_sync::SyncError;

#[tokio::test]
async fn test_fetch_all_live_documents() {
    let gateway = MockGateway::start().await;
    Mock::given(method("GET"))
        .and(path("/study_plans"))
        .and(query_param("includeDeleted", "false"))
        .and(header("authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "documents": [remote_plan("r1", "Remote", 5)]
        })))
        .expect(1)
        .mount(&gateway.server)
        .await;

    let docs = gateway.remote.fetch_all(FetchFilter::live()).await.unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, "r1");
    assert_eq!(docs[0].updated_at, 5);
    assert_eq!(docs[0].fields["name"], json!("Remote"));
}

#[tokio::test]
async fn test_batch_write_sends_flattened_documents() {
    let gateway = MockGateway::start().await;
    Mock::given(method("POST"))
        .and(path("/study_plans/batch"))
        .and(body_partial_json(json!({
            "documents": [{ "id": "p1", "isDeleted": false, "name": "Algebra" }]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&gateway.server)
        .await;

    let engine: SyncEngine<StudyPlan> =
        SyncEngine::open(Arc::new(MemoryStore::new()), Arc::new(gateway.remote.clone()));
    engine.upsert_local("p1", plan("Algebra")).unwrap();
    engine.push_to_remote().await.unwrap();

    assert_eq!(engine.get_one("p1").unwrap().sync_status, SyncStatus::Synced);

    let requests = gateway.server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let sent = &body["documents"][0];
    assert!(sent.get("syncStatus").is_none());
    assert!(sent.get("lastSyncedAt").is_none());
    assert!(sent.get("payload").is_none());
}

#[tokio::test]
async fn test_soft_delete_patches_tombstone() {
    let gateway = MockGateway::start().await;
    Mock::given(method("PATCH"))
        .and(path("/study_plans/p1"))
        .and(body_partial_json(json!({ "isDeleted": true })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&gateway.server)
        .await;

    gateway.remote.soft_delete("p1").await.unwrap();
}

#[tokio::test]
async fn test_server_error_is_unavailable() {
    let gateway = MockGateway::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&gateway.server)
        .await;

    let engine: SyncEngine<StudyPlan> =
        SyncEngine::open(Arc::new(MemoryStore::new()), Arc::new(gateway.remote.clone()));
    engine.upsert_local("p1", plan("A")).unwrap();

    let err = engine.push_to_remote().await.unwrap_err();
    assert_matches!(err, SyncError::RemoteUnavailable { .. });
    assert!(err.is_retryable());
    assert_eq!(engine.dirty_count(), 1);
}

#[tokio::test]
async fn test_permission_error_is_rejected_verbatim() {
    let gateway = MockGateway::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Missing or insufficient permissions."))
        .mount(&gateway.server)
        .await;

    let err = gateway.remote.batch_write(vec![remote_plan("p1", "A", 1)]).await.unwrap_err();
    match err {
        SyncError::RemoteRejected { status, message } => {
            assert_eq!(status, Some(403));
            assert_eq!(message, "Missing or insufficient permissions.");
        }
        other => panic!("Expected RemoteRejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_document_on_delete_is_404() {
    let gateway = MockGateway::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&gateway.server)
        .await;

    let result = gateway.remote.soft_delete("ghost").await;
    assert_matches!(result, Err(SyncError::RemoteRejected { status: Some(404), .. }));
}

#[tokio::test]
async fn test_timeout_is_unavailable() {
    let gateway = MockGateway::start_with_timeout(Duration::from_millis(100)).await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "documents": [] }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&gateway.server)
        .await;

    let result = gateway.remote.fetch_all(FetchFilter::live()).await;
    assert_matches!(result, Err(SyncError::RemoteUnavailable { .. }));
}

#[tokio::test]
async fn test_malformed_listing_is_unavailable() {
    let gateway = MockGateway::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&gateway.server)
        .await;

    let result = gateway.remote.fetch_all(FetchFilter::live()).await;
    assert_matches!(result, Err(SyncError::RemoteUnavailable { .. }));
}

#[tokio::test]
async fn test_fetch_one_maps_404_to_none() {
    let gateway = MockGateway::start().await;
    let progress = gateway.remote.with_collection("user_progress");
    Mock::given(method("GET"))
        .and(path("/user_progress/u1__s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1__s1",
            "createdAt": 1,
            "updatedAt": 2,
            "isDeleted": false,
            "userId": "u1",
            "scheduleId": "s1",
            "currentStreak": 3
        })))
        .mount(&gateway.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user_progress/u1__s2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&gateway.server)
        .await;

    let found = progress.fetch_one("u1__s1").await.unwrap().unwrap();
    assert_eq!(found.fields["currentStreak"], json!(3));
    assert!(progress.fetch_one("u1__s2").await.unwrap().is_none());
}

#[tokio::test]
async fn test_progress_push_and_schedule_pull_over_http() {
    use curriculum_sync::curriculum::UserProgress;
    use curriculum_sync::remote::{PROGRESS_COLLECTION, SCHEDULES_COLLECTION};
    use curriculum_sync::sync::LearnerSync;

    let gateway = MockGateway::start().await;
    Mock::given(method("POST"))
        .and(path("/user_progress/batch"))
        .and(body_partial_json(json!({
            "documents": [{ "id": "u1__s1", "userId": "u1", "currentStreak": 6 }]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&gateway.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/study_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "documents": [{
                "id": "s1",
                "createdAt": 1,
                "updatedAt": 4,
                "isDeleted": false,
                "userId": "u1",
                "studyPlanId": "p1",
                "name": "Exam prep",
                "studyDays": ["monday", "friday"],
                "hoursPerDay": 2.0
            }]
        })))
        .expect(1)
        .mount(&gateway.server)
        .await;

    let sync = LearnerSync::new(
        Arc::new(MemoryStore::new()),
        Arc::new(gateway.remote.with_collection(PROGRESS_COLLECTION)),
        Arc::new(gateway.remote.with_collection(SCHEDULES_COLLECTION)),
    );
    let mut progress = UserProgress::new("u1", "s1");
    progress.current_streak = 6;
    sync.progress().save(&progress).unwrap();

    assert!(sync.push_progress("u1", "s1").await.unwrap());
    let schedules = sync.pull_schedules(Some("u1")).await.unwrap();
    assert_eq!(schedules.len(), 1);
    assert_eq!(sync.schedules().for_study_plan("p1", Some("u1"))[0].hours_per_day, 2.0);
}
