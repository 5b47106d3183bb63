//! Request lifecycle through the tracker, persisted in sled

use crate::integration::test_utils::{context, specs, Harness, ScriptedGenerator};
use docgen::error::ApiError;
use docgen::generation::BatchOrchestrator;
use docgen::progress::MemorySink;
use docgen::request::{BatchOutcome, RequestStatus};
use std::sync::Arc;

#[tokio::test]
async fn lifecycle_counts_and_timestamps_persist() {
    let harness = Harness::new();
    let tracker = &harness.tracker;

    let created = tracker
        .create("org-1", specs(&["policy", "procedure"]), context())
        .await
        .unwrap();
    assert_eq!(created.status, RequestStatus::Pending);
    assert_eq!(created.total_count, 2);
    assert!(created.started_at_ms.is_none());

    let started = tracker.mark_started(&created.id).await.unwrap();
    assert_eq!(started.status, RequestStatus::InProgress);
    assert!(started.started_at_ms.is_some());

    tracker.record_item_completed(&created.id).await.unwrap();
    tracker.record_item_failed(&created.id).await.unwrap();

    let finished = tracker
        .finalize(&created.id, &BatchOutcome::Exhausted)
        .await
        .unwrap();
    assert_eq!(finished.status, RequestStatus::Completed);
    assert_eq!(finished.completed_count, 1);
    assert_eq!(finished.failed_count, 1);
    assert!(finished.completed_at_ms >= finished.started_at_ms);

    let reloaded = tracker.get(&created.id).await.unwrap();
    assert_eq!(reloaded, finished);
}

#[tokio::test]
async fn terminal_requests_do_not_move() {
    let harness = Harness::new();
    let tracker = &harness.tracker;
    let request = tracker
        .create("org-1", specs(&["policy"]), context())
        .await
        .unwrap();
    tracker.mark_started(&request.id).await.unwrap();
    let failed = tracker
        .finalize(&request.id, &BatchOutcome::Cancelled("cancelled".to_string()))
        .await
        .unwrap();
    assert_eq!(failed.status, RequestStatus::Failed);

    // a second finalize leaves the stored request untouched
    let again = tracker
        .finalize(&request.id, &BatchOutcome::Exhausted)
        .await
        .unwrap();
    assert_eq!(again, failed);

    assert!(matches!(
        tracker.mark_started(&request.id).await,
        Err(ApiError::InvalidState(_))
    ));
    assert!(matches!(
        tracker.record_item_completed(&request.id).await,
        Err(ApiError::InvalidState(_))
    ));
}

#[tokio::test]
async fn pending_request_cannot_be_finalized() {
    let harness = Harness::new();
    let request = harness
        .tracker
        .create("org-1", specs(&["policy"]), context())
        .await
        .unwrap();
    let result = harness
        .tracker
        .finalize(&request.id, &BatchOutcome::Exhausted)
        .await;
    assert!(matches!(result, Err(ApiError::InvalidState(_))));
}

#[tokio::test]
async fn requests_are_listed_per_owner() {
    let harness = Harness::new();
    let tracker = &harness.tracker;
    tracker.create("org-1", specs(&["policy"]), context()).await.unwrap();
    tracker.create("org-1", specs(&["procedure"]), context()).await.unwrap();
    tracker.create("org-2", specs(&["policy"]), context()).await.unwrap();

    assert_eq!(tracker.list_for_owner("org-1").await.unwrap().len(), 2);
    assert_eq!(tracker.list_for_owner("org-2").await.unwrap().len(), 1);
    assert!(tracker.list_for_owner("org-3").await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_request_is_not_found() {
    let harness = Harness::new();
    let missing = docgen::types::RequestId::from("req-missing");
    assert!(matches!(
        harness.tracker.get(&missing).await,
        Err(ApiError::RequestNotFound(_))
    ));
}

#[tokio::test]
async fn a_request_runs_at_most_once() {
    let harness = Harness::new();
    let orchestrator = BatchOrchestrator::new(
        Arc::clone(&harness.tracker),
        Arc::new(harness.store.clone()),
        Arc::new(ScriptedGenerator::succeeding()),
    );
    let request = harness
        .tracker
        .create("org-1", specs(&["policy"]), context())
        .await
        .unwrap();

    let guard = harness.tracker.claim_run(&request.id).unwrap();
    let sink = MemorySink::new();
    let concurrent = orchestrator
        .run(&request.id, &request.requested_specs, &request.generation_context, &sink)
        .await;
    assert!(matches!(concurrent, Err(ApiError::InvalidState(_))));
    assert!(sink.events().is_empty());
    drop(guard);

    let summary = orchestrator
        .run(&request.id, &request.requested_specs, &request.generation_context, &sink)
        .await
        .unwrap();
    assert_eq!(summary.status, RequestStatus::Completed);

    let rerun = orchestrator
        .run(&request.id, &request.requested_specs, &request.generation_context, &sink)
        .await;
    assert!(matches!(rerun, Err(ApiError::InvalidState(_))));
}
