//! End-to-end batch runs against a real sled store

use crate::integration::test_utils::{context, count_kinds, specs, Harness, ScriptedGenerator};
use docgen::artifact::Provenance;
use docgen::error::ApiError;
use docgen::generation::BatchSubmission;
use docgen::progress::{MemorySink, ProgressEvent};
use docgen::request::RequestStatus;
use docgen::store::ArtifactStore;
use std::sync::Arc;

#[tokio::test]
async fn every_item_generated() {
    let harness = Harness::new();
    let service = harness.service(Arc::new(ScriptedGenerator::succeeding()), &[]);
    let sink = MemorySink::new();

    let summary = service
        .submit(
            BatchSubmission::new(
                "org-1",
                specs(&["risk_assessment", "policy", "procedure"]),
                context(),
            ),
            &sink,
        )
        .await
        .unwrap();

    assert_eq!(
        sink.kinds(),
        vec!["progress", "document", "progress", "document", "progress", "document", "complete"]
    );
    assert_eq!(summary.total_attempted, 3);
    assert_eq!(summary.total_generated, 3);
    assert_eq!(summary.total_fallback, 0);
    assert_eq!(summary.status, RequestStatus::Completed);

    let request = service.tracker().get(&summary.request_id).await.unwrap();
    assert_eq!(request.completed_count, 3);
    assert_eq!(request.failed_count, 0);
    assert!(request.started_at_ms.is_some());
    assert!(request.completed_at_ms.is_some());

    let stored = harness.store.list_artifacts(&summary.request_id).await.unwrap();
    assert_eq!(stored.len(), 3);
    assert!(stored.iter().all(|a| a.provenance == Provenance::Generated));
    assert!(stored[0].content.contains("Acme Ltd"));
}

#[tokio::test]
async fn generator_failure_yields_fallback_and_batch_continues() {
    let harness = Harness::new();
    let generator = Arc::new(ScriptedGenerator::failing(&["policy"]));
    let service = harness.service(generator.clone(), &[]);
    let sink = MemorySink::new();

    let summary = service
        .submit(
            BatchSubmission::new(
                "org-1",
                specs(&["risk_assessment", "policy", "procedure"]),
                context(),
            ),
            &sink,
        )
        .await
        .unwrap();

    assert_eq!(generator.calls.lock().len(), 3);
    assert_eq!(summary.total_generated, 2);
    assert_eq!(summary.total_fallback, 1);
    assert_eq!(summary.status, RequestStatus::Completed);

    let fallback = sink
        .events()
        .into_iter()
        .find_map(|event| match event {
            ProgressEvent::Artifact(artifact) if artifact.is_fallback() => Some(artifact),
            _ => None,
        })
        .expect("fallback document event");
    assert_eq!(fallback.spec_id, "spec-2");
    assert!(!fallback.content.trim().is_empty());
    assert!(!fallback.content.contains("generator unavailable"));
}

#[tokio::test]
async fn persistence_failure_emits_item_error() {
    let harness = Harness::new();
    let service = harness.service(Arc::new(ScriptedGenerator::succeeding()), &["spec-2"]);
    let sink = MemorySink::new();

    let summary = service
        .submit(
            BatchSubmission::new(
                "org-1",
                specs(&["risk_assessment", "policy", "procedure"]),
                context(),
            ),
            &sink,
        )
        .await
        .unwrap();

    assert_eq!(
        sink.kinds(),
        vec!["progress", "document", "progress", "error", "progress", "document", "complete"]
    );
    assert_eq!(summary.total_attempted, 3);
    assert_eq!(summary.total_generated, 2);
    assert_eq!(summary.total_failed, 1);
    assert_eq!(summary.status, RequestStatus::Completed);

    let request = service.tracker().get(&summary.request_id).await.unwrap();
    assert_eq!(request.completed_count, 2);
    assert_eq!(request.failed_count, 1);

    let stored = harness.store.list_artifacts(&summary.request_id).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|a| a.spec_id != "spec-2"));
}

#[tokio::test]
async fn request_fails_when_nothing_persists() {
    let harness = Harness::new();
    let service = harness.service(
        Arc::new(ScriptedGenerator::succeeding()),
        &["spec-1", "spec-2"],
    );
    let sink = MemorySink::new();

    let summary = service
        .submit(
            BatchSubmission::new("org-1", specs(&["policy", "procedure"]), context()),
            &sink,
        )
        .await
        .unwrap();

    let counts = count_kinds(&sink.kinds());
    assert_eq!(counts.get("error"), Some(&2));
    assert_eq!(counts.get("document"), None);
    assert_eq!(counts.get("complete"), Some(&1));
    assert_eq!(summary.status, RequestStatus::Failed);

    let request = service.tracker().get(&summary.request_id).await.unwrap();
    assert_eq!(request.status, RequestStatus::Failed);
    assert!(request.failure_reason.is_some());
}

#[tokio::test]
async fn all_fallbacks_still_complete_the_request() {
    let harness = Harness::new();
    let service = harness.service(
        Arc::new(ScriptedGenerator::failing(&["policy", "procedure"])),
        &[],
    );
    let sink = MemorySink::new();

    let summary = service
        .submit(
            BatchSubmission::new("org-1", specs(&["policy", "procedure"]), context()),
            &sink,
        )
        .await
        .unwrap();

    assert_eq!(summary.total_generated, 0);
    assert_eq!(summary.total_fallback, 2);
    assert_eq!(summary.status, RequestStatus::Completed);
    let stored = harness.store.list_artifacts(&summary.request_id).await.unwrap();
    assert!(stored.iter().all(|a| a.is_fallback()));
}

#[tokio::test]
async fn progress_percentages_increase_from_zero() {
    let harness = Harness::new();
    let service = harness.service(Arc::new(ScriptedGenerator::succeeding()), &[]);
    let sink = MemorySink::new();

    service
        .submit(
            BatchSubmission::new("org-1", specs(&["policy", "procedure", "policy", "policy"]), context()),
            &sink,
        )
        .await
        .unwrap();

    let percents: Vec<f64> = sink
        .events()
        .into_iter()
        .filter_map(|event| match event {
            ProgressEvent::Progress {
                percent_complete, ..
            } => Some(percent_complete),
            _ => None,
        })
        .collect();
    assert_eq!(percents, vec![0.0, 25.0, 50.0, 75.0]);
}

#[tokio::test]
async fn closed_sink_cancels_remaining_items() {
    let harness = Harness::new();
    let generator = Arc::new(ScriptedGenerator::succeeding());
    let service = harness.service(generator.clone(), &[]);
    // progress + document for the first item, then the consumer goes away
    let sink = MemorySink::closing_after(2);

    let result = service
        .submit(
            BatchSubmission::new("org-1", specs(&["policy", "procedure", "policy"]), context()),
            &sink,
        )
        .await;

    assert!(matches!(result, Err(ApiError::ChannelClosed(_))));
    assert_eq!(generator.calls.lock().len(), 1);

    let requests = service.tracker().list_for_owner("org-1").await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].status, RequestStatus::Failed);
    assert_eq!(requests[0].failure_reason.as_deref(), Some("cancelled"));
    assert!(!service.tracker().is_running(&requests[0].id));
}

#[tokio::test]
async fn invalid_submissions_are_rejected() {
    let harness = Harness::new();
    let service = harness.service(Arc::new(ScriptedGenerator::succeeding()), &[]);
    let sink = MemorySink::new();

    let blank_owner = service
        .submit(BatchSubmission::new("  ", specs(&["policy"]), context()), &sink)
        .await;
    assert!(matches!(blank_owner, Err(ApiError::Validation(_))));

    let mut duplicated = specs(&["policy", "procedure"]);
    duplicated[1].spec_id = duplicated[0].spec_id.clone();
    let duplicate_ids = service
        .submit(BatchSubmission::new("org-1", duplicated, context()), &sink)
        .await;
    assert!(matches!(duplicate_ids, Err(ApiError::Validation(_))));

    assert!(sink.events().is_empty());
}
