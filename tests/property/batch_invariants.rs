//! Batch invariants over random per-item outcome scripts

use async_trait::async_trait;
use docgen::adapter::ArtifactGenerator;
use docgen::artifact::{Artifact, GeneratedDocument, NewArtifact, Provenance};
use docgen::error::{GenerationError, StorageError};
use docgen::generation::{BatchOrchestrator, BatchSubmission, BatchSummary, GenerationService, RequestTracker};
use docgen::progress::{MemorySink, ProgressEvent};
use docgen::request::{BatchOutcome, DocumentSpec, GenerationContext, GenerationRequest, RequestStatus};
use docgen::store::{ArtifactStore, SledStore};
use docgen::types::{ArtifactId, RequestId};
use proptest::prelude::*;
use proptest::test_runner::{Config, TestRunner};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Generated,
    GenerationFails,
    PersistenceFails,
}

fn outcome_strategy() -> impl Strategy<Value = Vec<Outcome>> {
    prop::collection::vec(
        prop_oneof![
            Just(Outcome::Generated),
            Just(Outcome::GenerationFails),
            Just(Outcome::PersistenceFails),
        ],
        1..8,
    )
}

fn runner() -> TestRunner {
    TestRunner::new(Config {
        cases: 32,
        ..Config::default()
    })
}

/// Each spec gets its own template kind so failures can be scripted per item.
fn specs_for(script: &[Outcome]) -> Vec<DocumentSpec> {
    (0..script.len())
        .map(|i| DocumentSpec::new(format!("spec-{i}"), format!("Document {i}"), format!("kind_{i}")))
        .collect()
}

struct KindGenerator {
    failing: HashSet<String>,
}

#[async_trait]
impl ArtifactGenerator for KindGenerator {
    async fn generate(
        &self,
        template_kind: &str,
        _context: &GenerationContext,
    ) -> Result<GeneratedDocument, GenerationError> {
        if self.failing.contains(template_kind) {
            return Err(GenerationError::RequestFailed("connection reset".to_string()));
        }
        Ok(GeneratedDocument {
            title: String::new(),
            content: format!("Body of {template_kind}"),
            summary: String::new(),
            sections: Vec::new(),
        })
    }
}

struct RejectingStore {
    inner: SledStore,
    rejected: HashSet<String>,
}

#[async_trait]
impl ArtifactStore for RejectingStore {
    async fn create_artifact(&self, artifact: NewArtifact) -> Result<Artifact, StorageError> {
        if self.rejected.contains(&artifact.spec_id) {
            return Err(StorageError::Backend("disk full".to_string()));
        }
        self.inner.create_artifact(artifact).await
    }

    async fn get_artifact(&self, id: &ArtifactId) -> Result<Option<Artifact>, StorageError> {
        self.inner.get_artifact(id).await
    }

    async fn list_artifacts(&self, request_id: &RequestId) -> Result<Vec<Artifact>, StorageError> {
        self.inner.list_artifacts(request_id).await
    }
}

struct Run {
    events: Vec<ProgressEvent>,
    summary: BatchSummary,
    request: GenerationRequest,
    stored: Vec<Artifact>,
    tracker: Arc<RequestTracker>,
}

fn run_script(script: &[Outcome]) -> Run {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let store = SledStore::from_db(db).unwrap();
        let tracker = Arc::new(RequestTracker::new(Arc::new(store.clone())));

        let specs = specs_for(script);
        let failing = specs
            .iter()
            .zip(script)
            .filter(|(_, o)| **o == Outcome::GenerationFails)
            .map(|(s, _)| s.template_kind.clone())
            .collect();
        let rejected = specs
            .iter()
            .zip(script)
            .filter(|(_, o)| **o == Outcome::PersistenceFails)
            .map(|(s, _)| s.spec_id.clone())
            .collect();

        let orchestrator = BatchOrchestrator::new(
            Arc::clone(&tracker),
            Arc::new(RejectingStore {
                inner: store.clone(),
                rejected,
            }),
            Arc::new(KindGenerator { failing }),
        );
        let service = GenerationService::new(Arc::new(orchestrator));
        let sink = MemorySink::new();
        let summary = service
            .submit(
                BatchSubmission::new("org-prop", specs, GenerationContext::new()),
                &sink,
            )
            .await
            .unwrap();
        let request = tracker.get(&summary.request_id).await.unwrap();
        let stored = store.list_artifacts(&summary.request_id).await.unwrap();
        Run {
            events: sink.events(),
            summary,
            request,
            stored,
            tracker,
        }
    })
}

#[test]
fn completed_count_matches_persisted_artifacts() {
    runner()
        .run(&outcome_strategy(), |script| {
            let run = run_script(&script);
            let persisted = script
                .iter()
                .filter(|o| **o != Outcome::PersistenceFails)
                .count();
            let rejected = script.len() - persisted;

            prop_assert_eq!(run.request.completed_count, persisted);
            prop_assert_eq!(run.stored.len(), persisted);
            prop_assert_eq!(run.request.failed_count, rejected);

            let error_specs: Vec<&str> = run
                .events
                .iter()
                .filter(|e| matches!(e, ProgressEvent::ItemError { .. }))
                .filter_map(|e| e.spec_id())
                .collect();
            let unique: HashSet<&str> = error_specs.iter().copied().collect();
            prop_assert_eq!(error_specs.len(), rejected);
            prop_assert_eq!(unique.len(), rejected);
            Ok(())
        })
        .unwrap();
}

#[test]
fn every_item_is_reported_once() {
    runner()
        .run(&outcome_strategy(), |script| {
            let run = run_script(&script);
            let item_events = run
                .events
                .iter()
                .filter(|e| matches!(e, ProgressEvent::Artifact(_) | ProgressEvent::ItemError { .. }))
                .count();
            prop_assert_eq!(item_events, script.len());
            prop_assert_eq!(run.summary.total_attempted, script.len());
            prop_assert_eq!(
                run.summary.total_generated + run.summary.total_fallback + run.summary.total_failed,
                script.len()
            );
            Ok(())
        })
        .unwrap();
}

#[test]
fn events_follow_item_order() {
    runner()
        .run(&outcome_strategy(), |script| {
            let run = run_script(&script);
            prop_assert_eq!(run.events.len(), script.len() * 2 + 1);

            for (i, pair) in run.events.chunks(2).take(script.len()).enumerate() {
                let is_progress = matches!(pair[0], ProgressEvent::Progress { .. });
                prop_assert!(is_progress);
                let expected_spec = format!("spec-{i}");
                prop_assert_eq!(pair[1].spec_id(), Some(expected_spec.as_str()));
            }
            let last_is_summary = run.events.last().map(ProgressEvent::is_terminal);
            prop_assert_eq!(last_is_summary, Some(true));
            Ok(())
        })
        .unwrap();
}

#[test]
fn fallback_artifacts_are_never_empty() {
    runner()
        .run(&outcome_strategy(), |script| {
            let run = run_script(&script);
            let expected_fallbacks = script
                .iter()
                .filter(|o| **o == Outcome::GenerationFails)
                .count();

            let fallbacks: Vec<&Artifact> = run
                .stored
                .iter()
                .filter(|a| a.provenance == Provenance::Fallback)
                .collect();
            prop_assert_eq!(fallbacks.len(), expected_fallbacks);
            for artifact in fallbacks {
                prop_assert!(!artifact.content.trim().is_empty());
                prop_assert!(artifact.is_fallback());
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn terminal_status_is_stable() {
    runner()
        .run(&outcome_strategy(), |script| {
            let run = run_script(&script);
            let any_persisted = script.iter().any(|o| *o != Outcome::PersistenceFails);
            let expected = if any_persisted {
                RequestStatus::Completed
            } else {
                RequestStatus::Failed
            };
            prop_assert_eq!(run.request.status, expected);
            prop_assert!(run.request.started_at_ms.is_some());
            prop_assert!(run.request.completed_at_ms >= run.request.started_at_ms);

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let again = runtime.block_on(async {
                run.tracker
                    .finalize(&run.request.id, &BatchOutcome::Cancelled("late".to_string()))
                    .await
                    .unwrap()
            });
            prop_assert_eq!(&again, &run.request);
            Ok(())
        })
        .unwrap();
}
