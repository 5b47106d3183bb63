//! Batch Orchestrator: runs one request's document specs against the generator.
//! Owns per-item sequencing and event emission; generation and persistence stay behind their traits.

use crate::adapter::ArtifactGenerator;
use crate::artifact::{GeneratedDocument, NewArtifact, Provenance};
use crate::error::{ApiError, GenerationError};
use crate::generation::fallback::fallback_artifact;
use crate::generation::tracker::RequestTracker;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::request::{BatchOutcome, DocumentSpec, GenerationContext, RequestStatus};
use crate::store::ArtifactStore;
use crate::types::RequestId;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const CANCELLED_REASON: &str = "cancelled";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Upper bound on one generator call; `None` waits indefinitely.
    pub item_timeout: Option<Duration>,
    /// Extra attempts for retryable generation errors before falling back.
    pub max_retry_attempts: usize,
    pub retry_delay: Duration,
}

impl OrchestratorSettings {
    pub const DEFAULT_ITEM_TIMEOUT: Duration = Duration::from_secs(120);
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            item_timeout: Some(Self::DEFAULT_ITEM_TIMEOUT),
            max_retry_attempts: 0,
            retry_delay: Duration::from_millis(1000),
        }
    }
}

/// Per-spec state. Terminal states are never left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemState {
    NotStarted,
    Attempting,
    Completed(Provenance),
    Failed(String),
}

impl ItemState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemState::Completed(_) | ItemState::Failed(_))
    }

    /// Move to `next`, rejecting anything other than NotStarted -> Attempting -> terminal.
    pub fn advance(self, next: ItemState) -> Result<ItemState, ApiError> {
        let allowed = matches!(
            (&self, &next),
            (ItemState::NotStarted, ItemState::Attempting)
                | (ItemState::Attempting, ItemState::Completed(_) | ItemState::Failed(_))
        );
        if !allowed {
            return Err(ApiError::InvalidState(format!(
                "item cannot move from {:?} to {:?}",
                self, next
            )));
        }
        Ok(next)
    }
}

/// Totals reported once a batch ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub request_id: RequestId,
    pub total_attempted: usize,
    pub total_generated: usize,
    pub total_fallback: usize,
    pub total_failed: usize,
    pub status: RequestStatus,
    pub cancelled: bool,
}

impl BatchSummary {
    fn event(&self) -> ProgressEvent {
        ProgressEvent::Summary {
            total_attempted: self.total_attempted,
            total_generated: self.total_generated,
            total_fallback: self.total_fallback,
        }
    }
}

/// Lifecycle failure inside one item, with the event that item still owes the caller.
struct ItemAbort {
    event: Option<ProgressEvent>,
    error: ApiError,
}

impl From<ApiError> for ItemAbort {
    fn from(error: ApiError) -> Self {
        Self { event: None, error }
    }
}

#[derive(Debug, Default)]
struct Tally {
    generated: usize,
    fallback: usize,
    failed: usize,
}

impl Tally {
    fn record(&mut self, state: &ItemState) {
        match state {
            ItemState::Completed(Provenance::Generated) => self.generated += 1,
            ItemState::Completed(Provenance::Fallback) => self.fallback += 1,
            ItemState::Failed(_) => self.failed += 1,
            ItemState::NotStarted | ItemState::Attempting => {}
        }
    }

    fn attempted(&self) -> usize {
        self.generated + self.fallback + self.failed
    }
}

pub struct BatchOrchestrator {
    tracker: Arc<RequestTracker>,
    artifacts: Arc<dyn ArtifactStore>,
    generator: Arc<dyn ArtifactGenerator>,
    settings: OrchestratorSettings,
}

impl BatchOrchestrator {
    pub fn new(
        tracker: Arc<RequestTracker>,
        artifacts: Arc<dyn ArtifactStore>,
        generator: Arc<dyn ArtifactGenerator>,
    ) -> Self {
        Self::with_settings(tracker, artifacts, generator, OrchestratorSettings::default())
    }

    pub fn with_settings(
        tracker: Arc<RequestTracker>,
        artifacts: Arc<dyn ArtifactStore>,
        generator: Arc<dyn ArtifactGenerator>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            tracker,
            artifacts,
            generator,
            settings,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn tracker(&self) -> &Arc<RequestTracker> {
        &self.tracker
    }

    /// Attempt every spec in order, then finalize the request and emit the summary.
    ///
    /// Generation failures become fallback artifacts and persistence failures become
    /// `ItemError` events; neither stops the batch. A closed sink does: the request is
    /// finalized as failed and `ApiError::ChannelClosed` is returned.
    ///
    /// `specs` must equal the request's stored specs, in order; anything else is
    /// rejected with `InvalidState` before the request starts.
    pub async fn run(
        &self,
        request_id: &RequestId,
        specs: &[DocumentSpec],
        context: &GenerationContext,
        sink: &dyn ProgressSink,
    ) -> Result<BatchSummary, ApiError> {
        let _guard = self.tracker.claim_run(request_id)?;
        let stored = self.tracker.get(request_id).await?;
        if specs != stored.requested_specs.as_slice() {
            return Err(ApiError::InvalidState(format!(
                "request {} holds {} specs; run was given {} that do not match them in order",
                request_id,
                stored.total_count,
                specs.len()
            )));
        }
        self.tracker.mark_started(request_id).await?;

        let total = specs.len();
        let start = Instant::now();
        info!(request_id = %request_id, total, "Batch started");

        let mut tally = Tally::default();
        let mut disconnect: Option<ApiError> = None;

        for (index, spec) in specs.iter().enumerate() {
            if let Err(err) = sink
                .send(ProgressEvent::progress(index, total, spec.display_title.clone()))
                .await
            {
                disconnect = Some(err);
                break;
            }

            let state = ItemState::NotStarted.advance(ItemState::Attempting)?;
            let (state, event) = match self.attempt_item(request_id, spec, context, state).await {
                Ok(outcome) => outcome,
                Err(ItemAbort { event, error }) => {
                    if let Some(event) = event {
                        if let Err(send_err) = sink.send(event).await {
                            debug!(request_id = %request_id, error = %send_err, "Item event lost during abort");
                        }
                    }
                    return Err(self.abort(request_id, error).await);
                }
            };
            tally.record(&state);

            if let Err(err) = sink.send(event).await {
                disconnect = Some(err);
                break;
            }
        }

        let outcome = match &disconnect {
            Some(err) => {
                warn!(
                    request_id = %request_id,
                    attempted = tally.attempted(),
                    total,
                    error = %err,
                    "Progress channel closed, cancelling batch"
                );
                BatchOutcome::Cancelled(CANCELLED_REASON.to_string())
            }
            None => BatchOutcome::Exhausted,
        };
        let finalized = match self.tracker.finalize(request_id, &outcome).await {
            Ok(finalized) => finalized,
            Err(err) => return Err(self.abort(request_id, err).await),
        };

        let summary = BatchSummary {
            request_id: request_id.clone(),
            total_attempted: tally.attempted(),
            total_generated: tally.generated,
            total_fallback: tally.fallback,
            total_failed: tally.failed,
            status: finalized.status,
            cancelled: disconnect.is_some(),
        };

        if let Some(err) = disconnect {
            return Err(err);
        }

        if let Err(err) = sink.send(summary.event()).await {
            warn!(request_id = %request_id, error = %err, "Summary could not be delivered");
        }

        info!(
            request_id = %request_id,
            status = %summary.status,
            generated = summary.total_generated,
            fallback = summary.total_fallback,
            failed = summary.total_failed,
            duration_ms = start.elapsed().as_millis(),
            "Batch finished"
        );
        Ok(summary)
    }

    /// Drive one spec from `Attempting` to a terminal state and build its event.
    async fn attempt_item(
        &self,
        request_id: &RequestId,
        spec: &DocumentSpec,
        context: &GenerationContext,
        state: ItemState,
    ) -> Result<(ItemState, ProgressEvent), ItemAbort> {
        let draft = match self.generate(spec, context).await {
            Ok(document) => NewArtifact::generated(request_id, spec, document),
            Err(err) => {
                warn!(
                    request_id = %request_id,
                    spec_id = %spec.spec_id,
                    template_kind = %spec.template_kind,
                    error = %err,
                    "Generation failed, using fallback artifact"
                );
                fallback_artifact(request_id, spec, &err)
            }
        };
        let provenance = draft.provenance;

        match self.artifacts.create_artifact(draft).await {
            Ok(artifact) => {
                if let Err(error) = self.tracker.record_item_completed(request_id).await {
                    return Err(ItemAbort {
                        event: Some(ProgressEvent::Artifact(artifact)),
                        error,
                    });
                }
                debug!(
                    request_id = %request_id,
                    spec_id = %spec.spec_id,
                    artifact_id = %artifact.id,
                    provenance = %provenance,
                    "Item completed"
                );
                let state = state
                    .advance(ItemState::Completed(provenance))
                    .map_err(ItemAbort::from)?;
                Ok((state, ProgressEvent::Artifact(artifact)))
            }
            Err(err) => {
                error!(
                    request_id = %request_id,
                    spec_id = %spec.spec_id,
                    error = %err,
                    "Artifact could not be persisted"
                );
                let event = ProgressEvent::ItemError {
                    spec_id: spec.spec_id.clone(),
                    message: err.to_string(),
                };
                if let Err(error) = self.tracker.record_item_failed(request_id).await {
                    return Err(ItemAbort {
                        event: Some(event),
                        error,
                    });
                }
                let state = state
                    .advance(ItemState::Failed(err.to_string()))
                    .map_err(ItemAbort::from)?;
                Ok((state, event))
            }
        }
    }

    /// Call the generator with the configured timeout and retry policy.
    async fn generate(
        &self,
        spec: &DocumentSpec,
        context: &GenerationContext,
    ) -> Result<GeneratedDocument, GenerationError> {
        let mut attempt = 0usize;
        loop {
            match self.generate_once(spec, context).await {
                Ok(document) => return Ok(document),
                Err(err) if err.is_retryable() && attempt < self.settings.max_retry_attempts => {
                    attempt += 1;
                    warn!(
                        spec_id = %spec.spec_id,
                        attempt,
                        max_retry_attempts = self.settings.max_retry_attempts,
                        error = %err,
                        "Retrying generation"
                    );
                    tokio::time::sleep(self.settings.retry_delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn generate_once(
        &self,
        spec: &DocumentSpec,
        context: &GenerationContext,
    ) -> Result<GeneratedDocument, GenerationError> {
        let call = self.generator.generate(&spec.template_kind, context);
        let document = match self.settings.item_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| GenerationError::Timeout(limit.as_millis()))??,
            None => call.await?,
        };
        if document.content.trim().is_empty() {
            return Err(GenerationError::EmptyContent);
        }
        Ok(document)
    }

    /// Best-effort finalize after a lifecycle error, then hand the error back.
    ///
    /// The item in flight has already had its event sent; items after it get none.
    async fn abort(&self, request_id: &RequestId, err: ApiError) -> ApiError {
        error!(request_id = %request_id, error = %err, "Batch aborted");
        let reason = format!("aborted: {}", err);
        if let Err(finalize_err) = self
            .tracker
            .finalize(request_id, &BatchOutcome::Cancelled(reason))
            .await
        {
            error!(
                request_id = %request_id,
                error = %finalize_err,
                "Aborted batch could not be finalized"
            );
        }
        err
    }
}
