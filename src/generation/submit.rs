//! Submission boundary: validate, create the request, run the batch.

use crate::error::ApiError;
use crate::generation::orchestrator::{BatchOrchestrator, BatchSummary};
use crate::generation::tracker::RequestTracker;
use crate::progress::{progress_channel, ProgressReceiver, ProgressSink};
use crate::request::{validate_submission, DocumentSpec, GenerationContext};
use crate::types::RequestId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// What a caller submits for one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSubmission {
    pub owner_context_id: String,
    pub specs: Vec<DocumentSpec>,
    #[serde(default)]
    pub context: GenerationContext,
}

impl BatchSubmission {
    pub fn new(
        owner_context_id: impl Into<String>,
        specs: Vec<DocumentSpec>,
        context: GenerationContext,
    ) -> Self {
        Self {
            owner_context_id: owner_context_id.into(),
            specs,
            context,
        }
    }
}

pub struct GenerationService {
    orchestrator: Arc<BatchOrchestrator>,
    channel_capacity: usize,
}

impl GenerationService {
    pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

    pub fn new(orchestrator: Arc<BatchOrchestrator>) -> Self {
        Self {
            orchestrator,
            channel_capacity: Self::DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity;
        self
    }

    pub fn tracker(&self) -> &Arc<RequestTracker> {
        self.orchestrator.tracker()
    }

    /// Run a batch to completion, writing events into `sink`.
    ///
    /// Invalid submissions fail before any request is created or event emitted.
    pub async fn submit(
        &self,
        submission: BatchSubmission,
        sink: &dyn ProgressSink,
    ) -> Result<BatchSummary, ApiError> {
        validate_submission(&submission.owner_context_id, &submission.specs)?;
        let request = self
            .tracker()
            .create(&submission.owner_context_id, submission.specs, submission.context)
            .await?;
        self.orchestrator
            .run(
                &request.id,
                &request.requested_specs,
                &request.generation_context,
                sink,
            )
            .await
    }

    /// Start a batch on the runtime and return its event stream.
    ///
    /// Dropping the receiver cancels the batch.
    pub async fn spawn(
        &self,
        submission: BatchSubmission,
    ) -> Result<
        (
            RequestId,
            ProgressReceiver,
            JoinHandle<Result<BatchSummary, ApiError>>,
        ),
        ApiError,
    > {
        validate_submission(&submission.owner_context_id, &submission.specs)?;
        let request = self
            .tracker()
            .create(&submission.owner_context_id, submission.specs, submission.context)
            .await?;
        let (sink, receiver) = progress_channel(self.channel_capacity);
        let orchestrator = Arc::clone(&self.orchestrator);
        let request_id = request.id.clone();
        debug!(request_id = %request_id, capacity = self.channel_capacity, "Spawning batch");

        let handle = tokio::spawn(async move {
            orchestrator
                .run(
                    &request.id,
                    &request.requested_specs,
                    &request.generation_context,
                    &sink,
                )
                .await
        });
        Ok((request_id, receiver, handle))
    }
}
