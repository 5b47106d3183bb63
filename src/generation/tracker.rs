//! Generation Request Tracker
//!
//! Sole writer of `GenerationRequest` lifecycle transitions. Each operation loads the
//! current record, applies the transition on the value object, and persists the
//! resulting patch.

use crate::error::ApiError;
use crate::request::{BatchOutcome, DocumentSpec, GenerationContext, GenerationRequest, RequestPatch};
use crate::store::RequestStore;
use crate::types::{now_millis, RequestId};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

pub struct RequestTracker {
    store: Arc<dyn RequestStore>,
    active_runs: Arc<Mutex<HashSet<RequestId>>>,
}

impl RequestTracker {
    pub fn new(store: Arc<dyn RequestStore>) -> Self {
        Self {
            store,
            active_runs: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Validate and persist a new pending request.
    pub async fn create(
        &self,
        owner_context_id: &str,
        specs: Vec<DocumentSpec>,
        context: GenerationContext,
    ) -> Result<GenerationRequest, ApiError> {
        let request = GenerationRequest::new(owner_context_id, specs, context)?;
        self.store.create_request(&request).await?;
        info!(
            request_id = %request.id,
            owner = %request.owner_context_id,
            total = request.total_count,
            "Generation request created"
        );
        Ok(request)
    }

    /// pending -> in_progress
    pub async fn mark_started(&self, id: &RequestId) -> Result<GenerationRequest, ApiError> {
        let mut request = self.get(id).await?;
        let patch = request.start(now_millis())?;
        self.persist(id, &patch).await
    }

    pub async fn record_item_completed(&self, id: &RequestId) -> Result<GenerationRequest, ApiError> {
        let mut request = self.get(id).await?;
        let patch = request.record_completed()?;
        self.persist(id, &patch).await
    }

    pub async fn record_item_failed(&self, id: &RequestId) -> Result<GenerationRequest, ApiError> {
        let mut request = self.get(id).await?;
        let patch = request.record_failed()?;
        self.persist(id, &patch).await
    }

    /// Move the request to its terminal status. A terminal request is returned unchanged.
    pub async fn finalize(
        &self,
        id: &RequestId,
        outcome: &BatchOutcome,
    ) -> Result<GenerationRequest, ApiError> {
        let mut request = self.get(id).await?;
        match request.finalize(outcome, now_millis())? {
            Some(patch) => {
                let stored = self.persist(id, &patch).await?;
                info!(
                    request_id = %id,
                    status = %stored.status,
                    completed = stored.completed_count,
                    failed = stored.failed_count,
                    total = stored.total_count,
                    "Generation request finalized"
                );
                Ok(stored)
            }
            None => {
                debug!(request_id = %id, status = %request.status, "Request already terminal");
                Ok(request)
            }
        }
    }

    pub async fn get(&self, id: &RequestId) -> Result<GenerationRequest, ApiError> {
        self.store
            .get_request(id)
            .await?
            .ok_or_else(|| ApiError::RequestNotFound(id.clone()))
    }

    pub async fn list_for_owner(
        &self,
        owner_context_id: &str,
    ) -> Result<Vec<GenerationRequest>, ApiError> {
        Ok(self.store.list_requests(owner_context_id).await?)
    }

    /// Reserve a request for a single run. Released when the guard drops.
    pub fn claim_run(&self, id: &RequestId) -> Result<RunGuard, ApiError> {
        let mut active = self.active_runs.lock();
        if !active.insert(id.clone()) {
            return Err(ApiError::InvalidState(format!(
                "request {} is already being run",
                id
            )));
        }
        Ok(RunGuard {
            id: id.clone(),
            active_runs: Arc::clone(&self.active_runs),
        })
    }

    pub fn is_running(&self, id: &RequestId) -> bool {
        self.active_runs.lock().contains(id)
    }

    async fn persist(
        &self,
        id: &RequestId,
        patch: &RequestPatch,
    ) -> Result<GenerationRequest, ApiError> {
        Ok(self.store.update_request(id, patch).await?)
    }
}

/// Exclusive claim on one request id
pub struct RunGuard {
    id: RequestId,
    active_runs: Arc<Mutex<HashSet<RequestId>>>,
}

impl RunGuard {
    pub fn request_id(&self) -> &RequestId {
        &self.id
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.active_runs.lock().remove(&self.id);
    }
}
