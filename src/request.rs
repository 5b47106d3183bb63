//! Generation request aggregate
//!
//! `GenerationRequest` is the single record describing one batch: what was asked for,
//! the shared context, and where the batch is in its lifecycle. Every lifecycle
//! transition goes through the methods here so that monotonicity is enforced in
//! one place; each accepted transition yields the `RequestPatch` to persist.

use crate::error::ApiError;
use crate::types::{now_millis, RequestId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

/// Caller-supplied description of one document to produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSpec {
    pub spec_id: String,
    pub display_title: String,
    pub template_kind: String,
}

impl DocumentSpec {
    pub fn new(
        spec_id: impl Into<String>,
        display_title: impl Into<String>,
        template_kind: impl Into<String>,
    ) -> Self {
        Self {
            spec_id: spec_id.into(),
            display_title: display_title.into(),
            template_kind: template_kind.into(),
        }
    }
}

/// Business facts shared by every item in a batch. Opaque to the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenerationContext(Map<String, Value>);

impl GenerationContext {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for GenerationContext {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Completed => "completed",
            RequestStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            RequestStatus::Pending => 0,
            RequestStatus::InProgress => 1,
            RequestStatus::Completed | RequestStatus::Failed => 2,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a batch ended, as reported to `finalize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every spec was attempted.
    Exhausted,
    /// Iteration stopped early; remaining specs were never attempted.
    Cancelled(String),
}

/// Partial update of a stored request. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestPatch {
    pub status: Option<RequestStatus>,
    pub completed_count: Option<usize>,
    pub failed_count: Option<usize>,
    pub started_at_ms: Option<u64>,
    pub completed_at_ms: Option<u64>,
    pub failure_reason: Option<String>,
}

impl RequestPatch {
    pub fn is_empty(&self) -> bool {
        *self == RequestPatch::default()
    }
}

/// Aggregate record tracking one batch's lifecycle and counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub id: RequestId,
    pub owner_context_id: String,
    pub requested_specs: Vec<DocumentSpec>,
    pub generation_context: GenerationContext,
    pub status: RequestStatus,
    pub total_count: usize,
    pub completed_count: usize,
    #[serde(default)]
    pub failed_count: usize,
    pub created_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub completed_at_ms: Option<u64>,
    pub failure_reason: Option<String>,
}

impl GenerationRequest {
    /// Build a pending request after validating the submission.
    pub fn new(
        owner_context_id: impl Into<String>,
        specs: Vec<DocumentSpec>,
        context: GenerationContext,
    ) -> Result<Self, ApiError> {
        let owner_context_id = owner_context_id.into();
        validate_submission(&owner_context_id, &specs)?;
        Ok(Self {
            id: RequestId::generate(),
            owner_context_id,
            total_count: specs.len(),
            requested_specs: specs,
            generation_context: context,
            status: RequestStatus::Pending,
            completed_count: 0,
            failed_count: 0,
            created_at_ms: now_millis(),
            started_at_ms: None,
            completed_at_ms: None,
            failure_reason: None,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Items that reached a terminal per-item state.
    pub fn attempted_count(&self) -> usize {
        self.completed_count + self.failed_count
    }

    /// pending -> in_progress
    pub fn start(&mut self, now_ms: u64) -> Result<RequestPatch, ApiError> {
        if self.status != RequestStatus::Pending {
            return Err(ApiError::InvalidState(format!(
                "request {} cannot start from status {}",
                self.id, self.status
            )));
        }
        self.status = RequestStatus::InProgress;
        self.started_at_ms = Some(now_ms);
        Ok(RequestPatch {
            status: Some(self.status),
            started_at_ms: self.started_at_ms,
            ..RequestPatch::default()
        })
    }

    /// Count one item that ended with a persisted artifact.
    pub fn record_completed(&mut self) -> Result<RequestPatch, ApiError> {
        self.ensure_item_slot()?;
        self.completed_count += 1;
        Ok(RequestPatch {
            completed_count: Some(self.completed_count),
            ..RequestPatch::default()
        })
    }

    /// Count one item that ended without any artifact.
    pub fn record_failed(&mut self) -> Result<RequestPatch, ApiError> {
        self.ensure_item_slot()?;
        self.failed_count += 1;
        Ok(RequestPatch {
            failed_count: Some(self.failed_count),
            ..RequestPatch::default()
        })
    }

    /// in_progress -> completed | failed.
    ///
    /// Returns `Ok(None)` when the request is already terminal.
    pub fn finalize(
        &mut self,
        outcome: &BatchOutcome,
        now_ms: u64,
    ) -> Result<Option<RequestPatch>, ApiError> {
        match self.status {
            RequestStatus::Completed | RequestStatus::Failed => return Ok(None),
            RequestStatus::Pending => {
                return Err(ApiError::InvalidState(format!(
                    "request {} cannot be finalized before it has started",
                    self.id
                )));
            }
            RequestStatus::InProgress => {}
        }

        let (status, reason) = match outcome {
            BatchOutcome::Cancelled(reason) => (RequestStatus::Failed, Some(reason.clone())),
            BatchOutcome::Exhausted => {
                if self.attempted_count() != self.total_count {
                    return Err(ApiError::InvalidState(format!(
                        "request {} finalized with {} of {} items attempted",
                        self.id,
                        self.attempted_count(),
                        self.total_count
                    )));
                }
                if self.completed_count > 0 {
                    (RequestStatus::Completed, None)
                } else {
                    (
                        RequestStatus::Failed,
                        Some("no artifact could be persisted for any requested document".to_string()),
                    )
                }
            }
        };

        debug_assert!(status.rank() > self.status.rank());
        self.status = status;
        self.completed_at_ms = Some(now_ms);
        self.failure_reason = reason;
        Ok(Some(RequestPatch {
            status: Some(self.status),
            completed_at_ms: self.completed_at_ms,
            failure_reason: self.failure_reason.clone(),
            ..RequestPatch::default()
        }))
    }

    /// Apply a stored patch. Status changes that would move backwards are rejected.
    pub fn apply(&mut self, patch: &RequestPatch) -> Result<(), ApiError> {
        if let Some(status) = patch.status {
            if status.rank() < self.status.rank()
                || (self.status.is_terminal() && status != self.status)
            {
                return Err(ApiError::InvalidState(format!(
                    "request {} cannot move from {} to {}",
                    self.id, self.status, status
                )));
            }
            self.status = status;
        }
        if let Some(count) = patch.completed_count {
            if count < self.completed_count || count > self.total_count {
                return Err(ApiError::InvalidState(format!(
                    "request {} completed_count cannot move from {} to {}",
                    self.id, self.completed_count, count
                )));
            }
            self.completed_count = count;
        }
        if let Some(count) = patch.failed_count {
            if count < self.failed_count || count > self.total_count {
                return Err(ApiError::InvalidState(format!(
                    "request {} failed_count cannot move from {} to {}",
                    self.id, self.failed_count, count
                )));
            }
            self.failed_count = count;
        }
        if patch.started_at_ms.is_some() {
            self.started_at_ms = patch.started_at_ms;
        }
        if patch.completed_at_ms.is_some() {
            self.completed_at_ms = patch.completed_at_ms;
        }
        if patch.failure_reason.is_some() {
            self.failure_reason = patch.failure_reason.clone();
        }
        Ok(())
    }

    fn ensure_item_slot(&self) -> Result<(), ApiError> {
        if self.status != RequestStatus::InProgress {
            return Err(ApiError::InvalidState(format!(
                "request {} is {}, items can only be recorded while in_progress",
                self.id, self.status
            )));
        }
        if self.attempted_count() >= self.total_count {
            return Err(ApiError::InvalidState(format!(
                "request {} already recorded all {} items",
                self.id, self.total_count
            )));
        }
        Ok(())
    }
}

/// Reject malformed submissions before any request exists.
pub fn validate_submission(owner_context_id: &str, specs: &[DocumentSpec]) -> Result<(), ApiError> {
    if owner_context_id.trim().is_empty() {
        return Err(ApiError::Validation(
            "owner context id cannot be empty".to_string(),
        ));
    }
    if specs.is_empty() {
        return Err(ApiError::Validation(
            "at least one document spec is required".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for (index, spec) in specs.iter().enumerate() {
        if spec.spec_id.trim().is_empty() {
            return Err(ApiError::Validation(format!(
                "document spec at position {} has an empty spec_id",
                index
            )));
        }
        if spec.display_title.trim().is_empty() {
            return Err(ApiError::Validation(format!(
                "document spec '{}' has an empty display_title",
                spec.spec_id
            )));
        }
        if spec.template_kind.trim().is_empty() {
            return Err(ApiError::Validation(format!(
                "document spec '{}' has an empty template_kind",
                spec.spec_id
            )));
        }
        if !seen.insert(spec.spec_id.as_str()) {
            return Err(ApiError::Validation(format!(
                "duplicate spec_id '{}'",
                spec.spec_id
            )));
        }
    }
    Ok(())
}
