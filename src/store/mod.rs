//! Request and Artifact Stores
//!
//! Persistence boundary for the orchestrator. Every call is treated as a fallible
//! remote operation; the orchestrator decides what a failure means for the batch.

pub mod persistence;

pub use persistence::SledStore;

use crate::artifact::{Artifact, NewArtifact};
use crate::error::StorageError;
use crate::request::{GenerationRequest, RequestPatch};
use crate::types::{ArtifactId, RequestId};
use async_trait::async_trait;

/// Aggregate request records
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Insert a new request. Fails if the id is already taken.
    async fn create_request(&self, request: &GenerationRequest) -> Result<(), StorageError>;

    /// Apply a partial update and return the stored record.
    async fn update_request(
        &self,
        id: &RequestId,
        patch: &RequestPatch,
    ) -> Result<GenerationRequest, StorageError>;

    async fn get_request(&self, id: &RequestId) -> Result<Option<GenerationRequest>, StorageError>;

    /// Requests for one owner, newest first.
    async fn list_requests(&self, owner_context_id: &str)
        -> Result<Vec<GenerationRequest>, StorageError>;
}

/// Artifact records. Artifacts are write-once.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist a new artifact, assigning its id and creation time.
    async fn create_artifact(&self, artifact: NewArtifact) -> Result<Artifact, StorageError>;

    async fn get_artifact(&self, id: &ArtifactId) -> Result<Option<Artifact>, StorageError>;

    /// Artifacts produced by one request, in creation order.
    async fn list_artifacts(&self, request_id: &RequestId) -> Result<Vec<Artifact>, StorageError>;
}
