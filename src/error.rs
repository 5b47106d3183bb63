//! Error types for the batch document generation system.

use crate::types::{ArtifactId, RequestId};
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Request not found: {0}")]
    RequestNotFound(RequestId),

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(ArtifactId),

    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    #[error("Conflicting update: {0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Failure of the content-generation capability for a single item.
///
/// These never abort a batch; the orchestrator turns them into fallback artifacts.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider request failed: {0}")]
    RequestFailed(String),

    #[error("Provider authentication failed: {0}")]
    AuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Generation timed out after {0} ms")]
    Timeout(u128),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Provider returned empty content")]
    EmptyContent,

    #[error("Unknown template kind: {0}")]
    UnknownTemplate(String),
}

impl GenerationError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::RequestFailed(_)
                | GenerationError::RateLimited(_)
                | GenerationError::Timeout(_)
        )
    }
}

/// API-level errors surfaced by the tracker, orchestrator and submission boundary
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Request not found: {0}")]
    RequestNotFound(RequestId),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StorageError),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Progress channel closed: {0}")]
    ChannelClosed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
