//! Sled-backed request and artifact persistence

use crate::artifact::{Artifact, NewArtifact};
use crate::error::StorageError;
use crate::request::{GenerationRequest, RequestPatch};
use crate::store::{ArtifactStore, RequestStore};
use crate::types::{now_millis, ArtifactId, RequestId};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Db, Tree};
use std::io;
use std::path::Path;
use tracing::{debug, warn};

const TREE_REQUESTS: &str = "requests";
const TREE_OWNER_INDEX: &str = "owner_requests";
const TREE_ARTIFACTS: &str = "artifacts";
const TREE_REQUEST_ARTIFACTS: &str = "request_artifacts";
const MAX_UPDATE_ATTEMPTS: usize = 8;

/// Sled implementation of both store traits
#[derive(Clone)]
pub struct SledStore {
    db: Db,
    requests: Tree,
    owner_index: Tree,
    artifacts: Tree,
    request_artifacts: Tree,
}

impl SledStore {
    /// Open (or create) a store at the given directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path.as_ref()).map_err(|e| {
            StorageError::IoError(io::Error::new(
                io::ErrorKind::Other,
                format!("Failed to open sled database: {}", e),
            ))
        })?;
        Self::from_db(db)
    }

    pub fn from_db(db: Db) -> Result<Self, StorageError> {
        let requests = db.open_tree(TREE_REQUESTS).map_err(to_storage_io)?;
        let owner_index = db.open_tree(TREE_OWNER_INDEX).map_err(to_storage_io)?;
        let artifacts = db.open_tree(TREE_ARTIFACTS).map_err(to_storage_io)?;
        let request_artifacts = db.open_tree(TREE_REQUEST_ARTIFACTS).map_err(to_storage_io)?;
        Ok(Self {
            db,
            requests,
            owner_index,
            artifacts,
            request_artifacts,
        })
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush().map_err(to_storage_io)?;
        Ok(())
    }

    fn read_request(&self, id: &RequestId) -> Result<Option<GenerationRequest>, StorageError> {
        let Some(raw) = self.requests.get(id.as_str()).map_err(to_storage_io)? else {
            return Ok(None);
        };
        Ok(Some(decode(&raw)?))
    }

    fn read_artifact(&self, id: &ArtifactId) -> Result<Option<Artifact>, StorageError> {
        let Some(raw) = self.artifacts.get(id.as_str()).map_err(to_storage_io)? else {
            return Ok(None);
        };
        Ok(Some(decode(&raw)?))
    }
}

#[async_trait]
impl RequestStore for SledStore {
    async fn create_request(&self, request: &GenerationRequest) -> Result<(), StorageError> {
        let value = encode(request)?;
        self.requests
            .compare_and_swap(request.id.as_str(), None as Option<&[u8]>, Some(value))
            .map_err(to_storage_io)?
            .map_err(|_| StorageError::AlreadyExists(request.id.to_string()))?;
        self.owner_index
            .insert(
                owner_key(&request.owner_context_id, &request.id),
                request.id.as_str(),
            )
            .map_err(to_storage_io)?;
        self.flush()?;
        debug!(request_id = %request.id, owner = %request.owner_context_id, "Request record created");
        Ok(())
    }

    async fn update_request(
        &self,
        id: &RequestId,
        patch: &RequestPatch,
    ) -> Result<GenerationRequest, StorageError> {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let current = self
                .requests
                .get(id.as_str())
                .map_err(to_storage_io)?
                .ok_or_else(|| StorageError::RequestNotFound(id.clone()))?;
            let mut record: GenerationRequest = decode(&current)?;
            record
                .apply(patch)
                .map_err(|e| StorageError::Conflict(e.to_string()))?;
            let value = encode(&record)?;
            match self
                .requests
                .compare_and_swap(id.as_str(), Some(current), Some(value))
                .map_err(to_storage_io)?
            {
                Ok(()) => {
                    self.flush()?;
                    return Ok(record);
                }
                Err(_) => {
                    warn!(request_id = %id, attempt, "Concurrent request update detected, retrying");
                }
            }
        }
        Err(StorageError::Conflict(format!(
            "request {} changed concurrently {} times",
            id, MAX_UPDATE_ATTEMPTS
        )))
    }

    async fn get_request(&self, id: &RequestId) -> Result<Option<GenerationRequest>, StorageError> {
        self.read_request(id)
    }

    async fn list_requests(
        &self,
        owner_context_id: &str,
    ) -> Result<Vec<GenerationRequest>, StorageError> {
        let prefix = format!("{owner_context_id}:");
        let mut out = Vec::new();
        for result in self.owner_index.scan_prefix(prefix.as_bytes()) {
            let (_, value) = result.map_err(to_storage_io)?;
            let id = RequestId::from(String::from_utf8_lossy(&value).into_owned());
            if let Some(request) = self.read_request(&id)? {
                // Prefix scans also match owners that merely start with this one.
                if request.owner_context_id == owner_context_id {
                    out.push(request);
                }
            }
        }
        out.sort_by_key(|r| std::cmp::Reverse(r.created_at_ms));
        Ok(out)
    }
}

#[async_trait]
impl ArtifactStore for SledStore {
    async fn create_artifact(&self, artifact: NewArtifact) -> Result<Artifact, StorageError> {
        let artifact = artifact.into_artifact(ArtifactId::generate(), now_millis());
        let value = encode(&artifact)?;
        self.artifacts
            .compare_and_swap(artifact.id.as_str(), None as Option<&[u8]>, Some(value))
            .map_err(to_storage_io)?
            .map_err(|_| StorageError::AlreadyExists(artifact.id.to_string()))?;
        if let Some(request_id) = &artifact.parent_request_id {
            self.request_artifacts
                .insert(
                    format!("{}:{}", request_id, artifact.id).as_bytes(),
                    artifact.id.as_str(),
                )
                .map_err(to_storage_io)?;
        }
        self.flush()?;
        debug!(
            artifact_id = %artifact.id,
            spec_id = %artifact.spec_id,
            provenance = %artifact.provenance,
            "Artifact persisted"
        );
        Ok(artifact)
    }

    async fn get_artifact(&self, id: &ArtifactId) -> Result<Option<Artifact>, StorageError> {
        self.read_artifact(id)
    }

    async fn list_artifacts(&self, request_id: &RequestId) -> Result<Vec<Artifact>, StorageError> {
        let prefix = format!("{request_id}:");
        let mut out = Vec::new();
        for result in self.request_artifacts.scan_prefix(prefix.as_bytes()) {
            let (_, value) = result.map_err(to_storage_io)?;
            let id = ArtifactId::from(String::from_utf8_lossy(&value).into_owned());
            if let Some(artifact) = self.read_artifact(&id)? {
                if artifact.parent_request_id.as_ref() == Some(request_id) {
                    out.push(artifact);
                }
            }
        }
        out.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(out)
    }
}

fn owner_key(owner_context_id: &str, id: &RequestId) -> Vec<u8> {
    format!("{owner_context_id}:{id}").into_bytes()
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(raw: &[u8]) -> Result<T, StorageError> {
    serde_json::from_slice(raw).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn to_storage_io(err: sled::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::Other, err.to_string()))
}
