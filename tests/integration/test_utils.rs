//! Shared test utilities for integration tests
//!
//! Scripted generators, failure-injecting stores and a sled-backed harness, plus
//! environment isolation for configuration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use docgen::adapter::ArtifactGenerator;
use docgen::artifact::{Artifact, GeneratedDocument, NewArtifact};
use docgen::error::{GenerationError, StorageError};
use docgen::generation::{
    BatchOrchestrator, GenerationService, OrchestratorSettings, RequestTracker,
};
use docgen::request::{DocumentSpec, GenerationContext};
use docgen::store::{ArtifactStore, SledStore};
use docgen::types::{ArtifactId, RequestId};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tempfile::TempDir;

/// Generator that fails for chosen template kinds and succeeds otherwise.
pub struct ScriptedGenerator {
    failing_kinds: HashSet<String>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn succeeding() -> Self {
        Self::failing(&[])
    }

    pub fn failing(kinds: &[&str]) -> Self {
        Self {
            failing_kinds: kinds.iter().map(|k| k.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ArtifactGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        template_kind: &str,
        context: &GenerationContext,
    ) -> Result<GeneratedDocument, GenerationError> {
        self.calls.lock().push(template_kind.to_string());
        if self.failing_kinds.contains(template_kind) {
            return Err(GenerationError::Provider(format!(
                "{template_kind} generator unavailable"
            )));
        }
        let company = context
            .get("company_name")
            .and_then(|v| v.as_str())
            .unwrap_or("the organisation");
        Ok(GeneratedDocument {
            title: String::new(),
            content: format!("## Scope\n\nThis {template_kind} applies to {company}."),
            summary: format!("{template_kind} for {company}"),
            sections: Vec::new(),
        })
    }
}

/// Artifact store that rejects writes for chosen spec ids.
pub struct FailingArtifactStore {
    inner: SledStore,
    failing_specs: HashSet<String>,
}

impl FailingArtifactStore {
    pub fn new(inner: SledStore, failing_specs: &[&str]) -> Self {
        Self {
            inner,
            failing_specs: failing_specs.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl ArtifactStore for FailingArtifactStore {
    async fn create_artifact(&self, artifact: NewArtifact) -> Result<Artifact, StorageError> {
        if self.failing_specs.contains(&artifact.spec_id) {
            return Err(StorageError::Backend(format!(
                "write rejected for {}",
                artifact.spec_id
            )));
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

/// A sled store in a temp directory plus a tracker over it.
pub struct Harness {
    _dir: TempDir,
    pub store: SledStore,
    pub tracker: Arc<RequestTracker>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = SledStore::open(dir.path()).unwrap();
        let tracker = Arc::new(RequestTracker::new(Arc::new(store.clone())));
        Self {
            _dir: dir,
            store,
            tracker,
        }
    }

    pub fn service(
        &self,
        generator: Arc<dyn ArtifactGenerator>,
        failing_specs: &[&str],
    ) -> GenerationService {
        let artifacts = FailingArtifactStore::new(self.store.clone(), failing_specs);
        let orchestrator = BatchOrchestrator::with_settings(
            Arc::clone(&self.tracker),
            Arc::new(artifacts),
            generator,
            OrchestratorSettings::default(),
        );
        GenerationService::new(Arc::new(orchestrator))
    }
}

pub fn specs(kinds: &[&str]) -> Vec<DocumentSpec> {
    kinds
        .iter()
        .enumerate()
        .map(|(i, kind)| {
            DocumentSpec::new(format!("spec-{}", i + 1), format!("Document {}", i + 1), *kind)
        })
        .collect()
}

pub fn context() -> GenerationContext {
    GenerationContext::new()
        .with("company_name", "Acme Ltd")
        .with("industry", "construction")
        .with("employee_count", 42)
}

// Serializes tests that touch process-wide environment variables.
static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Run `f` with XDG_CONFIG_HOME pointing into `test_dir`, restoring it afterwards.
pub fn with_xdg_config_home<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let original = std::env::var("XDG_CONFIG_HOME").ok();
    std::env::set_var("XDG_CONFIG_HOME", test_dir.path());

    let result = f();

    match original {
        Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }
    result
}

/// Per-kind tally of event types, for quick assertions.
pub fn count_kinds(kinds: &[&'static str]) -> HashMap<&'static str, usize> {
    let mut counts = HashMap::new();
    for kind in kinds {
        *counts.entry(*kind).or_insert(0) += 1;
    }
    counts
}

/// Model provider replaying scripted completions in order.
pub struct ScriptedProvider {
    responses: Mutex<std::collections::VecDeque<Result<String, GenerationError>>>,
    pub prompts: Mutex<Vec<Vec<docgen::provider::ChatMessage>>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl docgen::provider::ModelProviderClient for ScriptedProvider {
    async fn complete(
        &self,
        messages: Vec<docgen::provider::ChatMessage>,
        _options: docgen::provider::CompletionOptions,
    ) -> Result<docgen::provider::CompletionResponse, GenerationError> {
        self.prompts.lock().push(messages);
        let content = self
            .responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Provider("script exhausted".to_string())))?;
        Ok(docgen::provider::CompletionResponse {
            content,
            model: "scripted".to_string(),
            usage: docgen::provider::TokenUsage::default(),
            finish_reason: Some("stop".to_string()),
        })
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
