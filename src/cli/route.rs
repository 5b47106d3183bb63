//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::adapter::LlmArtifactGenerator;
use crate::cli::parse::{ArtifactCommands, ArtifactsCommands, Commands, RequestCommands};
use crate::cli::presentation::{
    format_artifact_json, format_artifact_list_json, format_artifact_list_text,
    format_artifact_text, format_request_json, format_request_list_json,
    format_request_list_text, format_request_text, format_summary_text,
};
use crate::config::{ConfigLoader, DocgenConfig};
use crate::error::{ApiError, StorageError};
use crate::generation::{BatchOrchestrator, BatchSubmission, GenerationService, RequestTracker};
use crate::progress::NdjsonTransport;
use crate::provider::ProviderFactory;
use crate::request::{DocumentSpec, GenerationContext};
use crate::store::{ArtifactStore, RequestStore, SledStore};
use crate::types::{ArtifactId, RequestId};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Runtime context for CLI execution: loaded config and the opened store.
pub struct RunContext {
    config: DocgenConfig,
    store: SledStore,
    store_path: PathBuf,
}

impl RunContext {
    /// Load and validate config, then open the store.
    pub fn new(
        workspace_root: PathBuf,
        config_path: Option<PathBuf>,
        store_override: Option<PathBuf>,
    ) -> Result<Self, ApiError> {
        let config = match config_path {
            Some(ref cfg_path) => ConfigLoader::load_from_file(cfg_path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        config.ensure_valid()?;

        let store_path = resolve_store_path(
            &workspace_root,
            store_override.unwrap_or_else(|| config.storage.store_path.clone()),
        );
        std::fs::create_dir_all(&store_path).map_err(StorageError::IoError)?;
        let store = SledStore::open(&store_path)?;
        debug!(store_path = %store_path.display(), "Store opened");

        Ok(Self {
            config,
            store,
            store_path,
        })
    }

    pub fn config(&self) -> &DocgenConfig {
        &self.config
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Execute a CLI command via the single route table.
    ///
    /// `generate` writes NDJSON to stdout itself and returns the batch summary line
    /// meant for stderr; other commands return their rendered output.
    pub async fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Generate {
                owner,
                specs,
                context,
            } => self.handle_generate(owner, specs, context.as_deref()).await,
            Commands::Request { command } => match command {
                RequestCommands::Show { id, format } => {
                    let request = self
                        .store
                        .get_request(&RequestId::from(id.as_str()))
                        .await?
                        .ok_or_else(|| ApiError::RequestNotFound(RequestId::from(id.as_str())))?;
                    if format == "json" {
                        format_request_json(&request)
                    } else {
                        Ok(format_request_text(&request))
                    }
                }
                RequestCommands::List { owner, format } => {
                    let requests = self.store.list_requests(owner).await?;
                    if format == "json" {
                        format_request_list_json(&requests)
                    } else {
                        Ok(format_request_list_text(owner, &requests))
                    }
                }
            },
            Commands::Artifacts { command } => match command {
                ArtifactsCommands::List { request_id, format } => {
                    let request_id = RequestId::from(request_id.as_str());
                    if self.store.get_request(&request_id).await?.is_none() {
                        return Err(ApiError::RequestNotFound(request_id));
                    }
                    let artifacts = self.store.list_artifacts(&request_id).await?;
                    if format == "json" {
                        format_artifact_list_json(&artifacts)
                    } else {
                        Ok(format_artifact_list_text(&artifacts))
                    }
                }
            },
            Commands::Artifact { command } => match command {
                ArtifactCommands::Show { id, format } => {
                    let artifact_id = ArtifactId::from(id.as_str());
                    let artifact = self
                        .store
                        .get_artifact(&artifact_id)
                        .await?
                        .ok_or_else(|| {
                            ApiError::Persistence(StorageError::ArtifactNotFound(artifact_id))
                        })?;
                    if format == "json" {
                        format_artifact_json(&artifact)
                    } else {
                        Ok(format_artifact_text(&artifact))
                    }
                }
            },
        }
    }

    /// Wire provider, generator, tracker and orchestrator from config.
    pub fn generation_service(&self) -> Result<GenerationService, ApiError> {
        let client = ProviderFactory::create_client(&self.config.provider)?;
        let generator = LlmArtifactGenerator::new(
            client,
            self.config.template_catalog(),
            self.config.provider.default_options.clone(),
        );
        let store = Arc::new(self.store.clone());
        let tracker = Arc::new(RequestTracker::new(store.clone()));
        let orchestrator = BatchOrchestrator::with_settings(
            tracker,
            store,
            Arc::new(generator),
            self.config.generation.orchestrator_settings(),
        );
        Ok(GenerationService::new(Arc::new(orchestrator))
            .with_channel_capacity(self.config.generation.channel_capacity))
    }

    async fn handle_generate(
        &self,
        owner: &str,
        specs_path: &Path,
        context_path: Option<&Path>,
    ) -> Result<String, ApiError> {
        let specs: Vec<DocumentSpec> = read_json_file(specs_path)?;
        let context = match context_path {
            Some(path) => read_json_file::<GenerationContext>(path)?,
            None => GenerationContext::new(),
        };

        let service = self.generation_service()?;
        let (request_id, receiver, handle) = service
            .spawn(BatchSubmission::new(owner, specs, context))
            .await?;
        info!(request_id = %request_id, owner = %owner, "Streaming batch progress");

        let transport = NdjsonTransport::new(tokio::io::stdout()).drain(receiver).await;
        let summary = handle
            .await
            .map_err(|e| ApiError::InvalidState(format!("Generation task failed: {}", e)))??;
        transport?;

        Ok(format_summary_text(&summary))
    }
}

/// Relative store paths resolve against the workspace root.
fn resolve_store_path(workspace_root: &Path, store_path: PathBuf) -> PathBuf {
    if store_path.is_absolute() {
        store_path
    } else {
        workspace_root.join(store_path)
    }
}

fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, ApiError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ApiError::Validation(format!("Failed to read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&raw)
        .map_err(|e| ApiError::Validation(format!("Invalid JSON in {}: {}", path.display(), e)))
}
