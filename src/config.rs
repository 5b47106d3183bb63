//! Configuration System
//!
//! Layered configuration built with the `config` crate. Lowest to highest precedence:
//! built-in defaults, the user file (`$XDG_CONFIG_HOME/docgen/config.toml`), the
//! workspace file (`./docgen.toml`), then `DOCGEN__SECTION__KEY` environment variables.

use crate::error::ApiError;
use crate::generation::OrchestratorSettings;
use crate::logging::LoggingConfig;
use crate::template::{TemplateCatalog, TemplateDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod merge;
mod sources;

pub use crate::provider::{ProviderConfig, ProviderType};
pub use sources::global_file::global_config_path;
pub use sources::workspace_file::{workspace_config_path, WORKSPACE_CONFIG_FILE};

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DocgenConfig {
    /// Model provider used by the artifact generator
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub generation: GenerationSettings,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Extra or overriding template kinds
    #[serde(default)]
    pub templates: HashMap<String, TemplateDefinition>,
}

/// Batch execution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Per-item generator timeout; 0 disables it
    #[serde(default = "default_item_timeout_secs")]
    pub item_timeout_secs: u64,

    #[serde(default)]
    pub max_retry_attempts: usize,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Bound of the progress channel between orchestrator and transport
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Reject template kinds missing from the catalog instead of using a generic prompt
    #[serde(default)]
    pub strict_templates: bool,
}

fn default_item_timeout_secs() -> u64 {
    120
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_channel_capacity() -> usize {
    32
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            item_timeout_secs: default_item_timeout_secs(),
            max_retry_attempts: 0,
            retry_delay_ms: default_retry_delay_ms(),
            channel_capacity: default_channel_capacity(),
            strict_templates: false,
        }
    }
}

impl GenerationSettings {
    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            item_timeout: (self.item_timeout_secs > 0)
                .then(|| Duration::from_secs(self.item_timeout_secs)),
            max_retry_attempts: self.max_retry_attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".docgen/store")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Provider(String),
    Generation(String),
    Storage(String),
    Logging(String),
    Template(String, String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Provider(msg) => write!(f, "Provider: {}", msg),
            ValidationError::Generation(msg) => write!(f, "Generation: {}", msg),
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
            ValidationError::Template(kind, msg) => write!(f, "Template '{}': {}", kind, msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl DocgenConfig {
    /// Validate the entire configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.provider.validate() {
            errors.push(ValidationError::Provider(e));
        }

        if self.generation.channel_capacity == 0 {
            errors.push(ValidationError::Generation(
                "channel_capacity must be at least 1".to_string(),
            ));
        }

        if self.storage.store_path.as_os_str().is_empty() {
            errors.push(ValidationError::Storage("store_path cannot be empty".to_string()));
        }

        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        let mut kinds: Vec<&String> = self.templates.keys().collect();
        kinds.sort();
        for kind in kinds {
            let template = &self.templates[kind];
            if template.title.trim().is_empty() {
                errors.push(ValidationError::Template(
                    kind.clone(),
                    "title cannot be empty".to_string(),
                ));
            }
            if template.instructions.trim().is_empty() {
                errors.push(ValidationError::Template(
                    kind.clone(),
                    "instructions cannot be empty".to_string(),
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold every problem into one `ApiError::ConfigError`.
    pub fn ensure_valid(&self) -> Result<(), ApiError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })
    }

    /// Built-in templates overlaid with the configured ones.
    pub fn template_catalog(&self) -> TemplateCatalog {
        let mut catalog = TemplateCatalog::builtin();
        if self.generation.strict_templates {
            let mut strict = TemplateCatalog::new(false);
            for kind in catalog.kinds() {
                if let Some(definition) = catalog.get(kind) {
                    strict.insert(kind, definition.title.clone(), definition.instructions.clone());
                }
            }
            catalog = strict;
        }
        catalog.extend(&self.templates);
        catalog
    }
}

/// Loads `DocgenConfig` from the layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, user file, `<workspace_root>/docgen.toml`, then environment.
    pub fn load(workspace_root: &Path) -> Result<DocgenConfig, ApiError> {
        let builder = merge::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = sources::env::add_to_builder(builder);
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Defaults, the given file (required), then environment.
    pub fn load_from_file(path: &Path) -> Result<DocgenConfig, ApiError> {
        if !path.exists() {
            return Err(ApiError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let builder = merge::builder_with_defaults()?
            .add_source(config::File::from(path.to_path_buf()).required(true));
        let builder = sources::env::add_to_builder(builder);
        Ok(builder.build()?.try_deserialize()?)
    }
}
