use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Config builder seeded with built-in defaults, the lowest-precedence layer.
///
/// Later sources (user file, workspace file, environment) override these keys.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("provider.provider_type", "ollama")?
        .set_default("provider.model", "llama3.1")?
        .set_default("generation.item_timeout_secs", 120)?
        .set_default("generation.max_retry_attempts", 0)?
        .set_default("generation.retry_delay_ms", 1000)?
        .set_default("generation.channel_capacity", 32)?
        .set_default("generation.strict_templates", false)?
        .set_default("storage.store_path", ".docgen/store")?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "stderr")
}
