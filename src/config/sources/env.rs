//! Environment source: DOCGEN__SECTION__KEY

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment};

pub const ENV_PREFIX: &str = "DOCGEN";
pub const ENV_SEPARATOR: &str = "__";

/// Highest-precedence layer, e.g. `DOCGEN__GENERATION__ITEM_TIMEOUT_SECS=30`.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    )
}
