//! Configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from an
//! optional TOML file overlaid with `MESHPORT__*` environment variables.
//! Every field has a default, so an empty source yields a usable config.

pub mod attribution;
pub mod batch;
pub mod fetch;
pub mod logging;

use std::path::Path;

use serde::{Deserialize, Serialize};
use validator::Validate;

use self::attribution::AttributionConfig;
use self::batch::BatchConfig;
use self::fetch::FetchConfig;
use self::logging::LoggingConfig;

use crate::error::ConfigError;

/// Prefix for environment variable overrides (`MESHPORT__FETCH__TIMEOUT_SECONDS`).
const ENV_PREFIX: &str = "MESHPORT";

/// Root configuration.
#[derive(Debug, Clone, Default, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshportConfig {
    /// Remote source fetching.
    #[validate(nested)]
    pub fetch: FetchConfig,
    /// Batch conversion defaults.
    #[validate(nested)]
    pub batch: BatchConfig,
    /// Attribution strings stamped into exported files.
    pub attribution: AttributionConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl MeshportConfig {
    /// Load configuration from an optional TOML file and the environment.
    ///
    /// A missing file is not an error; values outside their allowed range are.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let config: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (no environment overlay).
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }
}
