//! Process-level settings for the plugin binary, read from `DBPLUGIN_*` environment variables.

use serde::Deserialize;
use validator::Validate;

use crate::errors::{PluginError, Result};

/// Environment variable prefix for plugin settings
pub const ENV_PREFIX: &str = "DBPLUGIN";

/// Settings that apply to the whole plugin process rather than one mount.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct PluginSettings {
    /// Log filter directive (trace, debug, info, warn, error or an `EnvFilter` expression)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Emit JSON structured logs
    pub log_json: bool,

    /// Use the legacy 16-character username limit
    pub legacy: bool,

    /// Further cap on generated username length (0 = length class maximum)
    #[validate(range(max = 256, message = "Username max length must be <= 256"))]
    pub username_max_length: usize,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self { log_level: "info".to_string(), log_json: false, legacy: false, username_max_length: 0 }
    }
}

impl PluginSettings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::load(config::Environment::with_prefix(ENV_PREFIX))
    }

    fn load(environment: config::Environment) -> Result<Self> {
        let settings: Self = config::Config::builder()
            .add_source(environment.try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| PluginError::validation(format!("invalid plugin settings: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }
}
