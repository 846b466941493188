//! # Configuration Management
//!
//! Two layers of configuration reach the plugin:
//!
//! - [`ConnectionConfig`]: per-mount connection settings the host sends on `Initialize`
//! - [`PluginSettings`]: process-wide settings read from `DBPLUGIN_*` environment variables

pub mod connection;
pub mod settings;

pub use connection::{parse_duration, ConfigMap, ConnectionConfig, INVALID_URL_MESSAGE};
pub use settings::{PluginSettings, ENV_PREFIX};
