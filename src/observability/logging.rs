//! # Structured Logging
//!
//! Logs go to stderr: stdout carries the plugin protocol and must stay clean.
//!
//! Every plugin operation runs inside an [`operation_span!`](crate::operation_span),
//! which carries a fresh `operation_id` so the statements, commit and any
//! rollback of one request can be correlated.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::PluginSettings;

/// Create a tracing span for a plugin operation.
///
/// ```rust,ignore
/// let span = operation_span!("new_user", username = %username);
/// ```
#[macro_export]
macro_rules! operation_span {
    ($operation:expr) => {
        tracing::info_span!(
            "plugin_operation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($operation:expr, $($field:tt)*) => {
        tracing::info_span!(
            "plugin_operation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(settings: &PluginSettings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false);

    let result = if settings.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    if result.is_err() {
        // Subscriber already set elsewhere (e.g. integration tests); ignore.
    }
}

/// Log plugin settings at startup
pub fn log_settings_info(settings: &PluginSettings, type_name: &str) {
    tracing::info!(
        database_type = %type_name,
        legacy_usernames = %settings.legacy,
        username_max_length = %settings.username_max_length,
        version = %crate::VERSION,
        "Database plugin starting"
    );
}
