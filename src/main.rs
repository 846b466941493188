use std::sync::Arc;

use dbplugin::{
    backends::MySqlBackend,
    observability::{init_logging, log_settings_info},
    plugin::{Database, PluginServer},
    PluginSettings, APP_NAME, VERSION,
};
use tracing::info;

fn install_rustls_provider() {
    use rustls::crypto::{ring, CryptoProvider};

    if CryptoProvider::get_default().is_none() {
        // a concurrent install means a provider is present either way
        let _ = ring::default_provider().install_default();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    install_rustls_provider();

    // Load .env file if it exists (optional - won't fail if missing)
    // This must happen before any settings are read from environment
    if let Err(e) = dotenvy::dotenv() {
        // Only warn if the error is NOT "file not found"
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    let settings = PluginSettings::from_env()?;
    init_logging(&settings);

    let plugin = Arc::new(MySqlBackend::plugin_from_settings(&settings));
    log_settings_info(&settings, &plugin.type_name());
    info!(app_name = APP_NAME, version = VERSION, "Serving database plugin on stdio");

    PluginServer::new(plugin).serve_stdio().await
}
