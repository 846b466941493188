//! # dbplugin
//!
//! An out-of-process database secrets plugin. A credential-management host issues,
//! rotates and revokes short-lived database accounts by calling the plugin over a
//! fixed six-operation contract; the plugin runs operator-supplied SQL templates as
//! atomic transactions against the backend.
//!
//! ## Architecture
//!
//! ```text
//! host -> PluginServer (JSON-RPC stdio) -> ErrorSanitizer -> LifecycleEngine
//!                                                              |        |
//!                                           credentials (render, usernames)
//!                                                                ConnectionProducer -> Backend
//! ```
//!
//! ## Core Components
//!
//! - **Connection Producer**: owns the configuration and the cached connection handle
//! - **Statement Renderer**: splits statement templates and substitutes `{{placeholders}}`
//! - **Username Policy**: backend-compliant usernames with a random uniqueness suffix
//! - **Lifecycle Engine**: one transaction per operation under one instance lock,
//!   with a direct-execution fallback for statements that cannot be prepared
//! - **Error Sanitizer**: strips secret values from every error leaving the plugin
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use dbplugin::{backends::MySqlBackend, plugin::PluginServer};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let plugin = Arc::new(MySqlBackend::plugin(false));
//!     PluginServer::new(plugin).serve_stdio().await
//! }
//! ```

pub mod backends;
pub mod config;
pub mod connection;
pub mod credentials;
pub mod errors;
pub mod lifecycle;
pub mod observability;
pub mod plugin;
pub mod secrets;

// Re-export commonly used types and traits
pub use config::{ConnectionConfig, PluginSettings};
pub use errors::{PluginError, Result};
pub use lifecycle::{LifecycleEngine, OperationContext};
pub use plugin::{Database, ErrorSanitizer, PluginServer};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
