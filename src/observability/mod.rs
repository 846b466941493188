//! # Observability Infrastructure
//!
//! Structured logging for the plugin process.

pub mod logging;

pub use logging::{init_logging, log_settings_info};
