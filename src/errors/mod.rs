//! # Error Handling
//!
//! Error types for the plugin: the boundary taxonomy ([`PluginError`]) and the
//! classified driver errors ([`BackendError`]) the lifecycle engine consumes.

pub mod backend;
pub mod types;

pub use backend::{BackendError, ErrorClass};
pub use types::{PluginError, Result};
