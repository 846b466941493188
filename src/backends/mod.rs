//! # Backends
//!
//! Database technologies the plugin can manage credentials for.

pub mod mysql;

pub use mysql::{MySqlBackend, MySqlPlugin, MYSQL_TYPE_NAME};
