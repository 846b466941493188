//! Secret handling for credentials flowing through the plugin.
//!
//! Passwords enter the plugin in host requests and in the connection
//! configuration. They are held as [`SecretString`] so they never reach logs by
//! accident, and every error crossing the plugin boundary is passed through a
//! [`Redactor`] built from the values a [`SecretValues`] provider reports.
//!
//! # Security Considerations
//!
//! - Passwords are never logged; spans carry usernames only
//! - Error text is redacted before leaving the plugin, whichever component produced it
//! - Password buffers are zeroed on drop

pub mod redact;
pub mod types;

pub use redact::{Redactor, SecretValues, PASSWORD_PLACEHOLDER};
pub use types::{SecretString, REDACTED};
