//! Backend driver errors and their classification.
//!
//! Driver-specific error inspection happens once, in each backend's translation
//! function, which tags the error with an [`ErrorClass`]. The lifecycle engine only
//! ever looks at the tag.

use std::fmt;

/// Classification of a backend error as seen by the lifecycle engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The statement cannot go through the prepared-statement protocol and
    /// should be executed directly instead.
    NotPreparable,
    /// The connection itself failed (I/O, TLS, pool closed or timed out).
    Connection,
    /// Any other error reported by the backend.
    Other,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::NotPreparable => write!(f, "not_preparable"),
            ErrorClass::Connection => write!(f, "connection"),
            ErrorClass::Other => write!(f, "other"),
        }
    }
}

/// An error returned by a backend driver, already classified.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct BackendError {
    class: ErrorClass,
    message: String,
}

impl BackendError {
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self { class, message: message.into() }
    }

    pub fn not_preparable(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::NotPreparable, message)
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Connection, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Other, message)
    }

    pub fn class(&self) -> ErrorClass {
        self.class
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_not_preparable(&self) -> bool {
        self.class == ErrorClass::NotPreparable
    }
}
