//! # Error Types
//!
//! The error taxonomy reported across the plugin boundary, built with `thiserror`.
//! Every variant carries plain message text so the boundary sanitizer can redact
//! secret values without losing the error class.

/// Custom result type for plugin operations
pub type Result<T> = std::result::Result<T, PluginError>;

/// Main error type for lifecycle operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PluginError {
    /// Malformed or missing input. Never retried.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Backend unreachable or plugin not initialized.
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// A statement failed; the transaction was rolled back.
    #[error("Execution error at statement {index}: {message}")]
    Execution { index: usize, message: String },

    /// Begin, commit or rollback itself failed.
    #[error("Transaction error: {message}")]
    Transaction { message: String },

    /// The username policy could not produce a compliant identifier.
    #[error("Username generation error: {message}")]
    Generation { message: String },

    /// The caller cancelled the operation or its deadline passed.
    #[error("Operation cancelled: {reason}")]
    Cancelled { reason: String },

    /// The operation is not served by this plugin.
    #[error("Not implemented: {operation}")]
    NotImplemented { operation: String },

    /// Internal faults (serialization, poisoned state)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PluginError {
    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Create a connection error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::Connection { message: message.into() }
    }

    /// Create an execution error for the statement at `index`
    pub fn execution<S: Into<String>>(index: usize, message: S) -> Self {
        Self::Execution { index, message: message.into() }
    }

    /// Create a transaction error
    pub fn transaction<S: Into<String>>(message: S) -> Self {
        Self::Transaction { message: message.into() }
    }

    /// Create a username generation error
    pub fn generation<S: Into<String>>(message: S) -> Self {
        Self::Generation { message: message.into() }
    }

    /// Create a cancellation error
    pub fn cancelled<S: Into<String>>(reason: S) -> Self {
        Self::Cancelled { reason: reason.into() }
    }

    /// Create a not-implemented error for the named operation
    pub fn not_implemented<S: Into<String>>(operation: S) -> Self {
        Self::NotImplemented { operation: operation.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Stable snake_case name of the error class, used on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            PluginError::Validation { .. } => "validation",
            PluginError::Connection { .. } => "connection",
            PluginError::Execution { .. } => "execution",
            PluginError::Transaction { .. } => "transaction",
            PluginError::Generation { .. } => "generation",
            PluginError::Cancelled { .. } => "cancelled",
            PluginError::NotImplemented { .. } => "not_implemented",
            PluginError::Internal { .. } => "internal",
        }
    }

    /// Check if the host should retry this error after backoff
    pub fn is_retryable(&self) -> bool {
        matches!(self, PluginError::Connection { .. } | PluginError::Transaction { .. })
    }

    /// Index of the failing statement, for execution errors
    pub fn statement_index(&self) -> Option<usize> {
        match self {
            PluginError::Execution { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Rewrite the message text of this error, keeping its class.
    pub fn map_message<F>(self, f: F) -> Self
    where
        F: Fn(&str) -> String,
    {
        match self {
            PluginError::Validation { message } => PluginError::Validation { message: f(&message) },
            PluginError::Connection { message } => PluginError::Connection { message: f(&message) },
            PluginError::Execution { index, message } => {
                PluginError::Execution { index, message: f(&message) }
            }
            PluginError::Transaction { message } => {
                PluginError::Transaction { message: f(&message) }
            }
            PluginError::Generation { message } => PluginError::Generation { message: f(&message) },
            PluginError::Cancelled { reason } => PluginError::Cancelled { reason: f(&reason) },
            PluginError::NotImplemented { operation } => {
                PluginError::NotImplemented { operation: f(&operation) }
            }
            PluginError::Internal { message } => PluginError::Internal { message: f(&message) },
        }
    }
}

impl From<serde_json::Error> for PluginError {
    fn from(error: serde_json::Error) -> Self {
        Self::internal(format!("JSON serialization failed: {}", error))
    }
}

impl From<validator::ValidationErrors> for PluginError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| e.message.as_ref().map_or("invalid value".to_string(), |m| m.to_string()))
                    .collect();
                format!("{}: {}", field, messages.join(", "))
            })
            .collect();
        fields.sort();

        Self::validation(format!("invalid configuration: {}", fields.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = PluginError::validation("no change requested");
        assert!(matches!(error, PluginError::Validation { .. }));
        assert_eq!(error.to_string(), "Validation error: no change requested");
    }

    #[test]
    fn test_execution_error_carries_index() {
        let error = PluginError::execution(2, "syntax error");
        assert_eq!(error.statement_index(), Some(2));
        assert_eq!(error.to_string(), "Execution error at statement 2: syntax error");
        assert_eq!(PluginError::connection("down").statement_index(), None);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(PluginError::validation("x").kind(), "validation");
        assert_eq!(PluginError::connection("x").kind(), "connection");
        assert_eq!(PluginError::execution(0, "x").kind(), "execution");
        assert_eq!(PluginError::transaction("x").kind(), "transaction");
        assert_eq!(PluginError::generation("x").kind(), "generation");
        assert_eq!(PluginError::cancelled("x").kind(), "cancelled");
        assert_eq!(PluginError::not_implemented("x").kind(), "not_implemented");
        assert_eq!(PluginError::internal("x").kind(), "internal");
    }

    #[test]
    fn test_retryable_errors() {
        assert!(PluginError::connection("refused").is_retryable());
        assert!(PluginError::transaction("commit failed").is_retryable());
        assert!(!PluginError::validation("bad").is_retryable());
        assert!(!PluginError::execution(0, "bad").is_retryable());
        assert!(!PluginError::generation("too long").is_retryable());
    }

    #[test]
    fn test_map_message_keeps_variant() {
        let error = PluginError::execution(1, "password hunter2 rejected")
            .map_message(|m| m.replace("hunter2", "[password]"));
        assert_eq!(error, PluginError::execution(1, "password [password] rejected"));
    }

    #[test]
    fn test_error_conversions() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error: PluginError = json_error.into();
        assert!(matches!(error, PluginError::Internal { .. }));
    }
}
