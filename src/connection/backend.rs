//! # Backend Driver Seam
//!
//! A backend is one database technology. It knows how to open a connection from a
//! [`ConnectionConfig`], what its default statements are, and how to translate
//! driver errors into a classified [`BackendError`]. Nothing outside the backend
//! implementation sees driver types.

use async_trait::async_trait;

use crate::config::ConnectionConfig;
use crate::errors::BackendError;

/// A database technology the plugin can manage credentials for.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Type name reported to the host
    fn type_name(&self) -> &'static str;

    /// Statements used by `UpdateUser` when the host supplies none
    fn default_rotation_statements(&self) -> &'static [&'static str];

    /// Statements used by `DeleteUser` when the host supplies none
    fn default_revocation_statements(&self) -> &'static [&'static str];

    /// Open a connection handle. No I/O is required until first use.
    async fn connect(
        &self,
        config: &ConnectionConfig,
    ) -> Result<Box<dyn BackendConnection>, BackendError>;
}

/// A live connection handle (typically a driver pool).
#[async_trait]
pub trait BackendConnection: Send + Sync {
    async fn ping(&self) -> Result<(), BackendError>;

    async fn begin(&self) -> Result<Box<dyn BackendTransaction>, BackendError>;

    /// Release the handle. Repeated calls are harmless.
    async fn close(&self);

    fn is_closed(&self) -> bool;
}

/// An open transaction.
///
/// Dropping an unresolved transaction must roll it back.
#[async_trait]
pub trait BackendTransaction: Send {
    /// Execute through the prepared-statement protocol.
    async fn prepare_and_execute(&mut self, statement: &str) -> Result<(), BackendError>;

    /// Execute as plain text, bypassing statement preparation.
    async fn execute_unprepared(&mut self, statement: &str) -> Result<(), BackendError>;

    async fn commit(self: Box<Self>) -> Result<(), BackendError>;

    async fn rollback(self: Box<Self>) -> Result<(), BackendError>;
}
