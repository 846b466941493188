//! Per-operation cancellation and deadline.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::{PluginError, Result};

/// Cancellation signal and optional deadline carried by every plugin operation.
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl OperationContext {
    /// A context that never fires on its own
    pub fn new() -> Self {
        Self::default()
    }

    /// A context driven by an existing token (e.g. one registered by the transport)
    pub fn with_token(token: CancellationToken) -> Self {
        Self { token, deadline: None }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The cancellation error if the context has already fired
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(PluginError::cancelled("operation cancelled by caller"));
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(PluginError::cancelled("operation deadline exceeded"));
        }
        Ok(())
    }

    /// Resolves once the context fires, yielding the matching cancellation error.
    pub async fn done(&self) -> PluginError {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => PluginError::cancelled("operation cancelled by caller"),
            _ = deadline => PluginError::cancelled("operation deadline exceeded"),
        }
    }

    /// Drive `future` unless the context fires first, in which case `future` is
    /// dropped and a cancellation error returned.
    pub async fn run<F>(&self, future: F) -> Result<F::Output>
    where
        F: Future,
    {
        self.check()?;
        tokio::select! {
            biased;
            error = self.done() => Err(error),
            output = future => Ok(output),
        }
    }
}
