//! Cancellation tokens for in-flight plugin requests, keyed by request ID.
//!
//! Uses `tokio_util::sync::CancellationToken`; the token handed out by
//! [`CancellationRegistry::register`] becomes the request's `OperationContext`.

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::protocol::JsonRpcId;

/// Tracks one cancellation token per in-flight request.
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    tokens: DashMap<JsonRpcId, CancellationToken>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request and return the token that fires when it is cancelled.
    pub fn register(&self, request_id: JsonRpcId) -> CancellationToken {
        let token = CancellationToken::new();
        self.tokens.insert(request_id.clone(), token.clone());
        debug!(request_id = %request_id, "Registered cancellable request");
        token
    }

    /// Returns `true` if the request was in flight.
    pub fn cancel(&self, request_id: &JsonRpcId) -> bool {
        match self.tokens.get(request_id) {
            Some(token) => {
                token.cancel();
                debug!(request_id = %request_id, "Cancelled request");
                true
            }
            None => {
                debug!(request_id = %request_id, "Request not found for cancellation");
                false
            }
        }
    }

    /// Forget a finished request
    pub fn complete(&self, request_id: &JsonRpcId) {
        self.tokens.remove(request_id);
    }
}
