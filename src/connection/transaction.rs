//! Scoped transaction with guaranteed rollback.

use tracing::{debug, warn};

use super::backend::BackendTransaction;
use crate::errors::BackendError;

/// Owns an open transaction until it is committed or rolled back.
///
/// Statements go through [`execute`](Self::execute), which retries a statement the
/// backend reports as not preparable exactly once through direct execution. If the
/// scope is dropped while still holding the transaction, the backend transaction is
/// dropped with it, which rolls it back.
pub struct TransactionScope {
    transaction: Option<Box<dyn BackendTransaction>>,
    fallbacks: usize,
}

impl TransactionScope {
    pub fn new(transaction: Box<dyn BackendTransaction>) -> Self {
        Self { transaction: Some(transaction), fallbacks: 0 }
    }

    /// Number of statements that needed the direct-execution fallback
    pub fn fallbacks(&self) -> usize {
        self.fallbacks
    }

    pub async fn execute(&mut self, statement: &str) -> Result<(), BackendError> {
        let transaction = self
            .transaction
            .as_mut()
            .ok_or_else(|| BackendError::other("transaction already resolved"))?;

        match transaction.prepare_and_execute(statement).await {
            Err(e) if e.is_not_preparable() => {
                debug!(error = %e, "Statement not preparable, executing directly");
                self.fallbacks += 1;
                transaction.execute_unprepared(statement).await
            }
            result => result,
        }
    }

    pub async fn commit(mut self) -> Result<(), BackendError> {
        match self.transaction.take() {
            Some(transaction) => transaction.commit().await,
            None => Err(BackendError::other("transaction already resolved")),
        }
    }

    pub async fn rollback(mut self) -> Result<(), BackendError> {
        match self.transaction.take() {
            Some(transaction) => transaction.rollback().await,
            None => Ok(()),
        }
    }
}

impl Drop for TransactionScope {
    fn drop(&mut self) {
        if self.transaction.take().is_some() {
            warn!("Transaction scope dropped before commit, rolling back");
        }
    }
}
