//! # Connection Producer
//!
//! Owns the configuration and the single cached connection handle of a plugin
//! instance. The producer is not synchronized itself; the lifecycle engine keeps it
//! behind its instance lock.

use std::sync::Arc;
use tracing::{debug, info};

use super::backend::{Backend, BackendConnection};
use crate::config::{ConfigMap, ConnectionConfig};
use crate::errors::{PluginError, Result};

pub struct ConnectionProducer<B: Backend> {
    backend: Arc<B>,
    config: Option<ConnectionConfig>,
    connection: Option<Box<dyn BackendConnection>>,
}

impl<B: Backend> ConnectionProducer<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend, config: None, connection: None }
    }

    /// Configuration stored by the last successful parse, if any
    pub fn config(&self) -> Option<&ConnectionConfig> {
        self.config.as_ref()
    }

    /// Parse and store the configuration, dropping any cached handle.
    ///
    /// With `verify`, the backend is opened and pinged. The configuration is kept
    /// even when verification fails so the host can simply retry.
    pub async fn initialize(&mut self, config: &ConfigMap, verify: bool) -> Result<ConfigMap> {
        let parsed = ConnectionConfig::from_map(config)?;

        self.close().await;
        self.config = Some(parsed);
        info!(verify_connection = verify, "Connection configuration stored");

        if verify {
            let ping = self.connection().await?.ping().await;
            if let Err(e) = ping {
                self.close().await;
                return Err(PluginError::connection(format!("error verifying connection: {}", e)));
            }
        }

        Ok(config.clone())
    }

    /// The cached handle, opening a fresh one when none exists or it was closed.
    pub async fn connection(&mut self) -> Result<&dyn BackendConnection> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| PluginError::connection("connection producer not initialized"))?;

        if self.connection.as_ref().map_or(true, |c| c.is_closed()) {
            debug!(database_type = self.backend.type_name(), "Opening backend connection");
            let connection = self
                .backend
                .connect(config)
                .await
                .map_err(|e| PluginError::connection(format!("error opening connection: {}", e)))?;
            self.connection = Some(connection);
        }

        self.connection
            .as_deref()
            .ok_or_else(|| PluginError::internal("connection handle missing after open"))
    }

    /// Release the cached handle. Safe to call repeatedly.
    pub async fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close().await;
            debug!("Backend connection closed");
        }
    }
}
