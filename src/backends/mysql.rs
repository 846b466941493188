//! # MySQL Backend
//!
//! MySQL and MariaDB through an `sqlx` pool. The connection handle is a lazily
//! connecting pool; statements run inside one pooled transaction.
//!
//! MySQL rejects some administrative statements under the prepared-statement
//! protocol with error 1295 (`ER_UNSUPPORTED_PS`). [`translate_error`] tags exactly
//! that error as not preparable so the lifecycle engine retries it as plain text.

use async_trait::async_trait;
use sqlx::mysql::{MySql, MySqlConnectOptions, MySqlDatabaseError, MySqlPool, MySqlPoolOptions, MySqlSslMode};
use sqlx::{Connection, Transaction};
use std::str::FromStr;
use tracing::{debug, info};

use crate::config::{ConnectionConfig, INVALID_URL_MESSAGE, PluginSettings};
use crate::connection::{Backend, BackendConnection, BackendTransaction};
use crate::errors::{BackendError, ErrorClass};
use crate::lifecycle::LifecycleEngine;
use crate::plugin::ErrorSanitizer;

/// Type name reported to the host
pub const MYSQL_TYPE_NAME: &str = "mysql";

/// This command is not supported in the prepared statement protocol yet
pub const ER_UNSUPPORTED_PS: u16 = 1295;

const DEFAULT_REVOCATION_STATEMENTS: &[&str] =
    &["REVOKE ALL PRIVILEGES, GRANT OPTION FROM '{{name}}'@'%'; DROP USER '{{name}}'@'%'"];

const DEFAULT_ROTATION_STATEMENTS: &[&str] =
    &["ALTER USER '{{username}}'@'%' IDENTIFIED BY '{{password}}';"];

/// The sanitized MySQL plugin served by the binary
pub type MySqlPlugin = ErrorSanitizer<LifecycleEngine<MySqlBackend>>;

/// MySQL backend driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlBackend;

impl MySqlBackend {
    /// Build the full plugin: lifecycle engine wrapped in the error sanitizer.
    pub fn plugin(legacy: bool) -> MySqlPlugin {
        ErrorSanitizer::wrap(LifecycleEngine::new(MySqlBackend, legacy))
    }

    /// Build the plugin configured by process settings.
    pub fn plugin_from_settings(settings: &PluginSettings) -> MySqlPlugin {
        ErrorSanitizer::wrap(
            LifecycleEngine::new(MySqlBackend, settings.legacy)
                .with_max_username_length(settings.username_max_length),
        )
    }
}

#[async_trait]
impl Backend for MySqlBackend {
    fn type_name(&self) -> &'static str {
        MYSQL_TYPE_NAME
    }

    fn default_rotation_statements(&self) -> &'static [&'static str] {
        DEFAULT_ROTATION_STATEMENTS
    }

    fn default_revocation_statements(&self) -> &'static [&'static str] {
        DEFAULT_REVOCATION_STATEMENTS
    }

    async fn connect(
        &self,
        config: &ConnectionConfig,
    ) -> Result<Box<dyn BackendConnection>, BackendError> {
        let options = connect_options(config)?;

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_open_connections)
            .acquire_timeout(config.connect_timeout)
            .max_lifetime(config.max_lifetime())
            .connect_lazy_with(options);

        info!(
            url = %sanitize_url(&config.connection_url()),
            max_connections = config.max_open_connections,
            tls = config.tls_enabled(),
            "MySQL connection pool created"
        );

        Ok(Box::new(MySqlHandle { pool }))
    }
}

fn connect_options(config: &ConnectionConfig) -> Result<MySqlConnectOptions, BackendError> {
    let mut options = MySqlConnectOptions::from_str(&config.connection_url())
        .map_err(|_| BackendError::other(INVALID_URL_MESSAGE))?;

    if config.tls_enabled() {
        let mode =
            if config.tls_skip_verify { MySqlSslMode::Required } else { MySqlSslMode::VerifyIdentity };
        options = options.ssl_mode(mode);

        if let Some(ca) = &config.tls_ca {
            options = options.ssl_ca_from_pem(ca.as_bytes().to_vec());
        }
        if let Some(pem) = &config.tls_certificate_key {
            let pem = pem.expose_secret().as_bytes();
            options = options.ssl_client_cert_from_pem(pem).ssl_client_key_from_pem(pem);
        }
    }

    Ok(options)
}

/// Sanitize connection URL for logging (remove credentials)
fn sanitize_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) if parsed.password().is_some() || !parsed.username().is_empty() => format!(
            "{}://***:***@{}{}",
            parsed.scheme(),
            parsed.host_str().unwrap_or("unknown"),
            parsed.path()
        ),
        Ok(_) => url.to_string(),
        Err(_) => INVALID_URL_MESSAGE.to_string(),
    }
}

/// Classify a driver error. The only place MySQL error numbers are inspected.
pub fn translate_error(error: sqlx::Error) -> BackendError {
    let class = match &error {
        sqlx::Error::Database(db) => match db.try_downcast_ref::<MySqlDatabaseError>() {
            Some(mysql) if mysql.number() == ER_UNSUPPORTED_PS => ErrorClass::NotPreparable,
            _ => ErrorClass::Other,
        },
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => ErrorClass::Connection,
        _ => ErrorClass::Other,
    };
    BackendError::new(class, error.to_string())
}

struct MySqlHandle {
    pool: MySqlPool,
}

#[async_trait]
impl BackendConnection for MySqlHandle {
    async fn ping(&self) -> Result<(), BackendError> {
        let mut connection = self.pool.acquire().await.map_err(translate_error)?;
        connection.ping().await.map_err(translate_error)
    }

    async fn begin(&self) -> Result<Box<dyn BackendTransaction>, BackendError> {
        let transaction = self.pool.begin().await.map_err(translate_error)?;
        Ok(Box::new(MySqlTransaction { transaction }))
    }

    async fn close(&self) {
        self.pool.close().await;
        debug!("MySQL connection pool closed");
    }

    fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

struct MySqlTransaction {
    transaction: Transaction<'static, MySql>,
}

#[async_trait]
impl BackendTransaction for MySqlTransaction {
    async fn prepare_and_execute(&mut self, statement: &str) -> Result<(), BackendError> {
        sqlx::query(statement)
            .persistent(false)
            .execute(&mut *self.transaction)
            .await
            .map(|_| ())
            .map_err(translate_error)
    }

    async fn execute_unprepared(&mut self, statement: &str) -> Result<(), BackendError> {
        // a bare &str has no arguments, so sqlx sends it over the text protocol
        sqlx::Executor::execute(&mut *self.transaction, statement)
            .await
            .map(|_| ())
            .map_err(translate_error)
    }

    async fn commit(self: Box<Self>) -> Result<(), BackendError> {
        self.transaction.commit().await.map_err(translate_error)
    }

    async fn rollback(self: Box<Self>) -> Result<(), BackendError> {
        self.transaction.rollback().await.map_err(translate_error)
    }
}
