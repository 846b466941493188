//! # Lifecycle Engine
//!
//! Runs credential lifecycle operations as one transaction per operation, under one
//! instance-wide lock that also guards the connection producer.
//!
//! An operation moves through `Idle -> Locked -> TransactionOpen -> Committed |
//! RolledBack -> Idle`. The lock is held for the whole operation, so a
//! multi-statement script is never observed half-applied and two operations never
//! interleave their statements.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn, Instrument};

use crate::connection::{Backend, ConnectionProducer, TransactionScope};
use crate::credentials::{
    has_statements, render_all, Substitutions, UsernamePolicy, EXPIRATION, PASSWORD,
};
use crate::errors::{BackendError, ErrorClass, PluginError, Result};
use crate::lifecycle::OperationContext;
use crate::operation_span;
use crate::plugin::types::{
    DeleteUserRequest, DeleteUserResponse, InitializeRequest, InitializeResponse, NewUserRequest,
    NewUserResponse, UpdateUserRequest, UpdateUserResponse,
};
use crate::plugin::Database;
use crate::secrets::SecretValues;

/// Credential lifecycle engine for one backend mount.
pub struct LifecycleEngine<B: Backend> {
    backend: Arc<B>,
    producer: Mutex<ConnectionProducer<B>>,
    policy: UsernamePolicy,
    // refreshed on initialize; read by the sanitizer without taking the instance lock
    secrets: RwLock<HashMap<String, String>>,
}

impl<B: Backend> LifecycleEngine<B> {
    /// Engine for `backend`, generating usernames in the legacy or current length class.
    pub fn new(backend: B, legacy: bool) -> Self {
        let backend = Arc::new(backend);
        Self {
            producer: Mutex::new(ConnectionProducer::new(backend.clone())),
            backend,
            policy: UsernamePolicy::new(legacy),
            secrets: RwLock::new(HashMap::new()),
        }
    }

    /// Further cap generated usernames below the length class maximum.
    pub fn with_max_username_length(mut self, max_length: usize) -> Self {
        self.policy = self.policy.with_max_length(max_length);
        self
    }

    /// Execute rendered statements as a single transaction.
    async fn execute(&self, ctx: &OperationContext, statements: &[String]) -> Result<()> {
        let mut producer = ctx.run(self.producer.lock()).await?;

        let connection = ctx.run(producer.connection()).await??;
        let transaction = ctx
            .run(connection.begin())
            .await?
            .map_err(begin_error)?;
        let mut scope = TransactionScope::new(transaction);

        for (index, statement) in statements.iter().enumerate() {
            let error = match ctx.run(scope.execute(statement)).await {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => PluginError::execution(index, e.message()),
                Err(cancelled) => cancelled,
            };
            warn!(statement_index = index, error = %error, "Statement failed, rolling back");
            rollback(scope).await;
            return Err(error);
        }

        if let Err(cancelled) = ctx.check() {
            rollback(scope).await;
            return Err(cancelled);
        }

        let fallbacks = scope.fallbacks();
        scope
            .commit()
            .await
            .map_err(|e| PluginError::transaction(format!("unable to commit transaction: {}", e)))?;

        debug!(statements = statements.len(), fallbacks, "Transaction committed");
        Ok(())
    }

    async fn change_password(
        &self,
        ctx: &OperationContext,
        username: &str,
        password: &str,
        statements: &[String],
    ) -> Result<()> {
        if username.is_empty() || password.is_empty() {
            return Err(PluginError::validation("must provide both username and password"));
        }

        let substitutions = Substitutions::for_user(username).with(PASSWORD, password);
        let rendered = if has_statements(statements) {
            render_all(statements, &substitutions)
        } else {
            render_all(self.backend.default_rotation_statements(), &substitutions)
        };

        self.execute(ctx, &rendered).await
    }
}

/// Lazy drivers first touch the network on begin, so a lost connection
/// surfaces here and must stay a connection error.
fn begin_error(error: BackendError) -> PluginError {
    match error.class() {
        ErrorClass::Connection => {
            PluginError::connection(format!("unable to begin transaction: {}", error))
        }
        _ => PluginError::transaction(format!("unable to begin transaction: {}", error)),
    }
}

async fn rollback(scope: TransactionScope) {
    if let Err(e) = scope.rollback().await {
        warn!(error = %e, "Rollback failed");
    }
}

fn format_expiration(expiration: Option<&DateTime<Utc>>) -> String {
    expiration.map(|e| e.to_rfc3339_opts(SecondsFormat::Secs, true)).unwrap_or_default()
}

#[async_trait]
impl<B: Backend> Database for LifecycleEngine<B> {
    async fn initialize(
        &self,
        ctx: &OperationContext,
        request: InitializeRequest,
    ) -> Result<InitializeResponse> {
        let span = operation_span!("initialize", verify_connection = request.verify_connection);
        async {
            let mut producer = ctx.run(self.producer.lock()).await?;
            let result = producer.initialize(&request.config, request.verify_connection).await;

            if let Some(config) = producer.config() {
                *self.secrets.write().unwrap_or_else(|e| e.into_inner()) = config.secret_values();
            }

            let config = result?;
            info!(database_type = self.backend.type_name(), "Plugin initialized");
            Ok::<_, PluginError>(InitializeResponse { config })
        }
        .instrument(span)
        .await
    }

    async fn new_user(
        &self,
        ctx: &OperationContext,
        request: NewUserRequest,
    ) -> Result<NewUserResponse> {
        if !has_statements(&request.statements.commands) {
            return Err(PluginError::validation("empty creation statements"));
        }
        ctx.check()?;

        let metadata = &request.username_config;
        let username = self.policy.generate(&metadata.display_name, &metadata.role_name)?;

        let span = operation_span!("new_user", username = %username);
        async {
            let substitutions = Substitutions::for_user(&username)
                .with(PASSWORD, request.password.expose_secret())
                .with(EXPIRATION, format_expiration(request.expiration.as_ref()));
            let rendered = render_all(&request.statements.commands, &substitutions);

            self.execute(ctx, &rendered).await?;
            info!("User created");
            Ok::<_, PluginError>(NewUserResponse { username: username.clone() })
        }
        .instrument(span)
        .await
    }

    async fn update_user(
        &self,
        ctx: &OperationContext,
        request: UpdateUserRequest,
    ) -> Result<UpdateUserResponse> {
        if request.password.is_none() && request.expiration.is_none() {
            return Err(PluginError::validation("no change requested"));
        }

        let span = operation_span!("update_user", username = %request.username);
        async {
            if let Some(change) = &request.password {
                self.change_password(
                    ctx,
                    &request.username,
                    change.new_password.expose_secret(),
                    &change.statements.commands,
                )
                .await
                .map_err(|e| e.map_message(|m| format!("failed to change password: {}", m)))?;
                info!("Password changed");
            }

            if let Some(change) = &request.expiration {
                // expiration is tracked by the host; nothing is changed on the backend
                warn!(
                    new_expiration = %format_expiration(Some(&change.new_expiration)),
                    "Expiration change accepted without backend mutation"
                );
            }

            Ok::<_, PluginError>(UpdateUserResponse {})
        }
        .instrument(span)
        .await
    }

    async fn delete_user(
        &self,
        ctx: &OperationContext,
        request: DeleteUserRequest,
    ) -> Result<DeleteUserResponse> {
        if request.username.is_empty() {
            return Err(PluginError::validation("username cannot be empty"));
        }

        let span = operation_span!("delete_user", username = %request.username);
        async {
            let substitutions = Substitutions::for_user(&request.username);
            let rendered = if has_statements(&request.statements.commands) {
                render_all(&request.statements.commands, &substitutions)
            } else {
                render_all(self.backend.default_revocation_statements(), &substitutions)
            };

            self.execute(ctx, &rendered).await?;
            info!("User deleted");
            Ok::<_, PluginError>(DeleteUserResponse {})
        }
        .instrument(span)
        .await
    }

    fn type_name(&self) -> String {
        self.backend.type_name().to_string()
    }

    async fn close(&self, ctx: &OperationContext) -> Result<()> {
        let mut producer = ctx.run(self.producer.lock()).await?;
        producer.close().await;
        debug!("Plugin closed");
        Ok(())
    }
}

impl<B: Backend> SecretValues for LifecycleEngine<B> {
    fn secret_values(&self) -> HashMap<String, String> {
        self.secrets.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
