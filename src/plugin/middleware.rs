//! # Error Sanitizer
//!
//! Wraps any [`Database`] so that no error leaves the plugin carrying a secret. The
//! redaction set is the provider's configured secrets plus the passwords of the
//! request being served. Only message text is rewritten; the error class survives.

use async_trait::async_trait;
use std::sync::Arc;

use super::database::Database;
use super::types::{
    DeleteUserRequest, DeleteUserResponse, InitializeRequest, InitializeResponse, NewUserRequest,
    NewUserResponse, UpdateUserRequest, UpdateUserResponse,
};
use crate::errors::{PluginError, Result};
use crate::lifecycle::OperationContext;
use crate::secrets::{Redactor, SecretValues, PASSWORD_PLACEHOLDER};

/// Error-sanitizing decorator around a [`Database`].
pub struct ErrorSanitizer<D> {
    inner: Arc<D>,
    secrets: Arc<dyn SecretValues>,
}

impl<D> ErrorSanitizer<D>
where
    D: Database + SecretValues + 'static,
{
    /// Wrap a database that reports its own secret values.
    pub fn wrap(database: D) -> Self {
        let inner = Arc::new(database);
        Self { secrets: inner.clone(), inner }
    }
}

impl<D: Database> ErrorSanitizer<D> {
    fn sanitize(&self, error: PluginError, request_secrets: &[&str]) -> PluginError {
        let redactor = request_secrets.iter().fold(
            Redactor::from_values(self.secrets.secret_values()),
            |redactor, secret| redactor.with(*secret, PASSWORD_PLACEHOLDER),
        );

        if redactor.is_empty() {
            return error;
        }
        error.map_message(|message| redactor.redact(message))
    }
}

#[async_trait]
impl<D: Database> Database for ErrorSanitizer<D> {
    async fn initialize(
        &self,
        ctx: &OperationContext,
        request: InitializeRequest,
    ) -> Result<InitializeResponse> {
        // the configured password may not be known to the provider yet if parsing failed
        let password = request
            .config
            .get("password")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_default();

        self.inner.initialize(ctx, request).await.map_err(|e| self.sanitize(e, &[password.as_str()]))
    }

    async fn new_user(
        &self,
        ctx: &OperationContext,
        request: NewUserRequest,
    ) -> Result<NewUserResponse> {
        let password = request.password.clone();
        self.inner
            .new_user(ctx, request)
            .await
            .map_err(|e| self.sanitize(e, &[password.expose_secret()]))
    }

    async fn update_user(
        &self,
        ctx: &OperationContext,
        request: UpdateUserRequest,
    ) -> Result<UpdateUserResponse> {
        let password = request.password.as_ref().map(|p| p.new_password.clone()).unwrap_or_default();
        self.inner
            .update_user(ctx, request)
            .await
            .map_err(|e| self.sanitize(e, &[password.expose_secret()]))
    }

    async fn delete_user(
        &self,
        ctx: &OperationContext,
        request: DeleteUserRequest,
    ) -> Result<DeleteUserResponse> {
        self.inner.delete_user(ctx, request).await.map_err(|e| self.sanitize(e, &[]))
    }

    fn type_name(&self) -> String {
        self.inner.type_name()
    }

    async fn close(&self, ctx: &OperationContext) -> Result<()> {
        self.inner.close(ctx).await.map_err(|e| self.sanitize(e, &[]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Failing;

    #[async_trait]
    impl Database for Failing {
        async fn initialize(
            &self,
            _ctx: &OperationContext,
            _request: InitializeRequest,
        ) -> Result<InitializeResponse> {
            Err(PluginError::connection("access denied using password s3cret"))
        }

        async fn new_user(
            &self,
            _ctx: &OperationContext,
            _request: NewUserRequest,
        ) -> Result<NewUserResponse> {
            Err(PluginError::execution(1, "syntax error near 'hunter2' (s3cret)"))
        }

        fn type_name(&self) -> String {
            "failing".to_string()
        }

        async fn close(&self, _ctx: &OperationContext) -> Result<()> {
            Ok(())
        }
    }

    impl SecretValues for Failing {
        fn secret_values(&self) -> HashMap<String, String> {
            HashMap::from([("s3cret".to_string(), PASSWORD_PLACEHOLDER.to_string())])
        }
    }

    #[tokio::test]
    async fn test_redacts_configured_and_request_secrets() {
        let db = ErrorSanitizer::wrap(Failing);
        let request = NewUserRequest { password: "hunter2".into(), ..Default::default() };

        let error = db.new_user(&OperationContext::new(), request).await.unwrap_err();
        assert_eq!(error, PluginError::execution(1, "syntax error near '[password]' ([password])"));
    }

    #[tokio::test]
    async fn test_preserves_class_and_defaults() {
        let db = ErrorSanitizer::wrap(Failing);
        let ctx = OperationContext::new();

        let error = db.initialize(&ctx, InitializeRequest::default()).await.unwrap_err();
        assert_eq!(error, PluginError::connection("access denied using password [password]"));

        let error = db.delete_user(&ctx, DeleteUserRequest::default()).await.unwrap_err();
        assert_eq!(error, PluginError::not_implemented("DeleteUser"));
        assert_eq!(db.type_name(), "failing");
    }
}
