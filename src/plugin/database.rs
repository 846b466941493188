//! The six-operation plugin contract.

use async_trait::async_trait;

use super::types::{
    DeleteUserRequest, DeleteUserResponse, InitializeRequest, InitializeResponse, NewUserRequest,
    NewUserResponse, UpdateUserRequest, UpdateUserResponse,
};
use crate::errors::{PluginError, Result};
use crate::lifecycle::OperationContext;

/// A database secrets plugin.
///
/// `initialize`, `type_name` and `close` are required. The credential operations
/// default to [`PluginError::NotImplemented`] so a backend that does not serve one
/// says so explicitly instead of succeeding silently.
#[async_trait]
pub trait Database: Send + Sync {
    async fn initialize(
        &self,
        ctx: &OperationContext,
        request: InitializeRequest,
    ) -> Result<InitializeResponse>;

    async fn new_user(
        &self,
        _ctx: &OperationContext,
        _request: NewUserRequest,
    ) -> Result<NewUserResponse> {
        Err(PluginError::not_implemented("NewUser"))
    }

    async fn update_user(
        &self,
        _ctx: &OperationContext,
        _request: UpdateUserRequest,
    ) -> Result<UpdateUserResponse> {
        Err(PluginError::not_implemented("UpdateUser"))
    }

    async fn delete_user(
        &self,
        _ctx: &OperationContext,
        _request: DeleteUserRequest,
    ) -> Result<DeleteUserResponse> {
        Err(PluginError::not_implemented("DeleteUser"))
    }

    /// Backend type name. Never locks, never fails.
    fn type_name(&self) -> String;

    async fn close(&self, ctx: &OperationContext) -> Result<()>;
}
