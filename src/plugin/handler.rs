//! Routes decoded JSON-RPC requests to a [`Database`].

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::database::Database;
use super::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, Method, JSONRPC_VERSION};
use super::types::TypeResponse;
use crate::lifecycle::OperationContext;
use crate::secrets::{Redactor, PASSWORD_PLACEHOLDER};

/// Params field carrying an optional per-call deadline in milliseconds
pub const DEADLINE_FIELD: &str = "deadline_ms";

pub struct PluginHandler<D> {
    database: Arc<D>,
}

impl<D> Clone for PluginHandler<D> {
    fn clone(&self) -> Self {
        Self { database: self.database.clone() }
    }
}

impl<D: Database> PluginHandler<D> {
    pub fn new(database: Arc<D>) -> Self {
        Self { database }
    }

    pub fn database(&self) -> &D {
        &self.database
    }

    /// Handle one request. `ctx` carries the request's cancellation token; a
    /// `deadline_ms` param adds a deadline to it.
    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        ctx: OperationContext,
    ) -> JsonRpcResponse {
        let id = request.id.clone();

        if request.jsonrpc != JSONRPC_VERSION {
            return JsonRpcResponse::failure(
                id,
                JsonRpcError::invalid_request(format!(
                    "unsupported jsonrpc version '{}'",
                    request.jsonrpc
                )),
            );
        }

        let method = match Method::from_path(&request.method) {
            Ok(method) => method,
            Err(e) => {
                warn!(method = %request.method, error = %e, "Unroutable request");
                return JsonRpcResponse::failure(id, e.into());
            }
        };

        let ctx = match request.params.get(DEADLINE_FIELD).and_then(Value::as_u64) {
            Some(ms) => ctx.with_timeout(Duration::from_millis(ms)),
            None => ctx,
        };

        debug!(method = %method, "Handling plugin request");
        match self.call(method, request.params, &ctx).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => {
                debug!(method = %method, code = error.code, "Plugin request failed");
                JsonRpcResponse::failure(id, error)
            }
        }
    }

    async fn call(
        &self,
        method: Method,
        params: Value,
        ctx: &OperationContext,
    ) -> Result<Value, JsonRpcError> {
        let db = &self.database;
        let result = match method {
            Method::Initialize => to_value(db.initialize(ctx, parse(params)?).await?),
            Method::NewUser => to_value(db.new_user(ctx, parse(params)?).await?),
            Method::UpdateUser => to_value(db.update_user(ctx, parse(params)?).await?),
            Method::DeleteUser => to_value(db.delete_user(ctx, parse(params)?).await?),
            Method::Type => to_value(TypeResponse { type_name: db.type_name() }),
            Method::Close => {
                db.close(ctx).await?;
                Ok(json!({}))
            }
        };
        result.map_err(JsonRpcError::from)
    }
}

fn parse<T: DeserializeOwned>(params: Value) -> Result<T, JsonRpcError> {
    // JSON-RPC allows omitted params
    let params = if params.is_null() { json!({}) } else { params };
    let redactor = password_values(&params, Redactor::new());
    serde_json::from_value(params).map_err(|e| {
        JsonRpcError::invalid_params(redactor.redact(&format!("invalid params: {}", e)))
    })
}

/// Collect every string under a `*password*` key; serde may echo them in errors.
fn password_values(value: &Value, redactor: Redactor) -> Redactor {
    match value {
        Value::Object(map) => map.iter().fold(redactor, |redactor, (key, value)| match value {
            Value::String(s) if key.contains("password") => redactor.with(s.as_str(), PASSWORD_PLACEHOLDER),
            other => password_values(other, redactor),
        }),
        Value::Array(items) => items.iter().fold(redactor, |redactor, item| password_values(item, redactor)),
        _ => redactor,
    }
}

fn to_value<T: serde::Serialize>(value: T) -> crate::errors::Result<Value> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::types::NewUserRequest;

    #[test]
    fn test_parse_accepts_missing_params() {
        let request: NewUserRequest = parse(Value::Null).unwrap();
        assert!(request.statements.commands.is_empty());
    }

    #[test]
    fn test_parse_error_hides_passwords() {
        let params = json!({
            "password": "hunter2",
            "statements": "hunter2",
        });
        let error = parse::<NewUserRequest>(params).unwrap_err();
        assert_eq!(error.kind(), Some("validation"));
        assert!(!error.message.contains("hunter2"), "{}", error.message);
    }
}
