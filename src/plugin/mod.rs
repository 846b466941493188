//! # Plugin Service Adapter
//!
//! The six-operation [`Database`] contract, the [`ErrorSanitizer`] decorator applied
//! before anything crosses the plugin boundary, and the JSON-RPC stdio transport
//! that carries calls from the host.

pub mod cancellation;
pub mod database;
pub mod handler;
pub mod middleware;
pub mod protocol;
pub mod server;
pub mod types;

pub use cancellation::CancellationRegistry;
pub use database::Database;
pub use handler::PluginHandler;
pub use middleware::ErrorSanitizer;
pub use protocol::{JsonRpcError, JsonRpcId, JsonRpcRequest, JsonRpcResponse, Method, SERVICE_NAME};
pub use server::PluginServer;
pub use types::*;
