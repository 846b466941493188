//! # Connection Management
//!
//! The backend driver seam, the connection producer that owns the cached handle,
//! and the transaction scope the lifecycle engine runs statements in.

pub mod backend;
pub mod producer;
pub mod transaction;

pub use backend::{Backend, BackendConnection, BackendTransaction};
pub use producer::ConnectionProducer;
pub use transaction::TransactionScope;
