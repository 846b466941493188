//! # Credential Lifecycle
//!
//! The transactional engine behind `NewUser`, `UpdateUser` and `DeleteUser`, and the
//! per-operation context that carries cancellation into it.

pub mod context;
pub mod engine;

pub use context::OperationContext;
pub use engine::LifecycleEngine;
