//! # Credentials
//!
//! Everything that shapes a credential before it reaches the backend: the
//! username policy and the statement templates the password and username are
//! rendered into.

pub mod template;
pub mod username;

pub use template::{
    has_statements, render, render_all, split_statements, SplitStatements, Substitutions,
    EXPIRATION, NAME, PASSWORD, USERNAME,
};
pub use username::{generate_username, UsernamePolicy};
