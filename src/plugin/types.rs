//! Request and response messages of the six-operation plugin contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ConfigMap;
use crate::secrets::SecretString;

/// An ordered statement set; each command may hold several `;`-separated statements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statements {
    #[serde(default)]
    pub commands: Vec<String>,
}

impl Statements {
    pub fn new<S: Into<String>>(commands: impl IntoIterator<Item = S>) -> Self {
        Self { commands: commands.into_iter().map(Into::into).collect() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitializeRequest {
    #[serde(default)]
    pub config: ConfigMap,
    #[serde(default)]
    pub verify_connection: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InitializeResponse {
    pub config: ConfigMap,
}

/// Inputs for username generation
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UsernameMetadata {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub role_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUserRequest {
    #[serde(default)]
    pub username_config: UsernameMetadata,
    #[serde(default)]
    pub statements: Statements,
    #[serde(default)]
    pub password: SecretString,
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewUserResponse {
    pub username: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangePassword {
    pub new_password: SecretString,
    #[serde(default)]
    pub statements: Statements,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeExpiration {
    pub new_expiration: DateTime<Utc>,
    #[serde(default)]
    pub statements: Statements,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: Option<ChangePassword>,
    #[serde(default)]
    pub expiration: Option<ChangeExpiration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateUserResponse {}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub statements: Statements,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteUserResponse {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeResponse {
    #[serde(rename = "type")]
    pub type_name: String,
}
