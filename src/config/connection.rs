//! # Connection Configuration
//!
//! The host hands the plugin an opaque JSON object on `Initialize`. This module
//! turns it into a typed [`ConnectionConfig`], rejecting unknown keys so that a
//! mistyped option surfaces as a validation error instead of being ignored.

use serde::{de, Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use validator::Validate;

use crate::credentials::{render, Substitutions, PASSWORD, USERNAME};
use crate::errors::{PluginError, Result};
use crate::secrets::{Redactor, SecretString, PASSWORD_PLACEHOLDER};

/// Configuration map exchanged with the host
pub type ConfigMap = serde_json::Map<String, Value>;

const DEFAULT_MAX_OPEN_CONNECTIONS: u32 = 4;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Message used for every connection URL parse failure; the URL itself may hold credentials.
pub const INVALID_URL_MESSAGE: &str = "unable to parse connection url";

/// Connection settings for one backend mount.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Backend URL. May contain `{{username}}` and `{{password}}` placeholders.
    #[validate(length(min = 1, message = "connection_url cannot be empty"))]
    pub connection_url: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<SecretString>,

    /// Upper bound on connections held by the driver pool
    #[serde(default = "default_max_open_connections", deserialize_with = "deserialize_u32")]
    #[validate(range(
        min = 1,
        max = 1000,
        message = "max_open_connections must be between 1 and 1000"
    ))]
    pub max_open_connections: u32,

    /// Maximum lifetime of a pooled connection (zero = unlimited)
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub max_connection_lifetime: Duration,

    #[serde(default = "default_connect_timeout", deserialize_with = "deserialize_duration")]
    pub connect_timeout: Duration,

    /// PEM-encoded CA bundle used to verify the server
    #[serde(default)]
    pub tls_ca: Option<String>,

    /// PEM-encoded client certificate and private key
    #[serde(default)]
    pub tls_certificate_key: Option<SecretString>,

    #[serde(default)]
    pub tls_skip_verify: bool,
}

fn default_max_open_connections() -> u32 {
    DEFAULT_MAX_OPEN_CONNECTIONS
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

impl ConnectionConfig {
    /// Parse and validate the host's configuration map.
    pub fn from_map(map: &ConfigMap) -> Result<Self> {
        let config: Self = serde_json::from_value(Value::Object(map.clone())).map_err(|e| {
            // a mistyped password would otherwise be echoed by serde
            let redactor = map
                .get("password")
                .and_then(Value::as_str)
                .map(|password| Redactor::new().with(password, PASSWORD_PLACEHOLDER))
                .unwrap_or_default();
            PluginError::validation(redactor.redact(&format!("invalid configuration: {}", e)))
        })?;

        config.validate()?;
        url::Url::parse(&config.connection_url())
            .map_err(|_| PluginError::validation(INVALID_URL_MESSAGE))?;

        Ok(config)
    }

    /// The connection URL with credential placeholders filled in (percent-encoded).
    pub fn connection_url(&self) -> String {
        let mut substitutions = Substitutions::new();
        if let Some(username) = &self.username {
            substitutions.insert(USERNAME, encode_userinfo(username));
        }
        if let Some(password) = &self.password {
            substitutions.insert(PASSWORD, encode_userinfo(password.expose_secret()));
        }
        render(&self.connection_url, &substitutions)
    }

    pub fn tls_enabled(&self) -> bool {
        self.tls_ca.is_some() || self.tls_certificate_key.is_some() || self.tls_skip_verify
    }

    /// Lifetime cap for pooled connections, if any
    pub fn max_lifetime(&self) -> Option<Duration> {
        (!self.max_connection_lifetime.is_zero()).then_some(self.max_connection_lifetime)
    }

    /// Secret values that must never appear in errors, mapped to their placeholder.
    pub fn secret_values(&self) -> HashMap<String, String> {
        let mut values = HashMap::new();
        if let Some(password) = self.password.as_ref().filter(|p| !p.is_empty()) {
            let raw = password.expose_secret();
            values.insert(raw.to_string(), PASSWORD_PLACEHOLDER.to_string());
            values.insert(encode_userinfo(raw), PASSWORD_PLACEHOLDER.to_string());
        }
        values
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn encode_userinfo(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

fn deserialize_u32<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => n,
        NumberOrString::String(s) => s.trim().parse().map_err(de::Error::custom)?,
    };
    u32::try_from(value).map_err(de::Error::custom)
}

fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(secs) => Ok(Duration::from_secs(secs)),
        NumberOrString::String(s) => parse_duration(&s).map_err(de::Error::custom),
    }
}

/// Parse durations such as `"90"`, `"30s"`, `"1h30m"` or `"250ms"`.
/// A bare number is seconds; an empty string is zero.
pub fn parse_duration(input: &str) -> std::result::Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Duration::ZERO);
    }
    if let Ok(secs) = input.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = input;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return Err(format!("invalid duration '{}'", input));
        }
        let amount: u64 =
            rest[..digits].parse().map_err(|_| format!("invalid duration '{}'", input))?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let unit = match &rest[..unit_len] {
            "ms" => Some(Duration::from_millis(amount)),
            "s" => Some(Duration::from_secs(amount)),
            "m" => amount.checked_mul(60).map(Duration::from_secs),
            "h" => amount.checked_mul(3600).map(Duration::from_secs),
            other => return Err(format!("unknown duration unit '{}' in '{}'", other, input)),
        };
        total = unit
            .and_then(|unit| total.checked_add(unit))
            .ok_or_else(|| format!("invalid duration '{}': out of range", input))?;
        rest = &rest[unit_len..];
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> ConfigMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_defaults() {
        let config =
            ConnectionConfig::from_map(&map(json!({"connection_url": "mysql://localhost:3306"})))
                .unwrap();
        assert_eq!(config.max_open_connections, 4);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.max_lifetime(), None);
        assert!(!config.tls_enabled());
        assert!(config.secret_values().is_empty());
    }

    #[test]
    fn test_lenient_numbers_and_durations() {
        let config = ConnectionConfig::from_map(&map(json!({
            "connection_url": "mysql://localhost",
            "max_open_connections": "8",
            "max_connection_lifetime": "1h30m",
            "connect_timeout": 5,
        })))
        .unwrap();
        assert_eq!(config.max_open_connections, 8);
        assert_eq!(config.max_lifetime(), Some(Duration::from_secs(5400)));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let error = ConnectionConfig::from_map(&map(json!({
            "connection_url": "mysql://localhost",
            "max_open_connection": 2,
        })))
        .unwrap_err();
        assert!(matches!(error, PluginError::Validation { .. }));
        assert!(error.to_string().contains("max_open_connection"));
    }

    #[test]
    fn test_rejects_empty_url_and_zero_pool() {
        let error =
            ConnectionConfig::from_map(&map(json!({"connection_url": ""}))).unwrap_err();
        assert!(error.to_string().contains("connection_url cannot be empty"));

        let error = ConnectionConfig::from_map(&map(json!({
            "connection_url": "mysql://localhost",
            "max_open_connections": 0,
        })))
        .unwrap_err();
        assert!(error.to_string().contains("max_open_connections"));
    }

    #[test]
    fn test_invalid_url_not_echoed() {
        let error = ConnectionConfig::from_map(&map(json!({
            "connection_url": "not a url with s3cret inside",
        })))
        .unwrap_err();
        assert_eq!(error, PluginError::validation(INVALID_URL_MESSAGE));
    }

    #[test]
    fn test_mistyped_password_not_echoed() {
        let error = ConnectionConfig::from_map(&map(json!({
            "connection_url": "mysql://localhost",
            "password": "hunter2",
            "max_open_connections": "hunter2",
        })))
        .unwrap_err();
        assert!(!error.to_string().contains("hunter2"));
    }

    #[test]
    fn test_url_templating_encodes_credentials() {
        let config = ConnectionConfig::from_map(&map(json!({
            "connection_url": "mysql://{{username}}:{{password}}@db:3306/",
            "username": "vault",
            "password": "p@ss:w/rd",
        })))
        .unwrap();
        assert_eq!(config.connection_url(), "mysql://vault:p%40ss%3Aw%2Frd@db:3306/");

        let secrets = config.secret_values();
        assert_eq!(secrets.get("p@ss:w/rd").map(String::as_str), Some(PASSWORD_PLACEHOLDER));
        assert_eq!(secrets.get("p%40ss%3Aw%2Frd").map(String::as_str), Some(PASSWORD_PLACEHOLDER));
    }

    #[test]
    fn test_tls_enabled() {
        let config = ConnectionConfig::from_map(&map(json!({
            "connection_url": "mysql://localhost",
            "tls_skip_verify": true,
        })))
        .unwrap();
        assert!(config.tls_enabled());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration(""), Ok(Duration::ZERO));
        assert_eq!(parse_duration("45"), Ok(Duration::from_secs(45)));
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("2m10s"), Ok(Duration::from_secs(130)));
        assert!(parse_duration("5d").is_err());
        assert!(parse_duration("m5").is_err());
    }

    #[test]
    fn test_parse_duration_overflow_is_an_error() {
        assert!(parse_duration("9999999999999999999h").is_err());
        assert!(parse_duration("18446744073709551615m").is_err());
        assert!(parse_duration("18446744073709551615s1s").is_err());
        assert!(parse_duration("99999999999999999999999s").is_err());

        let error = ConnectionConfig::from_map(&map(json!({
            "connection_url": "mysql://localhost",
            "max_connection_lifetime": "9999999999999999999h",
        })))
        .unwrap_err();
        assert!(matches!(error, PluginError::Validation { .. }), "{:?}", error);
    }
}
