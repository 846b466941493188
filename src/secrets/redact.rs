//! Replacement of known secret values inside free-form text.

use std::collections::HashMap;

/// Placeholder used for passwords in sanitized error text.
pub const PASSWORD_PLACEHOLDER: &str = "[password]";

/// Supplies the secret values an error must never reveal, each mapped to the
/// placeholder that replaces it.
pub trait SecretValues: Send + Sync {
    fn secret_values(&self) -> HashMap<String, String>;
}

/// A set of secret -> placeholder replacements.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    // longest secret first, so a secret that contains another is replaced whole
    replacements: Vec<(String, String)>,
}

impl Redactor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: HashMap<String, String>) -> Self {
        values.into_iter().fold(Self::new(), |redactor, (secret, placeholder)| {
            redactor.with(secret, placeholder)
        })
    }

    /// Add a secret. Empty secrets are ignored.
    pub fn with(mut self, secret: impl Into<String>, placeholder: impl Into<String>) -> Self {
        let secret = secret.into();
        if secret.is_empty() || self.replacements.iter().any(|(s, _)| *s == secret) {
            return self;
        }
        self.replacements.push((secret, placeholder.into()));
        self.replacements.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    /// Replace secrets in one left-to-right pass. Inserted placeholders are
    /// never scanned again.
    pub fn redact(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(ch) = rest.chars().next() {
            match self.replacements.iter().find(|(secret, _)| rest.starts_with(secret.as_str())) {
                Some((secret, placeholder)) => {
                    out.push_str(placeholder);
                    rest = &rest[secret.len()..];
                }
                None => {
                    out.push(ch);
                    rest = &rest[ch.len_utf8()..];
                }
            }
        }
        out
    }
}
