//! # Username Generation
//!
//! Dynamic accounts are named `v-<display>-<role>-<suffix>`. The display and role
//! fragments come from the host's request metadata; the suffix is random and is what
//! keeps usernames unique. Backends cap identifier length (MySQL before 5.7.8 at 16
//! characters, later versions at 32), so the readable fragments give way first and
//! the suffix is never cut below [`MIN_SUFFIX_LEN`].

use rand::{distributions::Alphanumeric, Rng};

use crate::errors::{PluginError, Result};

/// Maximum username length for current backends
pub const USERNAME_LEN: usize = 32;
/// Characters reserved for the role fragment on current backends
pub const METADATA_LEN: usize = 10;
/// Maximum username length for legacy backends
pub const LEGACY_USERNAME_LEN: usize = 16;
/// Characters reserved for the role fragment on legacy backends
pub const LEGACY_METADATA_LEN: usize = 4;

/// Shortest uniqueness suffix a username may carry
pub const MIN_SUFFIX_LEN: usize = 4;
const SUFFIX_LEN: usize = 8;

const PREFIX: &str = "v";
const SEPARATOR: &str = "-";

/// Length budget for generated usernames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsernamePolicy {
    max_length: usize,
    metadata_length: usize,
    suffix_length: usize,
}

impl UsernamePolicy {
    /// Policy for the current (`legacy == false`) or legacy identifier length class.
    pub fn new(legacy: bool) -> Self {
        if legacy {
            Self {
                max_length: LEGACY_USERNAME_LEN,
                metadata_length: LEGACY_METADATA_LEN,
                suffix_length: MIN_SUFFIX_LEN,
            }
        } else {
            Self { max_length: USERNAME_LEN, metadata_length: METADATA_LEN, suffix_length: SUFFIX_LEN }
        }
    }

    /// Lower the total length budget. Zero, or a value above the class maximum, is ignored.
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        if max_length > 0 && max_length < self.max_length {
            self.max_length = max_length;
        }
        self
    }

    /// Generate a username for the given display and role names.
    pub fn generate(&self, display_name: &str, role_name: &str) -> Result<String> {
        let mut display = sanitize(display_name, self.max_length);
        let mut role = sanitize(role_name, self.metadata_length);
        let mut suffix_length = self.suffix_length;

        while assembled_len(&display, &role, suffix_length) > self.max_length {
            if display.pop().is_some() || role.pop().is_some() {
                continue;
            }
            if suffix_length > MIN_SUFFIX_LEN {
                suffix_length -= 1;
                continue;
            }
            return Err(PluginError::generation(format!(
                "maximum username length {} cannot hold a {}-character unique suffix",
                self.max_length, MIN_SUFFIX_LEN
            )));
        }

        let suffix: String =
            rand::thread_rng().sample_iter(&Alphanumeric).take(suffix_length).map(char::from).collect();

        let username = [PREFIX, display.as_str(), role.as_str(), suffix.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(SEPARATOR);

        Ok(username)
    }
}

/// Generate a username.
///
/// `max_length` lowers the budget of the selected length class when positive;
/// `legacy` selects the 16/4 class instead of 32/10.
pub fn generate_username(
    display_name: &str,
    role_name: &str,
    max_length: usize,
    legacy: bool,
) -> Result<String> {
    UsernamePolicy::new(legacy).with_max_length(max_length).generate(display_name, role_name)
}

fn sanitize(fragment: &str, max_len: usize) -> String {
    fragment
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .take(max_len)
        .collect()
}

fn assembled_len(display: &str, role: &str, suffix_length: usize) -> usize {
    let fragment = |part: &str| if part.is_empty() { 0 } else { part.len() + 1 };
    PREFIX.len() + fragment(display) + fragment(role) + 1 + suffix_length
}
