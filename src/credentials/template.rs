//! # Statement Rendering
//!
//! Statement sets arrive from the host as templates. Each template may hold
//! several `;`-separated statements and `{{key}}` placeholders for request values.
//!
//! ```rust
//! use dbplugin::credentials::{render_all, Substitutions};
//!
//! let subs = Substitutions::new().with("username", "u1").with("password", "p1");
//! let statements = vec!["ALTER USER '{{username}}'@'%' IDENTIFIED BY '{{password}}';".to_string()];
//!
//! assert_eq!(render_all(&statements, &subs), vec!["ALTER USER 'u1'@'%' IDENTIFIED BY 'p1'"]);
//! ```

use std::collections::BTreeMap;

/// Placeholder for the account name (same value as `username`)
pub const NAME: &str = "name";
/// Placeholder for the account name
pub const USERNAME: &str = "username";
/// Placeholder for the account password
pub const PASSWORD: &str = "password";
/// Placeholder for the credential expiration timestamp
pub const EXPIRATION: &str = "expiration";

const SEPARATOR: char = ';';
const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Values substituted into statement templates, keyed by placeholder name.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Substitutions(BTreeMap<String, String>);

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Substitutions for a named account: both `name` and `username`.
    pub fn for_user(username: &str) -> Self {
        Self::new().with(NAME, username).with(USERNAME, username)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

// values hold passwords, only keys are printed
impl std::fmt::Debug for Substitutions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

/// Lazy iterator over the non-empty, trimmed statements of one template.
///
/// Splits on `;` outside of quoted text (`'...'`, `"..."`, `` `...` ``). The iterator
/// is `Clone`, so a statement set can be walked more than once.
#[derive(Debug, Clone)]
pub struct SplitStatements<'a> {
    rest: &'a str,
}

impl<'a> Iterator for SplitStatements<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        while !self.rest.is_empty() {
            let fragment = match top_level_separator(self.rest) {
                Some(at) => {
                    let fragment = &self.rest[..at];
                    self.rest = &self.rest[at + SEPARATOR.len_utf8()..];
                    fragment
                }
                None => std::mem::take(&mut self.rest),
            };

            let fragment = fragment.trim();
            if !fragment.is_empty() {
                return Some(fragment);
            }
        }
        None
    }
}

/// Split a template into its individual statements.
pub fn split_statements(template: &str) -> SplitStatements<'_> {
    SplitStatements { rest: template }
}

fn top_level_separator(text: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (at, c) in text.char_indices() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(q) if c == '\\' && q != '`' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == SEPARATOR => return Some(at),
            None if matches!(c, '\'' | '"' | '`') => quote = Some(c),
            None => {}
        }
    }

    None
}

/// Substitute every known `{{key}}` in a single statement.
///
/// Unknown placeholders are left as written. Substituted values are not scanned
/// again, so a password containing `{{name}}` stays literal.
pub fn render(statement: &str, substitutions: &Substitutions) -> String {
    let mut rendered = String::with_capacity(statement.len());
    let mut rest = statement;

    while let Some(start) = rest.find(OPEN) {
        rendered.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];

        let value = after_open
            .find(CLOSE)
            .and_then(|end| substitutions.get(&after_open[..end]).map(|value| (end, value)));

        match value {
            Some((end, value)) => {
                rendered.push_str(value);
                rest = &after_open[end + CLOSE.len()..];
            }
            None => {
                rendered.push_str(OPEN);
                rest = after_open;
            }
        }
    }

    rendered.push_str(rest);
    rendered
}

/// Split and render a whole statement set, in order.
pub fn render_all<S: AsRef<str>>(templates: &[S], substitutions: &Substitutions) -> Vec<String> {
    templates
        .iter()
        .flat_map(|template| split_statements(template.as_ref()))
        .map(|statement| render(statement, substitutions))
        .collect()
}

/// True when at least one template holds a non-empty statement.
pub fn has_statements<S: AsRef<str>>(templates: &[S]) -> bool {
    templates.iter().any(|template| split_statements(template.as_ref()).next().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alter_user_template() {
        let subs = Substitutions::new().with(USERNAME, "u1").with(PASSWORD, "p1");
        let templates = ["ALTER USER '{{username}}'@'%' IDENTIFIED BY '{{password}}';"];

        assert_eq!(render_all(&templates, &subs), vec!["ALTER USER 'u1'@'%' IDENTIFIED BY 'p1'"]);
    }

    #[test]
    fn test_split_discards_empty_fragments() {
        let template = "\n  CREATE USER 'a';;\n\t GRANT SELECT ON *.* TO 'a' ;  \n ; ";
        let statements: Vec<&str> = split_statements(template).collect();
        assert_eq!(statements, vec!["CREATE USER 'a'", "GRANT SELECT ON *.* TO 'a'"]);
    }

    #[test]
    fn test_split_keeps_quoted_separators() {
        let template = r#"SET @a = 'x;y'; SELECT "it\"s;fine"; SELECT `we;ird`"#;
        let statements: Vec<&str> = split_statements(template).collect();
        assert_eq!(statements, vec!["SET @a = 'x;y'", r#"SELECT "it\"s;fine""#, "SELECT `we;ird`"]);
    }

    #[test]
    fn test_split_is_restartable() {
        let split = split_statements("A; B; C");
        let first: Vec<&str> = split.clone().collect();
        let second: Vec<&str> = split.collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_split_blank_template() {
        assert_eq!(split_statements("  ;\n ;").count(), 0);
        assert!(!has_statements(&["", " ; "]));
        assert!(has_statements(&["", "SELECT 1"]));
        assert!(!has_statements::<&str>(&[]));
    }

    #[test]
    fn test_unknown_placeholders_left_verbatim() {
        let subs = Substitutions::for_user("bob");
        assert_eq!(render("GRANT {{role}} TO '{{name}}'", &subs), "GRANT {{role}} TO 'bob'");
        assert_eq!(render("SELECT '{{unterminated'", &subs), "SELECT '{{unterminated'");
        assert_eq!(render("{{ {{name}}", &subs), "{{ bob");
    }

    #[test]
    fn test_values_not_rescanned() {
        let subs = Substitutions::for_user("eve").with(PASSWORD, "{{name}}");
        assert_eq!(render("'{{name}}' BY '{{password}}'", &subs), "'eve' BY '{{name}}'");
    }

    #[test]
    fn test_every_occurrence_replaced() {
        let subs = Substitutions::for_user("v-app");
        assert_eq!(
            render("REVOKE ALL ON *.* FROM '{{name}}'@'%'; DROP USER '{{username}}'", &subs),
            "REVOKE ALL ON *.* FROM 'v-app'@'%'; DROP USER 'v-app'"
        );
    }

    #[test]
    fn test_debug_hides_values() {
        let subs = Substitutions::for_user("v-app").with(PASSWORD, "hunter2");
        let debug = format!("{:?}", subs);
        assert!(debug.contains("password"));
        assert!(!debug.contains("hunter2"));
    }
}
