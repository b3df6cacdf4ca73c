use serde::Deserialize;

use crate::error::ConfigError;

/// Decides which console command names are instrumentable.
///
/// A name is instrumentable iff it matches `allow` (an empty allow list
/// means "all") and does not match `deny`. Patterns are exact names or a
/// prefix with a trailing `*`, e.g. `queue:*`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ConsoleCommandFilterPolicy {
    pub allow: Vec<String>,
    pub deny: Vec<String>,
}

impl ConsoleCommandFilterPolicy {
    pub fn allows(&self, name: &str) -> bool {
        let allowed =
            self.allow.is_empty() || self.allow.iter().any(|p| pattern_matches(p, name));
        allowed && !self.deny.iter().any(|p| pattern_matches(p, name))
    }

    /// Reject patterns with `*` anywhere but the trailing position. Called
    /// once at startup.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for pattern in self.allow.iter().chain(self.deny.iter()) {
            if let Some(idx) = pattern.find('*') {
                if idx + 1 != pattern.len() {
                    return Err(ConfigError::FilterPattern {
                        pattern: pattern.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn pattern_matches(pattern: &str, name: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => pattern == name,
    }
}
