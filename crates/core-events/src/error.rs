//! Schema-violation error shared by every layer that unmarshals JSON.

use serde_json::Value;

/// Raised when a rule, event definition, or configuration fragment violates
/// the documented schema. Carries a human-readable message that embeds the
/// offending JSON excerpt; callers log it once and skip the entity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct UnmarshalError {
    message: String,
}

impl UnmarshalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

const DUMP_LIMIT: usize = 256;

/// Compact dump of a JSON value for error messages, truncated so a pathological
/// rule cannot flood the log.
pub fn dump_for_error(value: &Value) -> String {
    let mut s = value.to_string();
    if s.len() > DUMP_LIMIT {
        let mut cut = DUMP_LIMIT;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push_str("...");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dump_truncates_long_values() {
        let value = json!({ "shell_command": "x".repeat(1000) });
        let dumped = dump_for_error(&value);
        assert!(dumped.len() <= DUMP_LIMIT + 3);
        assert!(dumped.ends_with("..."));
    }

    #[test]
    fn dump_keeps_short_values_intact() {
        let value = json!({ "key_code": "a" });
        assert_eq!(dump_for_error(&value), r#"{"key_code":"a"}"#);
    }
}
