//! Audit view of call params
//!
//! The view is what lands in the per-call audit event: members whose name
//! looks like a credential are masked, long strings are clipped and deep
//! nesting is folded, so one event stays bounded whatever a caller sends.

use serde_json::{Map, Value};

pub const REDACTED: &str = "[REDACTED]";
pub const FOLDED: &str = "[...]";

/// Longest string, in chars, copied into an audit event.
pub const MAX_AUDIT_STRING: usize = 64;
const MAX_AUDIT_DEPTH: usize = 6;

/// Matched against member names with case, `-` and `_` ignored.
const SENSITIVE_FRAGMENTS: [&str; 7] = [
    "token",
    "secret",
    "password",
    "passwd",
    "credential",
    "apikey",
    "authorization",
];

pub fn audit_view(params: &Value) -> Value {
    view_at(params, 0)
}

fn view_at(value: &Value, depth: usize) -> Value {
    match value {
        Value::Object(_) | Value::Array(_) if depth >= MAX_AUDIT_DEPTH => {
            Value::String(FOLDED.to_string())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(name, member)| {
                    let shown = if is_sensitive_name(name) {
                        Value::String(REDACTED.to_string())
                    } else {
                        view_at(member, depth + 1)
                    };
                    (name.clone(), shown)
                })
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| view_at(item, depth + 1)).collect())
        }
        Value::String(text) => Value::String(clip(text)),
        _ => value.clone(),
    }
}

fn clip(text: &str) -> String {
    let total = text.chars().count();
    if total <= MAX_AUDIT_STRING {
        return text.to_string();
    }

    let kept: String = text.chars().take(MAX_AUDIT_STRING).collect();
    format!("{kept}... ({} more chars)", total - MAX_AUDIT_STRING)
}

pub fn is_sensitive_name(name: &str) -> bool {
    let squashed: String = name
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    SENSITIVE_FRAGMENTS
        .iter()
        .any(|fragment| squashed.contains(fragment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn credential_members_are_masked_at_any_depth() {
        let params = json!({
            "user": "ada",
            "Api-Key": "k",
            "session": {"refresh_token": "t", "hosts": [{"db_password": "p", "host": "db1"}]}
        });

        let view = audit_view(&params);

        assert_eq!(view["user"], json!("ada"));
        assert_eq!(view["Api-Key"], json!(REDACTED));
        assert_eq!(view["session"]["refresh_token"], json!(REDACTED));
        assert_eq!(view["session"]["hosts"][0]["db_password"], json!(REDACTED));
        assert_eq!(view["session"]["hosts"][0]["host"], json!("db1"));
    }

    #[test]
    fn long_strings_are_clipped() {
        let long = "x".repeat(MAX_AUDIT_STRING + 10);
        let view = audit_view(&json!([long, "short"]));

        let clipped = view[0].as_str().expect("clipped string");
        assert!(clipped.starts_with(&"x".repeat(MAX_AUDIT_STRING)));
        assert!(clipped.ends_with("(10 more chars)"));
        assert_eq!(view[1], json!("short"));
    }

    #[test]
    fn deep_nesting_is_folded() {
        let mut deep = json!("leaf");
        for _ in 0..(MAX_AUDIT_DEPTH + 2) {
            deep = json!({"inner": deep});
        }

        let mut view = audit_view(&deep);
        for _ in 0..MAX_AUDIT_DEPTH {
            view = view["inner"].clone();
        }
        assert_eq!(view, json!(FOLDED));
    }

    #[test]
    fn ordinary_names_are_not_sensitive() {
        assert!(!is_sensitive_name("name"));
        assert!(!is_sensitive_name("host"));
        assert!(is_sensitive_name("AUTHORIZATION"));
        assert!(is_sensitive_name("pass-wd"));
    }
}
