//! Printable view of a config with sensitive values masked.
//!
//! A top-level field is sensitive when its name ends in one of
//! [`SENSITIVE_SUFFIXES`], compared case-insensitively.

use crate::model::Config;
use serde_json::{Map, Value};

pub const SENSITIVE_SUFFIXES: [&str; 5] = ["password", "pw", "key", "secret", "credentials"];

/// Shown for sensitive fields that are null or empty.
pub const NOT_SET: &str = "<not set>";
/// Shown for short or non-string sensitive values.
pub const MASK: &str = "****";

/// The full field dump of `config` with sensitive fields masked.
pub fn printable(config: &Config) -> Map<String, Value> {
    config
        .dump()
        .into_iter()
        .map(|(key, value)| {
            if is_sensitive(&key) {
                let masked = mask_value(&value);
                (key, masked)
            } else {
                (key, value)
            }
        })
        .collect()
}

pub fn is_sensitive(key: &str) -> bool {
    let key = key.to_lowercase();
    SENSITIVE_SUFFIXES.iter().any(|suffix| key.ends_with(suffix))
}

/// Mask one value: strings longer than four characters keep their first
/// and last two characters.
pub fn mask_value(value: &Value) -> Value {
    let masked = match value {
        Value::Null => NOT_SET.to_string(),
        Value::String(s) if s.is_empty() => NOT_SET.to_string(),
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            if chars.len() <= 4 {
                MASK.to_string()
            } else {
                let head: String = chars[..2].iter().collect();
                let tail: String = chars[chars.len() - 2..].iter().collect();
                format!("{head}...{tail}")
            }
        }
        _ => MASK.to_string(),
    };
    Value::String(masked)
}
