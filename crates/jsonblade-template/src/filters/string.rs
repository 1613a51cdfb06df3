//! String filters.
//!
//! `upper`, `lower`, `capitalize`, `trim` and `slug` pass `null` through
//! unchanged; any other value is converted to its display string first.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::BuiltinFilter;
use crate::value::to_display_string;

/// The string group.
pub const FILTERS: &[(&str, BuiltinFilter)] = &[
    ("upper", upper),
    ("lower", lower),
    ("capitalize", capitalize),
    ("trim", trim),
    ("default", default),
    ("slug", slug),
];

static NON_SLUG_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_\s-]").expect("valid slug pattern"));
static SLUG_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_-]+").expect("valid slug pattern"));

fn map_string(value: &Value, f: impl FnOnce(String) -> String) -> Value {
    match value {
        Value::Null => Value::Null,
        other => Value::String(f(to_display_string(other))),
    }
}

/// `{{ name | upper }}`
pub fn upper(value: &Value, _args: &[Value]) -> Value {
    map_string(value, |s| s.to_uppercase())
}

/// `{{ name | lower }}`
pub fn lower(value: &Value, _args: &[Value]) -> Value {
    map_string(value, |s| s.to_lowercase())
}

/// Uppercases the first character and leaves the rest untouched.
pub fn capitalize(value: &Value, _args: &[Value]) -> Value {
    map_string(value, |s| {
        let mut chars = s.chars();
        chars.next().map_or_else(String::new, |first| {
            first.to_uppercase().chain(chars).collect()
        })
    })
}

/// `{{ name | trim }}`
pub fn trim(value: &Value, _args: &[Value]) -> Value {
    map_string(value, |s| s.trim().to_string())
}

/// Substitutes the fallback for `null` or `""`. Without a fallback the
/// substitute is `""`.
pub fn default(value: &Value, args: &[Value]) -> Value {
    match value {
        Value::Null => args.first().cloned().unwrap_or_else(|| Value::String(String::new())),
        Value::String(s) if s.is_empty() => args
            .first()
            .cloned()
            .unwrap_or_else(|| Value::String(String::new())),
        other => other.clone(),
    }
}

/// Turns text into a URL slug: `"Hello, World!"` becomes `"hello-world"`.
pub fn slug(value: &Value, _args: &[Value]) -> Value {
    map_string(value, |s| {
        let lowered = s.to_lowercase();
        let stripped = NON_SLUG_CHARS.replace_all(lowered.trim(), "");
        let dashed = SLUG_SEPARATORS.replace_all(&stripped, "-");
        dashed.trim_matches('-').to_string()
    })
}
