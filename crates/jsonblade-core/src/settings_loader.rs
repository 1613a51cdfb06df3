//! Settings loading from configuration files.
//!
//! Builds [`Settings`] from TOML or JSON documents merged over the defaults,
//! then optionally applies environment variable overrides.
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `JSONBLADE_LOG_LEVEL` | `log_level` |
//! | `JSONBLADE_DEBUG` | `debug` |
//! | `JSONBLADE_STRICT_MODE` | `template.strictMode` |
//! | `JSONBLADE_THROW_ON_ERROR` | `template.throwOnError` |
//!
//! ## Examples
//!
//! ```
//! use jsonblade_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_str(r#"
//!     log_level = "debug"
//!
//!     [template]
//!     strictMode = true
//! "#).unwrap();
//! assert_eq!(settings.log_level, "debug");
//! assert!(settings.template_config().strict_mode);
//! ```

use std::path::Path;

use crate::error::JsonBladeError;
use crate::settings::Settings;

/// Loads settings from a TOML string.
///
/// Keys missing from the document keep their default values.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, JsonBladeError> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| JsonBladeError::Configuration(format!("Failed to parse TOML: {e}")))?;
    from_value(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, JsonBladeError> {
    from_toml_str(&read_file(path.as_ref())?)
}

/// Loads settings from a JSON string.
pub fn from_json_str(json_str: &str) -> Result<Settings, JsonBladeError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| JsonBladeError::Configuration(format!("Failed to parse JSON: {e}")))?;
    from_value(json_value, "JSON")
}

/// Loads settings from a file, choosing the format from its extension
/// (`.json` is JSON, anything else is TOML), then applies environment
/// overrides.
pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Settings, JsonBladeError> {
    let path = path.as_ref();
    let content = read_file(path)?;
    let mut settings = if path.extension().is_some_and(|ext| ext == "json") {
        from_json_str(&content)?
    } else {
        from_toml_str(&content)?
    };
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Applies `JSONBLADE_*` environment variables on top of `settings`.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides(settings, |key| std::env::var(key).ok());
}

fn apply_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("JSONBLADE_LOG_LEVEL") {
        settings.log_level = val;
    }
    if let Some(val) = lookup("JSONBLADE_DEBUG").and_then(|v| parse_bool(&v)) {
        settings.debug = val;
    }
    if let Some(val) = lookup("JSONBLADE_STRICT_MODE").and_then(|v| parse_bool(&v)) {
        settings.template.strict_mode = Some(val);
    }
    if let Some(val) = lookup("JSONBLADE_THROW_ON_ERROR").and_then(|v| parse_bool(&v)) {
        settings.template.throw_on_error = Some(val);
    }
}

// ============================================================
// Helpers
// ============================================================

fn read_file(path: &Path) -> Result<String, JsonBladeError> {
    std::fs::read_to_string(path).map_err(|e| {
        JsonBladeError::Configuration(format!(
            "Failed to read settings file '{}': {e}",
            path.display()
        ))
    })
}

fn from_value(value: serde_json::Value, format: &str) -> Result<Settings, JsonBladeError> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        JsonBladeError::Configuration(format!("Failed to serialize default settings: {e}"))
    })?;
    let merged = merge_json(default_json, value);
    serde_json::from_value(merged).map_err(|e| {
        JsonBladeError::Configuration(format!("Failed to deserialize settings from {format}: {e}"))
    })
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = match base_map.remove(&key) {
                    Some(base_v) => merge_json(base_v, override_v),
                    None => override_v,
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── TOML loading ────────────────────────────────────────────────

    #[test]
    fn test_from_toml_str_basic() {
        let settings = from_toml_str(
            r#"
            log_level = "warn"
            debug = true
            "#,
        )
        .unwrap();
        assert_eq!(settings.log_level, "warn");
        assert!(settings.debug);
        assert!(settings.template.is_empty());
    }

    #[test]
    fn test_from_toml_str_template_section() {
        let settings = from_toml_str(
            r#"
            [template]
            throwOnError = true

            [template.delimiters]
            start = "<%"
            end = "%>"
            "#,
        )
        .unwrap();
        let config = settings.template_config();
        assert!(config.throw_on_error);
        assert_eq!(config.delimiters.start, "<%");
        assert_eq!(config.delimiters.end, "%>");
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_from_toml_str_invalid() {
        let err = from_toml_str("log_level = ").unwrap_err();
        assert!(matches!(err, JsonBladeError::Configuration(_)));
    }

    #[test]
    fn test_from_toml_str_wrong_type() {
        assert!(from_toml_str("debug = \"maybe\"").is_err());
    }

    // ── JSON loading ────────────────────────────────────────────────

    #[test]
    fn test_from_json_str() {
        let settings = from_json_str(r#"{"template": {"strictMode": true}}"#).unwrap();
        assert_eq!(settings.template.strict_mode, Some(true));
        assert!(!settings.debug);
    }

    #[test]
    fn test_from_file_with_env_reads_json_and_toml() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("settings.json");
        std::fs::write(&json_path, r#"{"log_level": "trace"}"#).unwrap();
        let toml_path = dir.path().join("settings.toml");
        std::fs::write(&toml_path, "log_level = \"error\"\n").unwrap();

        // The environment may carry a level override; only compare when it does not.
        if std::env::var("JSONBLADE_LOG_LEVEL").is_err() {
            assert_eq!(from_file_with_env(&json_path).unwrap().log_level, "trace");
            assert_eq!(from_file_with_env(&toml_path).unwrap().log_level, "error");
        }
    }

    #[test]
    fn test_missing_file() {
        assert!(from_toml_file("/nonexistent/jsonblade.toml").is_err());
    }

    // ── Environment overrides ───────────────────────────────────────

    #[test]
    fn test_apply_overrides() {
        let mut settings = Settings::default();
        apply_overrides(&mut settings, |key| match key {
            "JSONBLADE_LOG_LEVEL" => Some("debug".to_string()),
            "JSONBLADE_DEBUG" => Some("yes".to_string()),
            "JSONBLADE_STRICT_MODE" => Some("1".to_string()),
            "JSONBLADE_THROW_ON_ERROR" => Some("garbage".to_string()),
            _ => None,
        });
        assert_eq!(settings.log_level, "debug");
        assert!(settings.debug);
        assert_eq!(settings.template.strict_mode, Some(true));
        assert_eq!(settings.template.throw_on_error, None);
    }

    // ── Helpers ─────────────────────────────────────────────────────

    #[test]
    fn test_merge_json_nested() {
        let merged = merge_json(
            serde_json::json!({"a": {"b": 1, "c": 2}, "d": 3}),
            serde_json::json!({"a": {"b": 10}}),
        );
        assert_eq!(merged, serde_json::json!({"a": {"b": 10, "c": 2}, "d": 3}));
    }
}
