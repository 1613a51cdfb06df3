//! Loose value coercions shared by the evaluator and the builtin filters.
//!
//! Template data is plain [`serde_json::Value`]. Filters and conditions need
//! the permissive conversions templates are written against: numbers parsed
//! out of strings, strings built out of anything, and a notion of truthiness.

use serde_json::{Map, Number, Value};

/// Parses a numeric literal the permissive way (`" 42 "`, `"1e3"`, `"0x1f"`,
/// `"Infinity"`). An empty or blank string is zero.
#[allow(clippy::cast_precision_loss)]
pub fn parse_number(text: &str) -> Option<f64> {
    let s = text.trim();
    if s.is_empty() {
        return Some(0.0);
    }
    match s {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = s.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix).ok().map(|n| n as f64);
        }
    }
    // Rust accepts "inf"/"nan" spellings that are not numbers here.
    if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }
    s.parse::<f64>().ok()
}

/// Converts a value to a number; `NaN` when it has no numeric reading.
///
/// `null` and `false` are 0, `true` is 1, strings are parsed with
/// [`parse_number`], a single-element array converts its element, an empty
/// array is 0, and objects are `NaN`.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_number(s).unwrap_or(f64::NAN),
        Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            [single] => parse_number(&to_display_string(single)).unwrap_or(f64::NAN),
            _ => f64::NAN,
        },
        Value::Object(_) => f64::NAN,
    }
}

/// Builds a JSON number, collapsing integral values to integers.
/// Non-finite results become `null`.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn number_value(n: f64) -> Value {
    if !n.is_finite() {
        return Value::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map_or(Value::Null, Value::Number)
}

/// Formats a number the way it reads in text: integral values carry no
/// fractional part and negative zero prints as `0`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e21 {
        return format!("{n:.0}");
    }
    n.to_string()
}

/// Converts any value to its display string.
///
/// `null` is `"null"`, arrays join their elements with `,` (null elements are
/// empty), and objects render as `[object Object]`.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if n.is_f64() {
                format_number(n.as_f64().unwrap_or(f64::NAN))
            } else {
                n.to_string()
            }
        }
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_display_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Loose truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy;
/// every array and object is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Truthiness used by `if` and `unless`: like [`is_truthy`] except that an
/// empty array is false.
pub fn condition_truthy(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty(),
        other => is_truthy(other),
    }
}

/// Strict equality: same type and same value, with numbers compared
/// numerically (`1` equals `1.0`).
pub fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Returns the object behind a value, if it is one.
pub const fn as_object(value: &Value) -> Option<&Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Serializes a value as compact JSON.
pub fn to_json_string(value: &Value) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number(" 1.5 "), Some(1.5));
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number("0x1f"), Some(31.0));
        assert_eq!(parse_number(""), Some(0.0));
        assert_eq!(parse_number("-Infinity"), Some(f64::NEG_INFINITY));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("12px"), None);
    }

    #[test]
    fn test_to_number() {
        assert!((to_number(&json!(null))).abs() < f64::EPSILON);
        assert!((to_number(&json!(true)) - 1.0).abs() < f64::EPSILON);
        assert!((to_number(&json!("3.5")) - 3.5).abs() < f64::EPSILON);
        assert!((to_number(&json!([7])) - 7.0).abs() < f64::EPSILON);
        assert!(to_number(&json!([1, 2])).is_nan());
        assert!(to_number(&json!({"a": 1})).is_nan());
        assert!(to_number(&json!("abc")).is_nan());
    }

    #[test]
    fn test_number_value_collapses_integers() {
        assert_eq!(number_value(3.0), json!(3));
        assert_eq!(number_value(2.5), json!(2.5));
        assert_eq!(number_value(f64::NAN), Value::Null);
        assert_eq!(number_value(f64::INFINITY), Value::Null);
    }

    #[test]
    fn test_display_string() {
        assert_eq!(to_display_string(&json!(null)), "null");
        assert_eq!(to_display_string(&json!(1.0)), "1");
        assert_eq!(to_display_string(&json!(0.5)), "0.5");
        assert_eq!(to_display_string(&json!([1, null, "a"])), "1,,a");
        assert_eq!(to_display_string(&json!({"a": 1})), "[object Object]");
        assert_eq!(to_display_string(&json!("plain")), "plain");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1234.0), "1234");
        assert_eq!(format_number(f64::NAN), "NaN");
    }

    #[test]
    fn test_truthiness() {
        for v in [json!(true), json!(1), json!("x"), json!([1]), json!({"a": 1}), json!([]), json!({})] {
            assert!(is_truthy(&v), "{v} should be truthy");
        }
        for v in [json!(false), json!(0), json!(""), json!(null)] {
            assert!(!is_truthy(&v), "{v} should be falsy");
        }
    }

    #[test]
    fn test_condition_truthiness() {
        assert!(condition_truthy(&json!([1])));
        assert!(!condition_truthy(&json!([])));
        assert!(condition_truthy(&json!({})));
        assert!(!condition_truthy(&json!(0)));
    }

    #[test]
    fn test_strict_equals() {
        assert!(strict_equals(&json!(1), &json!(1.0)));
        assert!(!strict_equals(&json!(1), &json!("1")));
        assert!(strict_equals(&json!("a"), &json!("a")));
    }
}
