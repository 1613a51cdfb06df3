//! Object filters.

use serde_json::Value;

use super::{truthy_arg, BuiltinFilter};
use crate::value::{to_display_string, to_json_string};

/// The object group.
pub const FILTERS: &[(&str, BuiltinFilter)] = &[
    ("json", json),
    ("keys", keys),
    ("values", values),
    ("entries", entries),
    ("get", get),
    ("has", has),
];

/// Serializes the value as a JSON string.
pub fn json(value: &Value, _args: &[Value]) -> Value {
    Value::String(to_json_string(value))
}

/// Object keys; an empty array for anything that is not an object.
pub fn keys(value: &Value, _args: &[Value]) -> Value {
    match value {
        Value::Object(map) => Value::Array(map.keys().cloned().map(Value::String).collect()),
        _ => Value::Array(Vec::new()),
    }
}

/// Object values; an empty array for anything that is not an object.
pub fn values(value: &Value, _args: &[Value]) -> Value {
    match value {
        Value::Object(map) => Value::Array(map.values().cloned().collect()),
        _ => Value::Array(Vec::new()),
    }
}

/// `[key, value]` pairs; an empty array for anything that is not an object.
pub fn entries(value: &Value, _args: &[Value]) -> Value {
    match value {
        Value::Object(map) => Value::Array(
            map.iter()
                .map(|(k, v)| Value::Array(vec![Value::String(k.clone()), v.clone()]))
                .collect(),
        ),
        _ => Value::Array(Vec::new()),
    }
}

/// Member lookup by key, or by index on arrays. `null` when absent.
pub fn get(value: &Value, args: &[Value]) -> Value {
    let Some(key) = truthy_arg(args, 0).map(to_display_string) else {
        return Value::Null;
    };
    match value {
        Value::Object(map) => map.get(&key).cloned().unwrap_or(Value::Null),
        Value::Array(items) => key
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// Key presence, even when the stored value is `null`. Arrays answer for
/// their indices and `length`.
pub fn has(value: &Value, args: &[Value]) -> Value {
    let Some(key) = truthy_arg(args, 0).map(to_display_string) else {
        return Value::Bool(false);
    };
    let present = match value {
        Value::Object(map) => map.contains_key(&key),
        Value::Array(items) => {
            key == "length" || key.parse::<usize>().is_ok_and(|i| i < items.len())
        }
        _ => false,
    };
    Value::Bool(present)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_json() {
        assert_eq!(json(&json!({"a": [1, "x"]}), &[]), json!(r#"{"a":[1,"x"]}"#));
        assert_eq!(json(&Value::Null, &[]), json!("null"));
    }

    #[test]
    fn test_keys_values_entries() {
        let obj = json!({"a": 1, "b": null});
        assert_eq!(keys(&obj, &[]), json!(["a", "b"]));
        assert_eq!(values(&obj, &[]), json!([1, null]));
        assert_eq!(entries(&obj, &[]), json!([["a", 1], ["b", null]]));
    }

    #[test]
    fn test_non_objects_give_empty_arrays() {
        for v in [json!([1, 2]), json!("abc"), json!(3), Value::Null] {
            assert_eq!(keys(&v, &[]), json!([]));
            assert_eq!(values(&v, &[]), json!([]));
            assert_eq!(entries(&v, &[]), json!([]));
        }
    }

    #[test]
    fn test_get() {
        assert_eq!(get(&json!({"a": {"b": 2}}), &[json!("a")]), json!({"b": 2}));
        assert_eq!(get(&json!(["x", "y"]), &[json!("1")]), json!("y"));
        assert_eq!(get(&json!(["x", "y"]), &[json!(1)]), json!("y"));
        assert_eq!(get(&json!({"a": 1}), &[json!("z")]), Value::Null);
        assert_eq!(get(&json!("str"), &[json!("0")]), Value::Null);
        assert_eq!(get(&json!({"a": 1}), &[]), Value::Null);
    }

    #[test]
    fn test_has() {
        let obj = json!({"present": null});
        assert_eq!(has(&obj, &[json!("present")]), json!(true));
        assert_eq!(has(&obj, &[json!("absent")]), json!(false));
        assert_eq!(has(&json!([1]), &[json!("0")]), json!(true));
        assert_eq!(has(&json!([1]), &[json!("1")]), json!(false));
        assert_eq!(has(&json!("str"), &[json!("length")]), json!(false));
        assert_eq!(has(&obj, &[]), json!(false));
    }
}
