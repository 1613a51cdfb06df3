//! Logic filters: comparisons and predicates, all returning booleans.

use serde_json::Value;

use super::{arg, BuiltinFilter};
use crate::value::{is_truthy, strict_equals, to_display_string, to_number};

/// The logic group.
pub const FILTERS: &[(&str, BuiltinFilter)] = &[
    ("equals", equals),
    ("not", not),
    ("bool", bool),
    ("gt", gt),
    ("gte", gte),
    ("lt", lt),
    ("lte", lte),
    ("contains", contains),
    ("startsWith", starts_with),
    ("endsWith", ends_with),
    ("isEmpty", is_empty),
];

/// Equality with numeric coercion of the argument: when the argument reads
/// as a number, the value must be that number; otherwise the comparison is
/// strict. With no argument the result is `false`.
pub fn equals(value: &Value, args: &[Value]) -> Value {
    let Some(expected) = args.first() else {
        return Value::Bool(false);
    };
    let numeric = to_number(expected);
    let result = if numeric.is_nan() {
        strict_equals(value, expected)
    } else {
        value.as_f64() == Some(numeric)
    };
    Value::Bool(result)
}

/// Logical negation of the value's truthiness.
pub fn not(value: &Value, _args: &[Value]) -> Value {
    Value::Bool(!is_truthy(value))
}

/// The value's truthiness.
pub fn bool(value: &Value, _args: &[Value]) -> Value {
    Value::Bool(is_truthy(value))
}

fn compare(value: &Value, args: &[Value], op: fn(f64, f64) -> bool) -> Value {
    Value::Bool(op(to_number(value), to_number(arg(args, 0))))
}

/// `value > n`
pub fn gt(value: &Value, args: &[Value]) -> Value {
    compare(value, args, |a, b| a > b)
}

/// `value >= n`
pub fn gte(value: &Value, args: &[Value]) -> Value {
    compare(value, args, |a, b| a >= b)
}

/// `value < n`
pub fn lt(value: &Value, args: &[Value]) -> Value {
    compare(value, args, |a, b| a < b)
}

/// `value <= n`
pub fn lte(value: &Value, args: &[Value]) -> Value {
    compare(value, args, |a, b| a <= b)
}

/// Substring test for strings, membership test for arrays.
pub fn contains(value: &Value, args: &[Value]) -> Value {
    let needle = arg(args, 0);
    let found = match value {
        Value::String(s) => s.contains(&to_display_string(needle)),
        Value::Array(items) => items.iter().any(|item| strict_equals(item, needle)),
        _ => false,
    };
    Value::Bool(found)
}

/// `{{ url | startsWith('https') }}`
pub fn starts_with(value: &Value, args: &[Value]) -> Value {
    Value::Bool(to_display_string(value).starts_with(&to_display_string(arg(args, 0))))
}

/// `{{ file | endsWith('.json') }}`
pub fn ends_with(value: &Value, args: &[Value]) -> Value {
    Value::Bool(to_display_string(value).ends_with(&to_display_string(arg(args, 0))))
}

/// True for `null`, empty strings, empty arrays and empty objects.
pub fn is_empty(value: &Value, _args: &[Value]) -> Value {
    let empty = match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    Value::Bool(empty)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_equals_numeric_coercion() {
        assert_eq!(equals(&json!(25), &[json!("25")]), json!(true));
        assert_eq!(equals(&json!(25.0), &[json!(25)]), json!(true));
        assert_eq!(equals(&json!("25"), &[json!("25")]), json!(false));
    }

    #[test]
    fn test_equals_without_argument() {
        assert_eq!(equals(&json!(0), &[]), json!(false));
        assert_eq!(equals(&Value::Null, &[]), json!(false));
        assert_eq!(equals(&json!(0), &[Value::Null]), json!(true));
    }

    #[test]
    fn test_equals_strict() {
        assert_eq!(equals(&json!("admin"), &[json!("admin")]), json!(true));
        assert_eq!(equals(&json!("admin"), &[json!("user")]), json!(false));
        assert_eq!(equals(&json!(true), &[json!(true)]), json!(true));
    }

    #[test]
    fn test_not_and_bool() {
        assert_eq!(not(&json!(0), &[]), json!(true));
        assert_eq!(not(&json!([]), &[]), json!(false));
        assert_eq!(bool(&json!("x"), &[]), json!(true));
        assert_eq!(bool(&Value::Null, &[]), json!(false));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(gt(&json!(5), &[json!("3")]), json!(true));
        assert_eq!(gte(&json!(3), &[json!(3)]), json!(true));
        assert_eq!(lt(&json!("2"), &[json!(10)]), json!(true));
        assert_eq!(lte(&json!(11), &[json!(10)]), json!(false));
        assert_eq!(gt(&json!("abc"), &[json!(1)]), json!(false));
    }

    #[test]
    fn test_contains() {
        assert_eq!(contains(&json!("hello world"), &[json!("lo w")]), json!(true));
        assert_eq!(contains(&json!(["a", "b"]), &[json!("b")]), json!(true));
        assert_eq!(contains(&json!([1, 2]), &[json!("2")]), json!(false));
        assert_eq!(contains(&json!(12), &[json!("1")]), json!(false));
    }

    #[test]
    fn test_starts_and_ends_with() {
        assert_eq!(starts_with(&json!("https://x"), &[json!("https")]), json!(true));
        assert_eq!(ends_with(&json!("data.json"), &[json!(".json")]), json!(true));
        assert_eq!(starts_with(&Value::Null, &[json!("nu")]), json!(true));
    }

    #[test]
    fn test_is_empty() {
        for v in [Value::Null, json!(""), json!([]), json!({})] {
            assert_eq!(is_empty(&v, &[]), json!(true));
        }
        for v in [json!(0), json!(false), json!(" "), json!([0]), json!({"a": 1})] {
            assert_eq!(is_empty(&v, &[]), json!(false));
        }
    }
}
