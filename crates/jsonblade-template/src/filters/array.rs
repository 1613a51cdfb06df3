//! Array filters.

use std::cmp::Ordering;

use serde_json::Value;

use super::{truthy_arg, BuiltinFilter};
use crate::value::{strict_equals, to_display_string, to_number};

/// The array group.
pub const FILTERS: &[(&str, BuiltinFilter)] = &[
    ("join", join),
    ("length", length),
    ("first", first),
    ("last", last),
    ("map", map),
    ("filter", filter),
    ("reverse", reverse),
    ("sort", sort),
    ("unique", unique),
];

/// Looks up `key` on an object, or an index on an array.
fn member<'v>(item: &'v Value, key: &str) -> Option<&'v Value> {
    match item {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

const fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// Joins array elements with the separator (`,` by default). Null elements
/// are empty; non-arrays are converted to a string.
pub fn join(value: &Value, args: &[Value]) -> Value {
    let separator = truthy_arg(args, 0).map_or_else(|| ",".to_string(), to_display_string);
    match value {
        Value::Array(items) => Value::String(
            items
                .iter()
                .map(|item| match item {
                    Value::Null => String::new(),
                    other => to_display_string(other),
                })
                .collect::<Vec<_>>()
                .join(&separator),
        ),
        other => Value::String(to_display_string(other)),
    }
}

/// Array or string length, key count for objects, 0 otherwise.
pub fn length(value: &Value, _args: &[Value]) -> Value {
    let len = match value {
        Value::Array(items) => items.len(),
        Value::String(s) => s.chars().count(),
        Value::Object(map) => map.len(),
        _ => 0,
    };
    Value::from(len)
}

/// First element of an array or first character of a string.
pub fn first(value: &Value, _args: &[Value]) -> Value {
    match value {
        Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
        Value::String(s) => Value::String(s.chars().next().map(String::from).unwrap_or_default()),
        _ => Value::Null,
    }
}

/// Last element of an array or last character of a string.
pub fn last(value: &Value, _args: &[Value]) -> Value {
    match value {
        Value::Array(items) => items.last().cloned().unwrap_or(Value::Null),
        Value::String(s) => Value::String(s.chars().last().map(String::from).unwrap_or_default()),
        _ => Value::Null,
    }
}

/// Projects each item onto one property. Items that are not objects or
/// arrays pass through unchanged.
pub fn map(value: &Value, args: &[Value]) -> Value {
    let Value::Array(items) = value else {
        return value.clone();
    };
    let Some(prop) = truthy_arg(args, 0).map(to_display_string) else {
        return value.clone();
    };
    Value::Array(
        items
            .iter()
            .map(|item| {
                if is_container(item) {
                    member(item, &prop).cloned().unwrap_or(Value::Null)
                } else {
                    item.clone()
                }
            })
            .collect(),
    )
}

/// Keeps the items whose `prop` equals `val`.
///
/// `"true"`/`"false"` and booleans match boolean properties exactly; when both
/// sides read as numbers they are compared numerically; otherwise equality is
/// strict. Items that are not objects are compared to `prop` itself.
pub fn filter(value: &Value, args: &[Value]) -> Value {
    let Value::Array(items) = value else {
        return value.clone();
    };
    let Some(prop_value) = truthy_arg(args, 0) else {
        return value.clone();
    };
    let prop = to_display_string(prop_value);
    let expected = args.get(1);

    Value::Array(
        items
            .iter()
            .filter(|item| {
                if is_container(item) {
                    matches_property(member(item, &prop), expected)
                } else {
                    strict_equals(item, prop_value)
                }
            })
            .cloned()
            .collect(),
    )
}

#[allow(clippy::float_cmp)]
fn matches_property(actual: Option<&Value>, expected: Option<&Value>) -> bool {
    let Some(expected) = expected else {
        return actual.is_none();
    };
    match expected {
        Value::String(s) if s == "true" => return actual == Some(&Value::Bool(true)),
        Value::String(s) if s == "false" => return actual == Some(&Value::Bool(false)),
        Value::Bool(b) => return actual == Some(&Value::Bool(*b)),
        _ => {}
    }
    let Some(actual) = actual else {
        return false;
    };
    let (want, have) = (to_number(expected), to_number(actual));
    if !want.is_nan() && !have.is_nan() {
        return want == have;
    }
    strict_equals(actual, expected)
}

/// Reverses an array or the characters of a string.
pub fn reverse(value: &Value, _args: &[Value]) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().rev().cloned().collect()),
        Value::String(s) => Value::String(s.chars().rev().collect()),
        other => other.clone(),
    }
}

/// Stable sort. Without an argument items compare as strings; with a
/// property name items compare by that property.
pub fn sort(value: &Value, args: &[Value]) -> Value {
    let Value::Array(items) = value else {
        return value.clone();
    };
    let mut sorted = items.clone();
    if let Some(prop) = truthy_arg(args, 0).map(to_display_string) {
        sorted.sort_by(|a, b| {
            let a = if is_container(a) { member(a, &prop) } else { Some(a) };
            let b = if is_container(b) { member(b, &prop) } else { Some(b) };
            match (a, b) {
                (Some(a), Some(b)) => loose_compare(a, b),
                _ => Ordering::Equal,
            }
        });
    } else {
        sorted.sort_by_cached_key(to_display_string);
    }
    Value::Array(sorted)
}

/// Relational comparison: strings compare lexically, anything else
/// numerically; incomparable pairs are equal.
fn loose_compare(a: &Value, b: &Value) -> Ordering {
    if let (Value::String(x), Value::String(y)) = (a, b) {
        return x.cmp(y);
    }
    to_number(a).partial_cmp(&to_number(b)).unwrap_or(Ordering::Equal)
}

/// Removes duplicate scalars, keeping first occurrences. Objects and arrays
/// are always kept.
pub fn unique(value: &Value, _args: &[Value]) -> Value {
    let Value::Array(items) = value else {
        return value.clone();
    };
    let mut seen: Vec<&Value> = Vec::new();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if is_container(item) {
            out.push(item.clone());
        } else if !seen.iter().any(|s| strict_equals(s, item)) {
            seen.push(item);
            out.push(item.clone());
        }
    }
    Value::Array(out)
}
