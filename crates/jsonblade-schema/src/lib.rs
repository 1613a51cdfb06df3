//! # jsonblade-schema
//!
//! Data-shape analysis for editor integrations. [`analyze_data_structure`]
//! summarizes sample data as a [`DataStructure`] tree; [`properties_for_path`]
//! and [`validate_path`] answer completion and "does this path exist"
//! questions against it.
//!
//! ## Usage
//!
//! ```
//! use jsonblade_schema::{analyze, properties_for_path, validate_path};
//! use serde_json::json;
//!
//! let schema = analyze(&json!({"users": [{"name": "Ann", "age": 30}]}));
//! assert!(validate_path("users.name", &schema));
//! assert!(!validate_path("users.email", &schema));
//! assert_eq!(properties_for_path("users", &schema), vec!["age", "name"]);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How deep [`analyze`] descends before summarizing a value by its type alone.
pub const MAX_ANALYSIS_DEPTH: usize = 5;

/// Array elements merged into an array-of-objects item shape.
const MERGED_ARRAY_ITEMS: usize = 5;

/// Metadata keys that are not data properties.
const RESERVED_KEYS: [&str; 3] = ["type", "items", "value"];

/// The shape of a value.
///
/// Serialized flat, the way editor integrations consume it:
/// `{"type": "object", "name": {"type": "string", "value": "Ann"}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataStructure {
    /// `"string"`, `"number"`, `"boolean"`, `"null"`, `"array"`, `"object"`
    /// or `"unknown"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The element shape, for arrays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<DataStructure>>,
    /// The sample value, for truthy scalars.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Property shapes, for objects.
    #[serde(flatten)]
    pub fields: BTreeMap<String, DataStructure>,
}

impl DataStructure {
    fn of_kind(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ..Self::default()
        }
    }

    /// Returns `true` for array shapes that describe their elements.
    pub fn is_array(&self) -> bool {
        self.kind == "array" && self.items.is_some()
    }

    /// Later shapes overwrite earlier ones key by key.
    fn merge(&mut self, other: Self) {
        self.kind = other.kind;
        if other.items.is_some() {
            self.items = other.items;
        }
        if other.value.is_some() {
            self.value = other.value;
        }
        self.fields.extend(other.fields);
    }

    /// One path step: the named property, with arrays stepping into their
    /// element shape.
    fn step(&self, part: &str) -> Option<&Self> {
        let next = self.fields.get(part)?;
        match &next.items {
            Some(items) if next.kind == "array" => Some(items),
            _ => Some(next),
        }
    }

    fn walk(&self, path: &str) -> Option<&Self> {
        path.split('.').try_fold(self, |current, part| current.step(part))
    }
}

/// The type name reported for a value.
fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Falsy values carry no sample: `null`, `false`, `0` and `""`.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Analyzes `value` with the default depth limit.
pub fn analyze(value: &Value) -> DataStructure {
    analyze_data_structure(value, MAX_ANALYSIS_DEPTH)
}

/// Summarizes the shape of `value`, descending at most `max_depth` levels.
///
/// Falsy values and values past the depth limit carry only their type.
/// An empty array has items of type `"unknown"`. An array whose first
/// element is an object merges the shapes of its first five elements;
/// any other array takes the shape of its first element.
pub fn analyze_data_structure(value: &Value, max_depth: usize) -> DataStructure {
    analyze_at(value, max_depth, 0)
}

fn analyze_at(value: &Value, max_depth: usize, depth: usize) -> DataStructure {
    if is_falsy(value) || depth > max_depth {
        return DataStructure::of_kind(type_name(value));
    }

    match value {
        Value::Array(items) => {
            let Some(first) = items.first() else {
                return DataStructure {
                    items: Some(Box::new(DataStructure::of_kind("unknown"))),
                    ..DataStructure::of_kind("array")
                };
            };
            let mut shape = analyze_at(first, max_depth, depth + 1);
            if shape.kind == "object" {
                for item in items.iter().take(MERGED_ARRAY_ITEMS).skip(1) {
                    shape.merge(analyze_at(item, max_depth, depth + 1));
                }
            }
            DataStructure {
                items: Some(Box::new(shape)),
                ..DataStructure::of_kind("array")
            }
        }
        Value::Object(map) => DataStructure {
            fields: map
                .iter()
                .map(|(key, field)| (key.clone(), analyze_at(field, max_depth, depth + 1)))
                .collect(),
            ..DataStructure::of_kind("object")
        },
        scalar => DataStructure {
            value: Some(scalar.clone()),
            ..DataStructure::of_kind(type_name(scalar))
        },
    }
}

/// Lists the property names available at `path`, sorted. Arrays along the
/// path are stepped through to their element shape. Unknown paths yield
/// nothing.
pub fn properties_for_path(path: &str, schema: &DataStructure) -> Vec<String> {
    let Some(node) = schema.walk(path) else {
        tracing::debug!(path, "no schema node for path");
        return Vec::new();
    };
    node.fields
        .keys()
        .filter(|key| !RESERVED_KEYS.contains(&key.as_str()))
        .cloned()
        .collect()
}

/// Returns `true` if every segment of `path` names a property, stepping
/// through arrays of objects via their element shape.
pub fn validate_path(path: &str, schema: &DataStructure) -> bool {
    schema.walk(path).is_some()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    // ── Analysis ────────────────────────────────────────────────────

    #[test]
    fn test_scalars_carry_samples() {
        assert_eq!(
            analyze(&json!("Ann")),
            DataStructure {
                value: Some(json!("Ann")),
                ..DataStructure::of_kind("string")
            }
        );
        assert_eq!(analyze(&json!(3)).value, Some(json!(3)));
        assert_eq!(analyze(&json!(true)).kind, "boolean");
    }

    #[test]
    fn test_falsy_values_carry_only_type() {
        assert_eq!(analyze(&json!(0)), DataStructure::of_kind("number"));
        assert_eq!(analyze(&json!("")), DataStructure::of_kind("string"));
        assert_eq!(analyze(&json!(false)), DataStructure::of_kind("boolean"));
        assert_eq!(analyze(&Value::Null), DataStructure::of_kind("null"));
    }

    #[test]
    fn test_empty_array_items_unknown() {
        let shape = analyze(&json!([]));
        assert!(shape.is_array());
        assert_eq!(shape.items.unwrap().kind, "unknown");
    }

    #[test]
    fn test_object_arrays_merge_first_five() {
        let data = json!([{"a": 1}, {"b": 2}, {"c": 3}, {"d": 4}, {"e": 5}, {"f": 6}]);
        let items = analyze(&data).items.unwrap();
        let keys: Vec<&str> = items.fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_scalar_arrays_use_first_item() {
        let items = analyze(&json!(["x", 2])).items.unwrap();
        assert_eq!(items.kind, "string");
        assert_eq!(items.value, Some(json!("x")));
    }

    #[test]
    fn test_depth_limit() {
        let data = json!({"a": {"b": {"c": 1}}});
        let shape = analyze_data_structure(&data, 1);
        let b = &shape.fields["a"].fields["b"];
        assert_eq!(b, &DataStructure::of_kind("object"));
    }

    #[test]
    fn test_serializes_flat() {
        let shape = analyze(&json!({"name": "Ann", "tags": []}));
        assert_eq!(
            serde_json::to_value(&shape).unwrap(),
            json!({
                "type": "object",
                "name": {"type": "string", "value": "Ann"},
                "tags": {"type": "array", "items": {"type": "unknown"}}
            })
        );
    }

    // ── Paths ───────────────────────────────────────────────────────

    #[test]
    fn test_validate_path_through_arrays() {
        let schema = analyze(&json!({"orders": [{"lines": [{"sku": "x"}]}]}));
        assert!(validate_path("orders", &schema));
        assert!(validate_path("orders.lines.sku", &schema));
        assert!(!validate_path("orders.lines.qty", &schema));
        assert!(!validate_path("", &schema));
    }

    #[test]
    fn test_properties_for_path() {
        let schema = analyze(&json!({"user": {"name": "Ann", "address": {"city": "Paris"}}}));
        assert_eq!(properties_for_path("user", &schema), vec!["address", "name"]);
        assert_eq!(properties_for_path("user.address", &schema), vec!["city"]);
        assert!(properties_for_path("user.name", &schema).is_empty());
        assert!(properties_for_path("nope", &schema).is_empty());
    }
}
