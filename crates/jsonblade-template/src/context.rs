//! Template context and dotted-path resolution.
//!
//! A [`Context`] is the caller's data plus a stack of scopes layered on top
//! of it: computed `set` variables, and inside loops the loop metadata and the
//! current item's own keys. Layers are shared through [`Arc`], so pushing a
//! scope for a loop iteration never copies or mutates the caller's data.

use std::sync::Arc;

use serde_json::{Map, Value};

/// Resolves a dotted path (`user.address.city`, `items.0.name`,
/// `items.length`) against a value.
///
/// Resolution is null-safe: the moment an intermediate value is not an object
/// or array, or a key is missing, the result is `None`.
pub fn lookup_path<'v>(path: &str, value: &'v Value) -> Option<&'v Value> {
    path.split('.').try_fold(value, |current, key| descend(current, key))
}

/// Like [`lookup_path`] but yields an owned value, `null` when absent.
///
/// # Examples
///
/// ```
/// use jsonblade_template::context::resolve_path;
/// use serde_json::json;
///
/// let data = json!({"user": {"tags": ["a", "b"]}});
/// assert_eq!(resolve_path("user.tags.1", &data), json!("b"));
/// assert_eq!(resolve_path("user.tags.length", &data), json!(2));
/// assert_eq!(resolve_path("user.missing.deeper", &data), json!(null));
/// ```
pub fn resolve_path(path: &str, value: &Value) -> Value {
    match path.split_once('.') {
        None => descend_owned(value, path),
        Some(_) => {
            let (parent, last) = path.rsplit_once('.').unwrap_or(("", path));
            lookup_path(parent, value).map_or(Value::Null, |v| descend_owned(v, last))
        }
    }
}

fn descend<'v>(value: &'v Value, key: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// One step of resolution that also understands the computed `length` of
/// arrays.
fn descend_owned(value: &Value, key: &str) -> Value {
    match (value, key) {
        (Value::Array(items), "length") => Value::from(items.len()),
        _ => descend(value, key).cloned().unwrap_or(Value::Null),
    }
}

/// The data a template is evaluated against.
#[derive(Debug, Clone)]
pub struct Context {
    root: Arc<Value>,
    scopes: Vec<Arc<Map<String, Value>>>,
}

impl Context {
    /// Creates a context over the caller's data.
    pub fn new(root: Value) -> Self {
        Self {
            root: Arc::new(root),
            scopes: Vec::new(),
        }
    }

    /// Returns a new context with `scope` layered on top of this one.
    #[must_use]
    pub fn child(&self, scope: Map<String, Value>) -> Self {
        let mut scopes = self.scopes.clone();
        scopes.push(Arc::new(scope));
        Self {
            root: Arc::clone(&self.root),
            scopes,
        }
    }

    /// Resolves a dotted path. The first segment is looked up in the scopes,
    /// innermost first, then in the data; the remaining segments descend from
    /// there. Missing paths resolve to `null`.
    pub fn resolve(&self, path: &str) -> Value {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let scoped = self.scopes.iter().rev().find_map(|scope| scope.get(head));
        match (scoped, rest) {
            (Some(value), None) => value.clone(),
            (Some(value), Some(rest)) => resolve_path(rest, value),
            (None, _) => resolve_path(path, &self.root),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    // ── Path resolution ─────────────────────────────────────────────

    #[test]
    fn test_resolve_simple_and_nested() {
        let data = json!({"name": "Ada", "user": {"address": {"city": "Paris"}}});
        assert_eq!(resolve_path("name", &data), json!("Ada"));
        assert_eq!(resolve_path("user.address.city", &data), json!("Paris"));
    }

    #[test]
    fn test_resolve_is_null_safe() {
        let data = json!({"user": null, "n": 3});
        assert_eq!(resolve_path("user.name", &data), Value::Null);
        assert_eq!(resolve_path("missing.a.b", &data), Value::Null);
        assert_eq!(resolve_path("n.value", &data), Value::Null);
        assert_eq!(resolve_path("a.b", &Value::Null), Value::Null);
        assert_eq!(resolve_path("", &data), Value::Null);
    }

    #[test]
    fn test_resolve_arrays() {
        let data = json!({"items": [{"id": 1}, {"id": 2}]});
        assert_eq!(resolve_path("items.1.id", &data), json!(2));
        assert_eq!(resolve_path("items.length", &data), json!(2));
        assert_eq!(resolve_path("items.5.id", &data), Value::Null);
        assert_eq!(resolve_path("items.first", &data), Value::Null);
    }

    #[test]
    fn test_strings_are_not_indexable() {
        let data = json!({"s": "abc"});
        assert_eq!(resolve_path("s.0", &data), Value::Null);
        assert_eq!(resolve_path("s.length", &data), Value::Null);
    }

    // ── Context ─────────────────────────────────────────────────────

    #[test]
    fn test_context_scopes_shadow_data() {
        let ctx = Context::new(json!({"name": "outer", "keep": 1}));
        let mut scope = Map::new();
        scope.insert("name".to_string(), json!("inner"));
        let child = ctx.child(scope);

        assert_eq!(child.resolve("name"), json!("inner"));
        assert_eq!(child.resolve("keep"), json!(1));
        assert_eq!(ctx.resolve("name"), json!("outer"));
    }

    #[test]
    fn test_context_scoped_null_shadows() {
        let ctx = Context::new(json!({"v": 1}));
        let mut scope = Map::new();
        scope.insert("v".to_string(), Value::Null);
        assert_eq!(ctx.child(scope).resolve("v"), Value::Null);
    }

    #[test]
    fn test_context_descends_into_scoped_values() {
        let ctx = Context::new(json!({}));
        let mut scope = Map::new();
        scope.insert("this".to_string(), json!({"tags": ["x", "y"]}));
        let child = ctx.child(scope);
        assert_eq!(child.resolve("this.tags.0"), json!("x"));
        assert_eq!(child.resolve("this.tags.length"), json!(2));
    }

    #[test]
    fn test_context_non_object_root() {
        let ctx = Context::new(json!([10, 20]));
        assert_eq!(ctx.resolve("1"), json!(20));
        assert_eq!(ctx.resolve("length"), json!(2));
    }
}
