//! Asynchronous filters.
//!
//! An async filter takes ownership of its input and returns a boxed future,
//! so it can await I/O before producing the filtered value. Async filters are
//! only consulted by the async compile path; the sync path substitutes a
//! placeholder and logs a warning.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, OnceLock, RwLock};

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use crate::filters::FilterResult;

/// A registered async filter function.
pub type AsyncFilterFn = Arc<dyn Fn(Value, Vec<Value>) -> BoxFuture<'static, FilterResult> + Send + Sync>;

/// Wraps an async closure as an [`AsyncFilterFn`].
pub fn async_filter_fn<F, Fut>(f: F) -> AsyncFilterFn
where
    F: Fn(Value, Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FilterResult> + Send + 'static,
{
    Arc::new(move |value, args| f(value, args).boxed())
}

/// A registry of async filters, keyed by name.
#[derive(Clone, Default)]
pub struct AsyncFilterRegistry {
    filters: HashMap<String, AsyncFilterFn>,
}

impl fmt::Debug for AsyncFilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncFilterRegistry")
            .field("filters", &self.names())
            .finish()
    }
}

impl AsyncFilterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an async filter, replacing any existing one with the same name.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(Value, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FilterResult> + Send + 'static,
    {
        self.filters.insert(name.into(), async_filter_fn(f));
    }

    /// Registers an already shared async filter function.
    pub fn register_fn(&mut self, name: impl Into<String>, f: AsyncFilterFn) {
        self.filters.insert(name.into(), f);
    }

    /// Registers several async filters at once.
    pub fn register_many<I, S>(&mut self, filters: I)
    where
        I: IntoIterator<Item = (S, AsyncFilterFn)>,
        S: Into<String>,
    {
        for (name, f) in filters {
            self.register_fn(name, f);
        }
    }

    /// Returns the async filter registered under `name`.
    pub fn get(&self, name: &str) -> Option<AsyncFilterFn> {
        self.filters.get(name).cloned()
    }

    /// Returns `true` if `name` is registered.
    pub fn has(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Removes an async filter. Returns `true` if it was registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.filters.remove(name).is_some()
    }

    /// Returns the registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns a copy of every registered async filter.
    pub fn all(&self) -> HashMap<String, AsyncFilterFn> {
        self.filters.clone()
    }

    /// Returns the number of registered async filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns `true` if no async filter is registered.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

/// Returns the process-wide async filter registry. It starts empty.
pub fn global_async_registry() -> &'static RwLock<AsyncFilterRegistry> {
    static REGISTRY: OnceLock<RwLock<AsyncFilterRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(AsyncFilterRegistry::new()))
}

/// Registers an async filter in the global registry.
pub fn register_async_filter<F, Fut>(name: impl Into<String>, f: F)
where
    F: Fn(Value, Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FilterResult> + Send + 'static,
{
    global_async_registry()
        .write()
        .expect("async filter registry lock poisoned")
        .register(name, f);
}

/// Registers several async filters in the global registry.
pub fn register_async_filters<I, S>(filters: I)
where
    I: IntoIterator<Item = (S, AsyncFilterFn)>,
    S: Into<String>,
{
    global_async_registry()
        .write()
        .expect("async filter registry lock poisoned")
        .register_many(filters);
}

/// Looks up an async filter in the global registry.
pub fn get_async_filter(name: &str) -> Option<AsyncFilterFn> {
    global_async_registry()
        .read()
        .expect("async filter registry lock poisoned")
        .get(name)
}

/// Returns `true` if the global registry has an async filter named `name`.
pub fn has_async_filter(name: &str) -> bool {
    global_async_registry()
        .read()
        .expect("async filter registry lock poisoned")
        .has(name)
}

/// Removes an async filter from the global registry.
pub fn unregister_async_filter(name: &str) -> bool {
    global_async_registry()
        .write()
        .expect("async filter registry lock poisoned")
        .unregister(name)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::filters::FilterError;

    #[tokio::test]
    async fn test_register_and_call() {
        let mut registry = AsyncFilterRegistry::new();
        registry.register("shout", |value: Value, _args: Vec<Value>| async move {
            Ok(json!(format!("{}!", value.as_str().unwrap_or_default())))
        });
        let f = registry.get("shout").unwrap();
        assert_eq!(f(json!("hi"), vec![]).await.unwrap(), json!("hi!"));
    }

    #[tokio::test]
    async fn test_async_filter_error() {
        let f = async_filter_fn(|_value: Value, _args: Vec<Value>| async move {
            Err(FilterError::new("lookup failed"))
        });
        assert_eq!(f(Value::Null, vec![]).await.unwrap_err().to_string(), "lookup failed");
    }

    #[test]
    fn test_unregister_and_names() {
        let mut registry = AsyncFilterRegistry::new();
        registry.register("b", |v: Value, _: Vec<Value>| async move { Ok(v) });
        registry.register("a", |v: Value, _: Vec<Value>| async move { Ok(v) });
        assert_eq!(registry.names(), vec!["a", "b"]);
        assert!(registry.unregister("a"));
        assert!(!registry.has("a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_global_async_registry() {
        register_async_filter("test_async_identity", |v: Value, _: Vec<Value>| async move { Ok(v) });
        assert!(has_async_filter("test_async_identity"));
        assert!(get_async_filter("test_async_identity").is_some());
        assert!(unregister_async_filter("test_async_identity"));
        assert!(!has_async_filter("test_async_identity"));
    }
}
