//! Template filters.
//!
//! A filter transforms the running value of an expression:
//! `{{ value | name(arg1, arg2) }}` calls the filter `name` with the value
//! and the resolved arguments. Filters live in a [`FilterRegistry`], a plain
//! name-to-function map where the last registration wins.
//!
//! The builtin filters come in seven groups, each in its own module and each
//! registrable on its own:
//!
//! - [`string`] - `upper`, `lower`, `capitalize`, `trim`, `default`, `slug`
//! - [`array`] - `join`, `length`, `first`, `last`, `map`, `filter`, `reverse`, `sort`, `unique`
//! - [`object`] - `json`, `keys`, `values`, `entries`, `get`, `has`
//! - [`logic`] - `equals`, `not`, `bool`, `gt`, `gte`, `lt`, `lte`, `contains`, ...
//! - [`date`] - `formatDate`, `fromNow`, `addDays`, `isoDate`, `timestamp`
//! - [`number`] - `round`, `ceil`, `floor`, `abs`, `currency`, `percentage`, arithmetic
//! - [`validation`] - predicates, encodings and escaping
//!
//! Builtins never fail: odd input produces a safe fallback value.

pub mod array;
pub mod date;
pub mod logic;
pub mod number;
pub mod object;
pub mod string;
pub mod validation;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

use serde_json::Value;
use thiserror::Error;

/// The error a filter reports when it cannot produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct FilterError(pub String);

impl FilterError {
    /// Creates a filter error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The result of applying a filter.
pub type FilterResult = Result<Value, FilterError>;

/// A registered filter function: `(value, args) -> value`.
pub type FilterFn = Arc<dyn Fn(&Value, &[Value]) -> FilterResult + Send + Sync>;

/// A builtin filter. Builtins are infallible.
pub type BuiltinFilter = fn(&Value, &[Value]) -> Value;

/// Wraps a closure as a [`FilterFn`].
pub fn filter_fn<F>(f: F) -> FilterFn
where
    F: Fn(&Value, &[Value]) -> FilterResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wraps a builtin as a [`FilterFn`].
pub fn builtin(f: BuiltinFilter) -> FilterFn {
    Arc::new(move |value: &Value, args: &[Value]| Ok(f(value, args)))
}

/// A registry of filters, keyed by name.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: HashMap<String, FilterFn>,
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("filters", &self.names())
            .finish()
    }
}

impl FilterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every builtin filter.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        register_all(&mut registry);
        registry
    }

    /// Registers a filter, replacing any existing filter with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&Value, &[Value]) -> FilterResult + Send + Sync + 'static,
    {
        self.filters.insert(name.into(), Arc::new(f));
    }

    /// Registers an already shared filter function.
    pub fn register_fn(&mut self, name: impl Into<String>, f: FilterFn) {
        self.filters.insert(name.into(), f);
    }

    /// Registers several filters at once.
    pub fn register_many<I, S>(&mut self, filters: I)
    where
        I: IntoIterator<Item = (S, FilterFn)>,
        S: Into<String>,
    {
        for (name, f) in filters {
            self.register_fn(name, f);
        }
    }

    /// Registers a builtin filter.
    pub fn register_builtin(&mut self, name: impl Into<String>, f: BuiltinFilter) {
        self.register_fn(name, builtin(f));
    }

    /// Returns the filter registered under `name`.
    pub fn get(&self, name: &str) -> Option<FilterFn> {
        self.filters.get(name).cloned()
    }

    /// Returns `true` if a filter is registered under `name`.
    pub fn has(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Removes a filter. Returns `true` if it was registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.filters.remove(name).is_some()
    }

    /// Applies the filter `name`, or returns `None` if it is not registered.
    pub fn apply(&self, name: &str, value: &Value, args: &[Value]) -> Option<FilterResult> {
        self.filters.get(name).map(|f| f(value, args))
    }

    /// Returns the registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns a copy of every registered filter.
    pub fn all(&self) -> HashMap<String, FilterFn> {
        self.filters.clone()
    }

    /// Returns the number of registered filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns `true` if no filters are registered.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

// ============================================================
// Builtin groups
// ============================================================

/// The string group.
pub fn string_filters() -> &'static [(&'static str, BuiltinFilter)] {
    string::FILTERS
}

/// The array group.
pub fn array_filters() -> &'static [(&'static str, BuiltinFilter)] {
    array::FILTERS
}

/// The object group.
pub fn object_filters() -> &'static [(&'static str, BuiltinFilter)] {
    object::FILTERS
}

/// The logic group.
pub fn logic_filters() -> &'static [(&'static str, BuiltinFilter)] {
    logic::FILTERS
}

/// The date group.
pub fn date_filters() -> &'static [(&'static str, BuiltinFilter)] {
    date::FILTERS
}

/// The number group.
pub fn number_filters() -> &'static [(&'static str, BuiltinFilter)] {
    number::FILTERS
}

/// The validation group.
pub fn validation_filters() -> &'static [(&'static str, BuiltinFilter)] {
    validation::FILTERS
}

fn register_group(registry: &mut FilterRegistry, group: &[(&'static str, BuiltinFilter)]) {
    for &(name, f) in group {
        registry.register_builtin(name, f);
    }
}

/// Registers the string group into `registry`.
pub fn register_string_filters(registry: &mut FilterRegistry) {
    register_group(registry, string::FILTERS);
}

/// Registers the array group into `registry`.
pub fn register_array_filters(registry: &mut FilterRegistry) {
    register_group(registry, array::FILTERS);
}

/// Registers the object group into `registry`.
pub fn register_object_filters(registry: &mut FilterRegistry) {
    register_group(registry, object::FILTERS);
}

/// Registers the logic group into `registry`.
pub fn register_logic_filters(registry: &mut FilterRegistry) {
    register_group(registry, logic::FILTERS);
}

/// Registers the date group into `registry`.
pub fn register_date_filters(registry: &mut FilterRegistry) {
    register_group(registry, date::FILTERS);
}

/// Registers the number group into `registry`.
pub fn register_number_filters(registry: &mut FilterRegistry) {
    register_group(registry, number::FILTERS);
}

/// Registers the validation group into `registry`.
pub fn register_validation_filters(registry: &mut FilterRegistry) {
    register_group(registry, validation::FILTERS);
}

/// Registers every builtin group into `registry`.
pub fn register_all(registry: &mut FilterRegistry) {
    register_string_filters(registry);
    register_array_filters(registry);
    register_object_filters(registry);
    register_logic_filters(registry);
    register_date_filters(registry);
    register_number_filters(registry);
    register_validation_filters(registry);
}

// ============================================================
// Global registry
// ============================================================

/// Returns the process-wide filter registry, seeded with every builtin on
/// first use.
pub fn global_registry() -> &'static RwLock<FilterRegistry> {
    static REGISTRY: OnceLock<RwLock<FilterRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(FilterRegistry::with_builtins()))
}

/// Registers a filter in the global registry.
pub fn register_filter<F>(name: impl Into<String>, f: F)
where
    F: Fn(&Value, &[Value]) -> FilterResult + Send + Sync + 'static,
{
    global_registry()
        .write()
        .expect("filter registry lock poisoned")
        .register(name, f);
}

/// Registers several filters in the global registry.
pub fn register_filters<I, S>(filters: I)
where
    I: IntoIterator<Item = (S, FilterFn)>,
    S: Into<String>,
{
    global_registry()
        .write()
        .expect("filter registry lock poisoned")
        .register_many(filters);
}

/// Looks up a filter in the global registry.
pub fn get_filter(name: &str) -> Option<FilterFn> {
    global_registry()
        .read()
        .expect("filter registry lock poisoned")
        .get(name)
}

/// Returns `true` if the global registry has a filter named `name`.
pub fn has_filter(name: &str) -> bool {
    global_registry()
        .read()
        .expect("filter registry lock poisoned")
        .has(name)
}

/// Removes a filter from the global registry.
pub fn unregister_filter(name: &str) -> bool {
    global_registry()
        .write()
        .expect("filter registry lock poisoned")
        .unregister(name)
}

// ============================================================
// Argument helpers
// ============================================================

static NULL: Value = Value::Null;

/// Returns argument `index`, or `null` when it was not supplied.
pub(crate) fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&NULL)
}

/// Returns argument `index` when it is supplied and truthy.
pub(crate) fn truthy_arg(args: &[Value], index: usize) -> Option<&Value> {
    args.get(index).filter(|v| crate::value::is_truthy(v))
}
