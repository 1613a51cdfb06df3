//! # jsonblade-template
//!
//! The jsonblade template engine. A template is JSON text with `{{ }}`
//! markers: expressions with filter chains, `#if`/`#else`, `#unless`,
//! `#each` and `#set` blocks, and `{{!-- comments --}}`. Compiling a template
//! against data yields a [`serde_json::Value`].
//!
//! ## Modules
//!
//! - [`value`] - Loose coercion rules shared by filters and conditions
//! - [`context`] - Dotted path resolution and layered scopes
//! - [`lexer`] - Delimiter-aware tokenizer
//! - [`parser`] - Recursive-descent parser producing a node tree
//! - [`expression`] - `base | filter(args)` expressions
//! - [`filters`] - The filter registry and the builtin filter groups
//! - [`async_filters`] - Async filters, used by the async compile path
//! - [`functions`] - Host functions callable from expressions
//! - [`engine`] - The evaluator and the global convenience functions
//! - [`facade`] - [`JsonBlade`], a compiler with its own filters and configuration
//!
//! ## Quick start
//!
//! ```
//! use jsonblade_template::compile_json_template;
//! use serde_json::json;
//!
//! let out = compile_json_template(
//!     r#"{"adults": {{users | filter(age, 25) | map(name)}}}"#,
//!     &json!({"users": [{"name": "a", "age": 25}, {"name": "b", "age": 30}]}),
//!     &[],
//! )
//! .unwrap();
//! assert_eq!(out, json!({"adults": ["a"]}));
//! ```

pub mod async_filters;
pub mod context;
pub mod engine;
pub mod expression;
pub mod facade;
pub mod filters;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

pub use async_filters::{
    async_filter_fn, get_async_filter, has_async_filter, register_async_filter,
    register_async_filters, unregister_async_filter, AsyncFilterFn, AsyncFilterRegistry,
};
pub use context::Context;
pub use engine::{
    compile_json_template, compile_json_template_async, evaluate_expression,
    evaluate_expression_async, Compiler, FilterResolver, GlobalFilters, Mode,
};
pub use facade::{JsonBlade, JsonBladeOptions};
pub use filters::{
    filter_fn, get_filter, has_filter, register_filter, register_filters, unregister_filter,
    FilterError, FilterFn, FilterRegistry, FilterResult,
};
pub use functions::{FunctionError, FunctionResult, TemplateFunction};
