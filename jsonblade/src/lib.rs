//! # jsonblade
//!
//! A JSON templating engine. Templates are JSON text with `{{ }}` markers for
//! expressions, filter chains, conditionals, loops and variables; compiling a
//! template against data yields a JSON value.
//!
//! This is the meta-crate that re-exports the sub-crates. Depend on it for
//! everything, or on individual crates for finer-grained control.
//!
//! ```
//! # #[cfg(feature = "template")]
//! # {
//! use jsonblade::template::compile_json_template;
//! use serde_json::json;
//!
//! let out = compile_json_template(
//!     r#"{"names": [{{#each users}}"{{name | upper}}"{{#unless @last}},{{/unless}}{{/each}}]}"#,
//!     &json!({"users": [{"name": "ann"}, {"name": "bob"}]}),
//!     &[],
//! )
//! .unwrap();
//! assert_eq!(out, json!({"names": ["ANN", "BOB"]}));
//! # }
//! ```

/// Errors, template configuration, the error policy and logging.
pub use jsonblade_core as core;

/// Lexer, parser, filters and the sync/async evaluator.
#[cfg(feature = "template")]
pub use jsonblade_template as template;

/// Data-shape analysis for editor integrations.
#[cfg(feature = "schema")]
pub use jsonblade_schema as schema;

/// The `jsonblade` command-line tool's command framework.
#[cfg(feature = "cli")]
pub use jsonblade_cli as cli;

pub use jsonblade_core::{JsonBladeError, JsonBladeResult, TemplateConfig, TemplateConfigPatch};
#[cfg(feature = "template")]
pub use jsonblade_template::{
    compile_json_template, compile_json_template_async, JsonBlade, JsonBladeOptions,
    TemplateFunction,
};

/// Re-exported so callers can build data without adding the dependency.
pub use serde_json;
/// Re-exported for callers that log alongside the engine.
pub use tracing;
