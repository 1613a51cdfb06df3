//! # jsonblade-core
//!
//! Core types shared by every jsonblade crate.
//!
//! ## Modules
//!
//! - [`error`] - Structured template errors and the crate-wide error type
//! - [`settings`] - Template configuration, the global default and the error policy
//! - [`settings_loader`] - Loading settings from TOML/JSON files and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{
    JsonBladeError, JsonBladeResult, TemplateError, TemplateErrorKind, TemplateException,
};
pub use settings::{
    handle_template_error, reset_template_config, set_template_config, template_config,
    Delimiters, Settings, TemplateConfig, TemplateConfigPatch,
};
