//! Template configuration and the error policy.
//!
//! [`TemplateConfig`] holds the switches that govern how the engine treats
//! problems (strict mode, throw-on-error, debug logging), the marker
//! delimiters, and whether globally registered filters may override builtins.
//!
//! A process-wide instance is available through [`template_config`] and
//! [`set_template_config`]. Engine entry points take a `&TemplateConfig`
//! explicitly, so independently configured compilers can coexist; the global
//! instance is only the default they start from.

use std::sync::RwLock;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{TemplateError, TemplateException};

/// The opening and closing markers of template expressions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delimiters {
    /// The opening marker, `{{` by default.
    pub start: String,
    /// The closing marker, `}}` by default.
    pub end: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            start: "{{".to_string(),
            end: "}}".to_string(),
        }
    }
}

/// Template engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemplateConfig {
    /// Report structural template problems instead of degrading them to text.
    pub strict_mode: bool,
    /// Turn structured errors into hard failures instead of warnings.
    pub throw_on_error: bool,
    /// Let globally registered filters win over builtins seeded into a compiler.
    pub allow_filter_override: bool,
    /// Expression markers.
    pub delimiters: Delimiters,
    /// Log every structured error at debug level before handling it.
    pub debug: bool,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            strict_mode: false,
            throw_on_error: false,
            allow_filter_override: true,
            delimiters: Delimiters::default(),
            debug: false,
        }
    }
}

/// A partial update to a [`TemplateConfig`].
///
/// Every provided field replaces the current value. `delimiters` is replaced
/// as a whole object, never merged key by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemplateConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throw_on_error: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_filter_override: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiters: Option<Delimiters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
}

impl TemplateConfigPatch {
    /// Returns `true` if the patch changes nothing.
    pub const fn is_empty(&self) -> bool {
        self.strict_mode.is_none()
            && self.throw_on_error.is_none()
            && self.allow_filter_override.is_none()
            && self.delimiters.is_none()
            && self.debug.is_none()
    }
}

impl From<TemplateConfig> for TemplateConfigPatch {
    fn from(config: TemplateConfig) -> Self {
        Self {
            strict_mode: Some(config.strict_mode),
            throw_on_error: Some(config.throw_on_error),
            allow_filter_override: Some(config.allow_filter_override),
            delimiters: Some(config.delimiters),
            debug: Some(config.debug),
        }
    }
}

impl TemplateConfig {
    /// Applies a partial update in place.
    pub fn apply(&mut self, patch: &TemplateConfigPatch) {
        if let Some(strict_mode) = patch.strict_mode {
            self.strict_mode = strict_mode;
        }
        if let Some(throw_on_error) = patch.throw_on_error {
            self.throw_on_error = throw_on_error;
        }
        if let Some(allow) = patch.allow_filter_override {
            self.allow_filter_override = allow;
        }
        if let Some(delimiters) = &patch.delimiters {
            self.delimiters = delimiters.clone();
        }
        if let Some(debug) = patch.debug {
            self.debug = debug;
        }
    }

    /// Returns a copy of this configuration with the patch applied.
    #[must_use]
    pub fn patched(&self, patch: &TemplateConfigPatch) -> Self {
        let mut config = self.clone();
        config.apply(patch);
        config
    }
}

static TEMPLATE_CONFIG: Lazy<RwLock<TemplateConfig>> =
    Lazy::new(|| RwLock::new(TemplateConfig::default()));

/// Updates the process-wide template configuration.
pub fn set_template_config(patch: &TemplateConfigPatch) {
    TEMPLATE_CONFIG
        .write()
        .expect("template config lock poisoned")
        .apply(patch);
}

/// Returns a copy of the process-wide template configuration.
pub fn template_config() -> TemplateConfig {
    TEMPLATE_CONFIG
        .read()
        .expect("template config lock poisoned")
        .clone()
}

/// Restores the process-wide configuration to its defaults.
pub fn reset_template_config() {
    *TEMPLATE_CONFIG
        .write()
        .expect("template config lock poisoned") = TemplateConfig::default();
}

/// Routes a structured template error through the configured policy.
///
/// With `debug` set the error is logged at debug level first. With
/// `throw_on_error` set the error is returned as a [`TemplateException`];
/// otherwise a warning is logged and evaluation continues.
pub fn handle_template_error(
    error: TemplateError,
    config: &TemplateConfig,
) -> Result<(), TemplateException> {
    if config.debug {
        tracing::debug!(
            kind = %error.kind,
            filter = error.filter.as_deref(),
            expression = error.expression.as_deref(),
            position = error.position,
            "Template Error: {}",
            error.message
        );
    }

    if config.throw_on_error {
        return Err(TemplateException::new(error));
    }

    tracing::warn!("Template Warning [{}]: {}", error.kind, error.message);
    Ok(())
}

/// Settings for embedding applications and the command-line tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Log filter directive (e.g. "info", "jsonblade_template=debug").
    pub log_level: String,
    /// Pretty, human-readable logs when `true`; JSON logs otherwise.
    pub debug: bool,
    /// Overrides applied on top of the default template configuration.
    pub template: TemplateConfigPatch,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            debug: false,
            template: TemplateConfigPatch::default(),
        }
    }
}

impl Settings {
    /// Resolves the full template configuration these settings describe.
    pub fn template_config(&self) -> TemplateConfig {
        TemplateConfig::default().patched(&self.template)
    }
}
