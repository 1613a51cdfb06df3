//! Error types for jsonblade.
//!
//! Template problems are described by a structured [`TemplateError`] value that
//! flows through the error policy in [`crate::settings::handle_template_error`].
//! When the policy decides to fail, the value is wrapped in a
//! [`TemplateException`], which in turn is carried by the crate-wide
//! [`JsonBladeError`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The category of a structured template error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateErrorKind {
    /// A filter referenced by an expression is not registered anywhere.
    UnknownFilter,
    /// The template is structurally malformed, or the rendered text is not JSON.
    InvalidSyntax,
    /// A filter failed while being applied.
    FilterError,
    /// An expression failed while being evaluated.
    EvaluationError,
}

impl TemplateErrorKind {
    /// Returns the wire tag for this kind (e.g. `UNKNOWN_FILTER`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownFilter => "UNKNOWN_FILTER",
            Self::InvalidSyntax => "INVALID_SYNTAX",
            Self::FilterError => "FILTER_ERROR",
            Self::EvaluationError => "EVALUATION_ERROR",
        }
    }
}

impl fmt::Display for TemplateErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured template error.
///
/// # Examples
///
/// ```
/// use jsonblade_core::error::{TemplateError, TemplateErrorKind};
///
/// let err = TemplateError::new(TemplateErrorKind::UnknownFilter, "Unknown filter: shout")
///     .with_filter("shout")
///     .with_expression("name | shout");
/// assert_eq!(err.kind.as_str(), "UNKNOWN_FILTER");
/// assert_eq!(err.filter.as_deref(), Some("shout"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateError {
    /// The error category.
    #[serde(rename = "type")]
    pub kind: TemplateErrorKind,
    /// A human-readable message.
    pub message: String,
    /// The filter involved, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// The expression being evaluated, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Byte offset into the template source, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

impl TemplateError {
    /// Creates a new error with only a kind and message.
    pub fn new(kind: TemplateErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            filter: None,
            expression: None,
            position: None,
        }
    }

    /// Attaches the filter name.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Attaches the expression text.
    #[must_use]
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    /// Attaches a byte offset into the template.
    #[must_use]
    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(position) = self.position {
            write!(f, " (at offset {position})")?;
        }
        Ok(())
    }
}

/// A template error raised as a hard failure because `throw_on_error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .error.message)]
pub struct TemplateException {
    /// The structured error that triggered the failure.
    pub error: TemplateError,
    /// The offending template text, when the caller attached it.
    pub template: Option<String>,
}

impl TemplateException {
    /// Wraps a structured error.
    pub const fn new(error: TemplateError) -> Self {
        Self {
            error,
            template: None,
        }
    }

    /// Attaches the template source.
    #[must_use]
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Shortcut for `self.error.kind`.
    pub const fn kind(&self) -> TemplateErrorKind {
        self.error.kind
    }
}

/// The primary error type for jsonblade.
#[derive(Error, Debug)]
pub enum JsonBladeError {
    // ── Templates ────────────────────────────────────────────────────

    /// A structured template error escalated by the error policy.
    #[error("Template error: {0}")]
    Template(#[from] TemplateException),

    /// A host function returned an error. These are never converted into
    /// structured template errors.
    #[error("Function '{name}' failed: {message}")]
    Function {
        /// The host function name.
        name: String,
        /// The failure message reported by the function.
        message: String,
    },

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ── Serialization ────────────────────────────────────────────────

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl JsonBladeError {
    /// Returns the structured template error, when this is a template failure.
    pub const fn template_error(&self) -> Option<&TemplateError> {
        match self {
            Self::Template(exception) => Some(&exception.error),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for JsonBladeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// A convenience result type for jsonblade operations.
pub type JsonBladeResult<T> = Result<T, JsonBladeError>;
