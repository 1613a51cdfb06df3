//! The [`JsonBlade`] facade: a compiler with its own filters and configuration.
//!
//! Several facades can live in one process with different filters and
//! policies; none of them reads the global configuration after construction.
//! Filters missing from the instance still resolve through the global
//! registries.

use std::collections::HashMap;
use std::fmt;

use jsonblade_core::error::JsonBladeResult;
use jsonblade_core::settings::{template_config, TemplateConfig, TemplateConfigPatch};
use serde_json::Value;

use crate::engine::Compiler;
use crate::filters::{
    array_filters, builtin, get_filter, logic_filters, object_filters, string_filters, FilterFn,
    FilterRegistry, FilterResult,
};
use crate::functions::TemplateFunction;

/// Construction options for [`JsonBlade`].
#[derive(Clone)]
pub struct JsonBladeOptions {
    /// Extra instance filters, registered after the builtins.
    pub filters: HashMap<String, FilterFn>,
    /// Seed the instance with the string, array, object and logic filters.
    /// `true` in [`Default`]; set it to `false` for an instance that starts
    /// with only `filters` and reaches everything else through the global
    /// registry.
    pub use_builtins: bool,
    /// Overrides applied on top of the global configuration snapshot.
    pub config: Option<TemplateConfigPatch>,
}

impl Default for JsonBladeOptions {
    fn default() -> Self {
        Self {
            filters: HashMap::new(),
            use_builtins: true,
            config: None,
        }
    }
}

impl fmt::Debug for JsonBladeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("JsonBladeOptions")
            .field("filters", &names)
            .field("use_builtins", &self.use_builtins)
            .field("config", &self.config)
            .finish()
    }
}

/// A template compiler bound to its own filter map and configuration.
///
/// # Examples
///
/// ```
/// use jsonblade_template::facade::JsonBlade;
/// use serde_json::json;
///
/// let mut blade = JsonBlade::default();
/// blade.register_filter("shout", |value, _args| {
///     Ok(json!(format!("{}!", value.as_str().unwrap_or_default())))
/// });
/// let out = blade.compile(r#"{"msg": "{{word | shout}}"}"#, &json!({"word": "hey"})).unwrap();
/// assert_eq!(out, json!({"msg": "hey!"}));
/// ```
#[derive(Debug, Clone)]
pub struct JsonBlade {
    filters: FilterRegistry,
    config: TemplateConfig,
}

impl Default for JsonBlade {
    fn default() -> Self {
        Self::new(JsonBladeOptions::default())
    }
}

impl JsonBlade {
    /// Creates a facade from a snapshot of the global configuration, patched
    /// by `options.config`.
    ///
    /// With `use_builtins`, a builtin is replaced by the same-named global
    /// filter when the configuration allows overrides and the global registry
    /// has one.
    pub fn new(options: JsonBladeOptions) -> Self {
        let mut config = template_config();
        if let Some(patch) = &options.config {
            config.apply(patch);
        }

        let mut filters = FilterRegistry::new();
        if options.use_builtins {
            let groups = [string_filters(), array_filters(), object_filters(), logic_filters()];
            for &(name, f) in groups.into_iter().flatten() {
                let global = if config.allow_filter_override {
                    get_filter(name)
                } else {
                    None
                };
                filters.register_fn(name, global.unwrap_or_else(|| builtin(f)));
            }
        }
        filters.register_many(options.filters);

        tracing::debug!(filters = filters.len(), "created template facade");
        Self { filters, config }
    }

    /// Registers an instance filter, replacing any existing one.
    pub fn register_filter<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&Value, &[Value]) -> FilterResult + Send + Sync + 'static,
    {
        self.filters.register(name, f);
    }

    /// Returns the instance filter map.
    pub const fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    /// Patches the instance configuration.
    pub fn set_config(&mut self, patch: &TemplateConfigPatch) {
        self.config.apply(patch);
    }

    /// Returns a copy of the instance configuration.
    pub fn config(&self) -> TemplateConfig {
        self.config.clone()
    }

    fn compiler(&self) -> Compiler<'_> {
        Compiler::new(&self.config, &self.filters)
    }

    /// Compiles a template to a JSON value.
    pub fn compile(&self, template: &str, data: &Value) -> JsonBladeResult<Value> {
        self.compiler().compile(template, data, &[])
    }

    /// Compiles a template with host functions.
    pub fn compile_with(
        &self,
        template: &str,
        data: &Value,
        functions: &[TemplateFunction],
    ) -> JsonBladeResult<Value> {
        self.compiler().compile(template, data, functions)
    }

    /// Compiles a template, awaiting async host functions and filters.
    pub async fn compile_async(
        &self,
        template: &str,
        data: &Value,
        functions: &[TemplateFunction],
    ) -> JsonBladeResult<Value> {
        self.compiler().compile_async(template, data, functions).await
    }

    /// Renders a template to its interpolated text without parsing it.
    pub fn render_to_string(
        &self,
        template: &str,
        data: &Value,
        functions: &[TemplateFunction],
    ) -> JsonBladeResult<String> {
        self.compiler().render_to_string(template, data, functions)
    }

    /// Async counterpart of [`render_to_string`](Self::render_to_string).
    pub async fn render_to_string_async(
        &self,
        template: &str,
        data: &Value,
        functions: &[TemplateFunction],
    ) -> JsonBladeResult<String> {
        self.compiler()
            .render_to_string_async(template, data, functions)
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::filters::filter_fn;

    #[test]
    fn test_builtins_seeded() {
        assert!(JsonBladeOptions::default().use_builtins);
        let blade = JsonBlade::default();
        assert!(blade.filters().has("upper"));
        assert!(blade.filters().has("join"));
        assert!(blade.filters().has("keys"));
        assert!(blade.filters().has("equals"));
        assert!(!blade.filters().has("currency"));
    }

    #[test]
    fn test_without_builtins_still_reaches_global() {
        let blade = JsonBlade::new(JsonBladeOptions {
            use_builtins: false,
            ..JsonBladeOptions::default()
        });
        assert!(blade.filters().is_empty());
        let out = blade.compile(r#"{"n": "{{n | upper}}"}"#, &json!({"n": "a"})).unwrap();
        assert_eq!(out, json!({"n": "A"}));
    }

    #[test]
    fn test_option_filters_win_over_builtins() {
        let mut filters = HashMap::new();
        filters.insert(
            "upper".to_string(),
            filter_fn(|_: &Value, _: &[Value]| Ok(json!("custom"))),
        );
        let blade = JsonBlade::new(JsonBladeOptions {
            filters,
            ..JsonBladeOptions::default()
        });
        let out = blade.compile(r#"{"n": "{{n | upper}}"}"#, &json!({"n": "a"})).unwrap();
        assert_eq!(out, json!({"n": "custom"}));
    }

    #[test]
    fn test_instance_config_is_isolated() {
        let blade = JsonBlade::new(JsonBladeOptions {
            config: Some(TemplateConfigPatch {
                strict_mode: Some(true),
                throw_on_error: Some(true),
                ..TemplateConfigPatch::default()
            }),
            ..JsonBladeOptions::default()
        });
        let lenient = JsonBlade::default();
        let template = r#"{"n": "{{n | no_such_filter}}"}"#;
        assert!(blade.compile(template, &json!({"n": 1})).is_err());
        assert_eq!(lenient.compile(template, &json!({"n": 1})).unwrap(), json!({"n": "1"}));
    }

    #[test]
    fn test_set_config_patches_instance() {
        let mut blade = JsonBlade::default();
        blade.set_config(&TemplateConfigPatch {
            throw_on_error: Some(true),
            ..TemplateConfigPatch::default()
        });
        assert!(blade.config().throw_on_error);
        assert!(blade.compile("{broken", &json!({})).is_err());
    }

    #[test]
    fn test_render_to_string() {
        let blade = JsonBlade::default();
        let text = blade
            .render_to_string("{{#each xs}}{{this}};{{/each}}", &json!({"xs": ["a", "b"]}), &[])
            .unwrap();
        assert_eq!(text, "a;b;");
    }
}
