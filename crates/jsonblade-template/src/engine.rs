//! Template evaluation: from template text and data to a JSON value.
//!
//! A template is parsed once into a node tree (see [`parser`](crate::parser))
//! and evaluated in a single walk:
//!
//! 1. `set` declarations are evaluated in document order, each seeing the data
//!    plus the variables bound before it.
//! 2. The remaining nodes render into ordered segments. Conditions pick
//!    branches, loops render their body once per item with a layered scope.
//! 3. The segments are assembled into text. A value interpolated inside a
//!    JSON string literal is embedded as escaped text (`null` becomes empty);
//!    anywhere else it is written as JSON.
//! 4. The text is parsed as JSON.
//!
//! The same evaluator serves both compile paths. On the async path host
//! functions and async filters are awaited and sibling nodes and loop
//! iterations are evaluated concurrently, always reassembled in document
//! order. On the sync path nothing ever suspends; async functions and filters
//! yield a `{}` placeholder instead.

use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use jsonblade_core::error::{
    JsonBladeError, JsonBladeResult, TemplateError, TemplateErrorKind, TemplateException,
};
use jsonblade_core::logging::compile_span;
use jsonblade_core::settings::{handle_template_error, template_config, TemplateConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::Instrument;

use crate::async_filters::{get_async_filter, AsyncFilterFn};
use crate::context::Context;
use crate::expression::{Arg, Base, Expression, FilterCall};
use crate::filters::{get_filter, FilterFn, FilterRegistry};
use crate::functions::{FunctionBody, TemplateFunction};
use crate::parser::{self, Node};
use crate::value::{condition_truthy, number_value, parse_number, to_display_string};

static THIS_WITH_FILTERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^this\s*\|").expect("valid loop item pattern"));

/// Looks up filters by name for the evaluator.
///
/// Implemented by [`FilterRegistry`] for instance-bound filter maps and by
/// [`GlobalFilters`] for the process-wide registry. Names the resolver does
/// not know fall back to the global sync registry, then to the global async
/// registry.
pub trait FilterResolver: Send + Sync {
    /// Returns the filter registered under `name`.
    fn filter(&self, name: &str) -> Option<FilterFn>;
}

impl FilterResolver for FilterRegistry {
    fn filter(&self, name: &str) -> Option<FilterFn> {
        self.get(name)
    }
}

/// Resolves filters from the global registry only.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalFilters;

impl FilterResolver for GlobalFilters {
    fn filter(&self, name: &str) -> Option<FilterFn> {
        get_filter(name)
    }
}

/// Whether evaluation may suspend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Nothing is awaited.
    Sync,
    /// Host functions and async filters are awaited.
    Async,
}

impl Mode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Async => "async",
        }
    }
}

/// Compiles templates against one configuration and one filter resolver.
///
/// # Examples
///
/// ```
/// use jsonblade_core::settings::TemplateConfig;
/// use jsonblade_template::engine::{Compiler, GlobalFilters};
/// use serde_json::json;
///
/// let config = TemplateConfig::default();
/// let compiler = Compiler::new(&config, &GlobalFilters);
/// let out = compiler
///     .compile(r#"{"greeting": "Hello {{name | upper}}"}"#, &json!({"name": "ada"}), &[])
///     .unwrap();
/// assert_eq!(out, json!({"greeting": "Hello ADA"}));
/// ```
pub struct Compiler<'a> {
    config: &'a TemplateConfig,
    filters: &'a dyn FilterResolver,
}

impl<'a> Compiler<'a> {
    /// Creates a compiler.
    pub const fn new(config: &'a TemplateConfig, filters: &'a dyn FilterResolver) -> Self {
        Self { config, filters }
    }

    /// Compiles a template to a JSON value without suspending.
    ///
    /// An empty or whitespace-only template yields `""`. Output that is not
    /// valid JSON yields `null` after an `INVALID_SYNTAX` error has gone
    /// through the error policy.
    pub fn compile(
        &self,
        template: &str,
        data: &Value,
        functions: &[TemplateFunction],
    ) -> JsonBladeResult<Value> {
        let span = compile_span(Mode::Sync.as_str());
        let _entered = span.enter();
        match run_sync(self.evaluator(template, functions, Mode::Sync).render(data))? {
            Some(text) => self.parse_output(template, &text),
            None => Ok(Value::String(String::new())),
        }
    }

    /// Compiles a template to a JSON value, awaiting host functions and
    /// async filters.
    pub async fn compile_async(
        &self,
        template: &str,
        data: &Value,
        functions: &[TemplateFunction],
    ) -> JsonBladeResult<Value> {
        let rendered = self
            .evaluator(template, functions, Mode::Async)
            .render(data)
            .instrument(compile_span(Mode::Async.as_str()))
            .await?;
        match rendered {
            Some(text) => self.parse_output(template, &text),
            None => Ok(Value::String(String::new())),
        }
    }

    /// Renders a template to its interpolated text without parsing it.
    pub fn render_to_string(
        &self,
        template: &str,
        data: &Value,
        functions: &[TemplateFunction],
    ) -> JsonBladeResult<String> {
        let span = compile_span(Mode::Sync.as_str());
        let _entered = span.enter();
        let rendered = run_sync(self.evaluator(template, functions, Mode::Sync).render(data))?;
        Ok(rendered.unwrap_or_default())
    }

    /// Async counterpart of [`render_to_string`](Self::render_to_string).
    pub async fn render_to_string_async(
        &self,
        template: &str,
        data: &Value,
        functions: &[TemplateFunction],
    ) -> JsonBladeResult<String> {
        let rendered = self
            .evaluator(template, functions, Mode::Async)
            .render(data)
            .instrument(compile_span(Mode::Async.as_str()))
            .await?;
        Ok(rendered.unwrap_or_default())
    }

    /// Evaluates a single expression (`path | filter(args)`, without
    /// delimiters) against `data`.
    pub fn evaluate(
        &self,
        expression: &str,
        data: &Value,
        functions: &[TemplateFunction],
    ) -> JsonBladeResult<Value> {
        let evaluator = self.evaluator(expression, functions, Mode::Sync);
        let expr = Expression::parse(expression);
        let ctx = Context::new(data.clone());
        run_sync(evaluator.eval_expression(&expr, &ctx))
    }

    /// Async counterpart of [`evaluate`](Self::evaluate).
    pub async fn evaluate_async(
        &self,
        expression: &str,
        data: &Value,
        functions: &[TemplateFunction],
    ) -> JsonBladeResult<Value> {
        let evaluator = self.evaluator(expression, functions, Mode::Async);
        let expr = Expression::parse(expression);
        let ctx = Context::new(data.clone());
        evaluator.eval_expression(&expr, &ctx).await
    }

    fn evaluator<'e>(
        &'e self,
        source: &'e str,
        functions: &'e [TemplateFunction],
        mode: Mode,
    ) -> Evaluator<'e> {
        Evaluator {
            config: self.config,
            filters: self.filters,
            functions,
            mode,
            source,
            variables: Map::new(),
        }
    }

    fn parse_output(&self, template: &str, text: &str) -> JsonBladeResult<Value> {
        match serde_json::from_str(text) {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::debug!(error = %err, "interpolated template is not valid JSON");
                report(
                    self.config,
                    template,
                    TemplateError::new(TemplateErrorKind::InvalidSyntax, "Invalid JSON after interpolation"),
                )?;
                Ok(Value::Null)
            }
        }
    }
}

// ============================================================
// Global convenience functions
// ============================================================

/// Compiles a template with the global configuration and filters.
///
/// # Examples
///
/// ```
/// use jsonblade_template::engine::compile_json_template;
/// use serde_json::json;
///
/// let out = compile_json_template(
///     r#"{"price": "{{amount | currency('EUR')}}"}"#,
///     &json!({"amount": 1234.56}),
///     &[],
/// )
/// .unwrap();
/// assert_eq!(out, json!({"price": "1 234,56 €"}));
/// ```
pub fn compile_json_template(
    template: &str,
    data: &Value,
    functions: &[TemplateFunction],
) -> JsonBladeResult<Value> {
    let config = template_config();
    Compiler::new(&config, &GlobalFilters).compile(template, data, functions)
}

/// Async counterpart of [`compile_json_template`].
pub async fn compile_json_template_async(
    template: &str,
    data: &Value,
    functions: &[TemplateFunction],
) -> JsonBladeResult<Value> {
    let config = template_config();
    Compiler::new(&config, &GlobalFilters)
        .compile_async(template, data, functions)
        .await
}

/// Evaluates one expression with the global configuration and filters.
pub fn evaluate_expression(
    expression: &str,
    data: &Value,
    functions: &[TemplateFunction],
) -> JsonBladeResult<Value> {
    let config = template_config();
    Compiler::new(&config, &GlobalFilters).evaluate(expression, data, functions)
}

/// Async counterpart of [`evaluate_expression`].
pub async fn evaluate_expression_async(
    expression: &str,
    data: &Value,
    functions: &[TemplateFunction],
) -> JsonBladeResult<Value> {
    let config = template_config();
    Compiler::new(&config, &GlobalFilters)
        .evaluate_async(expression, data, functions)
        .await
}

// ============================================================
// Evaluator
// ============================================================

/// Polls a sync-mode evaluation to completion.
fn run_sync<T>(future: impl std::future::Future<Output = JsonBladeResult<T>>) -> JsonBladeResult<T> {
    future.now_or_never().unwrap_or_else(|| {
        Err(JsonBladeError::Template(TemplateException::new(TemplateError::new(
            TemplateErrorKind::EvaluationError,
            "synchronous evaluation suspended",
        ))))
    })
}

/// Routes an error through the policy, attaching the template on failure.
fn report(config: &TemplateConfig, source: &str, error: TemplateError) -> JsonBladeResult<()> {
    handle_template_error(error, config)
        .map_err(|exception| JsonBladeError::Template(exception.with_template(source)))
}

/// What stands in for the result of an async call on the sync path.
fn pending_placeholder() -> Value {
    Value::Object(Map::new())
}

/// A piece of rendered output.
#[derive(Debug, Clone, PartialEq)]
enum Segment {
    /// Text that becomes part of the JSON source as is.
    Literal(String),
    /// An interpolated value, written according to where it lands.
    Value(Value),
}

/// Where rendering currently is: the scope chain, and the loop item when
/// inside `each`.
#[derive(Debug, Clone)]
struct Frame {
    ctx: Context,
    item: Option<Value>,
}

enum ResolvedFilter {
    Sync(FilterFn),
    Async(AsyncFilterFn),
}

struct Evaluator<'e> {
    config: &'e TemplateConfig,
    filters: &'e dyn FilterResolver,
    functions: &'e [TemplateFunction],
    mode: Mode,
    source: &'e str,
    variables: Map<String, Value>,
}

impl Evaluator<'_> {
    /// Renders the template to text. `None` for a blank template.
    async fn render(mut self, data: &Value) -> JsonBladeResult<Option<String>> {
        if self.source.trim().is_empty() {
            return Ok(None);
        }
        tracing::debug!(len = self.source.len(), "compiling template");

        let template = parser::parse(self.source, &self.config.delimiters);
        for problem in &template.problems {
            if self.config.strict_mode {
                self.report(problem.clone())?;
            } else {
                tracing::debug!(position = problem.position, "{}", problem.message);
            }
        }

        let base = Context::new(data.clone());
        for (name, expr) in template.variables() {
            let scope = base.child(self.variables.clone());
            let value = self.eval_expression(expr, &scope).await?;
            tracing::debug!(variable = name, "bound template variable");
            self.variables.insert(name.to_string(), value);
        }

        let frame = Frame {
            ctx: base.child(self.variables.clone()),
            item: None,
        };
        let segments = self.render_nodes(&template.nodes, &frame).await?;
        let text = assemble(&segments);
        tracing::debug!(len = text.len(), "template rendered");
        Ok(Some(text))
    }

    fn report(&self, error: TemplateError) -> JsonBladeResult<()> {
        report(self.config, self.source, error)
    }

    fn render_nodes<'b>(
        &'b self,
        nodes: &'b [Node],
        frame: &'b Frame,
    ) -> BoxFuture<'b, JsonBladeResult<Vec<Segment>>> {
        async move {
            match self.mode {
                Mode::Sync => {
                    let mut out = Vec::new();
                    for node in nodes {
                        out.extend(self.render_node(node, frame).await?);
                    }
                    Ok(out)
                }
                Mode::Async => {
                    let parts = try_join_all(nodes.iter().map(|node| self.render_node(node, frame))).await?;
                    Ok(parts.into_iter().flatten().collect())
                }
            }
        }
        .boxed()
    }

    fn render_node<'b>(
        &'b self,
        node: &'b Node,
        frame: &'b Frame,
    ) -> BoxFuture<'b, JsonBladeResult<Vec<Segment>>> {
        async move {
            match node {
                Node::Text(text) => Ok(vec![Segment::Literal(text.clone())]),
                Node::Set { .. } => Ok(Vec::new()),
                Node::Interpolation { expr, raw } => {
                    self.render_interpolation(expr, raw, frame).await.map(|s| vec![s])
                }
                Node::If {
                    condition,
                    then_branch,
                    else_branch,
                } => {
                    let branch = if self.condition(condition, &frame.ctx).await {
                        then_branch
                    } else {
                        else_branch
                    };
                    self.render_nodes(branch, frame).await
                }
                Node::Unless { condition, body } => {
                    if self.condition(condition, &frame.ctx).await {
                        Ok(Vec::new())
                    } else {
                        self.render_nodes(body, frame).await
                    }
                }
                Node::Each { path, body } => self.render_each(path, body, frame).await,
            }
        }
        .boxed()
    }

    async fn render_interpolation(
        &self,
        expr: &Expression,
        raw: &str,
        frame: &Frame,
    ) -> JsonBladeResult<Segment> {
        // A bare reference to a `set` variable is spliced in as text.
        if let Some(value) = self.variables.get(raw) {
            return Ok(Segment::Literal(raw_text(value)));
        }
        if let Some(item) = &frame.item {
            if raw == "this" {
                return Ok(Segment::Literal(raw_text(item)));
            }
            if THIS_WITH_FILTERS.is_match(raw) {
                let value = self.eval_expression(expr, &frame.ctx).await?;
                return Ok(Segment::Literal(raw_text(&value)));
            }
        }
        Ok(Segment::Value(self.eval_expression(expr, &frame.ctx).await?))
    }

    async fn render_each(&self, path: &str, body: &[Node], frame: &Frame) -> JsonBladeResult<Vec<Segment>> {
        let Value::Array(items) = frame.ctx.resolve(path) else {
            return Ok(Vec::new());
        };
        let last = items.len().saturating_sub(1);
        let frames: Vec<Frame> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let mut scope = Map::new();
                scope.insert("@index".to_string(), Value::from(index));
                scope.insert("@first".to_string(), Value::Bool(index == 0));
                scope.insert("@last".to_string(), Value::Bool(index == last));
                scope.insert("this".to_string(), item.clone());
                if let Value::Object(fields) = &item {
                    scope.extend(fields.clone());
                }
                Frame {
                    ctx: frame.ctx.child(scope),
                    item: Some(item),
                }
            })
            .collect();

        let parts = match self.mode {
            Mode::Sync => {
                let mut parts = Vec::with_capacity(frames.len());
                for item_frame in &frames {
                    parts.push(self.render_nodes(body, item_frame).await?);
                }
                parts
            }
            Mode::Async => try_join_all(frames.iter().map(|f| self.render_nodes(body, f))).await?,
        };
        Ok(parts.into_iter().flatten().collect())
    }

    /// Condition truthiness. A condition that fails to evaluate is false.
    async fn condition(&self, expr: &Expression, ctx: &Context) -> bool {
        match self.eval_expression(expr, ctx).await {
            Ok(value) => condition_truthy(&value),
            Err(err) => {
                tracing::debug!(expression = %expr.source, error = %err, "condition failed, treating as false");
                false
            }
        }
    }

    async fn eval_expression(&self, expr: &Expression, ctx: &Context) -> JsonBladeResult<Value> {
        let mut value = match &expr.base {
            Base::Path(path) => ctx.resolve(path),
            Base::Call { name, args, source } => match TemplateFunction::find(self.functions, name) {
                Some(function) => self.call_function(function, args, ctx).await?,
                // No such function: the call text is looked up as a path.
                None => ctx.resolve(source),
            },
        };
        for call in &expr.filters {
            value = self.apply_filter(call, value, expr, ctx).await?;
        }
        Ok(value)
    }

    async fn call_function(
        &self,
        function: &TemplateFunction,
        args: &[Arg],
        ctx: &Context,
    ) -> JsonBladeResult<Value> {
        let args: Vec<Value> = args.iter().map(|arg| function_arg(arg, ctx)).collect();
        let result = match &function.body {
            FunctionBody::Sync(f) => f(&args),
            FunctionBody::Async(f) => match self.mode {
                Mode::Async => f(args).await,
                Mode::Sync => {
                    tracing::warn!(function = %function.name, "async function called during a synchronous compile");
                    return Ok(pending_placeholder());
                }
            },
        };
        result.map_err(|err| JsonBladeError::Function {
            name: function.name.clone(),
            message: err.to_string(),
        })
    }

    fn resolve_filter(&self, name: &str) -> Option<ResolvedFilter> {
        self.filters
            .filter(name)
            .or_else(|| get_filter(name))
            .map(ResolvedFilter::Sync)
            .or_else(|| get_async_filter(name).map(ResolvedFilter::Async))
    }

    async fn apply_filter(
        &self,
        call: &FilterCall,
        value: Value,
        expr: &Expression,
        ctx: &Context,
    ) -> JsonBladeResult<Value> {
        let Some(filter) = self.resolve_filter(&call.name) else {
            self.report(
                TemplateError::new(TemplateErrorKind::UnknownFilter, format!("Unknown filter: {}", call.name))
                    .with_filter(&call.name)
                    .with_expression(&expr.source),
            )?;
            return Ok(value);
        };

        let args: Vec<Value> = call.args.iter().map(|arg| filter_arg(arg, ctx)).collect();
        let result = match filter {
            ResolvedFilter::Sync(f) => f(&value, &args),
            ResolvedFilter::Async(f) => match self.mode {
                Mode::Async => f(value.clone(), args).await,
                Mode::Sync => {
                    tracing::warn!(filter = %call.name, "async filter used during a synchronous compile");
                    return Ok(pending_placeholder());
                }
            },
        };

        match result {
            Ok(filtered) => Ok(filtered),
            Err(err) => {
                self.report(
                    TemplateError::new(
                        TemplateErrorKind::FilterError,
                        format!("Filter '{}' failed: {err}", call.name),
                    )
                    .with_filter(&call.name)
                    .with_expression(&expr.source),
                )?;
                Ok(value)
            }
        }
    }
}

// ============================================================
// Arguments
// ============================================================

/// Filter argument: literal, or a bare token resolved as a path, falling
/// back to the token text.
fn filter_arg(arg: &Arg, ctx: &Context) -> Value {
    match arg {
        Arg::Str(s) => Value::String(s.clone()),
        Arg::Bool(b) => Value::Bool(*b),
        Arg::Null => Value::Null,
        Arg::Token(token) => path_or_literal(token, ctx),
    }
}

/// Function argument: like [`filter_arg`], but numeric tokens are numbers.
fn function_arg(arg: &Arg, ctx: &Context) -> Value {
    match arg {
        Arg::Token(token) if !token.is_empty() => {
            parse_number(token).map_or_else(|| path_or_literal(token, ctx), number_value)
        }
        other => filter_arg(other, ctx),
    }
}

fn path_or_literal(token: &str, ctx: &Context) -> Value {
    match ctx.resolve(token) {
        Value::Null => Value::String(token.to_string()),
        value => value,
    }
}

// ============================================================
// Assembly
// ============================================================

/// Text spliced in verbatim: strings as they are, anything else as JSON.
fn raw_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Tracks whether the assembled text is inside a JSON string literal.
#[derive(Debug, Default)]
struct StringState {
    in_string: bool,
    escaped: bool,
}

impl StringState {
    fn feed(&mut self, text: &str) {
        for c in text.chars() {
            if !self.in_string {
                self.in_string = c == '"';
            } else if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == '"' {
                self.in_string = false;
            }
        }
    }
}

fn assemble(segments: &[Segment]) -> String {
    let mut out = String::new();
    let mut state = StringState::default();
    for segment in segments {
        match segment {
            Segment::Literal(text) => {
                state.feed(text);
                out.push_str(text);
            }
            Segment::Value(value) if state.in_string => out.push_str(&string_content(value)),
            Segment::Value(value) => out.push_str(&value.to_string()),
        }
    }
    out
}

/// A value as the content of a JSON string literal: `null` is empty,
/// anything else is its display string, escaped.
fn string_content(value: &Value) -> String {
    if value.is_null() {
        return String::new();
    }
    let text = to_display_string(value);
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if u32::from(c) < 0x20 => escaped.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::filters::FilterError;

    fn compile(template: &str, data: &Value) -> Value {
        let config = TemplateConfig::default();
        Compiler::new(&config, &GlobalFilters).compile(template, data, &[]).unwrap()
    }

    fn throwing() -> TemplateConfig {
        TemplateConfig {
            strict_mode: true,
            throw_on_error: true,
            ..TemplateConfig::default()
        }
    }

    // ── Assembly ────────────────────────────────────────────────────

    #[test]
    fn test_string_state_tracks_escapes() {
        let mut state = StringState::default();
        state.feed(r#"{"a": "x\"y"#);
        assert!(state.in_string);
        state.feed(r#"", "#);
        assert!(!state.in_string);
    }

    #[test]
    fn test_assemble_in_and_out_of_strings() {
        let segments = vec![
            Segment::Literal(r#"{"a": ""#.to_string()),
            Segment::Value(json!("say \"hi\"")),
            Segment::Literal(r#"", "b": "#.to_string()),
            Segment::Value(json!("plain")),
            Segment::Literal(r#", "c": ""#.to_string()),
            Segment::Value(Value::Null),
            Segment::Literal(r#""}"#.to_string()),
        ];
        assert_eq!(assemble(&segments), r#"{"a": "say \"hi\"", "b": "plain", "c": ""}"#);
    }

    #[test]
    fn test_string_content_escapes_control_characters() {
        assert_eq!(string_content(&json!("a\nb\\c")), "a\\nb\\\\c");
        assert_eq!(string_content(&json!([1, null, 2])), "1,,2");
        assert_eq!(string_content(&json!({"k": 1})), "[object Object]");
    }

    // ── Compilation ─────────────────────────────────────────────────

    #[test]
    fn test_empty_template_is_empty_string() {
        assert_eq!(compile("", &json!({})), json!(""));
        assert_eq!(compile("  \n ", &json!({})), json!(""));
    }

    #[test]
    fn test_bare_and_string_interpolation() {
        let data = json!({"user": {"name": "Ada", "age": 36, "tags": ["a", "b"]}});
        let out = compile(
            r#"{"name": "{{user.name}}", "age": {{user.age}}, "tags": {{user.tags}}, "label": "{{user.name}} ({{user.age}})"}"#,
            &data,
        );
        assert_eq!(
            out,
            json!({"name": "Ada", "age": 36, "tags": ["a", "b"], "label": "Ada (36)"})
        );
    }

    #[test]
    fn test_missing_values() {
        let out = compile(r#"{"a": "{{missing}}", "b": {{missing.deep}}}"#, &json!({}));
        assert_eq!(out, json!({"a": "", "b": null}));
    }

    #[test]
    fn test_invalid_json_output_is_null() {
        assert_eq!(compile(r#"{"a": {{x}}"#, &json!({"x": 1})), Value::Null);
    }

    #[test]
    fn test_invalid_json_output_throws_when_configured() {
        let config = throwing();
        let err = Compiler::new(&config, &GlobalFilters)
            .compile("{oops", &json!({}), &[])
            .unwrap_err();
        let exception_template = match &err {
            JsonBladeError::Template(exception) => exception.template.clone(),
            other => panic!("unexpected error {other}"),
        };
        assert_eq!(err.template_error().unwrap().kind, TemplateErrorKind::InvalidSyntax);
        assert_eq!(exception_template.as_deref(), Some("{oops"));
    }

    #[test]
    fn test_set_variables_and_loop() {
        let data = json!({"items": [1, 2, 3]});
        let out = compile(
            r#"{{#set total = items | length}}{{#set doubled = total | multiply(2)}}{"numbers":[{{total}},{{doubled}}]}"#,
            &data,
        );
        assert_eq!(out, json!({"numbers": [3, 6]}));
    }

    #[test]
    fn test_loop_this_renders_raw() {
        let data = json!({"names": ["ann", "bob"]});
        let out = compile(
            r#"[{{#each names}}"{{this}}-{{this | upper}}"{{#unless @last}},{{/unless}}{{/each}}]"#,
            &data,
        );
        assert_eq!(out, json!(["ann-ANN", "bob-BOB"]));
    }

    #[test]
    fn test_nested_loops() {
        let data = json!({"groups": [{"name": "g1", "members": [{"n": "a"}, {"n": "b"}]}, {"name": "g2", "members": []}]});
        let out = compile(
            r#"[{{#each groups}}{"g": "{{name}}", "m": [{{#each members}}"{{n}}@{{name}}"{{#unless @last}},{{/unless}}{{/each}}]}{{#unless @last}},{{/unless}}{{/each}}]"#,
            &data,
        );
        assert_eq!(
            out,
            json!([{"g": "g1", "m": ["a@g1", "b@g1"]}, {"g": "g2", "m": []}])
        );
    }

    #[test]
    fn test_unknown_filter_passes_value_through() {
        assert_eq!(compile(r#"{"a": "{{name | nope}}"}"#, &json!({"name": "x"})), json!({"a": "x"}));
    }

    #[test]
    fn test_unknown_filter_throws_when_configured() {
        let config = throwing();
        let err = Compiler::new(&config, &GlobalFilters)
            .compile(r#"{"a": "{{name | nope}}"}"#, &json!({"name": "x"}), &[])
            .unwrap_err();
        let error = err.template_error().unwrap();
        assert_eq!(error.kind, TemplateErrorKind::UnknownFilter);
        assert_eq!(error.filter.as_deref(), Some("nope"));
        assert_eq!(error.expression.as_deref(), Some("name | nope"));
    }

    #[test]
    fn test_filter_error_passes_value_through() {
        let mut registry = FilterRegistry::new();
        registry.register("boom", |_: &Value, _: &[Value]| Err(FilterError::new("kaput")));
        let config = TemplateConfig::default();
        let out = Compiler::new(&config, &registry)
            .compile(r#"{"a": "{{name | boom | upper}}"}"#, &json!({"name": "x"}), &[])
            .unwrap();
        assert_eq!(out, json!({"a": "X"}));

        let config = throwing();
        let err = Compiler::new(&config, &registry)
            .compile(r#"{"a": "{{name | boom}}"}"#, &json!({"name": "x"}), &[])
            .unwrap_err();
        assert_eq!(err.template_error().unwrap().kind, TemplateErrorKind::FilterError);
    }

    #[test]
    fn test_strict_mode_reports_structure() {
        let config = throwing();
        let err = Compiler::new(&config, &GlobalFilters)
            .compile(r#"{"a": 1}{{/if}}"#, &json!({}), &[])
            .unwrap_err();
        let error = err.template_error().unwrap();
        assert_eq!(error.kind, TemplateErrorKind::InvalidSyntax);
        assert_eq!(error.position, Some(8));
    }

    #[test]
    fn test_lenient_mode_degrades_structure() {
        let out = compile(r#"{"a": "{{#with x}}", "b": {{/each}}}"#, &json!({}));
        assert_eq!(out, json!({"a": "", "b": null}));
    }

    // ── Functions ───────────────────────────────────────────────────

    #[test]
    fn test_sync_function_call_with_coerced_args() {
        let functions = vec![TemplateFunction::new("describe", |args: &[Value]| {
            Ok(json!(format!("{}|{}|{}", args[0], args[1], args[2])))
        })];
        let config = TemplateConfig::default();
        let out = Compiler::new(&config, &GlobalFilters)
            .compile(
                r#"{"d": "{{describe(user.name, 42, unknown.path)}}"}"#,
                &json!({"user": {"name": "Ada"}}),
                &functions,
            )
            .unwrap();
        assert_eq!(out, json!({"d": "\"Ada\"|42|\"unknown.path\""}));
    }

    #[test]
    fn test_unmatched_call_falls_back_to_path() {
        assert_eq!(compile(r#"{"v": {{missing(1)}}}"#, &json!({})), json!({"v": null}));
    }

    #[test]
    fn test_function_error_propagates() {
        let functions = vec![TemplateFunction::new("fail", |_: &[Value]| Err("nope".into()))];
        let config = TemplateConfig::default();
        let err = Compiler::new(&config, &GlobalFilters)
            .compile(r#"{"v": {{fail()}}}"#, &json!({}), &functions)
            .unwrap_err();
        assert!(matches!(err, JsonBladeError::Function { ref name, .. } if name == "fail"));
    }

    #[test]
    fn test_async_function_on_sync_path_is_placeholder() {
        let functions = vec![TemplateFunction::new_async("fetch", |_args: Vec<Value>| async move {
            Ok(json!("data"))
        })];
        let config = TemplateConfig::default();
        let out = Compiler::new(&config, &GlobalFilters)
            .compile(r#"{"v": {{fetch()}}}"#, &json!({}), &functions)
            .unwrap();
        assert_eq!(out, json!({"v": {}}));
    }

    #[tokio::test]
    async fn test_async_function_is_awaited() {
        let functions = vec![TemplateFunction::new_async("fetch", |args: Vec<Value>| async move {
            tokio::task::yield_now().await;
            Ok(json!({"id": args[0].clone()}))
        })];
        let config = TemplateConfig::default();
        let out = Compiler::new(&config, &GlobalFilters)
            .compile_async(r#"{"v": {{fetch(7)}}, "w": "{{fetch(8) | json}}"}"#, &json!({}), &functions)
            .await
            .unwrap();
        assert_eq!(out, json!({"v": {"id": 7}, "w": "{\"id\":8}"}));
    }

    #[tokio::test]
    async fn test_async_loop_keeps_document_order() {
        let functions = vec![TemplateFunction::new_async("slow", |args: Vec<Value>| async move {
            let n = args[0].as_u64().unwrap_or(0);
            for _ in 0..(5 - n.min(5)) {
                tokio::task::yield_now().await;
            }
            Ok(json!(n * 10))
        })];
        let config = TemplateConfig::default();
        let out = Compiler::new(&config, &GlobalFilters)
            .compile_async(
                r#"[{{#each xs}}{{slow(this)}}{{#unless @last}},{{/unless}}{{/each}}]"#,
                &json!({"xs": [1, 2, 3, 4]}),
                &functions,
            )
            .await
            .unwrap();
        assert_eq!(out, json!([10, 20, 30, 40]));
    }

    // ── Expressions ─────────────────────────────────────────────────

    #[test]
    fn test_evaluate_expression_chain() {
        let config = TemplateConfig::default();
        let value = Compiler::new(&config, &GlobalFilters)
            .evaluate("name | lower | capitalize", &json!({"name": "JOHN DOE"}), &[])
            .unwrap();
        assert_eq!(value, json!("John doe"));
    }

    #[test]
    fn test_filter_args_resolve_paths() {
        let config = TemplateConfig::default();
        let value = Compiler::new(&config, &GlobalFilters)
            .evaluate("items | join(sep)", &json!({"items": ["a", "b"], "sep": "+"}), &[])
            .unwrap();
        assert_eq!(value, json!("a+b"));
    }

    #[test]
    fn test_render_to_string_skips_parsing() {
        let config = TemplateConfig::default();
        let text = Compiler::new(&config, &GlobalFilters)
            .render_to_string("Hello {{name}}!", &json!({"name": "Ada"}), &[])
            .unwrap();
        assert_eq!(text, "Hello \"Ada\"!");
    }
}
