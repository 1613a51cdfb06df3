//! Expression parsing.
//!
//! An expression is a base followed by a filter chain:
//! `path | filter(arg, 'literal') | other`. The base is either a dotted data
//! path or a host-function call `name(args)`. Parsing is purely syntactic;
//! arguments that are bare tokens are resolved against the data at
//! evaluation time.

use once_cell::sync::Lazy;
use regex::Regex;

static CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9_]+)\((.*?)\)$").expect("valid call pattern")
});

static FILTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9_]+)(?:\((.*?)\))?$").expect("valid filter pattern")
});

/// A single argument of a filter or function call.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// A quoted string literal, quotes removed.
    Str(String),
    /// `true` or `false`.
    Bool(bool),
    /// `null`.
    Null,
    /// A bare token: resolved as a data path, falling back to the token text.
    Token(String),
}

impl Arg {
    fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if is_quoted(trimmed) {
            return Self::Str(strip_quotes(trimmed).to_string());
        }
        match trimmed {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            "null" => Self::Null,
            _ => Self::Token(trimmed.to_string()),
        }
    }
}

/// One `| name(args)` segment of a filter chain.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    /// The filter name.
    pub name: String,
    /// Parsed arguments, in order.
    pub args: Vec<Arg>,
}

/// The value an expression starts from.
#[derive(Debug, Clone, PartialEq)]
pub enum Base {
    /// A dotted data path.
    Path(String),
    /// A call-shaped base, `name(args)`. When no host function with this name
    /// is supplied, the whole `source` text is looked up as a path instead.
    Call {
        /// The function name.
        name: String,
        /// Parsed arguments, in order.
        args: Vec<Arg>,
        /// The base text as written.
        source: String,
    },
}

/// A parsed expression.
///
/// # Examples
///
/// ```
/// use jsonblade_template::expression::{Arg, Base, Expression};
///
/// let expr = Expression::parse("price | currency('USD') | upper");
/// assert_eq!(expr.base, Base::Path("price".to_string()));
/// assert_eq!(expr.filters.len(), 2);
/// assert_eq!(expr.filters[0].args, vec![Arg::Str("USD".to_string())]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    /// The trimmed expression text.
    pub source: String,
    /// The base value.
    pub base: Base,
    /// The filter chain, applied left to right.
    pub filters: Vec<FilterCall>,
}

impl Expression {
    /// Parses an expression. Filter segments that are not shaped like
    /// `name` or `name(args)` are dropped.
    pub fn parse(source: &str) -> Self {
        let source = source.trim();
        let mut parts = split_top_level(source, '|').into_iter().map(str::trim);
        let base_text = parts.next().unwrap_or_default();

        let base = match CALL_RE.captures(base_text) {
            Some(caps) => {
                let args_text = caps.get(2).map_or("", |m| m.as_str());
                let args = if args_text.trim().is_empty() {
                    Vec::new()
                } else {
                    parse_args(args_text)
                };
                Base::Call {
                    name: caps[1].to_string(),
                    args,
                    source: base_text.to_string(),
                }
            }
            None => Base::Path(base_text.to_string()),
        };

        let filters = parts
            .filter_map(|part| {
                let caps = FILTER_RE.captures(part)?;
                let args = match caps.get(2).map(|m| m.as_str()) {
                    Some(text) if !text.is_empty() => parse_args(text),
                    _ => Vec::new(),
                };
                Some(FilterCall {
                    name: caps[1].to_string(),
                    args,
                })
            })
            .collect();

        Self {
            source: source.to_string(),
            base,
            filters,
        }
    }

    /// Returns the base path when the base is a plain path.
    pub fn path(&self) -> Option<&str> {
        match &self.base {
            Base::Path(path) => Some(path),
            Base::Call { .. } => None,
        }
    }
}

fn parse_args(text: &str) -> Vec<Arg> {
    split_top_level(text, ',').into_iter().map(Arg::parse).collect()
}

/// Splits on `separator` outside of single or double quotes.
///
/// Parentheses are not tracked, so a comma inside a nested call splits it.
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut start = 0;

    for (i, ch) in text.char_indices() {
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            c if c == separator && !in_single && !in_double => {
                parts.push(&text[start..i]);
                start = i + ch.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn is_quoted(s: &str) -> bool {
    (s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\''))
}

/// Strips one pair of matching surrounding quotes.
fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2 {
        &s[1..s.len() - 1]
    } else {
        ""
    }
}
