//! Template parser.
//!
//! Converts the lexer's token stream into a tree of [`Node`]s: literal text,
//! interpolations and the `if`/`else`, `unless`, `each` and `set`
//! directives. Blocks nest freely.
//!
//! Parsing never fails. A structural problem (an unclosed block, a stray
//! `{{/tag}}` or `{{#else}}`, an unknown directive, a malformed `#set`) is
//! recorded as an `INVALID_SYNTAX` [`TemplateError`] carrying the marker's
//! offset, and the offending marker degrades to an interpolation of its own
//! content. The engine decides whether recorded problems are reported.

use jsonblade_core::error::{TemplateError, TemplateErrorKind};
use jsonblade_core::settings::Delimiters;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::expression::Expression;
use crate::lexer::{tokenize, Spanned, Token};

static SET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w+)\s*=\s*(.+)$").expect("valid set pattern"));

/// A node in the parsed template tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A literal text segment.
    Text(String),
    /// An expression marker.
    Interpolation {
        /// The parsed expression.
        expr: Expression,
        /// The marker content exactly as written between the delimiters.
        raw: String,
    },
    /// `{{#if cond}}...{{#else}}...{{/if}}`. The else branch may be empty.
    If {
        condition: Expression,
        then_branch: Vec<Node>,
        else_branch: Vec<Node>,
    },
    /// `{{#unless cond}}...{{/unless}}`
    Unless { condition: Expression, body: Vec<Node> },
    /// `{{#each path}}...{{/each}}`
    Each { path: String, body: Vec<Node> },
    /// `{{#set name = expr}}`
    Set { name: String, expr: Expression },
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// The root nodes.
    pub nodes: Vec<Node>,
    /// Structural problems found while parsing, in source order.
    pub problems: Vec<TemplateError>,
}

impl Template {
    /// Returns `true` if parsing found no structural problems.
    pub fn is_well_formed(&self) -> bool {
        self.problems.is_empty()
    }

    /// Returns every `set` declaration in document order, including those
    /// nested inside blocks.
    pub fn variables(&self) -> Vec<(&str, &Expression)> {
        let mut out = Vec::new();
        collect_variables(&self.nodes, &mut out);
        out
    }
}

fn collect_variables<'n>(nodes: &'n [Node], out: &mut Vec<(&'n str, &'n Expression)>) {
    for node in nodes {
        match node {
            Node::Set { name, expr } => out.push((name.as_str(), expr)),
            Node::If {
                then_branch,
                else_branch,
                ..
            } => {
                collect_variables(then_branch, out);
                collect_variables(else_branch, out);
            }
            Node::Unless { body, .. } | Node::Each { body, .. } => collect_variables(body, out),
            Node::Text(_) | Node::Interpolation { .. } => {}
        }
    }
}

/// Parses template source into a [`Template`].
///
/// # Examples
///
/// ```
/// use jsonblade_core::settings::Delimiters;
/// use jsonblade_template::parser::{parse, Node};
///
/// let template = parse("{{#each items}}{{name}}{{/each}}", &Delimiters::default());
/// assert!(template.is_well_formed());
/// assert!(matches!(&template.nodes[0], Node::Each { path, .. } if path == "items"));
/// ```
pub fn parse(source: &str, delimiters: &Delimiters) -> Template {
    let tokens = tokenize(source, delimiters);
    let mut parser = ParserState::new(source, delimiters, &tokens);
    let (nodes, _) = parser.parse_nodes();
    Template {
        nodes,
        problems: parser.problems,
    }
}

/// An open block on the parser stack.
struct Frame {
    tag: String,
    in_else: bool,
}

/// Why a node list ended.
enum Stop {
    /// `{{#else}}` of the innermost open `if`.
    Else,
    /// A closer for some open block. Holds the tag name.
    Close(String),
    /// End of input.
    Eof,
}

struct ParserState<'a> {
    source: &'a str,
    delimiters: &'a Delimiters,
    tokens: &'a [Spanned],
    pos: usize,
    stack: Vec<Frame>,
    problems: Vec<TemplateError>,
}

impl<'a> ParserState<'a> {
    fn new(source: &'a str, delimiters: &'a Delimiters, tokens: &'a [Spanned]) -> Self {
        Self {
            source,
            delimiters,
            tokens,
            pos: 0,
            stack: Vec::new(),
            problems: Vec::new(),
        }
    }

    fn parse_nodes(&mut self) -> (Vec<Node>, Stop) {
        let tokens = self.tokens;
        let mut nodes = Vec::new();

        while let Some(spanned) = tokens.get(self.pos) {
            self.pos += 1;
            match &spanned.token {
                Token::Text(text) => nodes.push(Node::Text(text.clone())),
                Token::Comment(_) => {}
                Token::Unclosed(rest) => {
                    self.problem(
                        format!("Unclosed expression marker '{}'", self.delimiters.start),
                        spanned.offset,
                    );
                    nodes.push(Node::Text(rest.clone()));
                }
                Token::Expression(content) => nodes.push(interpolation(content)),
                Token::Else => {
                    if self.stack.last().is_some_and(|f| f.tag == "if" && !f.in_else) {
                        return (nodes, Stop::Else);
                    }
                    self.problem("Unexpected {{#else}} outside of an if block", spanned.offset);
                    nodes.push(self.degraded(spanned));
                }
                Token::Close(tag) => {
                    if self.stack.iter().any(|f| &f.tag == tag) {
                        return (nodes, Stop::Close(tag.clone()));
                    }
                    self.problem(format!("Unexpected closing tag '/{tag}'"), spanned.offset);
                    nodes.push(self.degraded(spanned));
                }
                Token::Open { tag, args } => {
                    if let Some(stop) = self.parse_directive(spanned, tag, args, &mut nodes) {
                        return (nodes, stop);
                    }
                }
            }
        }

        (nodes, Stop::Eof)
    }

    /// Parses one directive into `nodes`. Returns a pending stop when an
    /// enclosing block's closer or the end of input ended this block early.
    fn parse_directive(
        &mut self,
        opener: &Spanned,
        tag: &str,
        args: &str,
        nodes: &mut Vec<Node>,
    ) -> Option<Stop> {
        match tag {
            "set" => {
                match SET_RE.captures(args) {
                    Some(caps) => nodes.push(Node::Set {
                        name: caps[1].to_string(),
                        expr: Expression::parse(&caps[2]),
                    }),
                    None => {
                        self.problem("Malformed #set, expected {{#set name = expression}}", opener.offset);
                        nodes.push(self.degraded(opener));
                    }
                }
                None
            }
            "if" | "unless" | "each" if args.is_empty() => {
                self.problem(format!("#{tag} requires an argument"), opener.offset);
                nodes.push(self.degraded(opener));
                None
            }
            "if" | "unless" | "each" => self.parse_block(opener, tag, args, nodes),
            _ => {
                self.problem(format!("Unknown directive '#{tag}'"), opener.offset);
                nodes.push(self.degraded(opener));
                None
            }
        }
    }

    fn parse_block(
        &mut self,
        opener: &Spanned,
        tag: &str,
        args: &str,
        nodes: &mut Vec<Node>,
    ) -> Option<Stop> {
        self.stack.push(Frame {
            tag: tag.to_string(),
            in_else: false,
        });
        let (body, mut stop) = self.parse_nodes();

        let mut else_branch = None;
        if matches!(stop, Stop::Else) {
            if let Some(frame) = self.stack.last_mut() {
                frame.in_else = true;
            }
            let (branch, next) = self.parse_nodes();
            else_branch = Some(branch);
            stop = next;
        }
        self.stack.pop();

        if matches!(&stop, Stop::Close(closed) if closed == tag) {
            let condition = Expression::parse(args);
            nodes.push(match tag {
                "if" => Node::If {
                    condition,
                    then_branch: body,
                    else_branch: else_branch.unwrap_or_default(),
                },
                "unless" => Node::Unless { condition, body },
                _ => Node::Each {
                    path: args.to_string(),
                    body,
                },
            });
            return None;
        }

        // Unclosed: keep the opener as an interpolation and the body inline.
        self.problem(format!("Unclosed {{{{#{tag}}}}} block"), opener.offset);
        nodes.push(self.degraded(opener));
        nodes.extend(body);
        if let Some(branch) = else_branch {
            nodes.push(interpolation("#else"));
            nodes.extend(branch);
        }
        Some(stop)
    }

    /// The marker content of `spanned` as an interpolation.
    fn degraded(&self, spanned: &Spanned) -> Node {
        let text = spanned.text(self.source);
        let content = text
            .strip_prefix(self.delimiters.start.as_str())
            .and_then(|t| t.strip_suffix(self.delimiters.end.as_str()))
            .unwrap_or(text);
        interpolation(content)
    }

    fn problem(&mut self, message: impl Into<String>, offset: usize) {
        self.problems.push(
            TemplateError::new(TemplateErrorKind::InvalidSyntax, message).with_position(offset),
        );
    }
}

fn interpolation(content: &str) -> Node {
    Node::Interpolation {
        expr: Expression::parse(content),
        raw: content.to_string(),
    }
}
