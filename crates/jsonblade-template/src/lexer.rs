//! Template lexer (tokenizer).
//!
//! Splits template source into literal text and the markers found between the
//! configured delimiters: expressions (`{{ expr }}`), block openers
//! (`{{#if cond}}`), `{{#else}}`, block closers (`{{/if}}`) and comments
//! (`{{!-- ... --}}`). Every token records the byte offset it starts at.

use jsonblade_core::settings::Delimiters;

/// A token produced by the template lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A literal text segment.
    Text(String),
    /// An expression marker. Holds the untrimmed content between the delimiters.
    Expression(String),
    /// A block opener: `{{#tag args}}`. The args are trimmed.
    Open {
        /// The directive name (`if`, `unless`, `each`, `set`, ...).
        tag: String,
        /// Everything after the directive name.
        args: String,
    },
    /// `{{#else}}`.
    Else,
    /// A block closer: `{{/tag}}`.
    Close(String),
    /// A comment: `{{!-- ... --}}`.
    Comment(String),
    /// An opening delimiter with no matching closing delimiter. Holds the
    /// remaining source, starting at the delimiter.
    Unclosed(String),
}

/// A token together with its byte range in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    /// The token.
    pub token: Token,
    /// Byte offset of the token's first character.
    pub offset: usize,
    /// Byte offset just past the token's last character.
    pub end: usize,
}

impl Spanned {
    /// The token's text as written in `source`.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        &source[self.offset..self.end]
    }
}

/// Tokenizes template source using the given delimiters.
///
/// Never fails: malformed input shows up as [`Token::Unclosed`] and is left
/// for the parser to report or degrade.
pub fn tokenize(source: &str, delimiters: &Delimiters) -> Vec<Spanned> {
    let start = delimiters.start.as_str();
    let end = delimiters.end.as_str();
    let mut tokens = Vec::new();
    let mut offset = 0;

    if start.is_empty() || end.is_empty() {
        if !source.is_empty() {
            tokens.push(Spanned {
                token: Token::Text(source.to_string()),
                offset: 0,
                end: source.len(),
            });
        }
        return tokens;
    }

    while offset < source.len() {
        let remaining = &source[offset..];
        let Some(pos) = remaining.find(start) else {
            tokens.push(Spanned {
                token: Token::Text(remaining.to_string()),
                offset,
                end: source.len(),
            });
            break;
        };

        if pos > 0 {
            tokens.push(Spanned {
                token: Token::Text(remaining[..pos].to_string()),
                offset,
                end: offset + pos,
            });
        }

        let marker_offset = offset + pos;
        let after_open = &remaining[pos + start.len()..];

        // Comments may contain the closing delimiter, so they end at `--` + end.
        if let Some(body) = after_open.strip_prefix("!--") {
            let closer = format!("--{end}");
            if let Some(close) = body.find(&closer) {
                let end_offset = marker_offset + start.len() + 3 + close + closer.len();
                tokens.push(Spanned {
                    token: Token::Comment(body[..close].trim().to_string()),
                    offset: marker_offset,
                    end: end_offset,
                });
                offset = end_offset;
                continue;
            }
        }

        match after_open.find(end) {
            Some(close) if close > 0 => {
                let content = &after_open[..close];
                let end_offset = marker_offset + start.len() + close + end.len();
                tokens.push(Spanned {
                    token: classify(content),
                    offset: marker_offset,
                    end: end_offset,
                });
                offset = end_offset;
            }
            Some(_) => {
                // An empty marker is plain text.
                let literal_len = start.len() + end.len();
                tokens.push(Spanned {
                    token: Token::Text(source[marker_offset..marker_offset + literal_len].to_string()),
                    offset: marker_offset,
                    end: marker_offset + literal_len,
                });
                offset = marker_offset + literal_len;
            }
            None => {
                tokens.push(Spanned {
                    token: Token::Unclosed(source[marker_offset..].to_string()),
                    offset: marker_offset,
                    end: source.len(),
                });
                break;
            }
        }
    }

    tokens
}

/// Decides what kind of marker `content` (the raw text between delimiters) is.
fn classify(content: &str) -> Token {
    if let Some(directive) = content.strip_prefix('#') {
        let name_len = directive
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(directive.len());
        let (tag, args) = directive.split_at(name_len);
        if tag == "else" && args.trim().is_empty() {
            return Token::Else;
        }
        return Token::Open {
            tag: tag.to_string(),
            args: args.trim().to_string(),
        };
    }
    if let Some(tag) = content.strip_prefix('/') {
        return Token::Close(tag.trim().to_string());
    }
    Token::Expression(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        tokenize(source, &Delimiters::default())
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(lex(r#"{"a": 1}"#), vec![Token::Text(r#"{"a": 1}"#.to_string())]);
    }

    #[test]
    fn test_expression_keeps_raw_content() {
        assert_eq!(
            lex("{{ name | upper }}"),
            vec![Token::Expression(" name | upper ".to_string())]
        );
    }

    #[test]
    fn test_block_tokens() {
        assert_eq!(
            lex("{{#if user.active}}yes{{#else}}no{{/if}}"),
            vec![
                Token::Open {
                    tag: "if".to_string(),
                    args: "user.active".to_string(),
                },
                Token::Text("yes".to_string()),
                Token::Else,
                Token::Text("no".to_string()),
                Token::Close("if".to_string()),
            ]
        );
    }

    #[test]
    fn test_set_directive() {
        assert_eq!(
            lex("{{#set total = items | length}}"),
            vec![Token::Open {
                tag: "set".to_string(),
                args: "total = items | length".to_string(),
            }]
        );
    }

    #[test]
    fn test_comment_spanning_lines_and_delimiters() {
        assert_eq!(
            lex("a{{!-- note {{x}}\n more --}}b"),
            vec![
                Token::Text("a".to_string()),
                Token::Comment("note {{x}}\n more".to_string()),
                Token::Text("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_offsets() {
        let tokens = tokenize("ab{{x}}cd{{/each}}", &Delimiters::default());
        let offsets: Vec<usize> = tokens.iter().map(|t| t.offset).collect();
        assert_eq!(offsets, vec![0, 2, 7, 9]);
    }

    #[test]
    fn test_token_text_spans_whole_marker() {
        let source = "a{{ x | upper }}b";
        let tokens = tokenize(source, &Delimiters::default());
        assert_eq!(tokens[1].text(source), "{{ x | upper }}");
        assert_eq!(tokens[2].text(source), "b");
    }

    #[test]
    fn test_unclosed_marker() {
        assert_eq!(
            lex("x {{ name"),
            vec![
                Token::Text("x ".to_string()),
                Token::Unclosed("{{ name".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_marker_is_text() {
        assert_eq!(
            lex("{{}}x"),
            vec![Token::Text("{{}}".to_string()), Token::Text("x".to_string())]
        );
    }

    #[test]
    fn test_custom_delimiters() {
        let delimiters = Delimiters {
            start: "[[".to_string(),
            end: "]]".to_string(),
        };
        let tokens: Vec<Token> = tokenize("{{a}} [[b]]", &delimiters)
            .into_iter()
            .map(|s| s.token)
            .collect();
        assert_eq!(
            tokens,
            vec![
                Token::Text("{{a}} ".to_string()),
                Token::Expression("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_unknown_directive_is_open_token() {
        assert_eq!(
            lex("{{#with user}}"),
            vec![Token::Open {
                tag: "with".to_string(),
                args: "user".to_string(),
            }]
        );
    }

    #[test]
    fn test_empty_template() {
        assert!(lex("").is_empty());
    }
}
