//! The `check` command: reports structural problems in a template.

use std::fmt;

use async_trait::async_trait;
use jsonblade_core::{JsonBladeError, Settings, TemplateConfig, TemplateException};
use jsonblade_template::parser::parse;

use super::read_text;
use crate::command::CliCommand;

/// Parses a template and lists every structural problem.
pub struct CheckCommand;

/// One problem found in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based line.
    pub line: usize,
    /// 1-based column, in characters.
    pub column: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

/// Converts a byte offset into a 1-based line and column.
fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    (line, column)
}

/// Parses `source` with the configured delimiters and returns its problems
/// in source order.
pub fn check_template(source: &str, config: &TemplateConfig) -> Vec<Diagnostic> {
    parse(source, &config.delimiters)
        .problems
        .into_iter()
        .map(|problem| {
            let (line, column) = line_column(source, problem.position.unwrap_or(0));
            Diagnostic {
                line,
                column,
                message: problem.message,
            }
        })
        .collect()
}

#[async_trait]
impl CliCommand for CheckCommand {
    fn name(&self) -> &'static str {
        "check"
    }

    fn help(&self) -> &'static str {
        "Report unclosed blocks, stray markers and unknown directives"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("template")
                .required(true)
                .value_name("TEMPLATE")
                .help("Template file"),
        )
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), JsonBladeError> {
        let path = matches
            .get_one::<String>("template")
            .ok_or_else(|| JsonBladeError::Configuration("A template file is required".to_string()))?;
        let source = read_text(path).await?;
        let config = settings.template_config();

        let template = parse(&source, &config.delimiters);
        if template.is_well_formed() {
            tracing::info!(template = %path, "template check found no issues");
            return Ok(());
        }

        for diagnostic in check_template(&source, &config) {
            println!("{path}:{diagnostic}");
        }
        tracing::info!(template = %path, issues = template.problems.len(), "template check found issues");

        let first = template.problems.into_iter().next().ok_or_else(|| {
            JsonBladeError::Configuration("template check reported no problem".to_string())
        })?;
        Err(JsonBladeError::Template(
            TemplateException::new(first).with_template(source),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_column() {
        let source = "{\n  \"a\": {{/if}}\n}";
        assert_eq!(line_column(source, 0), (1, 1));
        assert_eq!(line_column(source, 9), (2, 8));
    }

    #[test]
    fn test_check_clean_template() {
        let config = TemplateConfig::default();
        assert!(check_template(r#"{"a": {{#if x}}1{{#else}}2{{/if}}}"#, &config).is_empty());
    }

    #[test]
    fn test_check_reports_positions() {
        let config = TemplateConfig::default();
        let diagnostics = check_template("{\n  \"a\": {{/if}}\n}", &config);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!((diagnostics[0].line, diagnostics[0].column), (2, 8));
        assert_eq!(diagnostics[0].to_string(), "2:8: Unexpected closing tag '/if'");
    }
}
