//! The `compile` command: renders a template file against a JSON data file.

use async_trait::async_trait;
use jsonblade_core::{JsonBladeError, JsonBladeResult, Settings};
use jsonblade_template::{JsonBlade, JsonBladeOptions};
use serde_json::Value;

use super::{read_json, read_text};
use crate::command::CliCommand;

/// Compiles a template and prints the result.
pub struct CompileCommand;

/// How to compile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Use the async evaluation path.
    pub use_async: bool,
    /// Print the interpolated text without parsing it as JSON.
    pub raw: bool,
}

/// Compiles `template` against `data` with the template configuration from
/// `settings`, returning the text to print: pretty JSON, or the interpolated
/// text when `raw` is set.
pub async fn compile_template(
    template: &str,
    data: &Value,
    settings: &Settings,
    options: CompileOptions,
) -> JsonBladeResult<String> {
    let blade = JsonBlade::new(JsonBladeOptions {
        config: Some(settings.template.clone()),
        ..JsonBladeOptions::default()
    });

    match (options.raw, options.use_async) {
        (true, true) => blade.render_to_string_async(template, data, &[]).await,
        (true, false) => blade.render_to_string(template, data, &[]),
        (false, true) => Ok(serde_json::to_string_pretty(&blade.compile_async(template, data, &[]).await?)?),
        (false, false) => Ok(serde_json::to_string_pretty(&blade.compile(template, data)?)?),
    }
}

#[async_trait]
impl CliCommand for CompileCommand {
    fn name(&self) -> &'static str {
        "compile"
    }

    fn help(&self) -> &'static str {
        "Compile a template against JSON data"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("template")
                .required(true)
                .value_name("TEMPLATE")
                .help("Template file"),
        )
        .arg(
            clap::Arg::new("data")
                .long("data")
                .short('d')
                .value_name("FILE")
                .help("JSON data file (defaults to an empty object)"),
        )
        .arg(
            clap::Arg::new("async")
                .long("async")
                .action(clap::ArgAction::SetTrue)
                .help("Use the async evaluation path"),
        )
        .arg(
            clap::Arg::new("raw")
                .long("raw")
                .action(clap::ArgAction::SetTrue)
                .help("Print the interpolated text without parsing it"),
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
        let template = read_text(path).await?;
        let data = match matches.get_one::<String>("data") {
            Some(data_path) => read_json(data_path).await?,
            None => Value::Object(serde_json::Map::new()),
        };
        let options = CompileOptions {
            use_async: matches.get_flag("async"),
            raw: matches.get_flag("raw"),
        };

        tracing::info!(template = %path, ?options, "compiling template");
        let output = compile_template(&template, &data, settings, options).await?;
        println!("{output}");
        Ok(())
    }
}
