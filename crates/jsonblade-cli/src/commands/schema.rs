//! The `schema` command: prints the data-shape summary of a JSON file.

use async_trait::async_trait;
use jsonblade_core::{JsonBladeError, JsonBladeResult, Settings};
use jsonblade_schema::{analyze_data_structure, MAX_ANALYSIS_DEPTH};
use serde_json::Value;

use super::read_json;
use crate::command::CliCommand;

/// Prints the shape of a data file as JSON.
pub struct SchemaCommand;

/// Renders the shape of `data` as pretty JSON.
pub fn describe_data(data: &Value, max_depth: usize) -> JsonBladeResult<String> {
    Ok(serde_json::to_string_pretty(&analyze_data_structure(data, max_depth))?)
}

#[async_trait]
impl CliCommand for SchemaCommand {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn help(&self) -> &'static str {
        "Describe the shape of a JSON data file"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("data")
                .required(true)
                .value_name("DATA")
                .help("JSON data file"),
        )
        .arg(
            clap::Arg::new("max-depth")
                .long("max-depth")
                .value_name("N")
                .value_parser(clap::value_parser!(usize))
                .help("Levels to descend before summarizing by type"),
        )
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        _settings: &Settings,
    ) -> Result<(), JsonBladeError> {
        let path = matches
            .get_one::<String>("data")
            .ok_or_else(|| JsonBladeError::Configuration("A data file is required".to_string()))?;
        let max_depth = matches
            .get_one::<usize>("max-depth")
            .copied()
            .unwrap_or(MAX_ANALYSIS_DEPTH);

        let data = read_json(path).await?;
        println!("{}", describe_data(&data, max_depth)?);
        Ok(())
    }
}
