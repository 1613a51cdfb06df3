//! Built-in `jsonblade` subcommands.

pub mod check;
pub mod compile;
pub mod schema;

use std::path::Path;

pub use check::CheckCommand;
pub use compile::CompileCommand;
pub use schema::SchemaCommand;

use jsonblade_core::JsonBladeResult;
use serde_json::Value;

use crate::command::CommandRegistry;

/// Registers every built-in command.
pub fn register_builtin_commands(registry: &mut CommandRegistry) {
    registry.register(Box::new(CompileCommand));
    registry.register(Box::new(SchemaCommand));
    registry.register(Box::new(CheckCommand));
}

/// Reads a UTF-8 text file.
pub(crate) async fn read_text(path: impl AsRef<Path>) -> JsonBladeResult<String> {
    Ok(tokio::fs::read_to_string(path).await?)
}

/// Reads and parses a JSON file.
pub(crate) async fn read_json(path: impl AsRef<Path>) -> JsonBladeResult<Value> {
    Ok(serde_json::from_str(&read_text(path).await?)?)
}
