//! # jsonblade-cli
//!
//! The `jsonblade` command-line tool.
//!
//! - **compile** - Render a template file against a JSON data file
//! - **schema** - Print the data-shape summary used by editor integrations
//! - **check** - Report structural problems in a template
//!
//! ## Quick Start
//!
//! ```rust
//! use jsonblade_cli::command::CommandRegistry;
//! use jsonblade_cli::commands::register_builtin_commands;
//!
//! let mut registry = CommandRegistry::new();
//! register_builtin_commands(&mut registry);
//! assert_eq!(registry.list_commands(), vec!["check", "compile", "schema"]);
//! ```

// - unused_async: command handlers keep one async signature
#![allow(clippy::unused_async)]

pub mod command;
pub mod commands;

pub use command::{CliCommand, CommandRegistry};
pub use commands::register_builtin_commands;
