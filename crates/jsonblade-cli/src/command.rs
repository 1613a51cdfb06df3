//! Subcommands of the `jsonblade` binary.
//!
//! `compile`, `schema` and `check` each implement [`CliCommand`]. The
//! [`CommandRegistry`] turns the registered set into one clap parser and
//! routes the parsed subcommand to its handler.
//!
//! ## Adding a Subcommand
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use jsonblade_cli::command::CliCommand;
//! use jsonblade_core::{JsonBladeError, Settings};
//!
//! struct VersionCommand;
//!
//! #[async_trait]
//! impl CliCommand for VersionCommand {
//!     fn name(&self) -> &str { "version" }
//!     fn help(&self) -> &str { "Print the version" }
//!
//!     async fn handle(
//!         &self,
//!         _matches: &clap::ArgMatches,
//!         _settings: &Settings,
//!     ) -> Result<(), JsonBladeError> {
//!         println!("{}", env!("CARGO_PKG_VERSION"));
//!         Ok(())
//!     }
//! }
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use jsonblade_core::{JsonBladeError, Settings};

/// A subcommand of the `jsonblade` binary. Handlers read their own
/// arguments from `matches` and report failures as [`JsonBladeError`].
#[async_trait]
pub trait CliCommand: Send + Sync {
    /// The subcommand name.
    fn name(&self) -> &str;

    /// One-line help text.
    fn help(&self) -> &str;

    /// Declares the subcommand's arguments. The default declares none.
    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd
    }

    /// Runs the subcommand against the loaded settings.
    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), JsonBladeError>;
}

/// Registered commands, keyed by name.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Box<dyn CliCommand>>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command, replacing any command with the same name.
    pub fn register(&mut self, command: Box<dyn CliCommand>) {
        let name = command.name().to_string();
        self.commands.insert(name, command);
    }

    /// Looks up a command by name.
    pub fn get(&self, name: &str) -> Option<&dyn CliCommand> {
        self.commands.get(name).map(AsRef::as_ref)
    }

    /// Returns the registered command names, sorted.
    pub fn list_commands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if no command is registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Builds the top-level clap command with one subcommand per entry and
    /// the global `--config` and `--log-level` options.
    pub fn build_cli(&self) -> clap::Command {
        let mut app = clap::Command::new("jsonblade")
            .about("Compile JSON templates and inspect template data")
            .version(env!("CARGO_PKG_VERSION"))
            .subcommand_required(true)
            .arg(
                clap::Arg::new("config")
                    .long("config")
                    .global(true)
                    .value_name("FILE")
                    .help("Settings file (.toml or .json)"),
            )
            .arg(
                clap::Arg::new("log-level")
                    .long("log-level")
                    .global(true)
                    .value_name("FILTER")
                    .help("Log filter directive, e.g. debug or jsonblade_template=debug"),
            );

        let mut entries: Vec<_> = self.commands.values().collect();
        entries.sort_by(|a, b| a.name().cmp(b.name()));

        for cmd in entries {
            // clap needs `&'static str` names; commands are registered once at startup.
            let static_name: &'static str = Box::leak(cmd.name().to_string().into_boxed_str());
            let subcmd = clap::Command::new(static_name).about(cmd.help().to_string());
            app = app.subcommand(cmd.add_arguments(subcmd));
        }

        app
    }

    /// Dispatches to the subcommand selected in `matches`.
    pub async fn execute(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), JsonBladeError> {
        let (name, sub_matches) = matches
            .subcommand()
            .ok_or_else(|| JsonBladeError::Configuration("No subcommand specified".to_string()))?;

        let cmd = self
            .get(name)
            .ok_or_else(|| JsonBladeError::Configuration(format!("Unknown command: {name}")))?;

        tracing::debug!(command = name, "running command");
        cmd.handle(sub_matches, settings).await
    }
}
