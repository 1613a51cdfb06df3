use anyhow::Context as _;
use jsonblade_cli::{register_builtin_commands, CommandRegistry};
use jsonblade_core::logging::setup_logging;
use jsonblade_core::settings_loader::{apply_env_overrides, from_file_with_env};
use jsonblade_core::Settings;

/// A global option, given before or after the subcommand.
fn global_option<'m>(matches: &'m clap::ArgMatches, id: &str) -> Option<&'m String> {
    matches
        .subcommand()
        .and_then(|(_, sub)| sub.get_one::<String>(id))
        .or_else(|| matches.get_one::<String>(id))
}

fn load_settings(matches: &clap::ArgMatches) -> anyhow::Result<Settings> {
    let mut settings = match global_option(matches, "config") {
        Some(path) => from_file_with_env(path).with_context(|| format!("loading settings from {path}"))?,
        None => {
            let mut settings = Settings::default();
            apply_env_overrides(&mut settings);
            settings
        }
    };
    if let Some(level) = global_option(matches, "log-level") {
        settings.log_level.clone_from(level);
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut registry = CommandRegistry::new();
    register_builtin_commands(&mut registry);

    let matches = registry.build_cli().get_matches();
    let settings = load_settings(&matches)?;
    setup_logging(&settings);

    registry.execute(&matches, &settings).await?;
    Ok(())
}
