//! Log output for the engine and the `jsonblade` tool.
//!
//! The engine only emits [`tracing`] events; embedding applications install
//! their own subscriber. The command-line tool installs one through
//! [`setup_logging`], and every compile call runs inside a [`compile_span`].

use crate::settings::Settings;

/// Installs a stderr subscriber filtered by `settings.log_level`.
///
/// A directive that does not parse falls back to `info`. `settings.debug`
/// selects pretty output with source locations, otherwise events are written
/// as JSON lines. If a subscriber is already installed nothing changes.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .json()
            .try_init()
            .ok();
    }
}

/// The span that groups the template warnings of one compile call. `mode`
/// is `"sync"` or `"async"`.
///
/// # Examples
///
/// ```
/// use jsonblade_core::logging::compile_span;
///
/// let span = compile_span("async");
/// let _guard = span.enter();
/// tracing::debug!("compiling");
/// ```
pub fn compile_span(mode: &str) -> tracing::Span {
    tracing::debug_span!("compile", mode = mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_twice_is_harmless() {
        let settings = Settings {
            log_level: "not a [valid filter".to_string(),
            ..Settings::default()
        };
        setup_logging(&settings);
        setup_logging(&Settings::default());
    }

    #[test]
    fn test_compile_span_can_be_entered() {
        let span = compile_span("sync");
        let _guard = span.enter();
    }
}
