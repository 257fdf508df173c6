//! Logging integration.
//!
//! Wires [`tracing`] up according to [`Settings`](crate::settings::Settings):
//! human-readable output while developing, structured JSON in production.

use crate::settings::Settings;

/// Installs the global tracing subscriber.
///
/// The filter comes from `settings.log_level` (falling back to `info` when
/// it does not parse). Debug mode selects the pretty format with file and
/// line information; otherwise JSON is emitted. Calling this twice is a
/// no-op, which keeps tests simple.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true);

    if settings.debug {
        builder
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        builder.json().try_init().ok();
    }
}

/// Returns the span wrapping one management command invocation.
///
/// # Examples
///
/// ```
/// use scriptorium_core::logging::command_span;
///
/// let span = command_span("migrate");
/// let _guard = span.enter();
/// tracing::info!("applying migrations");
/// ```
pub fn command_span(command: &str) -> tracing::Span {
    tracing::info_span!("command", name = command)
}
