//! The scriptorium management utility.
//!
//! Builds the command registry (built-in commands plus the project's own),
//! loads the settings, and dispatches to the requested subcommand. Exits
//! non-zero on any unhandled error.

use scriptorium::commands::register_project_commands;
use scriptorium::settings::load_settings;
use scriptorium_cli::command::CommandRegistry;
use scriptorium_cli::commands::register_builtin_commands;
use scriptorium_core::logging::setup_logging;

#[tokio::main]
async fn main() {
    let mut registry = CommandRegistry::new();
    register_builtin_commands(&mut registry);
    register_project_commands(&mut registry);

    let matches = registry.build_cli().get_matches();
    let settings_path = matches
        .get_one::<String>("settings")
        .map_or("settings.toml", String::as_str);

    let settings = match load_settings(settings_path) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    setup_logging(&settings);

    if let Err(e) = registry.execute(&matches, &settings).await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
