//! Project settings.
//!
//! Provides the default settings for a scriptorium checkout and the loading
//! entry point used by `main`. Deployments override the defaults from a TOML
//! file and `SCRIPTORIUM_*` environment variables.

use std::path::Path;

use scriptorium_core::settings::Settings;
use scriptorium_core::{settings_loader, ScriptoriumError};

/// Creates the default project settings.
///
/// Suitable for development out of a source checkout: SQLite database next
/// to the sources, debug mode on, compression off.
pub fn project_settings() -> Settings {
    Settings::default()
}

/// Loads settings from the given TOML file with environment overrides.
///
/// Falls back to the project defaults (still honoring environment
/// overrides) when the file does not exist, so a fresh checkout works
/// without any configuration.
///
/// # Errors
///
/// Returns an error when the file exists but cannot be parsed.
pub fn load_settings(path: &str) -> Result<Settings, ScriptoriumError> {
    if Path::new(path).is_file() {
        settings_loader::from_toml_file_with_env(path)
    } else {
        tracing::debug!("Settings file '{path}' not found, using defaults");
        let mut settings = project_settings();
        settings_loader::apply_env_overrides(&mut settings);
        Ok(settings)
    }
}
