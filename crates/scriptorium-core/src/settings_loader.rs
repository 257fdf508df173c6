//! Settings loading from configuration files.
//!
//! Loads [`Settings`] from a TOML file merged over the defaults, then applies
//! environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `SCRIPTORIUM_DEBUG` | `debug` |
//! | `SCRIPTORIUM_SECRET_KEY` | `secret_key` |
//! | `SCRIPTORIUM_SRC_PATH` | `src_path` |
//! | `SCRIPTORIUM_STATIC_ROOT` | `static_root` |
//! | `SCRIPTORIUM_LOG_LEVEL` | `log_level` |
//! | `SCRIPTORIUM_LANGUAGE_CODE` | `language_code` |

use std::path::{Path, PathBuf};

use crate::error::ScriptoriumError;
use crate::settings::Settings;

/// Loads settings from a TOML string.
///
/// The TOML is merged over the default settings, so a configuration file
/// only needs to name the values it changes.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or cannot be deserialized.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, ScriptoriumError> {
    // Deserialize the TOML into a serde_json::Value and merge it with the
    // defaults, so fields absent from the file keep their default values.
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| ScriptoriumError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;

    let json_value = toml_to_json(toml_value);
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        ScriptoriumError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, json_value);
    serde_json::from_value(merged).map_err(|e| {
        ScriptoriumError::ConfigurationError(format!(
            "Failed to deserialize settings from TOML: {e}"
        ))
    })
}

/// Loads settings from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, ScriptoriumError> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        ScriptoriumError::ConfigurationError(format!(
            "Failed to read settings file '{}': {e}",
            path.as_ref().display()
        ))
    })?;
    from_toml_str(&content)
}

/// Loads settings from a TOML file and applies environment overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, ScriptoriumError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Applies `SCRIPTORIUM_*` environment variable overrides to the settings.
pub fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(debug) = std::env::var("SCRIPTORIUM_DEBUG") {
        settings.debug = matches!(debug.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
    }
    if let Ok(secret_key) = std::env::var("SCRIPTORIUM_SECRET_KEY") {
        settings.secret_key = secret_key;
    }
    if let Ok(src_path) = std::env::var("SCRIPTORIUM_SRC_PATH") {
        settings.src_path = PathBuf::from(src_path);
    }
    if let Ok(static_root) = std::env::var("SCRIPTORIUM_STATIC_ROOT") {
        settings.static_root = Some(PathBuf::from(static_root));
    }
    if let Ok(log_level) = std::env::var("SCRIPTORIUM_LOG_LEVEL") {
        settings.log_level = log_level;
    }
    if let Ok(language_code) = std::env::var("SCRIPTORIUM_LANGUAGE_CODE") {
        settings.language_code = language_code;
    }
}

/// Converts a TOML value into a JSON value.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Merges `overlay` into `base`, recursing into objects.
///
/// Non-object overlay values replace the base value entirely; arrays are
/// replaced, not concatenated.
fn merge_json(base: serde_json::Value, overlay: serde_json::Value) -> serde_json::Value {
    match (base, overlay) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => merge_json(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}
