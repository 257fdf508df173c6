//! Settings for the scriptorium project.
//!
//! The [`Settings`] struct holds all configuration the management tooling
//! reads: database connections, source and static paths, locale paths and
//! the asset compression switches. Defaults are deliberately usable for
//! development; deployments override them from a TOML file and environment
//! variables (see [`crate::settings_loader`]).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Database connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// The database engine (e.g. `scriptorium.db.backends.sqlite3`).
    pub engine: String,
    /// The database name (a file path for SQLite, `:memory:` for tests).
    pub name: String,
    /// The database user.
    pub user: String,
    /// The database password.
    pub password: String,
    /// The database host.
    pub host: String,
    /// The database port.
    pub port: u16,
    /// Additional engine-specific options.
    pub options: HashMap<String, String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            engine: "scriptorium.db.backends.sqlite3".to_string(),
            name: "scriptorium.sqlite3".to_string(),
            user: String::new(),
            password: String::new(),
            host: String::new(),
            port: 0,
            options: HashMap::new(),
        }
    }
}

/// Static-asset compression configuration.
///
/// Both `enabled` and `offline` must be set for the initialization sequence
/// to attempt compression at all; the `compress` command itself refuses to
/// run (with a command error) when offline compression is disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressSettings {
    /// Whether compressed siblings should be served at all.
    pub enabled: bool,
    /// Whether compression happens ahead of time, at deploy.
    pub offline: bool,
    /// File extensions eligible for precompression.
    pub extensions: Vec<String>,
}

impl Default for CompressSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            offline: false,
            extensions: vec![
                "js".to_string(),
                "css".to_string(),
                "svg".to_string(),
                "json".to_string(),
            ],
        }
    }
}

/// Front-end transpilation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranspileSettings {
    /// Directory with ES-module sources, relative to `src_path`.
    pub src_dir: PathBuf,
    /// Output directory for bundles, relative to `src_path`.
    pub out_dir: PathBuf,
}

impl Default for TranspileSettings {
    fn default() -> Self {
        Self {
            src_dir: PathBuf::from("static/js"),
            out_dir: PathBuf::from("static-transpile"),
        }
    }
}

/// The complete set of project settings.
///
/// # Examples
///
/// ```
/// use scriptorium_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(settings.debug);
/// assert_eq!(settings.language_code, "en-us");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Whether debug mode is enabled. Static collection is skipped in
    /// debug mode.
    pub debug: bool,
    /// The secret key used for cryptographic signing by the serving stack.
    pub secret_key: String,
    /// Labels of the installed applications, in load order.
    pub installed_apps: Vec<String>,
    /// Root of the project sources: fixtures, locale catalogs, migration
    /// files and front-end sources live beneath this path.
    pub src_path: PathBuf,

    // ── Database ─────────────────────────────────────────────────────

    /// Database configurations, keyed by alias (e.g. "default").
    pub databases: HashMap<String, DatabaseSettings>,
    /// Directory with migration files, relative to `src_path`.
    pub migrations_dir: PathBuf,
    /// Directories to search for fixture files, relative to `src_path`.
    pub fixture_dirs: Vec<PathBuf>,

    // ── Static files ─────────────────────────────────────────────────

    /// URL prefix for static files.
    pub static_url: String,
    /// Absolute path where `collectstatic` places files.
    pub static_root: Option<PathBuf>,
    /// Additional directories to collect static files from, relative to
    /// `src_path`.
    pub staticfiles_dirs: Vec<PathBuf>,
    /// Front-end transpilation configuration.
    pub transpile: TranspileSettings,
    /// Static-asset compression configuration.
    pub compress: CompressSettings,

    // ── Internationalization ─────────────────────────────────────────

    /// The language code (e.g. "en-us").
    pub language_code: String,
    /// Directories with per-language message catalogs, relative to
    /// `src_path`.
    pub locale_paths: Vec<PathBuf>,

    // ── Logging ──────────────────────────────────────────────────────

    /// The log level filter (e.g. "info", "debug", "warn").
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        let mut databases = HashMap::new();
        databases.insert("default".to_string(), DatabaseSettings::default());

        Self {
            debug: true,
            secret_key: String::new(),
            installed_apps: vec![
                "contenttypes".to_string(),
                "user".to_string(),
                "style".to_string(),
                "base".to_string(),
                "document".to_string(),
            ],
            src_path: PathBuf::from("."),
            databases,
            migrations_dir: PathBuf::from("migrations"),
            fixture_dirs: vec![PathBuf::from("fixtures")],
            static_url: "/static/".to_string(),
            static_root: None,
            staticfiles_dirs: vec![PathBuf::from("static")],
            transpile: TranspileSettings::default(),
            compress: CompressSettings::default(),
            language_code: "en-us".to_string(),
            locale_paths: vec![PathBuf::from("locale")],
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Resolves a possibly-relative path against `src_path`.
    ///
    /// Absolute paths are returned unchanged, which lets deployments point
    /// individual directories outside the source tree.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.src_path.join(path)
        }
    }

    /// Returns the resolved migrations directory.
    pub fn migrations_path(&self) -> PathBuf {
        self.resolve(&self.migrations_dir)
    }

    /// Returns the resolved fixture search directories.
    pub fn fixture_paths(&self) -> Vec<PathBuf> {
        self.fixture_dirs.iter().map(|d| self.resolve(d)).collect()
    }

    /// Returns the configuration for the given database alias.
    pub fn database(&self, alias: &str) -> Option<&DatabaseSettings> {
        self.databases.get(alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.debug);
        assert!(settings.databases.contains_key("default"));
        assert_eq!(settings.installed_apps.len(), 5);
        assert!(!settings.compress.enabled);
        assert_eq!(settings.migrations_dir, PathBuf::from("migrations"));
    }

    #[test]
    fn test_resolve_relative() {
        let settings = Settings {
            src_path: PathBuf::from("/srv/app"),
            ..Settings::default()
        };
        assert_eq!(
            settings.resolve(Path::new("fixtures")),
            PathBuf::from("/srv/app/fixtures")
        );
    }

    #[test]
    fn test_resolve_absolute_unchanged() {
        let settings = Settings {
            src_path: PathBuf::from("/srv/app"),
            ..Settings::default()
        };
        assert_eq!(
            settings.resolve(Path::new("/var/static")),
            PathBuf::from("/var/static")
        );
    }

    #[test]
    fn test_database_lookup() {
        let settings = Settings::default();
        assert!(settings.database("default").is_some());
        assert!(settings.database("replica").is_none());
    }
}
