//! Migration discovery from the filesystem.
//!
//! The [`MigrationLoader`] scans a directory structure of the form:
//!
//! ```text
//! migrations_dir/
//!   document/
//!     0001_initial.json
//!     0002_accessright.json
//!     0003_allow_invite_access_holder.json
//!   user/
//!     0001_initial.json
//! ```
//!
//! Each file is a JSON migration carrying its dependencies and operations;
//! identity comes from the app directory and the file stem. Only directories
//! named in the installed apps are scanned.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use scriptorium_core::ScriptoriumError;

use crate::graph::{Migration, MigrationGraph};

/// Discovers and loads migrations from the filesystem.
pub struct MigrationLoader {
    /// The base directory containing per-app migration directories.
    migrations_dir: PathBuf,
    /// The app labels to scan for.
    installed_apps: Vec<String>,
    /// Discovered migrations keyed by `(app_label, name)`.
    migrations: HashMap<(String, String), Migration>,
}

impl MigrationLoader {
    /// Creates a new loader for the given directory and installed apps.
    pub fn new(migrations_dir: impl Into<PathBuf>, installed_apps: &[String]) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
            installed_apps: installed_apps.to_vec(),
            migrations: HashMap::new(),
        }
    }

    /// Scans the filesystem and builds the dependency graph.
    ///
    /// A missing migrations directory yields an empty graph rather than an
    /// error, so fresh checkouts work before any migration exists.
    ///
    /// # Errors
    ///
    /// Returns an error when a migration file cannot be read or parsed, a
    /// dependency is unknown, or the graph contains a cycle.
    pub fn load(&mut self) -> Result<MigrationGraph, ScriptoriumError> {
        self.discover()?;
        self.build_graph()
    }

    /// Returns the discovered migrations.
    pub fn migrations(&self) -> &HashMap<(String, String), Migration> {
        &self.migrations
    }

    fn discover(&mut self) -> Result<(), ScriptoriumError> {
        self.migrations.clear();

        if !self.migrations_dir.exists() {
            return Ok(());
        }

        let apps = self.installed_apps.clone();
        for app_label in &apps {
            let app_dir = self.migrations_dir.join(app_label);
            if app_dir.is_dir() {
                self.discover_app(app_label, &app_dir)?;
            }
        }

        Ok(())
    }

    fn discover_app(&mut self, app_label: &str, app_dir: &Path) -> Result<(), ScriptoriumError> {
        let entries = std::fs::read_dir(app_dir).map_err(|e| {
            ScriptoriumError::DatabaseError(format!(
                "Cannot read migrations for app '{app_label}': {e}"
            ))
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| {
                ScriptoriumError::DatabaseError(format!("Cannot read directory entry: {e}"))
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let name = path
                .file_stem()
                .and_then(|n| n.to_str())
                .unwrap_or("")
                .to_string();
            if name.is_empty() {
                continue;
            }
            let migration = Self::parse_migration_file(app_label, &name, &path)?;
            self.migrations
                .insert((app_label.to_string(), name), migration);
        }

        Ok(())
    }

    fn parse_migration_file(
        app_label: &str,
        name: &str,
        path: &Path,
    ) -> Result<Migration, ScriptoriumError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScriptoriumError::DatabaseError(format!(
                "Cannot read migration file '{}': {e}",
                path.display()
            ))
        })?;

        let mut migration: Migration = serde_json::from_str(&content).map_err(|e| {
            ScriptoriumError::SerializationError(format!(
                "Invalid migration '{}': {e}",
                path.display()
            ))
        })?;
        migration.app_label = app_label.to_string();
        migration.name = name.to_string();
        Ok(migration)
    }

    fn build_graph(&self) -> Result<MigrationGraph, ScriptoriumError> {
        let mut graph = MigrationGraph::new();

        for key in self.migrations.keys() {
            graph.add_node(&key.0, &key.1);
        }
        for (key, migration) in &self.migrations {
            for dep in &migration.dependencies {
                graph.add_dependency(key, dep)?;
            }
        }

        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_migration(dir: &Path, app: &str, name: &str, body: &str) {
        let app_dir = dir.join(app);
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(app_dir.join(format!("{name}.json")), body).unwrap();
    }

    #[test]
    fn test_load_missing_dir_is_empty() {
        let mut loader = MigrationLoader::new("/nonexistent/migrations", &["user".to_string()]);
        let graph = loader.load().unwrap();
        assert!(graph.is_empty());
    }

    #[test]
    fn test_load_builds_graph() {
        let dir = tempfile::tempdir().unwrap();
        write_migration(
            dir.path(),
            "user",
            "0001_initial",
            r#"{"initial": true, "operations": [
                {"op": "create_model", "name": "user", "fields": [
                    {"name": "id", "type": "AutoField", "primary_key": true},
                    {"name": "username", "type": "CharField", "max_length": 150, "unique": true}
                ]}
            ]}"#,
        );
        write_migration(
            dir.path(),
            "user",
            "0002_userinvite",
            r#"{"dependencies": [["user", "0001_initial"]], "operations": [
                {"op": "create_model", "name": "userinvite", "fields": [
                    {"name": "id", "type": "AutoField", "primary_key": true},
                    {"name": "email", "type": "CharField", "max_length": 254}
                ]}
            ]}"#,
        );

        let apps = vec!["user".to_string()];
        let mut loader = MigrationLoader::new(dir.path(), &apps);
        let graph = loader.load().unwrap();

        assert_eq!(graph.len(), 2);
        let order = graph.topological_order().unwrap();
        assert_eq!(order[0].1, "0001_initial");

        let migration = loader
            .migrations()
            .get(&("user".to_string(), "0002_userinvite".to_string()))
            .unwrap();
        assert_eq!(migration.operations.len(), 1);
        assert!(!migration.initial);
    }

    #[test]
    fn test_uninstalled_apps_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_migration(dir.path(), "legacy", "0001_initial", r"{}");

        let apps = vec!["user".to_string()];
        let mut loader = MigrationLoader::new(dir.path(), &apps);
        let graph = loader.load().unwrap();
        assert!(graph.is_empty());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_migration(dir.path(), "user", "0001_initial", "not json");

        let apps = vec!["user".to_string()];
        let mut loader = MigrationLoader::new(dir.path(), &apps);
        assert!(loader.load().is_err());
    }

    #[test]
    fn test_unknown_dependency_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_migration(
            dir.path(),
            "user",
            "0002_userinvite",
            r#"{"dependencies": [["user", "0001_initial"]]}"#,
        );

        let apps = vec!["user".to_string()];
        let mut loader = MigrationLoader::new(dir.path(), &apps);
        assert!(loader.load().is_err());
    }
}
