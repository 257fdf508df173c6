//! The `migrate` management command.
//!
//! Applies pending database migrations: loads the migration files, plans the
//! unapplied ones, executes their DDL (or only records them with `--fake`)
//! and synchronizes the content-type registry with the final schema state.

use async_trait::async_trait;
use scriptorium_core::{ScriptoriumError, Settings};
use scriptorium_db::{open_database, DatabaseBackend, Value};
use scriptorium_migrations::{
    final_state, MigrationExecutor, MigrationLoader, MigrationRecorder, ProjectState,
    SqliteSchemaEditor, CONTENT_TYPE_TABLE,
};

use crate::command::ManagementCommand;

/// Applies database migrations.
///
/// Supports `--fake` to mark migrations as applied without running their SQL,
/// and `--database` to select a database alias.
pub struct MigrateCommand;

/// Applies all pending migrations on the given backend.
///
/// Returns the final schema state, which callers reuse for fixture loading.
///
/// # Errors
///
/// Returns an error if the migration files are invalid or a DDL statement
/// fails; migrations applied before the failure stay recorded.
pub async fn apply_migrations(
    backend: &dyn DatabaseBackend,
    settings: &Settings,
    fake: bool,
) -> Result<ProjectState, ScriptoriumError> {
    let mut loader = MigrationLoader::new(settings.migrations_path(), &settings.installed_apps);
    let graph = loader.load()?;

    if graph.is_empty() {
        tracing::info!("No migrations found");
        return Ok(ProjectState::new());
    }

    let pending = {
        let mut probe = MigrationRecorder::new();
        probe.ensure_table(backend).await?;
        probe.load(backend).await?;
        graph
            .topological_order()?
            .into_iter()
            .filter(|key| !probe.is_applied(key))
            .count()
    };
    if pending == 0 {
        tracing::info!("No migrations to apply");
    } else if fake {
        tracing::info!("Marking {pending} migration(s) as applied without running them");
    } else {
        tracing::info!("Applying {pending} migration(s)");
    }

    let mut executor = MigrationExecutor::new(Box::new(SqliteSchemaEditor));
    executor.apply(backend, &graph, loader.migrations(), fake).await?;

    let state = final_state(&graph, loader.migrations())?;
    let created = sync_content_types(backend, &state).await?;
    if created > 0 {
        tracing::info!("Registered {created} content type(s)");
    }

    Ok(state)
}

/// Synchronizes the content-type registry with the schema state.
///
/// Inserts a row for every model missing from the registry table. Does
/// nothing when the registry table is not part of the schema (or has not
/// been created yet, e.g. after a pure fake migrate on an empty database).
///
/// Returns the number of rows created.
pub async fn sync_content_types(
    backend: &dyn DatabaseBackend,
    state: &ProjectState,
) -> Result<usize, ScriptoriumError> {
    if state.get_model("contenttypes", "contenttype").is_none() {
        return Ok(0);
    }
    let tables = backend.table_names().await?;
    if !tables.contains(&CONTENT_TYPE_TABLE.to_string()) {
        return Ok(0);
    }

    let mut created = 0;
    for model in state.models() {
        let existing = backend
            .query(
                &format!(
                    "SELECT \"id\" FROM \"{CONTENT_TYPE_TABLE}\" \
                     WHERE \"app_label\" = ?1 AND \"model\" = ?2"
                ),
                &[
                    Value::String(model.app_label.clone()),
                    Value::String(model.name.clone()),
                ],
            )
            .await?;
        if existing.is_empty() {
            backend
                .execute(
                    &format!(
                        "INSERT INTO \"{CONTENT_TYPE_TABLE}\" (\"app_label\", \"model\") \
                         VALUES (?1, ?2)"
                    ),
                    &[
                        Value::String(model.app_label.clone()),
                        Value::String(model.name.clone()),
                    ],
                )
                .await?;
            created += 1;
        }
    }
    Ok(created)
}

#[async_trait]
impl ManagementCommand for MigrateCommand {
    fn name(&self) -> &'static str {
        "migrate"
    }

    fn help(&self) -> &'static str {
        "Apply database migrations"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("fake")
                .long("fake")
                .action(clap::ArgAction::SetTrue)
                .help("Mark migrations as applied without running them"),
        )
        .arg(
            clap::Arg::new("database")
                .long("database")
                .default_value("default")
                .help("Database alias to migrate"),
        )
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), ScriptoriumError> {
        let database = matches
            .get_one::<String>("database")
            .map_or("default", String::as_str);
        let fake = matches.get_flag("fake");

        let db_settings = settings.database(database).ok_or_else(|| {
            ScriptoriumError::ImproperlyConfigured(format!("Unknown database alias: {database}"))
        })?;
        let backend = open_database(db_settings)?;

        tracing::info!("Running migrations on database '{database}'");
        apply_migrations(backend.as_ref(), settings, fake).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptorium_db::SqliteBackend;
    use std::path::Path;

    fn write_migration(dir: &Path, app: &str, name: &str, body: &str) {
        let app_dir = dir.join("migrations").join(app);
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(app_dir.join(format!("{name}.json")), body).unwrap();
    }

    fn test_settings(src: &Path) -> Settings {
        Settings {
            src_path: src.to_path_buf(),
            installed_apps: vec!["contenttypes".to_string(), "style".to_string()],
            ..Settings::default()
        }
    }

    fn seed_migrations(src: &Path) {
        write_migration(
            src,
            "contenttypes",
            "0001_initial",
            r#"{"initial": true, "operations": [
                {"op": "create_model", "name": "contenttype", "fields": [
                    {"name": "id", "type": "AutoField", "primary_key": true},
                    {"name": "app_label", "type": "CharField", "max_length": 100},
                    {"name": "model", "type": "CharField", "max_length": 100}
                ]}
            ]}"#,
        );
        write_migration(
            src,
            "style",
            "0001_initial",
            r#"{"initial": true, "operations": [
                {"op": "create_model", "name": "documentstyle", "fields": [
                    {"name": "id", "type": "AutoField", "primary_key": true},
                    {"name": "title", "type": "CharField", "max_length": 128}
                ]}
            ]}"#,
        );
    }

    #[tokio::test]
    async fn test_apply_migrations_creates_schema_and_content_types() {
        let dir = tempfile::tempdir().unwrap();
        seed_migrations(dir.path());
        let settings = test_settings(dir.path());
        let backend = SqliteBackend::memory().unwrap();

        let state = apply_migrations(&backend, &settings, false).await.unwrap();
        assert_eq!(state.len(), 2);

        let tables = backend.table_names().await.unwrap();
        assert!(tables.contains(&"style_documentstyle".to_string()));

        // Both models are registered as content types
        let rows = backend
            .query("SELECT \"app_label\", \"model\" FROM \"contenttypes_contenttype\"", &[])
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_fake_skips_ddl_and_sync() {
        let dir = tempfile::tempdir().unwrap();
        seed_migrations(dir.path());
        let settings = test_settings(dir.path());
        let backend = SqliteBackend::memory().unwrap();

        apply_migrations(&backend, &settings, true).await.unwrap();

        let tables = backend.table_names().await.unwrap();
        assert!(!tables.contains(&"style_documentstyle".to_string()));
        // The ledger was still written
        assert!(tables.contains(&scriptorium_migrations::LEDGER_TABLE.to_string()));
    }

    #[tokio::test]
    async fn test_sync_content_types_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        seed_migrations(dir.path());
        let settings = test_settings(dir.path());
        let backend = SqliteBackend::memory().unwrap();

        let state = apply_migrations(&backend, &settings, false).await.unwrap();
        let created = sync_content_types(&backend, &state).await.unwrap();
        assert_eq!(created, 0);
    }

    #[tokio::test]
    async fn test_missing_migrations_dir_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let settings = test_settings(dir.path());
        let backend = SqliteBackend::memory().unwrap();

        let state = apply_migrations(&backend, &settings, false).await.unwrap();
        assert!(state.is_empty());
    }

    #[test]
    fn test_command_metadata() {
        let cmd = MigrateCommand;
        assert_eq!(cmd.name(), "migrate");
        assert_eq!(cmd.help(), "Apply database migrations");
    }
}
