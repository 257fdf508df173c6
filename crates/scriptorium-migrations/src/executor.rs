//! Migration execution.
//!
//! The [`MigrationExecutor`] walks the dependency graph in topological order,
//! generates DDL for every migration not yet recorded in the ledger, executes
//! it (unless faking) and records it. The [`MigrationRecorder`] persists the
//! ledger in the [`LEDGER_TABLE`] table, which the `flush` command preserves
//! so a data wipe does not forget the schema history.

use std::collections::{HashMap, HashSet};

use scriptorium_core::ScriptoriumError;
use scriptorium_db::{DatabaseBackend, Value};

use crate::graph::{Migration, MigrationGraph};
use crate::schema_editor::SchemaEditor;
use crate::state::ProjectState;

/// The table recording which migrations have been applied.
pub const LEDGER_TABLE: &str = "scriptorium_migrations";

/// Tracks which migrations have been applied.
///
/// Operates both in-memory and against the ledger table: the in-memory set
/// drives plan building, the table provides persistence across runs.
#[derive(Debug, Clone, Default)]
pub struct MigrationRecorder {
    applied: HashSet<(String, String)>,
}

impl MigrationRecorder {
    /// Creates a new empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the SQL creating the ledger table.
    pub fn ensure_schema_sql() -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS \"{LEDGER_TABLE}\" (\
             \"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \
             \"app\" TEXT NOT NULL, \
             \"name\" TEXT NOT NULL, \
             \"applied\" TEXT NOT NULL)"
        )
    }

    /// Creates the ledger table if it does not exist.
    pub async fn ensure_table(
        &self,
        backend: &dyn DatabaseBackend,
    ) -> Result<(), ScriptoriumError> {
        backend.execute(&Self::ensure_schema_sql(), &[]).await?;
        Ok(())
    }

    /// Loads the applied set from the ledger table.
    pub async fn load(&mut self, backend: &dyn DatabaseBackend) -> Result<(), ScriptoriumError> {
        let rows = backend
            .query(
                &format!("SELECT \"app\", \"name\" FROM \"{LEDGER_TABLE}\""),
                &[],
            )
            .await?;
        self.applied = rows
            .iter()
            .map(|row| {
                Ok((
                    row.get_str("app")?.to_string(),
                    row.get_str("name")?.to_string(),
                ))
            })
            .collect::<Result<_, ScriptoriumError>>()?;
        Ok(())
    }

    /// Records a migration as applied, in memory and in the ledger.
    pub async fn record(
        &mut self,
        backend: &dyn DatabaseBackend,
        key: &(String, String),
    ) -> Result<(), ScriptoriumError> {
        backend
            .execute(
                &format!(
                    "INSERT INTO \"{LEDGER_TABLE}\" (\"app\", \"name\", \"applied\") \
                     VALUES (?1, ?2, ?3)"
                ),
                &[
                    Value::String(key.0.clone()),
                    Value::String(key.1.clone()),
                    Value::String(chrono::Utc::now().to_rfc3339()),
                ],
            )
            .await?;
        self.applied.insert(key.clone());
        Ok(())
    }

    /// Returns `true` if the given migration is recorded as applied.
    pub fn is_applied(&self, key: &(String, String)) -> bool {
        self.applied.contains(key)
    }

    /// Returns the set of applied migrations.
    pub fn applied(&self) -> &HashSet<(String, String)> {
        &self.applied
    }
}

/// Builds the project state implied by a full migration set.
///
/// Used by the fixture loader and the content-type synchronization, which
/// need the final schema without touching the database.
///
/// # Errors
///
/// Returns an error if the graph is cyclic or an operation is inconsistent.
pub fn final_state(
    graph: &MigrationGraph,
    migrations: &HashMap<(String, String), Migration>,
) -> Result<ProjectState, ScriptoriumError> {
    let mut state = ProjectState::new();
    for key in graph.topological_order()? {
        let migration = migrations.get(&key).ok_or_else(|| {
            ScriptoriumError::DatabaseError(format!(
                "Operations for migration {}.{} not found",
                key.0, key.1
            ))
        })?;
        for op in &migration.operations {
            op.state_forwards(&key.0, &mut state)?;
        }
    }
    Ok(state)
}

/// Executes migrations against a database.
pub struct MigrationExecutor {
    editor: Box<dyn SchemaEditor>,
    recorder: MigrationRecorder,
}

impl MigrationExecutor {
    /// Creates a new executor with the given schema editor.
    pub fn new(editor: Box<dyn SchemaEditor>) -> Self {
        Self {
            editor,
            recorder: MigrationRecorder::new(),
        }
    }

    /// Returns the recorder.
    pub fn recorder(&self) -> &MigrationRecorder {
        &self.recorder
    }

    /// Applies all pending migrations.
    ///
    /// Walks the full graph in order, threading the schema state through
    /// every migration (applied ones included, so DDL for later migrations
    /// sees the right columns). Pending migrations have their DDL executed
    /// unless `fake` is set, and are recorded in the ledger either way.
    ///
    /// Returns the SQL generated for the pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error on the first failing statement; earlier migrations
    /// stay recorded.
    pub async fn apply(
        &mut self,
        backend: &dyn DatabaseBackend,
        graph: &MigrationGraph,
        migrations: &HashMap<(String, String), Migration>,
        fake: bool,
    ) -> Result<Vec<String>, ScriptoriumError> {
        self.recorder.ensure_table(backend).await?;
        self.recorder.load(backend).await?;

        let order = graph.topological_order()?;
        let mut state = ProjectState::new();
        let mut executed = Vec::new();

        for key in &order {
            let migration = migrations.get(key).ok_or_else(|| {
                ScriptoriumError::DatabaseError(format!(
                    "Operations for migration {}.{} not found",
                    key.0, key.1
                ))
            })?;

            if self.recorder.is_applied(key) {
                for op in &migration.operations {
                    op.state_forwards(&key.0, &mut state)?;
                }
                continue;
            }

            let mut step_sql = Vec::new();
            for op in &migration.operations {
                let from_state = state.clone();
                op.state_forwards(&key.0, &mut state)?;
                step_sql.extend(op.database_forwards(
                    &key.0,
                    self.editor.as_ref(),
                    &from_state,
                    &state,
                )?);
            }

            if fake {
                tracing::info!("Faking {}.{}", key.0, key.1);
            } else {
                tracing::info!("Applying {}.{}", key.0, key.1);
                for sql in &step_sql {
                    backend.execute(sql, &[]).await?;
                }
            }

            self.recorder.record(backend, key).await?;
            executed.extend(step_sql);
        }

        Ok(executed)
    }
}
