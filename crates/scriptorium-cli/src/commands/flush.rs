//! The `flush` management command.
//!
//! Deletes all data from the database while keeping the schema and the
//! migration ledger, returning the database to its freshly-migrated state.

use async_trait::async_trait;
use scriptorium_core::{ScriptoriumError, Settings};
use scriptorium_db::{open_database, DatabaseBackend};
use scriptorium_migrations::LEDGER_TABLE;

use crate::command::ManagementCommand;

/// Removes all data from the database.
///
/// Requires `--noinput` to make clear this is a non-interactive, destructive
/// operation.
pub struct FlushCommand;

/// Generates the SQL statements deleting all rows from the given tables.
pub fn generate_flush_sql(table_names: &[String]) -> Vec<String> {
    table_names
        .iter()
        .map(|table| format!("DELETE FROM \"{table}\""))
        .collect()
}

/// Deletes all rows from every table except the migration ledger.
///
/// Runs in a single transaction with deferred foreign-key checks, so the
/// delete order does not matter. Auto-increment counters of the flushed
/// tables are reset.
///
/// Returns the number of flushed tables.
///
/// # Errors
///
/// Rolls back and returns the error if any statement fails.
pub async fn flush_database(backend: &dyn DatabaseBackend) -> Result<usize, ScriptoriumError> {
    let tables: Vec<String> = backend
        .table_names()
        .await?
        .into_iter()
        .filter(|t| t != LEDGER_TABLE)
        .collect();

    if tables.is_empty() {
        tracing::info!("No tables found, nothing to flush");
        return Ok(0);
    }

    backend.begin().await?;
    backend.execute_batch("PRAGMA defer_foreign_keys = ON").await?;

    let result: Result<(), ScriptoriumError> = async {
        for sql in generate_flush_sql(&tables) {
            backend.execute(&sql, &[]).await?;
        }
        // Reset the auto-increment counters of the flushed tables.
        for table in &tables {
            backend
                .execute(
                    "DELETE FROM \"sqlite_sequence\" WHERE \"name\" = ?1",
                    &[scriptorium_db::Value::String(table.clone())],
                )
                .await
                // Absent when no table uses AUTOINCREMENT.
                .ok();
        }
        Ok(())
    }
    .await;

    match result {
        Ok(()) => {
            backend.commit().await?;
            Ok(tables.len())
        }
        Err(e) => {
            backend.rollback().await.ok();
            Err(e)
        }
    }
}

#[async_trait]
impl ManagementCommand for FlushCommand {
    fn name(&self) -> &'static str {
        "flush"
    }

    fn help(&self) -> &'static str {
        "Delete all data from the database"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("noinput")
                .long("noinput")
                .action(clap::ArgAction::SetTrue)
                .help("Skip the confirmation prompt"),
        )
        .arg(
            clap::Arg::new("database")
                .long("database")
                .default_value("default")
                .help("Database alias to flush"),
        )
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), ScriptoriumError> {
        let noinput = matches.get_flag("noinput");
        let database = matches
            .get_one::<String>("database")
            .map_or("default", String::as_str);

        if !noinput {
            return Err(ScriptoriumError::CommandError(
                "This will delete ALL data. Re-run with --noinput to proceed".to_string(),
            ));
        }

        let db_settings = settings.database(database).ok_or_else(|| {
            ScriptoriumError::ImproperlyConfigured(format!("Unknown database alias: {database}"))
        })?;
        let backend = open_database(db_settings)?;

        tracing::info!("Flushing database '{database}'");
        let flushed = flush_database(backend.as_ref()).await?;
        tracing::info!("Flushed {flushed} table(s) from database '{database}'");

        Ok(())
    }
}
