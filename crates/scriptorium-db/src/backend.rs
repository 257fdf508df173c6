//! The database backend trait.
//!
//! [`DatabaseBackend`] is the uniform seam between the management commands
//! and a concrete database driver. All methods are async; backends built on
//! synchronous drivers wrap their work in `spawn_blocking`.

use scriptorium_core::settings::DatabaseSettings;
use scriptorium_core::ScriptoriumError;

use crate::row::Row;
use crate::value::Value;

/// The core trait for database backends.
///
/// All methods are async because database operations are inherently
/// I/O-bound. Implementations must be `Send + Sync` so commands can share a
/// backend across tasks.
#[async_trait::async_trait]
pub trait DatabaseBackend: Send + Sync {
    /// Returns the vendor name (e.g. "sqlite").
    fn vendor(&self) -> &str;

    /// Executes a SQL statement that does not return rows.
    ///
    /// Returns the number of rows affected.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, ScriptoriumError>;

    /// Executes several semicolon-separated statements as one batch.
    async fn execute_batch(&self, sql: &str) -> Result<(), ScriptoriumError>;

    /// Executes a SQL query and returns all result rows.
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, ScriptoriumError>;

    /// Executes a SQL query and returns exactly one row.
    ///
    /// Returns [`ScriptoriumError::DoesNotExist`] if no rows are returned, or
    /// [`ScriptoriumError::MultipleObjectsReturned`] if more than one row is.
    async fn query_one(&self, sql: &str, params: &[Value]) -> Result<Row, ScriptoriumError>;

    /// Begins a transaction.
    async fn begin(&self) -> Result<(), ScriptoriumError>;

    /// Commits the current transaction.
    async fn commit(&self) -> Result<(), ScriptoriumError>;

    /// Rolls back the current transaction.
    async fn rollback(&self) -> Result<(), ScriptoriumError>;

    /// Returns the names of all user tables in the database.
    async fn table_names(&self) -> Result<Vec<String>, ScriptoriumError>;
}

/// Opens the backend described by the given database settings.
///
/// # Errors
///
/// Returns [`ScriptoriumError::ImproperlyConfigured`] for unknown engines and
/// an operational error if the database cannot be opened.
pub fn open_database(
    settings: &DatabaseSettings,
) -> Result<Box<dyn DatabaseBackend>, ScriptoriumError> {
    if settings.engine.ends_with("sqlite3") {
        Ok(Box::new(crate::sqlite::SqliteBackend::open(&settings.name)?))
    } else {
        Err(ScriptoriumError::ImproperlyConfigured(format!(
            "Unsupported database engine: {}",
            settings.engine
        )))
    }
}

/// Returns the number of rows in a table.
///
/// Used by the initialization command to gate fixture loading.
///
/// # Errors
///
/// Returns a database error if the table does not exist.
pub async fn table_row_count(
    backend: &dyn DatabaseBackend,
    table: &str,
) -> Result<i64, ScriptoriumError> {
    let row = backend
        .query_one(&format!("SELECT COUNT(*) AS n FROM \"{table}\""), &[])
        .await?;
    row.get_int("n")
}
