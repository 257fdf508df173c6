//! SQLite database backend.
//!
//! [`SqliteBackend`] implements [`DatabaseBackend`](crate::backend::DatabaseBackend)
//! on top of `rusqlite`. The driver is synchronous, so every operation runs
//! on the blocking pool via `tokio::task::spawn_blocking`; the single
//! connection is guarded by an async mutex, which also serializes statements
//! within a transaction. WAL journal mode and foreign-key enforcement are
//! switched on at open; `:memory:` databases are supported for tests.

use std::path::PathBuf;
use std::sync::Arc;

use scriptorium_core::ScriptoriumError;
use tokio::sync::Mutex;

use crate::backend::DatabaseBackend;
use crate::row::Row;
use crate::value::Value;

/// A SQLite database backend over a single guarded connection.
pub struct SqliteBackend {
    /// The database file path (or ":memory:").
    path: PathBuf,
    /// The connection, shared with the blocking tasks.
    conn: Arc<Mutex<rusqlite::Connection>>,
}

impl SqliteBackend {
    /// Opens the database at the given path, creating it when absent.
    ///
    /// The special path `:memory:` opens a fresh in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an operational error if the database cannot be opened or the
    /// pragmas cannot be applied.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ScriptoriumError> {
        let path = path.into();
        let conn = if path.to_str() == Some(":memory:") {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(&path)
        }
        .map_err(|e| ScriptoriumError::OperationalError(format!("SQLite open failed: {e}")))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| {
                ScriptoriumError::OperationalError(format!("Failed to set pragmas: {e}"))
            })?;

        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens a fresh in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an operational error if the database cannot be created.
    pub fn memory() -> Result<Self, ScriptoriumError> {
        Self::open(":memory:")
    }

    /// The database file path.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Binds parameter values positionally to a prepared statement.
    fn bind_params(
        stmt: &mut rusqlite::Statement<'_>,
        params: &[Value],
    ) -> Result<(), ScriptoriumError> {
        for (i, param) in params.iter().enumerate() {
            let idx = i + 1;
            match param {
                Value::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null),
                Value::Bool(b) => stmt.raw_bind_parameter(idx, b),
                Value::Int(v) => stmt.raw_bind_parameter(idx, v),
                Value::Float(v) => stmt.raw_bind_parameter(idx, v),
                Value::String(s) => stmt.raw_bind_parameter(idx, s.as_str()),
                Value::Bytes(b) => stmt.raw_bind_parameter(idx, b.as_slice()),
                Value::Json(j) => stmt.raw_bind_parameter(idx, j.to_string().as_str()),
            }
            .map_err(|e| ScriptoriumError::DatabaseError(format!("Bind error: {e}")))?;
        }
        Ok(())
    }

    /// Converts a `rusqlite` row into our generic [`Row`].
    fn convert_row(
        sqlite_row: &rusqlite::Row<'_>,
        column_names: &[String],
    ) -> Result<Row, ScriptoriumError> {
        let values = column_names
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let value = match sqlite_row.get_ref(i).map_err(|e| {
                    ScriptoriumError::DatabaseError(format!("Column read error: {e}"))
                })? {
                    rusqlite::types::ValueRef::Null => Value::Null,
                    rusqlite::types::ValueRef::Integer(v) => Value::Int(v),
                    rusqlite::types::ValueRef::Real(v) => Value::Float(v),
                    rusqlite::types::ValueRef::Text(t) => {
                        Value::String(String::from_utf8_lossy(t).into_owned())
                    }
                    rusqlite::types::ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
                };
                Ok(value)
            })
            .collect::<Result<Vec<_>, ScriptoriumError>>()?;

        Ok(Row::new(column_names.to_vec(), values))
    }

    /// Runs a closure against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, ScriptoriumError>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T, ScriptoriumError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            f(&conn)
        })
        .await
        .map_err(|e| ScriptoriumError::OperationalError(format!("Blocking task failed: {e}")))?
    }
}

#[async_trait::async_trait]
impl DatabaseBackend for SqliteBackend {
    fn vendor(&self) -> &str {
        "sqlite"
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, ScriptoriumError> {
        let sql = sql.to_string();
        let params = params.to_vec();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| ScriptoriumError::DatabaseError(format!("Prepare error: {e}")))?;
            Self::bind_params(&mut stmt, &params)?;
            let changed = stmt
                .raw_execute()
                .map_err(|e| ScriptoriumError::DatabaseError(format!("Execute error: {e}")))?;
            Ok(changed as u64)
        })
        .await
    }

    async fn execute_batch(&self, sql: &str) -> Result<(), ScriptoriumError> {
        let sql = sql.to_string();
        self.with_conn(move |conn| {
            conn.execute_batch(&sql)
                .map_err(|e| ScriptoriumError::DatabaseError(format!("Batch error: {e}")))
        })
        .await
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, ScriptoriumError> {
        let sql = sql.to_string();
        let params = params.to_vec();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| ScriptoriumError::DatabaseError(format!("Prepare error: {e}")))?;
            let column_names: Vec<String> =
                stmt.column_names().iter().map(ToString::to_string).collect();
            Self::bind_params(&mut stmt, &params)?;

            let mut rows = stmt.raw_query();
            let mut result = Vec::new();
            while let Some(sqlite_row) = rows
                .next()
                .map_err(|e| ScriptoriumError::DatabaseError(format!("Query error: {e}")))?
            {
                result.push(Self::convert_row(sqlite_row, &column_names)?);
            }
            Ok(result)
        })
        .await
    }

    async fn query_one(&self, sql: &str, params: &[Value]) -> Result<Row, ScriptoriumError> {
        let mut rows = self.query(sql, params).await?;
        match rows.len() {
            0 => Err(ScriptoriumError::DoesNotExist(format!(
                "Query returned no rows: {sql}"
            ))),
            1 => Ok(rows.remove(0)),
            n => Err(ScriptoriumError::MultipleObjectsReturned(format!(
                "Query returned {n} rows: {sql}"
            ))),
        }
    }

    async fn begin(&self) -> Result<(), ScriptoriumError> {
        self.execute_batch("BEGIN").await
    }

    async fn commit(&self) -> Result<(), ScriptoriumError> {
        self.execute_batch("COMMIT").await
    }

    async fn rollback(&self) -> Result<(), ScriptoriumError> {
        self.execute_batch("ROLLBACK").await
    }

    async fn table_names(&self) -> Result<Vec<String>, ScriptoriumError> {
        let rows = self
            .query(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
                &[],
            )
            .await?;
        rows.iter()
            .map(|row| row.get_str("name").map(ToString::to_string))
            .collect()
    }
}
