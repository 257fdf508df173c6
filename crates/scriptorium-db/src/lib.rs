//! # scriptorium-db
//!
//! Database access for scriptorium: the [`DatabaseBackend`] trait, scalar
//! [`Value`]s, result [`Row`]s, and the SQLite driver.
//!
//! The management commands only ever talk to the trait; the concrete backend
//! is chosen from the `databases` section of the settings.

#![allow(clippy::result_large_err)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]

pub mod backend;
pub mod row;
pub mod sqlite;
pub mod value;

pub use backend::{open_database, table_row_count, DatabaseBackend};
pub use row::Row;
pub use sqlite::SqliteBackend;
pub use value::Value;
