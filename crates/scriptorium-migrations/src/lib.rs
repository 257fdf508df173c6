//! # scriptorium-migrations
//!
//! The migration engine: schema state, migration files, DDL generation and
//! execution.
//!
//! Migrations are versioned JSON files organized per app. The
//! [`MigrationLoader`] discovers them and builds a dependency graph; the
//! [`MigrationExecutor`] applies pending migrations in topological order and
//! records them in the ledger. The fixture loader reuses the final
//! [`ProjectState`](state::ProjectState) to map model fields onto table
//! columns and to find the content-type restrictions on polymorphic
//! references.

#![allow(clippy::result_large_err)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]

pub mod executor;
pub mod fields;
pub mod graph;
pub mod loader;
pub mod operations;
pub mod schema_editor;
pub mod state;

pub use executor::{final_state, MigrationExecutor, MigrationRecorder, LEDGER_TABLE};
pub use fields::{ContentTypeFilter, ContentTypeRef, FieldType, OnDelete, CONTENT_TYPE_TABLE};
pub use graph::{Migration, MigrationGraph};
pub use loader::MigrationLoader;
pub use operations::Operation;
pub use schema_editor::{SchemaEditor, SqliteSchemaEditor};
pub use state::{FieldState, ModelState, ProjectState};
