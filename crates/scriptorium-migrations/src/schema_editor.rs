//! DDL generation.
//!
//! The [`SchemaEditor`] trait turns schema state into SQL statements for one
//! database dialect. The operations return `Vec<String>` because SQLite in
//! particular needs multiple statements: it cannot alter a column in place,
//! so [`SqliteSchemaEditor`] rewrites the whole table (create the new table,
//! copy the surviving columns, drop the old table, rename).

use crate::fields::FieldType;
use crate::state::{FieldState, ModelState};

/// Generates DDL SQL for schema operations.
pub trait SchemaEditor: Send + Sync {
    /// Generates `CREATE TABLE` DDL for a model.
    fn create_table(&self, model: &ModelState) -> Vec<String>;

    /// Generates `DROP TABLE` DDL.
    fn drop_table(&self, table_name: &str) -> Vec<String>;

    /// Generates `ALTER TABLE ... ADD COLUMN` DDL.
    fn add_column(&self, table_name: &str, field: &FieldState) -> Vec<String>;

    /// Generates `ALTER TABLE ... DROP COLUMN` DDL.
    fn drop_column(&self, table_name: &str, column_name: &str) -> Vec<String>;

    /// Generates DDL to bring a table to the given model state, keeping the
    /// data in the columns present both before and after.
    fn rebuild_table(&self, model: &ModelState, old_columns: &[String]) -> Vec<String>;

    /// Generates `CREATE INDEX` DDL.
    fn create_index(
        &self,
        table_name: &str,
        index_name: &str,
        columns: &[String],
        unique: bool,
    ) -> Vec<String>;

    /// Generates the SQL fragment for a column definition.
    fn column_sql(&self, field: &FieldState) -> String;
}

/// Generates the default value SQL fragment for a field.
fn default_sql(field: &FieldState) -> String {
    match &field.default {
        Some(serde_json::Value::Null) => " DEFAULT NULL".to_string(),
        Some(serde_json::Value::Bool(b)) => format!(" DEFAULT {}", i64::from(*b)),
        Some(serde_json::Value::Number(n)) => format!(" DEFAULT {n}"),
        Some(serde_json::Value::String(s)) => format!(" DEFAULT '{}'", s.replace('\'', "''")),
        Some(_) | None => String::new(),
    }
}

/// Extracts the table name from an "app_label.model" reference.
fn fk_target_table(to: &str) -> String {
    to.replace('.', "_")
}

/// Schema editor for SQLite databases.
pub struct SqliteSchemaEditor;

impl SchemaEditor for SqliteSchemaEditor {
    fn create_table(&self, model: &ModelState) -> Vec<String> {
        let table_name = model.db_table();
        let mut col_defs: Vec<String> = Vec::new();
        let mut constraints: Vec<String> = Vec::new();

        for field in &model.fields {
            col_defs.push(format!("\"{}\" {}", field.column(), self.column_sql(field)));

            if let FieldType::ForeignKey { to, on_delete, .. } = &field.field_type {
                constraints.push(format!(
                    "FOREIGN KEY (\"{}\") REFERENCES \"{}\" (\"id\") ON DELETE {}",
                    field.column(),
                    fk_target_table(to),
                    on_delete.sql()
                ));
            }
        }

        let mut all_parts = col_defs;
        all_parts.extend(constraints);
        let body = all_parts.join(", ");
        vec![format!("CREATE TABLE \"{table_name}\" ({body})")]
    }

    fn drop_table(&self, table_name: &str) -> Vec<String> {
        vec![format!("DROP TABLE IF EXISTS \"{table_name}\"")]
    }

    fn add_column(&self, table_name: &str, field: &FieldState) -> Vec<String> {
        let col_sql = self.column_sql(field);
        vec![format!(
            "ALTER TABLE \"{table_name}\" ADD COLUMN \"{}\" {col_sql}",
            field.column()
        )]
    }

    fn drop_column(&self, table_name: &str, column_name: &str) -> Vec<String> {
        vec![format!(
            "ALTER TABLE \"{table_name}\" DROP COLUMN \"{column_name}\""
        )]
    }

    fn rebuild_table(&self, model: &ModelState, old_columns: &[String]) -> Vec<String> {
        let table_name = model.db_table();
        let tmp_name = format!("__new_{table_name}");

        // Build the new table under a temporary name.
        let create = self
            .create_table(model)
            .into_iter()
            .map(|sql| sql.replacen(&format!("\"{table_name}\""), &format!("\"{tmp_name}\""), 1));

        // Copy the columns that survive the change.
        let surviving: Vec<String> = model
            .columns()
            .into_iter()
            .filter(|c| old_columns.contains(c))
            .map(|c| format!("\"{c}\""))
            .collect();
        let copy = format!(
            "INSERT INTO \"{tmp_name}\" ({cols}) SELECT {cols} FROM \"{table_name}\"",
            cols = surviving.join(", ")
        );

        let mut statements: Vec<String> = create.collect();
        statements.push(copy);
        statements.push(format!("DROP TABLE \"{table_name}\""));
        statements.push(format!(
            "ALTER TABLE \"{tmp_name}\" RENAME TO \"{table_name}\""
        ));
        statements
    }

    fn create_index(
        &self,
        table_name: &str,
        index_name: &str,
        columns: &[String],
        unique: bool,
    ) -> Vec<String> {
        let unique = if unique { "UNIQUE " } else { "" };
        let cols: Vec<String> = columns.iter().map(|c| format!("\"{c}\"")).collect();
        vec![format!(
            "CREATE {unique}INDEX \"{index_name}\" ON \"{table_name}\" ({})",
            cols.join(", ")
        )]
    }

    fn column_sql(&self, field: &FieldState) -> String {
        let type_str = field.field_type.sqlite_type();
        let null_str = if field.primary_key {
            " PRIMARY KEY"
        } else if field.null {
            ""
        } else {
            " NOT NULL"
        };
        let autoincrement = if field.primary_key
            && matches!(field.field_type, FieldType::AutoField)
        {
            " AUTOINCREMENT"
        } else {
            ""
        };
        let unique_str = if field.unique && !field.primary_key {
            " UNIQUE"
        } else {
            ""
        };
        let default_str = default_sql(field);
        format!("{type_str}{null_str}{autoincrement}{unique_str}{default_str}")
    }
}
