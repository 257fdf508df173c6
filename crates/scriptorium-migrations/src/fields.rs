//! Field type definitions for the schema state.
//!
//! Each [`FieldType`] variant determines a SQL column type and behavior.
//! Relational fields carry the target model and, for polymorphic references,
//! a [`ContentTypeFilter`] restricting the permissible target content types.

use serde::{Deserialize, Serialize};

/// The database table holding the content-type registry.
pub const CONTENT_TYPE_TABLE: &str = "contenttypes_contenttype";

/// Behavior when a referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnDelete {
    /// Delete the referencing row as well.
    Cascade,
    /// Refuse the delete.
    Protect,
    /// Set the referencing column to NULL.
    SetNull,
    /// Take no action.
    DoNothing,
}

impl OnDelete {
    /// Returns the SQL clause for this behavior.
    pub fn sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Protect => "RESTRICT",
            Self::SetNull => "SET NULL",
            Self::DoNothing => "NO ACTION",
        }
    }
}

/// A reference to a content type by its natural key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeRef {
    /// The application label (e.g. "user").
    pub app_label: String,
    /// The model name in lowercase (e.g. "userinvite").
    pub model: String,
}

impl ContentTypeRef {
    /// Creates a new content-type reference.
    pub fn new(app_label: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            app_label: app_label.into(),
            model: model.into(),
        }
    }
}

impl std::fmt::Display for ContentTypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.app_label, self.model)
    }
}

/// Restricts which content types a polymorphic foreign key may point at.
///
/// The filter is a disjunction: a content type is permitted when it matches
/// any of the listed references. It is enforced when rows are inserted
/// through the fixture loader, and [`ContentTypeFilter::sql_condition`]
/// compiles it for query-level checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeFilter {
    /// The permitted content types.
    pub any: Vec<ContentTypeRef>,
}

impl ContentTypeFilter {
    /// Creates a filter from a list of permitted content types.
    pub fn new(any: Vec<ContentTypeRef>) -> Self {
        Self { any }
    }

    /// Returns `true` if the given content type is permitted.
    pub fn allows(&self, app_label: &str, model: &str) -> bool {
        self.any
            .iter()
            .any(|r| r.app_label == app_label && r.model == model)
    }

    /// Compiles the filter into a SQL condition on the given column.
    ///
    /// The condition restricts the column to ids of permitted rows in the
    /// content-type registry table.
    pub fn sql_condition(&self, column: &str) -> String {
        let alternatives: Vec<String> = self
            .any
            .iter()
            .map(|r| {
                format!(
                    "(\"app_label\" = '{}' AND \"model\" = '{}')",
                    sql_escape(&r.app_label),
                    sql_escape(&r.model)
                )
            })
            .collect();
        format!(
            "\"{column}\" IN (SELECT \"id\" FROM \"{CONTENT_TYPE_TABLE}\" WHERE {})",
            alternatives.join(" OR ")
        )
    }
}

/// Escapes single quotes for embedding in a SQL string literal.
fn sql_escape(s: &str) -> String {
    s.replace('\'', "''")
}

/// The type of a model field, determining its SQL column type and behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FieldType {
    /// Auto-incrementing integer primary key.
    AutoField,
    /// Variable-length string with a max length.
    CharField,
    /// Unlimited-length text.
    TextField,
    /// URL-friendly string.
    SlugField,
    /// 32-bit signed integer.
    IntegerField,
    /// 64-bit signed integer.
    BigIntegerField,
    /// Boolean (true/false).
    BooleanField,
    /// Date and time.
    DateTimeField,
    /// JSON data, stored as text.
    JsonField,
    /// Many-to-one relationship.
    ForeignKey {
        /// The target model (e.g. "contenttypes.contenttype").
        to: String,
        /// Behavior when the referenced row is deleted.
        on_delete: OnDelete,
        /// For polymorphic references: the permitted target content types.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit_choices_to: Option<ContentTypeFilter>,
    },
}

impl FieldType {
    /// Returns `true` for relational field types.
    pub fn is_relation(&self) -> bool {
        matches!(self, Self::ForeignKey { .. })
    }

    /// Returns the SQLite column type for this field type.
    pub fn sqlite_type(&self) -> &'static str {
        match self {
            Self::AutoField
            | Self::IntegerField
            | Self::BigIntegerField
            | Self::BooleanField
            | Self::ForeignKey { .. } => "INTEGER",
            Self::CharField
            | Self::TextField
            | Self::SlugField
            | Self::DateTimeField
            | Self::JsonField => "TEXT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_delete_sql() {
        assert_eq!(OnDelete::Cascade.sql(), "CASCADE");
        assert_eq!(OnDelete::Protect.sql(), "RESTRICT");
        assert_eq!(OnDelete::SetNull.sql(), "SET NULL");
        assert_eq!(OnDelete::DoNothing.sql(), "NO ACTION");
    }

    #[test]
    fn test_filter_allows() {
        let filter = ContentTypeFilter::new(vec![
            ContentTypeRef::new("user", "user"),
            ContentTypeRef::new("user", "userinvite"),
        ]);
        assert!(filter.allows("user", "user"));
        assert!(filter.allows("user", "userinvite"));
        assert!(!filter.allows("user", "group"));
        assert!(!filter.allows("document", "user"));
    }

    #[test]
    fn test_filter_sql_condition() {
        let filter = ContentTypeFilter::new(vec![
            ContentTypeRef::new("user", "user"),
            ContentTypeRef::new("user", "userinvite"),
        ]);
        let sql = filter.sql_condition("holder_type_id");
        assert!(sql.starts_with("\"holder_type_id\" IN (SELECT \"id\" FROM"));
        assert!(sql.contains("\"model\" = 'user'"));
        assert!(sql.contains("\"model\" = 'userinvite'"));
        assert!(sql.contains(" OR "));
    }

    #[test]
    fn test_filter_serde_roundtrip() {
        let filter = ContentTypeFilter::new(vec![ContentTypeRef::new("user", "user")]);
        let json = serde_json::to_string(&filter).unwrap();
        let back: ContentTypeFilter = serde_json::from_str(&json).unwrap();
        assert_eq!(filter, back);
    }

    #[test]
    fn test_field_type_tagged_serde() {
        let ft: FieldType = serde_json::from_str(
            r#"{"type": "ForeignKey", "to": "contenttypes.contenttype", "on_delete": "CASCADE"}"#,
        )
        .unwrap();
        assert!(ft.is_relation());
        assert_eq!(ft.sqlite_type(), "INTEGER");

        let ft: FieldType = serde_json::from_str(r#"{"type": "CharField"}"#).unwrap();
        assert_eq!(ft.sqlite_type(), "TEXT");
    }
}
