//! Migration operations.
//!
//! An [`Operation`] is one declarative schema change inside a migration.
//! Operations are serialized in migration files (tagged by their `op` key),
//! mutate the in-memory [`ProjectState`] via [`Operation::state_forwards`],
//! and produce DDL via [`Operation::database_forwards`].

use serde::{Deserialize, Serialize};

use scriptorium_core::ScriptoriumError;

use crate::schema_editor::SchemaEditor;
use crate::state::{FieldState, ModelState, ProjectState};

/// A single schema change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Creates a model and its table.
    CreateModel {
        /// The model name in lowercase.
        name: String,
        /// The fields, in declaration order.
        fields: Vec<FieldState>,
    },
    /// Deletes a model and drops its table.
    DeleteModel {
        /// The model name.
        name: String,
    },
    /// Adds a field to an existing model.
    AddField {
        /// The model name.
        model_name: String,
        /// The field to add.
        field: FieldState,
    },
    /// Removes a field from an existing model.
    RemoveField {
        /// The model name.
        model_name: String,
        /// The field to remove.
        field_name: String,
    },
    /// Replaces a field's definition.
    ///
    /// The field is matched by name; everything else about it (type,
    /// constraints, permitted reference targets) comes from the new
    /// definition.
    AlterField {
        /// The model name.
        model_name: String,
        /// The new field definition.
        field: FieldState,
    },
    /// Creates an index.
    AddIndex {
        /// The model name.
        model_name: String,
        /// The index name.
        name: String,
        /// The fields covered by the index.
        fields: Vec<String>,
        /// Whether the index enforces uniqueness.
        #[serde(default)]
        unique: bool,
    },
}

impl Operation {
    /// Returns a human-readable description of this operation.
    pub fn describe(&self) -> String {
        match self {
            Self::CreateModel { name, .. } => format!("Create model {name}"),
            Self::DeleteModel { name } => format!("Delete model {name}"),
            Self::AddField {
                model_name, field, ..
            } => format!("Add field {} to {model_name}", field.name),
            Self::RemoveField {
                model_name,
                field_name,
            } => format!("Remove field {field_name} from {model_name}"),
            Self::AlterField { model_name, field } => {
                format!("Alter field {} on {model_name}", field.name)
            }
            Self::AddIndex {
                model_name, name, ..
            } => format!("Add index {name} on {model_name}"),
        }
    }

    /// Applies this operation to the in-memory state.
    ///
    /// # Errors
    ///
    /// Returns a database error when the operation references a model or
    /// field the state does not contain.
    pub fn state_forwards(
        &self,
        app_label: &str,
        state: &mut ProjectState,
    ) -> Result<(), ScriptoriumError> {
        match self {
            Self::CreateModel { name, fields } => {
                state.add_model(ModelState::new(app_label, name, fields.clone()));
                Ok(())
            }
            Self::DeleteModel { name } => {
                state.remove_model(app_label, name).map(|_| ()).ok_or_else(|| {
                    ScriptoriumError::DatabaseError(format!(
                        "Cannot delete unknown model {app_label}.{name}"
                    ))
                })
            }
            Self::AddField { model_name, field } => {
                let model = require_model_mut(state, app_label, model_name)?;
                model.fields.push(field.clone());
                Ok(())
            }
            Self::RemoveField {
                model_name,
                field_name,
            } => {
                let model = require_model_mut(state, app_label, model_name)?;
                let before = model.fields.len();
                model.fields.retain(|f| f.name != *field_name);
                if model.fields.len() == before {
                    return Err(ScriptoriumError::DatabaseError(format!(
                        "Cannot remove unknown field {field_name} from {app_label}.{model_name}"
                    )));
                }
                Ok(())
            }
            Self::AlterField { model_name, field } => {
                let model = require_model_mut(state, app_label, model_name)?;
                let slot = model
                    .fields
                    .iter_mut()
                    .find(|f| f.name == field.name)
                    .ok_or_else(|| {
                        ScriptoriumError::DatabaseError(format!(
                            "Cannot alter unknown field {} on {app_label}.{model_name}",
                            field.name
                        ))
                    })?;
                *slot = field.clone();
                Ok(())
            }
            Self::AddIndex { model_name, .. } => {
                // Indexes are not tracked in the state; just check the model.
                require_model_mut(state, app_label, model_name).map(|_| ())
            }
        }
    }

    /// Generates the DDL for this operation.
    ///
    /// `from_state` is the state before this operation, `to_state` the state
    /// after [`Operation::state_forwards`] was applied.
    ///
    /// # Errors
    ///
    /// Returns a database error when the states do not contain the models
    /// this operation needs.
    pub fn database_forwards(
        &self,
        app_label: &str,
        editor: &dyn SchemaEditor,
        from_state: &ProjectState,
        to_state: &ProjectState,
    ) -> Result<Vec<String>, ScriptoriumError> {
        match self {
            Self::CreateModel { name, .. } => {
                let model = require_model(to_state, app_label, name)?;
                Ok(editor.create_table(model))
            }
            Self::DeleteModel { name } => {
                let model = require_model(from_state, app_label, name)?;
                Ok(editor.drop_table(&model.db_table()))
            }
            Self::AddField { model_name, field } => {
                let model = require_model(to_state, app_label, model_name)?;
                Ok(editor.add_column(&model.db_table(), field))
            }
            Self::RemoveField {
                model_name,
                field_name,
            } => {
                let model = require_model(from_state, app_label, model_name)?;
                let field = model.get_field(field_name).ok_or_else(|| {
                    ScriptoriumError::DatabaseError(format!(
                        "Unknown field {field_name} on {app_label}.{model_name}"
                    ))
                })?;
                Ok(editor.drop_column(&model.db_table(), &field.column()))
            }
            Self::AlterField { model_name, .. } => {
                let old_model = require_model(from_state, app_label, model_name)?;
                let new_model = require_model(to_state, app_label, model_name)?;
                Ok(editor.rebuild_table(new_model, &old_model.columns()))
            }
            Self::AddIndex {
                model_name,
                name,
                fields,
                unique,
            } => {
                let model = require_model(to_state, app_label, model_name)?;
                let columns: Vec<String> = fields
                    .iter()
                    .map(|f| {
                        model
                            .get_field(f)
                            .map(FieldState::column)
                            .ok_or_else(|| {
                                ScriptoriumError::DatabaseError(format!(
                                    "Unknown field {f} on {app_label}.{model_name}"
                                ))
                            })
                    })
                    .collect::<Result<_, _>>()?;
                Ok(editor.create_index(&model.db_table(), name, &columns, *unique))
            }
        }
    }
}

fn require_model<'a>(
    state: &'a ProjectState,
    app_label: &str,
    name: &str,
) -> Result<&'a ModelState, ScriptoriumError> {
    state.get_model(app_label, name).ok_or_else(|| {
        ScriptoriumError::DatabaseError(format!("Unknown model {app_label}.{name}"))
    })
}

fn require_model_mut<'a>(
    state: &'a mut ProjectState,
    app_label: &str,
    name: &str,
) -> Result<&'a mut ModelState, ScriptoriumError> {
    state.get_model_mut(app_label, name).ok_or_else(|| {
        ScriptoriumError::DatabaseError(format!("Unknown model {app_label}.{name}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{ContentTypeFilter, ContentTypeRef, FieldType, OnDelete};
    use crate::schema_editor::SqliteSchemaEditor;

    fn create_style() -> Operation {
        Operation::CreateModel {
            name: "documentstyle".to_string(),
            fields: vec![
                FieldState::new("id", FieldType::AutoField).primary_key(),
                FieldState::new("title", FieldType::CharField),
            ],
        }
    }

    #[test]
    fn test_create_model_state_and_sql() {
        let op = create_style();
        let mut state = ProjectState::new();
        let from = state.clone();
        op.state_forwards("style", &mut state).unwrap();
        assert!(state.get_model("style", "documentstyle").is_some());

        let sql = op
            .database_forwards("style", &SqliteSchemaEditor, &from, &state)
            .unwrap();
        assert!(sql[0].starts_with("CREATE TABLE \"style_documentstyle\""));
    }

    #[test]
    fn test_add_and_remove_field() {
        let mut state = ProjectState::new();
        create_style().state_forwards("style", &mut state).unwrap();

        let add = Operation::AddField {
            model_name: "documentstyle".to_string(),
            field: FieldState::new("contents", FieldType::TextField).nullable(),
        };
        let from = state.clone();
        add.state_forwards("style", &mut state).unwrap();
        let sql = add
            .database_forwards("style", &SqliteSchemaEditor, &from, &state)
            .unwrap();
        assert!(sql[0].contains("ADD COLUMN \"contents\""));

        let remove = Operation::RemoveField {
            model_name: "documentstyle".to_string(),
            field_name: "contents".to_string(),
        };
        let from = state.clone();
        remove.state_forwards("style", &mut state).unwrap();
        assert!(state
            .get_model("style", "documentstyle")
            .unwrap()
            .get_field("contents")
            .is_none());
        let sql = remove
            .database_forwards("style", &SqliteSchemaEditor, &from, &state)
            .unwrap();
        assert!(sql[0].contains("DROP COLUMN \"contents\""));
    }

    #[test]
    fn test_alter_field_rebuilds_table() {
        let mut state = ProjectState::new();
        Operation::CreateModel {
            name: "accessright".to_string(),
            fields: vec![
                FieldState::new("id", FieldType::AutoField).primary_key(),
                FieldState::new(
                    "holder_type",
                    FieldType::ForeignKey {
                        to: "contenttypes.contenttype".to_string(),
                        on_delete: OnDelete::Cascade,
                        limit_choices_to: Some(ContentTypeFilter::new(vec![
                            ContentTypeRef::new("user", "user"),
                        ])),
                    },
                ),
            ],
        }
        .state_forwards("document", &mut state)
        .unwrap();

        let alter = Operation::AlterField {
            model_name: "accessright".to_string(),
            field: FieldState::new(
                "holder_type",
                FieldType::ForeignKey {
                    to: "contenttypes.contenttype".to_string(),
                    on_delete: OnDelete::Cascade,
                    limit_choices_to: Some(ContentTypeFilter::new(vec![
                        ContentTypeRef::new("user", "user"),
                        ContentTypeRef::new("user", "userinvite"),
                    ])),
                },
            ),
        };
        let from = state.clone();
        alter.state_forwards("document", &mut state).unwrap();

        // State now carries the widened filter
        let filter = state
            .get_model("document", "accessright")
            .unwrap()
            .get_field("holder_type")
            .unwrap()
            .content_type_filter()
            .unwrap()
            .clone();
        assert!(filter.allows("user", "userinvite"));

        let sql = alter
            .database_forwards("document", &SqliteSchemaEditor, &from, &state)
            .unwrap();
        assert_eq!(sql.len(), 4);
        assert!(sql[0].starts_with("CREATE TABLE \"__new_document_accessright\""));
        assert!(sql[3].ends_with("RENAME TO \"document_accessright\""));
    }

    #[test]
    fn test_alter_unknown_field_fails() {
        let mut state = ProjectState::new();
        create_style().state_forwards("style", &mut state).unwrap();

        let alter = Operation::AlterField {
            model_name: "documentstyle".to_string(),
            field: FieldState::new("missing", FieldType::CharField),
        };
        assert!(alter.state_forwards("style", &mut state).is_err());
    }

    #[test]
    fn test_add_index_maps_relation_columns() {
        let mut state = ProjectState::new();
        Operation::CreateModel {
            name: "accessright".to_string(),
            fields: vec![
                FieldState::new("id", FieldType::AutoField).primary_key(),
                FieldState::new(
                    "document",
                    FieldType::ForeignKey {
                        to: "document.document".to_string(),
                        on_delete: OnDelete::Cascade,
                        limit_choices_to: None,
                    },
                ),
            ],
        }
        .state_forwards("document", &mut state)
        .unwrap();

        let op = Operation::AddIndex {
            model_name: "accessright".to_string(),
            name: "document_accessright_document_idx".to_string(),
            fields: vec!["document".to_string()],
            unique: false,
        };
        let from = state.clone();
        op.state_forwards("document", &mut state).unwrap();
        let sql = op
            .database_forwards("document", &SqliteSchemaEditor, &from, &state)
            .unwrap();
        assert!(sql[0].contains("(\"document_id\")"));
    }

    #[test]
    fn test_operation_serde() {
        let json = r#"{
            "op": "alter_field",
            "model_name": "accessright",
            "field": {
                "name": "holder_type",
                "type": "ForeignKey",
                "to": "contenttypes.contenttype",
                "on_delete": "CASCADE",
                "limit_choices_to": {
                    "any": [
                        {"app_label": "user", "model": "user"},
                        {"app_label": "user", "model": "userinvite"}
                    ]
                }
            }
        }"#;
        let op: Operation = serde_json::from_str(json).unwrap();
        assert_eq!(op.describe(), "Alter field holder_type on accessright");
        match op {
            Operation::AlterField { field, .. } => {
                let filter = field.content_type_filter().unwrap();
                assert!(filter.allows("user", "userinvite"));
            }
            _ => panic!("wrong variant"),
        }
    }
}
