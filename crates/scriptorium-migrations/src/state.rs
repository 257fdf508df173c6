//! In-memory schema state.
//!
//! [`ProjectState`] is the reconstruction of the database schema implied by a
//! sequence of migration operations. The executor threads it through each
//! migration to generate DDL, and the fixture loader reads the final state to
//! map model fields onto table columns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fields::{ContentTypeFilter, FieldType};

/// The schema state of a single model field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldState {
    /// The field name (e.g. "holder_type").
    pub name: String,
    /// The field type.
    #[serde(flatten)]
    pub field_type: FieldType,
    /// Whether this field is the primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Whether NULL is permitted.
    #[serde(default)]
    pub null: bool,
    /// Whether a unique constraint applies.
    #[serde(default)]
    pub unique: bool,
    /// Maximum length for character fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Default value, in fixture JSON form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl FieldState {
    /// Creates a field with the given name and type, no constraints.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            primary_key: false,
            null: false,
            unique: false,
            max_length: None,
            default: None,
        }
    }

    /// Marks this field as the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Permits NULL for this field.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.null = true;
        self
    }

    /// Adds a unique constraint.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Returns the database column name.
    ///
    /// Relational fields store the target id under `<name>_id`.
    pub fn column(&self) -> String {
        if self.field_type.is_relation() {
            format!("{}_id", self.name)
        } else {
            self.name.clone()
        }
    }

    /// Returns the content-type filter, if this is a restricted reference.
    pub fn content_type_filter(&self) -> Option<&ContentTypeFilter> {
        match &self.field_type {
            FieldType::ForeignKey {
                limit_choices_to, ..
            } => limit_choices_to.as_ref(),
            _ => None,
        }
    }
}

/// The schema state of a single model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    /// The application label.
    pub app_label: String,
    /// The model name in lowercase.
    pub name: String,
    /// The fields, in declaration order.
    pub fields: Vec<FieldState>,
}

impl ModelState {
    /// Creates a model state.
    pub fn new(
        app_label: impl Into<String>,
        name: impl Into<String>,
        fields: Vec<FieldState>,
    ) -> Self {
        Self {
            app_label: app_label.into(),
            name: name.into(),
            fields,
        }
    }

    /// Returns the database table name (`<app_label>_<model>`).
    pub fn db_table(&self) -> String {
        format!("{}_{}", self.app_label, self.name)
    }

    /// Returns the field with the given name, if present.
    pub fn get_field(&self, name: &str) -> Option<&FieldState> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the column names, in field order.
    pub fn columns(&self) -> Vec<String> {
        self.fields.iter().map(FieldState::column).collect()
    }
}

/// The schema state of the whole project.
///
/// Models are keyed by `(app_label, model_name)`; the map is ordered so DDL
/// and diagnostics are deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectState {
    models: BTreeMap<(String, String), ModelState>,
}

impl ProjectState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a model.
    pub fn add_model(&mut self, model: ModelState) {
        self.models
            .insert((model.app_label.clone(), model.name.clone()), model);
    }

    /// Removes a model, returning it if it existed.
    pub fn remove_model(&mut self, app_label: &str, name: &str) -> Option<ModelState> {
        self.models
            .remove(&(app_label.to_string(), name.to_string()))
    }

    /// Returns the model for the given key, if present.
    pub fn get_model(&self, app_label: &str, name: &str) -> Option<&ModelState> {
        self.models.get(&(app_label.to_string(), name.to_string()))
    }

    /// Returns a mutable reference to the model for the given key.
    pub fn get_model_mut(&mut self, app_label: &str, name: &str) -> Option<&mut ModelState> {
        self.models
            .get_mut(&(app_label.to_string(), name.to_string()))
    }

    /// Iterates over all models in key order.
    pub fn models(&self) -> impl Iterator<Item = &ModelState> {
        self.models.values()
    }

    /// Returns the number of models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns `true` if the state holds no models.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
