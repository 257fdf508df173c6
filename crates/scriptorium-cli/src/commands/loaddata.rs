//! The `loaddata` management command.
//!
//! Loads serialized fixture data (JSON) into the database. Fixture objects
//! have the shape `{"model": "app.model", "pk": 1, "fields": {...}}`; fields
//! are mapped onto table columns through the migration-derived schema state,
//! and references restricted to particular content types are validated
//! against the registry before the row is inserted.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use scriptorium_core::{ScriptoriumError, Settings};
use scriptorium_db::{open_database, DatabaseBackend, Value};
use scriptorium_migrations::{
    final_state, MigrationLoader, ModelState, ProjectState, CONTENT_TYPE_TABLE,
};

use crate::command::ManagementCommand;
use crate::serialization::{JsonSerializer, Serializer};

/// Loads data from fixture files into the database.
pub struct LoaddataCommand;

/// Searches for a fixture file in the given directories.
///
/// The name may be a path to an existing file, a file name, or a bare name
/// (the `.json` extension is appended when missing).
///
/// Returns the resolved path, or `None` if the fixture was not found.
pub fn find_fixture(name: &str, fixture_dirs: &[PathBuf]) -> Option<PathBuf> {
    let path = Path::new(name);
    if path.is_file() {
        return Some(path.to_path_buf());
    }

    let with_ext = if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
        name.to_string()
    } else {
        format!("{name}.json")
    };

    let path = Path::new(&with_ext);
    if path.is_file() {
        return Some(path.to_path_buf());
    }

    for dir in fixture_dirs {
        let candidate = dir.join(&with_ext);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    None
}

/// Reads and deserializes a fixture file.
///
/// # Errors
///
/// Returns [`ScriptoriumError::NotFound`] for a missing file and a
/// serialization error for malformed content.
pub async fn load_fixture_file(path: &Path) -> Result<Vec<serde_json::Value>, ScriptoriumError> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ScriptoriumError::NotFound(format!("Fixture file not found: {}", path.display()))
        } else {
            ScriptoriumError::IoError(e)
        }
    })?;

    JsonSerializer.deserialize(&content)
}

/// Loads the objects of one fixture into the database, in one transaction.
///
/// Returns the number of inserted objects.
///
/// # Errors
///
/// Rolls back and returns the error when an object references an unknown
/// model or field, a restricted reference points at a content type outside
/// the permitted set, or an insert fails.
pub async fn load_objects(
    backend: &dyn DatabaseBackend,
    state: &ProjectState,
    objects: &[serde_json::Value],
) -> Result<usize, ScriptoriumError> {
    backend.begin().await?;
    let result = insert_objects(backend, state, objects).await;
    match result {
        Ok(count) => {
            backend.commit().await?;
            Ok(count)
        }
        Err(e) => {
            backend.rollback().await.ok();
            Err(e)
        }
    }
}

async fn insert_objects(
    backend: &dyn DatabaseBackend,
    state: &ProjectState,
    objects: &[serde_json::Value],
) -> Result<usize, ScriptoriumError> {
    let mut count = 0;
    for object in objects {
        let model_ref = object
            .get("model")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| {
                ScriptoriumError::SerializationError(
                    "Fixture object is missing its 'model' key".to_string(),
                )
            })?;
        let (app_label, model_name) = model_ref.split_once('.').ok_or_else(|| {
            ScriptoriumError::SerializationError(format!(
                "Fixture model '{model_ref}' is not of the form 'app.model'"
            ))
        })?;
        let model = state.get_model(app_label, model_name).ok_or_else(|| {
            ScriptoriumError::ValidationError(format!("Unknown fixture model: {model_ref}"))
        })?;

        let fields = object
            .get("fields")
            .and_then(serde_json::Value::as_object)
            .ok_or_else(|| {
                ScriptoriumError::SerializationError(format!(
                    "Fixture object for {model_ref} is missing its 'fields' object"
                ))
            })?;

        let mut columns = Vec::with_capacity(fields.len() + 1);
        let mut values = Vec::with_capacity(fields.len() + 1);
        if let Some(pk) = object.get("pk") {
            columns.push("id".to_string());
            values.push(Value::from_json(pk.clone()));
        }
        for (field_name, field_value) in fields {
            let field = model.get_field(field_name).ok_or_else(|| {
                ScriptoriumError::ValidationError(format!(
                    "Unknown field '{field_name}' on {model_ref}"
                ))
            })?;
            let value = Value::from_json(field_value.clone());
            check_restricted_reference(backend, field_name, field, &value, model_ref).await?;
            columns.push(field.column());
            values.push(value);
        }

        let placeholders: Vec<String> =
            (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let quoted: Vec<String> = columns.iter().map(|c| format!("\"{c}\"")).collect();
        let sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            model.db_table(),
            quoted.join(", "),
            placeholders.join(", ")
        );
        backend.execute(&sql, &values).await?;
        count += 1;
    }
    Ok(count)
}

/// Validates a restricted content-type reference.
///
/// For fields limited to particular content types, the referenced registry
/// row is fetched and checked against the permitted set.
async fn check_restricted_reference(
    backend: &dyn DatabaseBackend,
    field_name: &str,
    field: &scriptorium_migrations::FieldState,
    value: &Value,
    model_ref: &str,
) -> Result<(), ScriptoriumError> {
    let Some(filter) = field.content_type_filter() else {
        return Ok(());
    };
    if value.is_null() {
        return Ok(());
    }
    let id = value.as_int().ok_or_else(|| {
        ScriptoriumError::ValidationError(format!(
            "Field '{field_name}' on {model_ref} must reference a content type by id"
        ))
    })?;

    let row = backend
        .query_one(
            &format!(
                "SELECT \"app_label\", \"model\" FROM \"{CONTENT_TYPE_TABLE}\" \
                 WHERE \"id\" = ?1"
            ),
            &[Value::Int(id)],
        )
        .await
        .map_err(|_| {
            ScriptoriumError::ValidationError(format!(
                "Field '{field_name}' on {model_ref} references unknown content type {id}"
            ))
        })?;
    let app_label = row.get_str("app_label")?;
    let model = row.get_str("model")?;

    if !filter.allows(app_label, model) {
        return Err(ScriptoriumError::ValidationError(format!(
            "Content type {app_label}.{model} is not permitted for '{field_name}' on {model_ref}"
        )));
    }
    Ok(())
}

/// Resolves and loads one fixture by name.
///
/// Returns the number of inserted objects.
///
/// # Errors
///
/// Returns [`ScriptoriumError::NotFound`] when the fixture cannot be
/// resolved, and any error from [`load_objects`].
pub async fn load_fixture(
    backend: &dyn DatabaseBackend,
    state: &ProjectState,
    name: &str,
    fixture_dirs: &[PathBuf],
) -> Result<usize, ScriptoriumError> {
    let resolved = find_fixture(name, fixture_dirs)
        .ok_or_else(|| ScriptoriumError::NotFound(format!("Fixture not found: {name}")))?;

    tracing::info!("Loading fixture: {}", resolved.display());
    let objects = load_fixture_file(&resolved).await?;
    let count = load_objects(backend, state, &objects).await?;
    tracing::info!("Loaded {count} object(s) from {}", resolved.display());
    Ok(count)
}

/// Convenience lookup used by callers that report per-model row counts.
pub fn model_table(state: &ProjectState, app_label: &str, model_name: &str) -> Option<String> {
    state
        .get_model(app_label, model_name)
        .map(ModelState::db_table)
}

#[async_trait]
impl ManagementCommand for LoaddataCommand {
    fn name(&self) -> &'static str {
        "loaddata"
    }

    fn help(&self) -> &'static str {
        "Load data from fixture files"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("fixture")
                .help("Fixture file(s) to load")
                .num_args(1..)
                .required(true),
        )
        .arg(
            clap::Arg::new("database")
                .long("database")
                .default_value("default")
                .help("Database alias to load data into"),
        )
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), ScriptoriumError> {
        let fixtures: Vec<&String> = matches
            .get_many::<String>("fixture")
            .map_or_else(Vec::new, Iterator::collect);
        let database = matches
            .get_one::<String>("database")
            .map_or("default", String::as_str);

        let db_settings = settings.database(database).ok_or_else(|| {
            ScriptoriumError::ImproperlyConfigured(format!("Unknown database alias: {database}"))
        })?;
        let backend = open_database(db_settings)?;

        let mut loader =
            MigrationLoader::new(settings.migrations_path(), &settings.installed_apps);
        let graph = loader.load()?;
        let state = final_state(&graph, loader.migrations())?;

        tracing::info!("Loading data into database '{database}'");
        let mut total = 0;
        for fixture in &fixtures {
            total += load_fixture(
                backend.as_ref(),
                &state,
                fixture,
                &settings.fixture_paths(),
            )
            .await?;
        }
        tracing::info!("Loaded {total} object(s) total");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptorium_db::SqliteBackend;
    use scriptorium_migrations::{
        ContentTypeFilter, ContentTypeRef, FieldState, FieldType, OnDelete,
    };
    use serde_json::json;

    fn style_state() -> ProjectState {
        let mut state = ProjectState::new();
        state.add_model(ModelState::new(
            "style",
            "documentstyle",
            vec![
                FieldState::new("id", FieldType::AutoField).primary_key(),
                FieldState::new("title", FieldType::CharField),
                FieldState::new("slug", FieldType::SlugField).unique(),
            ],
        ));
        state
    }

    async fn style_backend() -> SqliteBackend {
        let backend = SqliteBackend::memory().unwrap();
        backend
            .execute(
                "CREATE TABLE \"style_documentstyle\" (\"id\" INTEGER PRIMARY KEY, \
                 \"title\" TEXT NOT NULL, \"slug\" TEXT NOT NULL UNIQUE)",
                &[],
            )
            .await
            .unwrap();
        backend
    }

    #[test]
    fn test_find_fixture_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "[]").unwrap();

        let result = find_fixture(path.to_str().unwrap(), &[]);
        assert!(result.is_some());
    }

    #[test]
    fn test_find_fixture_appends_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("initial_styles.json"), "[]").unwrap();

        let dirs = vec![dir.path().to_path_buf()];
        let result = find_fixture("initial_styles", &dirs);
        assert!(result.is_some());
    }

    #[test]
    fn test_find_fixture_not_found() {
        assert!(find_fixture("nonexistent_fixture", &[]).is_none());
    }

    #[tokio::test]
    async fn test_load_fixture_file_not_found() {
        let result = load_fixture_file(Path::new("/nonexistent/fixture.json")).await;
        assert!(matches!(result, Err(ScriptoriumError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_load_fixture_file_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invalid.json");
        tokio::fs::write(&path, "not valid json").await.unwrap();

        let result = load_fixture_file(&path).await;
        assert!(matches!(
            result,
            Err(ScriptoriumError::SerializationError(_))
        ));
    }

    #[tokio::test]
    async fn test_load_objects_inserts_rows() {
        let backend = style_backend().await;
        let state = style_state();
        let objects = vec![
            json!({"model": "style.documentstyle", "pk": 1,
                   "fields": {"title": "Default", "slug": "default"}}),
            json!({"model": "style.documentstyle", "pk": 2,
                   "fields": {"title": "Elegant", "slug": "elegant"}}),
        ];

        let count = load_objects(&backend, &state, &objects).await.unwrap();
        assert_eq!(count, 2);

        let row = backend
            .query_one(
                "SELECT \"title\" FROM \"style_documentstyle\" WHERE \"id\" = 2",
                &[],
            )
            .await
            .unwrap();
        assert_eq!(row.get_str("title").unwrap(), "Elegant");
    }

    #[tokio::test]
    async fn test_load_objects_unknown_model_rolls_back() {
        let backend = style_backend().await;
        let state = style_state();
        let objects = vec![
            json!({"model": "style.documentstyle", "pk": 1,
                   "fields": {"title": "Default", "slug": "default"}}),
            json!({"model": "style.unknown", "pk": 1, "fields": {}}),
        ];

        let result = load_objects(&backend, &state, &objects).await;
        assert!(matches!(result, Err(ScriptoriumError::ValidationError(_))));

        // The first object was rolled back
        let rows = backend
            .query("SELECT * FROM \"style_documentstyle\"", &[])
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_load_objects_unknown_field() {
        let backend = style_backend().await;
        let state = style_state();
        let objects = vec![json!({"model": "style.documentstyle", "pk": 1,
                                  "fields": {"headline": "nope"}})];
        let result = load_objects(&backend, &state, &objects).await;
        assert!(matches!(result, Err(ScriptoriumError::ValidationError(_))));
    }

    fn accessright_state(permitted: Vec<ContentTypeRef>) -> ProjectState {
        let mut state = ProjectState::new();
        state.add_model(ModelState::new(
            "contenttypes",
            "contenttype",
            vec![
                FieldState::new("id", FieldType::AutoField).primary_key(),
                FieldState::new("app_label", FieldType::CharField),
                FieldState::new("model", FieldType::CharField),
            ],
        ));
        state.add_model(ModelState::new(
            "document",
            "accessright",
            vec![
                FieldState::new("id", FieldType::AutoField).primary_key(),
                FieldState::new(
                    "holder_type",
                    FieldType::ForeignKey {
                        to: "contenttypes.contenttype".to_string(),
                        on_delete: OnDelete::Cascade,
                        limit_choices_to: Some(ContentTypeFilter::new(permitted)),
                    },
                ),
                FieldState::new("holder_id", FieldType::IntegerField),
            ],
        ));
        state
    }

    async fn accessright_backend() -> SqliteBackend {
        let backend = SqliteBackend::memory().unwrap();
        backend
            .execute_batch(
                "CREATE TABLE \"contenttypes_contenttype\" (\"id\" INTEGER PRIMARY KEY, \
                 \"app_label\" TEXT NOT NULL, \"model\" TEXT NOT NULL); \
                 CREATE TABLE \"document_accessright\" (\"id\" INTEGER PRIMARY KEY, \
                 \"holder_type_id\" INTEGER NOT NULL, \"holder_id\" INTEGER NOT NULL); \
                 INSERT INTO \"contenttypes_contenttype\" VALUES (1, 'user', 'user'); \
                 INSERT INTO \"contenttypes_contenttype\" VALUES (2, 'user', 'userinvite');",
            )
            .await
            .unwrap();
        backend
    }

    #[tokio::test]
    async fn test_restricted_reference_permitted() {
        let backend = accessright_backend().await;
        let state = accessright_state(vec![
            ContentTypeRef::new("user", "user"),
            ContentTypeRef::new("user", "userinvite"),
        ]);
        let objects = vec![json!({"model": "document.accessright", "pk": 1,
                                  "fields": {"holder_type": 2, "holder_id": 9}})];

        let count = load_objects(&backend, &state, &objects).await.unwrap();
        assert_eq!(count, 1);

        let row = backend
            .query_one("SELECT \"holder_type_id\" FROM \"document_accessright\"", &[])
            .await
            .unwrap();
        assert_eq!(row.get_int("holder_type_id").unwrap(), 2);
    }

    #[tokio::test]
    async fn test_restricted_reference_rejected() {
        let backend = accessright_backend().await;
        // Only plain users may hold access rights in this state
        let state = accessright_state(vec![ContentTypeRef::new("user", "user")]);
        let objects = vec![json!({"model": "document.accessright", "pk": 1,
                                  "fields": {"holder_type": 2, "holder_id": 9}})];

        let result = load_objects(&backend, &state, &objects).await;
        assert!(matches!(result, Err(ScriptoriumError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_restricted_reference_unknown_id() {
        let backend = accessright_backend().await;
        let state = accessright_state(vec![ContentTypeRef::new("user", "user")]);
        let objects = vec![json!({"model": "document.accessright", "pk": 1,
                                  "fields": {"holder_type": 99, "holder_id": 9}})];

        let result = load_objects(&backend, &state, &objects).await;
        assert!(matches!(result, Err(ScriptoriumError::ValidationError(_))));
    }

    #[test]
    fn test_model_table() {
        let state = style_state();
        assert_eq!(
            model_table(&state, "style", "documentstyle").unwrap(),
            "style_documentstyle"
        );
        assert!(model_table(&state, "style", "missing").is_none());
    }
}
