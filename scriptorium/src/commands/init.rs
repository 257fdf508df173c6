//! The `init` management command.
//!
//! One-shot installation setup, safe to re-run: migrate (or flush and
//! fake-migrate with `--restart`), load the initial fixtures where their
//! tables are still empty, compile translation catalogs, transpile the front
//! end, and optionally precompress and collect static assets.

use async_trait::async_trait;
use scriptorium_cli::command::ManagementCommand;
use scriptorium_cli::commands::collectstatic::collect_static;
use scriptorium_cli::commands::compilemessages::compile_messages;
use scriptorium_cli::commands::compress::compress_static;
use scriptorium_cli::commands::flush::flush_database;
use scriptorium_cli::commands::loaddata::{load_fixture, model_table};
use scriptorium_cli::commands::migrate::apply_migrations;
use scriptorium_core::{ScriptoriumError, Settings};
use scriptorium_db::{open_database, table_row_count, DatabaseBackend};
use scriptorium_migrations::ProjectState;

use crate::commands::transpile::transpile_assets;
use crate::models::{DocumentStyle, ExportTemplate, FlatPage};

/// Initializes a scriptorium installation.
pub struct InitCommand;

/// The fixture categories loaded at initialization: model natural key plus
/// the fixture name, loaded only while the model's table is empty.
const INITIAL_FIXTURES: [(&str, &str, &str); 3] = [
    (
        DocumentStyle::APP_LABEL,
        DocumentStyle::MODEL_NAME,
        "initial_styles",
    ),
    (FlatPage::APP_LABEL, FlatPage::MODEL_NAME, "initial_terms"),
    (
        ExportTemplate::APP_LABEL,
        ExportTemplate::MODEL_NAME,
        "initial_export_templates",
    ),
];

/// Runs the full initialization sequence.
///
/// # Errors
///
/// Any failing step aborts the sequence, with one exception: a
/// [`ScriptoriumError::CommandError`] from the asset compression step is
/// logged and skipped.
pub async fn initialize(
    settings: &Settings,
    database: &str,
    restart: bool,
    no_static: bool,
    no_compress: bool,
) -> Result<(), ScriptoriumError> {
    let db_settings = settings.database(database).ok_or_else(|| {
        ScriptoriumError::ImproperlyConfigured(format!("Unknown database alias: {database}"))
    })?;
    let backend = open_database(db_settings)?;

    let state = if restart {
        tracing::info!("Restarting: flushing all data");
        flush_database(backend.as_ref()).await?;
        apply_migrations(backend.as_ref(), settings, true).await?
    } else {
        apply_migrations(backend.as_ref(), settings, false).await?
    };

    load_initial_fixtures(backend.as_ref(), &state, settings).await?;

    compile_messages(settings).await?;
    transpile_assets(settings).await?;

    if !no_compress && settings.compress.offline && settings.compress.enabled {
        match compress_static(settings).await {
            Ok(_) => {}
            Err(ScriptoriumError::CommandError(reason)) => {
                tracing::warn!("Skipping asset compression: {reason}");
            }
            Err(e) => return Err(e),
        }
    }

    if !no_static && !settings.debug {
        collect_static(settings).await?;
    }

    tracing::info!("Initialization complete");
    Ok(())
}

/// Loads each initial fixture whose table is still empty.
///
/// Re-running is safe: a non-empty table means the fixture (or live data)
/// is already present, so it is left untouched.
async fn load_initial_fixtures(
    backend: &dyn DatabaseBackend,
    state: &ProjectState,
    settings: &Settings,
) -> Result<(), ScriptoriumError> {
    for (app_label, model_name, fixture) in INITIAL_FIXTURES {
        let table = model_table(state, app_label, model_name).ok_or_else(|| {
            ScriptoriumError::ImproperlyConfigured(format!(
                "Model {app_label}.{model_name} is not migrated; run the migrations first"
            ))
        })?;
        if table_row_count(backend, &table).await? == 0 {
            load_fixture(backend, state, fixture, &settings.fixture_paths()).await?;
        } else {
            tracing::debug!("Table {table} already has data, skipping fixture '{fixture}'");
        }
    }
    Ok(())
}

#[async_trait]
impl ManagementCommand for InitCommand {
    fn name(&self) -> &'static str {
        "init"
    }

    fn help(&self) -> &'static str {
        "Initialize the scriptorium installation"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("restart")
                .long("restart")
                .action(clap::ArgAction::SetTrue)
                .help("Flush the database before initialization"),
        )
        .arg(
            clap::Arg::new("no-static")
                .long("no-static")
                .action(clap::ArgAction::SetTrue)
                .help("Do not collect static files"),
        )
        .arg(
            clap::Arg::new("no-compress")
                .long("no-compress")
                .action(clap::ArgAction::SetTrue)
                .help("Do not attempt to compress static files"),
        )
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), ScriptoriumError> {
        initialize(
            settings,
            "default",
            matches.get_flag("restart"),
            matches.get_flag("no-static"),
            matches.get_flag("no-compress"),
        )
        .await
    }
}
