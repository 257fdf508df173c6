//! The `showmigrations` management command.
//!
//! Lists the known migrations per app with their applied state, in the order
//! they would be applied.

use async_trait::async_trait;
use scriptorium_core::{ScriptoriumError, Settings};
use scriptorium_db::open_database;
use scriptorium_migrations::{MigrationLoader, MigrationRecorder};

use crate::command::ManagementCommand;

/// Shows all migrations and whether they have been applied.
pub struct ShowmigrationsCommand;

#[async_trait]
impl ManagementCommand for ShowmigrationsCommand {
    fn name(&self) -> &'static str {
        "showmigrations"
    }

    fn help(&self) -> &'static str {
        "List migrations and their applied state"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("database")
                .long("database")
                .default_value("default")
                .help("Database alias to inspect"),
        )
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), ScriptoriumError> {
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

        let mut recorder = MigrationRecorder::new();
        recorder.ensure_table(backend.as_ref()).await?;
        recorder.load(backend.as_ref()).await?;

        let mut current_app = String::new();
        for key in graph.topological_order()? {
            if key.0 != current_app {
                current_app = key.0.clone();
                println!("{current_app}");
            }
            let marker = if recorder.is_applied(&key) { "X" } else { " " };
            println!(" [{marker}] {}", key.1);
        }

        Ok(())
    }
}
