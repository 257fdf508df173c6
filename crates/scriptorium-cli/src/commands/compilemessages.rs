//! The `compilemessages` management command.
//!
//! Walks the configured locale paths, parses each language's source catalog
//! (`<locale>/<lang>/messages.json`), validates and normalizes it, and writes
//! the compiled catalog next to it as `messages.compiled.json`.

use std::path::Path;

use async_trait::async_trait;
use scriptorium_core::{ScriptoriumError, Settings, TranslationCatalog};

use crate::command::ManagementCommand;

/// The file name of a source catalog.
pub const CATALOG_SOURCE: &str = "messages.json";
/// The file name of a compiled catalog.
pub const CATALOG_COMPILED: &str = "messages.compiled.json";

/// Compiles translation catalogs.
pub struct CompilemessagesCommand;

/// Compiles one language directory's catalog.
///
/// Returns `false` when the directory has no source catalog.
///
/// # Errors
///
/// Returns an error when the source is malformed or fails validation.
async fn compile_language_dir(lang_dir: &Path) -> Result<bool, ScriptoriumError> {
    let source_path = lang_dir.join(CATALOG_SOURCE);
    if !source_path.is_file() {
        return Ok(false);
    }

    let source = tokio::fs::read_to_string(&source_path).await?;
    let catalog = TranslationCatalog::parse(&source).map_err(|e| {
        ScriptoriumError::SerializationError(format!("{}: {e}", source_path.display()))
    })?;
    catalog.validate().map_err(|e| {
        ScriptoriumError::ValidationError(format!("{}: {e}", source_path.display()))
    })?;

    let compiled = catalog.to_compiled()?;
    tokio::fs::write(lang_dir.join(CATALOG_COMPILED), compiled).await?;
    Ok(true)
}

/// Compiles all catalogs under the configured locale paths.
///
/// Returns the number of compiled languages. A missing locale path is
/// skipped; a broken catalog aborts the run.
///
/// # Errors
///
/// Returns the first parse or validation error encountered.
pub async fn compile_messages(settings: &Settings) -> Result<usize, ScriptoriumError> {
    let mut compiled = 0;

    for locale_path in &settings.locale_paths {
        let locale_path = settings.resolve(locale_path);
        if !locale_path.is_dir() {
            continue;
        }

        let mut entries = tokio::fs::read_dir(&locale_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() && compile_language_dir(&entry.path()).await? {
                tracing::debug!("Compiled catalog: {}", entry.path().display());
                compiled += 1;
            }
        }
    }

    tracing::info!("Compiled {compiled} translation catalog(s)");
    Ok(compiled)
}

#[async_trait]
impl ManagementCommand for CompilemessagesCommand {
    fn name(&self) -> &'static str {
        "compilemessages"
    }

    fn help(&self) -> &'static str {
        "Compile translation message catalogs"
    }

    async fn handle(
        &self,
        _matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), ScriptoriumError> {
        compile_messages(settings).await?;
        Ok(())
    }
}
