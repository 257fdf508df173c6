//! The `compress` management command.
//!
//! Precompresses eligible static assets to gzip siblings (`app.js` ->
//! `app.js.gz`) so the web server can serve them without compressing on the
//! fly. Compression runs over the static sources before collection, so the
//! collected tree carries the compressed siblings too.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use scriptorium_core::{ScriptoriumError, Settings};

use crate::command::ManagementCommand;
use crate::commands::collectstatic::static_source_dirs;

/// Precompresses static assets.
pub struct CompressCommand;

/// Returns `true` if the file is eligible for precompression.
pub fn is_compressible(path: &Path, extensions: &[String]) -> bool {
    // Never compress an already compressed sibling.
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Gzip-compresses one file to a `.gz` sibling.
async fn compress_file(path: &Path) -> Result<(), ScriptoriumError> {
    use std::io::Write;

    let content = tokio::fs::read(path).await?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&content)?;
    let compressed = encoder.finish()?;

    let mut target = path.as_os_str().to_owned();
    target.push(".gz");
    tokio::fs::write(PathBuf::from(target), compressed).await?;
    Ok(())
}

/// Recursively compresses eligible files under a directory.
async fn compress_dir(dir: &Path, extensions: &[String]) -> Result<usize, ScriptoriumError> {
    let mut count = 0;
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let file_type = entry.file_type().await?;
        let path = entry.path();

        if file_type.is_dir() {
            count += Box::pin(compress_dir(&path, extensions)).await?;
        } else if file_type.is_file() && is_compressible(&path, extensions) {
            compress_file(&path).await?;
            count += 1;
        }
    }

    Ok(count)
}

/// Precompresses all eligible static assets for the given settings.
///
/// Returns the number of compressed files.
///
/// # Errors
///
/// Returns [`ScriptoriumError::CommandError`] when offline compression is
/// not enabled in the settings or no static source directory exists; this
/// is the one error the initialization sequence tolerates.
pub async fn compress_static(settings: &Settings) -> Result<usize, ScriptoriumError> {
    if !(settings.compress.enabled && settings.compress.offline) {
        return Err(ScriptoriumError::CommandError(
            "Offline compression is disabled in the settings".to_string(),
        ));
    }

    let dirs: Vec<PathBuf> = static_source_dirs(settings)
        .into_iter()
        .filter(|d| d.exists())
        .collect();
    if dirs.is_empty() {
        return Err(ScriptoriumError::CommandError(
            "No static source directory exists; nothing to compress".to_string(),
        ));
    }

    let mut count = 0;
    for dir in &dirs {
        count += compress_dir(dir, &settings.compress.extensions).await?;
    }
    tracing::info!("Compressed {count} static file(s)");
    Ok(count)
}

#[async_trait]
impl ManagementCommand for CompressCommand {
    fn name(&self) -> &'static str {
        "compress"
    }

    fn help(&self) -> &'static str {
        "Precompress static assets"
    }

    async fn handle(
        &self,
        _matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), ScriptoriumError> {
        compress_static(settings).await?;
        Ok(())
    }
}
