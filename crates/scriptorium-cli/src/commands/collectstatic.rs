//! The `collectstatic` management command.
//!
//! Collects static files from the configured source directories (including
//! the transpiler's output) into a single servable location.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use scriptorium_core::{ScriptoriumError, Settings};

use crate::command::ManagementCommand;

/// Collects static files into `static_root`.
pub struct CollectstaticCommand;

/// Returns the static source directories for the given settings: the
/// configured static dirs plus the transpiler output directory.
pub fn static_source_dirs(settings: &Settings) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = settings
        .staticfiles_dirs
        .iter()
        .map(|d| settings.resolve(d))
        .collect();
    dirs.push(settings.resolve(&settings.transpile.out_dir));
    dirs
}

/// Collects static files from the source directories into the target.
///
/// Directories that do not exist are skipped with a warning. Returns the
/// number of files copied.
///
/// # Errors
///
/// Returns an I/O error if the target cannot be created or a copy fails.
pub async fn collect_static_files(
    source_dirs: &[PathBuf],
    target_dir: &Path,
) -> Result<usize, ScriptoriumError> {
    tokio::fs::create_dir_all(target_dir).await.map_err(|e| {
        ScriptoriumError::IoError(std::io::Error::new(
            e.kind(),
            format!("Failed to create the static root: {e}"),
        ))
    })?;

    let mut count = 0;
    for source_dir in source_dirs {
        if !source_dir.exists() {
            tracing::warn!(
                "Static files directory does not exist: {}",
                source_dir.display()
            );
            continue;
        }
        count += collect_from_dir(source_dir, target_dir, source_dir).await?;
    }

    Ok(count)
}

/// Recursively copies files from a source directory into the target.
async fn collect_from_dir(
    current_dir: &Path,
    target_dir: &Path,
    base_dir: &Path,
) -> Result<usize, ScriptoriumError> {
    let mut count = 0;
    let mut entries = tokio::fs::read_dir(current_dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let file_type = entry.file_type().await?;
        let path = entry.path();

        if file_type.is_dir() {
            count += Box::pin(collect_from_dir(&path, target_dir, base_dir)).await?;
        } else if file_type.is_file() {
            let relative = path
                .strip_prefix(base_dir)
                .map_err(|e| ScriptoriumError::ConfigurationError(e.to_string()))?;
            let dest = target_dir.join(relative);

            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            tokio::fs::copy(&path, &dest).await?;
            count += 1;
        }
    }

    Ok(count)
}

/// Collects all static sources for the given settings into `static_root`.
///
/// Returns the number of files copied.
///
/// # Errors
///
/// Returns [`ScriptoriumError::ImproperlyConfigured`] when `static_root` is
/// not set.
pub async fn collect_static(settings: &Settings) -> Result<usize, ScriptoriumError> {
    let static_root = settings.static_root.as_ref().ok_or_else(|| {
        ScriptoriumError::ImproperlyConfigured(
            "static_root is not set; cannot collect static files".to_string(),
        )
    })?;

    let count = collect_static_files(&static_source_dirs(settings), static_root).await?;
    tracing::info!("Collected {count} static file(s) to {}", static_root.display());
    Ok(count)
}

#[async_trait]
impl ManagementCommand for CollectstaticCommand {
    fn name(&self) -> &'static str {
        "collectstatic"
    }

    fn help(&self) -> &'static str {
        "Collect static files"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("noinput")
                .long("noinput")
                .action(clap::ArgAction::SetTrue)
                .help("Do NOT prompt the user for confirmation"),
        )
        .arg(
            clap::Arg::new("clear")
                .long("clear")
                .action(clap::ArgAction::SetTrue)
                .help("Clear the existing files before collecting"),
        )
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), ScriptoriumError> {
        let clear = matches.get_flag("clear");

        if clear {
            if let Some(static_root) = settings.static_root.as_ref() {
                if static_root.exists() {
                    tracing::info!(
                        "Clearing existing static files in {}",
                        static_root.display()
                    );
                    tokio::fs::remove_dir_all(static_root).await?;
                }
            }
        }

        collect_static(settings).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with(src: &Path, static_root: &Path) -> Settings {
        Settings {
            src_path: src.to_path_buf(),
            static_root: Some(static_root.to_path_buf()),
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn test_collect_copies_tree() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("static");
        std::fs::create_dir_all(src.join("css")).unwrap();
        std::fs::write(src.join("app.js"), "console.log(1);").unwrap();
        std::fs::write(src.join("css/app.css"), "body {}").unwrap();

        let target = dir.path().join("collected");
        let count = collect_static_files(&[src], &target).await.unwrap();
        assert_eq!(count, 2);
        assert!(target.join("app.js").is_file());
        assert!(target.join("css/app.css").is_file());
    }

    #[tokio::test]
    async fn test_missing_source_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("collected");
        let count = collect_static_files(&[dir.path().join("nope")], &target)
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert!(target.is_dir());
    }

    #[tokio::test]
    async fn test_collect_static_requires_static_root() {
        let settings = Settings {
            static_root: None,
            ..Settings::default()
        };
        let result = collect_static(&settings).await;
        assert!(matches!(
            result,
            Err(ScriptoriumError::ImproperlyConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_collect_static_includes_transpile_output() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_with(dir.path(), &dir.path().join("collected"));

        let out_dir = settings.resolve(&settings.transpile.out_dir);
        std::fs::create_dir_all(&out_dir).unwrap();
        std::fs::write(out_dir.join("bundle.deadbeef.js"), "/* bundle */").unwrap();

        let count = collect_static(&settings).await.unwrap();
        assert_eq!(count, 1);
        assert!(dir.path().join("collected/bundle.deadbeef.js").is_file());
    }
}
