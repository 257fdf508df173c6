//! The `transpile` management command.
//!
//! Turns the ES-module front-end sources into deployable bundles. Each file
//! at the top level of the source directory is an entry point; its relative
//! imports are resolved recursively, the modules are concatenated in
//! dependency order (imports stripped, exports unwrapped), and the bundle is
//! written under a content-hashed name so deployments can cache aggressively.
//! A `manifest.json` maps entry points to their current bundle names.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use regex::Regex;
use scriptorium_cli::command::ManagementCommand;
use scriptorium_core::{ScriptoriumError, Settings};
use sha2::{Digest, Sha256};

/// Transpiles the front-end sources.
pub struct TranspileCommand;

/// The name of the bundle manifest file.
pub const MANIFEST_NAME: &str = "manifest.json";

/// A parsed module: its source and its resolved relative imports.
#[derive(Debug, Clone)]
struct Module {
    source: String,
    imports: Vec<String>,
}

/// Scans the source tree, bundles every entry point and writes the manifest.
///
/// Returns the number of bundles written. A missing source directory is not
/// an error; there is simply nothing to transpile.
///
/// # Errors
///
/// Returns [`ScriptoriumError::CommandError`] for unresolvable or circular
/// imports, and I/O errors for unreadable sources.
pub async fn transpile_assets(settings: &Settings) -> Result<usize, ScriptoriumError> {
    let src_dir = settings.resolve(&settings.transpile.src_dir);
    if !src_dir.is_dir() {
        tracing::warn!(
            "Front-end source directory does not exist: {}",
            src_dir.display()
        );
        return Ok(0);
    }
    let out_dir = settings.resolve(&settings.transpile.out_dir);

    let modules = collect_modules(&src_dir).await?;
    let entries: Vec<String> = modules
        .keys()
        .filter(|rel| !rel.contains('/'))
        .cloned()
        .collect();

    // Start from a clean output directory so stale bundles disappear.
    if out_dir.exists() {
        tokio::fs::remove_dir_all(&out_dir).await?;
    }
    tokio::fs::create_dir_all(&out_dir).await?;

    let mut manifest = BTreeMap::new();
    for entry in &entries {
        let ordered = dependency_order(entry, &modules)?;
        let bundle = render_bundle(&ordered, &modules);
        let name = bundle_name(entry, &bundle);
        tokio::fs::write(out_dir.join(&name), &bundle).await?;
        manifest.insert(entry.clone(), name);
    }

    let manifest_json = serde_json::to_string_pretty(&manifest)
        .map_err(|e| ScriptoriumError::SerializationError(e.to_string()))?;
    tokio::fs::write(out_dir.join(MANIFEST_NAME), manifest_json).await?;

    tracing::info!("Transpiled {} bundle(s) to {}", entries.len(), out_dir.display());
    Ok(entries.len())
}

/// Reads all `.js` files under the source directory, keyed by their
/// `/`-separated relative path.
async fn collect_modules(src_dir: &Path) -> Result<BTreeMap<String, Module>, ScriptoriumError> {
    let mut modules = BTreeMap::new();
    let mut pending = vec![src_dir.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                pending.push(path);
            } else if path.extension().and_then(|e| e.to_str()) == Some("js") {
                let rel = relative_key(src_dir, &path)?;
                let source = tokio::fs::read_to_string(&path).await?;
                let imports = parse_imports(&rel, &source)?;
                modules.insert(rel, Module { source, imports });
            }
        }
    }

    Ok(modules)
}

/// Returns the `/`-separated path of `path` relative to `base`.
fn relative_key(base: &Path, path: &Path) -> Result<String, ScriptoriumError> {
    let rel = path
        .strip_prefix(base)
        .map_err(|e| ScriptoriumError::ConfigurationError(e.to_string()))?;
    Ok(rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

/// Extracts the relative import specifiers of a module and resolves them
/// against the module's own location.
fn parse_imports(module: &str, source: &str) -> Result<Vec<String>, ScriptoriumError> {
    // Matches `import ... from './x.js'`, `import './x.js'` and
    // `export ... from './x.js'`. Bare (package) specifiers are ignored.
    let import_re = Regex::new(
        r#"(?m)^\s*(?:import|export)\s+(?:[^'"]*?\bfrom\s+)?['"]([^'"]+)['"]"#,
    )
    .map_err(|e| ScriptoriumError::ConfigurationError(e.to_string()))?;

    let mut imports = Vec::new();
    for capture in import_re.captures_iter(source) {
        let spec = &capture[1];
        if spec.starts_with('.') {
            imports.push(resolve_specifier(module, spec)?);
        }
    }
    Ok(imports)
}

/// Resolves a relative import specifier against the importing module's path.
fn resolve_specifier(module: &str, spec: &str) -> Result<String, ScriptoriumError> {
    let mut parts: Vec<&str> = module.split('/').collect();
    parts.pop(); // the module's own file name

    for part in spec.split('/') {
        match part {
            "." | "" => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(ScriptoriumError::CommandError(format!(
                        "Import '{spec}' in '{module}' escapes the source directory"
                    )));
                }
            }
            other => parts.push(other),
        }
    }

    let mut resolved = parts.join("/");
    if !resolved.ends_with(".js") {
        resolved.push_str(".js");
    }
    Ok(resolved)
}

/// Returns the modules reachable from `entry` in dependency order
/// (dependencies before their importers).
fn dependency_order(
    entry: &str,
    modules: &BTreeMap<String, Module>,
) -> Result<Vec<String>, ScriptoriumError> {
    let mut order = Vec::new();
    let mut done = HashSet::new();
    let mut visiting = HashSet::new();
    visit(entry, modules, &mut order, &mut done, &mut visiting)?;
    Ok(order)
}

fn visit(
    module: &str,
    modules: &BTreeMap<String, Module>,
    order: &mut Vec<String>,
    done: &mut HashSet<String>,
    visiting: &mut HashSet<String>,
) -> Result<(), ScriptoriumError> {
    if done.contains(module) {
        return Ok(());
    }
    if !visiting.insert(module.to_string()) {
        return Err(ScriptoriumError::CommandError(format!(
            "Circular import involving '{module}'"
        )));
    }

    let entry = modules.get(module).ok_or_else(|| {
        ScriptoriumError::CommandError(format!("Unresolved import: '{module}'"))
    })?;
    for import in &entry.imports {
        visit(import, modules, order, done, visiting)?;
    }

    visiting.remove(module);
    done.insert(module.to_string());
    order.push(module.to_string());
    Ok(())
}

/// Concatenates the ordered modules, stripping import statements and
/// unwrapping exports.
fn render_bundle(ordered: &[String], modules: &BTreeMap<String, Module>) -> String {
    let mut bundle = String::from("\"use strict\";\n");
    for name in ordered {
        let Some(module) = modules.get(name) else {
            continue;
        };
        bundle.push_str(&format!("\n// {name}\n"));
        for line in module.source.lines() {
            let trimmed = line.trim_start();
            if trimmed.starts_with("import ") || trimmed.starts_with("import\"")
                || trimmed.starts_with("import'")
            {
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix("export default ") {
                bundle.push_str(rest);
            } else if let Some(rest) = trimmed.strip_prefix("export ") {
                if rest.starts_with('{') {
                    // Re-export lists have no runtime effect in a bundle.
                    continue;
                }
                bundle.push_str(rest);
            } else {
                bundle.push_str(line);
            }
            bundle.push('\n');
        }
    }
    bundle
}

/// Returns the content-hashed bundle file name for an entry point.
fn bundle_name(entry: &str, bundle: &str) -> String {
    let digest = Sha256::digest(bundle.as_bytes());
    let hex: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
    let stem = entry.strip_suffix(".js").unwrap_or(entry);
    format!("{stem}.{hex}.js")
}

#[async_trait]
impl ManagementCommand for TranspileCommand {
    fn name(&self) -> &'static str {
        "transpile"
    }

    fn help(&self) -> &'static str {
        "Bundle the front-end sources"
    }

    async fn handle(
        &self,
        _matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), ScriptoriumError> {
        transpile_assets(settings).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with(src: &Path) -> Settings {
        Settings {
            src_path: src.to_path_buf(),
            ..Settings::default()
        }
    }

    fn write_sources(src: &Path) {
        let js = src.join("static/js");
        std::fs::create_dir_all(js.join("modules")).unwrap();
        std::fs::write(
            js.join("index.js"),
            "import {editor} from './modules/editor.js'\neditor.start()\n",
        )
        .unwrap();
        std::fs::write(
            js.join("modules/editor.js"),
            "import {menu} from './menu.js'\nexport const editor = {start() { menu.render() }}\n",
        )
        .unwrap();
        std::fs::write(
            js.join("modules/menu.js"),
            "export const menu = {render() {}}\n",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_transpile_writes_hashed_bundle_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        write_sources(dir.path());
        let settings = settings_with(dir.path());

        let count = transpile_assets(&settings).await.unwrap();
        assert_eq!(count, 1);

        let out = settings.resolve(&settings.transpile.out_dir);
        let manifest: BTreeMap<String, String> = serde_json::from_str(
            &std::fs::read_to_string(out.join(MANIFEST_NAME)).unwrap(),
        )
        .unwrap();
        let bundle_file = manifest.get("index.js").unwrap();
        assert!(bundle_file.starts_with("index."));
        assert!(bundle_file.ends_with(".js"));

        let bundle = std::fs::read_to_string(out.join(bundle_file)).unwrap();
        // Dependencies come before their importers
        let menu_pos = bundle.find("const menu").unwrap();
        let editor_pos = bundle.find("const editor").unwrap();
        let start_pos = bundle.find("editor.start()").unwrap();
        assert!(menu_pos < editor_pos);
        assert!(editor_pos < start_pos);
        // Imports are stripped
        assert!(!bundle.contains("import "));
    }

    #[tokio::test]
    async fn test_transpile_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        write_sources(dir.path());
        let settings = settings_with(dir.path());

        transpile_assets(&settings).await.unwrap();
        let out = settings.resolve(&settings.transpile.out_dir);
        let first = std::fs::read_to_string(out.join(MANIFEST_NAME)).unwrap();

        transpile_assets(&settings).await.unwrap();
        let second = std::fs::read_to_string(out.join(MANIFEST_NAME)).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_missing_source_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_with(dir.path());
        assert_eq!(transpile_assets(&settings).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unresolved_import_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let js = dir.path().join("static/js");
        std::fs::create_dir_all(&js).unwrap();
        std::fs::write(js.join("index.js"), "import {x} from './missing.js'\n").unwrap();

        let result = transpile_assets(&settings_with(dir.path())).await;
        assert!(matches!(result, Err(ScriptoriumError::CommandError(_))));
    }

    #[tokio::test]
    async fn test_circular_import_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let js = dir.path().join("static/js");
        std::fs::create_dir_all(&js).unwrap();
        std::fs::write(js.join("a.js"), "import {b} from './b.js'\nexport const a = 1\n").unwrap();
        std::fs::write(js.join("b.js"), "import {a} from './a.js'\nexport const b = 2\n").unwrap();

        let result = transpile_assets(&settings_with(dir.path())).await;
        assert!(matches!(result, Err(ScriptoriumError::CommandError(_))));
    }

    #[test]
    fn test_resolve_specifier() {
        assert_eq!(
            resolve_specifier("modules/editor.js", "./menu.js").unwrap(),
            "modules/menu.js"
        );
        assert_eq!(
            resolve_specifier("modules/editor.js", "../util").unwrap(),
            "util.js"
        );
        assert!(resolve_specifier("index.js", "../../outside.js").is_err());
    }

    #[test]
    fn test_parse_imports_ignores_packages() {
        let imports = parse_imports(
            "index.js",
            "import {x} from 'somepackage'\nimport {y} from './local.js'\n",
        )
        .unwrap();
        assert_eq!(imports, vec!["local.js".to_string()]);
    }
}
