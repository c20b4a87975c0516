use super::Placement;
use crate::build::{PLUGIN_NAME, PLUGIN_VERSION};
use crate::bundle::BuildOutput;
use crate::error::Result;
use crate::io::{atomic_write, atomic_write_private, remove_dir_all_quiet};
use crate::merge::{delete_key, pretty_json, set_key};
use crate::paths::{self, KNOWN_MARKETPLACES_FILE, MARKETPLACE_KEY, PLUGIN_MANIFEST_DIR};
use crate::tools_config::Target;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// MarketplacePlacement
// ---------------------------------------------------------------------------

/// Writes the bundle into a plugin directory and registers it in the host
/// tool's `known_marketplaces.json` under the `brain` key.
pub struct MarketplacePlacement {
    target: Target,
}

impl MarketplacePlacement {
    pub fn new(target: Target) -> Self {
        Self { target }
    }

    fn registry_path(&self) -> Result<PathBuf> {
        Ok(paths::expand_tilde(&self.target.config_dir)?.join(KNOWN_MARKETPLACES_FILE))
    }

    fn register(&self, scope_dir: &Path) -> Result<()> {
        let registry_path = self.registry_path()?;
        let mut registry = read_json_or_empty(&registry_path);
        let scope = scope_dir.to_string_lossy().into_owned();
        let entry = json!({
            "source": { "source": "directory", "path": scope },
            "installLocation": scope,
            "lastUpdated": Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
        });
        set_key(&mut registry, MARKETPLACE_KEY, entry);
        atomic_write(&registry_path, pretty_json(&registry)?.as_bytes())
    }

    fn deregister(&self) -> Result<()> {
        let registry_path = self.registry_path()?;
        if !registry_path.exists() {
            return Ok(());
        }
        let mut registry = read_json_or_empty(&registry_path);
        delete_key(&mut registry, MARKETPLACE_KEY);
        atomic_write(&registry_path, pretty_json(&registry)?.as_bytes())
    }

    /// Rewrite the two plugin metadata files with the real installed file
    /// list, replacing the placeholders the plugin build phase emitted.
    fn synthesize_manifests(&self, scope_dir: &Path) -> Result<()> {
        let mut installed = Vec::new();
        collect_visible_files(scope_dir, scope_dir, &mut installed)?;
        installed.sort();

        let plugin = json!({
            "name": PLUGIN_NAME,
            "version": PLUGIN_VERSION,
            "files": installed,
        });
        let marketplace = json!({
            "name": PLUGIN_NAME,
            "displayName": self.target.display_name,
            "description": format!("Brain plugin for {}", self.target.display_name),
            "version": PLUGIN_VERSION,
        });
        let dir = scope_dir.join(PLUGIN_MANIFEST_DIR);
        atomic_write_private(&dir.join("plugin.json"), pretty_json(&plugin)?.as_bytes())?;
        atomic_write_private(
            &dir.join("marketplace.json"),
            pretty_json(&marketplace)?.as_bytes(),
        )
    }
}

impl Placement for MarketplacePlacement {
    fn place(&self, scope_dir: &Path, bundle: &BuildOutput) -> Result<()> {
        std::fs::create_dir_all(scope_dir)?;
        for file in bundle.all_files() {
            atomic_write(
                &scope_dir.join(&file.relative_path),
                file.content.as_bytes(),
            )?;
        }
        self.synthesize_manifests(scope_dir)?;
        self.register(scope_dir)
    }

    fn clean(&self, scope_dir: &Path) -> Result<()> {
        remove_dir_all_quiet(scope_dir);
        self.deregister()
    }
}

fn read_json_or_empty(path: &Path) -> Value {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_else(|| json!({}))
}

/// Collect relative paths of every non-hidden file under `dir`, skipping
/// `.DS_Store` and dot-directories like `.claude-plugin`.
fn collect_visible_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_visible_files(root, &path, out)?;
        } else if let Some(rel) = paths::to_slash_relative(&path, root) {
            out.push(rel);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
