use super::Placement;
use crate::bundle::{BuildOutput, GeneratedFile, MergePayload};
use crate::error::Result;
use crate::io::{atomic_write, atomic_write_private, remove_file_quiet};
use crate::merge::{merge_patch, pretty_json};
use crate::prefix::has_prefix;
use crate::tools_config::{ShareStrategy, Target};
use serde_json::Value;
use std::path::Path;

/// Top-level keys that merge-managed files may nest Brain entries under.
const MANAGED_PARENTS: [&str; 2] = ["mcpServers", "hooks"];
/// A managed file holding only these keys after cleaning is deleted.
const METADATA_KEYS: [&str; 2] = ["version", "$schema"];

// ---------------------------------------------------------------------------
// CopyMergePlacement
// ---------------------------------------------------------------------------

/// Copies generated files into the host tool's own directories and merges
/// shared JSON files in place, rather than registering a plugin directory.
pub struct CopyMergePlacement {
    target: Target,
}

impl CopyMergePlacement {
    pub fn new(target: Target) -> Self {
        Self { target }
    }

    fn place_shared(&self, scope_dir: &Path, files: &[GeneratedFile]) -> Result<()> {
        for file in files {
            if let Some(payload) = MergePayload::parse(&file.content) {
                let dest = scope_dir.join(strip_merge_suffix(&file.relative_path));
                let existing = read_json_or_empty(&dest);
                let merged = merge_patch(&existing, &payload.content);
                atomic_write_private(&dest, pretty_json(&merged)?.as_bytes())?;
            } else if self.is_strategy_target(&file.relative_path) {
                atomic_write_private(
                    &scope_dir.join(&file.relative_path),
                    file.content.as_bytes(),
                )?;
            } else {
                atomic_write(
                    &scope_dir.join(&file.relative_path),
                    file.content.as_bytes(),
                )?;
            }
        }
        Ok(())
    }

    fn is_strategy_target(&self, relative_path: &str) -> bool {
        relative_path == self.target.hooks.target || relative_path == self.target.mcp.target
    }
}

impl Placement for CopyMergePlacement {
    fn place(&self, scope_dir: &Path, bundle: &BuildOutput) -> Result<()> {
        std::fs::create_dir_all(scope_dir)?;
        for group in [&bundle.agents, &bundle.skills, &bundle.commands, &bundle.rules] {
            for file in group {
                atomic_write(
                    &scope_dir.join(&file.relative_path),
                    file.content.as_bytes(),
                )?;
            }
        }
        self.place_shared(scope_dir, &bundle.hooks)?;
        self.place_shared(scope_dir, &bundle.mcp)
    }

    fn clean(&self, scope_dir: &Path) -> Result<()> {
        for sub in ["agents", "commands", "rules"] {
            remove_prefixed_files(&scope_dir.join(sub))?;
        }
        remove_prefixed_dirs(&scope_dir.join("skills"))?;

        for share in [&self.target.hooks, &self.target.mcp] {
            if share.strategy == ShareStrategy::Merge && !share.target.is_empty() {
                clean_managed_json(&scope_dir.join(&share.target))?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn strip_merge_suffix(path: &str) -> String {
    match path.strip_suffix(".merge.json") {
        Some(stem) => format!("{stem}.json"),
        None => path.to_string(),
    }
}

fn read_json_or_empty(path: &Path) -> Value {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_else(|| serde_json::json!({}))
}

/// Recursively remove regular files whose name carries the Brain prefix.
fn remove_prefixed_files(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_dir() {
            remove_prefixed_files(&entry.path())?;
        } else if has_prefix(&name) {
            remove_file_quiet(&entry.path());
        }
    }
    Ok(())
}

/// Remove top-level subdirectories whose name carries the Brain prefix.
fn remove_prefixed_dirs(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_dir() && has_prefix(&name) {
            crate::io::remove_dir_all_quiet(&entry.path());
        }
    }
    Ok(())
}

fn is_brain_key(key: &str) -> bool {
    key.to_lowercase().starts_with("brain")
}

/// Strip Brain-owned keys from a shared JSON file: top-level `brain*` keys,
/// nested `brain*` keys under the known parents, then parents left empty.
/// A file reduced to metadata keys only is deleted outright.
fn clean_managed_json(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let Ok(raw) = std::fs::read_to_string(path) else {
        return Ok(());
    };
    let Ok(mut value) = serde_json::from_str::<Value>(&raw) else {
        // Not Brain's file shape; leave user content alone.
        return Ok(());
    };
    let Some(map) = value.as_object_mut() else {
        return Ok(());
    };

    map.retain(|key, _| !is_brain_key(key));
    for parent in MANAGED_PARENTS {
        let emptied = match map.get_mut(parent).and_then(|v| v.as_object_mut()) {
            Some(children) => {
                children.retain(|key, _| !is_brain_key(key));
                children.is_empty()
            }
            None => false,
        };
        if emptied {
            map.remove(parent);
        }
    }

    if map.keys().all(|key| METADATA_KEYS.contains(&key.as_str())) {
        remove_file_quiet(path);
        return Ok(());
    }
    atomic_write(path, pretty_json(&value)?.as_bytes())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
