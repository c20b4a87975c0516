//! Install manifests.
//!
//! Each installed target gets a `manifest-<tool>.json` under the cache
//! directory recording every placed file (absolute path) and, per merged
//! shared config file, the dotted keys this install owns. Uninstall reads
//! the manifest back to know exactly what to remove.

use crate::error::Result;
use crate::io::{atomic_write, ensure_dir, remove_file_quiet};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// InstallManifest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallManifest {
    pub tool: String,
    pub files: Vec<String>,
    /// Shared config file path -> dotted keys this install merged into it.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub managed: BTreeMap<String, Vec<String>>,
}

impl InstallManifest {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            files: Vec::new(),
            managed: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// ManifestStore
// ---------------------------------------------------------------------------

/// Reads and writes install manifests under a cache directory.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    dir: PathBuf,
}

impl ManifestStore {
    /// Store rooted at the user cache directory
    /// (`$XDG_CACHE_HOME/brain` or `~/.cache/brain`).
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: paths::cache_dir()?,
        })
    }

    /// Store rooted at an explicit directory. Used by tests.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, tool: &str) -> PathBuf {
        self.dir.join(format!("manifest-{tool}.json"))
    }

    pub fn write(&self, manifest: &InstallManifest) -> Result<()> {
        ensure_dir(&self.dir)?;
        let json = serde_json::to_string_pretty(manifest)? + "\n";
        atomic_write(&self.path(&manifest.tool), json.as_bytes())
    }

    /// `Ok(None)` when no manifest exists for the tool.
    pub fn read(&self, tool: &str) -> Result<Option<InstallManifest>> {
        let path = self.path(tool);
        if !path.is_file() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    pub fn exists(&self, tool: &str) -> bool {
        self.path(tool).is_file()
    }

    pub fn remove(&self, tool: &str) {
        remove_file_quiet(&self.path(tool));
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> InstallManifest {
        let mut manifest = InstallManifest::new("claude-code");
        manifest.files = vec![
            "/home/u/.claude/agents/🧠-reviewer.md".to_string(),
            "/home/u/.claude/settings.json".to_string(),
        ];
        manifest
            .managed
            .insert("/home/u/.claude/settings.json".to_string(), vec![
                "hooks.preCommit".to_string(),
            ]);
        manifest
    }

    #[test]
    fn write_then_read_round_trips() {
        let tmp = TempDir::new().unwrap();
        let store = ManifestStore::at(tmp.path());
        let manifest = sample();
        store.write(&manifest).unwrap();
        assert_eq!(store.read("claude-code").unwrap(), Some(manifest));
    }

    #[test]
    fn read_missing_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = ManifestStore::at(tmp.path());
        assert_eq!(store.read("cursor").unwrap(), None);
        assert!(!store.exists("cursor"));
    }

    #[test]
    fn manifest_filename_embeds_tool_name() {
        let store = ManifestStore::at("/tmp/cache");
        assert!(store
            .path("claude-code")
            .ends_with("manifest-claude-code.json"));
    }

    #[test]
    fn empty_managed_map_is_omitted_from_json() {
        let manifest = InstallManifest::new("cursor");
        let json = serde_json::to_string(&manifest).unwrap();
        assert!(!json.contains("managed"));
    }

    #[test]
    fn remove_is_quiet_when_absent() {
        let tmp = TempDir::new().unwrap();
        let store = ManifestStore::at(tmp.path());
        store.remove("never-installed");
        assert!(!store.exists("never-installed"));
    }

    #[test]
    fn write_creates_cache_dir() {
        let tmp = TempDir::new().unwrap();
        let store = ManifestStore::at(tmp.path().join("nested").join("cache"));
        store.write(&sample()).unwrap();
        assert!(store.exists("claude-code"));
    }
}
