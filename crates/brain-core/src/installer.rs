//! Per-target install facade.
//!
//! A `ToolInstaller` wires one target record to the template source, the
//! build phases, a placement strategy, and the manifest store, and drives
//! install/uninstall through the transactional pipeline.

use crate::brain_config::BrainConfig;
use crate::build;
use crate::bundle::{BuildOutput, MergePayload};
use crate::error::{BrainError, Result};
use crate::io::{atomic_write_private, remove_file_quiet};
use crate::manifest::{InstallManifest, ManifestStore};
use crate::merge::{delete_key, get_key, pretty_json};
use crate::paths::{expand_tilde, KNOWN_MARKETPLACES_FILE, MARKETPLACE_KEY};
use crate::pipeline::{CancelToken, Pipeline, Step};
use crate::placement::{self, copy_merge::strip_merge_suffix};
use crate::prefix::has_prefix;
use crate::source::TemplateSource;
use crate::tools_config::{Detection, PlacementKind, Target};
use serde_json::Value;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ToolInstaller
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ToolInstaller {
    target: Target,
    source: TemplateSource,
    store: ManifestStore,
    scope: String,
}

impl ToolInstaller {
    pub fn new(target: Target, source: TemplateSource) -> Result<Self> {
        Ok(Self::with_store(target, source, ManifestStore::new()?))
    }

    /// Installer with an explicit manifest store. Tests use this to keep
    /// manifests inside a temp directory.
    pub fn with_store(target: Target, source: TemplateSource, store: ManifestStore) -> Self {
        let scope = target.default_scope.clone();
        Self {
            target,
            source,
            store,
            scope,
        }
    }

    /// Same installer, rebound to a different template source.
    pub fn with_source(mut self, source: TemplateSource) -> Self {
        self.source = source;
        self
    }

    pub fn name(&self) -> &str {
        &self.target.name
    }

    pub fn display_name(&self) -> &str {
        &self.target.display_name
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    /// `config_dir` with a leading `~` expanded. Falls back to the raw
    /// string when the home directory cannot be determined.
    pub fn config_dir(&self) -> PathBuf {
        expand_tilde(&self.target.config_dir)
            .unwrap_or_else(|_| PathBuf::from(&self.target.config_dir))
    }

    pub fn is_tool_installed(&self) -> bool {
        self.config_dir().exists()
    }

    /// Dispatch on the target's detection rule.
    pub fn is_brain_installed(&self) -> bool {
        match &self.target.detection.brain_installed {
            Detection::JsonKey { file, key } => {
                let path = self.config_dir().join(file);
                let Ok(raw) = std::fs::read_to_string(&path) else {
                    return false;
                };
                let Ok(root) = serde_json::from_str::<Value>(&raw) else {
                    return false;
                };
                get_key(&root, key).is_some()
            }
            Detection::PrefixScan { dirs } => {
                let Ok(scope_dir) = self.scope_dir() else {
                    return false;
                };
                dirs.iter().any(|dir| dir_has_prefixed_entry(&scope_dir.join(dir)))
            }
        }
    }

    // -- scopes ------------------------------------------------------------

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn scopes(&self) -> Vec<&str> {
        self.target.scopes.keys().map(String::as_str).collect()
    }

    pub fn set_scope(&mut self, name: &str) -> Result<()> {
        if !self.target.scopes.contains_key(name) {
            return Err(BrainError::UnknownScope {
                name: name.to_string(),
                available: self.scopes().join(", "),
            });
        }
        self.scope = name.to_string();
        Ok(())
    }

    /// Absolute path for a named scope: `~` expands to the home directory,
    /// relative paths resolve against the working directory.
    pub fn resolve_scope_path(&self, scope: &str) -> Result<PathBuf> {
        let raw = self
            .target
            .scopes
            .get(scope)
            .ok_or_else(|| BrainError::UnknownScope {
                name: scope.to_string(),
                available: self.scopes().join(", "),
            })?;
        let path = expand_tilde(raw)?;
        if path.is_absolute() {
            Ok(path)
        } else {
            Ok(std::env::current_dir()?.join(path))
        }
    }

    pub fn scope_dir(&self) -> Result<PathBuf> {
        self.resolve_scope_path(&self.scope)
    }

    // -- install / uninstall -----------------------------------------------

    pub fn build(&self) -> Result<BuildOutput> {
        let brain = BrainConfig::load(&self.source)?;
        build::build_all(&self.source, &self.target, &brain)
    }

    /// Run the four-step install pipeline. Any failure rolls back the steps
    /// that already completed.
    pub fn install(&self, cancel: &CancelToken) -> Result<()> {
        let scope_dir = self.scope_dir()?;
        let placement = placement::for_target(&self.target);

        #[derive(Default)]
        struct Ctx {
            bundle: Option<BuildOutput>,
        }
        let mut ctx = Ctx::default();

        Pipeline::new()
            .step(
                Step::new("clean-previous", |_: &mut Ctx| {
                    placement.clean(&scope_dir)
                })
                .condition(|_| self.is_brain_installed()),
            )
            .step(Step::new("build", |ctx: &mut Ctx| {
                ctx.bundle = Some(self.build()?);
                Ok(())
            }))
            .step(
                Step::new("place", |ctx: &mut Ctx| {
                    let bundle = ctx.bundle.as_ref().ok_or(BrainError::Cancelled)?;
                    placement.place(&scope_dir, bundle)
                })
                .condition(|ctx: &Ctx| ctx.bundle.is_some())
                .undo(|_: &mut Ctx| placement.clean(&scope_dir)),
            )
            .step(
                Step::new("write-manifest", |ctx: &mut Ctx| {
                    let manifest = self.manifest_for(&scope_dir, ctx.bundle.as_ref());
                    self.store.write(&manifest)
                })
                .undo(|_: &mut Ctx| {
                    self.store.remove(self.name());
                    Ok(())
                }),
            )
            .run(cancel, &mut ctx)
    }

    /// Remove everything the manifest says this install owns. Without a
    /// manifest, fall back to the placement's clean.
    pub fn uninstall(&self) -> Result<()> {
        match self.store.read(self.name())? {
            Some(manifest) => {
                for file in &manifest.files {
                    remove_file_quiet(Path::new(file));
                }
                for (file, keys) in &manifest.managed {
                    remove_managed_keys(Path::new(file), keys);
                }
                self.store.remove(self.name());
                Ok(())
            }
            None => {
                let scope_dir = self.scope_dir()?;
                let placement = placement::for_target(&self.target);
                let _ = placement.clean(&scope_dir);
                Ok(())
            }
        }
    }

    /// Absolute destination path for every bundle file, plus the dotted
    /// keys merged into each shared host file.
    fn manifest_for(&self, scope_dir: &Path, bundle: Option<&BuildOutput>) -> InstallManifest {
        let mut manifest = InstallManifest::new(&self.target.name);
        if self.target.placement == PlacementKind::Marketplace {
            // The `brain` registry entry is ours; uninstall must drop it.
            let registry = self.config_dir().join(KNOWN_MARKETPLACES_FILE);
            manifest
                .managed
                .insert(path_string(&registry), vec![MARKETPLACE_KEY.to_string()]);
        }
        let Some(bundle) = bundle else {
            return manifest;
        };
        for file in bundle.all_files() {
            manifest
                .files
                .push(path_string(&scope_dir.join(&file.relative_path)));
            if self.target.placement != PlacementKind::CopyAndMerge {
                continue;
            }
            if let Some(payload) = MergePayload::parse(&file.content) {
                if !payload.managed_keys.is_empty() {
                    let dest = scope_dir.join(strip_merge_suffix(&file.relative_path));
                    manifest
                        .managed
                        .insert(path_string(&dest), payload.managed_keys);
                }
            }
        }
        manifest
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn dir_has_prefixed_entry(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries
        .flatten()
        .any(|entry| has_prefix(&entry.file_name().to_string_lossy()))
}

/// Best-effort removal of this install's keys from a shared JSON file.
/// Deleting the last key deletes the file.
fn remove_managed_keys(path: &Path, keys: &[String]) {
    let Ok(raw) = std::fs::read_to_string(path) else {
        return;
    };
    let Ok(mut root) = serde_json::from_str::<Value>(&raw) else {
        return;
    };
    for key in keys {
        delete_key(&mut root, key);
        // Drop the parent object too once it has no children left.
        if let Some((parent, _)) = key.rsplit_once('.') {
            if get_key(&root, parent).and_then(Value::as_object).is_some_and(|m| m.is_empty()) {
                delete_key(&mut root, parent);
            }
        }
    }
    let emptied = root.as_object().is_some_and(|map| map.is_empty());
    if emptied {
        remove_file_quiet(path);
        return;
    }
    if let Ok(text) = pretty_json(&root) {
        let _ = atomic_write_private(path, text.as_bytes());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools_config::ToolsConfig;
    use serde_json::json;
    use tempfile::TempDir;

    /// Template project with one single-file agent and a copy-and-merge
    /// target whose project scope points into `host`.
    fn fixture(host: &Path, extra_tools_yaml: &str) -> (TempDir, ToolInstaller, TempDir) {
        let project = TempDir::new().unwrap();
        std::fs::create_dir_all(project.path().join("templates/agents")).unwrap();
        std::fs::write(
            project.path().join("templates/agents/reviewer.md"),
            "---\ndescription: Reviews code\n---\n\nReview carefully.\n",
        )
        .unwrap();
        std::fs::write(
            project.path().join("brain.config.json"),
            json!({ "agents": { "reviewer": { "cursor": {} } } }).to_string(),
        )
        .unwrap();
        let tools = format!(
            r#"
tools:
  cursor:
    display_name: Cursor
    prefix: true
    config_dir: {host}
    scopes:
      project: {host}
    default_scope: project
    agents:
      frontmatter: [description]
    rules:
      extension: .mdc
    manifest:
      type: file_list
    detection:
      brain_installed:
        type: prefix_scan
        dirs: [agents]
    placement: copy_and_merge
{extra}
"#,
            host = host.display(),
            extra = extra_tools_yaml,
        );
        std::fs::write(project.path().join("tools.yaml"), tools).unwrap();

        let config = ToolsConfig::parse(
            &std::fs::read_to_string(project.path().join("tools.yaml")).unwrap(),
        )
        .unwrap();
        let target = config.get("cursor").unwrap().clone();
        let source = TemplateSource::new(project.path());
        let cache = TempDir::new().unwrap();
        let installer =
            ToolInstaller::with_store(target, source, ManifestStore::at(cache.path()));
        (project, installer, cache)
    }

    #[test]
    fn install_places_prefixed_agent_and_writes_manifest() {
        let host = TempDir::new().unwrap();
        let (_project, installer, _cache) = fixture(host.path(), "");

        installer.install(&CancelToken::new()).unwrap();

        let agent = host.path().join("agents/🧠-reviewer.md");
        assert!(agent.is_file());
        let manifest = installer.store().read("cursor").unwrap().unwrap();
        assert_eq!(manifest.tool, "cursor");
        assert!(manifest
            .files
            .iter()
            .any(|f| f.ends_with("agents/🧠-reviewer.md")));
    }

    #[test]
    fn reinstall_cleans_stale_prefixed_files_first() {
        let host = TempDir::new().unwrap();
        std::fs::create_dir_all(host.path().join("agents")).unwrap();
        std::fs::write(host.path().join("agents/🧠-stale.md"), "old").unwrap();
        std::fs::write(host.path().join("agents/user.md"), "keep").unwrap();
        let (_project, installer, _cache) = fixture(host.path(), "");

        assert!(installer.is_brain_installed());
        installer.install(&CancelToken::new()).unwrap();

        assert!(!host.path().join("agents/🧠-stale.md").exists());
        assert!(host.path().join("agents/user.md").is_file());
        assert!(host.path().join("agents/🧠-reviewer.md").is_file());
    }

    #[test]
    fn merge_strategy_install_then_uninstall_restores_user_keys() {
        let host = TempDir::new().unwrap();
        let (project, installer, _cache) = fixture(
            host.path(),
            "    mcp:\n      strategy: merge\n      target: mcp.json\n",
        );
        std::fs::create_dir_all(project.path().join("templates/configs")).unwrap();
        std::fs::write(
            project.path().join("templates/configs/mcp.json"),
            json!({ "mcpServers": { "brain-notes": { "command": "node" } } }).to_string(),
        )
        .unwrap();
        std::fs::write(
            host.path().join("mcp.json"),
            json!({ "mcpServers": { "user-server": { "command": "deno" } } }).to_string(),
        )
        .unwrap();

        installer.install(&CancelToken::new()).unwrap();

        let merged: Value =
            serde_json::from_str(&std::fs::read_to_string(host.path().join("mcp.json")).unwrap())
                .unwrap();
        assert!(merged["mcpServers"]["brain-notes"].is_object());
        assert!(merged["mcpServers"]["user-server"].is_object());

        let manifest = installer.store().read("cursor").unwrap().unwrap();
        let managed_file = path_string(&host.path().join("mcp.json"));
        assert_eq!(
            manifest.managed.get(&managed_file),
            Some(&vec!["mcpServers.brain-notes".to_string()])
        );

        installer.uninstall().unwrap();

        let after: Value =
            serde_json::from_str(&std::fs::read_to_string(host.path().join("mcp.json")).unwrap())
                .unwrap();
        assert_eq!(after["mcpServers"]["brain-notes"], Value::Null);
        assert!(after["mcpServers"]["user-server"].is_object());
        assert!(!host.path().join("agents/🧠-reviewer.md").exists());
        assert!(!installer.store().exists("cursor"));
    }

    #[test]
    fn failed_place_rolls_back_its_partial_writes() {
        let host = TempDir::new().unwrap();
        let (project, installer, _cache) = fixture(host.path(), "");
        std::fs::create_dir_all(project.path().join("templates/protocols")).unwrap();
        std::fs::write(
            project.path().join("templates/protocols/session.md"),
            "Session protocol.\n",
        )
        .unwrap();
        // A plain file where the rules directory belongs makes the rules
        // write fail after the agent file already landed.
        std::fs::write(host.path().join("rules"), "in the way").unwrap();

        let err = installer.install(&CancelToken::new()).unwrap_err();

        assert!(err.to_string().contains("step 'place' failed"));
        assert!(!host.path().join("agents/🧠-reviewer.md").exists());
        assert_eq!(
            std::fs::read_to_string(host.path().join("rules")).unwrap(),
            "in the way"
        );
        assert!(!installer.store().exists("cursor"));
    }

    #[test]
    fn marketplace_uninstall_drops_registry_entry() {
        let host = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        std::fs::create_dir_all(project.path().join("templates/agents")).unwrap();
        std::fs::write(
            project.path().join("templates/agents/reviewer.md"),
            "Review carefully.\n",
        )
        .unwrap();
        std::fs::write(
            project.path().join("brain.config.json"),
            json!({ "agents": { "reviewer": { "cc": {} } } }).to_string(),
        )
        .unwrap();
        let yaml = format!(
            r#"tools:
  cc:
    display_name: Claude Code
    config_dir: {host}
    scopes:
      plugin: {host}/plugins/brain
    default_scope: plugin
    agents:
      frontmatter: [name]
    rules:
      extension: .md
    manifest:
      type: marketplace
    detection:
      brain_installed:
        type: json_key
        file: plugins/known_marketplaces.json
        key: brain
    placement: marketplace
"#,
            host = host.path().display(),
        );
        let target = ToolsConfig::parse(&yaml).unwrap().get("cc").unwrap().clone();
        let cache = TempDir::new().unwrap();
        let installer = ToolInstaller::with_store(
            target,
            TemplateSource::new(project.path()),
            ManifestStore::at(cache.path()),
        );
        // A marketplace the user registered themselves must survive.
        std::fs::create_dir_all(host.path().join("plugins")).unwrap();
        let registry_file = host.path().join("plugins/known_marketplaces.json");
        std::fs::write(
            &registry_file,
            json!({ "other": { "installLocation": "/elsewhere" } }).to_string(),
        )
        .unwrap();

        installer.install(&CancelToken::new()).unwrap();

        let registered: Value =
            serde_json::from_str(&std::fs::read_to_string(&registry_file).unwrap()).unwrap();
        assert!(registered["brain"].is_object());
        let manifest = installer.store().read("cc").unwrap().unwrap();
        assert_eq!(
            manifest.managed.get(&path_string(&registry_file)),
            Some(&vec!["brain".to_string()])
        );

        installer.uninstall().unwrap();

        let after: Value =
            serde_json::from_str(&std::fs::read_to_string(&registry_file).unwrap()).unwrap();
        assert_eq!(after["brain"], Value::Null);
        assert!(after["other"].is_object());
        assert!(!installer.store().exists("cc"));
    }

    #[test]
    fn uninstall_without_manifest_falls_back_to_clean() {
        let host = TempDir::new().unwrap();
        std::fs::create_dir_all(host.path().join("agents")).unwrap();
        std::fs::write(host.path().join("agents/🧠-orphan.md"), "x").unwrap();
        let (_project, installer, _cache) = fixture(host.path(), "");

        installer.uninstall().unwrap();
        assert!(!host.path().join("agents/🧠-orphan.md").exists());
    }

    #[test]
    fn set_scope_rejects_unknown_listing_available() {
        let host = TempDir::new().unwrap();
        let (_project, mut installer, _cache) = fixture(host.path(), "");

        let err = installer.set_scope("galaxy").unwrap_err();
        assert!(err.to_string().contains("unknown scope 'galaxy'"));
        assert!(err.to_string().contains("project"));
        assert_eq!(installer.scope(), "project");
        installer.set_scope("project").unwrap();
    }

    #[test]
    fn cancelled_token_aborts_before_any_write() {
        let host = TempDir::new().unwrap();
        let (_project, installer, _cache) = fixture(host.path(), "");
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = installer.install(&cancel).unwrap_err();
        assert!(err.to_string().contains("cancelled"));
        assert!(!host.path().join("agents").exists());
        assert!(!installer.store().exists("cursor"));
    }

    #[test]
    fn build_failure_leaves_filesystem_untouched() {
        let host = TempDir::new().unwrap();
        let (project, installer, _cache) = fixture(
            host.path(),
            "    hooks:\n      strategy: direct\n      target: hooks.json\n",
        );
        // Direct hooks demand valid JSON from the declared source file.
        std::fs::create_dir_all(project.path().join("templates/hooks")).unwrap();
        std::fs::write(project.path().join("templates/hooks/the-hook.json"), "{ nope").unwrap();
        let brain = json!({
            "agents": { "reviewer": { "cursor": {} } },
            "hooks": { "cursor": { "source": "hooks/the-hook.json" } }
        });
        std::fs::write(project.path().join("brain.config.json"), brain.to_string()).unwrap();

        let err = installer.install(&CancelToken::new()).unwrap_err();
        assert!(err.to_string().contains("step 'build' failed"));
        assert!(!host.path().join("agents").exists());
        assert!(!installer.store().exists("cursor"));
    }

    #[test]
    fn is_tool_installed_checks_config_dir() {
        let host = TempDir::new().unwrap();
        let (_project, installer, _cache) = fixture(host.path(), "");
        assert!(installer.is_tool_installed());

        let gone = TempDir::new().unwrap();
        let missing = gone.path().join("never");
        let (_project2, installer2, _cache2) = fixture(&missing, "");
        assert!(!installer2.is_tool_installed());
    }

    #[test]
    fn json_key_detection_reads_config_dir_file() {
        let host = TempDir::new().unwrap();
        let (_project, installer, _cache) = fixture(
            host.path(),
            "", // prefix_scan variant from the fixture is replaced below
        );
        let mut target = installer.target().clone();
        target.detection.brain_installed = Detection::JsonKey {
            file: "known.json".to_string(),
            key: "brain.installLocation".to_string(),
        };
        let installer = ToolInstaller::with_store(
            target,
            TemplateSource::new(host.path()),
            ManifestStore::at(host.path().join("cache")),
        );

        assert!(!installer.is_brain_installed());
        std::fs::write(
            host.path().join("known.json"),
            json!({ "brain": { "installLocation": "/x" } }).to_string(),
        )
        .unwrap();
        assert!(installer.is_brain_installed());
    }

    #[test]
    fn remove_managed_keys_deletes_emptied_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("hooks.json");
        std::fs::write(
            &file,
            json!({ "hooks": { "preCommit": ["run.sh"] } }).to_string(),
        )
        .unwrap();

        remove_managed_keys(&file, &["hooks.preCommit".to_string()]);
        assert!(!file.exists());
    }
}
