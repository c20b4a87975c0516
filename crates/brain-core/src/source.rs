use crate::error::{BrainError, Result};
use crate::paths;
use std::fs::Metadata;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// TemplateSource
// ---------------------------------------------------------------------------

/// Read-only view of a Brain project's template tree.
///
/// All relative paths resolve under `<project_root>/templates/`, with the
/// single exception of `brain.config.json`, which lives at the project root.
/// Recursive walks skip `node_modules` and `.git`; `.DS_Store` and
/// `.gitkeep` entries are never reported.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    project_root: PathBuf,
}

/// Directory entry reported by [`TemplateSource::read_dir`].
#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub name: String,
    pub is_dir: bool,
}

const SKIP_DIRS: [&str; 2] = ["node_modules", ".git"];
const SKIP_FILES: [&str; 2] = [".DS_Store", ".gitkeep"];

impl TemplateSource {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.project_root.join(paths::TEMPLATES_DIR)
    }

    /// Resolve a relative template path to an absolute one.
    /// `brain.config.json` resolves against the project root.
    fn resolve(&self, relpath: &str) -> Result<PathBuf> {
        if relpath.split('/').any(|part| part == "..") {
            return Err(BrainError::PathEscape(relpath.to_string()));
        }
        if relpath == paths::BRAIN_CONFIG_FILE {
            return Ok(self.project_root.join(relpath));
        }
        if relpath == paths::TOOLS_CONFIG_FILE {
            return Ok(self.project_root.join(relpath));
        }
        Ok(self.templates_dir().join(relpath))
    }

    pub fn read_file(&self, relpath: &str) -> Result<String> {
        let path = self.resolve(relpath)?;
        if path.is_dir() {
            return Err(BrainError::NotAFile(relpath.to_string()));
        }
        Ok(std::fs::read_to_string(path)?)
    }

    pub fn read_bytes(&self, relpath: &str) -> Result<Vec<u8>> {
        let path = self.resolve(relpath)?;
        if path.is_dir() {
            return Err(BrainError::NotAFile(relpath.to_string()));
        }
        Ok(std::fs::read(path)?)
    }

    pub fn stat(&self, relpath: &str) -> Result<Metadata> {
        let path = self.resolve(relpath)?;
        Ok(std::fs::metadata(path)?)
    }

    pub fn exists(&self, relpath: &str) -> bool {
        self.resolve(relpath).map(|p| p.exists()).unwrap_or(false)
    }

    pub fn is_dir(&self, relpath: &str) -> bool {
        self.resolve(relpath).map(|p| p.is_dir()).unwrap_or(false)
    }

    /// List a directory, sorted by name. Ignored entries are filtered out.
    /// A missing directory yields an empty list, not an error.
    pub fn read_dir(&self, relpath: &str) -> Result<Vec<SourceEntry>> {
        let path = self.resolve(relpath)?;
        if !path.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.file_type()?.is_dir();
            if is_dir && SKIP_DIRS.contains(&name.as_str()) {
                continue;
            }
            if !is_dir && SKIP_FILES.contains(&name.as_str()) {
                continue;
            }
            entries.push(SourceEntry { name, is_dir });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Walk a directory tree depth-first, invoking `visit` with each file's
    /// path relative to `relpath` (forward slashes, sorted within each
    /// directory). A missing root yields no visits.
    pub fn walk_dir(
        &self,
        relpath: &str,
        visit: &mut dyn FnMut(&str) -> Result<()>,
    ) -> Result<()> {
        fn recurse(
            src: &TemplateSource,
            base: &str,
            dir: &str,
            visit: &mut dyn FnMut(&str) -> Result<()>,
        ) -> Result<()> {
            for entry in src.read_dir(dir)? {
                let child = format!("{dir}/{}", entry.name);
                if entry.is_dir {
                    recurse(src, base, &child, visit)?;
                } else {
                    // Report relative to the walk root.
                    let rel = child
                        .strip_prefix(base)
                        .and_then(|s| s.strip_prefix('/'))
                        .unwrap_or(&child);
                    visit(rel)?;
                }
            }
            Ok(())
        }
        recurse(self, relpath, relpath, visit)
    }
}
