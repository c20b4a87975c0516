use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GeneratedFile
// ---------------------------------------------------------------------------

/// One target-relative file produced by a build phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub relative_path: String,
    pub content: String,
}

impl GeneratedFile {
    pub fn new(relative_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// BuildOutput
// ---------------------------------------------------------------------------

/// The in-memory bundle produced by one `build_all` run: seven named groups
/// of generated files, in phase order. Produced, placed, and discarded
/// within a single install.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub agents: Vec<GeneratedFile>,
    pub skills: Vec<GeneratedFile>,
    pub commands: Vec<GeneratedFile>,
    pub rules: Vec<GeneratedFile>,
    pub hooks: Vec<GeneratedFile>,
    pub mcp: Vec<GeneratedFile>,
    pub plugin: Vec<GeneratedFile>,
}

impl BuildOutput {
    /// Every generated file in phase order.
    pub fn all_files(&self) -> Vec<&GeneratedFile> {
        self.agents
            .iter()
            .chain(self.skills.iter())
            .chain(self.commands.iter())
            .chain(self.rules.iter())
            .chain(self.hooks.iter())
            .chain(self.mcp.iter())
            .chain(self.plugin.iter())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.all_files().is_empty()
    }

    pub fn len(&self) -> usize {
        self.all_files().len()
    }
}

// ---------------------------------------------------------------------------
// MergePayload
// ---------------------------------------------------------------------------

/// Wrapper for JSON content that must be merged into an existing user file
/// instead of written verbatim. A placement strategy that receives a file
/// whose content parses as this shape applies RFC 7396; any other content
/// is written as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MergePayload {
    pub managed_keys: Vec<String>,
    pub content: serde_json::Value,
}

impl MergePayload {
    /// Try to read `content` as a merge payload. Anything that does not
    /// match the exact shape falls through to `None`.
    pub fn parse(content: &str) -> Option<Self> {
        serde_json::from_str(content).ok()
    }
}
