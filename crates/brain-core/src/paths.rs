use crate::error::{BrainError, Result};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Template-source layout
// ---------------------------------------------------------------------------

pub const TEMPLATES_DIR: &str = "templates";
pub const BRAIN_CONFIG_FILE: &str = "brain.config.json";
pub const TOOLS_CONFIG_FILE: &str = "tools.yaml";

pub const AGENTS_DIR: &str = "agents";
pub const SKILLS_DIR: &str = "skills";
pub const COMMANDS_DIR: &str = "commands";
pub const PROTOCOLS_DIR: &str = "protocols";
pub const HOOKS_DIR: &str = "hooks";
pub const HOOK_SCRIPTS_DIR: &str = "hooks/scripts";
pub const RULES_DIR: &str = "rules";
pub const MCP_CONFIG_FILE: &str = "configs/mcp.json";

pub const ORDER_FILE: &str = "_order.yaml";

// ---------------------------------------------------------------------------
// Host-side layout
// ---------------------------------------------------------------------------

pub const MARKETPLACE_KEY: &str = "brain";
pub const KNOWN_MARKETPLACES_FILE: &str = "plugins/known_marketplaces.json";
pub const PLUGIN_MANIFEST_DIR: &str = ".claude-plugin";
pub const DEFAULT_INSTRUCTIONS_PATH: &str = "AGENTS.md";

// ---------------------------------------------------------------------------
// Home / cache resolution
// ---------------------------------------------------------------------------

/// Expand a leading `~` against the user's home directory.
/// Paths with no `~` pass through untouched.
pub fn expand_tilde(path: &str) -> Result<PathBuf> {
    if path == "~" {
        return home_dir();
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return Ok(home_dir()?.join(rest));
    }
    Ok(PathBuf::from(path))
}

pub fn home_dir() -> Result<PathBuf> {
    home::home_dir().ok_or(BrainError::HomeNotFound)
}

/// Per-user cache directory for Brain state.
///
/// `$XDG_CACHE_HOME/brain` when set, `~/.cache/brain` otherwise — including
/// on macOS, where `~/Library/Caches` is deliberately not used so manifests
/// stay in the same place across platforms.
pub fn cache_dir() -> Result<PathBuf> {
    cache_dir_from(std::env::var_os("XDG_CACHE_HOME"))
}

fn cache_dir_from(xdg: Option<std::ffi::OsString>) -> Result<PathBuf> {
    if let Some(xdg) = xdg {
        if !xdg.is_empty() {
            return Ok(PathBuf::from(xdg).join("brain"));
        }
    }
    Ok(home_dir()?.join(".cache").join("brain"))
}

/// Normalize a path to a relative, forward-slash string for
/// cross-platform-deterministic bundle paths.
pub fn to_slash_relative(path: &Path, base: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_tilde_passthrough() {
        assert_eq!(
            expand_tilde("/abs/path").unwrap(),
            PathBuf::from("/abs/path")
        );
        assert_eq!(expand_tilde("rel/path").unwrap(), PathBuf::from("rel/path"));
    }

    #[test]
    fn expand_tilde_joins_home() {
        let expanded = expand_tilde("~/.cursor").unwrap();
        assert!(expanded.is_absolute());
        assert!(expanded.ends_with(".cursor"));
    }

    #[test]
    fn cache_dir_honors_xdg() {
        let dir = cache_dir_from(Some("/tmp/xdg-test".into())).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/xdg-test/brain"));
    }

    #[test]
    fn cache_dir_falls_back_when_xdg_unset_or_empty() {
        let unset = cache_dir_from(None).unwrap();
        assert!(unset.ends_with(".cache/brain"));
        let empty = cache_dir_from(Some(std::ffi::OsString::new())).unwrap();
        assert_eq!(empty, unset);
    }

    #[test]
    fn slash_relative_normalizes() {
        let base = Path::new("/root/project");
        let path = Path::new("/root/project/templates/agents/a.md");
        assert_eq!(
            to_slash_relative(path, base).unwrap(),
            "templates/agents/a.md"
        );
    }
}
