use crate::brain_config::BrainConfig;
use crate::error::{BrainError, Result};
use crate::paths::{DEFAULT_INSTRUCTIONS_PATH, TOOLS_CONFIG_FILE};
use crate::source::TemplateSource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Closed set of frontmatter fields a target may allow-list for agents.
pub const AGENT_FRONTMATTER_FIELDS: [&str; 8] = [
    "name",
    "model",
    "description",
    "memory",
    "color",
    "argument-hint",
    "tools",
    "skills",
];

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShareStrategy {
    Direct,
    Merge,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestType {
    Marketplace,
    FileList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementKind {
    Marketplace,
    CopyAndMerge,
}

/// How to decide whether Brain is already installed for a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Detection {
    /// A dotted key exists in a JSON file under `config_dir`.
    JsonKey { file: String, key: String },
    /// Any file carrying the Brain prefix exists in one of the listed
    /// directories (relative to the active scope, non-recursive).
    PrefixScan { dirs: Vec<String> },
}

// ---------------------------------------------------------------------------
// Target record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    /// Filled from the `tools:` map key, not from the record body.
    #[serde(skip)]
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub prefix: bool,
    pub config_dir: String,
    pub scopes: BTreeMap<String, String>,
    pub default_scope: String,
    #[serde(default)]
    pub agents: AgentRules,
    pub rules: RuleRules,
    #[serde(default)]
    pub hooks: ShareSpec,
    #[serde(default)]
    pub mcp: ShareSpec,
    pub manifest: ManifestSpec,
    pub detection: DetectionSpec,
    pub placement: PlacementKind,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentRules {
    #[serde(default)]
    pub frontmatter: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleRules {
    pub extension: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_frontmatter: BTreeMap<String, serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub routing: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions_path: Option<String>,
}

impl RuleRules {
    pub fn instructions_path(&self) -> &str {
        self.instructions_path
            .as_deref()
            .unwrap_or(DEFAULT_INSTRUCTIONS_PATH)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareSpec {
    #[serde(default)]
    pub strategy: ShareStrategy,
    #[serde(default)]
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestSpec {
    #[serde(rename = "type")]
    pub kind: ManifestType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSpec {
    pub brain_installed: Detection,
}

impl Target {
    /// Effective prefix flag: the brain.config.json per-target override
    /// wins when present, otherwise the target record decides.
    pub fn should_prefix(&self, brain: &BrainConfig) -> bool {
        brain.should_prefix(&self.name).unwrap_or(self.prefix)
    }

    fn validate(&self, errors: &mut Vec<String>) {
        let name = &self.name;
        if self.display_name.trim().is_empty() {
            errors.push(format!("{name}: display_name must not be empty"));
        }
        if self.config_dir.trim().is_empty() {
            errors.push(format!("{name}: config_dir must not be empty"));
        }
        if self.scopes.is_empty() {
            errors.push(format!("{name}: scopes must not be empty"));
        }
        if !self.scopes.contains_key(&self.default_scope) {
            errors.push(format!(
                "{name}: default_scope '{}' is not a declared scope",
                self.default_scope
            ));
        }
        if self.agents.frontmatter.is_empty() {
            errors.push(format!("{name}: agents.frontmatter must not be empty"));
        }
        for field in &self.agents.frontmatter {
            if !AGENT_FRONTMATTER_FIELDS.contains(&field.as_str()) {
                errors.push(format!(
                    "{name}: unknown agent frontmatter field '{field}'"
                ));
            }
        }
        if !self.rules.extension.starts_with('.') {
            errors.push(format!(
                "{name}: rules.extension '{}' must start with '.'",
                self.rules.extension
            ));
        }
        for spec in [("hooks", &self.hooks), ("mcp", &self.mcp)] {
            let (label, share) = spec;
            if share.strategy != ShareStrategy::None && share.target.trim().is_empty() {
                errors.push(format!(
                    "{name}: {label}.target is required for strategy '{}'",
                    match share.strategy {
                        ShareStrategy::Direct => "direct",
                        ShareStrategy::Merge => "merge",
                        ShareStrategy::None => "none",
                    }
                ));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ToolsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub tools: BTreeMap<String, Target>,
}

impl ToolsConfig {
    /// Parse a `tools.yaml` document and validate every target. Validation
    /// failures across all targets are aggregated into a single error, one
    /// line per failure.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut cfg: ToolsConfig = serde_yaml::from_str(raw)?;
        let mut errors = Vec::new();
        for (name, target) in &mut cfg.tools {
            target.name = name.clone();
            target.validate(&mut errors);
        }
        if !errors.is_empty() {
            return Err(BrainError::Config(errors.join("\n")));
        }
        Ok(cfg)
    }

    /// Load `tools.yaml` from the template source's project root.
    pub fn load(src: &TemplateSource) -> Result<Self> {
        Self::parse(&src.read_file(TOOLS_CONFIG_FILE)?)
    }

    pub fn get(&self, name: &str) -> Option<&Target> {
        self.tools.get(name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TOOLS_YAML: &str = r#"tools:
  cc:
    display_name: Claude Code
    prefix: false
    config_dir: "~/.claude"
    scopes:
      plugin: "~/.claude/plugins/brain"
    default_scope: plugin
    agents:
      frontmatter: [name, model, description, tools, skills]
    rules:
      extension: ".md"
    hooks:
      strategy: direct
      target: hooks/hooks.json
    mcp:
      strategy: direct
      target: mcp.json
    manifest:
      type: marketplace
    detection:
      brain_installed:
        type: json_key
        file: plugins/known_marketplaces.json
        key: brain
    placement: marketplace
  cursor:
    display_name: Cursor
    prefix: true
    config_dir: "~/.cursor"
    scopes:
      global: "~/.cursor"
      project: ".cursor"
    default_scope: global
    agents:
      frontmatter: [name, description]
    rules:
      extension: ".mdc"
      extra_frontmatter:
        alwaysApply: true
      routing:
        session.md: instructions
      instructions_path: AGENTS.md
    hooks:
      strategy: merge
      target: hooks.json
    mcp:
      strategy: merge
      target: mcp.json
    manifest:
      type: file_list
    detection:
      brain_installed:
        type: prefix_scan
        dirs: [rules, agents]
    placement: copy_and_merge
"#;

    #[test]
    fn parses_two_targets_and_fills_names() {
        let cfg = ToolsConfig::parse(TOOLS_YAML).unwrap();
        assert_eq!(cfg.tools.len(), 2);
        assert_eq!(cfg.get("cc").unwrap().name, "cc");
        assert_eq!(cfg.get("cursor").unwrap().name, "cursor");
        assert_eq!(cfg.get("cc").unwrap().placement, PlacementKind::Marketplace);
        assert_eq!(
            cfg.get("cursor").unwrap().hooks.strategy,
            ShareStrategy::Merge
        );
    }

    #[test]
    fn detection_variants_parse() {
        let cfg = ToolsConfig::parse(TOOLS_YAML).unwrap();
        assert!(matches!(
            cfg.get("cc").unwrap().detection.brain_installed,
            Detection::JsonKey { .. }
        ));
        assert!(matches!(
            cfg.get("cursor").unwrap().detection.brain_installed,
            Detection::PrefixScan { .. }
        ));
    }

    #[test]
    fn validation_aggregates_across_targets() {
        let bad = r#"tools:
  one:
    display_name: ""
    config_dir: "~/.one"
    scopes:
      global: "~/.one"
    default_scope: missing
    agents:
      frontmatter: []
    rules:
      extension: "md"
    manifest:
      type: file_list
    detection:
      brain_installed:
        type: prefix_scan
        dirs: [rules]
    placement: copy_and_merge
  two:
    display_name: Two
    config_dir: "~/.two"
    scopes:
      global: "~/.two"
    default_scope: global
    agents:
      frontmatter: [name, bogus]
    rules:
      extension: ".md"
    hooks:
      strategy: merge
    manifest:
      type: file_list
    detection:
      brain_installed:
        type: prefix_scan
        dirs: [rules]
    placement: copy_and_merge
"#;
        let err = ToolsConfig::parse(bad).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("one: display_name must not be empty"));
        assert!(text.contains("one: default_scope 'missing'"));
        assert!(text.contains("one: agents.frontmatter must not be empty"));
        assert!(text.contains("one: rules.extension 'md'"));
        assert!(text.contains("two: unknown agent frontmatter field 'bogus'"));
        assert!(text.contains("two: hooks.target is required"));
    }

    #[test]
    fn invalid_strategy_is_a_parse_error() {
        let bad = TOOLS_YAML.replace("strategy: merge", "strategy: sideways");
        assert!(ToolsConfig::parse(&bad).is_err());
    }

    #[test]
    fn brain_config_prefix_override_wins() {
        let cfg = ToolsConfig::parse(TOOLS_YAML).unwrap();
        let brain: BrainConfig = serde_json::from_str(
            r#"{ "targets": { "cursor": { "prefix": false } } }"#,
        )
        .unwrap();
        assert!(!cfg.get("cursor").unwrap().should_prefix(&brain));
        // No override for cc: the record's own flag decides.
        assert!(!cfg.get("cc").unwrap().should_prefix(&brain));
    }

    #[test]
    fn instructions_path_defaults_to_agents_md() {
        let cfg = ToolsConfig::parse(TOOLS_YAML).unwrap();
        assert_eq!(cfg.get("cc").unwrap().rules.instructions_path(), "AGENTS.md");
        assert_eq!(
            cfg.get("cursor").unwrap().rules.instructions_path(),
            "AGENTS.md"
        );
    }
}
