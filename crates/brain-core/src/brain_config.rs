use crate::error::Result;
use crate::paths::BRAIN_CONFIG_FILE;
use crate::source::TemplateSource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// BrainConfig
// ---------------------------------------------------------------------------

/// Project-level configuration parsed from `brain.config.json`.
///
/// Per-target agent records use `null` to mean "this agent is not offered
/// for that target", which is why the inner value is `Option`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrainConfig {
    #[serde(default)]
    pub targets: BTreeMap<String, TargetKnobs>,
    #[serde(default)]
    pub agents: BTreeMap<String, BTreeMap<String, Option<AgentTargetConfig>>>,
    #[serde(default)]
    pub hooks: BTreeMap<String, HookSource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetKnobs {
    #[serde(default)]
    pub prefix: Option<bool>,
}

/// Per-target agent frontmatter knobs. Every field is optional; absent
/// fields are dropped from the generated frontmatter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentTargetConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(
        default,
        rename = "argument-hint",
        skip_serializing_if = "Option::is_none"
    )]
    pub argument_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
}

/// Location of a target's hook definitions under `templates/`, used by the
/// `direct` hooks strategy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookSource {
    pub source: String,
}

impl BrainConfig {
    pub fn load(src: &TemplateSource) -> Result<Self> {
        if !src.exists(BRAIN_CONFIG_FILE) {
            return Ok(Self::default());
        }
        let raw = src.read_file(BRAIN_CONFIG_FILE)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Per-target prefix override; `None` when the config does not say.
    pub fn should_prefix(&self, target: &str) -> Option<bool> {
        self.targets.get(target).and_then(|knobs| knobs.prefix)
    }

    /// The per-target record for one agent.
    ///
    /// `None` means "no opinion" (the agent has no entry, or no entry for
    /// this target); `Some(None)` means the agent is explicitly not offered
    /// for this target.
    pub fn agent_for(
        &self,
        agent: &str,
        target: &str,
    ) -> Option<&Option<AgentTargetConfig>> {
        self.agents.get(agent).and_then(|per| per.get(target))
    }

    pub fn hook_source(&self, target: &str) -> Option<&HookSource> {
        self.hooks.get(target)
    }
}

impl AgentTargetConfig {
    /// The value for one allow-listed frontmatter field, if present.
    pub fn field(&self, name: &str) -> Option<serde_yaml::Value> {
        let scalar = |opt: &Option<String>| {
            opt.as_ref()
                .map(|s| serde_yaml::Value::String(s.clone()))
        };
        let list = |items: &Vec<String>| {
            if items.is_empty() {
                None
            } else {
                Some(serde_yaml::Value::Sequence(
                    items
                        .iter()
                        .map(|s| serde_yaml::Value::String(s.clone()))
                        .collect(),
                ))
            }
        };
        match name {
            "model" => scalar(&self.model),
            "description" => scalar(&self.description),
            "memory" => scalar(&self.memory),
            "color" => scalar(&self.color),
            "argument-hint" => scalar(&self.argument_hint),
            "tools" => list(&self.tools),
            "skills" => list(&self.skills),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONFIG: &str = r#"{
  "targets": { "cursor": { "prefix": true } },
  "agents": {
    "architect": {
      "cc": { "model": "opus", "tools": ["Read", "Write"] },
      "cursor": null
    }
  },
  "hooks": {
    "cc": { "source": "hooks/cc.json" }
  }
}"#;

    fn source_with_config() -> (TempDir, TemplateSource) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("templates")).unwrap();
        std::fs::write(dir.path().join("brain.config.json"), CONFIG).unwrap();
        let src = TemplateSource::new(dir.path());
        (dir, src)
    }

    #[test]
    fn loads_and_answers_queries() {
        let (_dir, src) = source_with_config();
        let cfg = BrainConfig::load(&src).unwrap();
        assert_eq!(cfg.should_prefix("cursor"), Some(true));
        assert_eq!(cfg.should_prefix("cc"), None);

        let offered = cfg.agent_for("architect", "cc").unwrap();
        assert!(offered.is_some());
        let withheld = cfg.agent_for("architect", "cursor").unwrap();
        assert!(withheld.is_none());
        assert!(cfg.agent_for("architect", "zed").is_none());

        assert_eq!(cfg.hook_source("cc").unwrap().source, "hooks/cc.json");
    }

    #[test]
    fn missing_config_is_default() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("templates")).unwrap();
        let cfg = BrainConfig::load(&TemplateSource::new(dir.path())).unwrap();
        assert!(cfg.agents.is_empty());
    }

    #[test]
    fn field_lookup_covers_lists_and_hyphenated_names() {
        let record: AgentTargetConfig = serde_json::from_str(
            r#"{ "model": "opus", "argument-hint": "<slug>", "tools": ["Read"] }"#,
        )
        .unwrap();
        assert_eq!(
            record.field("model"),
            Some(serde_yaml::Value::String("opus".into()))
        );
        assert_eq!(
            record.field("argument-hint"),
            Some(serde_yaml::Value::String("<slug>".into()))
        );
        assert!(matches!(
            record.field("tools"),
            Some(serde_yaml::Value::Sequence(_))
        ));
        assert_eq!(record.field("skills"), None);
        assert_eq!(record.field("name"), None);
    }
}
