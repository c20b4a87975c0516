use crate::brain_config::{AgentTargetConfig, BrainConfig};
use crate::bundle::GeneratedFile;
use crate::compose::{self, compose};
use crate::error::Result;
use crate::frontmatter::{parse_frontmatter, with_frontmatter};
use crate::paths::{AGENTS_DIR, ORDER_FILE};
use crate::prefix::maybe_prefix;
use crate::source::TemplateSource;
use crate::tools_config::Target;
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Agents phase: composable directories first, then single-file agents.
pub fn build(
    src: &TemplateSource,
    target: &Target,
    brain: &BrainConfig,
) -> Result<Vec<GeneratedFile>> {
    let prefix_on = target.should_prefix(brain);
    let entries = src.read_dir(AGENTS_DIR)?;
    let mut files = Vec::new();
    let mut composed: BTreeSet<String> = BTreeSet::new();

    // Pass 1: composable directories.
    for entry in entries.iter().filter(|e| e.is_dir) {
        let rel = format!("{AGENTS_DIR}/{}", entry.name);
        if !src.exists(&format!("{rel}/{ORDER_FILE}")) {
            continue;
        }
        composed.insert(entry.name.clone());

        // Composable agents must be declared in brain.config.json and
        // offered (non-null) for this target.
        let Some(per_target) = brain.agent_for(&entry.name, &target.name) else {
            continue;
        };
        let Some(record) = per_target else {
            continue;
        };

        let body = compose(src, &rel, &target.name, &BTreeMap::new())?;
        let base = variant_frontmatter(src, &rel, &target.name)?;
        let name = maybe_prefix(&entry.name, prefix_on);
        let fm = build_frontmatter(&target.agents.frontmatter, &base, Some(record), &name);
        files.push(GeneratedFile::new(
            format!("agents/{name}.md"),
            with_frontmatter(&fm, &body)?,
        ));
    }

    // Pass 2: single-file agents.
    for entry in entries.iter().filter(|e| !e.is_dir) {
        let Some(slug) = entry.name.strip_suffix(".md") else {
            continue;
        };
        if composed.contains(slug) {
            continue;
        }
        let record = match brain.agent_for(slug, &target.name) {
            // Explicitly not offered for this target.
            Some(None) => continue,
            Some(Some(record)) => Some(record),
            None => None,
        };
        let raw = src.read_file(&format!("{AGENTS_DIR}/{}", entry.name))?;
        let (base, body) = parse_frontmatter(&raw);
        let name = maybe_prefix(slug, prefix_on);
        let fm = build_frontmatter(&target.agents.frontmatter, &base, record, &name);
        files.push(GeneratedFile::new(
            format!("agents/{name}.md"),
            with_frontmatter(&fm, &body)?,
        ));
    }

    Ok(files)
}

/// Base frontmatter from a variant's declared frontmatter file, if any.
fn variant_frontmatter(
    src: &TemplateSource,
    rel_dir: &str,
    variant: &str,
) -> Result<Mapping> {
    let order = compose::load_order(src, rel_dir)?;
    let Some(file) = order.variant(variant).frontmatter else {
        return Ok(Mapping::new());
    };
    let rel = format!("{rel_dir}/{file}");
    if !src.exists(&rel) {
        return Ok(Mapping::new());
    }
    match serde_yaml::from_str::<Value>(&src.read_file(&rel)?) {
        Ok(Value::Mapping(map)) => Ok(map),
        _ => Ok(Mapping::new()),
    }
}

/// Assemble frontmatter in the target's declared field order. `name` is
/// always set; every other field comes from the brain-config record first,
/// the base map second, and is dropped when absent. Fields outside the
/// allow-list never survive.
fn build_frontmatter(
    allowed: &[String],
    base: &Mapping,
    record: Option<&AgentTargetConfig>,
    name: &str,
) -> Mapping {
    let mut fm = Mapping::new();
    fm.insert("name".into(), Value::String(name.to_string()));
    for field in allowed {
        if field == "name" {
            continue;
        }
        let value = record
            .and_then(|r| r.field(field))
            .or_else(|| base.get(Value::String(field.clone())).cloned());
        if let Some(value) = value {
            fm.insert(Value::String(field.clone()), value);
        }
    }
    fm
}
