use crate::brain_config::BrainConfig;
use crate::bundle::GeneratedFile;
use crate::compose::compose;
use crate::error::Result;
use crate::paths::{COMMANDS_DIR, ORDER_FILE};
use crate::prefix::maybe_prefix;
use crate::source::TemplateSource;
use crate::tools_config::Target;
use std::collections::{BTreeMap, BTreeSet};

/// Commands phase. Mirrors agents — composable directories first, then
/// single files — but frontmatter rules do not apply: content is copied
/// as-is, only the filename is prefixed.
pub fn build(
    src: &TemplateSource,
    target: &Target,
    brain: &BrainConfig,
) -> Result<Vec<GeneratedFile>> {
    let prefix_on = target.should_prefix(brain);
    let entries = src.read_dir(COMMANDS_DIR)?;
    let mut files = Vec::new();
    let mut composed: BTreeSet<String> = BTreeSet::new();

    for entry in entries.iter().filter(|e| e.is_dir) {
        let rel = format!("{COMMANDS_DIR}/{}", entry.name);
        if !src.exists(&format!("{rel}/{ORDER_FILE}")) {
            continue;
        }
        composed.insert(entry.name.clone());
        let body = compose(src, &rel, &target.name, &BTreeMap::new())?;
        let name = maybe_prefix(&entry.name, prefix_on);
        files.push(GeneratedFile::new(format!("commands/{name}.md"), body));
    }

    for entry in entries.iter().filter(|e| !e.is_dir) {
        let Some(slug) = entry.name.strip_suffix(".md") else {
            continue;
        };
        if composed.contains(slug) {
            continue;
        }
        let content = src.read_file(&format!("{COMMANDS_DIR}/{}", entry.name))?;
        let name = maybe_prefix(slug, prefix_on);
        files.push(GeneratedFile::new(format!("commands/{name}.md"), content));
    }

    Ok(files)
}
