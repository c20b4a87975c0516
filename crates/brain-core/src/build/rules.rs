use crate::brain_config::BrainConfig;
use crate::bundle::GeneratedFile;
use crate::compose::compose;
use crate::error::Result;
use crate::frontmatter::with_frontmatter;
use crate::paths::{ORDER_FILE, PROTOCOLS_DIR, RULES_DIR};
use crate::prefix::maybe_prefix;
use crate::source::TemplateSource;
use crate::tools_config::Target;
use std::collections::BTreeMap;

/// Rules phase: every protocol becomes a rule file with the target's
/// extension, unless routed to an alternate directory. An optional
/// composable `rules/` directory additionally yields the aggregate
/// instructions document.
pub fn build(
    src: &TemplateSource,
    target: &Target,
    brain: &BrainConfig,
) -> Result<Vec<GeneratedFile>> {
    let prefix_on = target.should_prefix(brain);
    let mut files = Vec::new();

    for entry in src.read_dir(PROTOCOLS_DIR)? {
        if entry.is_dir {
            continue;
        }
        let Some(stem) = entry.name.strip_suffix(".md") else {
            continue;
        };
        let content = src.read_file(&format!("{PROTOCOLS_DIR}/{}", entry.name))?;

        // Routed protocols bypass renaming and frontmatter entirely.
        if let Some(alt_dir) = target.rules.routing.get(&entry.name) {
            files.push(GeneratedFile::new(
                format!("{alt_dir}/{}", entry.name),
                content,
            ));
            continue;
        }

        let stem = maybe_prefix(stem, prefix_on);
        let out = format!("rules/{stem}{}", target.rules.extension);
        if target.rules.extra_frontmatter.is_empty() {
            files.push(GeneratedFile::new(out, content));
        } else {
            let mut fm = serde_yaml::Mapping::new();
            for (key, value) in &target.rules.extra_frontmatter {
                fm.insert(
                    serde_yaml::Value::String(key.clone()),
                    value.clone(),
                );
            }
            files.push(GeneratedFile::new(out, with_frontmatter(&fm, &content)?));
        }
    }

    // Composed aggregate instructions document.
    if src.exists(&format!("{RULES_DIR}/{ORDER_FILE}")) {
        let body = compose(src, RULES_DIR, &target.name, &BTreeMap::new())?;
        files.push(GeneratedFile::new(
            target.rules.instructions_path().to_string(),
            body,
        ));
    }

    Ok(files)
}
