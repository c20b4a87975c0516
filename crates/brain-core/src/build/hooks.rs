use super::merge_sibling;
use crate::brain_config::BrainConfig;
use crate::bundle::{GeneratedFile, MergePayload};
use crate::error::Result;
use crate::merge::pretty_json;
use crate::paths::{HOOKS_DIR, HOOK_SCRIPTS_DIR};
use crate::source::TemplateSource;
use crate::tools_config::{ShareStrategy, Target};

/// Hooks phase, dispatching on the target's hook strategy.
pub fn build(
    src: &TemplateSource,
    target: &Target,
    brain: &BrainConfig,
) -> Result<Vec<GeneratedFile>> {
    let mut files = Vec::new();
    match target.hooks.strategy {
        ShareStrategy::None => return Ok(files),
        ShareStrategy::Direct => {
            if let Some(hook) = brain.hook_source(&target.name) {
                if src.exists(&hook.source) {
                    let raw = src.read_file(&hook.source)?;
                    // Invalid JSON in a direct hook file is fatal.
                    serde_json::from_str::<serde_json::Value>(&raw)?;
                    files.push(GeneratedFile::new(target.hooks.target.clone(), raw));
                }
            }
        }
        ShareStrategy::Merge => {
            let rel = format!("{HOOKS_DIR}/{}.json", target.name);
            if src.exists(&rel) {
                let raw = src.read_file(&rel)?;
                let content: serde_json::Value = serde_json::from_str(&raw)?;
                let managed_keys = content
                    .get("hooks")
                    .and_then(|h| h.as_object())
                    .map(|events| {
                        events.keys().map(|event| format!("hooks.{event}")).collect()
                    })
                    .unwrap_or_default();
                let payload = MergePayload {
                    managed_keys,
                    content,
                };
                files.push(GeneratedFile::new(
                    merge_sibling(&target.hooks.target),
                    pretty_json(&serde_json::to_value(&payload)?)?,
                ));
            }
        }
    }

    // Hook scripts ship for both direct and merge strategies. The scan is
    // non-recursive.
    for entry in src.read_dir(HOOK_SCRIPTS_DIR)? {
        if entry.is_dir {
            continue;
        }
        files.push(GeneratedFile::new(
            format!("hooks/scripts/{}", entry.name),
            src.read_file(&format!("{HOOK_SCRIPTS_DIR}/{}", entry.name))?,
        ));
    }

    Ok(files)
}
