//! Build phases: per-artifact-kind transforms from the template source into
//! an in-memory [`BuildOutput`] bundle. Phases never touch the target
//! filesystem; placement does that.

mod agents;
mod commands;
mod hooks;
mod mcp;
mod plugin;
mod rules;
mod skills;

use crate::brain_config::BrainConfig;
use crate::bundle::BuildOutput;
use crate::error::{BrainError, Result};
use crate::source::TemplateSource;
use crate::tools_config::Target;

pub use plugin::{PLUGIN_NAME, PLUGIN_VERSION};

/// Run the seven phases in fixed order. The first phase error aborts the
/// build, wrapped with the phase name; nothing has been written to disk at
/// that point.
pub fn build_all(
    src: &TemplateSource,
    target: &Target,
    brain: &BrainConfig,
) -> Result<BuildOutput> {
    Ok(BuildOutput {
        agents: run("agents", agents::build(src, target, brain))?,
        skills: run("skills", skills::build(src, target, brain))?,
        commands: run("commands", commands::build(src, target, brain))?,
        rules: run("rules", rules::build(src, target, brain))?,
        hooks: run("hooks", hooks::build(src, target, brain))?,
        mcp: run("mcp", mcp::build(src, target))?,
        plugin: plugin::build(target),
    })
}

fn run<T>(phase: &'static str, result: Result<T>) -> Result<T> {
    result.map_err(|e| BrainError::Phase {
        phase,
        source: Box::new(e),
    })
}

/// `<dir>/<stem>.<ext>` → `<dir>/<stem>.merge.json`: the sibling path used
/// for merge-strategy payload files.
pub(crate) fn merge_sibling(path: &str) -> String {
    let (dir, file) = match path.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, path),
    };
    let stem = match file.rsplit_once('.') {
        Some((stem, _ext)) => stem,
        None => file,
    };
    match dir {
        Some(dir) => format!("{dir}/{stem}.merge.json"),
        None => format!("{stem}.merge.json"),
    }
}
