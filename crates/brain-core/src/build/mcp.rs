use super::merge_sibling;
use crate::bundle::{GeneratedFile, MergePayload};
use crate::error::Result;
use crate::merge::pretty_json;
use crate::paths::MCP_CONFIG_FILE;
use crate::source::TemplateSource;
use crate::tools_config::{ShareStrategy, Target};
use serde_json::Value;

/// MCP phase: ship `configs/mcp.json` to the target, resolving relative
/// server-arg paths against the project root first.
pub fn build(src: &TemplateSource, target: &Target) -> Result<Vec<GeneratedFile>> {
    if target.mcp.strategy == ShareStrategy::None || !src.exists(MCP_CONFIG_FILE) {
        return Ok(Vec::new());
    }
    let raw = src.read_file(MCP_CONFIG_FILE)?;
    let mut config: Value = serde_json::from_str(&raw)?;
    resolve_relative_args(&mut config, src);

    match target.mcp.strategy {
        ShareStrategy::Direct => Ok(vec![GeneratedFile::new(
            target.mcp.target.clone(),
            pretty_json(&config)?,
        )]),
        ShareStrategy::Merge => {
            let managed_keys = config
                .get("mcpServers")
                .and_then(|s| s.as_object())
                .map(|servers| {
                    servers
                        .keys()
                        .map(|name| format!("mcpServers.{name}"))
                        .collect()
                })
                .unwrap_or_default();
            let payload = MergePayload {
                managed_keys,
                content: config,
            };
            Ok(vec![GeneratedFile::new(
                merge_sibling(&target.mcp.target),
                pretty_json(&serde_json::to_value(&payload)?)?,
            )])
        }
        ShareStrategy::None => unreachable!(),
    }
}

/// Rewrite `mcpServers.<name>.args[]` entries beginning with `./` to
/// absolute paths under the project root, so servers launch correctly no
/// matter the host tool's working directory.
fn resolve_relative_args(config: &mut Value, src: &TemplateSource) {
    let Some(servers) = config
        .get_mut("mcpServers")
        .and_then(|s| s.as_object_mut())
    else {
        return;
    };
    for server in servers.values_mut() {
        let Some(args) = server.get_mut("args").and_then(|a| a.as_array_mut()) else {
            continue;
        };
        for arg in args {
            let Some(text) = arg.as_str() else {
                continue;
            };
            if let Some(rest) = text.strip_prefix("./") {
                let abs = src.project_root().join(rest);
                *arg = Value::String(abs.to_string_lossy().into_owned());
            }
        }
    }
}
