use crate::bundle::GeneratedFile;
use crate::paths::PLUGIN_MANIFEST_DIR;
use crate::tools_config::{ManifestType, Target};
use serde_json::json;

pub const PLUGIN_NAME: &str = "brain";
pub const PLUGIN_VERSION: &str = "1.0.0";

/// Plugin-manifest phase: marketplace targets get the two fixed
/// `.claude-plugin/` metadata files; everything else gets nothing. The
/// marketplace placement step later rewrites `plugin.json` with the real
/// file list.
pub fn build(target: &Target) -> Vec<GeneratedFile> {
    if target.manifest.kind != ManifestType::Marketplace {
        return Vec::new();
    }
    let description = format!("Brain plugin for {}", target.display_name);
    let plugin = json!({
        "name": PLUGIN_NAME,
        "version": PLUGIN_VERSION,
        "description": description,
        "author": PLUGIN_NAME,
    });
    let marketplace = json!({
        "name": PLUGIN_NAME,
        "displayName": target.display_name,
        "description": description,
        "version": PLUGIN_VERSION,
    });
    vec![
        GeneratedFile::new(
            format!("{PLUGIN_MANIFEST_DIR}/plugin.json"),
            pretty(&plugin),
        ),
        GeneratedFile::new(
            format!("{PLUGIN_MANIFEST_DIR}/marketplace.json"),
            pretty(&marketplace),
        ),
    ]
}

fn pretty(value: &serde_json::Value) -> String {
    // json! values always serialize.
    format!("{}\n", serde_json::to_string_pretty(value).unwrap_or_default())
}
