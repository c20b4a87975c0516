use crate::output::print_json;
use brain_core::registry;
use brain_core::BrainError;

pub fn run(tool: &str, json: bool) -> anyhow::Result<()> {
    let installer =
        registry::get(tool).ok_or_else(|| BrainError::UnknownTarget(tool.to_string()))?;
    let manifest = installer
        .store()
        .read(tool)?
        .ok_or_else(|| BrainError::ManifestMissing(tool.to_string()))?;

    if json {
        return print_json(&manifest);
    }

    println!("tool: {}", manifest.tool);
    println!("files:");
    for file in &manifest.files {
        println!("  {file}");
    }
    if !manifest.managed.is_empty() {
        println!("managed keys:");
        for (file, keys) in &manifest.managed {
            println!("  {file}: {}", keys.join(", "));
        }
    }
    Ok(())
}
