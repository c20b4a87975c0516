use anyhow::Context;
use brain_core::registry;
use brain_core::BrainError;

pub fn run(tool: &str, scope: Option<&str>) -> anyhow::Result<()> {
    let mut installer =
        registry::get(tool).ok_or_else(|| BrainError::UnknownTarget(tool.to_string()))?;
    if let Some(scope) = scope {
        installer.set_scope(scope)?;
    }
    installer
        .uninstall()
        .with_context(|| format!("failed to uninstall '{tool}'"))?;
    println!("uninstalled {tool}");
    Ok(())
}
