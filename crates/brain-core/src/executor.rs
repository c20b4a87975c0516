//! Parallel install executor.
//!
//! One thread per installer; each install's error is captured in its own
//! slot, so one failing target never short-circuits the others. Results
//! come back in input order regardless of completion order.

use crate::error::{BrainError, Result};
use crate::installer::ToolInstaller;
use crate::pipeline::CancelToken;
use crate::registry;
use crate::source::TemplateSource;
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct InstallResult {
    pub name: String,
    pub error: Option<BrainError>,
}

impl InstallResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Run every installer's `install` concurrently, one worker per tool.
pub fn install_all(cancel: &CancelToken, installers: &[ToolInstaller]) -> Vec<InstallResult> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = installers
            .iter()
            .map(|installer| scope.spawn(move || installer.install(cancel)))
            .collect();
        handles
            .into_iter()
            .zip(installers)
            .map(|(handle, installer)| InstallResult {
                name: installer.name().to_string(),
                error: match handle.join() {
                    Ok(Ok(())) => None,
                    Ok(Err(error)) => Some(error),
                    Err(panic) => std::panic::resume_unwind(panic),
                },
            })
            .collect()
    })
}

/// Resolve tool names against the registry, rebind each installer to the
/// given template source (and scope, when overridden), and install them
/// all in parallel.
pub fn install_tools(
    cancel: &CancelToken,
    tools: &[String],
    source: &TemplateSource,
    scope: Option<&str>,
) -> Result<Vec<InstallResult>> {
    let installers = tools
        .iter()
        .map(|name| {
            let mut installer = registry::get(name)
                .map(|installer| installer.with_source(source.clone()))
                .ok_or_else(|| BrainError::UnknownTarget(name.clone()))?;
            if let Some(scope) = scope {
                installer.set_scope(scope)?;
            }
            Ok(installer)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(install_all(cancel, &installers))
}

/// Only the failing entries, keyed by tool name.
pub fn failures(results: Vec<InstallResult>) -> BTreeMap<String, BrainError> {
    results
        .into_iter()
        .filter_map(|result| result.error.map(|error| (result.name, error)))
        .collect()
}
