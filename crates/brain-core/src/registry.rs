//! Global installer registry.
//!
//! Targets register once during process init, before any install runs;
//! after that the map is read-only. `all()` hands out fresh clones so a
//! caller adjusting an installer's scope never mutates the registry.

use crate::installer::ToolInstaller;
use std::collections::BTreeMap;
use std::sync::{Mutex, OnceLock};

fn registry() -> &'static Mutex<BTreeMap<String, ToolInstaller>> {
    static REGISTRY: OnceLock<Mutex<BTreeMap<String, ToolInstaller>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(BTreeMap::new()))
}

/// Register an installer under its target name.
///
/// # Panics
/// Panics when the name is already taken. Duplicate registration is a
/// wiring bug, not a runtime condition.
pub fn register(installer: ToolInstaller) {
    let name = installer.name().to_string();
    let duplicate = {
        let mut map = registry().lock().unwrap();
        if map.contains_key(&name) {
            true
        } else {
            map.insert(name.clone(), installer);
            false
        }
    };
    // Panic without the registry lock held so other tests see a clean mutex.
    if duplicate {
        panic!("installer already registered: {name}");
    }
}

/// Register an installer only if its name is still free. Returns whether
/// the entry was inserted. Config-driven registration goes through here so
/// hand-authored installers registered earlier keep precedence.
pub fn register_if_absent(installer: ToolInstaller) -> bool {
    let mut map = registry().lock().unwrap();
    match map.entry(installer.name().to_string()) {
        std::collections::btree_map::Entry::Occupied(_) => false,
        std::collections::btree_map::Entry::Vacant(slot) => {
            slot.insert(installer);
            true
        }
    }
}

/// Look up one installer by target name. The clone is independent of the
/// registry entry.
pub fn get(name: &str) -> Option<ToolInstaller> {
    registry().lock().unwrap().get(name).cloned()
}

/// All registered installers sorted by name, as fresh clones.
pub fn all() -> Vec<ToolInstaller> {
    registry().lock().unwrap().values().cloned().collect()
}

/// Drop every registration. Tests only.
pub fn reset() {
    registry().lock().unwrap().clear();
}

/// Serializes tests that touch the process-global registry.
#[cfg(test)]
pub(crate) fn test_guard() -> std::sync::MutexGuard<'static, ()> {
    static GUARD: Mutex<()> = Mutex::new(());
    GUARD.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
