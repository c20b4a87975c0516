//! JSON plumbing for shared host files.
//!
//! Three small pieces: an RFC 7396 merge patch, dotted-path set/delete on
//! dynamic JSON maps, and stable pretty-printing (two-space indent,
//! trailing newline) so repeated installs do not churn user files.

use crate::error::Result;
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Pretty printing
// ---------------------------------------------------------------------------

pub fn pretty_json(value: &Value) -> Result<String> {
    Ok(format!("{}\n", serde_json::to_string_pretty(value)?))
}

// ---------------------------------------------------------------------------
// RFC 7396 merge patch
// ---------------------------------------------------------------------------

/// Apply an RFC 7396 JSON Merge Patch: objects recurse, `null` deletes a
/// key, anything else replaces the target value.
pub fn merge_patch(target: &Value, patch: &Value) -> Value {
    let Value::Object(patch_map) = patch else {
        return patch.clone();
    };
    let mut result = match target {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    for (key, patch_value) in patch_map {
        if patch_value.is_null() {
            result.remove(key);
        } else {
            let merged = match result.get(key) {
                Some(existing) => merge_patch(existing, patch_value),
                None => merge_patch(&Value::Null, patch_value),
            };
            result.insert(key.clone(), merged);
        }
    }
    Value::Object(result)
}

// ---------------------------------------------------------------------------
// Dotted-path operations
// ---------------------------------------------------------------------------

/// Set `path` (dotted) to `new_value`, creating intermediate objects and
/// preserving sibling keys. Non-object intermediates are replaced.
pub fn set_key(root: &mut Value, path: &str, new_value: Value) {
    let mut current = root;
    let mut parts = path.split('.').peekable();
    while let Some(part) = parts.next() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let map = current.as_object_mut().unwrap();
        if parts.peek().is_none() {
            map.insert(part.to_string(), new_value);
            return;
        }
        current = map
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

/// Read the value at `path` (dotted), if the whole chain exists.
pub fn get_key<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for part in path.split('.') {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Delete `path` (dotted) if present. Missing segments are a no-op.
pub fn delete_key(root: &mut Value, path: &str) {
    let Some((parent_path, leaf)) = split_leaf(path) else {
        return;
    };
    let Some(parent) = descend_mut(root, parent_path) else {
        return;
    };
    if let Some(map) = parent.as_object_mut() {
        map.remove(leaf);
    }
}

fn split_leaf(path: &str) -> Option<(&str, &str)> {
    if path.is_empty() {
        return None;
    }
    match path.rfind('.') {
        Some(pos) => Some((&path[..pos], &path[pos + 1..])),
        None => Some(("", path)),
    }
}

fn descend_mut<'a>(root: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    if path.is_empty() {
        return Some(root);
    }
    let mut current = root;
    for part in path.split('.') {
        current = current.as_object_mut()?.get_mut(part)?;
    }
    Some(current)
}
