use crate::error::Result;
use serde_yaml::{Mapping, Value};

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Split a Markdown document into its YAML frontmatter map and body.
///
/// Absent or invalid frontmatter yields an empty map and the original text
/// (trimmed) as the body — parse problems in user-authored files are never
/// fatal here.
pub fn parse_frontmatter(raw: &str) -> (Mapping, String) {
    let trimmed = raw.trim_start_matches('\u{feff}');
    let Some(rest) = strip_open_delimiter(trimmed) else {
        return (Mapping::new(), raw.trim().to_string());
    };
    let Some((yaml, body)) = split_close_delimiter(rest) else {
        return (Mapping::new(), raw.trim().to_string());
    };
    match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Mapping(map)) => (map, body.trim().to_string()),
        // An empty block between delimiters is valid, just contentless.
        Ok(Value::Null) => (Mapping::new(), body.trim().to_string()),
        _ => (Mapping::new(), raw.trim().to_string()),
    }
}

fn strip_open_delimiter(raw: &str) -> Option<&str> {
    let rest = raw.strip_prefix("---")?;
    // The delimiter must occupy the whole first line.
    rest.strip_prefix('\n')
        .or_else(|| rest.strip_prefix("\r\n"))
}

fn split_close_delimiter(rest: &str) -> Option<(&str, &str)> {
    for (idx, _) in rest.match_indices('\n') {
        let after = &rest[idx + 1..];
        if after == "---" || after.starts_with("---\n") || after.starts_with("---\r\n") {
            let yaml = &rest[..idx + 1];
            let body = after
                .strip_prefix("---")
                .unwrap_or("")
                .trim_start_matches(['\r', '\n']);
            return Some((yaml, body));
        }
    }
    // Frontmatter opened on the very first content line.
    if rest.starts_with("---") {
        return Some(("", rest["---".len()..].trim_start_matches(['\r', '\n'])));
    }
    None
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Emit a frontmatter map as two-space-indented YAML. Null values and empty
/// sequences are dropped first; an empty result serializes to `""`.
pub fn serialize_yaml(map: &Mapping) -> Result<String> {
    let mut filtered = Mapping::new();
    for (key, value) in map {
        match value {
            Value::Null => continue,
            Value::Sequence(seq) if seq.is_empty() => continue,
            _ => {
                filtered.insert(key.clone(), value.clone());
            }
        }
    }
    if filtered.is_empty() {
        return Ok(String::new());
    }
    Ok(serde_yaml::to_string(&filtered)?)
}

/// Wrap `body` with a frontmatter block, or return the body unchanged when
/// the map serializes to nothing.
pub fn with_frontmatter(map: &Mapping, body: &str) -> Result<String> {
    let yaml = serialize_yaml(map)?;
    if yaml.is_empty() {
        return Ok(format!("{}\n", body.trim_end()));
    }
    Ok(format!("---\n{yaml}---\n\n{}\n", body.trim_end()))
}
