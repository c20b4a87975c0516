//! The Brain filename prefix.
//!
//! Brain-owned files placed into a host tool's directories are identified
//! by a fixed emoji prefix on the filename. Clean-up scans rely on this
//! prefix alone to tell Brain files from user files, so it must be applied
//! and detected consistently.

/// Brain emoji (U+1F9E0) followed by a hyphen.
pub const BRAIN_PREFIX: &str = "\u{1F9E0}-";

/// Prepend the Brain prefix when `enabled`. Idempotent: an already
/// prefixed name is returned unchanged.
pub fn maybe_prefix(name: &str, enabled: bool) -> String {
    if !enabled || name.starts_with(BRAIN_PREFIX) {
        return name.to_string();
    }
    format!("{BRAIN_PREFIX}{name}")
}

/// True if `name` carries the Brain prefix.
pub fn has_prefix(name: &str) -> bool {
    name.starts_with(BRAIN_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_is_identity() {
        assert_eq!(maybe_prefix("architect", false), "architect");
    }

    #[test]
    fn enabled_prepends() {
        assert_eq!(maybe_prefix("architect", true), "🧠-architect");
    }

    #[test]
    fn prefixing_is_idempotent() {
        let once = maybe_prefix("session", true);
        let twice = maybe_prefix(&once, true);
        assert_eq!(once, twice);
        assert_eq!(twice, "🧠-session");
    }

    #[test]
    fn detects_prefix() {
        assert!(has_prefix("🧠-notes"));
        assert!(!has_prefix("notes"));
    }
}
