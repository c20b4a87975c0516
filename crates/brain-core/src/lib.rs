//! Brain install engine.
//!
//! Transforms a Brain template project (agents, skills, commands,
//! protocols, hooks, MCP config) into per-tool bundles and places them
//! into each target's configuration directories. Targets are described by
//! declarative records in `tools.yaml`; nothing in this crate hard-codes
//! a specific tool.

pub mod brain_config;
pub mod build;
pub mod bundle;
pub mod compose;
pub mod error;
pub mod executor;
pub mod frontmatter;
pub mod installer;
pub mod io;
pub mod manifest;
pub mod merge;
pub mod paths;
pub mod pipeline;
pub mod placement;
pub mod prefix;
pub mod registry;
pub mod source;
pub mod tools_config;

pub use error::{BrainError, Result};
