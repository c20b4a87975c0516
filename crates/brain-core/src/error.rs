use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrainError {
    #[error("invalid tools config:\n{0}")]
    Config(String),

    #[error("template path escapes project root: {0}")]
    PathEscape(String),

    #[error("expected a file at {0}, found a directory")]
    NotAFile(String),

    #[error("build phase '{phase}' failed: {source}")]
    Phase {
        phase: &'static str,
        #[source]
        source: Box<BrainError>,
    },

    #[error("unknown scope '{name}' (available: {available})")]
    UnknownScope { name: String, available: String },

    #[error("unknown target: {0}")]
    UnknownTarget(String),

    #[error("no manifest found for tool: {0}")]
    ManifestMissing(String),

    #[error("install cancelled")]
    Cancelled,

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Pipeline(#[from] PipelineFailure),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BrainError>;

// ---------------------------------------------------------------------------
// PipelineFailure
// ---------------------------------------------------------------------------

/// A pipeline step failed and rollback ran. The primary cause comes first;
/// each undo failure that occurred during rollback follows on its own line.
#[derive(Debug, Error)]
pub struct PipelineFailure {
    pub step: String,
    pub cause: Box<BrainError>,
    pub undo_errors: Vec<UndoError>,
}

#[derive(Debug)]
pub struct UndoError {
    pub step: String,
    pub error: BrainError,
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step '{}' failed: {}", self.step, self.cause)?;
        for undo in &self.undo_errors {
            write!(f, "\nundo '{}' failed: {}", undo.step, undo.error)?;
        }
        Ok(())
    }
}
