use crate::types::FileOutcome;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("source directory does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("malformed document {}: {reason}", .path.display())]
    MalformedDocument { path: PathBuf, reason: String },

    #[error("invalid config {}: {reason}", .path.display())]
    InvalidConfig { path: PathBuf, reason: String },

    /// A tree copy failed after some files were already reconciled.
    #[error("copy interrupted after {} file(s)", .outcomes.len())]
    CopyInterrupted {
        outcomes: Vec<FileOutcome>,
        #[source]
        source: Box<FlowError>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FlowError>;
