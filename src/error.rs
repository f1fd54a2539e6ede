//! Error types for definition loading and persistence.
//!
//! Gameplay paths (event dispatch, detect, progress reads) never surface these;
//! they log and carry on.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid task config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Task kind mismatch: expected {expected}, found {found}")]
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Circular entity inheritance detected at '{0}'")]
    CircularInheritance(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl TaskError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TaskError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        TaskError::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
