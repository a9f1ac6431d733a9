//! Index error types.

use std::path::PathBuf;
use thiserror::Error;

pub type IndexResult<T> = Result<T, IndexError>;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Invalid archive {path}: {message}")]
    InvalidArchive { path: PathBuf, message: String },

    #[error("Embedding dimension mismatch: archive holds {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding failed: {0}")]
    Embedding(#[from] sceneseek_ml_client::MlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IndexError {
    pub fn invalid_archive(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidArchive {
            path: path.into(),
            message: message.into(),
        }
    }
}
