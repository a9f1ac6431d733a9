//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Video processing failed: {0}")]
    VideoFailed(String),

    #[error("Video file not found for id: {0}")]
    VideoNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Scene artifact error: {0}")]
    Document(#[from] sceneseek_models::SceneDocumentError),

    #[error("Media error: {0}")]
    Media(#[from] sceneseek_media::MediaError),

    #[error("Model error: {0}")]
    Ml(#[from] sceneseek_ml_client::MlError),

    #[error("Index error: {0}")]
    Index(#[from] sceneseek_index::IndexError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn video_failed(msg: impl Into<String>) -> Self {
        Self::VideoFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
