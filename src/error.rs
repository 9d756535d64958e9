use crate::motion::FormatError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Motion file error: {0}")]
    Format(#[from] FormatError),

    #[error("Invalid merge mode: {0}")]
    InvalidMode(String),

    #[error("Audio contains no samples")]
    EmptyAudio,

    #[error("Audio has zero amplitude everywhere")]
    DegenerateSignal,

    #[error("Vocal separation failed: {0}")]
    UpstreamSeparation(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
