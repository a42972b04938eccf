//! Error types for the detection engine

use thiserror::Error;

/// Engine errors
///
/// Only `Cancelled` and `InvalidNotebook` abandon a whole analysis; every
/// other variant is caught at the image or analyzer boundary and logged.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Invalid notebook: {0}")]
    InvalidNotebook(String),

    #[error("Attachment not found: {0}")]
    AttachmentNotFound(String),

    #[error("Image unavailable: {0}")]
    ImageUnavailable(String),

    #[error("Image decode failed: {0}")]
    ImageDecode(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("DOM engine failed: {0}")]
    Dom(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }
}

impl From<image::ImageError> for EngineError {
    fn from(err: image::ImageError) -> Self {
        EngineError::ImageDecode(err.to_string())
    }
}

impl From<base64::DecodeError> for EngineError {
    fn from(err: base64::DecodeError) -> Self {
        EngineError::ImageDecode(format!("invalid base64 payload: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
