use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Preprocessing error: {0}")]
    Preprocessing(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("{}", format_recognition(.status, .message))]
    Recognition {
        status: Option<u16>,
        message: String,
    },

    #[error("OCR operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Config(String),

}

fn format_recognition(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("Recognition failed (HTTP {code}): {message}"),
        None => format!("Recognition failed: {message}"),
    }
}

impl OcrError {
    pub fn recognition(message: impl Into<String>) -> Self {
        OcrError::Recognition {
            status: None,
            message: message.into(),
        }
    }

    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        OcrError::Recognition {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Category reported to callers through `OcrResult`.
    pub fn kind(&self) -> OcrErrorKind {
        match self {
            OcrError::InvalidImage(_) => OcrErrorKind::InvalidInput,
            OcrError::Preprocessing(_) => OcrErrorKind::PreprocessingFailed,
            OcrError::Authentication(_) => OcrErrorKind::AuthenticationFailed,
            OcrError::Recognition { .. }
            | OcrError::Encoding(_)
            | OcrError::Timeout(_)
            | OcrError::Config(_) => OcrErrorKind::RecognitionFailed,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OcrErrorKind {
    InvalidInput,
    PreprocessingFailed,
    AuthenticationFailed,
    RecognitionFailed,
    Cancelled,
}

impl std::fmt::Display for OcrErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput => write!(f, "invalid_input"),
            Self::PreprocessingFailed => write!(f, "preprocessing_failed"),
            Self::AuthenticationFailed => write!(f, "authentication_failed"),
            Self::RecognitionFailed => write!(f, "recognition_failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

pub type Result<T> = std::result::Result<T, OcrError>;
