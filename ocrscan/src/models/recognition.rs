use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

/// Encoded image payload submitted to a recognition backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionRequest {
    content: Vec<u8>,
    mime_type: String,
    language_hints: Vec<String>,
}

impl RecognitionRequest {
    pub fn new(
        content: Vec<u8>,
        mime_type: impl Into<String>,
        language_hints: Vec<String>,
    ) -> Self {
        Self {
            content,
            mime_type: mime_type.into(),
            language_hints,
        }
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn language_hints(&self) -> &[String] {
        &self.language_hints
    }

    pub fn content_base64(&self) -> String {
        STANDARD.encode(&self.content)
    }
}

/// A detected span of text, optionally scored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnnotation {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl TextAnnotation {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence: Some(confidence),
        }
    }
}

/// Backend output. The first annotation, when present, carries the full
/// document text; the rest are individual tokens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResponse {
    pub annotations: Vec<TextAnnotation>,
}

impl RecognitionResponse {
    pub fn new(annotations: Vec<TextAnnotation>) -> Self {
        Self { annotations }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn full_text(&self) -> Option<&str> {
        self.annotations.first().map(|a| a.text.as_str())
    }
}
