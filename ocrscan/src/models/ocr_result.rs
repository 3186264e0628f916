use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OcrErrorKind;
use crate::ocr::ScriptInfo;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OcrStatus {
    Success,
    NoTextDetected,
    Failed,
}

impl std::fmt::Display for OcrStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::NoTextDetected => write!(f, "no_text_detected"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Terminal output of one scan.
///
/// Built through [`OcrResult::success`], [`OcrResult::no_text`] or
/// [`OcrResult::failure`]; a failed result always has empty text and zeroed
/// script and confidence fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrResult {
    text: String,
    status: OcrStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<OcrErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    has_arabic: bool,
    has_latin: bool,
    language: String,
    confidence: f32,
    word_count: usize,
    processing_time_ms: u64,
    method: String,
    processed_at: DateTime<Utc>,
}

impl OcrResult {
    pub fn success(
        text: impl Into<String>,
        script: ScriptInfo,
        confidence: f32,
        word_count: usize,
        elapsed: Duration,
        method: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            status: OcrStatus::Success,
            error_kind: None,
            error: None,
            has_arabic: script.has_arabic,
            has_latin: script.has_latin,
            language: script.label.to_string(),
            confidence,
            word_count,
            processing_time_ms: elapsed_ms(elapsed),
            method: method.into(),
            processed_at: Utc::now(),
        }
    }

    /// Recognition succeeded but found nothing to read.
    pub fn no_text(elapsed: Duration, method: impl Into<String>) -> Self {
        Self {
            status: OcrStatus::NoTextDetected,
            ..Self::blank(elapsed, method.into())
        }
    }

    pub fn failure(
        kind: OcrErrorKind,
        message: impl Into<String>,
        elapsed: Duration,
        method: impl Into<String>,
    ) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = format!("OCR failed: {kind}");
        }

        Self {
            status: OcrStatus::Failed,
            error_kind: Some(kind),
            error: Some(message),
            ..Self::blank(elapsed, method.into())
        }
    }

    fn blank(elapsed: Duration, method: String) -> Self {
        let script = ScriptInfo::default();
        Self {
            text: String::new(),
            status: OcrStatus::Success,
            error_kind: None,
            error: None,
            has_arabic: false,
            has_latin: false,
            language: script.label.to_string(),
            confidence: 0.0,
            word_count: 0,
            processing_time_ms: elapsed_ms(elapsed),
            method,
            processed_at: Utc::now(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn status(&self) -> OcrStatus {
        self.status
    }

    /// True for both `Success` and `NoTextDetected`.
    pub fn is_success(&self) -> bool {
        self.status != OcrStatus::Failed
    }

    pub fn is_no_text(&self) -> bool {
        self.status == OcrStatus::NoTextDetected
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn error_kind(&self) -> Option<OcrErrorKind> {
        self.error_kind
    }

    pub fn has_arabic(&self) -> bool {
        self.has_arabic
    }

    pub fn has_latin(&self) -> bool {
        self.has_latin
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn processing_time_ms(&self) -> u64 {
        self.processing_time_ms
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn processed_at(&self) -> DateTime<Utc> {
        self.processed_at
    }
}

fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::classify;

    #[test]
    fn test_success_result_carries_metadata() {
        let result = OcrResult::success(
            "hello مرحبا",
            classify("hello مرحبا"),
            0.8,
            2,
            Duration::from_millis(1500),
            "vision",
        );

        assert!(result.is_success());
        assert!(!result.is_no_text());
        assert!(result.error().is_none());
        assert!(result.has_arabic());
        assert!(result.has_latin());
        assert_eq!(result.language(), "Arabic & Latin");
        assert_eq!(result.word_count(), 2);
        assert_eq!(result.processing_time_ms(), 1500);
        assert_eq!(result.method(), "vision");
    }

    #[test]
    fn test_failure_result_is_zeroed() {
        let result = OcrResult::failure(
            OcrErrorKind::RecognitionFailed,
            "HTTP 500",
            Duration::from_millis(10),
            "vision",
        );

        assert!(!result.is_success());
        assert_eq!(result.status(), OcrStatus::Failed);
        assert_eq!(result.text(), "");
        assert_eq!(result.error(), Some("HTTP 500"));
        assert_eq!(result.error_kind(), Some(OcrErrorKind::RecognitionFailed));
        assert!(!result.has_arabic());
        assert!(!result.has_latin());
        assert_eq!(result.confidence(), 0.0);
        assert_eq!(result.word_count(), 0);
        assert_eq!(result.language(), "Unknown");
    }

    #[test]
    fn test_failure_with_blank_message_gets_default() {
        let result = OcrResult::failure(
            OcrErrorKind::InvalidInput,
            "  ",
            Duration::ZERO,
            "vision",
        );
        assert_eq!(result.error(), Some("OCR failed: invalid_input"));
    }

    #[test]
    fn test_no_text_is_distinct_from_failure() {
        let result = OcrResult::no_text(Duration::ZERO, "documentai");

        assert!(result.is_success());
        assert!(result.is_no_text());
        assert_eq!(result.text(), "");
        assert!(result.error().is_none());
        assert!(result.error_kind().is_none());
    }

    #[test]
    fn test_serialization_skips_absent_error() {
        let result = OcrResult::no_text(Duration::ZERO, "vision");
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], "no_text_detected");
        assert!(json.get("error").is_none());
        assert_eq!(json["method"], "vision");
    }
}
