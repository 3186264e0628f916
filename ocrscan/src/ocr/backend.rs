use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::{parse_ocr_provider_model, OcrConfig, KNOWN_OCR_PROVIDERS};
use crate::error::{OcrError, Result};
use crate::models::{RecognitionRequest, RecognitionResponse};

use super::document_ai::DocumentAiClient;
use super::vision::VisionClient;

/// A remote text-recognition service.
#[async_trait]
pub trait RecognitionBackend: Send + Sync {
    /// Short label recorded as the result's `method`.
    fn name(&self) -> &str;

    async fn recognize(&self, request: &RecognitionRequest) -> Result<RecognitionResponse>;
}

/// Stand-in for a backend that could not be configured.
///
/// Every request fails with the configuration problem, so scans surface it as
/// an error-tagged result instead of the engine failing to start.
#[derive(Debug, Clone)]
pub struct UnavailableBackend {
    name: String,
    reason: String,
    missing_credentials: bool,
}

impl UnavailableBackend {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
            missing_credentials: false,
        }
    }

    /// Requests fail as authentication errors rather than configuration errors.
    pub fn missing_credentials(mut self) -> Self {
        self.missing_credentials = true;
        self
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[async_trait]
impl RecognitionBackend for UnavailableBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn recognize(&self, _request: &RecognitionRequest) -> Result<RecognitionResponse> {
        if self.missing_credentials {
            Err(OcrError::Authentication(self.reason.clone()))
        } else {
            Err(OcrError::Config(self.reason.clone()))
        }
    }
}

/// Select and build the backend named by `config.model`.
pub fn create_backend(config: &OcrConfig) -> Arc<dyn RecognitionBackend> {
    let (provider, model) = parse_ocr_provider_model(&config.model);

    match provider.to_lowercase().as_str() {
        "vision" => match VisionClient::new(config, model) {
            Ok(client) => {
                info!(feature = %model, "Cloud Vision OCR backend initialized");
                Arc::new(client)
            }
            Err(e) => unavailable("vision", &e, "Cloud Vision backend unavailable"),
        },
        "documentai" => match DocumentAiClient::from_config(config) {
            Ok(client) => {
                info!("Document AI OCR backend initialized");
                Arc::new(client)
            }
            Err(e) => unavailable("documentai", &e, "Document AI backend unavailable"),
        },
        other => {
            let reason = format!(
                "Unknown OCR provider in model: {} (expected one of: {})",
                config.model,
                KNOWN_OCR_PROVIDERS.join(", ")
            );
            warn!("{}", reason);
            Arc::new(UnavailableBackend::new(other, reason))
        }
    }
}

fn unavailable(name: &str, error: &OcrError, context: &str) -> Arc<dyn RecognitionBackend> {
    let reason = format!("{context}: {error}");
    warn!("{}", reason);

    let backend = UnavailableBackend::new(name, reason);
    if matches!(error, OcrError::Authentication(_)) {
        Arc::new(backend.missing_credentials())
    } else {
        Arc::new(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(model: &str, api_key: Option<&str>) -> OcrConfig {
        OcrConfig {
            model: model.to_string(),
            api_key: api_key.map(String::from),
            ..OcrConfig::default()
        }
    }

    #[test]
    fn test_vision_model_routes_to_vision() {
        let backend = create_backend(&make_config("vision/TEXT_DETECTION", Some("key")));
        assert_eq!(backend.name(), "vision");
    }

    #[test]
    fn test_bare_model_routes_to_vision() {
        let backend = create_backend(&make_config("DOCUMENT_TEXT_DETECTION", Some("key")));
        assert_eq!(backend.name(), "vision");
    }

    #[tokio::test]
    async fn test_vision_without_api_key_is_unavailable() {
        let backend = create_backend(&make_config("vision/TEXT_DETECTION", None));
        let request = RecognitionRequest::new(vec![1, 2, 3], "image/png", vec![]);

        let result = backend.recognize(&request).await;
        match result {
            Err(OcrError::Authentication(msg)) => assert!(msg.contains("API key required")),
            other => panic!("expected authentication error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_documentai_without_settings_is_unavailable() {
        let backend = create_backend(&make_config("documentai/ocr", None));
        let request = RecognitionRequest::new(vec![1], "image/png", vec![]);

        assert_eq!(backend.name(), "documentai");
        assert!(matches!(
            backend.recognize(&request).await,
            Err(OcrError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_documentai_without_credentials_is_unavailable() {
        let config = OcrConfig {
            model: "documentai/ocr".to_string(),
            project_id: Some("proj".to_string()),
            processor_id: Some("proc".to_string()),
            ..OcrConfig::default()
        };
        let backend = create_backend(&config);
        let request = RecognitionRequest::new(vec![1], "image/png", vec![]);

        assert!(matches!(
            backend.recognize(&request).await,
            Err(OcrError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_provider_is_unavailable() {
        let backend = create_backend(&make_config("tesseract/eng", None));
        let request = RecognitionRequest::new(vec![1], "image/png", vec![]);

        match backend.recognize(&request).await {
            Err(OcrError::Config(msg)) => assert!(msg.contains("Unknown OCR provider")),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }
}
