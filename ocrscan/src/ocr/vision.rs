use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::OcrConfig;
use crate::error::{OcrError, Result};
use crate::models::{RecognitionRequest, RecognitionResponse, TextAnnotation};

use super::backend::RecognitionBackend;

const VISION_BASE_URL: &str = "https://vision.googleapis.com/v1";
const DEFAULT_FEATURE: &str = "DOCUMENT_TEXT_DETECTION";

/// Cloud Vision `images:annotate` client authenticated with a static API key.
#[derive(Clone, Debug)]
pub struct VisionClient {
    client: Client,
    api_key: String,
    base_url: String,
    feature: String,
}

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<AnnotateImageRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_context: Option<ImageContext>,
}

#[derive(Debug, Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageContext {
    language_hints: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
    #[serde(default)]
    confidence: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    code: Option<i32>,
    #[serde(default)]
    message: String,
}

impl VisionClient {
    /// `feature` is the Vision feature type, e.g. `TEXT_DETECTION`; empty
    /// selects `DOCUMENT_TEXT_DETECTION`.
    pub fn new(config: &OcrConfig, feature: &str) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                OcrError::Authentication("API key required for Cloud Vision OCR".to_string())
            })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| VISION_BASE_URL.to_string());

        let feature = if feature.trim().is_empty() {
            DEFAULT_FEATURE.to_string()
        } else {
            feature.trim().to_uppercase()
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OcrError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url,
            feature,
        })
    }

    pub fn feature(&self) -> &str {
        &self.feature
    }

    fn build_request(&self, request: &RecognitionRequest) -> AnnotateRequest {
        let hints = request.language_hints();
        AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageContent {
                    content: request.content_base64(),
                },
                features: vec![Feature {
                    kind: self.feature.clone(),
                }],
                image_context: (!hints.is_empty()).then(|| ImageContext {
                    language_hints: hints.to_vec(),
                }),
            }],
        }
    }
}

#[async_trait]
impl RecognitionBackend for VisionClient {
    fn name(&self) -> &str {
        "vision"
    }

    async fn recognize(&self, request: &RecognitionRequest) -> Result<RecognitionResponse> {
        let url = format!("{}/images:annotate", self.base_url);
        debug!(url = %url, feature = %self.feature, "Sending Cloud Vision request");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.build_request(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OcrError::recognition("Request timeout")
                } else {
                    OcrError::recognition(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        debug!("Cloud Vision response status: {}", status);

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(OcrError::http_status(status.as_u16(), body));
        }

        let parsed: AnnotateResponse = response
            .json()
            .await
            .map_err(|e| OcrError::recognition(format!("Failed to parse response: {e}")))?;

        let image_response = parsed.responses.into_iter().next().unwrap_or_default();

        if let Some(error) = image_response.error {
            let message = match error.code {
                Some(code) => format!("Cloud Vision error {code}: {}", error.message),
                None => format!("Cloud Vision error: {}", error.message),
            };
            return Err(OcrError::recognition(message));
        }

        let annotations = image_response
            .text_annotations
            .into_iter()
            .map(|a| TextAnnotation {
                text: a.description,
                confidence: a.confidence,
            })
            .collect();

        Ok(RecognitionResponse::new(annotations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{body_partial_json, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn test_config(base_url: Option<String>) -> OcrConfig {
        OcrConfig {
            model: "vision/DOCUMENT_TEXT_DETECTION".to_string(),
            api_key: Some("test-key".to_string()),
            base_url,
            timeout_secs: 5,
            ..OcrConfig::default()
        }
    }

    fn test_request() -> RecognitionRequest {
        RecognitionRequest::new(
            vec![0x89, b'P', b'N', b'G'],
            "image/png",
            vec!["ar".to_string(), "en".to_string()],
        )
    }

    #[test]
    fn test_client_requires_api_key() {
        let mut config = test_config(None);
        config.api_key = None;
        let result = VisionClient::new(&config, "");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key required"));

        config.api_key = Some("  ".to_string());
        assert!(VisionClient::new(&config, "").is_err());
    }

    #[test]
    fn test_default_base_url_and_feature() {
        let client = VisionClient::new(&test_config(None), "").unwrap();
        assert_eq!(client.base_url, VISION_BASE_URL);
        assert_eq!(client.feature(), "DOCUMENT_TEXT_DETECTION");

        let client = VisionClient::new(&test_config(None), "text_detection").unwrap();
        assert_eq!(client.feature(), "TEXT_DETECTION");
    }

    #[test]
    fn test_request_body_shape() {
        let client = VisionClient::new(&test_config(None), "").unwrap();
        let body = serde_json::to_value(client.build_request(&test_request())).unwrap();

        assert_eq!(body["requests"][0]["image"]["content"], "iVBORw==");
        assert_eq!(
            body["requests"][0]["features"][0]["type"],
            "DOCUMENT_TEXT_DETECTION"
        );
        assert_eq!(
            body["requests"][0]["imageContext"]["languageHints"],
            serde_json::json!(["ar", "en"])
        );

        let no_hints = RecognitionRequest::new(vec![1], "image/png", vec![]);
        let body = serde_json::to_value(client.build_request(&no_hints)).unwrap();
        assert!(body["requests"][0].get("imageContext").is_none());
    }

    #[tokio::test]
    async fn test_recognize_parses_annotations() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/images:annotate"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "requests": [{ "features": [{ "type": "DOCUMENT_TEXT_DETECTION" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "responses": [{
                    "textAnnotations": [
                        { "locale": "ar", "description": "مرحبا hello\n" },
                        { "description": "مرحبا", "confidence": 0.9 },
                        { "description": "hello", "confidence": 0.7 }
                    ]
                }]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = VisionClient::new(&test_config(Some(mock_server.uri())), "").unwrap();
        let response = client.recognize(&test_request()).await.unwrap();

        assert_eq!(response.annotations.len(), 3);
        assert_eq!(response.full_text(), Some("مرحبا hello\n"));
        assert_eq!(response.annotations[0].confidence, None);
        assert_eq!(response.annotations[2].confidence, Some(0.7));
    }

    #[tokio::test]
    async fn test_recognize_empty_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/images:annotate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "responses": [{}] })),
            )
            .mount(&mock_server)
            .await;

        let client = VisionClient::new(&test_config(Some(mock_server.uri())), "").unwrap();
        let response = client.recognize(&test_request()).await.unwrap();

        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn test_recognize_http_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/images:annotate"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": {
                    "code": 403,
                    "message": "The request is missing a valid API key.",
                    "status": "PERMISSION_DENIED"
                }
            })))
            .mount(&mock_server)
            .await;

        let client = VisionClient::new(&test_config(Some(mock_server.uri())), "").unwrap();
        let error = client.recognize(&test_request()).await.unwrap_err();

        match &error {
            OcrError::Recognition { status, message } => {
                assert_eq!(*status, Some(403));
                assert!(message.contains("PERMISSION_DENIED"));
            }
            other => panic!("expected recognition error, got {other:?}"),
        }
        assert!(error.to_string().contains("403"));
    }

    #[tokio::test]
    async fn test_recognize_error_inside_success_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/images:annotate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "responses": [{
                    "error": { "code": 3, "message": "Bad image data." }
                }]
            })))
            .mount(&mock_server)
            .await;

        let client = VisionClient::new(&test_config(Some(mock_server.uri())), "").unwrap();
        let error = client.recognize(&test_request()).await.unwrap_err();

        assert!(matches!(error, OcrError::Recognition { status: None, .. }));
        assert!(error.to_string().contains("Bad image data."));
    }

    #[tokio::test]
    async fn test_recognize_does_not_retry() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/images:annotate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = VisionClient::new(&test_config(Some(mock_server.uri())), "").unwrap();
        assert!(client.recognize(&test_request()).await.is_err());
    }
}
