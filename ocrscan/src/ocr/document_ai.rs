use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::config::OcrConfig;
use crate::error::{OcrError, Result};
use crate::models::{RecognitionRequest, RecognitionResponse, TextAnnotation};

use super::auth::{AccessTokenSource, ServiceAccountTokenSource};
use super::backend::RecognitionBackend;

/// Location and processor addressed by a [`DocumentAiClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorSettings {
    pub base_url: String,
    pub project_id: String,
    pub location: String,
    pub processor_id: String,
}

impl ProcessorSettings {
    /// Settings against the regional public endpoint.
    pub fn new(
        project_id: impl Into<String>,
        location: impl Into<String>,
        processor_id: impl Into<String>,
    ) -> Self {
        let location = location.into();
        Self {
            base_url: default_base_url(&location),
            project_id: project_id.into(),
            location,
            processor_id: processor_id.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/processors/{}:process",
            self.base_url.trim_end_matches('/'),
            self.project_id,
            self.location,
            self.processor_id
        )
    }
}

fn default_base_url(location: &str) -> String {
    format!("https://{location}-documentai.googleapis.com")
}

/// Document AI `processors:process` client authenticated with bearer tokens.
pub struct DocumentAiClient {
    client: Client,
    settings: ProcessorSettings,
    tokens: Arc<dyn AccessTokenSource>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessRequest<'a> {
    raw_document: RawDocument<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    process_options: Option<ProcessOptions<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument<'a> {
    content: String,
    mime_type: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessOptions<'a> {
    ocr_config: OcrHintsConfig<'a>,
}

#[derive(Debug, Serialize)]
struct OcrHintsConfig<'a> {
    hints: Hints<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Hints<'a> {
    language_hints: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ProcessResponse {
    #[serde(default)]
    document: Option<Document>,
}

#[derive(Debug, Default, Deserialize)]
struct Document {
    #[serde(default)]
    text: String,
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    tokens: Vec<Token>,
}

#[derive(Debug, Deserialize)]
struct Token {
    #[serde(default)]
    layout: Option<Layout>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Layout {
    #[serde(default)]
    text_anchor: Option<TextAnchor>,
    #[serde(default)]
    confidence: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextAnchor {
    #[serde(default)]
    text_segments: Vec<TextSegment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextSegment {
    #[serde(default, deserialize_with = "int64_index")]
    start_index: usize,
    #[serde(default, deserialize_with = "int64_index")]
    end_index: usize,
}

/// int64 fields arrive as JSON strings; some clients send plain numbers.
fn int64_index<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s.parse().map_err(D::Error::custom),
        serde_json::Value::Number(n) => n
            .as_u64()
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| D::Error::custom(format!("invalid text index: {n}"))),
        serde_json::Value::Null => Ok(0),
        other => Err(D::Error::custom(format!("invalid text index: {other}"))),
    }
}

impl DocumentAiClient {
    pub fn new(
        settings: ProcessorSettings,
        tokens: Arc<dyn AccessTokenSource>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| OcrError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            settings,
            tokens,
        })
    }

    /// Build from `DOCAI_*` settings and a service-account key file.
    pub fn from_config(config: &OcrConfig) -> Result<Self> {
        let project_id = non_blank(&config.project_id)
            .ok_or_else(|| OcrError::Config("Document AI project id is not set".to_string()))?;
        let processor_id = non_blank(&config.processor_id)
            .ok_or_else(|| OcrError::Config("Document AI processor id is not set".to_string()))?;
        let credentials_path = non_blank(&config.credentials_path).ok_or_else(|| {
            OcrError::Authentication(
                "Service account credentials required for Document AI".to_string(),
            )
        })?;

        let mut settings = ProcessorSettings::new(project_id, &config.location, processor_id);
        if let Some(base_url) = non_blank(&config.base_url) {
            settings = settings.with_base_url(base_url);
        }

        let tokens = ServiceAccountTokenSource::from_file(credentials_path, config.timeout_secs)?;
        debug!(client_email = %tokens.client_email(), "Loaded service account key");

        Self::new(settings, Arc::new(tokens), config.timeout_secs)
    }

    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Whole text first, then one annotation per token.
fn annotations_from_document(document: Document) -> Vec<TextAnnotation> {
    if document.text.trim().is_empty() {
        return Vec::new();
    }

    let text = &document.text;
    // Byte offset of every char start, plus the end of the string.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();

    let mut annotations = vec![TextAnnotation::new(text.clone())];

    for layout in document
        .pages
        .iter()
        .flat_map(|page| page.tokens.iter())
        .filter_map(|token| token.layout.as_ref())
    {
        let token_text: String = layout
            .text_anchor
            .iter()
            .flat_map(|anchor| anchor.text_segments.iter())
            .map(|segment| slice_chars(text, &boundaries, segment.start_index, segment.end_index))
            .collect();

        annotations.push(TextAnnotation {
            text: token_text.trim().to_string(),
            confidence: layout.confidence,
        });
    }

    annotations
}

/// Indices count chars, not bytes; out-of-range ends are clamped.
fn slice_chars<'a>(text: &'a str, boundaries: &[usize], start: usize, end: usize) -> &'a str {
    let char_len = boundaries.len() - 1;
    let start = start.min(char_len);
    let end = end.min(char_len);
    if start >= end {
        ""
    } else {
        &text[boundaries[start]..boundaries[end]]
    }
}

#[async_trait]
impl RecognitionBackend for DocumentAiClient {
    fn name(&self) -> &str {
        "documentai"
    }

    async fn recognize(&self, request: &RecognitionRequest) -> Result<RecognitionResponse> {
        let token = self.tokens.access_token().await?;
        let url = self.settings.endpoint();
        debug!(url = %url, "Sending Document AI request");

        let hints = request.language_hints();
        let body = ProcessRequest {
            raw_document: RawDocument {
                content: request.content_base64(),
                mime_type: request.mime_type(),
            },
            process_options: (!hints.is_empty()).then_some(ProcessOptions {
                ocr_config: OcrHintsConfig {
                    hints: Hints {
                        language_hints: hints,
                    },
                },
            }),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
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
        debug!("Document AI response status: {}", status);

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(OcrError::http_status(status.as_u16(), body));
        }

        let parsed: ProcessResponse = response
            .json()
            .await
            .map_err(|e| OcrError::recognition(format!("Failed to parse response: {e}")))?;

        Ok(RecognitionResponse::new(annotations_from_document(
            parsed.document.unwrap_or_default(),
        )))
    }
}
