use std::sync::Arc;
use std::time::{Duration, Instant};

use image::{DynamicImage, GenericImageView};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{Config, OcrConfig};
use crate::error::{OcrError, OcrErrorKind, Result};
use crate::models::{OcrResult, RecognitionRequest};

use super::backend::{create_backend, RecognitionBackend};
use super::confidence::estimate;
use super::encoding::encode_for_upload;
use super::language::classify;
use super::preprocessing::{decode_image, optimize, PreprocessOptions};

/// Per-scan limits applied by [`OcrEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub language_hints: Vec<String>,
    pub timeout_secs: u64,
    pub max_payload_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from(&OcrConfig::default())
    }
}

impl From<&OcrConfig> for EngineConfig {
    fn from(config: &OcrConfig) -> Self {
        Self {
            language_hints: config.language_hints.clone(),
            timeout_secs: config.timeout_secs,
            max_payload_bytes: config.max_payload_bytes,
        }
    }
}

/// Runs one scan per call: optional preprocessing, PNG encoding, remote
/// recognition, then script and confidence classification.
///
/// Every call resolves to an [`OcrResult`]; errors are reported inside it.
#[derive(Clone)]
pub struct OcrEngine {
    backend: Arc<dyn RecognitionBackend>,
    config: EngineConfig,
}

impl OcrEngine {
    pub fn new(backend: Arc<dyn RecognitionBackend>, config: EngineConfig) -> Self {
        Self { backend, config }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(create_backend(&config.ocr), EngineConfig::from(&config.ocr))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn process(
        &self,
        image: DynamicImage,
        options: Option<PreprocessOptions>,
    ) -> OcrResult {
        let started = Instant::now();
        let result = self.run(image, options, started).await;
        self.finish(result, started)
    }

    /// Decode `bytes` and scan the result.
    pub async fn process_bytes(
        &self,
        bytes: &[u8],
        options: Option<PreprocessOptions>,
    ) -> OcrResult {
        let started = Instant::now();
        match decode_image(bytes) {
            Ok(image) => self.process(image, options).await,
            Err(e) => self.finish(Err(e), started),
        }
    }

    /// Like [`process`](Self::process), but resolves to a `Cancelled` result
    /// as soon as `token` fires.
    pub async fn process_with_cancellation(
        &self,
        image: DynamicImage,
        options: Option<PreprocessOptions>,
        token: CancellationToken,
    ) -> OcrResult {
        let started = Instant::now();

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                info!("OCR scan cancelled");
                OcrResult::failure(
                    OcrErrorKind::Cancelled,
                    "OCR scan cancelled",
                    started.elapsed(),
                    self.backend.name(),
                )
            }
            result = self.process(image, options) => result,
        }
    }

    async fn run(
        &self,
        image: DynamicImage,
        options: Option<PreprocessOptions>,
        started: Instant,
    ) -> Result<OcrResult> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(OcrError::InvalidImage(format!(
                "Image has no pixels: {width}x{height}"
            )));
        }

        let image = match options {
            Some(options) => preprocess(image, options).await,
            None => image,
        };

        let max_bytes = self.config.max_payload_bytes;
        let encoded = tokio::task::spawn_blocking(move || encode_for_upload(image, max_bytes))
            .await
            .map_err(|e| OcrError::Encoding(format!("Encoding task panicked: {e}")))??;
        debug!(
            size = encoded.bytes.len(),
            width = encoded.width,
            height = encoded.height,
            "Prepared recognition payload"
        );

        let request = RecognitionRequest::new(
            encoded.bytes,
            encoded.mime_type,
            self.config.language_hints.clone(),
        );

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let response = tokio::time::timeout(timeout, self.backend.recognize(&request))
            .await
            .map_err(|_| OcrError::Timeout(self.config.timeout_secs))??;

        let text = response.full_text().map(str::trim).unwrap_or_default();
        if text.is_empty() {
            return Ok(OcrResult::no_text(started.elapsed(), self.backend.name()));
        }

        let script = classify(text);
        let confidence = estimate(&response.annotations);
        let word_count = text.split_whitespace().count();

        Ok(OcrResult::success(
            text,
            script,
            confidence,
            word_count,
            started.elapsed(),
            self.backend.name(),
        ))
    }

    fn finish(&self, result: Result<OcrResult>, started: Instant) -> OcrResult {
        match result {
            Ok(result) => {
                if result.is_no_text() {
                    info!(method = %result.method(), "No text detected");
                } else {
                    info!(
                        method = %result.method(),
                        language = %result.language(),
                        words = result.word_count(),
                        confidence = result.confidence(),
                        elapsed_ms = result.processing_time_ms(),
                        "OCR scan complete"
                    );
                }
                result
            }
            Err(e) => {
                error!(error = %e, "OCR scan failed");
                OcrResult::failure(
                    e.kind(),
                    e.to_string(),
                    started.elapsed(),
                    self.backend.name(),
                )
            }
        }
    }
}

/// Falls back to the unmodified image if preprocessing fails.
async fn preprocess(image: DynamicImage, options: PreprocessOptions) -> DynamicImage {
    let original = image.clone();

    match tokio::task::spawn_blocking(move || optimize(image, &options)).await {
        Ok(Ok(processed)) => processed,
        Ok(Err(e)) => {
            warn!(error = %e, "Preprocessing failed, using original image");
            original
        }
        Err(e) => {
            warn!(error = %e, "Preprocessing task panicked, using original image");
            original
        }
    }
}
