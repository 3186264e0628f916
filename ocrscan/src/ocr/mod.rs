//! OCR (Optical Character Recognition) Module
//!
//! Turns a photo into classified text in four steps:
//! - `preprocessing` conditions the bitmap (resize, contrast, sharpen, blur,
//!   optional binarization)
//! - `encoding` produces a PNG payload under the upload ceiling
//! - a `RecognitionBackend` sends it to a cloud OCR service
//! - `language` and `confidence` summarize the returned annotations
//!
//! `OcrEngine` sequences these and always yields an `OcrResult`.
//!
//! # Backends
//!
//! Selected from `OcrConfig::model` in `provider/model` form:
//! - `vision/<FEATURE>`: Cloud Vision with an API key
//! - `documentai/<anything>`: Document AI with a service-account key
//!
//! # Usage
//!
//! ```rust,ignore
//! let engine = OcrEngine::from_config(&config);
//! let result = engine.process(image, Some(PreprocessOptions::default())).await;
//! println!("{} ({})", result.text(), result.language());
//! ```

pub mod auth;
mod backend;
mod confidence;
mod document_ai;
mod encoding;
mod engine;
mod language;
mod preprocessing;
mod vision;

pub use backend::{create_backend, RecognitionBackend, UnavailableBackend};
pub use confidence::{estimate, DEFAULT_CONFIDENCE};
pub use document_ai::{DocumentAiClient, ProcessorSettings};
pub use encoding::{encode_for_upload, encode_png, EncodedImage, PNG_MIME_TYPE};
pub use engine::{EngineConfig, OcrEngine};
pub use language::{classify, contains_arabic, contains_latin, is_arabic_char, ScriptInfo};
pub use preprocessing::{
    binarize, decode_image, denoise, enhance_contrast, optimize, resize_to_fit, sharpen,
    PreprocessOptions,
};
pub use vision::VisionClient;
