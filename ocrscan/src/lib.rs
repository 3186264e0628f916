//! Photo-to-text scanner core.
//!
//! Conditions a photo for recognition, submits it to a cloud OCR backend and
//! classifies the returned text by script. See [`ocr::OcrEngine`].

pub mod config;
pub mod error;
pub mod models;
pub mod ocr;
