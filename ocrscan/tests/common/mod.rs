#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Once;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Get the path to a fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// A light page with a dark band across the middle, roughly like a line of print.
pub fn sample_page(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |_, y| {
        if y > height / 3 && y < 2 * height / 3 {
            Rgba([30, 30, 30, 255])
        } else {
            Rgba([235, 235, 230, 255])
        }
    }))
}

pub fn sample_page_bytes(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    let image = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(sample_page(width, height).into_rgb8()),
        _ => sample_page(width, height),
    };
    image
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("Failed to encode sample page");
    bytes
}

pub fn vision_reply(full_text: &str, tokens: &[(&str, f32)]) -> serde_json::Value {
    let mut annotations = vec![serde_json::json!({ "locale": "ar", "description": full_text })];
    annotations.extend(
        tokens
            .iter()
            .map(|(text, confidence)| serde_json::json!({ "description": text, "confidence": confidence })),
    );
    serde_json::json!({ "responses": [{ "textAnnotations": annotations }] })
}
