use image::{DynamicImage, GenericImageView, ImageFormat};
use tracing::debug;

use crate::error::{OcrError, Result};

pub const PNG_MIME_TYPE: &str = "image/png";

/// Each oversized round shrinks both edges to this fraction.
const DOWNSCALE_STEP: f64 = 0.75;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Encode losslessly as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
        .map_err(|e| OcrError::Encoding(format!("Failed to encode image: {e}")))?;
    Ok(output)
}

/// Encode as PNG, downscaling until the payload fits in `max_bytes`.
pub fn encode_for_upload(img: DynamicImage, max_bytes: usize) -> Result<EncodedImage> {
    let mut current = img;

    loop {
        let bytes = encode_png(&current)?;
        let (width, height) = current.dimensions();

        if bytes.len() <= max_bytes {
            debug!(size = bytes.len(), width, height, "Image encoded");
            return Ok(EncodedImage {
                bytes,
                mime_type: PNG_MIME_TYPE,
                width,
                height,
            });
        }

        let new_width = (f64::from(width) * DOWNSCALE_STEP).floor() as u32;
        let new_height = (f64::from(height) * DOWNSCALE_STEP).floor() as u32;
        if new_width == 0 || new_height == 0 {
            return Err(OcrError::Encoding(format!(
                "Encoded image is {} bytes at {width}x{height}, cannot fit within {max_bytes} bytes",
                bytes.len()
            )));
        }

        debug!(
            size = bytes.len(),
            max_bytes, new_width, new_height, "Encoded image too large, downscaling"
        );
        current = current.resize_exact(
            new_width,
            new_height,
            image::imageops::FilterType::Lanczos3,
        );
    }
}
