use image::{DynamicImage, GenericImageView, ImageReader, Rgba, RgbaImage};
use imageproc::filter::gaussian_blur_f32;
use tracing::debug;

use crate::config::PreprocessConfig;
use crate::error::{OcrError, Result};

const CONTRAST_GAIN: f32 = 1.2;
const CONTRAST_BIAS: f32 = 10.0;
const DENOISE_SIGMA: f32 = 0.5;
const BINARIZE_RATIO: f64 = 0.85;

const SHARPEN_KERNEL: [[i32; 3]; 3] = [[0, -1, 0], [-1, 5, -1], [0, -1, 0]];

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Which preprocessing stages run, and the resolution ceiling for resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessOptions {
    pub enhance_contrast: bool,
    pub sharpen: bool,
    pub denoise: bool,
    pub binarize: bool,
    pub max_resolution: u32,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            enhance_contrast: true,
            sharpen: true,
            denoise: true,
            binarize: false,
            max_resolution: 2048,
        }
    }
}

impl From<&PreprocessConfig> for PreprocessOptions {
    fn from(config: &PreprocessConfig) -> Self {
        Self {
            enhance_contrast: config.enhance_contrast,
            sharpen: config.sharpen,
            denoise: config.denoise,
            binarize: config.binarize,
            max_resolution: config.max_resolution,
        }
    }
}

impl PreprocessOptions {
    fn any_pixel_stage(&self) -> bool {
        self.enhance_contrast || self.sharpen || self.denoise || self.binarize
    }
}

/// Condition an image for text recognition.
///
/// Stages run in a fixed order, each consuming the previous stage's output:
/// 1. Resize so the longer edge is at most `max_resolution` (Lanczos3)
/// 2. Linear contrast boost per colour channel
/// 3. 3x3 sharpen, leaving the outer pixel ring untouched
/// 4. Mild Gaussian blur to suppress sensor grain
/// 5. Global mean-brightness binarization (off by default)
///
/// The output is RGBA8 whenever a pixel stage ran; with every pixel stage
/// disabled the (possibly resized) input is returned as is.
pub fn optimize(image: DynamicImage, options: &PreprocessOptions) -> Result<DynamicImage> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(OcrError::InvalidImage(format!(
            "Image has no pixels: {width}x{height}"
        )));
    }
    if options.max_resolution == 0 {
        return Err(OcrError::Preprocessing(
            "max_resolution must be positive".to_string(),
        ));
    }

    debug!(width, height, "Original size");

    let image = resize_to_fit(image, options.max_resolution);
    debug!(
        width = image.width(),
        height = image.height(),
        "Scaled size"
    );

    if !options.any_pixel_stage() {
        return Ok(image);
    }

    let mut pixels = image.into_rgba8();

    if options.enhance_contrast {
        pixels = enhance_contrast(pixels);
        debug!("Applied contrast enhancement");
    }

    if options.sharpen {
        pixels = sharpen(pixels);
        debug!("Applied sharpening");
    }

    if options.denoise {
        pixels = denoise(pixels);
        debug!("Applied denoising");
    }

    if options.binarize {
        pixels = binarize(pixels);
        debug!("Applied binarization");
    }

    Ok(DynamicImage::ImageRgba8(pixels))
}

/// Decode encoded image bytes (PNG, JPEG, ...) into a pixel buffer.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(OcrError::InvalidImage("Image data is empty".to_string()));
    }

    let reader = ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| OcrError::InvalidImage(format!("Failed to read image: {e}")))?;

    reader
        .decode()
        .map_err(|e| OcrError::InvalidImage(format!("Failed to decode image: {e}")))
}

/// Downscale so neither edge exceeds `max_dim`, preserving aspect ratio.
///
/// The longer edge lands exactly on `max_dim`; images already within bounds
/// are returned untouched.
pub fn resize_to_fit(img: DynamicImage, max_dim: u32) -> DynamicImage {
    let (width, height) = img.dimensions();

    if width <= max_dim && height <= max_dim {
        return img;
    }

    let (new_width, new_height) = if width >= height {
        (max_dim, scale_edge(height, max_dim, width))
    } else {
        (scale_edge(width, max_dim, height), max_dim)
    };

    img.resize_exact(
        new_width,
        new_height,
        image::imageops::FilterType::Lanczos3,
    )
}

/// `edge * numerator / denominator`, rounded, never below one pixel.
fn scale_edge(edge: u32, numerator: u32, denominator: u32) -> u32 {
    let scaled = (u64::from(edge) * u64::from(numerator) + u64::from(denominator) / 2)
        / u64::from(denominator);
    scaled.max(1) as u32
}

/// `clamp(v * 1.2 + 10, 0, 255)` on R, G and B; alpha is kept.
pub fn enhance_contrast(mut img: RgbaImage) -> RgbaImage {
    let lut = contrast_lut();
    for pixel in img.pixels_mut() {
        for channel in pixel.0.iter_mut().take(3) {
            *channel = lut[usize::from(*channel)];
        }
    }
    img
}

fn contrast_lut() -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (value, slot) in lut.iter_mut().enumerate() {
        let mapped = value as f32 * CONTRAST_GAIN + CONTRAST_BIAS;
        *slot = mapped.round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// 3x3 sharpen on R, G and B.
///
/// The outermost pixel ring is copied through unchanged, as are images too
/// small to have an interior.
pub fn sharpen(img: RgbaImage) -> RgbaImage {
    let (width, height) = img.dimensions();
    if width < 3 || height < 3 {
        return img;
    }

    let mut output = img.clone();

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut sums = [0i32; 3];

            for (ky, row) in SHARPEN_KERNEL.iter().enumerate() {
                for (kx, &weight) in row.iter().enumerate() {
                    if weight == 0 {
                        continue;
                    }
                    let source = img.get_pixel(x + kx as u32 - 1, y + ky as u32 - 1);
                    for (sum, &channel) in sums.iter_mut().zip(source.0.iter()) {
                        *sum += i32::from(channel) * weight;
                    }
                }
            }

            let alpha = img.get_pixel(x, y).0[3];
            output.put_pixel(
                x,
                y,
                Rgba([
                    sums[0].clamp(0, 255) as u8,
                    sums[1].clamp(0, 255) as u8,
                    sums[2].clamp(0, 255) as u8,
                    alpha,
                ]),
            );
        }
    }

    output
}

/// Gaussian blur with sigma 0.5 on the colour channels; alpha is kept.
pub fn denoise(img: RgbaImage) -> RgbaImage {
    let mut blurred = gaussian_blur_f32(&img, DENOISE_SIGMA);
    for (out, src) in blurred.pixels_mut().zip(img.pixels()) {
        out.0[3] = src.0[3];
    }
    blurred
}

/// Pixels brighter than 85% of the mean brightness become white, the rest black.
///
/// Brightness is the unweighted mean of R, G and B.
pub fn binarize(mut img: RgbaImage) -> RgbaImage {
    let pixel_count = u64::from(img.width()) * u64::from(img.height());
    if pixel_count == 0 {
        return img;
    }

    let total: f64 = img.pixels().map(brightness).sum();
    let threshold = total / pixel_count as f64 * BINARIZE_RATIO;
    debug!(threshold, "Binarization threshold computed");

    for pixel in img.pixels_mut() {
        *pixel = if brightness(pixel) > threshold {
            WHITE
        } else {
            BLACK
        };
    }

    img
}

fn brightness(pixel: &Rgba<u8>) -> f64 {
    let [r, g, b, _] = pixel.0;
    (f64::from(r) + f64::from(g) + f64::from(b)) / 3.0
}
