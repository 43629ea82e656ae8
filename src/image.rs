//! Image format sniffing, size validation, and optional compression.
//!
//! Format detection is content-based (magic bytes), never extension-based.
//! Only JPEG and PNG are accepted by the pipeline.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, ImageReader, Rgba, RgbaImage};

use crate::config::DetectorConfig;
use crate::error::PipelineError;

/// Accepted image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    /// MIME type sent to the vision API.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
        }
    }
}

/// Raw image bytes with their sniffed format.
///
/// Scoped to one extraction attempt; compression replaces the whole value
/// rather than mutating it.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub data: Vec<u8>,
    pub format: ImageKind,
}

/// Detect the image format from leading magic bytes.
///
/// Anything other than JPEG or PNG (or undetectable content) returns `None`.
pub fn sniff_format(data: &[u8]) -> Option<ImageKind> {
    match image::guess_format(data) {
        Ok(ImageFormat::Jpeg) => Some(ImageKind::Jpeg),
        Ok(ImageFormat::Png) => Some(ImageKind::Png),
        _ => None,
    }
}

/// Validate image content and size, format first.
pub fn validate_image(data: &[u8], config: &DetectorConfig) -> Result<ImageKind, PipelineError> {
    let kind = sniff_format(data).ok_or(PipelineError::InvalidFormat)?;

    let limit = config.max_image_size_bytes();
    if data.len() > limit {
        tracing::warn!(size = data.len(), limit, "image exceeds size limit");
        return Err(PipelineError::TooLarge {
            size: data.len(),
            limit,
        });
    }

    Ok(kind)
}

/// Re-encode an image for transmission if it is large enough to be worth it.
///
/// Skipped when compression is disabled or the image is already below the
/// configured threshold. Compression failures are non-fatal: the original
/// image is returned and the failure is only logged.
pub fn maybe_compress(image: RawImage, config: &DetectorConfig) -> RawImage {
    if !config.compress_images {
        return image;
    }

    let threshold = config.compress_threshold_bytes();
    if image.data.len() < threshold {
        tracing::debug!(
            size = image.data.len(),
            threshold,
            "image below compression threshold, skipping"
        );
        return image;
    }

    match compress(&image.data, config.compress_max_width) {
        Ok(data) => {
            tracing::debug!(
                before = image.data.len(),
                after = data.len(),
                "image compressed"
            );
            RawImage {
                data,
                format: ImageKind::Jpeg,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "image compression failed, using original");
            image
        }
    }
}

/// Decode, flatten to RGB on a white background, downscale, and re-encode
/// as quality-85 JPEG.
fn compress(data: &[u8], max_width: u32) -> Result<Vec<u8>, image::ImageError> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .decode()?;

    // Composite transparency onto white before dropping the alpha channel.
    let img = if img.color().has_alpha() {
        let mut background = RgbaImage::from_pixel(img.width(), img.height(), Rgba([255, 255, 255, 255]));
        imageops::overlay(&mut background, &img.to_rgba8(), 0, 0);
        DynamicImage::ImageRgba8(background).to_rgb8()
    } else {
        img.to_rgb8()
    };

    let img = if img.width() > max_width {
        let ratio = max_width as f64 / img.width() as f64;
        let height = ((img.height() as f64 * ratio) as u32).max(1);
        imageops::resize(&img, max_width, height, FilterType::Lanczos3)
    } else {
        img
    };

    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, 85);
    img.write_with_encoder(encoder)?;
    Ok(buf.into_inner())
}
