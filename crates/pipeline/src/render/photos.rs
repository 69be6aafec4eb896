//! Photo preparation for print: decode, downscale, re-encode as JPEG.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::ExtendedColorType;
use unwritten_core::error::PipelineError;

use super::pdf::JpegImage;

/// Maximum print resolution kept for embedded photos.
pub const PRINT_PPI: f64 = 300.0;

const JPEG_QUALITY: u8 = 88;

/// Decode `bytes` and fit the result inside a `box_w_in` x `box_h_in` card
/// at [`PRINT_PPI`]. Smaller images are never upscaled.
///
/// Undecodable or unsupported input is a `Render` error.
pub fn prepare_photo(bytes: &[u8], box_w_in: f64, box_h_in: f64) -> Result<JpegImage, PipelineError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| PipelineError::Render(format!("Photo could not be decoded: {e}")))?;

    let max_w = (box_w_in * PRINT_PPI).ceil().max(1.0) as u32;
    let max_h = (box_h_in * PRINT_PPI).ceil().max(1.0) as u32;
    let fitted = if decoded.width() > max_w || decoded.height() > max_h {
        decoded.resize(max_w, max_h, FilterType::Lanczos3)
    } else {
        decoded
    };

    let rgb = fitted.to_rgb8();
    let mut data = Vec::new();
    JpegEncoder::new_with_quality(&mut data, JPEG_QUALITY)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| PipelineError::Render(format!("Photo could not be encoded: {e}")))?;

    Ok(JpegImage {
        width: rgb.width(),
        height: rgb.height(),
        data,
    })
}
