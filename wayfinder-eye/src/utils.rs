//! Utility functions for vision processing

use crate::error::{Result, VisionError};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::RgbImage;

const MAX_PIXELS: u64 = 100_000_000;

/// Decode an uploaded JPEG/PNG/... into an RGB frame.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage> {
    if bytes.is_empty() {
        return Err(VisionError::Processing("Image payload is empty".to_string()));
    }
    let image = image::load_from_memory(bytes)?;
    let pixels = u64::from(image.width()) * u64::from(image.height());
    if pixels == 0 || pixels > MAX_PIXELS {
        return Err(VisionError::Processing(format!(
            "Invalid image dimensions {}x{}",
            image.width(),
            image.height()
        )));
    }
    Ok(image.to_rgb8())
}

/// Encode a frame as JPEG.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    encoder.encode_image(image)?;
    Ok(buf)
}

/// Resize to the model input and lay out as a normalised CHW float tensor.
pub fn rgb_to_chw_tensor(image: &RgbImage, target_width: u32, target_height: u32) -> Result<Vec<f32>> {
    if target_width == 0 || target_height == 0 {
        return Err(VisionError::Processing("Target dimensions cannot be zero".to_string()));
    }
    let plane = u64::from(target_width) * u64::from(target_height);
    if plane * 3 > MAX_PIXELS {
        return Err(VisionError::Processing(
            "Target dimensions too large (max 100M elements)".to_string(),
        ));
    }

    let resized = if image.dimensions() == (target_width, target_height) {
        image.clone()
    } else {
        image::imageops::resize(image, target_width, target_height, FilterType::Triangle)
    };

    let plane = plane as usize;
    let mut chw = vec![0.0f32; plane * 3];
    for (i, pixel) in resized.pixels().enumerate() {
        for c in 0..3 {
            chw[c * plane + i] = f32::from(pixel[c]) / 255.0;
        }
    }
    Ok(chw)
}
