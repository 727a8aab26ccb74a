// THEORY:
// PNG glue at the edge of the core: decodes a capture file into a
// `PixelBuffer` and dumps a buffer back out, mainly for eyeballing the
// intermediate masks while tuning preprocessing. The core itself performs no
// I/O; everything here is optional convenience for hosts and tests.

use std::path::Path;

use image::{ExtendedColorType, ImageEncoder};

use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::error::TraceError;

/// Decodes an image file (any color type) into an RGBA `PixelBuffer`.
pub fn load_capture<P: AsRef<Path>>(path: P) -> Result<PixelBuffer, TraceError> {
    let img = image::open(path)?.to_rgba8();
    let (width, height) = img.dimensions();
    PixelBuffer::from_rgba(width, height, img.into_raw())
        .ok_or(TraceError::InvalidDimensions { width, height })
}

/// Encodes a buffer as a PNG file.
pub fn save_mask<P: AsRef<Path>>(path: P, buffer: &PixelBuffer) -> Result<(), TraceError> {
    let output =
        std::fs::File::create(path).map_err(|e| TraceError::Preprocessing(e.to_string()))?;
    let encoder = image::codecs::png::PngEncoder::new(output);
    encoder.write_image(
        buffer.data(),
        buffer.width(),
        buffer.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(())
}
