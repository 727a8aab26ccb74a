// THEORY:
// The preprocessing pipeline turns a noisy RGBA capture into a clean binary
// trace mask. It is a strict chain of six stages, each one a pure function
// consuming the previous stage's buffer and producing a fresh one:
//
//   grayscale → denoise → illumination flattening → contrast normalization
//             → adaptive binarization → mask cleanup
//
// Key architectural principles:
// 1.  **Stage isolation**: no stage ever reads a partially-updated buffer.
//     Every neighborhood operation reads the complete output of the stage
//     before it, which keeps each stage independently testable on a small
//     synthetic buffer.
// 2.  **Polarity inversion by construction**: the flattening stage subtracts
//     the source from a local background estimate, so a dark trace on a bright
//     photographed background becomes a bright signal on a flat near-bias
//     background, independent of large-scale lighting gradients.
// 3.  **Percentile adaptivity**: both the contrast stretch and the final
//     threshold are rank-order statistics, so the pipeline adapts to trace
//     density without any fixed absolute cutoff.
//
// Edge policy everywhere: neighborhoods clamp-extend to the buffer bounds —
// never wrap, never treat out-of-bounds as zero.

use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::core_modules::stats::percentile_value;

/// Tunable parameters for the preprocessing chain. Defaults are calibrated for
/// a hand-held photo of a dark trace on a lighter background.
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Side length of the denoise box kernel (odd; 3 means a 3×3 mean).
    pub denoise_kernel_size: u32,
    /// Radius of the box blur used to estimate the local background.
    pub background_kernel_radius: u32,
    /// Constant added after flattening so the background sits near this level.
    pub flatten_bias: u8,
    /// Lower percentile of the contrast stretch.
    pub contrast_low_percentile: f64,
    /// Upper percentile of the contrast stretch.
    pub contrast_high_percentile: f64,
    /// Global percentile used as the binarization threshold.
    pub adaptive_threshold_percentile: f64,
    /// Minimum foreground neighbors (of 8) a foreground pixel needs to survive
    /// isolated-pixel suppression.
    pub min_isolated_neighbor_count: u32,
    /// Minimum foreground cells (of 9, center included) for the erode stage to
    /// keep a pixel foreground.
    pub erode_min_foreground_count: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            denoise_kernel_size: 3,
            background_kernel_radius: 12,
            flatten_bias: 8,
            contrast_low_percentile: 2.0,
            contrast_high_percentile: 98.0,
            adaptive_threshold_percentile: 96.0,
            min_isolated_neighbor_count: 2,
            erode_min_foreground_count: 5,
        }
    }
}

/// Runs the full six-stage chain.
pub fn run(buffer: PixelBuffer, config: &PreprocessConfig) -> PixelBuffer {
    let gray = grayscale(buffer);
    let denoised = box_blur(&gray, config.denoise_kernel_size / 2);
    let flattened = flatten_illumination(
        &denoised,
        config.background_kernel_radius,
        config.flatten_bias,
    );
    let stretched = normalize_contrast(
        flattened,
        config.contrast_low_percentile,
        config.contrast_high_percentile,
    );
    let mask = binarize(&stretched, config.adaptive_threshold_percentile);
    cleanup_mask(
        &mask,
        config.min_isolated_neighbor_count,
        config.erode_min_foreground_count,
    )
}

/// Stage 1: Rec. 601 luma written to all three channels, alpha forced opaque.
/// Idempotent: running it twice equals running it once.
pub fn grayscale(buffer: PixelBuffer) -> PixelBuffer {
    let mut out = PixelBuffer::blank(buffer.width(), buffer.height());
    for y in 0..buffer.height() {
        for x in 0..buffer.width() {
            let (r, g, b, _) = buffer.rgba(x, y);
            let luma = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
            out.set_gray(x, y, luma.round() as u8);
        }
    }
    out
}

/// Stage 2 (and the background estimator of stage 3): mean over the
/// `(2·radius+1)²` neighborhood with coordinates clamped to the buffer bounds.
pub fn box_blur(buffer: &PixelBuffer, radius: u32) -> PixelBuffer {
    if radius == 0 {
        return buffer.clone();
    }
    let r = radius as i64;
    let mut out = PixelBuffer::blank(buffer.width(), buffer.height());
    for y in 0..buffer.height() {
        for x in 0..buffer.width() {
            let mut sum = 0u64;
            let mut count = 0u64;
            for dy in -r..=r {
                for dx in -r..=r {
                    let nx = (x as i64 + dx).clamp(0, buffer.width() as i64 - 1) as u32;
                    let ny = (y as i64 + dy).clamp(0, buffer.height() as i64 - 1) as u32;
                    sum += buffer.gray(nx, ny) as u64;
                    count += 1;
                }
            }
            out.set_gray(x, y, (sum as f64 / count as f64).round() as u8);
        }
    }
    out
}

/// Stage 3: estimate a local background, keep only the darker-than-background
/// response and re-bias it. Inverts polarity: a dark trace on a locally bright
/// background comes out as a bright signal on a flat near-`bias` background.
pub fn flatten_illumination(buffer: &PixelBuffer, radius: u32, bias: u8) -> PixelBuffer {
    let background = box_blur(buffer, radius);
    let mut out = PixelBuffer::blank(buffer.width(), buffer.height());
    for y in 0..buffer.height() {
        for x in 0..buffer.width() {
            let dark_response =
                (background.gray(x, y) as i32 - buffer.gray(x, y) as i32).max(0);
            let value = (dark_response + bias as i32).clamp(0, 255) as u8;
            out.set_gray(x, y, value);
        }
    }
    out
}

/// Stage 4: linear stretch between the low/high percentiles. A blank frame
/// (range under one gray level) passes through unchanged rather than dividing
/// by a vanishing range.
pub fn normalize_contrast(buffer: PixelBuffer, low_pct: f64, high_pct: f64) -> PixelBuffer {
    let low = percentile_value(&buffer, low_pct) as f64;
    let high = percentile_value(&buffer, high_pct) as f64;
    if high - low < 1.0 {
        log::debug!(
            "contrast range {:.1} below one gray level; passing frame through",
            high - low
        );
        return buffer;
    }

    let mut out = PixelBuffer::blank(buffer.width(), buffer.height());
    for y in 0..buffer.height() {
        for x in 0..buffer.width() {
            let scaled = (buffer.gray(x, y) as f64 - low) / (high - low) * 255.0;
            out.set_gray(x, y, scaled.clamp(0.0, 255.0).round() as u8);
        }
    }
    out
}

/// Stage 5: single global percentile threshold. The flattening stage leaves
/// the trace in the brightest few percent of pixels, so a rank threshold
/// adapts to trace density automatically.
pub fn binarize(buffer: &PixelBuffer, threshold_percentile: f64) -> PixelBuffer {
    let threshold = percentile_value(buffer, threshold_percentile);
    let mut out = PixelBuffer::blank(buffer.width(), buffer.height());
    for y in 0..buffer.height() {
        for x in 0..buffer.width() {
            let value = if buffer.gray(x, y) >= threshold { 255 } else { 0 };
            out.set_gray(x, y, value);
        }
    }
    out
}

/// Stage 6: suppress isolated pixels, then dilate, then erode. Fixed order,
/// each sub-stage reading only the complete output of the previous one.
pub fn cleanup_mask(
    mask: &PixelBuffer,
    min_isolated_neighbor_count: u32,
    erode_min_foreground_count: u32,
) -> PixelBuffer {
    let suppressed = suppress_isolated(mask, min_isolated_neighbor_count);
    let dilated = dilate(&suppressed);
    erode(&dilated, erode_min_foreground_count)
}

/// Counts foreground cells in the 3×3 neighborhood of `(x, y)`, coordinates
/// clamped to bounds. `include_center` distinguishes the 8-neighbor count used
/// by suppression from the 9-cell count used by dilate/erode.
fn neighborhood_foreground(mask: &PixelBuffer, x: u32, y: u32, include_center: bool) -> u32 {
    let mut count = 0;
    for dy in -1i64..=1 {
        for dx in -1i64..=1 {
            if !include_center && dx == 0 && dy == 0 {
                continue;
            }
            let nx = (x as i64 + dx).clamp(0, mask.width() as i64 - 1) as u32;
            let ny = (y as i64 + dy).clamp(0, mask.height() as i64 - 1) as u32;
            if mask.gray(nx, ny) > 0 {
                count += 1;
            }
        }
    }
    count
}

fn suppress_isolated(mask: &PixelBuffer, min_neighbors: u32) -> PixelBuffer {
    let mut out = PixelBuffer::blank(mask.width(), mask.height());
    for y in 0..mask.height() {
        for x in 0..mask.width() {
            let keep = mask.gray(x, y) > 0
                && neighborhood_foreground(mask, x, y, false) >= min_neighbors;
            out.set_gray(x, y, if keep { 255 } else { 0 });
        }
    }
    out
}

fn dilate(mask: &PixelBuffer) -> PixelBuffer {
    let mut out = PixelBuffer::blank(mask.width(), mask.height());
    for y in 0..mask.height() {
        for x in 0..mask.width() {
            let foreground = neighborhood_foreground(mask, x, y, true) > 0;
            out.set_gray(x, y, if foreground { 255 } else { 0 });
        }
    }
    out
}

fn erode(mask: &PixelBuffer, min_foreground: u32) -> PixelBuffer {
    let mut out = PixelBuffer::blank(mask.width(), mask.height());
    for y in 0..mask.height() {
        for x in 0..mask.width() {
            let foreground = neighborhood_foreground(mask, x, y, true) >= min_foreground;
            out.set_gray(x, y, if foreground { 255 } else { 0 });
        }
    }
    out
}
