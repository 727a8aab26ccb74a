// THEORY:
// The `trace_tracker` module walks the binary mask column by column and
// produces one y-position per column. It adds the notion of continuity to an
// otherwise per-column measurement: each column's search is centered on a
// position predicted from the columns before it.
//
// Key architectural principles:
// 1.  **Prediction**: the tracker carries the last two valid estimates as an
//     explicit rolling pair of optional scalars and linearly extrapolates the
//     next position from them. With only one valid estimate it predicts no
//     motion; with none it starts from the vertical center.
// 2.  **Banded search**: the brightness-weighted centroid is computed inside a
//     vertical band around the prediction, so off-trace noise elsewhere in the
//     column cannot pull the estimate. A sparse band falls back to a full
//     column search before giving up.
// 3.  **Discontinuity rejection**: an estimate far from the last valid one is
//     discarded rather than accepted, so a spurious bright spot cannot hijack
//     an established path. Prediction can propagate an early error; this
//     rejection is the safety valve for that trade-off.
//
// The output path always has exactly `width` entries; a column with no usable
// trace holds `None` rather than being dropped.

use crate::core_modules::pixel_buffer::PixelBuffer;

/// One y-coordinate (or no data) per column of the mask.
pub type TracePath = Vec<Option<u32>>;

/// Tunable parameters for trace extraction.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Intensity at/above which a pixel counts as part of the trace.
    pub foreground_cutoff: u8,
    /// Half-height of the vertical search band around the predicted position.
    pub band_half_width: u32,
    /// Minimum foreground pixels the band must hold before its centroid is
    /// trusted; below this the whole column is searched instead.
    pub min_foreground_count: u32,
    /// Maximum column-to-column movement before an estimate is rejected as a
    /// discontinuity.
    pub max_jump_px: f64,
    /// Radius of the final median filter over valid estimates.
    pub median_radius: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            foreground_cutoff: 128,
            band_half_width: 20,
            min_foreground_count: 2,
            max_jump_px: 24.0,
            median_radius: 2,
        }
    }
}

/// Tracks the trace across the full mask width, left to right.
pub fn track(mask: &PixelBuffer, config: &ExtractionConfig) -> TracePath {
    let width = mask.width();
    let height = mask.height();

    let mut raw: Vec<Option<f64>> = Vec::with_capacity(width as usize);
    // Rolling pair of the last two accepted estimates.
    let mut prev: Option<f64> = None;
    let mut prev2: Option<f64> = None;

    for x in 0..width {
        let predicted = match (prev, prev2) {
            (Some(p), Some(p2)) => p + (p - p2),
            (Some(p), None) => p,
            _ => height as f64 / 2.0,
        };

        let band_lo = (predicted - config.band_half_width as f64).max(0.0) as u32;
        let band_hi = (predicted + config.band_half_width as f64)
            .min(height as f64 - 1.0)
            .max(0.0) as u32;

        let mut estimate = band_centroid(mask, x, band_lo, band_hi, config);
        if estimate.is_none() {
            estimate = band_centroid(mask, x, 0, height - 1, config);
        }

        let accepted = match (estimate, prev) {
            (Some(est), Some(p)) if (est - p).abs() > config.max_jump_px => {
                // Spurious bright spot far from the established trace.
                None
            }
            (Some(est), _) => Some(est),
            (None, _) => None,
        };

        if let Some(est) = accepted {
            prev2 = prev;
            prev = Some(est);
        }
        raw.push(accepted);
    }

    median_filter_valid(&raw, config.median_radius)
}

/// Brightness-weighted centroid of foreground pixels in `column` between
/// `y_lo..=y_hi`. Returns `None` when fewer than `min_foreground_count`
/// foreground pixels support it.
fn band_centroid(
    mask: &PixelBuffer,
    column: u32,
    y_lo: u32,
    y_hi: u32,
    config: &ExtractionConfig,
) -> Option<f64> {
    let mut weight_sum = 0.0f64;
    let mut weighted_y = 0.0f64;
    let mut count = 0u32;

    for y in y_lo..=y_hi {
        let value = mask.gray(column, y);
        if value >= config.foreground_cutoff {
            let weight = value as f64 / 255.0;
            weight_sum += weight;
            weighted_y += weight * y as f64;
            count += 1;
        }
    }

    if count < config.min_foreground_count || weight_sum <= 0.0 {
        return None;
    }
    Some(weighted_y / weight_sum)
}

/// Median filter over valid estimates only, so sentinel gaps neither pull the
/// median nor get filled in. Rounds to integer pixel coordinates.
fn median_filter_valid(raw: &[Option<f64>], radius: usize) -> TracePath {
    let mut out = Vec::with_capacity(raw.len());
    for (i, value) in raw.iter().enumerate() {
        if value.is_none() {
            out.push(None);
            continue;
        }
        let lo = i.saturating_sub(radius);
        let hi = (i + radius).min(raw.len() - 1);
        let mut window: Vec<f64> = raw[lo..=hi].iter().filter_map(|v| *v).collect();
        window.sort_by(|a, b| a.total_cmp(b));
        let median = window[window.len() / 2];
        out.push(Some(median.round() as u32));
    }
    out
}
