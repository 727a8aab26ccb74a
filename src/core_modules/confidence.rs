// THEORY:
// Many captures carry a usable trace over only part of the width: a partially
// filled ROI, or a trace fading out at the edges. The `confidence` module
// scores how well the mask supports the tracked path at every column, then
// keeps the single best contiguous span and discards everything outside it —
// deliberately preferring "no data" at the edges over guessing.
//
// Key architectural principles:
// 1.  **Blended score**: per-column confidence mixes local foreground density
//     (how much mask evidence sits around the tracked point) with a
//     continuity term (how far the point moved since the last valid column),
//     weighted 3:1 in favor of density. Scores are clamped to [0, 1] and
//     smoothed with a moving average before span detection.
// 2.  **Hysteresis state machine**: span detection is an explicit two-state
//     machine (`Searching` / `InSpan`) with run-length counters, not nested
//     flags. Entering requires a run of columns above the high threshold
//     (start backdated to the run's beginning); leaving requires a run below
//     the low threshold (end backdated to before it). A span still open at the
//     last column closes at the right edge.
// 3.  **Graceful abandonment**: if the longest span misses the length floor,
//     or keeps too few valid columns, the trim is abandoned and the original
//     path returned unchanged — an unreliable full-width result beats an
//     overly aggressive, possibly empty, trim.

use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::core_modules::trace_tracker::TracePath;

/// Per-column reliability scores, clamped to [0, 1]. Ephemeral: scoped to one
/// span-selection pass.
pub type ConfidenceProfile = Vec<f64>;

/// A half-open contiguous column interval judged to contain a reliable trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, column: usize) -> bool {
        column >= self.start && column < self.end
    }
}

/// Tunable parameters for confidence scoring and span selection.
#[derive(Debug, Clone)]
pub struct TrimConfig {
    /// Radius of the square mask window sampled around the tracked point for
    /// the density term.
    pub density_window_radius: u32,
    /// Column-to-column movement at which the continuity term bottoms out.
    pub continuity_max_delta: f64,
    /// Radius of the moving average applied to the raw confidence profile.
    pub smoothing_radius: usize,
    /// Smoothed confidence at/above which a column counts toward entering a span.
    pub high_threshold: f64,
    /// Smoothed confidence at/below which a column counts toward leaving a span.
    pub low_threshold: f64,
    /// Consecutive high columns required to open a span.
    pub enter_run: usize,
    /// Consecutive low columns required to close a span.
    pub exit_run: usize,
    /// Absolute floor on the kept span length, in columns.
    pub min_span_columns: usize,
    /// Width-relative floor on the kept span length.
    pub min_span_ratio: f64,
    /// Minimum valid (non-sentinel) columns the kept span must retain.
    pub min_valid_columns: usize,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            density_window_radius: 2,
            continuity_max_delta: 12.0,
            smoothing_radius: 1,
            high_threshold: 0.3,
            low_threshold: 0.2,
            enter_run: 4,
            exit_run: 6,
            min_span_columns: 24,
            min_span_ratio: 0.25,
            min_valid_columns: 16,
        }
    }
}

const DENSITY_WEIGHT: f64 = 0.75;
const CONTINUITY_WEIGHT: f64 = 0.25;
/// Continuity score assigned before any valid column has been seen.
const DEFAULT_CONTINUITY: f64 = 0.7;

/// Trims the path to its best-supported contiguous span, or returns it
/// unchanged when no span meets the floors.
pub fn trim(
    path: &TracePath,
    mask: &PixelBuffer,
    foreground_cutoff: u8,
    config: &TrimConfig,
) -> TracePath {
    let width = path.len();
    if width == 0 {
        return path.clone();
    }

    let profile = score_columns(path, mask, foreground_cutoff, config);
    let smoothed = moving_average(&profile, config.smoothing_radius);
    let spans = detect_spans(&smoothed, config);

    let span_floor = config
        .min_span_columns
        .max((config.min_span_ratio * width as f64) as usize);
    let best = spans.into_iter().max_by_key(Span::len);

    let Some(span) = best.filter(|s| s.len() >= span_floor) else {
        log::debug!("no span meets the {span_floor}-column floor; keeping untrimmed path");
        return path.clone();
    };

    let kept_valid = path[span.start..span.end]
        .iter()
        .filter(|v| v.is_some())
        .count();
    if kept_valid < config.min_valid_columns {
        log::debug!(
            "span {}..{} retains only {kept_valid} valid columns; keeping untrimmed path",
            span.start,
            span.end
        );
        return path.clone();
    }

    path.iter()
        .enumerate()
        .map(|(x, v)| if span.contains(x) { *v } else { None })
        .collect()
}

/// Raw per-column confidence: `0.75 × density + 0.25 × continuity`, zero for
/// sentinel columns.
fn score_columns(
    path: &TracePath,
    mask: &PixelBuffer,
    foreground_cutoff: u8,
    config: &TrimConfig,
) -> ConfidenceProfile {
    let mut profile = Vec::with_capacity(path.len());
    let mut prev_valid_y: Option<u32> = None;

    for (x, entry) in path.iter().enumerate() {
        let Some(y) = *entry else {
            profile.push(0.0);
            continue;
        };

        let density = local_density(mask, x as u32, y, config.density_window_radius, foreground_cutoff);
        let continuity = match prev_valid_y {
            Some(prev) => {
                let delta = (y as f64 - prev as f64).abs();
                1.0 - (delta / config.continuity_max_delta).min(1.0)
            }
            None => DEFAULT_CONTINUITY,
        };
        prev_valid_y = Some(y);

        let score = DENSITY_WEIGHT * density + CONTINUITY_WEIGHT * continuity;
        profile.push(score.clamp(0.0, 1.0));
    }
    profile
}

/// Foreground fraction of the clamped square window around `(x, y)`.
fn local_density(mask: &PixelBuffer, x: u32, y: u32, radius: u32, cutoff: u8) -> f64 {
    let r = radius as i64;
    let mut foreground = 0u32;
    let mut total = 0u32;
    for dy in -r..=r {
        for dx in -r..=r {
            let nx = (x as i64 + dx).clamp(0, mask.width() as i64 - 1) as u32;
            let ny = (y as i64 + dy).clamp(0, mask.height() as i64 - 1) as u32;
            if mask.is_foreground(nx, ny, cutoff) {
                foreground += 1;
            }
            total += 1;
        }
    }
    foreground as f64 / total as f64
}

fn moving_average(profile: &[f64], radius: usize) -> ConfidenceProfile {
    if radius == 0 {
        return profile.to_vec();
    }
    let mut out = Vec::with_capacity(profile.len());
    for i in 0..profile.len() {
        let lo = i.saturating_sub(radius);
        let hi = (i + radius).min(profile.len() - 1);
        let window = &profile[lo..=hi];
        out.push(window.iter().sum::<f64>() / window.len() as f64);
    }
    out
}

/// Explicit hysteresis state for span detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpanState {
    Searching,
    InSpan,
}

/// Scans the smoothed confidence profile and returns every closed span.
fn detect_spans(smoothed: &[f64], config: &TrimConfig) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut state = SpanState::Searching;
    let mut high_run = 0usize;
    let mut low_run = 0usize;
    // Backdated span start while in `InSpan`.
    let mut span_start = 0usize;

    for (x, &score) in smoothed.iter().enumerate() {
        match state {
            SpanState::Searching => {
                if score >= config.high_threshold {
                    high_run += 1;
                    if high_run >= config.enter_run {
                        state = SpanState::InSpan;
                        span_start = x + 1 - high_run;
                        low_run = 0;
                    }
                } else {
                    high_run = 0;
                }
            }
            SpanState::InSpan => {
                if score <= config.low_threshold {
                    low_run += 1;
                    if low_run >= config.exit_run {
                        // End backdated to before the low run.
                        spans.push(Span {
                            start: span_start,
                            end: x + 1 - low_run,
                        });
                        state = SpanState::Searching;
                        high_run = 0;
                    }
                } else {
                    low_run = 0;
                }
            }
        }
    }

    // A span still open at the last column closes at the right edge.
    if state == SpanState::InSpan {
        spans.push(Span {
            start: span_start,
            end: smoothed.len(),
        });
    }
    spans
}
