// THEORY:
// The `pipeline` module is the top-level API for the whole trace engine. It
// chains the core stages into a single entry point — capture in, harmonic
// spectrum out — while also exposing each stage as a free function so hosts
// can run a partial chain (for example, preprocessing alone while the user
// adjusts the ROI).
//
// Data flows strictly left to right:
//
//   raw RGBA capture → binary trace mask → raw path → trimmed path
//                    → one-cycle waveform → harmonic coefficients
//
// No stage reaches back into an earlier stage's state; each consumes its
// input and produces a fresh value, so repeated calls are independent and a
// host may process separate captures in parallel.

use crate::core_modules::confidence::{self, TrimConfig};
use crate::core_modules::harmonics;
use crate::core_modules::postprocess::{self, PostProcessConfig};
use crate::core_modules::preprocess::{self, PreprocessConfig};
use crate::core_modules::trace_tracker::{self, ExtractionConfig};

// Re-export the data structures a consumer of the pipeline needs.
pub use crate::core_modules::confidence::Span;
pub use crate::core_modules::harmonics::HarmonicSpectrum;
pub use crate::core_modules::pixel_buffer::PixelBuffer;
pub use crate::core_modules::postprocess::Waveform;
pub use crate::core_modules::trace_tracker::TracePath;
pub use crate::error::TraceError;

/// Configuration for the full chain, one explicit options struct per stage.
/// No hidden globals: every tunable lives here.
#[derive(Debug, Clone, Default)]
pub struct TraceConfig {
    pub preprocess: PreprocessConfig,
    pub extraction: ExtractionConfig,
    pub trim: TrimConfig,
    pub postprocess: PostProcessConfig,
}

/// The finished result of one capture: the cleaned mask, the one-cycle
/// waveform and its harmonic decomposition.
#[derive(Debug, Clone)]
pub struct CaptureAnalysis {
    pub mask: PixelBuffer,
    pub waveform: Waveform,
    pub spectrum: HarmonicSpectrum,
}

/// The main, top-level struct for the trace engine.
pub struct TracePipeline {
    config: TraceConfig,
}

impl TracePipeline {
    pub fn new(config: TraceConfig) -> Self {
        Self { config }
    }

    /// Runs the full capture-to-spectrum chain.
    pub fn process(&self, buffer: PixelBuffer) -> Result<CaptureAnalysis, TraceError> {
        // Stage 1: Preprocessing — noisy capture to binary trace mask.
        let mask = preprocess(buffer, &self.config.preprocess)?;

        // Stage 2: Extraction — mask to a finite one-cycle waveform.
        let waveform = extract_waveform(
            &mask,
            &self.config.extraction,
            &self.config.trim,
            &self.config.postprocess,
        )
        .ok_or(TraceError::InvalidDimensions {
            width: mask.width(),
            height: mask.height(),
        })?;

        // Stage 3: Harmonic decomposition — waveform to oscillator coefficients.
        let spectrum = synthesize_harmonics(&waveform)?;

        log::debug!(
            "capture processed: {} columns, {} harmonics",
            waveform.len(),
            spectrum.harmonic_count()
        );
        Ok(CaptureAnalysis {
            mask,
            waveform,
            spectrum,
        })
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }
}

/// Turns a raw RGBA capture into a binary trace mask.
pub fn preprocess(
    buffer: PixelBuffer,
    config: &PreprocessConfig,
) -> Result<PixelBuffer, TraceError> {
    if buffer.width() == 0 || buffer.height() == 0 {
        return Err(TraceError::InvalidDimensions {
            width: buffer.width(),
            height: buffer.height(),
        });
    }
    Ok(preprocess::run(buffer, config))
}

/// Extracts the post-processed one-cycle waveform from a binary mask: tracks
/// the trace, trims to the best-supported span, maps to amplitudes and runs
/// the post-processing chain. Returns `None` on a zero-dimension mask.
pub fn extract_waveform(
    mask: &PixelBuffer,
    extraction: &ExtractionConfig,
    trim: &TrimConfig,
    postprocess_config: &PostProcessConfig,
) -> Option<Waveform> {
    if mask.width() == 0 || mask.height() == 0 {
        return None;
    }

    let raw_path = trace_tracker::track(mask, extraction);
    let trimmed = confidence::trim(&raw_path, mask, extraction.foreground_cutoff, trim);
    Some(postprocess::run(&trimmed, mask.height(), postprocess_config))
}

/// Decomposes a finite one-cycle waveform into harmonic coefficients.
pub fn synthesize_harmonics(waveform: &[f64]) -> Result<HarmonicSpectrum, TraceError> {
    harmonics::synthesize(waveform)
}
