// THEORY:
// All fallible operations in the crate surface through a single `TraceError`
// enum. The taxonomy mirrors the three ways a capture can fail:
// 1.  **InvalidDimensions**: the input buffer has a zero or inconsistent shape.
//     Surfaced immediately; the caller must re-acquire a frame.
// 2.  **Preprocessing**: the capture could not be turned into a mask at all
//     (currently only decode/encode failures from the image glue).
// 3.  **InsufficientSamples / NoUsableSignal**: terminal outcomes of harmonic
//     synthesis. Deterministic for a given buffer, so there is no retriable
//     class anywhere in this core; retrying only makes sense with a new capture.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    /// The frame has a non-positive dimension or a data length that does not
    /// match `width × height × 4`.
    #[error("invalid frame dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// The capture could not be preprocessed into a trace mask.
    #[error("preprocessing error: {0}")]
    Preprocessing(String),

    /// Harmonic synthesis needs at least a handful of samples per cycle.
    #[error("insufficient samples for harmonic synthesis: got {got}, need {need}")]
    InsufficientSamples { got: usize, need: usize },

    /// The extracted waveform is silence (peak below epsilon); nothing to
    /// decompose. The caller should prompt for a new capture.
    #[error("no usable signal in extracted waveform")]
    NoUsableSignal,
}

impl From<image::ImageError> for TraceError {
    fn from(err: image::ImageError) -> Self {
        TraceError::Preprocessing(err.to_string())
    }
}
