// THEORY:
// The statistics utility is a stateless helper shared by the contrast and
// binarization stages. It answers one question: "which grayscale value sits at
// rank p% over all pixels of this buffer?" Both consumers need the same
// rank-order semantics (sorted sample set, floor-indexed), so the collection
// and lookup live here rather than being duplicated per stage. It is a pure
// function of the buffer snapshot at call time.

use crate::core_modules::pixel_buffer::{Gray, PixelBuffer};

/// The grayscale value at percentile `p` (0..=100) over every pixel of the
/// buffer, using the red channel as the grayscale proxy. Collects one scalar
/// per pixel, sorts ascending and indexes at `floor(p/100 × (N−1))`.
pub fn percentile_value(buffer: &PixelBuffer, p: f64) -> Gray {
    let mut samples: Vec<Gray> = Vec::with_capacity((buffer.width() * buffer.height()) as usize);
    for y in 0..buffer.height() {
        for x in 0..buffer.width() {
            samples.push(buffer.gray(x, y));
        }
    }
    samples.sort_unstable();
    if samples.is_empty() {
        return 0;
    }

    let p = p.clamp(0.0, 100.0);
    let rank = (p / 100.0 * (samples.len() - 1) as f64).floor() as usize;
    samples[rank]
}
