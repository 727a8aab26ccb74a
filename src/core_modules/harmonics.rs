// THEORY:
// The harmonic synthesizer converts the finite one-cycle sample sequence into
// a bounded set of sine/cosine coefficients for a periodic oscillator. It is a
// direct Fourier-series projection: for a capture of a few hundred to a few
// thousand columns and at most 128 harmonics, the O(N·H) trigonometric loop is
// plenty and keeps the stage dependency-free.
//
// The input is peak-normalized first — attenuated when the peak exceeds 1,
// never amplified — so downstream playback cannot clip. An all-zero sequence
// is a valid, detectable terminal state (`NoUsableSignal`), not a panic: a
// perfectly flat trace maps to silence after DC centering.

use crate::error::TraceError;

/// Number of samples below which no meaningful decomposition exists.
const MIN_SAMPLES: usize = 4;
/// Upper bound on the harmonic count regardless of sequence length.
const MAX_HARMONICS: usize = 128;
/// Peaks below this are treated as silence.
const SILENCE_EPSILON: f64 = 1e-6;

/// Cosine/sine coefficient pairs for one waveform cycle. Index 0 of both
/// arrays is unused and stays zero (DC is removed upstream); indices
/// `1..=harmonic_count` carry the decomposition. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct HarmonicSpectrum {
    pub cos: Vec<f64>,
    pub sin: Vec<f64>,
}

impl HarmonicSpectrum {
    /// Highest harmonic index carrying a coefficient.
    pub fn harmonic_count(&self) -> usize {
        self.cos.len().saturating_sub(1)
    }

    /// Reconstructs the cycle value at phase `t ∈ [0, 1)` — the oscillator
    /// side of the contract, handy for tests and previews.
    pub fn evaluate(&self, t: f64) -> f64 {
        let mut value = 0.0;
        for h in 1..self.cos.len() {
            let angle = std::f64::consts::TAU * h as f64 * t;
            value += self.cos[h] * angle.cos() + self.sin[h] * angle.sin();
        }
        value
    }
}

/// Decomposes one waveform cycle into harmonic coefficients.
///
/// Fails with `InsufficientSamples` below [`MIN_SAMPLES`] and with
/// `NoUsableSignal` when the peak amplitude is below the silence epsilon.
pub fn synthesize(waveform: &[f64]) -> Result<HarmonicSpectrum, TraceError> {
    let n = waveform.len();
    if n < MIN_SAMPLES {
        return Err(TraceError::InsufficientSamples {
            got: n,
            need: MIN_SAMPLES,
        });
    }

    let harmonic_count = MAX_HARMONICS.min(n / 2);
    if harmonic_count < 1 {
        return Err(TraceError::InsufficientSamples {
            got: n,
            need: MIN_SAMPLES,
        });
    }

    let normalized = peak_normalize(waveform)?;

    let mut cos = vec![0.0; harmonic_count + 1];
    let mut sin = vec![0.0; harmonic_count + 1];
    let scale = 2.0 / n as f64;
    for h in 1..=harmonic_count {
        let mut cos_sum = 0.0;
        let mut sin_sum = 0.0;
        for (i, &sample) in normalized.iter().enumerate() {
            let angle = std::f64::consts::TAU * h as f64 * i as f64 / n as f64;
            cos_sum += sample * angle.cos();
            sin_sum += sample * angle.sin();
        }
        cos[h] = scale * cos_sum;
        sin[h] = scale * sin_sum;
    }

    Ok(HarmonicSpectrum { cos, sin })
}

/// Scales the sequence down by its peak when the peak exceeds 1; never
/// amplifies. A near-zero peak is silence.
fn peak_normalize(waveform: &[f64]) -> Result<Vec<f64>, TraceError> {
    let peak = waveform.iter().fold(0.0f64, |acc, s| acc.max(s.abs()));
    if peak < SILENCE_EPSILON {
        return Err(TraceError::NoUsableSignal);
    }
    if peak > 1.0 {
        Ok(waveform.iter().map(|s| s / peak).collect())
    } else {
        Ok(waveform.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::TAU;

    fn sine(n: usize, harmonic: usize, amplitude: f64) -> Vec<f64> {
        (0..n)
            .map(|i| amplitude * (TAU * harmonic as f64 * i as f64 / n as f64).sin())
            .collect()
    }

    #[test]
    fn pure_fundamental_lands_entirely_in_sin_1() {
        let spectrum = synthesize(&sine(128, 1, 0.8)).unwrap();
        assert_abs_diff_eq!(spectrum.sin[1], 0.8, epsilon = 1e-9);
        for h in 1..=spectrum.harmonic_count() {
            assert_abs_diff_eq!(spectrum.cos[h], 0.0, epsilon = 1e-9);
            if h != 1 {
                assert_abs_diff_eq!(spectrum.sin[h], 0.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn third_harmonic_lands_in_sin_3() {
        let spectrum = synthesize(&sine(256, 3, 0.5)).unwrap();
        assert_abs_diff_eq!(spectrum.sin[3], 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(spectrum.sin[1], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn index_zero_stays_empty() {
        let spectrum = synthesize(&sine(64, 1, 1.0)).unwrap();
        assert_eq!(spectrum.cos[0], 0.0);
        assert_eq!(spectrum.sin[0], 0.0);
    }

    #[test]
    fn harmonic_count_is_bounded_by_half_length_and_128() {
        let short = synthesize(&sine(20, 1, 1.0)).unwrap();
        assert_eq!(short.harmonic_count(), 10);
        let long = synthesize(&sine(1024, 1, 1.0)).unwrap();
        assert_eq!(long.harmonic_count(), 128);
    }

    #[test]
    fn hot_input_is_attenuated_to_unit_peak() {
        let spectrum = synthesize(&sine(128, 1, 2.0)).unwrap();
        assert_abs_diff_eq!(spectrum.sin[1], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn quiet_input_is_not_amplified() {
        let spectrum = synthesize(&sine(128, 1, 0.3)).unwrap();
        assert_abs_diff_eq!(spectrum.sin[1], 0.3, epsilon = 1e-9);
    }

    #[test]
    fn silence_is_a_detectable_terminal_state() {
        let result = synthesize(&[0.0; 64]);
        assert!(matches!(result, Err(TraceError::NoUsableSignal)));
    }

    #[test]
    fn too_few_samples_fail() {
        let result = synthesize(&[0.5, -0.5, 0.5]);
        assert!(matches!(
            result,
            Err(TraceError::InsufficientSamples { got: 3, need: 4 })
        ));
    }

    #[test]
    fn reconstruction_matches_the_input_cycle() {
        let n = 128;
        let input = sine(n, 2, 0.6);
        let spectrum = synthesize(&input).unwrap();
        for (i, &expected) in input.iter().enumerate() {
            let value = spectrum.evaluate(i as f64 / n as f64);
            assert_abs_diff_eq!(value, expected, epsilon = 1e-6);
        }
    }
}
