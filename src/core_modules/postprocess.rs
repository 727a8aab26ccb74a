// THEORY:
// The post-processor turns the trimmed path into a finite, loopable one-cycle
// amplitude sequence. Its stages run in a fixed order, mutating the sequence
// in place:
//
//   amplitude mapping → gap interpolation → zero-fill + DC centering
//                     → endpoint anchoring → zero-crossing phase alignment
//
// Gap interpolation only fills runs bracketed by valid samples on both sides;
// an open-ended run at either edge has nothing to interpolate toward and is
// left for the zero-fill. Endpoint anchoring subtracts the linear ramp between
// the first and last sample so the cycle closes seamlessly; it is re-applied
// after phase rotation because rotation can reintroduce an endpoint step.

use crate::core_modules::trace_tracker::TracePath;

/// One amplitude sample per column, in roughly [-1, 1]. `NaN` marks a column
/// with no data until the zero-fill stage; finite everywhere afterwards.
pub type Waveform = Vec<f64>;

#[derive(Debug, Clone)]
pub struct PostProcessConfig {
    /// Longest missing run (in columns) that gap interpolation will fill.
    pub interpolation_max_gap: usize,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            interpolation_max_gap: 30,
        }
    }
}

/// Maps the path into amplitudes and runs the full post-processing chain.
pub fn run(path: &TracePath, height: u32, config: &PostProcessConfig) -> Waveform {
    let mut wave = amplitudes(path, height);
    interpolate_gaps(&mut wave, config.interpolation_max_gap);
    center_dc(&mut wave);
    anchor_endpoints(&mut wave);
    align_phase(&mut wave);
    wave
}

/// `amplitude = 1 − 2·y/height`; sentinel columns become `NaN`.
pub fn amplitudes(path: &TracePath, height: u32) -> Waveform {
    path.iter()
        .map(|entry| match entry {
            Some(y) => 1.0 - 2.0 * *y as f64 / height as f64,
            None => f64::NAN,
        })
        .collect()
}

/// Linearly fills every maximal missing run of length ≤ `max_gap` that sits
/// strictly between two valid samples. Longer or unbracketed runs stay `NaN`.
pub fn interpolate_gaps(wave: &mut Waveform, max_gap: usize) {
    let mut i = 0;
    while i < wave.len() {
        if !wave[i].is_nan() {
            i += 1;
            continue;
        }
        // Maximal missing run [i, j).
        let mut j = i;
        while j < wave.len() && wave[j].is_nan() {
            j += 1;
        }
        let run = j - i;
        let bracketed = i > 0 && j < wave.len();
        if bracketed && run <= max_gap {
            let left = wave[i - 1];
            let right = wave[j];
            for (k, slot) in (0..run).zip(i..j) {
                let t = (k + 1) as f64 / (run + 1) as f64;
                wave[slot] = left + (right - left) * t;
            }
        }
        i = j;
    }
}

/// Zero-fills any remaining missing samples, then removes the mean.
pub fn center_dc(wave: &mut Waveform) {
    for sample in wave.iter_mut() {
        if sample.is_nan() {
            *sample = 0.0;
        }
    }
    if wave.is_empty() {
        return;
    }
    let mean = wave.iter().sum::<f64>() / wave.len() as f64;
    for sample in wave.iter_mut() {
        *sample -= mean;
    }
}

/// Subtracts the linear ramp between the first and last sample, removing net
/// drift so the sequence loops seamlessly.
pub fn anchor_endpoints(wave: &mut Waveform) {
    let n = wave.len();
    if n < 2 {
        return;
    }
    let first = wave[0];
    let last = wave[n - 1];
    for (i, sample) in wave.iter_mut().enumerate() {
        let ramp = first + (last - first) * i as f64 / (n - 1) as f64;
        *sample -= ramp;
    }
}

/// Rotates the sequence so it starts at the earliest rising zero-crossing
/// (falling back to the globally closest-to-zero sample), then re-anchors the
/// endpoints.
pub fn align_phase(wave: &mut Waveform) {
    let n = wave.len();
    if n < 2 {
        return;
    }

    let start = match rising_crossing(wave) {
        Some(i) => {
            // Whichever bracketing sample is closer to zero becomes index 0.
            if wave[i].abs() <= wave[i + 1].abs() {
                i
            } else {
                i + 1
            }
        }
        None => {
            log::debug!("no rising zero-crossing; rotating to the closest-to-zero sample");
            closest_to_zero(wave)
        }
    };

    wave.rotate_left(start);
    anchor_endpoints(wave);
}

/// Index of the earliest sample `≤ 0` immediately followed by one `≥ 0`.
fn rising_crossing(wave: &[f64]) -> Option<usize> {
    wave.windows(2)
        .position(|pair| pair[0] <= 0.0 && pair[1] >= 0.0)
}

fn closest_to_zero(wave: &[f64]) -> usize {
    let mut best = 0;
    for (i, sample) in wave.iter().enumerate() {
        if sample.abs() < wave[best].abs() {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::TAU;

    #[test]
    fn amplitudes_map_top_to_plus_one_and_sentinels_to_nan() {
        let path: TracePath = vec![Some(0), Some(50), None, Some(100)];
        let wave = amplitudes(&path, 100);
        assert_abs_diff_eq!(wave[0], 1.0);
        assert_abs_diff_eq!(wave[1], 0.0);
        assert!(wave[2].is_nan());
        assert_abs_diff_eq!(wave[3], -1.0);
    }

    #[test]
    fn bracketed_gaps_fill_linearly() {
        let mut wave = vec![0.0, f64::NAN, f64::NAN, f64::NAN, 1.0];
        interpolate_gaps(&mut wave, 30);
        assert_abs_diff_eq!(wave[1], 0.25);
        assert_abs_diff_eq!(wave[2], 0.5);
        assert_abs_diff_eq!(wave[3], 0.75);
    }

    #[test]
    fn gaps_longer_than_the_limit_stay_missing() {
        let mut wave = vec![0.0, f64::NAN, f64::NAN, f64::NAN, 1.0];
        interpolate_gaps(&mut wave, 2);
        assert!(wave[1].is_nan());
        assert!(wave[3].is_nan());
    }

    #[test]
    fn edge_gaps_are_never_interpolated() {
        let mut wave = vec![f64::NAN, f64::NAN, 0.5, 0.5, f64::NAN];
        interpolate_gaps(&mut wave, 30);
        assert!(wave[0].is_nan());
        assert!(wave[1].is_nan());
        assert!(wave[4].is_nan());
    }

    #[test]
    fn centering_zero_fills_and_removes_the_mean() {
        let mut wave = vec![1.0, f64::NAN, 1.0, 1.0];
        center_dc(&mut wave);
        let mean: f64 = wave.iter().sum::<f64>() / wave.len() as f64;
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(wave[1], -0.75);
    }

    #[test]
    fn anchoring_zeroes_both_endpoints() {
        let mut wave = vec![0.3, 0.9, -0.2, 0.7];
        anchor_endpoints(&mut wave);
        assert_abs_diff_eq!(wave[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(*wave.last().unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn full_chain_on_a_clean_sine_closes_the_loop_with_zero_mean() {
        let n = 128u32;
        // A sine rendered back into pixel rows, then pushed through the chain.
        let path: TracePath = (0..n)
            .map(|x| {
                let s = (TAU * x as f64 / n as f64).sin();
                Some(((1.0 - s) / 2.0 * 99.0).round() as u32)
            })
            .collect();
        let wave = run(&path, 100, &PostProcessConfig::default());

        assert_eq!(wave.len(), n as usize);
        assert!(wave.iter().all(|s| s.is_finite()));
        assert_abs_diff_eq!(wave[0], *wave.last().unwrap(), epsilon = 1e-9);
        let mean: f64 = wave.iter().sum::<f64>() / wave.len() as f64;
        assert_abs_diff_eq!(mean, 0.0, epsilon = 0.05);
    }

    #[test]
    fn phase_alignment_starts_at_a_rising_crossing() {
        let n = 64;
        let mut wave: Waveform = (0..n)
            .map(|i| (TAU * i as f64 / n as f64 + 2.5).sin())
            .collect();
        align_phase(&mut wave);
        // Anchored start plus a rising first step.
        assert_abs_diff_eq!(wave[0], 0.0, epsilon = 1e-12);
        assert!(wave[1] > wave[0]);
    }
}
