// End-to-end scenarios over the public pipeline API: synthetic masks and
// captures in, waveforms and spectra out.

use approx::assert_abs_diff_eq;
use std::f64::consts::TAU;

use wavetrace::core_modules::confidence::TrimConfig;
use wavetrace::core_modules::postprocess::PostProcessConfig;
use wavetrace::core_modules::trace_tracker::ExtractionConfig;
use wavetrace::{
    PixelBuffer, TraceConfig, TraceError, TracePipeline, extract_waveform, preprocess,
    synthesize_harmonics,
};

/// A binary mask with a trace line of the given thickness centered on
/// `y_of_x`, drawn only for the columns where it returns `Some`.
fn line_mask(
    width: u32,
    height: u32,
    thickness: u32,
    y_of_x: impl Fn(u32) -> Option<u32>,
) -> PixelBuffer {
    let mut mask = PixelBuffer::blank(width, height);
    for x in 0..width {
        if let Some(yc) = y_of_x(x) {
            let half = thickness / 2;
            for y in yc.saturating_sub(half)..=(yc + half).min(height - 1) {
                mask.set_gray(x, y, 255);
            }
        }
    }
    mask
}

fn extract_with_defaults(mask: &PixelBuffer) -> Option<Vec<f64>> {
    extract_waveform(
        mask,
        &ExtractionConfig::default(),
        &TrimConfig::default(),
        &PostProcessConfig::default(),
    )
}

#[test]
fn flat_horizontal_line_is_silence() {
    // A clean horizontal line at y=32 across the full width: constant
    // amplitude, zero after DC centering, so harmonic synthesis must report
    // that there is nothing to play.
    let mask = line_mask(64, 64, 3, |_| Some(32));
    let waveform = extract_with_defaults(&mask).expect("mask has valid dimensions");

    assert_eq!(waveform.len(), 64);
    for &sample in &waveform {
        assert_abs_diff_eq!(sample, 0.0, epsilon = 1e-12);
    }
    assert!(matches!(
        synthesize_harmonics(&waveform),
        Err(TraceError::NoUsableSignal)
    ));
}

#[test]
fn open_ended_edge_gaps_are_zero_filled_not_interpolated() {
    // Foreground absent for columns 0–9 and 90–99. Those runs have no valid
    // sample on their outer side, so interpolation must not touch them; they
    // end up as the zero-filled level while the supported span keeps its
    // amplitude.
    let mask = line_mask(100, 64, 3, |x| (10..90).contains(&x).then_some(20));
    let waveform = extract_with_defaults(&mask).expect("mask has valid dimensions");

    assert_eq!(waveform.len(), 100);
    let expected = 1.0 - 2.0 * 20.0 / 64.0; // 0.375
    let at_level = waveform
        .iter()
        .filter(|s| (**s - expected).abs() < 1e-9)
        .count();
    let at_zero = waveform.iter().filter(|s| s.abs() < 1e-9).count();
    assert_eq!(at_level, 80);
    assert_eq!(at_zero, 20);
}

#[test]
fn zero_dimension_mask_yields_none() {
    let empty = PixelBuffer::blank(0, 64);
    assert!(extract_with_defaults(&empty).is_none());
}

#[test]
fn zero_dimension_capture_is_an_input_shape_error() {
    let empty = PixelBuffer::blank(64, 0);
    assert!(matches!(
        preprocess(empty, &Default::default()),
        Err(TraceError::InvalidDimensions { .. })
    ));
}

#[test]
fn uniform_capture_ends_in_no_usable_signal() {
    // A featureless frame degrades gracefully through every stage (contrast
    // passes through, the trim is abandoned) and only fails at the very end.
    let mut data = Vec::with_capacity(64 * 64 * 4);
    for _ in 0..64 * 64 {
        data.extend_from_slice(&[180, 180, 180, 255]);
    }
    let buffer = PixelBuffer::from_rgba(64, 64, data).unwrap();

    let pipeline = TracePipeline::new(TraceConfig::default());
    assert!(matches!(
        pipeline.process(buffer),
        Err(TraceError::NoUsableSignal)
    ));
}

#[test]
fn photographed_sine_trace_recovers_a_dominant_fundamental() {
    // A dark, two-pixel sine trace on a bright background with a horizontal
    // illumination gradient — the scenario the whole chain exists for.
    let (width, height) = (128u32, 96u32);
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for _y in 0..height {
        for x in 0..width {
            let background = 200 - (x / 4) as u8;
            data.extend_from_slice(&[background, background, background, 255]);
        }
    }
    let mut buffer = PixelBuffer::from_rgba(width, height, data).unwrap();
    for x in 0..width {
        let center = 48.0 - 30.0 * (TAU * x as f64 / width as f64).sin();
        let y = center.round() as u32;
        buffer.set_gray(x, y, 40);
        buffer.set_gray(x, (y + 1).min(height - 1), 40);
    }

    let pipeline = TracePipeline::new(TraceConfig::default());
    let analysis = pipeline.process(buffer).expect("trace should be extracted");

    assert_eq!(analysis.waveform.len(), width as usize);
    assert!(analysis.waveform.iter().all(|s| s.is_finite()));

    let magnitude =
        |h: usize| (analysis.spectrum.cos[h].powi(2) + analysis.spectrum.sin[h].powi(2)).sqrt();
    let fundamental = magnitude(1);
    // Drawn amplitude is 30/48 = 0.625 of full scale; allow for trace
    // thickness, median filtering and phase rotation.
    assert!(
        (0.35..=0.85).contains(&fundamental),
        "fundamental magnitude {fundamental} out of range"
    );
    for h in 2..=analysis.spectrum.harmonic_count() {
        assert!(
            magnitude(h) <= fundamental,
            "harmonic {h} ({}) louder than the fundamental ({fundamental})",
            magnitude(h)
        );
    }
}
