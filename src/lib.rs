// THEORY:
// This file is the main entry point for the `wavetrace` library crate. It
// follows the standard Rust convention of using `lib.rs` to define the public
// API exposed to external consumers (a capture UI, an oscillator host).
//
// The primary surface is the `pipeline` module — `TracePipeline`, its
// per-stage configs and the stage entry points — while the individual
// algorithm modules stay reachable under `core_modules` for hosts that want
// to run or test a single stage in isolation. Everything in this core is
// synchronous, pure compute: no I/O (beyond the optional PNG glue in
// `core_modules::utils`), no threads, no shared state between invocations.

pub mod core_modules;
pub mod error;
pub mod pipeline;

pub use error::TraceError;
pub use pipeline::{
    CaptureAnalysis, HarmonicSpectrum, PixelBuffer, TraceConfig, TracePipeline, Waveform,
    extract_waveform, preprocess, synthesize_harmonics,
};
