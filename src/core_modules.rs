pub mod confidence;
pub mod harmonics;
pub mod pixel_buffer;
pub mod postprocess;
pub mod preprocess;
pub mod stats;
pub mod trace_tracker;
pub mod utils;
