//! Capture sources feeding the processing pipeline.

pub mod capture;
pub mod wav;

pub use capture::{CaptureSource, FramePhase, MockCaptureSource, pcm16_bytes};
pub use wav::WavCaptureSource;
