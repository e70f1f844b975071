//! Capture source abstraction.
//!
//! The actual audio device/API is a collaborator outside this crate; the
//! pipeline consumes any implementation of [`CaptureSource`] as a
//! push-when-polled feed of raw PCM frames.

use crate::error::{Result, VoxcapError};

/// Trait for raw audio frame sources.
///
/// This trait allows swapping implementations (real device vs WAV file vs
/// mock).
pub trait CaptureSource: Send + Sync {
    /// Start capturing audio from the source.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing audio from the source.
    fn stop(&mut self) -> Result<()>;

    /// Read the next frame of raw PCM bytes.
    ///
    /// An empty buffer means "no data right now" for live sources and
    /// "exhausted" for finite ones.
    fn read_frame(&mut self) -> Result<Vec<u8>>;

    /// True when the source has a fixed end (file, pipe) rather than being
    /// a live device.
    fn is_finite(&self) -> bool;
}

/// Serializes 16-bit PCM samples to little-endian raw bytes.
pub fn pcm16_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// One phase of a mock frame sequence: the same frame, `count` times.
#[derive(Debug, Clone)]
pub struct FramePhase {
    /// 16-bit PCM samples delivered for each read in this phase.
    pub samples: Vec<i16>,
    /// Number of reads this phase lasts.
    pub count: u32,
}

/// Mock capture source for testing.
#[derive(Debug, Clone)]
pub struct MockCaptureSource {
    is_started: bool,
    phases: Vec<FramePhase>,
    phase_index: usize,
    phase_reads: u32,
    finite: bool,
    should_fail_start: bool,
    should_fail_read: bool,
    error_message: String,
}

impl MockCaptureSource {
    /// Create a new mock capture source with a single silent frame.
    pub fn new() -> Self {
        Self {
            is_started: false,
            phases: vec![FramePhase {
                samples: vec![0i16; 160],
                count: 1,
            }],
            phase_index: 0,
            phase_reads: 0,
            finite: true,
            should_fail_start: false,
            should_fail_read: false,
            error_message: "mock capture error".to_string(),
        }
    }

    /// Configure the frames delivered, phase by phase.
    pub fn with_frame_sequence(mut self, phases: Vec<FramePhase>) -> Self {
        self.phases = phases;
        self.phase_index = 0;
        self.phase_reads = 0;
        self
    }

    /// Treat the source as live: empty reads mean "not yet", not "done".
    pub fn as_live_source(mut self) -> Self {
        self.finite = false;
        self
    }

    /// Configure the mock to fail on start.
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail on every read.
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    /// Configure the error message for failures.
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Check if the capture source is started.
    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl Default for MockCaptureSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for MockCaptureSource {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            return Err(VoxcapError::CaptureUnavailable {
                message: self.error_message.clone(),
            });
        }
        self.is_started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.is_started = false;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Vec<u8>> {
        if self.should_fail_read {
            return Err(VoxcapError::CaptureFailed {
                message: self.error_message.clone(),
            });
        }

        while let Some(phase) = self.phases.get(self.phase_index) {
            if self.phase_reads < phase.count {
                self.phase_reads += 1;
                return Ok(pcm16_bytes(&phase.samples));
            }
            self.phase_index += 1;
            self.phase_reads = 0;
        }
        Ok(Vec::new())
    }

    fn is_finite(&self) -> bool {
        self.finite
    }
}
