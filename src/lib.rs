//! voxcap - Speech capture pipeline
//!
//! Frame-by-frame DSP, voice activity detection, and capture-session
//! orchestration routing speech to a pluggable transcription collaborator.

// Enforce error handling discipline in non-test code
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod clock;
pub mod config;
pub mod defaults;
pub mod dsp;
pub mod error;
pub mod session;
pub mod stt;
pub mod vad;

// Core traits (source → process → classify → dispatch)
pub use audio::capture::CaptureSource;
pub use stt::{TranscriptionResult, TranscriptionService};

// Pipeline
pub use dsp::{AudioConfig, AudioQuality, FrameProcessor, ProcessedFrame, SpectralData};
pub use session::{SessionConfig, SessionEvent, SessionManager, SessionSnapshot, SessionState};
pub use vad::{VadConfig, VadResult, VoiceActivityDetector};

// Error handling
pub use error::{Result, VoxcapError};

// Config
pub use config::Config;

// Time injection (for deterministic tests and embedders)
pub use clock::{Clock, MockClock, SystemClock};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }

    #[test]
    fn version_string_contains_plus_when_git_hash_present() {
        let ver = version_string();
        if option_env!("GIT_HASH").is_some_and(|h| !h.is_empty()) {
            assert!(
                ver.contains('+'),
                "With GIT_HASH set, version should contain '+', got: {}",
                ver
            );
        } else {
            assert_eq!(ver, env!("CARGO_PKG_VERSION"));
        }
    }
}
