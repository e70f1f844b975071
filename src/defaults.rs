//! Default configuration constants for voxcap.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16000;

/// Default capture frame size in samples.
///
/// The capture collaborator delivers fixed-size frames; 4096 samples is
/// 256ms at 16kHz and 93ms at 44.1kHz, small enough for responsive VAD
/// decisions while keeping per-frame overhead low.
pub const FRAME_SAMPLES: usize = 4096;

/// Default target peak volume for normalization and gain, 0.0 to 1.0.
pub const TARGET_VOLUME: f32 = 0.8;

/// Default RMS threshold below which a sub-frame is considered silent.
pub const SILENCE_THRESHOLD: f32 = 0.01;

/// Default static VAD energy threshold (mean-square amplitude units).
///
/// Mean-square 0.001 corresponds to an RMS level of ~0.032, tuned for
/// typical microphone input after normalization.
pub const VAD_THRESHOLD: f32 = 0.001;

/// Default silence duration in milliseconds before an active session
/// auto-stops.
///
/// 3000ms allows for natural pauses in speech without prematurely ending
/// the capture session.
pub const SILENCE_TIMEOUT_MS: u64 = 3000;

/// Default minimum confidence for dispatching speech frames and accepting
/// transcripts.
pub const MIN_CONFIDENCE: f32 = 0.5;

/// Maximum entries kept in the VAD's rolling energy history.
pub const ENERGY_HISTORY_MAX: usize = 100;

/// Multiplier applied to the median of recent energies when the adaptive
/// threshold recomputes its raw estimate.
pub const ADAPTIVE_MEDIAN_FACTOR: f32 = 2.5;

/// Exponential-moving-average factor smoothing the adaptive threshold
/// into its baseline. Small on purpose: the baseline should drift with
/// the noise floor, not chase individual frames.
pub const BASELINE_SMOOTHING: f32 = 0.01;

/// Lower clamp on the adaptive baseline, as a factor of the static threshold.
pub const BASELINE_MIN_FACTOR: f32 = 0.5;

/// Upper clamp on the adaptive baseline, as a factor of the static threshold.
pub const BASELINE_MAX_FACTOR: f32 = 3.0;

/// Voice probability at or above which a silent stream flips to speech.
pub const SPEECH_ENTER_PROBABILITY: f32 = 0.6;

/// Voice probability at or below which a speaking stream flips to silence.
///
/// The gap between this and [`SPEECH_ENTER_PROBABILITY`] is the hysteresis
/// band that suppresses flicker near the decision boundary.
pub const SPEECH_EXIT_PROBABILITY: f32 = 0.4;

/// Probability weight of normalized frame energy in the VAD vote.
pub const ENERGY_WEIGHT: f32 = 0.5;

/// Probability weight of the inverted zero-crossing rate in the VAD vote.
pub const ZCR_WEIGHT: f32 = 0.2;

/// Probability weight of the normalized spectral centroid in the VAD vote.
pub const CENTROID_WEIGHT: f32 = 0.3;

/// Over-subtraction factor for spectral subtraction. Values around 2.0
/// remove noise shoulders at the cost of slightly attenuating quiet speech.
pub const OVERSUBTRACTION_FACTOR: f32 = 2.0;

/// Floor applied during spectral subtraction, as a fraction of the
/// original window power. Prevents musical-noise artifacts from windows
/// driven to zero.
pub const DENOISE_FLOOR_FRACTION: f32 = 0.01;

/// Window length in samples for spectral subtraction (50% hop).
pub const DENOISE_WINDOW: usize = 256;

/// Sub-frame length in milliseconds for the coarse voice-activity flag.
pub const VOICE_SUBFRAME_MS: u32 = 30;

/// Fraction of sub-frames that must qualify as speech for a frame's
/// coarse `has_voice` flag to be set.
pub const VOICE_SUBFRAME_RATIO: f32 = 0.3;

/// Maximum zero-crossing rate for a sub-frame to count as voiced.
pub const VOICED_MAX_ZCR: f32 = 0.1;

/// Window length in samples for noise-floor estimation in quality analysis.
pub const QUALITY_WINDOW: usize = 1024;

/// Floor on the estimated noise power, preventing -inf SNR on silence.
pub const NOISE_FLOOR_MIN: f32 = 1e-4;

/// Absolute amplitude above which a sample counts as clipped.
pub const CLIP_LEVEL: f32 = 0.99;

/// Absolute amplitude below which a sample counts as silent.
pub const SILENCE_LEVEL: f32 = 1e-3;

/// Lowest fundamental frequency searched by the pitch detector, in Hz.
pub const PITCH_MIN_HZ: f32 = 50.0;

/// Highest fundamental frequency searched by the pitch detector, in Hz.
pub const PITCH_MAX_HZ: f32 = 1000.0;

/// Number of harmonics above the fundamental used in the THD estimate.
pub const HARMONIC_COUNT: usize = 4;

/// Number of frequency bins in the direct spectral estimate.
pub const SPECTRAL_BINS: usize = 64;

/// Consecutive capture read failures tolerated before a session gives up
/// on its source.
pub const MAX_CONSECUTIVE_READ_ERRORS: u32 = 10;

/// Poll interval for live (non-finite) capture sources, in milliseconds.
pub const CAPTURE_POLL_MS: u64 = 10;

/// Default language code passed to the transcription collaborator.
pub const DEFAULT_LANGUAGE: &str = "auto";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hysteresis_band_is_nonempty() {
        assert!(SPEECH_ENTER_PROBABILITY > SPEECH_EXIT_PROBABILITY);
    }

    #[test]
    fn probability_weights_sum_to_one() {
        let sum = ENERGY_WEIGHT + ZCR_WEIGHT + CENTROID_WEIGHT;
        assert!((sum - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn baseline_clamp_brackets_static_threshold() {
        assert!(BASELINE_MIN_FACTOR < 1.0);
        assert!(BASELINE_MAX_FACTOR > 1.0);
    }
}
