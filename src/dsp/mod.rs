//! Per-frame digital signal processing.
//!
//! [`FrameProcessor`] turns raw capture bytes into analyzed
//! [`ProcessedFrame`]s: decode, normalize, denoise, gain, coarse voice
//! flagging, quality metrics, and spectral estimation, in that fixed
//! order. The processor carries no state between calls except an optional
//! cached noise profile.

pub mod quality;
pub mod spectral;

pub use quality::AudioQuality;
pub use spectral::SpectralData;

use crate::defaults;
use std::time::Duration;

/// Immutable per-call processing configuration.
///
/// Callers own the config and pass it by reference; "updating" one means
/// building a new snapshot, never mutating in place.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate in Hz. Must be positive.
    pub sample_rate: u32,
    /// Interleaved channel count of the raw input.
    pub channels: u16,
    /// Bits per sample of the raw input: 8, 16, or 32.
    pub bit_depth: u16,
    /// Peak target for normalization and the gain multiplier, 0.0 to 1.0.
    pub target_volume: f32,
    /// RMS threshold separating silent from voiced sub-frames, 0.0 to 1.0.
    pub silence_threshold: f32,
    /// Peak-normalize each frame to `target_volume`.
    pub enable_normalization: bool,
    /// Apply spectral subtraction against the cached noise profile.
    pub enable_noise_reduction: bool,
    /// Compute the coarse per-frame voice flag.
    pub enable_vad: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            channels: 1,
            bit_depth: 16,
            target_volume: defaults::TARGET_VOLUME,
            silence_threshold: defaults::SILENCE_THRESHOLD,
            enable_normalization: true,
            enable_noise_reduction: true,
            enable_vad: true,
        }
    }
}

impl AudioConfig {
    /// Validates field ranges, returning the first offending key.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::VoxcapError;

        if self.sample_rate == 0 {
            return Err(VoxcapError::InvalidConfig {
                key: "sample_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.channels == 0 {
            return Err(VoxcapError::InvalidConfig {
                key: "channels".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if !matches!(self.bit_depth, 8 | 16 | 32) {
            return Err(VoxcapError::InvalidConfig {
                key: "bit_depth".to_string(),
                message: format!("unsupported bit depth {}", self.bit_depth),
            });
        }
        if !(0.0..=1.0).contains(&self.target_volume) {
            return Err(VoxcapError::InvalidConfig {
                key: "target_volume".to_string(),
                message: "must be within [0, 1]".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.silence_threshold) {
            return Err(VoxcapError::InvalidConfig {
                key: "silence_threshold".to_string(),
                message: "must be within [0, 1]".to_string(),
            });
        }
        Ok(())
    }
}

/// One fully processed frame. Immutable after creation.
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    /// Mono samples with amplitude in [-1, 1].
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count of the raw input this frame was decoded from.
    pub channel_count: u16,
    /// Frame length as sample count over sample rate.
    pub duration: Duration,
    /// RMS amplitude of the processed samples.
    pub volume: f32,
    /// Coarse voice flag from sub-frame energy/ZCR voting.
    pub has_voice: bool,
    /// Derived quality metrics.
    pub quality: AudioQuality,
    /// Spectral estimate; absent for empty frames.
    pub spectral: Option<SpectralData>,
}

impl ProcessedFrame {
    /// Zero-length frame used for empty or malformed input.
    pub fn empty(config: &AudioConfig) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate: config.sample_rate,
            channel_count: config.channels,
            duration: Duration::ZERO,
            volume: 0.0,
            has_voice: false,
            quality: AudioQuality::default(),
            spectral: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Root-mean-square amplitude of normalized samples.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = samples.iter().map(|&x| (x as f64) * (x as f64)).sum();
    ((sum_squares / samples.len() as f64).sqrt()) as f32
}

/// Zero-crossing rate: sign changes per sample transition, 0.0 to 1.0.
pub fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|pair| pair[0] * pair[1] < 0.0)
        .count();
    crossings as f32 / (samples.len() - 1) as f32
}

/// Stateless-per-call DSP chain with an optional cached noise profile.
///
/// The noise profile is the only cross-call state; it belongs to exactly
/// one stream and is never shared between sessions.
#[derive(Debug, Clone, Default)]
pub struct FrameProcessor {
    noise_power: Option<f32>,
}

impl FrameProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the full processing chain over one raw frame.
    ///
    /// Empty or malformed input yields a zero-length frame rather than an
    /// error; numeric edge cases are floored so NaN/Inf never escape.
    pub fn process(&mut self, raw: &[u8], config: &AudioConfig) -> ProcessedFrame {
        let mut samples = decode_samples(raw, config);
        if samples.is_empty() {
            return ProcessedFrame::empty(config);
        }

        if config.enable_normalization {
            normalize(&mut samples, config.target_volume);
        }
        if config.enable_noise_reduction {
            samples = self.denoise(&samples);
        }
        apply_gain(&mut samples, config.target_volume);

        let volume = rms(&samples);
        let has_voice = if config.enable_vad {
            coarse_voice_flag(&samples, config.sample_rate, config.silence_threshold)
        } else {
            false
        };
        let quality = quality::analyze(&samples, config.sample_rate);
        let spectral = Some(spectral::analyze(&samples, config.sample_rate));
        let duration = frame_duration(samples.len(), config.sample_rate);

        ProcessedFrame {
            samples,
            sample_rate: config.sample_rate,
            channel_count: config.channels,
            duration,
            volume,
            has_voice,
            quality,
            spectral,
        }
    }

    /// Spectral subtraction over overlapping windows against the cached
    /// noise profile, built lazily from the quietest segment seen.
    pub fn denoise(&mut self, samples: &[f32]) -> Vec<f32> {
        if samples.is_empty() {
            return Vec::new();
        }

        let noise_power = match self.noise_power {
            Some(p) => p,
            None => {
                let p = quietest_window_power(samples);
                self.noise_power = Some(p);
                p
            }
        };

        let window = defaults::DENOISE_WINDOW.min(samples.len());
        let hop = (window / 2).max(1);
        let mut output = vec![0.0f32; samples.len()];
        let mut weight = vec![0.0f32; samples.len()];

        let mut start = 0usize;
        while start < samples.len() {
            let end = (start + window).min(samples.len());
            let seg = &samples[start..end];

            let seg_power = mean_square(seg);
            let cleaned = (seg_power - defaults::OVERSUBTRACTION_FACTOR * noise_power)
                .max(defaults::DENOISE_FLOOR_FRACTION * seg_power);
            let gain = if seg_power > 0.0 {
                (cleaned / seg_power).sqrt()
            } else {
                0.0
            };

            for (i, &x) in seg.iter().enumerate() {
                let w = hann(i, seg.len());
                output[start + i] += x * gain * w;
                weight[start + i] += w;
            }

            if end == samples.len() {
                break;
            }
            start += hop;
        }

        for (out, &w) in output.iter_mut().zip(weight.iter()) {
            if w > 1e-6 {
                *out /= w;
            }
        }
        output
    }

    /// Seeds the noise profile from a known background-noise sample.
    pub fn set_noise_profile(&mut self, samples: &[f32]) {
        self.noise_power = Some(mean_square(samples));
    }

    /// Clears the cached noise profile; the next denoise rebuilds it.
    pub fn reset_noise_profile(&mut self) {
        self.noise_power = None;
    }

    /// Current cached noise power, if any.
    pub fn noise_profile(&self) -> Option<f32> {
        self.noise_power
    }
}

/// Decodes raw interleaved PCM bytes into mono normalized samples.
///
/// Trailing partial samples are dropped; an unsupported bit depth decodes
/// to an empty buffer (the caller maps that to a zero-length frame).
pub fn decode_samples(raw: &[u8], config: &AudioConfig) -> Vec<f32> {
    let interleaved: Vec<f32> = match config.bit_depth {
        16 => raw
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / i16::MAX as f32)
            .collect(),
        8 => raw.iter().map(|&b| (b as f32 - 128.0) / 128.0).collect(),
        32 => raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]).clamp(-1.0, 1.0))
            .collect(),
        _ => Vec::new(),
    };

    downmix(&interleaved, config.channels)
}

/// Averages interleaved channels down to mono.
fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    let channels = channels as usize;
    interleaved
        .chunks_exact(channels)
        .map(|group| group.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Peak-normalizes a frame so its maximum absolute sample equals `target`.
///
/// A silent frame (max == 0) is left unchanged.
pub fn normalize(samples: &mut [f32], target: f32) {
    let peak = samples.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
    if peak == 0.0 {
        return;
    }
    let scale = target / peak;
    for x in samples.iter_mut() {
        *x *= scale;
    }
}

/// Multiplies samples by `gain`, clamped to the valid amplitude range.
pub fn apply_gain(samples: &mut [f32], gain: f32) {
    for x in samples.iter_mut() {
        *x = (*x * gain).clamp(-1.0, 1.0);
    }
}

/// Soft-knee compression of samples whose magnitude exceeds `threshold`.
///
/// Excess above the threshold is divided by `ratio`; sign is preserved.
pub fn apply_compressor(samples: &mut [f32], threshold: f32, ratio: f32) {
    let ratio = ratio.max(1.0);
    let threshold = threshold.clamp(0.0, 1.0);
    for x in samples.iter_mut() {
        let mag = x.abs();
        if mag > threshold {
            let compressed = threshold + (mag - threshold) / ratio;
            *x = compressed.copysign(*x);
        }
    }
}

/// Linear-interpolation resampling; identity when the rates match.
///
/// Positions past the source bounds read as zero.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || from_rate == 0 || to_rate == 0 || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let out_len = (samples.len() as f64 * ratio).floor() as usize;
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src = i as f64 / ratio;
        let i0 = src.floor() as usize;
        let frac = (src - i0 as f64) as f32;
        let a = samples.get(i0).copied().unwrap_or(0.0);
        let b = samples.get(i0 + 1).copied().unwrap_or(0.0);
        out.push(a * (1.0 - frac) + b * frac);
    }
    out
}

/// True when the frame's RMS amplitude sits below `threshold`.
pub fn detect_silence(samples: &[f32], threshold: f32) -> bool {
    rms(samples) < threshold
}

/// Sub-frame energy/ZCR voting for the coarse per-frame voice flag.
fn coarse_voice_flag(samples: &[f32], sample_rate: u32, silence_threshold: f32) -> bool {
    let subframe =
        ((sample_rate as u64 * defaults::VOICE_SUBFRAME_MS as u64) / 1000).max(1) as usize;
    let mut total = 0usize;
    let mut voiced = 0usize;
    for chunk in samples.chunks(subframe) {
        total += 1;
        let energetic = rms(chunk) > silence_threshold;
        let smooth = zero_crossing_rate(chunk) < defaults::VOICED_MAX_ZCR;
        if energetic && smooth {
            voiced += 1;
        }
    }
    if total == 0 {
        return false;
    }
    voiced as f32 / total as f32 > defaults::VOICE_SUBFRAME_RATIO
}

fn quietest_window_power(samples: &[f32]) -> f32 {
    samples
        .chunks(defaults::DENOISE_WINDOW)
        .map(mean_square)
        .fold(f32::MAX, f32::min)
}

/// Mean squared amplitude, the energy measure used by the detector.
pub fn mean_square(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&x| (x as f64) * (x as f64)).sum();
    (sum / samples.len() as f64) as f32
}

fn hann(i: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }
    let phase = std::f32::consts::PI * i as f32 / (len - 1) as f32;
    phase.sin() * phase.sin()
}

fn frame_duration(sample_count: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(sample_count as f64 / sample_rate as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, rate: u32, count: usize, amplitude: f32) -> Vec<f32> {
        (0..count)
            .map(|n| amplitude * (2.0 * PI * freq * n as f32 / rate as f32).sin())
            .collect()
    }

    fn pcm16_bytes(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    fn sine_pcm16(freq: f32, rate: u32, count: usize, amplitude: f32) -> Vec<u8> {
        let pcm: Vec<i16> = sine(freq, rate, count, amplitude)
            .iter()
            .map(|&x| (x * i16::MAX as f32) as i16)
            .collect();
        pcm16_bytes(&pcm)
    }

    // ── decode ────────────────────────────────────────────────────────────

    #[test]
    fn decode_pcm16_scales_to_unit_range() {
        let config = AudioConfig::default();
        let raw = pcm16_bytes(&[i16::MAX, 0, i16::MIN + 1]);
        let samples = decode_samples(&raw, &config);
        assert_eq!(samples.len(), 3);
        assert!((samples[0] - 1.0).abs() < 1e-4);
        assert_eq!(samples[1], 0.0);
        assert!((samples[2] + 1.0).abs() < 1e-4);
    }

    #[test]
    fn decode_drops_trailing_partial_sample() {
        let config = AudioConfig::default();
        let mut raw = pcm16_bytes(&[1000, 2000]);
        raw.push(0xAB);
        let samples = decode_samples(&raw, &config);
        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn decode_pcm8_is_centered() {
        let config = AudioConfig {
            bit_depth: 8,
            ..Default::default()
        };
        let samples = decode_samples(&[128u8, 255, 0], &config);
        assert_eq!(samples[0], 0.0);
        assert!(samples[1] > 0.95);
        assert!(samples[2] < -0.95);
    }

    #[test]
    fn decode_float32_clamps() {
        let config = AudioConfig {
            bit_depth: 32,
            ..Default::default()
        };
        let raw: Vec<u8> = [0.5f32, 2.0, -3.0]
            .iter()
            .flat_map(|f| f.to_le_bytes())
            .collect();
        let samples = decode_samples(&raw, &config);
        assert_eq!(samples, vec![0.5, 1.0, -1.0]);
    }

    #[test]
    fn decode_unsupported_depth_is_empty() {
        let config = AudioConfig {
            bit_depth: 24,
            ..Default::default()
        };
        assert!(decode_samples(&[0u8; 12], &config).is_empty());
    }

    #[test]
    fn decode_downmixes_stereo() {
        let config = AudioConfig {
            channels: 2,
            ..Default::default()
        };
        let raw = pcm16_bytes(&[16384, -16384, 8192, 8192]);
        let samples = decode_samples(&raw, &config);
        assert_eq!(samples.len(), 2);
        assert!(samples[0].abs() < 1e-4);
        assert!((samples[1] - 0.25).abs() < 1e-3);
    }

    // ── normalize / gain / compressor ────────────────────────────────────

    #[test]
    fn normalize_hits_target_peak() {
        let mut samples = vec![0.1, -0.25, 0.2];
        normalize(&mut samples, 0.8);
        let peak = samples.iter().fold(0.0f32, |a, &x| a.max(x.abs()));
        assert!((peak - 0.8).abs() < 1e-6);
    }

    #[test]
    fn normalize_leaves_silence_unchanged() {
        let mut samples = vec![0.0f32; 100];
        normalize(&mut samples, 0.8);
        assert!(samples.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn normalize_scales_up_and_down() {
        let mut quiet = vec![0.01f32, -0.005];
        normalize(&mut quiet, 0.5);
        assert!((quiet[0] - 0.5).abs() < 1e-6);

        let mut loud = vec![1.0f32, -0.5];
        normalize(&mut loud, 0.5);
        assert!((loud[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn apply_gain_clamps_to_unit_range() {
        let mut samples = vec![0.9f32, -0.9];
        apply_gain(&mut samples, 2.0);
        assert_eq!(samples, vec![1.0, -1.0]);
    }

    #[test]
    fn compressor_leaves_below_threshold_untouched() {
        let mut samples = vec![0.3f32, -0.4];
        let original = samples.clone();
        apply_compressor(&mut samples, 0.5, 4.0);
        assert_eq!(samples, original);
    }

    #[test]
    fn compressor_attenuates_above_threshold_preserving_sign() {
        let mut samples = vec![0.9f32, -0.9];
        apply_compressor(&mut samples, 0.5, 4.0);
        // 0.5 + 0.4/4 = 0.6
        assert!((samples[0] - 0.6).abs() < 1e-6);
        assert!((samples[1] + 0.6).abs() < 1e-6);
    }

    #[test]
    fn compressor_ratio_below_one_is_clamped() {
        let mut samples = vec![0.9f32];
        apply_compressor(&mut samples, 0.5, 0.1);
        assert!((samples[0] - 0.9).abs() < 1e-6);
    }

    // ── resample ─────────────────────────────────────────────────────────

    #[test]
    fn resample_equal_rates_is_identity() {
        let samples = vec![0.1f32, -0.2, 0.3, 0.4];
        for rate in [8000u32, 16000, 44100] {
            assert_eq!(resample(&samples, rate, rate), samples);
        }
    }

    #[test]
    fn resample_halves_length_when_downsampling() {
        let samples: Vec<f32> = (0..1000).map(|i| i as f32 / 1000.0).collect();
        let out = resample(&samples, 32000, 16000);
        assert_eq!(out.len(), 500);
    }

    #[test]
    fn resample_doubles_length_when_upsampling() {
        let samples: Vec<f32> = (0..100).map(|i| i as f32 / 100.0).collect();
        let out = resample(&samples, 8000, 16000);
        assert_eq!(out.len(), 200);
        // Interpolated midpoints sit between neighbors.
        assert!((out[1] - 0.005).abs() < 1e-4);
    }

    #[test]
    fn resample_preserves_sine_shape() {
        let samples = sine(440.0, 44100, 4410, 0.5);
        let out = resample(&samples, 44100, 16000);
        let out_rms = rms(&out);
        let in_rms = rms(&samples);
        assert!(
            (out_rms - in_rms).abs() < 0.02,
            "rms drifted: {} vs {}",
            out_rms,
            in_rms
        );
    }

    // ── silence / zcr ────────────────────────────────────────────────────

    #[test]
    fn detect_silence_matches_rms_comparison() {
        let loud = sine(440.0, 16000, 1600, 0.5);
        let quiet = sine(440.0, 16000, 1600, 0.001);

        for (frame, threshold) in [(&loud, 0.01f32), (&quiet, 0.01), (&loud, 0.9)] {
            assert_eq!(detect_silence(frame, threshold), rms(frame) < threshold);
        }
    }

    #[test]
    fn zcr_of_constant_signal_is_zero() {
        assert_eq!(zero_crossing_rate(&[0.5f32; 100]), 0.0);
    }

    #[test]
    fn zcr_of_alternating_signal_is_one() {
        let samples: Vec<f32> = (0..100)
            .map(|i| if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        assert!((zero_crossing_rate(&samples) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn rms_empty_is_zero() {
        assert_eq!(rms(&[]), 0.0);
    }

    // ── noise profile / denoise ──────────────────────────────────────────

    #[test]
    fn denoise_builds_profile_lazily() {
        let mut processor = FrameProcessor::new();
        assert!(processor.noise_profile().is_none());

        let samples = sine(440.0, 16000, 2048, 0.3);
        let _ = processor.denoise(&samples);
        assert!(processor.noise_profile().is_some());
    }

    #[test]
    fn reset_noise_profile_clears_cache() {
        let mut processor = FrameProcessor::new();
        processor.set_noise_profile(&[0.05f32; 512]);
        assert!(processor.noise_profile().is_some());
        processor.reset_noise_profile();
        assert!(processor.noise_profile().is_none());
    }

    #[test]
    fn denoise_attenuates_noise_level_signal() {
        let mut processor = FrameProcessor::new();
        let noise = vec![0.02f32; 4096];
        processor.set_noise_profile(&noise);

        let out = processor.denoise(&noise);
        assert!(
            rms(&out) < rms(&noise),
            "noise-level signal should be attenuated"
        );
    }

    #[test]
    fn denoise_keeps_loud_signal_mostly_intact() {
        let mut processor = FrameProcessor::new();
        processor.set_noise_profile(&[0.01f32; 512]);

        let signal = sine(440.0, 16000, 4096, 0.5);
        let out = processor.denoise(&signal);
        let ratio = rms(&out) / rms(&signal);
        assert!(ratio > 0.9, "loud signal attenuated too much: {}", ratio);
    }

    #[test]
    fn denoise_floors_instead_of_zeroing() {
        let mut processor = FrameProcessor::new();
        // Profile much louder than the signal: subtraction would go negative.
        processor.set_noise_profile(&[0.5f32; 512]);

        let signal = sine(440.0, 16000, 2048, 0.1);
        let out = processor.denoise(&signal);
        assert!(rms(&out) > 0.0, "floor should keep residual energy");
        assert!(out.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn denoise_empty_is_empty() {
        let mut processor = FrameProcessor::new();
        assert!(processor.denoise(&[]).is_empty());
    }

    // ── full chain ───────────────────────────────────────────────────────

    #[test]
    fn process_empty_input_yields_zero_length_frame() {
        let mut processor = FrameProcessor::new();
        let config = AudioConfig::default();
        let frame = processor.process(&[], &config);
        assert!(frame.is_empty());
        assert_eq!(frame.duration, Duration::ZERO);
        assert!(!frame.has_voice);
        assert!(frame.spectral.is_none());
    }

    #[test]
    fn process_unsupported_depth_yields_zero_length_frame() {
        let mut processor = FrameProcessor::new();
        let config = AudioConfig {
            bit_depth: 24,
            ..Default::default()
        };
        let frame = processor.process(&[0u8; 64], &config);
        assert!(frame.is_empty());
    }

    #[test]
    fn process_sine_flags_voice() {
        let mut processor = FrameProcessor::new();
        let config = AudioConfig {
            sample_rate: 44100,
            enable_noise_reduction: false,
            ..Default::default()
        };
        let raw = sine_pcm16(1000.0, 44100, 4096, 0.5);
        let frame = processor.process(&raw, &config);

        assert!(frame.has_voice, "1kHz tone should be flagged as voiced");
        assert!(frame.volume > config.silence_threshold);
        assert_eq!(frame.sample_rate, 44100);
        let spectral = frame.spectral.expect("non-empty frame has spectral data");
        assert!((spectral.dominant_frequency - 1000.0).abs() <= 400.0);
    }

    #[test]
    fn process_zero_frame_has_no_voice() {
        let mut processor = FrameProcessor::new();
        let config = AudioConfig {
            sample_rate: 44100,
            ..Default::default()
        };
        let raw = pcm16_bytes(&vec![0i16; 4096]);
        let frame = processor.process(&raw, &config);

        assert!(!frame.has_voice);
        assert_eq!(frame.volume, 0.0);
        assert!(!frame.is_empty());
    }

    #[test]
    fn process_duration_matches_sample_count() {
        let mut processor = FrameProcessor::new();
        let config = AudioConfig {
            sample_rate: 16000,
            enable_noise_reduction: false,
            ..Default::default()
        };
        let raw = pcm16_bytes(&vec![1000i16; 8000]);
        let frame = processor.process(&raw, &config);
        assert!((frame.duration.as_secs_f64() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn process_vad_disabled_never_flags_voice() {
        let mut processor = FrameProcessor::new();
        let config = AudioConfig {
            sample_rate: 44100,
            enable_vad: false,
            enable_noise_reduction: false,
            ..Default::default()
        };
        let raw = sine_pcm16(1000.0, 44100, 4096, 0.5);
        let frame = processor.process(&raw, &config);
        assert!(!frame.has_voice);
    }

    #[test]
    fn process_normalization_controls_peak() {
        let mut processor = FrameProcessor::new();
        let config = AudioConfig {
            sample_rate: 16000,
            target_volume: 0.5,
            enable_noise_reduction: false,
            ..Default::default()
        };
        let raw = sine_pcm16(440.0, 16000, 4096, 0.1);
        let frame = processor.process(&raw, &config);

        // Peak-normalized to 0.5 then gain-multiplied by 0.5.
        let peak = frame.samples.iter().fold(0.0f32, |a, &x| a.max(x.abs()));
        assert!((peak - 0.25).abs() < 0.01, "peak was {}", peak);
    }

    #[test]
    fn process_output_stays_in_unit_range() {
        let mut processor = FrameProcessor::new();
        let config = AudioConfig {
            sample_rate: 16000,
            ..Default::default()
        };
        let raw = sine_pcm16(440.0, 16000, 4096, 1.0);
        let frame = processor.process(&raw, &config);
        assert!(frame.samples.iter().all(|x| x.abs() <= 1.0 && x.is_finite()));
    }

    // ── config validation ────────────────────────────────────────────────

    #[test]
    fn config_default_is_valid() {
        assert!(AudioConfig::default().validate().is_ok());
    }

    #[test]
    fn config_rejects_zero_sample_rate() {
        let config = AudioConfig {
            sample_rate: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_rejects_out_of_range_volume() {
        let config = AudioConfig {
            target_volume: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_rejects_unsupported_bit_depth() {
        let config = AudioConfig {
            bit_depth: 12,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
