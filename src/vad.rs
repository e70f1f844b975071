//! Voice Activity Detection (VAD).
//!
//! Stateful per-stream classifier: each processed frame is scored from its
//! energy, zero-crossing rate, and spectral centroid, the score is pushed
//! through an asymmetric hysteresis band, and cumulative speech/silence
//! bookkeeping advances in stream time. One detector instance per stream;
//! history and state are never shared.

use crate::defaults;
use crate::dsp::{self, ProcessedFrame, spectral};
use std::collections::VecDeque;
use std::time::Duration;

/// Configuration for Voice Activity Detection.
///
/// Treated as an immutable snapshot; [`VoiceActivityDetector::set_config`]
/// swaps in a replacement rather than mutating fields in place.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VadConfig {
    /// Sample rate of incoming frames, in Hz.
    pub sample_rate: u32,
    /// Analysis window length in milliseconds.
    pub window_ms: u32,
    /// Analysis hop length in milliseconds.
    pub hop_ms: u32,
    /// Static energy threshold (mean-square amplitude units).
    pub threshold: f32,
    /// Minimum dwell in speech before a flip to silence is honored.
    pub min_speech_ms: u32,
    /// Minimum dwell in silence before a flip to speech is honored.
    pub min_silence_ms: u32,
    /// Probability exponent, 0.1 to 2.0. Lower values flatten the curve
    /// toward "more speech-likely".
    pub sensitivity: f32,
    /// Track the noise floor and adapt the operating threshold.
    pub adaptive_threshold: bool,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            window_ms: 30,
            hop_ms: 15,
            threshold: defaults::VAD_THRESHOLD,
            min_speech_ms: 100,
            min_silence_ms: 100,
            sensitivity: 1.0,
            adaptive_threshold: true,
        }
    }
}

impl VadConfig {
    /// Validates field ranges, returning the first offending key.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::VoxcapError;

        if self.sample_rate == 0 {
            return Err(VoxcapError::InvalidConfig {
                key: "vad.sample_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.window_ms == 0 || self.hop_ms == 0 {
            return Err(VoxcapError::InvalidConfig {
                key: "vad.window_ms".to_string(),
                message: "window and hop must be positive".to_string(),
            });
        }
        if self.hop_ms > self.window_ms {
            return Err(VoxcapError::InvalidConfig {
                key: "vad.hop_ms".to_string(),
                message: "hop must not exceed window".to_string(),
            });
        }
        if self.threshold <= 0.0 {
            return Err(VoxcapError::InvalidConfig {
                key: "vad.threshold".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if !(0.1..=2.0).contains(&self.sensitivity) {
            return Err(VoxcapError::InvalidConfig {
                key: "vad.sensitivity".to_string(),
                message: "must be within [0.1, 2.0]".to_string(),
            });
        }
        Ok(())
    }
}

/// Per-frame classification result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VadResult {
    /// Speech/silence verdict after hysteresis.
    pub is_speech: bool,
    /// Voice probability, 0.0 to 1.0.
    pub confidence: f32,
    /// Mean squared amplitude of the frame.
    pub energy: f32,
    /// Monotonic frame counter; resets only on [`VoiceActivityDetector::reset`].
    pub frame_index: u64,
    /// Magnitude-weighted mean frequency of the frame, in Hz.
    pub spectral_centroid: f32,
}

/// Cumulative detector state, mutated only by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VadState {
    /// Current speech/silence state.
    pub is_speech: bool,
    /// Stream offset of the most recent silence→speech transition.
    pub speech_start: Option<Duration>,
    /// Stream offset of the most recent speech→silence transition.
    pub speech_end: Option<Duration>,
    /// Total stream time classified as speech.
    pub speech_duration: Duration,
    /// Total stream time classified as silence.
    pub silence_duration: Duration,
    /// Frames classified as speech.
    pub speech_frames: u64,
    /// Frames classified as silence.
    pub silence_frames: u64,
}

/// Read-only summary over the current history and counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VadStatistics {
    pub speech_ratio: f32,
    pub silence_ratio: f32,
    pub mean_energy: f32,
    pub energy_variance: f32,
}

/// Stateful speech/silence classifier with adaptive thresholding and
/// hysteresis.
pub struct VoiceActivityDetector {
    config: VadConfig,
    history: VecDeque<f32>,
    baseline: f32,
    state: VadState,
    frame_index: u64,
    stream_time: Duration,
    state_since: Duration,
    started: bool,
    last_result: Option<VadResult>,
}

impl VoiceActivityDetector {
    /// Creates a detector with the given configuration snapshot.
    pub fn new(config: VadConfig) -> Self {
        Self {
            baseline: config.threshold,
            config,
            history: VecDeque::with_capacity(defaults::ENERGY_HISTORY_MAX),
            state: VadState::default(),
            frame_index: 0,
            stream_time: Duration::ZERO,
            state_since: Duration::ZERO,
            started: false,
            last_result: None,
        }
    }

    /// Classifies one processed frame and advances cumulative state.
    pub fn process_frame(&mut self, frame: &ProcessedFrame) -> VadResult {
        let energy = dsp::mean_square(&frame.samples);
        self.push_window_energies(&frame.samples);

        let zcr = dsp::zero_crossing_rate(&frame.samples);
        let centroid = self.frame_centroid(frame);
        let threshold = self.operating_threshold();
        let confidence = self.voice_probability(energy, zcr, centroid, threshold, frame);

        let now = self.stream_time;
        let is_speech = self.decide(confidence, now);

        if is_speech {
            self.state.speech_frames += 1;
            self.state.speech_duration += frame.duration;
        } else {
            self.state.silence_frames += 1;
            self.state.silence_duration += frame.duration;
        }
        self.stream_time += frame.duration;

        let result = VadResult {
            is_speech,
            confidence,
            energy,
            frame_index: self.frame_index,
            spectral_centroid: centroid,
        };
        self.frame_index += 1;
        self.last_result = Some(result);
        result
    }

    /// Sets the static threshold from a background-noise sample and clears
    /// the energy history.
    pub fn calibrate(&mut self, background_noise: &[f32]) {
        let measured = dsp::mean_square(background_noise);
        self.config.threshold = (3.0 * measured).max(1e-6);
        self.baseline = self.config.threshold;
        self.history.clear();
    }

    /// Restores the detector to its initial state, frame index included.
    pub fn reset(&mut self) {
        self.history.clear();
        self.baseline = self.config.threshold;
        self.state = VadState::default();
        self.frame_index = 0;
        self.stream_time = Duration::ZERO;
        self.state_since = Duration::ZERO;
        self.started = false;
        self.last_result = None;
    }

    /// Swaps in a new configuration snapshot; cumulative state is kept.
    pub fn set_config(&mut self, config: VadConfig) {
        self.config = config;
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> &VadConfig {
        &self.config
    }

    /// Cumulative state; read-only view.
    pub fn state(&self) -> &VadState {
        &self.state
    }

    /// Most recent result, if any frame has been processed.
    pub fn last_result(&self) -> Option<&VadResult> {
        self.last_result.as_ref()
    }

    /// Speech/silence ratios plus energy mean/variance over the current
    /// history. Does not mutate state.
    pub fn statistics(&self) -> VadStatistics {
        let total = self.state.speech_frames + self.state.silence_frames;
        let (speech_ratio, silence_ratio) = if total == 0 {
            (0.0, 0.0)
        } else {
            (
                self.state.speech_frames as f32 / total as f32,
                self.state.silence_frames as f32 / total as f32,
            )
        };

        let (mean, variance) = if self.history.is_empty() {
            (0.0, 0.0)
        } else {
            let n = self.history.len() as f64;
            let mean: f64 = self.history.iter().map(|&e| e as f64).sum::<f64>() / n;
            let variance: f64 = self
                .history
                .iter()
                .map(|&e| {
                    let d = e as f64 - mean;
                    d * d
                })
                .sum::<f64>()
                / n;
            (mean as f32, variance as f32)
        };

        VadStatistics {
            speech_ratio,
            silence_ratio,
            mean_energy: mean,
            energy_variance: variance,
        }
    }

    /// Pushes per-window energies into the bounded rolling history.
    fn push_window_energies(&mut self, samples: &[f32]) {
        let rate = self.config.sample_rate.max(1) as u64;
        let window = ((rate * self.config.window_ms as u64) / 1000).max(1) as usize;
        let hop = ((rate * self.config.hop_ms as u64) / 1000).max(1) as usize;

        let mut start = 0usize;
        loop {
            let end = (start + window).min(samples.len());
            if start >= end {
                break;
            }
            if self.history.len() >= defaults::ENERGY_HISTORY_MAX {
                self.history.pop_front();
            }
            self.history.push_back(dsp::mean_square(&samples[start..end]));
            if end == samples.len() {
                break;
            }
            start += hop;
        }
    }

    /// Operating threshold: the static value, or the adaptively smoothed
    /// baseline clamped around it.
    fn operating_threshold(&mut self) -> f32 {
        if !self.config.adaptive_threshold || self.history.is_empty() {
            return self.config.threshold;
        }

        let mut sorted: Vec<f32> = self.history.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median = sorted[sorted.len() / 2];

        let raw = defaults::ADAPTIVE_MEDIAN_FACTOR * median;
        self.baseline += defaults::BASELINE_SMOOTHING * (raw - self.baseline);
        self.baseline = self.baseline.clamp(
            defaults::BASELINE_MIN_FACTOR * self.config.threshold,
            defaults::BASELINE_MAX_FACTOR * self.config.threshold,
        );
        self.baseline
    }

    /// Weighted probability vote, raised to the sensitivity exponent.
    fn voice_probability(
        &self,
        energy: f32,
        zcr: f32,
        centroid: f32,
        threshold: f32,
        frame: &ProcessedFrame,
    ) -> f32 {
        let energy_score = (energy / (2.0 * threshold.max(1e-9))).clamp(0.0, 1.0);
        let zcr_score = (zcr / 0.5).clamp(0.0, 1.0);
        let rate = if frame.sample_rate > 0 {
            frame.sample_rate
        } else {
            self.config.sample_rate
        };
        let nyquist = (rate as f32 / 2.0).max(1.0);
        let centroid_score = (centroid / nyquist).clamp(0.0, 1.0);

        let combined = defaults::ENERGY_WEIGHT * energy_score
            + defaults::ZCR_WEIGHT * (1.0 - zcr_score)
            + defaults::CENTROID_WEIGHT * centroid_score;
        combined.clamp(0.0, 1.0).powf(self.config.sensitivity)
    }

    /// Hysteresis plus minimum-dwell debounce. The very first frame has no
    /// prior state and classifies at the 0.5 midpoint instead.
    fn decide(&mut self, probability: f32, now: Duration) -> bool {
        let prev = self.state.is_speech;
        let target = if !self.started {
            probability > 0.5
        } else if prev {
            probability > defaults::SPEECH_EXIT_PROBABILITY
        } else {
            probability >= defaults::SPEECH_ENTER_PROBABILITY
        };

        if self.started && target != prev {
            let dwell = now.saturating_sub(self.state_since);
            let min_dwell = Duration::from_millis(if prev {
                self.config.min_speech_ms as u64
            } else {
                self.config.min_silence_ms as u64
            });
            if dwell < min_dwell {
                return prev;
            }
        }

        if !self.started || target != prev {
            if target {
                self.state.speech_start = Some(now);
            } else if self.started {
                self.state.speech_end = Some(now);
            }
            self.state_since = now;
        }

        self.started = true;
        self.state.is_speech = target;
        target
    }

    /// Spectral centroid, reusing the frame's spectral estimate when
    /// present.
    fn frame_centroid(&self, frame: &ProcessedFrame) -> f32 {
        match &frame.spectral {
            Some(data) => spectral::centroid(&data.frequencies, &data.magnitudes),
            None => {
                if frame.samples.is_empty() {
                    return 0.0;
                }
                let data = spectral::analyze(&frame.samples, frame.sample_rate);
                spectral::centroid(&data.frequencies, &data.magnitudes)
            }
        }
    }
}
