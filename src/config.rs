//! File-level configuration.
//!
//! TOML sections with full defaults, environment overrides, and
//! conversion into the immutable per-call snapshots the pipeline consumes.

use crate::defaults;
use crate::dsp::AudioConfig;
use crate::session::SessionConfig;
use crate::vad::VadConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioSection,
    pub vad: VadSection,
    pub session: SessionSection,
}

/// Audio processing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioSection {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
    pub target_volume: f32,
    pub silence_threshold: f32,
    pub normalization: bool,
    pub noise_reduction: bool,
    pub vad: bool,
}

impl Default for AudioSection {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            channels: 1,
            bit_depth: 16,
            target_volume: defaults::TARGET_VOLUME,
            silence_threshold: defaults::SILENCE_THRESHOLD,
            normalization: true,
            noise_reduction: true,
            vad: true,
        }
    }
}

/// Voice activity detection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VadSection {
    pub threshold: f32,
    pub window_ms: u32,
    pub hop_ms: u32,
    pub min_speech_ms: u32,
    pub min_silence_ms: u32,
    pub sensitivity: f32,
    pub adaptive_threshold: bool,
}

impl Default for VadSection {
    fn default() -> Self {
        Self {
            threshold: defaults::VAD_THRESHOLD,
            window_ms: 30,
            hop_ms: 15,
            min_speech_ms: 100,
            min_silence_ms: 100,
            sensitivity: 1.0,
            adaptive_threshold: true,
        }
    }
}

/// Session policy configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionSection {
    pub language: String,
    pub silence_timeout_ms: u64,
    pub min_confidence: f32,
    pub auto_stop: bool,
    pub calibrate_from_leading: bool,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            silence_timeout_ms: defaults::SILENCE_TIMEOUT_MS,
            min_confidence: defaults::MIN_CONFIDENCE,
            auto_stop: true,
            calibrate_from_leading: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file, or defaults if the file is missing.
    ///
    /// Invalid TOML is still an error; only a missing file falls back.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                let not_found = e
                    .downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false);
                if not_found {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - VOXCAP_LANGUAGE → session.language
    /// - VOXCAP_SILENCE_TIMEOUT_MS → session.silence_timeout_ms
    /// - VOXCAP_MIN_CONFIDENCE → session.min_confidence
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(language) = std::env::var("VOXCAP_LANGUAGE") {
            if !language.is_empty() {
                self.session.language = language;
            }
        }
        if let Ok(timeout) = std::env::var("VOXCAP_SILENCE_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse::<u64>() {
                self.session.silence_timeout_ms = ms;
            }
        }
        if let Ok(confidence) = std::env::var("VOXCAP_MIN_CONFIDENCE") {
            if let Ok(value) = confidence.parse::<f32>() {
                self.session.min_confidence = value;
            }
        }
        self
    }

    /// Processing snapshot for the DSP stage.
    pub fn audio_config(&self) -> AudioConfig {
        AudioConfig {
            sample_rate: self.audio.sample_rate,
            channels: self.audio.channels,
            bit_depth: self.audio.bit_depth,
            target_volume: self.audio.target_volume,
            silence_threshold: self.audio.silence_threshold,
            enable_normalization: self.audio.normalization,
            enable_noise_reduction: self.audio.noise_reduction,
            enable_vad: self.audio.vad,
        }
    }

    /// Detector snapshot.
    pub fn vad_config(&self) -> VadConfig {
        VadConfig {
            sample_rate: self.audio.sample_rate,
            window_ms: self.vad.window_ms,
            hop_ms: self.vad.hop_ms,
            threshold: self.vad.threshold,
            min_speech_ms: self.vad.min_speech_ms,
            min_silence_ms: self.vad.min_silence_ms,
            sensitivity: self.vad.sensitivity,
            adaptive_threshold: self.vad.adaptive_threshold,
        }
    }

    /// Full session snapshot combining all sections.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            audio: self.audio_config(),
            vad: self.vad_config(),
            language: self.session.language.clone(),
            silence_timeout: Duration::from_millis(self.session.silence_timeout_ms),
            min_confidence: self.session.min_confidence,
            auto_stop: self.session.auto_stop,
            calibrate_from_leading: self.session.calibrate_from_leading,
        }
    }

    /// Default config file path under the user config directory.
    #[cfg(feature = "cli")]
    pub fn default_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|dir| dir.join("voxcap").join("config.toml"))
    }
}
