//! Frame quality metrics.
//!
//! Derived, read-only measurements over a processed frame: SNR against an
//! estimated noise floor, clipping and silence ratios, and a harmonic
//! distortion estimate from autocorrelation pitch detection.

use crate::defaults;
use crate::dsp::spectral;

/// Quality metrics for one frame. All values are derived and read-only.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioQuality {
    /// Signal-to-noise ratio in dB.
    pub snr_db: f32,
    /// Peak-to-noise-floor ratio in dB.
    pub dynamic_range_db: f32,
    /// Fraction of samples with |amplitude| above the clip level.
    pub clipping_pct: f32,
    /// Fraction of samples with |amplitude| below the silence level.
    pub silence_pct: f32,
    /// Maximum absolute amplitude.
    pub peak_level: f32,
    /// Root-mean-square amplitude.
    pub rms_level: f32,
    /// Total harmonic distortion: harmonic energy over fundamental energy.
    pub thd: f32,
}

/// Computes quality metrics for a frame of normalized samples.
pub fn analyze(samples: &[f32], sample_rate: u32) -> AudioQuality {
    if samples.is_empty() {
        return AudioQuality::default();
    }

    let len = samples.len() as f32;
    let mut peak = 0.0f32;
    let mut sum_squares = 0.0f64;
    let mut clipped = 0usize;
    let mut silent = 0usize;
    for &x in samples {
        let a = x.abs();
        if a > peak {
            peak = a;
        }
        sum_squares += (x as f64) * (x as f64);
        if a > defaults::CLIP_LEVEL {
            clipped += 1;
        }
        if a < defaults::SILENCE_LEVEL {
            silent += 1;
        }
    }

    let signal_energy = (sum_squares / samples.len() as f64) as f32;
    let rms_level = signal_energy.sqrt();
    let floor = noise_floor(samples);

    let snr_db = 10.0 * (signal_energy.max(1e-10) / floor).log10();
    let dynamic_range_db = if peak > 0.0 {
        (20.0 * (peak / floor.sqrt()).log10()).max(0.0)
    } else {
        0.0
    };

    AudioQuality {
        snr_db,
        dynamic_range_db,
        clipping_pct: clipped as f32 / len,
        silence_pct: silent as f32 / len,
        peak_level: peak,
        rms_level,
        thd: estimate_thd(samples, sample_rate),
    }
}

/// Noise power estimate: the 10th-percentile mean-square energy across
/// fixed windows, floored to keep SNR finite on silence.
pub fn noise_floor(samples: &[f32]) -> f32 {
    let mut energies: Vec<f32> = samples
        .chunks(defaults::QUALITY_WINDOW)
        .map(window_energy)
        .collect();
    if energies.is_empty() {
        return defaults::NOISE_FLOOR_MIN;
    }

    energies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let idx = energies.len() / 10;
    energies[idx].max(defaults::NOISE_FLOOR_MIN)
}

fn window_energy(window: &[f32]) -> f32 {
    if window.is_empty() {
        return 0.0;
    }
    let sum: f64 = window.iter().map(|&x| (x as f64) * (x as f64)).sum();
    (sum / window.len() as f64) as f32
}

/// Autocorrelation pitch search over periods for 50Hz–1kHz fundamentals.
///
/// Returns the best-correlating fundamental frequency, or None when the
/// frame is too short or no period correlates convincingly.
pub fn estimate_pitch(samples: &[f32], sample_rate: u32) -> Option<f32> {
    if sample_rate == 0 {
        return None;
    }
    let min_lag = (sample_rate as f32 / defaults::PITCH_MAX_HZ) as usize;
    let max_lag = (sample_rate as f32 / defaults::PITCH_MIN_HZ) as usize;
    if min_lag == 0 || samples.len() < max_lag * 2 {
        return None;
    }

    let energy: f64 = samples.iter().map(|&x| (x as f64) * (x as f64)).sum();
    if energy < 1e-12 {
        return None;
    }

    let mut best_lag = 0usize;
    let mut best_corr = 0.0f64;
    for lag in min_lag..=max_lag {
        let mut corr = 0.0f64;
        for i in 0..samples.len() - lag {
            corr += (samples[i] as f64) * (samples[i + lag] as f64);
        }
        let normalized = corr / energy;
        if normalized > best_corr {
            best_corr = normalized;
            best_lag = lag;
        }
    }

    // Weak correlation means no stable period worth reporting.
    if best_corr < 0.3 || best_lag == 0 {
        return None;
    }
    Some(sample_rate as f32 / best_lag as f32)
}

/// THD from direct amplitude estimation at the fundamental and its first
/// harmonics. Zero when no pitch is detected.
pub fn estimate_thd(samples: &[f32], sample_rate: u32) -> f32 {
    let Some(fundamental) = estimate_pitch(samples, sample_rate) else {
        return 0.0;
    };

    let nyquist = sample_rate as f32 / 2.0;
    let fundamental_amp = spectral::bin_amplitude(samples, sample_rate, fundamental);
    if fundamental_amp < 1e-6 {
        return 0.0;
    }

    let mut harmonic_energy = 0.0f32;
    for k in 2..=(defaults::HARMONIC_COUNT + 1) {
        let freq = fundamental * k as f32;
        if freq >= nyquist {
            break;
        }
        let amp = spectral::bin_amplitude(samples, sample_rate, freq);
        harmonic_energy += amp * amp;
    }

    harmonic_energy.sqrt() / fundamental_amp
}
