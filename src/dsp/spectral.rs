//! Direct per-bin spectral estimation.
//!
//! Estimates frequency content by correlating the frame against sine and
//! cosine references at each bin frequency. Slower than a fast transform
//! for wide analyses, but cheap at the small fixed bin count this pipeline
//! needs and free of power-of-two length constraints.

use crate::defaults;
use std::f32::consts::PI;

/// Spectral content of a processed frame.
///
/// `frequencies` ascends and is parallel to `magnitudes`; the bin count is
/// fixed per call.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralData {
    /// Bin center frequencies in Hz, ascending.
    pub frequencies: Vec<f32>,
    /// Estimated amplitude at each bin.
    pub magnitudes: Vec<f32>,
    /// Frequency of the strongest bin, in Hz.
    pub dominant_frequency: f32,
    /// Width of the band holding the central 90% of spectral energy, in Hz.
    pub bandwidth: f32,
}

/// Estimates the amplitude of a single frequency component.
///
/// Correlates against quadrature references and scales so that a pure
/// sinusoid of amplitude A at `frequency` yields ~A.
pub fn bin_amplitude(samples: &[f32], sample_rate: u32, frequency: f32) -> f32 {
    if samples.is_empty() || sample_rate == 0 || frequency <= 0.0 {
        return 0.0;
    }

    let step = 2.0 * PI * frequency / sample_rate as f32;
    let mut cos_sum = 0.0f64;
    let mut sin_sum = 0.0f64;
    for (n, &x) in samples.iter().enumerate() {
        let phase = step * n as f32;
        cos_sum += (x * phase.cos()) as f64;
        sin_sum += (x * phase.sin()) as f64;
    }

    let n = samples.len() as f64;
    (2.0 * (cos_sum * cos_sum + sin_sum * sin_sum).sqrt() / n) as f32
}

/// Analyzes a frame into [`SpectralData`] with the default bin count.
pub fn analyze(samples: &[f32], sample_rate: u32) -> SpectralData {
    analyze_bins(samples, sample_rate, defaults::SPECTRAL_BINS)
}

/// Analyzes a frame with an explicit bin count, bins linearly spaced up to
/// the Nyquist frequency.
pub fn analyze_bins(samples: &[f32], sample_rate: u32, bin_count: usize) -> SpectralData {
    if samples.is_empty() || sample_rate == 0 || bin_count == 0 {
        return SpectralData {
            frequencies: Vec::new(),
            magnitudes: Vec::new(),
            dominant_frequency: 0.0,
            bandwidth: 0.0,
        };
    }

    let nyquist = sample_rate as f32 / 2.0;
    let mut frequencies = Vec::with_capacity(bin_count);
    let mut magnitudes = Vec::with_capacity(bin_count);
    for i in 0..bin_count {
        let freq = (i + 1) as f32 * nyquist / bin_count as f32;
        frequencies.push(freq);
        magnitudes.push(bin_amplitude(samples, sample_rate, freq));
    }

    let dominant_frequency = dominant(&frequencies, &magnitudes);
    let bandwidth = energy_bandwidth(&frequencies, &magnitudes);

    SpectralData {
        frequencies,
        magnitudes,
        dominant_frequency,
        bandwidth,
    }
}

/// Magnitude-weighted mean frequency of a spectrum, in Hz.
///
/// Returns 0 when the spectrum carries no energy.
pub fn centroid(frequencies: &[f32], magnitudes: &[f32]) -> f32 {
    let mut weighted = 0.0f64;
    let mut total = 0.0f64;
    for (&f, &m) in frequencies.iter().zip(magnitudes.iter()) {
        weighted += (f * m) as f64;
        total += m as f64;
    }
    if total < 1e-12 {
        return 0.0;
    }
    (weighted / total) as f32
}

fn dominant(frequencies: &[f32], magnitudes: &[f32]) -> f32 {
    let mut best_freq = 0.0;
    let mut best_mag = 0.0;
    for (&f, &m) in frequencies.iter().zip(magnitudes.iter()) {
        if m > best_mag {
            best_mag = m;
            best_freq = f;
        }
    }
    best_freq
}

/// Smallest frequency span holding the 5%–95% range of cumulative squared
/// magnitude.
fn energy_bandwidth(frequencies: &[f32], magnitudes: &[f32]) -> f32 {
    let total: f64 = magnitudes.iter().map(|&m| (m as f64) * (m as f64)).sum();
    if total < 1e-18 {
        return 0.0;
    }

    let lower_target = 0.05 * total;
    let upper_target = 0.95 * total;
    let mut cumulative = 0.0f64;
    let mut lower = frequencies[0];
    let mut upper = frequencies[frequencies.len() - 1];
    let mut lower_found = false;

    for (&f, &m) in frequencies.iter().zip(magnitudes.iter()) {
        cumulative += (m as f64) * (m as f64);
        if !lower_found && cumulative >= lower_target {
            lower = f;
            lower_found = true;
        }
        if cumulative >= upper_target {
            upper = f;
            break;
        }
    }

    (upper - lower).max(0.0)
}
