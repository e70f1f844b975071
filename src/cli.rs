//! Command-line interface for voxcap
//!
//! Provides argument parsing using clap derive macros and the offline
//! analysis command.

use crate::config::Config;
use crate::dsp::FrameProcessor;
use crate::vad::VoiceActivityDetector;
use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Speech capture pipeline: frame DSP, voice activity detection, session statistics
#[derive(Parser, Debug)]
#[command(name = "voxcap", version, about)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress per-frame output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the DSP + VAD chain over a WAV file and report what a live
    /// session would have seen
    Analyze {
        /// Path to the WAV file
        file: PathBuf,

        /// Emit a machine-readable JSON report instead of text
        #[arg(long)]
        json: bool,

        /// Silence span after the last speech that would auto-stop a live
        /// session. Examples: 3s, 1m30s, or a bare number of seconds
        #[arg(long, value_name = "DURATION", value_parser = parse_duration_secs)]
        silence_timeout: Option<f64>,

        /// Print a line per frame
        #[arg(long)]
        frames: bool,
    },
}

/// Parse a duration string into seconds.
///
/// Supports any format accepted by `humantime`: bare numbers (seconds),
/// single-unit (`3s`, `1m`), and compound (`1m30s`).
fn parse_duration_secs(s: &str) -> Result<f64, String> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<f64>() {
        return Ok(secs);
    }
    humantime::parse_duration(s)
        .map(|d| d.as_secs_f64())
        .map_err(|e| e.to_string())
}

/// Analysis report over one WAV file.
#[derive(Debug, Serialize)]
pub struct AnalyzeReport {
    pub file: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_secs: f64,
    pub frames: u64,
    pub speech_frames: u64,
    pub speech_ratio: f32,
    pub mean_confidence: f32,
    pub mean_snr_db: f32,
    pub mean_rms: f32,
    pub peak_level: f32,
    pub clipping_pct: f32,
    /// Stream offset where a live session with the given timeout would
    /// have auto-stopped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_stop_at_secs: Option<f64>,
}

/// Dispatch a parsed command line.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.clone().or_else(Config::default_path);
    let config = match &config_path {
        Some(path) => Config::load_or_default(path)?,
        None => Config::default(),
    }
    .with_env_overrides();

    match cli.command {
        Commands::Analyze {
            file,
            json,
            silence_timeout,
            frames,
        } => {
            let timeout = silence_timeout
                .unwrap_or(config.session.silence_timeout_ms as f64 / 1000.0);
            let report = analyze_file(&file, &config, timeout, frames && !cli.quiet)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report, timeout);
            }
        }
    }
    Ok(())
}

/// Run the processing chain over a WAV file, mirroring the live frame loop.
pub fn analyze_file(
    path: &Path,
    config: &Config,
    silence_timeout_secs: f64,
    print_frames: bool,
) -> anyhow::Result<AnalyzeReport> {
    use crate::audio::capture::CaptureSource;
    use crate::audio::wav::WavCaptureSource;

    let mut source = WavCaptureSource::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    // The file header wins over configured capture parameters.
    let mut audio_config = config.audio_config();
    audio_config.sample_rate = source.sample_rate();
    audio_config.channels = source.channels();
    let mut vad_config = config.vad_config();
    vad_config.sample_rate = source.sample_rate();

    let mut processor = FrameProcessor::new();
    let mut vad = VoiceActivityDetector::new(vad_config);

    let mut frames: u64 = 0;
    let mut offset_secs = 0.0f64;
    let mut confidence_sum = 0.0f64;
    let mut snr_sum = 0.0f64;
    let mut rms_sum = 0.0f64;
    let mut peak_level = 0.0f32;
    let mut clipped_weight = 0.0f64;
    let mut was_speech = false;
    let mut armed_deadline: Option<f64> = None;
    let mut auto_stop_at: Option<f64> = None;

    loop {
        let raw = source.read_frame()?;
        if raw.is_empty() {
            break;
        }

        let frame = processor.process(&raw, &audio_config);
        if frame.is_empty() {
            continue;
        }
        let result = vad.process_frame(&frame);

        if auto_stop_at.is_none() {
            if let Some(deadline) = armed_deadline {
                if offset_secs >= deadline {
                    auto_stop_at = Some(deadline);
                }
            }
        }
        if result.is_speech {
            armed_deadline = None;
        } else if was_speech {
            armed_deadline = Some(offset_secs + silence_timeout_secs);
        }
        was_speech = result.is_speech;

        if print_frames {
            let label = if result.is_speech { "speech " } else { "silence" };
            println!(
                "{:>8.2}s  {}  conf={:.2}  energy={:.5}  centroid={:>6.0}Hz",
                offset_secs, label, result.confidence, result.energy, result.spectral_centroid
            );
        }

        frames += 1;
        offset_secs += frame.duration.as_secs_f64();
        confidence_sum += result.confidence as f64;
        snr_sum += frame.quality.snr_db as f64;
        rms_sum += frame.quality.rms_level as f64;
        peak_level = peak_level.max(frame.quality.peak_level);
        clipped_weight += (frame.quality.clipping_pct as f64) * frame.samples.len() as f64;
    }

    // Trailing silence can also cross the deadline after the last frame.
    if auto_stop_at.is_none() {
        if let Some(deadline) = armed_deadline {
            if offset_secs >= deadline {
                auto_stop_at = Some(deadline);
            }
        }
    }

    let state = vad.state();
    let total_classified = state.speech_frames + state.silence_frames;
    let total_samples = offset_secs * audio_config.sample_rate as f64;

    Ok(AnalyzeReport {
        file: path.display().to_string(),
        sample_rate: audio_config.sample_rate,
        channels: audio_config.channels,
        duration_secs: offset_secs,
        frames,
        speech_frames: state.speech_frames,
        speech_ratio: if total_classified == 0 {
            0.0
        } else {
            state.speech_frames as f32 / total_classified as f32
        },
        mean_confidence: mean(confidence_sum, frames),
        mean_snr_db: mean(snr_sum, frames),
        mean_rms: mean(rms_sum, frames),
        peak_level,
        clipping_pct: if total_samples > 0.0 {
            (clipped_weight / total_samples) as f32
        } else {
            0.0
        },
        auto_stop_at_secs: auto_stop_at,
    })
}

fn mean(sum: f64, count: u64) -> f32 {
    if count == 0 { 0.0 } else { (sum / count as f64) as f32 }
}

fn print_report(report: &AnalyzeReport, timeout_secs: f64) {
    println!("{}", report.file);
    println!(
        "  {} Hz, {} channel(s), {:.2}s, {} frames",
        report.sample_rate, report.channels, report.duration_secs, report.frames
    );
    println!(
        "  speech: {}/{} frames ({:.0}%), mean confidence {:.2}",
        report.speech_frames,
        report.frames,
        report.speech_ratio * 100.0,
        report.mean_confidence
    );
    println!(
        "  quality: snr {:.1} dB, rms {:.3}, peak {:.3}, clipping {:.2}%",
        report.mean_snr_db,
        report.mean_rms,
        report.peak_level,
        report.clipping_pct * 100.0
    );
    match report.auto_stop_at_secs {
        Some(at) => println!("  a live session ({}s timeout) would auto-stop at {:.2}s", timeout_secs, at),
        None => println!("  no auto-stop within this file ({}s timeout)", timeout_secs),
    }
}
