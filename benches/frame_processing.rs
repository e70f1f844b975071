//! Criterion benchmarks for the per-frame processing budget.
//!
//! Each frame must finish DSP + VAD before the next frame's notional
//! arrival (256ms at 16kHz with 4096-sample frames).

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use voxcap::dsp::{self, AudioConfig, FrameProcessor};
use voxcap::vad::{VadConfig, VoiceActivityDetector};

fn sine_pcm16(freq: f32, rate: u32, count: usize, amplitude: f32) -> Vec<u8> {
    (0..count)
        .map(|n| amplitude * (2.0 * std::f32::consts::PI * freq * n as f32 / rate as f32).sin())
        .flat_map(|x| ((x * i16::MAX as f32) as i16).to_le_bytes())
        .collect()
}

fn bench_process_chain(c: &mut Criterion) {
    let config = AudioConfig::default();
    let raw = sine_pcm16(440.0, 16000, 4096, 0.5);

    c.bench_function("frame_processor/full_chain_4096", |b| {
        let mut processor = FrameProcessor::new();
        b.iter(|| black_box(processor.process(black_box(&raw), &config)));
    });

    let no_denoise = AudioConfig {
        enable_noise_reduction: false,
        ..Default::default()
    };
    c.bench_function("frame_processor/no_denoise_4096", |b| {
        let mut processor = FrameProcessor::new();
        b.iter(|| black_box(processor.process(black_box(&raw), &no_denoise)));
    });
}

fn bench_vad(c: &mut Criterion) {
    let mut processor = FrameProcessor::new();
    let config = AudioConfig {
        enable_noise_reduction: false,
        ..Default::default()
    };
    let raw = sine_pcm16(440.0, 16000, 4096, 0.5);
    let frame = processor.process(&raw, &config);

    c.bench_function("vad/process_frame_4096", |b| {
        let mut vad = VoiceActivityDetector::new(VadConfig::default());
        b.iter(|| black_box(vad.process_frame(black_box(&frame))));
    });
}

fn bench_resample(c: &mut Criterion) {
    let samples: Vec<f32> = (0..44100)
        .map(|n| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * n as f32 / 44100.0).sin())
        .collect();

    c.bench_function("dsp/resample_44k_to_16k_1s", |b| {
        b.iter(|| black_box(dsp::resample(black_box(&samples), 44100, 16000)));
    });
}

criterion_group!(benches, bench_process_chain, bench_vad, bench_resample);
criterion_main!(benches);
