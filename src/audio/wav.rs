//! WAV file capture source.
//!
//! Reads a whole WAV file up front and replays it as fixed-size raw PCM
//! frames at the file's native rate and channel layout; rate conversion is
//! the processing stage's job.

use crate::audio::capture::{CaptureSource, pcm16_bytes};
use crate::defaults;
use crate::error::{Result, VoxcapError};
use std::io::Read;
use std::path::Path;

/// Finite capture source over WAV data.
pub struct WavCaptureSource {
    samples: Vec<i16>,
    position: usize,
    chunk_samples: usize,
    sample_rate: u32,
    channels: u16,
}

impl WavCaptureSource {
    /// Create from any reader (for testing/flexibility).
    pub fn from_reader(reader: Box<dyn Read + Send>) -> Result<Self> {
        let mut wav_reader =
            hound::WavReader::new(reader).map_err(|e| VoxcapError::CaptureUnavailable {
                message: format!("Failed to parse WAV data: {}", e),
            })?;

        let spec = wav_reader.spec();
        let samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, 16) => wav_reader
                .samples::<i16>()
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| VoxcapError::CaptureUnavailable {
                    message: format!("Failed to read WAV samples: {}", e),
                })?,
            (hound::SampleFormat::Float, 32) => wav_reader
                .samples::<f32>()
                .map(|s| s.map(|x| (x.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| VoxcapError::CaptureUnavailable {
                    message: format!("Failed to read WAV samples: {}", e),
                })?,
            (format, bits) => {
                return Err(VoxcapError::CaptureUnavailable {
                    message: format!("Unsupported WAV format: {:?} {}-bit", format, bits),
                });
            }
        };

        Ok(Self {
            samples,
            position: 0,
            chunk_samples: defaults::FRAME_SAMPLES * spec.channels as usize,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
        })
    }

    /// Create from a WAV file on disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_reader(Box::new(std::io::Cursor::new(data)))
    }

    /// Sample rate declared by the WAV header, in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count declared by the WAV header.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Total interleaved sample count.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl CaptureSource for WavCaptureSource {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Vec<u8>> {
        if self.position >= self.samples.len() {
            return Ok(Vec::new());
        }
        let end = (self.position + self.chunk_samples).min(self.samples.len());
        let chunk = &self.samples[self.position..end];
        self.position = end;
        Ok(pcm16_bytes(chunk))
    }

    fn is_finite(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn make_wav_data(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_reads_header_metadata() {
        let data = make_wav_data(44100, 2, &[0i16; 100]);
        let source = WavCaptureSource::from_reader(Box::new(Cursor::new(data))).unwrap();
        assert_eq!(source.sample_rate(), 44100);
        assert_eq!(source.channels(), 2);
        assert_eq!(source.len(), 100);
    }

    #[test]
    fn test_reads_samples_in_chunks_until_exhausted() {
        let samples: Vec<i16> = (0..10000).map(|i| (i % 1000) as i16).collect();
        let data = make_wav_data(16000, 1, &samples);
        let mut source = WavCaptureSource::from_reader(Box::new(Cursor::new(data))).unwrap();

        let mut collected = Vec::new();
        loop {
            let frame = source.read_frame().unwrap();
            if frame.is_empty() {
                break;
            }
            collected.extend(
                frame
                    .chunks_exact(2)
                    .map(|b| i16::from_le_bytes([b[0], b[1]])),
            );
        }
        assert_eq!(collected, samples);
    }

    #[test]
    fn test_first_chunk_has_frame_size() {
        let samples = vec![42i16; defaults::FRAME_SAMPLES * 2];
        let data = make_wav_data(16000, 1, &samples);
        let mut source = WavCaptureSource::from_reader(Box::new(Cursor::new(data))).unwrap();

        let frame = source.read_frame().unwrap();
        assert_eq!(frame.len(), defaults::FRAME_SAMPLES * 2);
    }

    #[test]
    fn test_invalid_data_is_capture_unavailable() {
        let result = WavCaptureSource::from_reader(Box::new(Cursor::new(vec![1u8, 2, 3])));
        match result {
            Err(VoxcapError::CaptureUnavailable { .. }) => {}
            other => panic!("Expected CaptureUnavailable, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_source_is_finite() {
        let data = make_wav_data(16000, 1, &[0i16; 10]);
        let source = WavCaptureSource::from_reader(Box::new(Cursor::new(data))).unwrap();
        assert!(source.is_finite());
    }

    #[test]
    fn test_empty_wav_reads_empty() {
        let data = make_wav_data(16000, 1, &[]);
        let mut source = WavCaptureSource::from_reader(Box::new(Cursor::new(data))).unwrap();
        assert!(source.is_empty());
        assert!(source.read_frame().unwrap().is_empty());
    }
}
