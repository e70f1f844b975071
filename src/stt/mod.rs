//! Transcription collaborator interface.
//!
//! The engine itself lives outside this crate; the pipeline talks to any
//! [`TranscriptionService`] through per-session handles so one session's
//! teardown can never touch another's in-flight work.

use crate::defaults;
use crate::error::{Result, VoxcapError};
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Configuration handed to the collaborator when opening a sub-session.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionConfig {
    /// Language hint, or "auto" for detection.
    pub language: String,
    /// Sample rate of the audio that will be dispatched, in Hz.
    pub sample_rate: u32,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            sample_rate: defaults::SAMPLE_RATE,
        }
    }
}

/// Opaque per-session handle issued by the collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TranscriptionHandle(pub u64);

/// Word-level timing within a transcription result, in seconds from the
/// start of the dispatched buffer.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start_secs: f32,
    pub end_secs: f32,
}

/// One transcription result from the collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionResult {
    pub text: String,
    /// Collaborator confidence, 0.0 to 1.0. Below-threshold results are
    /// "no usable result", not errors.
    pub confidence: f32,
    pub is_final: bool,
    /// Duration of the transcribed audio, in seconds.
    pub duration_secs: f32,
    pub language: Option<String>,
    pub alternatives: Vec<String>,
    pub word_timings: Vec<WordTiming>,
}

impl Default for TranscriptionResult {
    fn default() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            is_final: true,
            duration_secs: 0.0,
            language: None,
            alternatives: Vec::new(),
            word_timings: Vec::new(),
        }
    }
}

/// Trait for the speech-to-text collaborator.
///
/// This trait allows swapping implementations (real engine vs mock).
pub trait TranscriptionService: Send + Sync {
    /// Open a sub-session and return its handle.
    fn start_session(&self, config: &TranscriptionConfig) -> Result<TranscriptionHandle>;

    /// Close a sub-session. Closing an unknown handle is an error.
    fn stop_session(&self, handle: TranscriptionHandle) -> Result<()>;

    /// Transcribe one buffer of mono samples under an open sub-session.
    fn process_audio(
        &self,
        handle: TranscriptionHandle,
        samples: &[f32],
    ) -> Result<TranscriptionResult>;
}

/// Mock transcription service for testing.
pub struct MockTranscriptionService {
    next_handle: AtomicU64,
    open_handles: Mutex<HashSet<u64>>,
    responses: Mutex<Vec<TranscriptionResult>>,
    fallback: TranscriptionResult,
    call_count: AtomicU64,
    should_fail_start: bool,
    should_fail_process: bool,
}

impl MockTranscriptionService {
    /// Create a mock returning an empty default result.
    pub fn new() -> Self {
        Self {
            next_handle: AtomicU64::new(1),
            open_handles: Mutex::new(HashSet::new()),
            responses: Mutex::new(Vec::new()),
            fallback: TranscriptionResult {
                text: "mock transcription".to_string(),
                confidence: 0.9,
                ..Default::default()
            },
            call_count: AtomicU64::new(0),
            should_fail_start: false,
            should_fail_process: false,
        }
    }

    /// Configure the fallback response text.
    pub fn with_response(mut self, text: &str) -> Self {
        self.fallback.text = text.to_string();
        self
    }

    /// Configure the fallback response confidence.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.fallback.confidence = confidence;
        self
    }

    /// Queue specific results consumed in order before the fallback kicks in.
    pub fn with_results(self, results: Vec<TranscriptionResult>) -> Self {
        {
            let mut queue = self
                .responses
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *queue = results;
            queue.reverse();
        }
        self
    }

    /// Configure the mock to fail when opening sub-sessions.
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail on every process call.
    pub fn with_process_failure(mut self) -> Self {
        self.should_fail_process = true;
        self
    }

    /// Number of process_audio calls observed.
    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Number of currently open sub-sessions.
    pub fn open_sessions(&self) -> usize {
        self.open_handles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

impl Default for MockTranscriptionService {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptionService for MockTranscriptionService {
    fn start_session(&self, _config: &TranscriptionConfig) -> Result<TranscriptionHandle> {
        if self.should_fail_start {
            return Err(VoxcapError::Transcription {
                message: "mock session start failure".to_string(),
            });
        }
        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.open_handles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(id);
        Ok(TranscriptionHandle(id))
    }

    fn stop_session(&self, handle: TranscriptionHandle) -> Result<()> {
        let removed = self
            .open_handles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&handle.0);
        if removed {
            Ok(())
        } else {
            Err(VoxcapError::Transcription {
                message: format!("unknown transcription handle {}", handle.0),
            })
        }
    }

    fn process_audio(
        &self,
        handle: TranscriptionHandle,
        samples: &[f32],
    ) -> Result<TranscriptionResult> {
        self.call_count.fetch_add(1, Ordering::Relaxed);

        if self.should_fail_process {
            return Err(VoxcapError::Transcription {
                message: "mock transcription failure".to_string(),
            });
        }
        let known = self
            .open_handles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(&handle.0);
        if !known {
            return Err(VoxcapError::Transcription {
                message: format!("unknown transcription handle {}", handle.0),
            });
        }

        let queued = self
            .responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop();
        let mut result = queued.unwrap_or_else(|| self.fallback.clone());
        if result.duration_secs == 0.0 {
            result.duration_secs = samples.len() as f32 / defaults::SAMPLE_RATE as f32;
        }
        Ok(result)
    }
}
