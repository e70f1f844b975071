//! Per-session frame loop.
//!
//! One worker per active session pulls frames from the capture source,
//! runs DSP and VAD strictly in order, applies the silence/auto-stop and
//! dispatch policy, and absorbs steady-state failures so the loop never
//! aborts mid-session. All finalization happens here, exactly once, before
//! the thread exits.

use crate::audio::capture::CaptureSource;
use crate::clock::Clock;
use crate::defaults;
use crate::dsp::{self, AudioConfig, FrameProcessor};
use crate::session::events::{EndReason, SessionEvent};
use crate::session::timer::SilenceTimer;
use crate::session::types::{AudioSession, AudioTranscript, SessionState};
use crate::stt::{TranscriptionConfig, TranscriptionHandle, TranscriptionService};
use crate::vad::VoiceActivityDetector;
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Handle to a running session worker thread.
pub struct SessionRuntime {
    pub(crate) running: Arc<AtomicBool>,
    pub(crate) thread: Option<thread::JoinHandle<()>>,
}

impl SessionRuntime {
    /// Signals the worker to stop and waits for it to finalize.
    pub(crate) fn shutdown(mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                eprintln!("voxcap: session worker thread panicked");
            }
        }
    }
}

/// The frame loop for one active session.
pub(crate) struct SessionWorker {
    record: Arc<Mutex<AudioSession>>,
    capture: Box<dyn CaptureSource>,
    stt: Arc<dyn TranscriptionService>,
    events: Option<Sender<SessionEvent>>,
    running: Arc<AtomicBool>,
    clock: Arc<dyn Clock>,

    processor: FrameProcessor,
    vad: VoiceActivityDetector,
    timer: SilenceTimer,
    stt_handle: Option<TranscriptionHandle>,

    session_id: String,
    audio_config: AudioConfig,
    language: String,
    silence_timeout: Duration,
    min_confidence: f32,
    auto_stop: bool,
    calibrate_from_leading: bool,

    started_at: Instant,
    last_is_speech: Option<bool>,
    calibrated: bool,
    next_transcript_id: u64,
}

impl SessionWorker {
    pub(crate) fn new(
        record: Arc<Mutex<AudioSession>>,
        capture: Box<dyn CaptureSource>,
        stt: Arc<dyn TranscriptionService>,
        clock: Arc<dyn Clock>,
        events: Option<Sender<SessionEvent>>,
        running: Arc<AtomicBool>,
    ) -> Self {
        let (session_id, config, started_at) = {
            let rec = lock_record(&record);
            (
                rec.id.clone(),
                rec.config.clone(),
                rec.started_at().unwrap_or_else(|| clock.now()),
            )
        };

        Self {
            vad: VoiceActivityDetector::new(config.vad),
            timer: SilenceTimer::new(clock.clone()),
            processor: FrameProcessor::new(),
            stt_handle: None,
            session_id,
            audio_config: config.audio,
            language: config.language,
            silence_timeout: config.silence_timeout,
            min_confidence: config.min_confidence,
            auto_stop: config.auto_stop,
            calibrate_from_leading: config.calibrate_from_leading,
            started_at,
            last_is_speech: None,
            calibrated: false,
            next_transcript_id: 1,
            record,
            capture,
            stt,
            events,
            running,
            clock,
        }
    }

    /// Runs until stopped, auto-stopped, the source ends, or the source
    /// fails repeatedly. Frames are strictly sequential; detector state
    /// and the noise profile are order-dependent.
    pub(crate) fn run(mut self) {
        let poll = Duration::from_millis(defaults::CAPTURE_POLL_MS);
        let finite = self.capture.is_finite();
        let mut consecutive_errors: u32 = 0;

        loop {
            if !self.running.load(Ordering::SeqCst) {
                self.finalize(SessionState::Stopped, EndReason::Stopped);
                break;
            }
            if self.auto_stop && self.timer.expired() {
                self.finalize(SessionState::AutoStopped, EndReason::AutoStopped);
                break;
            }

            match self.capture.read_frame() {
                Ok(raw) if raw.is_empty() => {
                    if finite {
                        self.finalize(SessionState::Stopped, EndReason::SourceExhausted);
                        break;
                    }
                    // Live source warming up or momentarily dry.
                    thread::sleep(poll);
                }
                Ok(raw) => {
                    consecutive_errors = 0;
                    self.handle_frame(&raw);
                    if !finite {
                        thread::sleep(poll);
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;
                    self.note_error(format!("capture read failed: {}", e));
                    if consecutive_errors >= defaults::MAX_CONSECUTIVE_READ_ERRORS {
                        self.finalize(SessionState::Stopped, EndReason::CaptureLost);
                        break;
                    }
                    thread::sleep(poll);
                }
            }
        }
    }

    /// DSP → VAD → policy for one raw frame.
    fn handle_frame(&mut self, raw: &[u8]) {
        if self.calibrate_from_leading && !self.calibrated {
            let samples = dsp::decode_samples(raw, &self.audio_config);
            self.vad.calibrate(&samples);
            self.processor.set_noise_profile(&samples);
            self.calibrated = true;
        }

        let frame = self.processor.process(raw, &self.audio_config);
        if frame.is_empty() {
            // Non-empty input that decoded to nothing is a malformed frame.
            self.note_error("frame decoded to zero samples".to_string());
            return;
        }

        let result = self.vad.process_frame(&frame);

        if self.last_is_speech != Some(result.is_speech) {
            self.emit(SessionEvent::VoiceActivity {
                session_id: self.session_id.clone(),
                is_speech: result.is_speech,
            });
        }
        match (self.last_is_speech, result.is_speech) {
            // Silence timer runs from the last speech frame.
            (Some(true), false) => self.timer.arm(self.silence_timeout),
            (_, true) => self.timer.cancel(),
            _ => {}
        }
        self.last_is_speech = Some(result.is_speech);

        {
            let mut rec = lock_record(&self.record);
            rec.stats.chunks_processed += 1;
            let state = self.vad.state();
            rec.stats.speaking_secs = state.speech_duration.as_secs_f64();
            rec.stats.silence_secs = state.silence_duration.as_secs_f64();
        }

        if result.is_speech && result.confidence >= self.min_confidence {
            self.dispatch(&frame.samples);
        }
    }

    /// Lazily opens the transcription sub-session and forwards samples.
    fn dispatch(&mut self, samples: &[f32]) {
        let handle = match self.stt_handle {
            Some(handle) => handle,
            None => {
                let config = TranscriptionConfig {
                    language: self.language.clone(),
                    sample_rate: self.audio_config.sample_rate,
                };
                match self.stt.start_session(&config) {
                    Ok(handle) => {
                        self.stt_handle = Some(handle);
                        handle
                    }
                    Err(e) => {
                        self.note_error(format!("transcription session failed to open: {}", e));
                        return;
                    }
                }
            }
        };

        match self.stt.process_audio(handle, samples) {
            Ok(result) => {
                let offset_secs = self
                    .clock
                    .now()
                    .duration_since(self.started_at)
                    .as_secs_f64();
                let mut rec = lock_record(&self.record);
                rec.record_dispatch(result.confidence);

                // Below-threshold results are "no usable result", dropped
                // without being an error.
                if result.confidence >= self.min_confidence {
                    let transcript = AudioTranscript {
                        id: self.next_transcript_id,
                        text: result.text.clone(),
                        confidence: result.confidence,
                        offset_secs,
                        duration_secs: result.duration_secs,
                        is_final: result.is_final,
                        word_timings: result.word_timings,
                    };
                    self.next_transcript_id += 1;
                    rec.append_transcript(transcript);
                    drop(rec);
                    self.emit(SessionEvent::TranscriptAppended {
                        session_id: self.session_id.clone(),
                        text: result.text,
                        confidence: result.confidence,
                    });
                }
            }
            Err(e) => self.note_error(format!("transcription failed: {}", e)),
        }
    }

    /// Closes the session exactly once: timer, capture, and transcription
    /// sub-session released before statistics freeze.
    fn finalize(&mut self, state: SessionState, reason: EndReason) {
        {
            let rec = lock_record(&self.record);
            if !rec.is_active() {
                return;
            }
        }

        self.timer.cancel();
        if let Err(e) = self.capture.stop() {
            self.emit(SessionEvent::SessionError {
                session_id: self.session_id.clone(),
                message: format!("capture stop failed: {}", e),
            });
        }
        if let Some(handle) = self.stt_handle.take() {
            if let Err(e) = self.stt.stop_session(handle) {
                self.emit(SessionEvent::SessionError {
                    session_id: self.session_id.clone(),
                    message: format!("transcription session close failed: {}", e),
                });
            }
        }

        {
            let vad_state = *self.vad.state();
            let mut rec = lock_record(&self.record);
            rec.finalize(
                state,
                self.clock.now(),
                vad_state.speech_duration,
                vad_state.silence_duration,
            );
        }

        self.emit(SessionEvent::SessionEnded {
            session_id: self.session_id.clone(),
            reason,
        });
        self.running.store(false, Ordering::SeqCst);
    }

    fn note_error(&mut self, message: String) {
        lock_record(&self.record).note_error();
        self.emit(SessionEvent::SessionError {
            session_id: self.session_id.clone(),
            message,
        });
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.events {
            tx.send(event).ok();
        }
    }
}

fn lock_record(record: &Arc<Mutex<AudioSession>>) -> MutexGuard<'_, AudioSession> {
    record.lock().unwrap_or_else(PoisonError::into_inner)
}
