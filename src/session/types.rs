//! Session records, configuration, and statistics.

use crate::defaults;
use crate::dsp::AudioConfig;
use crate::error::{Result, VoxcapError};
use crate::stt::WordTiming;
use crate::vad::VadConfig;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Lifecycle of one capture session.
///
/// `Created → Active → {Stopped, AutoStopped}`; the terminal states are
/// final for that session id, reactivation requires a new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    Active,
    Stopped,
    AutoStopped,
}

/// Per-session configuration snapshot, fixed at creation.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// DSP configuration for this session's frames.
    pub audio: AudioConfig,
    /// Detector configuration for this session's stream.
    pub vad: VadConfig,
    /// Language hint for the transcription collaborator.
    pub language: String,
    /// Silence span after the last speech frame before auto-stop.
    pub silence_timeout: Duration,
    /// Minimum VAD confidence to dispatch a frame, and minimum collaborator
    /// confidence to keep a transcript.
    pub min_confidence: f32,
    /// Auto-stop the session when the silence timeout elapses.
    pub auto_stop: bool,
    /// Calibrate the detector and noise profile from the first captured
    /// frame.
    pub calibrate_from_leading: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            vad: VadConfig::default(),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            silence_timeout: Duration::from_millis(defaults::SILENCE_TIMEOUT_MS),
            min_confidence: defaults::MIN_CONFIDENCE,
            auto_stop: true,
            calibrate_from_leading: false,
        }
    }
}

impl SessionConfig {
    /// Validates the nested configs and session-level ranges.
    pub fn validate(&self) -> Result<()> {
        self.audio.validate()?;
        self.vad.validate()?;
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(VoxcapError::InvalidConfig {
                key: "min_confidence".to_string(),
                message: "must be within [0, 1]".to_string(),
            });
        }
        Ok(())
    }
}

/// One accepted transcript. Appended only; insertion order is
/// chronological.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTranscript {
    pub id: u64,
    pub text: String,
    pub confidence: f32,
    /// Seconds from session start when the transcript arrived.
    pub offset_secs: f64,
    /// Duration of the transcribed audio, in seconds.
    pub duration_secs: f32,
    pub is_final: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub word_timings: Vec<WordTiming>,
}

/// Monotonically accumulating session counters.
///
/// Derived values (average confidence, words per minute, activity ratio)
/// are recomputed on read from the session record.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionStatistics {
    pub speaking_secs: f64,
    pub silence_secs: f64,
    pub total_secs: f64,
    pub chunks_processed: u64,
    pub error_count: u64,
    pub silence_periods: u32,
}

/// Read-only view of a session for the query surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub state: SessionState,
    pub is_active: bool,
    pub stats: SessionStatistics,
    pub average_confidence: f64,
    pub words_per_minute: f64,
    pub voice_activity_ratio: f64,
    pub transcripts: Vec<AudioTranscript>,
}

/// Global statistics across every session the manager has seen.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AggregateStats {
    pub total_sessions: usize,
    pub active_sessions: usize,
    pub total_duration_secs: f64,
    pub total_transcripts: usize,
    pub mean_confidence: f64,
}

/// One capture session's full record.
#[derive(Debug)]
pub struct AudioSession {
    pub id: String,
    pub config: SessionConfig,
    pub state: SessionState,
    pub transcripts: Vec<AudioTranscript>,
    pub stats: SessionStatistics,
    started_at: Option<Instant>,
    ended_at: Option<Instant>,
    /// Confidence of every dispatched result, dropped ones included; the
    /// silence-period count comes from threshold crossings over this.
    confidence_trace: Vec<f32>,
}

impl AudioSession {
    pub fn new(id: String, config: SessionConfig) -> Self {
        Self {
            id,
            config,
            state: SessionState::Created,
            transcripts: Vec::new(),
            stats: SessionStatistics::default(),
            started_at: None,
            ended_at: None,
            confidence_trace: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Alias for the capture-in-progress flag; a session records exactly
    /// while it is active.
    pub fn is_recording(&self) -> bool {
        self.is_active()
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Transitions Created → Active. Each session activates at most once.
    pub fn activate(&mut self, now: Instant) -> Result<()> {
        match self.state {
            SessionState::Created => {
                self.state = SessionState::Active;
                self.started_at = Some(now);
                Ok(())
            }
            SessionState::Active => Err(VoxcapError::SessionAlreadyActive {
                id: self.id.clone(),
            }),
            SessionState::Stopped | SessionState::AutoStopped => {
                Err(VoxcapError::InvalidConfig {
                    key: "session".to_string(),
                    message: format!("session {} has ended; create a new session", self.id),
                })
            }
        }
    }

    /// Records the confidence of a dispatched transcription result,
    /// whether or not the transcript was kept.
    pub fn record_dispatch(&mut self, confidence: f32) {
        self.confidence_trace.push(confidence);
    }

    /// Appends an accepted transcript in arrival order.
    pub fn append_transcript(&mut self, transcript: AudioTranscript) {
        self.transcripts.push(transcript);
    }

    pub fn note_error(&mut self) {
        self.stats.error_count += 1;
    }

    /// Closes the session into a terminal state and freezes statistics.
    ///
    /// Speech/silence come from the detector's cumulative durations; total
    /// duration is wall-clock, widened to the stream length for sources
    /// that replay faster than real time.
    pub fn finalize(
        &mut self,
        state: SessionState,
        now: Instant,
        speaking: Duration,
        silence: Duration,
    ) {
        self.state = state;
        self.ended_at = Some(now);

        let wall = self
            .started_at
            .map(|start| now.duration_since(start).as_secs_f64())
            .unwrap_or(0.0);
        let stream = speaking.as_secs_f64() + silence.as_secs_f64();

        self.stats.speaking_secs = speaking.as_secs_f64();
        self.stats.silence_secs = silence.as_secs_f64();
        self.stats.total_secs = wall.max(stream);
        self.stats.silence_periods =
            downward_crossings(&self.confidence_trace, self.config.min_confidence);
    }

    /// Mean transcript confidence; zero with no transcripts.
    pub fn average_confidence(&self) -> f64 {
        if self.transcripts.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.transcripts.iter().map(|t| t.confidence as f64).sum();
        sum / self.transcripts.len() as f64
    }

    /// Transcribed words per minute of speaking time.
    pub fn words_per_minute(&self) -> f64 {
        let minutes = self.stats.speaking_secs / 60.0;
        if minutes <= 0.0 {
            return 0.0;
        }
        let words: usize = self
            .transcripts
            .iter()
            .map(|t| t.text.split_whitespace().count())
            .sum();
        words as f64 / minutes
    }

    /// Fraction of classified time spent speaking.
    pub fn voice_activity_ratio(&self) -> f64 {
        let classified = self.stats.speaking_secs + self.stats.silence_secs;
        if classified <= 0.0 {
            return 0.0;
        }
        self.stats.speaking_secs / classified
    }

    /// Snapshot for the query surface; an active session reports its
    /// elapsed time so far as total.
    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        let mut stats = self.stats;
        if self.is_active() {
            if let Some(start) = self.started_at {
                stats.total_secs = now.duration_since(start).as_secs_f64();
            }
        }

        SessionSnapshot {
            id: self.id.clone(),
            state: self.state,
            is_active: self.is_active(),
            stats,
            average_confidence: self.average_confidence(),
            words_per_minute: self.words_per_minute(),
            voice_activity_ratio: self.voice_activity_ratio(),
            transcripts: self.transcripts.clone(),
        }
    }
}

/// Counts transitions from at-or-above threshold to below threshold.
fn downward_crossings(trace: &[f32], threshold: f32) -> u32 {
    trace
        .windows(2)
        .filter(|pair| pair[0] >= threshold && pair[1] < threshold)
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(id: u64, text: &str, confidence: f32) -> AudioTranscript {
        AudioTranscript {
            id,
            text: text.to_string(),
            confidence,
            offset_secs: id as f64,
            duration_secs: 1.0,
            is_final: true,
            word_timings: Vec::new(),
        }
    }

    #[test]
    fn test_session_starts_created() {
        let session = AudioSession::new("sess-1".to_string(), SessionConfig::default());
        assert_eq!(session.state, SessionState::Created);
        assert!(!session.is_active());
        assert!(!session.is_recording());
    }

    #[test]
    fn test_activate_transitions_once() {
        let mut session = AudioSession::new("sess-1".to_string(), SessionConfig::default());
        let now = Instant::now();

        session.activate(now).unwrap();
        assert!(session.is_active());
        assert_eq!(session.started_at(), Some(now));

        match session.activate(now) {
            Err(VoxcapError::SessionAlreadyActive { id }) => assert_eq!(id, "sess-1"),
            other => panic!("Expected SessionAlreadyActive, got {:?}", other),
        }
    }

    #[test]
    fn test_activate_after_finalize_fails() {
        let mut session = AudioSession::new("sess-1".to_string(), SessionConfig::default());
        let now = Instant::now();
        session.activate(now).unwrap();
        session.finalize(SessionState::Stopped, now, Duration::ZERO, Duration::ZERO);

        assert!(session.activate(now).is_err());
    }

    #[test]
    fn test_finalize_uses_wall_clock_total() {
        let mut session = AudioSession::new("sess-1".to_string(), SessionConfig::default());
        let start = Instant::now();
        session.activate(start).unwrap();

        let end = start + Duration::from_secs(10);
        session.finalize(
            SessionState::Stopped,
            end,
            Duration::from_secs(6),
            Duration::from_secs(3),
        );

        assert_eq!(session.stats.total_secs, 10.0);
        assert_eq!(session.stats.speaking_secs, 6.0);
        assert_eq!(session.stats.silence_secs, 3.0);
        // Invariant: classified time never exceeds total (plus tolerance).
        assert!(
            session.stats.speaking_secs + session.stats.silence_secs
                <= session.stats.total_secs + 1e-6
        );
    }

    #[test]
    fn test_finalize_widens_total_for_fast_replay() {
        let mut session = AudioSession::new("sess-1".to_string(), SessionConfig::default());
        let start = Instant::now();
        session.activate(start).unwrap();

        // File replayed faster than real time: stream longer than wall.
        session.finalize(
            SessionState::Stopped,
            start + Duration::from_millis(100),
            Duration::from_secs(2),
            Duration::from_secs(1),
        );
        assert_eq!(session.stats.total_secs, 3.0);
    }

    #[test]
    fn test_silence_periods_count_downward_crossings() {
        let mut session = AudioSession::new("sess-1".to_string(), SessionConfig::default());
        let now = Instant::now();
        session.activate(now).unwrap();

        // min_confidence defaults to 0.5; crossings at 0.8→0.3 and 0.7→0.2.
        for c in [0.8, 0.3, 0.7, 0.2, 0.1] {
            session.record_dispatch(c);
        }
        session.finalize(SessionState::Stopped, now, Duration::ZERO, Duration::ZERO);
        assert_eq!(session.stats.silence_periods, 2);
    }

    #[test]
    fn test_downward_crossings_edge_cases() {
        assert_eq!(downward_crossings(&[], 0.5), 0);
        assert_eq!(downward_crossings(&[0.8], 0.5), 0);
        assert_eq!(downward_crossings(&[0.2, 0.3, 0.1], 0.5), 0);
        assert_eq!(downward_crossings(&[0.8, 0.9, 0.7], 0.5), 0);
        assert_eq!(downward_crossings(&[0.5, 0.49], 0.5), 1);
    }

    #[test]
    fn test_average_confidence() {
        let mut session = AudioSession::new("sess-1".to_string(), SessionConfig::default());
        assert_eq!(session.average_confidence(), 0.0);

        session.append_transcript(transcript(1, "one", 0.8));
        session.append_transcript(transcript(2, "two", 0.6));
        assert!((session.average_confidence() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_words_per_minute() {
        let mut session = AudioSession::new("sess-1".to_string(), SessionConfig::default());
        let start = Instant::now();
        session.activate(start).unwrap();
        session.append_transcript(transcript(1, "the quick brown fox", 0.9));
        session.append_transcript(transcript(2, "jumps over", 0.9));

        session.finalize(
            SessionState::Stopped,
            start + Duration::from_secs(60),
            Duration::from_secs(30),
            Duration::from_secs(30),
        );
        // 6 words over 0.5 minutes of speaking.
        assert!((session.words_per_minute() - 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_words_per_minute_zero_without_speech() {
        let session = AudioSession::new("sess-1".to_string(), SessionConfig::default());
        assert_eq!(session.words_per_minute(), 0.0);
    }

    #[test]
    fn test_voice_activity_ratio() {
        let mut session = AudioSession::new("sess-1".to_string(), SessionConfig::default());
        let now = Instant::now();
        session.activate(now).unwrap();
        session.finalize(
            SessionState::Stopped,
            now + Duration::from_secs(4),
            Duration::from_secs(3),
            Duration::from_secs(1),
        );
        assert!((session.voice_activity_ratio() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_snapshot_reports_elapsed_while_active() {
        let mut session = AudioSession::new("sess-1".to_string(), SessionConfig::default());
        let start = Instant::now();
        session.activate(start).unwrap();

        let snap = session.snapshot(start + Duration::from_secs(5));
        assert!(snap.is_active);
        assert_eq!(snap.stats.total_secs, 5.0);
        assert_eq!(snap.state, SessionState::Active);
    }

    #[test]
    fn test_transcripts_keep_insertion_order() {
        let mut session = AudioSession::new("sess-1".to_string(), SessionConfig::default());
        for i in 0..5 {
            session.append_transcript(transcript(i, "word", 0.9));
        }
        let ids: Vec<u64> = session.transcripts.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_session_config_default_is_valid() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_session_config_rejects_bad_confidence() {
        let config = SessionConfig {
            min_confidence: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_session_state_serializes_snake_case() {
        let json = serde_json::to_string(&SessionState::AutoStopped).unwrap();
        assert_eq!(json, "\"auto_stopped\"");
    }
}
