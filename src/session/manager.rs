//! Session registry and lifecycle API.
//!
//! The manager owns every session record, enforces the single-activation
//! rule, spawns one worker per active session, and serves the query
//! surface. Sessions are fully isolated from each other: each gets its own
//! processor/detector pair, and the shared transcription collaborator is
//! only ever addressed through per-session handles.

use crate::audio::capture::CaptureSource;
use crate::clock::{Clock, SystemClock};
use crate::error::{Result, VoxcapError};
use crate::session::events::SessionEvent;
use crate::session::orchestrator::{SessionRuntime, SessionWorker};
use crate::session::types::{
    AggregateStats, AudioSession, SessionConfig, SessionSnapshot, SessionState,
};
use crate::stt::TranscriptionService;
use crossbeam_channel::Sender;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

struct SessionEntry {
    record: Arc<Mutex<AudioSession>>,
    runtime: Option<SessionRuntime>,
}

/// Owns and orchestrates capture sessions.
pub struct SessionManager {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    next_id: AtomicU64,
    stt: Arc<dyn TranscriptionService>,
    clock: Arc<dyn Clock>,
    events: Option<Sender<SessionEvent>>,
}

impl SessionManager {
    /// Creates a manager around a transcription collaborator.
    pub fn new(stt: Arc<dyn TranscriptionService>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            stt,
            clock: Arc::new(SystemClock),
            events: None,
        }
    }

    /// Sets a custom clock (for deterministic testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets an event sender for session notifications.
    pub fn with_event_sender(mut self, tx: Sender<SessionEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Allocates a new session in the Created state.
    pub fn create_session(&self, config: SessionConfig) -> Result<String> {
        config.validate()?;

        let id = format!("sess-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = Arc::new(Mutex::new(AudioSession::new(id.clone(), config)));
        self.lock_sessions().insert(
            id.clone(),
            SessionEntry {
                record,
                runtime: None,
            },
        );
        Ok(id)
    }

    /// Starts a session: acquires the capture source, activates the
    /// record, and spawns the frame loop.
    ///
    /// Fails fast on an unknown id or a session outside the Created state.
    /// A capture acquisition failure is fatal to the start: the session
    /// stays non-active and the error is surfaced without retry.
    pub fn start(&self, id: &str, mut capture: Box<dyn CaptureSource>) -> Result<()> {
        let record = self.record(id)?;

        {
            let mut rec = lock_record(&record);
            match rec.state {
                SessionState::Created => {}
                SessionState::Active => {
                    return Err(VoxcapError::SessionAlreadyActive {
                        id: rec.id.clone(),
                    });
                }
                _ => {
                    return Err(VoxcapError::InvalidConfig {
                        key: "session".to_string(),
                        message: format!("session {} has ended; create a new session", rec.id),
                    });
                }
            }

            capture.start()?;
            rec.activate(self.clock.now())?;
        }

        let running = Arc::new(AtomicBool::new(true));
        let worker = SessionWorker::new(
            record,
            capture,
            self.stt.clone(),
            self.clock.clone(),
            self.events.clone(),
            running.clone(),
        );
        let handle = thread::spawn(move || worker.run());

        let mut sessions = self.lock_sessions();
        if let Some(entry) = sessions.get_mut(id) {
            entry.runtime = Some(SessionRuntime {
                running,
                thread: Some(handle),
            });
        }
        Ok(())
    }

    /// Stops a session and returns its finalized snapshot.
    ///
    /// Idempotent: stopping a session that is not active is a no-op that
    /// returns the current (possibly already finalized) snapshot.
    pub fn stop(&self, id: &str) -> Result<SessionSnapshot> {
        let (record, runtime) = {
            let mut sessions = self.lock_sessions();
            let entry = sessions
                .get_mut(id)
                .ok_or_else(|| VoxcapError::UnknownSession { id: id.to_string() })?;
            (entry.record.clone(), entry.runtime.take())
        };

        if let Some(runtime) = runtime {
            runtime.shutdown();
        }

        Ok(lock_record(&record).snapshot(self.clock.now()))
    }

    /// Current snapshot of one session.
    pub fn snapshot(&self, id: &str) -> Result<SessionSnapshot> {
        let record = self.record(id)?;
        let snap = lock_record(&record).snapshot(self.clock.now());
        Ok(snap)
    }

    /// Snapshots of every known session.
    pub fn sessions(&self) -> Vec<SessionSnapshot> {
        let now = self.clock.now();
        let sessions = self.lock_sessions();
        let mut snaps: Vec<SessionSnapshot> = sessions
            .values()
            .map(|entry| lock_record(&entry.record).snapshot(now))
            .collect();
        snaps.sort_by(|a, b| a.id.cmp(&b.id));
        snaps
    }

    /// Stops (if needed) and removes a session, returning its final
    /// snapshot. The session id is never reused.
    pub fn remove_session(&self, id: &str) -> Result<SessionSnapshot> {
        let snapshot = self.stop(id)?;
        self.lock_sessions().remove(id);
        Ok(snapshot)
    }

    /// Global statistics across all known sessions.
    pub fn aggregate_stats(&self) -> AggregateStats {
        let snaps = self.sessions();
        let total_sessions = snaps.len();
        let active_sessions = snaps.iter().filter(|s| s.is_active).count();
        let total_duration_secs = snaps.iter().map(|s| s.stats.total_secs).sum();
        let total_transcripts: usize = snaps.iter().map(|s| s.transcripts.len()).sum();

        let confidence_sum: f64 = snaps
            .iter()
            .flat_map(|s| s.transcripts.iter())
            .map(|t| t.confidence as f64)
            .sum();
        let mean_confidence = if total_transcripts == 0 {
            0.0
        } else {
            confidence_sum / total_transcripts as f64
        };

        AggregateStats {
            total_sessions,
            active_sessions,
            total_duration_secs,
            total_transcripts,
            mean_confidence,
        }
    }

    fn record(&self, id: &str) -> Result<Arc<Mutex<AudioSession>>> {
        self.lock_sessions()
            .get(id)
            .map(|entry| entry.record.clone())
            .ok_or_else(|| VoxcapError::UnknownSession { id: id.to_string() })
    }

    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn lock_record(record: &Arc<Mutex<AudioSession>>) -> MutexGuard<'_, AudioSession> {
    record.lock().unwrap_or_else(PoisonError::into_inner)
}
