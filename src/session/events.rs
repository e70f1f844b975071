//! Session notifications for surrounding UI/messaging code.

use serde::{Deserialize, Serialize};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Explicit stop request.
    Stopped,
    /// Silence timeout elapsed with auto-stop enabled.
    AutoStopped,
    /// A finite capture source ran out of frames.
    SourceExhausted,
    /// The capture source failed repeatedly mid-session.
    CaptureLost,
}

/// Notifications emitted while sessions run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The VAD verdict changed for a session's stream.
    VoiceActivity { session_id: String, is_speech: bool },
    /// A transcript cleared the confidence threshold and was appended.
    TranscriptAppended {
        session_id: String,
        text: String,
        confidence: f32,
    },
    /// A per-frame error was absorbed; the session keeps running.
    SessionError { session_id: String, message: String },
    /// The session reached a terminal state. Emitted exactly once.
    SessionEnded {
        session_id: String,
        reason: EndReason,
    },
}

impl SessionEvent {
    /// Serialize the event to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize an event from a JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// The session this event belongs to.
    pub fn session_id(&self) -> &str {
        match self {
            SessionEvent::VoiceActivity { session_id, .. }
            | SessionEvent::TranscriptAppended { session_id, .. }
            | SessionEvent::SessionError { session_id, .. }
            | SessionEvent::SessionEnded { session_id, .. } => session_id,
        }
    }
}
