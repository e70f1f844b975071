//! Error types for voxcap.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoxcapError {
    // Configuration errors
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidConfig { key: String, message: String },

    #[error("Unknown session: {id}")]
    UnknownSession { id: String },

    #[error("Session {id} is already active")]
    SessionAlreadyActive { id: String },

    #[error("Configuration error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Capture errors
    #[error("Capture source unavailable: {message}")]
    CaptureUnavailable { message: String },

    #[error("Capture read failed: {message}")]
    CaptureFailed { message: String },

    // Frame processing errors
    #[error("Malformed audio frame: {message}")]
    MalformedFrame { message: String },

    #[error("Frame processing failed: {message}")]
    Processing { message: String },

    // Transcription collaborator errors
    #[error("Transcription failed: {message}")]
    Transcription { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl VoxcapError {
    /// True for errors callers should treat as invalid API usage rather
    /// than runtime failures.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            VoxcapError::InvalidConfig { .. }
                | VoxcapError::UnknownSession { .. }
                | VoxcapError::SessionAlreadyActive { .. }
                | VoxcapError::ConfigParse(_)
        )
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VoxcapError>;
