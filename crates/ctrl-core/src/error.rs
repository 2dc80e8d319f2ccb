//! Error types for the ctrl bridge

use thiserror::Error;

/// Result type for ctrl operations
pub type Result<T> = std::result::Result<T, CtrlError>;

/// ctrl error types
#[derive(Debug, Error)]
pub enum CtrlError {
    /// Endpoint could not be bound at startup
    #[error("Bind failed: {0}")]
    Bind(String),

    /// Transport I/O failure or lost session
    #[error("IPC error: {0}")]
    IpcError(String),

    /// Request/reply ordering was violated
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Frame could not be decoded into an agent command
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Agent missed step deadline
    #[error("Sync timeout: agent missed step deadline")]
    SyncTimeout,

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Invalid configuration value
    #[error("Config error: {0}")]
    Config(String),
}

impl CtrlError {
    /// Whether the error ends the current agent session.
    ///
    /// Timeouts and malformed frames leave the session usable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CtrlError::SyncTimeout | CtrlError::MalformedFrame(_))
    }
}

impl From<serde_json::Error> for CtrlError {
    fn from(err: serde_json::Error) -> Self {
        CtrlError::SerializationError(err.to_string())
    }
}
