// Error handling for playback sessions

use std::fmt;

/// Errors raised while turning a source reference into a playable resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The IPC boundary could not report the file size (missing file, permissions)
    SizeQueryFailed(String),

    /// A byte range request failed; `offset` is where the failed window started
    ChunkReadFailed { offset: u64, reason: String },

    /// The load was superseded or its session was torn down
    Cancelled,
}

impl LoadError {
    /// Cancellation is the normal outcome of a replaced or closed session
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LoadError::Cancelled)
    }

    /// Message suitable for the error overlay. Offsets stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            LoadError::SizeQueryFailed(reason) => format!("Failed to load video: {}", reason),
            LoadError::ChunkReadFailed { reason, .. } => {
                format!("Failed to load video: {}", reason)
            }
            LoadError::Cancelled => "Loading was cancelled".to_string(),
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LoadError::SizeQueryFailed(msg) => write!(f, "Size query failed: {}", msg),
            LoadError::ChunkReadFailed { offset, reason } => {
                write!(f, "Chunk read failed at offset {}: {}", offset, reason)
            }
            LoadError::Cancelled => write!(f, "Load cancelled"),
        }
    }
}

impl std::error::Error for LoadError {}

/// Playback error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerError {
    /// Ingestion of the source failed
    Load(LoadError),

    /// The native primitive could not decode the media
    MediaDecodeError(String),

    /// Any other failure reported by the native primitive
    NativePlaybackError { code: Option<u16>, message: String },

    /// Invalid state transition
    InvalidState(String),

    /// IO error
    IoError(String),
}

impl PlayerError {
    /// Message surfaced to the user; native codes are left out
    pub fn user_message(&self) -> String {
        match self {
            PlayerError::Load(err) => err.user_message(),
            PlayerError::MediaDecodeError(msg) => format!("Failed to load video: {}", msg),
            PlayerError::NativePlaybackError { message, .. } => {
                format!("Failed to load video: {}", message)
            }
            PlayerError::InvalidState(msg) => msg.clone(),
            PlayerError::IoError(msg) => format!("Failed to load video: {}", msg),
        }
    }
}

impl fmt::Display for PlayerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PlayerError::Load(err) => write!(f, "Load error: {}", err),
            PlayerError::MediaDecodeError(msg) => write!(f, "Media decode error: {}", msg),
            PlayerError::NativePlaybackError { code: Some(code), message } => {
                write!(f, "Native playback error (code {}): {}", code, message)
            }
            PlayerError::NativePlaybackError { code: None, message } => {
                write!(f, "Native playback error: {}", message)
            }
            PlayerError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            PlayerError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for PlayerError {}

/// Result type alias for playback operations
pub type Result<T> = std::result::Result<T, PlayerError>;

// Conversion implementations
impl From<LoadError> for PlayerError {
    fn from(err: LoadError) -> Self {
        PlayerError::Load(err)
    }
}

impl From<std::io::Error> for PlayerError {
    fn from(err: std::io::Error) -> Self {
        PlayerError::IoError(err.to_string())
    }
}
