// Seams to the platform: the native playback primitive and its hosting surface

use crate::error::Result;
use std::sync::Arc;

/// In-memory media bytes plus the content type hint the primitive decodes with
#[derive(Debug, Clone)]
pub struct MediaBlob {
    data: Arc<[u8]>,
    content_type: &'static str,
}

impl MediaBlob {
    pub fn new(data: Vec<u8>, content_type: &'static str) -> Self {
        Self {
            data: data.into(),
            content_type,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }
}

/// What gets attached to the primitive
#[derive(Debug, Clone)]
pub enum AttachSource {
    /// Remote locator passed through unmodified
    Remote(String),
    /// Locally assembled bytes behind a revocable locator
    Blob { locator: String, blob: MediaBlob },
}

impl AttachSource {
    pub fn locator(&self) -> &str {
        match self {
            AttachSource::Remote(url) => url,
            AttachSource::Blob { locator, .. } => locator,
        }
    }
}

/// Native playback primitive.
/// Commands are fire-and-forget: outcomes come back later as `MediaEvent`s.
pub trait MediaElement: Send {
    /// Point the primitive at a new source
    fn attach(&mut self, source: &AttachSource) -> Result<()>;

    /// Drop the current source, if any
    fn detach(&mut self);

    /// Start or resume playback
    fn play(&mut self) -> Result<()>;

    /// Pause playback
    fn pause(&mut self) -> Result<()>;

    /// Set the absolute position (in seconds)
    fn set_current_time(&mut self, seconds: f64);

    /// Position as last reported by the primitive (in seconds)
    fn current_time(&self) -> f64;

    /// Set volume (0.0 - 1.0)
    fn set_volume(&mut self, volume: f32);

    /// Mute or unmute without touching the volume
    fn set_muted(&mut self, muted: bool);
}

/// Window or container that can enter an exclusive display mode
pub trait HostSurface: Send {
    /// Ask the platform to go fullscreen; the result arrives as a notification
    fn request_fullscreen(&mut self) -> Result<()>;

    /// Ask the platform to leave fullscreen
    fn exit_fullscreen(&mut self) -> Result<()>;
}

/// Raw lifecycle events emitted by the primitive and its host
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Source handed to the primitive
    SourceAttached,
    /// Metadata parsed; duration in seconds (may be NaN or infinite for live sources)
    LoadedMetadata { duration: f64 },
    /// Enough data buffered to start
    CanPlay,
    /// Playback stalled waiting for data
    Waiting,
    /// Data fetch stalled
    Stalled,
    /// Playback actually started
    Playing,
    /// Playback paused
    Pause,
    /// Position advanced (seconds)
    TimeUpdate { current_time: f64 },
    /// The primitive failed; `code` follows the platform's media error codes
    Error { code: Option<u16>, message: String },
    /// End of stream
    Ended,
    /// The platform's fullscreen-change notification
    FullscreenChanged { fullscreen: bool },
}

/// Platform media error code for an undecodable resource
pub const MEDIA_ERR_DECODE: u16 = 3;
/// Platform media error code for an unsupported source
pub const MEDIA_ERR_SRC_NOT_SUPPORTED: u16 = 4;
