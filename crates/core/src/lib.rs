// Core types and traits for Marquee playback sessions

pub mod callback;
pub mod config;
pub mod error;
pub mod player;
pub mod state;
pub mod time;

// Re-export commonly used types
pub use callback::{CallbackEvent, PlayerCallback, ProgressReporter, ProgressSample};
pub use config::SessionConfig;
pub use error::{LoadError, PlayerError, Result};
pub use player::{AttachSource, HostSurface, MediaBlob, MediaElement, MediaEvent};
pub use state::{PlaybackState, PlayerState, PlayerStateContainer};
pub use time::format_time;
