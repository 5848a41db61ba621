// Session tuning knobs

use std::time::Duration;

/// Size of one range request during ingestion (10 MiB)
pub const DEFAULT_CHUNK_SIZE: u64 = 10 * 1024 * 1024;

/// Minimum spacing between forwarded progress samples
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(5000);

/// Inactivity before the transport controls hide
pub const DEFAULT_CONTROLS_HIDE_DELAY: Duration = Duration::from_millis(3000);

/// Jump applied by the arrow keys and skip buttons, in seconds
pub const DEFAULT_SKIP_SECONDS: f64 = 10.0;

/// Watched fraction from which closing offers to mark the item complete
pub const DEFAULT_COMPLETION_THRESHOLD: f64 = 0.9;

/// Configuration for one playback session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub chunk_size: u64,
    pub progress_interval: Duration,
    pub controls_hide_delay: Duration,
    pub skip_seconds: f64,
    pub completion_threshold: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            controls_hide_delay: DEFAULT_CONTROLS_HIDE_DELAY,
            skip_seconds: DEFAULT_SKIP_SECONDS,
            completion_threshold: DEFAULT_COMPLETION_THRESHOLD,
        }
    }
}

impl SessionConfig {
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        // A zero window would never advance the read cursor
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_controls_hide_delay(mut self, delay: Duration) -> Self {
        self.controls_hide_delay = delay;
        self
    }

    pub fn with_skip_seconds(mut self, seconds: f64) -> Self {
        self.skip_seconds = seconds.abs();
        self
    }

    pub fn with_completion_threshold(mut self, threshold: f64) -> Self {
        self.completion_threshold = threshold.clamp(0.0, 1.0);
        self
    }
}
