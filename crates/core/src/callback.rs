// Outbound notifications to presentation collaborators
// Time updates arrive many times per second, so progress is throttled before it leaves the core

use crate::state::PlayerState;
use std::time::{Duration, Instant};

/// Session event types
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackEvent {
    /// Session state changed
    StateChanged {
        old_state: PlayerState,
        new_state: PlayerState,
    },

    /// Throttled viewing progress, in seconds
    Progress { current_time: f64, duration: f64 },

    /// Ingestion advanced by one chunk
    LoadProgress { bytes_read: u64, total_size: u64 },

    /// Buffering state changed
    BufferingChanged { buffering: bool },

    /// End of stream reached
    Ended,

    /// Terminal error with a user-facing message
    Error { message: String },

    /// The user asked to close the session
    CloseRequested,
}

/// Session callback trait
/// Implementations should be lightweight and non-blocking
pub trait PlayerCallback: Send + Sync {
    /// Called when an event occurs
    fn on_event(&self, event: CallbackEvent);
}

/// One forwarded progress value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    pub current_time: f64,
    pub duration: f64,
}

impl From<ProgressSample> for CallbackEvent {
    fn from(sample: ProgressSample) -> Self {
        CallbackEvent::Progress {
            current_time: sample.current_time,
            duration: sample.duration,
        }
    }
}

/// Throttles time updates into progress samples.
///
/// A sample is forwarded only when the position is past zero and at least
/// `interval` has elapsed since the previous forwarded sample. Intervals
/// without time updates are simply skipped; nothing is emitted on a timer.
pub struct ProgressReporter {
    interval: Duration,
    last_forwarded: Option<Instant>,
}

impl ProgressReporter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_forwarded: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn sample(
        &mut self,
        now: Instant,
        current_time: f64,
        duration: f64,
    ) -> Option<ProgressSample> {
        if current_time <= 0.0 || !current_time.is_finite() {
            return None;
        }

        if let Some(last) = self.last_forwarded {
            if now.saturating_duration_since(last) < self.interval {
                return None;
            }
        }

        self.last_forwarded = Some(now);
        Some(ProgressSample {
            current_time,
            duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(5000);

    #[test]
    fn test_first_nonzero_sample_forwarded() {
        let mut reporter = ProgressReporter::new(INTERVAL);
        let start = Instant::now();
        assert_eq!(
            reporter.sample(start, 1.5, 60.0),
            Some(ProgressSample {
                current_time: 1.5,
                duration: 60.0
            })
        );
    }

    #[test]
    fn test_zero_position_never_forwarded() {
        let mut reporter = ProgressReporter::new(INTERVAL);
        let start = Instant::now();
        assert_eq!(reporter.sample(start, 0.0, 60.0), None);
        assert_eq!(reporter.sample(start + Duration::from_secs(30), 0.0, 60.0), None);
        // A zero sample does not start the throttle window
        assert!(reporter.sample(start + Duration::from_secs(31), 0.1, 60.0).is_some());
    }

    #[test]
    fn test_samples_throttled_to_interval() {
        let mut reporter = ProgressReporter::new(INTERVAL);
        let start = Instant::now();
        let mut forwarded = Vec::new();

        // Four time updates per second for 20 seconds
        for tick in 0..80u64 {
            let now = start + Duration::from_millis(tick * 250);
            let position = 1.0 + tick as f64 * 0.25;
            if reporter.sample(now, position, 600.0).is_some() {
                forwarded.push(now);
            }
        }

        assert_eq!(forwarded.len(), 4);
        for pair in forwarded.windows(2) {
            assert!(pair[1] - pair[0] >= INTERVAL);
        }
    }

    #[test]
    fn test_sample_exactly_at_interval_is_forwarded() {
        let mut reporter = ProgressReporter::new(INTERVAL);
        let start = Instant::now();
        assert!(reporter.sample(start, 3.0, 60.0).is_some());
        assert!(reporter.sample(start + Duration::from_millis(4999), 7.9, 60.0).is_none());
        assert!(reporter.sample(start + INTERVAL, 8.0, 60.0).is_some());
    }
}
