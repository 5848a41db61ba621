// Auto-hide timer for the on-screen transport controls

use std::time::{Duration, Instant};

/// Shows the controls on interaction and hides them after a quiet period,
/// but only while playing. Each interaction replaces the pending countdown.
#[derive(Debug, Clone)]
pub struct ControlSurfaceTimer {
    delay: Duration,
    visible: bool,
    deadline: Option<Instant>,
}

impl ControlSurfaceTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            visible: true,
            deadline: None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// When the pending countdown fires, if one is armed
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Pointer movement: show now and restart the countdown
    pub fn on_interaction(&mut self, now: Instant) {
        self.visible = true;
        self.deadline = Some(now + self.delay);
    }

    /// Fire the countdown if it is due. Returns true when visibility changed.
    pub fn tick(&mut self, now: Instant, is_playing: bool) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                if is_playing && self.visible {
                    log::debug!("Hiding controls after inactivity");
                    self.visible = false;
                    return true;
                }
                false
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(3000);

    #[test]
    fn test_visible_initially() {
        let timer = ControlSurfaceTimer::new(DELAY);
        assert!(timer.is_visible());
        assert!(timer.deadline().is_none());
    }

    #[test]
    fn test_hides_after_delay_while_playing() {
        let start = Instant::now();
        let mut timer = ControlSurfaceTimer::new(DELAY);
        timer.on_interaction(start);

        assert!(!timer.tick(start + Duration::from_millis(2999), true));
        assert!(timer.is_visible());
        assert!(timer.tick(start + DELAY, true));
        assert!(!timer.is_visible());
    }

    #[test]
    fn test_never_hides_while_paused() {
        let start = Instant::now();
        let mut timer = ControlSurfaceTimer::new(DELAY);
        timer.on_interaction(start);

        assert!(!timer.tick(start + Duration::from_secs(10), false));
        assert!(timer.is_visible());
        // The countdown was spent; resuming playback alone does not hide
        assert!(!timer.tick(start + Duration::from_secs(20), true));
        assert!(timer.is_visible());
    }

    #[test]
    fn test_last_interaction_wins() {
        let start = Instant::now();
        let mut timer = ControlSurfaceTimer::new(DELAY);
        timer.on_interaction(start);
        timer.on_interaction(start + Duration::from_millis(2000));

        assert!(!timer.tick(start + Duration::from_millis(3500), true));
        assert!(timer.is_visible());
        assert!(timer.tick(start + Duration::from_millis(5000), true));
        assert!(!timer.is_visible());
    }

    #[test]
    fn test_interaction_shows_hidden_controls() {
        let start = Instant::now();
        let mut timer = ControlSurfaceTimer::new(DELAY);
        timer.on_interaction(start);
        timer.tick(start + DELAY, true);
        assert!(!timer.is_visible());

        timer.on_interaction(start + Duration::from_secs(5));
        assert!(timer.is_visible());
    }
}
