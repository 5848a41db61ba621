// Canonical playback session state

use crate::error::{PlayerError, Result};
use parking_lot::RwLock;
use std::sync::Arc;

/// Player state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// No resource attached yet
    Idle,
    /// Resource attached, waiting for playable data
    Loading,
    /// Enough data buffered to start
    Ready,
    /// Media is currently playing
    Playing,
    /// Media is paused
    Paused,
    /// End of stream reached
    Ended,
    /// Ingestion or the native primitive failed
    Errored,
}

impl PlayerState {
    /// Terminal states ignore playback commands until a new source starts a new session
    pub fn is_terminal(self) -> bool {
        matches!(self, PlayerState::Ended | PlayerState::Errored)
    }
}

/// Snapshot of everything the control surface renders
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub is_playing: bool,
    /// Current position in seconds
    pub current_time: f64,
    /// Total duration in seconds, `None` until metadata arrives
    pub duration: Option<f64>,
    /// Stored volume (0.0 - 1.0), kept while muted
    pub volume: f32,
    pub is_muted: bool,
    pub is_fullscreen: bool,
    pub is_loading: bool,
    pub last_error: Option<PlayerError>,
}

impl PlaybackState {
    /// Duration usable for arithmetic: known and strictly positive
    pub fn known_duration(&self) -> Option<f64> {
        self.duration.filter(|d| d.is_finite() && *d > 0.0)
    }

    /// Position as a fraction of the duration, 0 when the duration is unknown
    pub fn progress_fraction(&self) -> f64 {
        match self.known_duration() {
            Some(duration) => (self.current_time / duration).clamp(0.0, 1.0),
            None => 0.0,
        }
    }

    /// Volume the slider shows: zero while muted
    pub fn effective_volume(&self) -> f32 {
        if self.is_muted {
            0.0
        } else {
            self.volume
        }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            current_time: 0.0,
            duration: None,
            volume: 1.0,
            is_muted: false,
            is_fullscreen: false,
            is_loading: true,
            last_error: None,
        }
    }
}

/// Thread-safe session state container
#[derive(Clone)]
pub struct PlayerStateContainer {
    state: Arc<RwLock<PlayerState>>,
    playback: Arc<RwLock<PlaybackState>>,
}

impl PlayerStateContainer {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(PlayerState::Idle)),
            playback: Arc::new(RwLock::new(PlaybackState::default())),
        }
    }

    pub fn get_state(&self) -> PlayerState {
        *self.state.read()
    }

    /// Move to `to` if the transition is legal. Returns the previous state.
    pub fn transition(&self, to: PlayerState) -> Result<PlayerState> {
        let mut state = self.state.write();
        let from = *state;
        validate_state_transition(from, to)?;
        *state = to;
        log::debug!("Player state changed: {:?} -> {:?}", from, to);
        Ok(from)
    }

    pub fn get_playback(&self) -> PlaybackState {
        self.playback.read().clone()
    }

    pub fn update_playback<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut PlaybackState) -> R,
    {
        let mut playback = self.playback.write();
        f(&mut playback)
    }
}

impl Default for PlayerStateContainer {
    fn default() -> Self {
        Self::new()
    }
}

/// Legal edges of the session state machine
pub fn validate_state_transition(from: PlayerState, to: PlayerState) -> Result<()> {
    match (from, to) {
        // Errored is reachable from anywhere except itself
        (PlayerState::Errored, _) => Err(PlayerError::InvalidState(format!(
            "Session already errored, cannot move to {:?}",
            to
        ))),
        (_, PlayerState::Errored) => Ok(()),

        // From Idle
        (PlayerState::Idle, PlayerState::Loading) => Ok(()),

        // From Loading
        (PlayerState::Loading, PlayerState::Ready) => Ok(()),
        (PlayerState::Loading, PlayerState::Playing) => Ok(()),
        (PlayerState::Loading, PlayerState::Paused) => Ok(()),

        // From Ready
        (PlayerState::Ready, PlayerState::Playing) => Ok(()),
        (PlayerState::Ready, PlayerState::Paused) => Ok(()),

        // From Playing
        (PlayerState::Playing, PlayerState::Paused) => Ok(()),
        (PlayerState::Playing, PlayerState::Ended) => Ok(()),

        // From Paused
        (PlayerState::Paused, PlayerState::Playing) => Ok(()),
        (PlayerState::Paused, PlayerState::Ended) => Ok(()),

        // Invalid transitions
        _ => Err(PlayerError::InvalidState(format!(
            "Invalid state transition from {:?} to {:?}",
            from, to
        ))),
    }
}
