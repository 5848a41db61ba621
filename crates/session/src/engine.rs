// Playback engine: normalizes native media events into the session state machine

use marquee_core::player::{MEDIA_ERR_DECODE, MEDIA_ERR_SRC_NOT_SUPPORTED};
use marquee_core::{
    AttachSource, CallbackEvent, HostSurface, MediaElement, MediaEvent, PlaybackState,
    PlayerCallback, PlayerError, PlayerState, PlayerStateContainer, ProgressReporter, Result,
    SessionConfig,
};
use std::sync::Arc;
use std::time::Instant;

/// Drives the native primitive and owns the canonical state of one session.
///
/// Native events go through `handle_event`; commands are issued to the
/// primitive and their effects are only recorded once the matching event
/// comes back. Seek, skip and volume are the exceptions: the primitive
/// applies them synchronously, so state is updated immediately.
pub struct PlaybackEngine {
    element: Box<dyn MediaElement>,
    host: Box<dyn HostSurface>,
    callback: Arc<dyn PlayerCallback>,
    state: PlayerStateContainer,
    reporter: ProgressReporter,
    config: SessionConfig,
    /// One-shot resume offset, consumed by the first metadata event
    pending_resume: Option<f64>,
    /// Restored when unmuting from a zero volume
    last_audible_volume: f32,
}

impl PlaybackEngine {
    pub fn new(
        element: Box<dyn MediaElement>,
        host: Box<dyn HostSurface>,
        callback: Arc<dyn PlayerCallback>,
        config: SessionConfig,
        initial_time: f64,
    ) -> Self {
        Self {
            element,
            host,
            callback,
            state: PlayerStateContainer::new(),
            reporter: ProgressReporter::new(config.progress_interval),
            config,
            pending_resume: resume_offset(initial_time),
            last_audible_volume: 1.0,
        }
    }

    /// Start over with fresh state for a new source
    pub fn reset(&mut self, initial_time: f64) {
        log::info!("[engine] resetting for a new source");
        self.element.detach();
        self.state = PlayerStateContainer::new();
        self.reporter = ProgressReporter::new(self.config.progress_interval);
        self.pending_resume = resume_offset(initial_time);
        self.last_audible_volume = 1.0;

        let playback = self.state.get_playback();
        self.element.set_volume(playback.volume);
        self.element.set_muted(playback.is_muted);
    }

    pub fn state(&self) -> PlayerState {
        self.state.get_state()
    }

    pub fn playback(&self) -> PlaybackState {
        self.state.get_playback()
    }

    /// Shared view of the state, for readers on other threads
    pub fn container(&self) -> &PlayerStateContainer {
        &self.state
    }

    /// Hand a resolved resource to the primitive
    pub fn attach(&mut self, source: &AttachSource) -> Result<()> {
        if self.state().is_terminal() {
            log::warn!("[engine] attach ignored in {:?}", self.state());
            return Ok(());
        }
        log::info!("[engine] attaching {}", source.locator());
        self.element.attach(source)?;
        self.on_source_attached();
        Ok(())
    }

    /// Release the primitive's reference to the current source
    pub fn detach(&mut self) {
        self.element.detach();
    }

    /// Move to `Errored` and notify once
    pub fn fail(&mut self, error: PlayerError) {
        if self.state() == PlayerState::Errored {
            log::debug!("[engine] already errored, dropping: {}", error);
            return;
        }
        log::error!("[engine] playback failed: {}", error);
        let message = error.user_message();
        self.state.update_playback(|p| {
            p.is_loading = false;
            p.is_playing = false;
            p.last_error = Some(error);
        });
        self.transition_to(PlayerState::Errored);
        self.callback.on_event(CallbackEvent::Error { message });
    }

    pub fn handle_event(&mut self, event: MediaEvent, now: Instant) {
        if let MediaEvent::FullscreenChanged { fullscreen } = event {
            self.state.update_playback(|p| p.is_fullscreen = fullscreen);
            return;
        }

        if self.state() == PlayerState::Errored {
            log::debug!("[engine] ignoring {:?} after error", event);
            return;
        }

        match event {
            MediaEvent::SourceAttached => self.on_source_attached(),
            MediaEvent::LoadedMetadata { duration } => self.on_loaded_metadata(duration),
            MediaEvent::CanPlay => self.on_can_play(),
            MediaEvent::Waiting | MediaEvent::Stalled => self.set_buffering(true),
            MediaEvent::Playing => self.on_playing(),
            MediaEvent::Pause => self.on_pause(),
            MediaEvent::TimeUpdate { current_time } => self.on_time_update(current_time, now),
            MediaEvent::Error { code, message } => self.on_native_error(code, message),
            MediaEvent::Ended => self.on_ended(),
            MediaEvent::FullscreenChanged { .. } => {}
        }
    }

    fn on_source_attached(&mut self) {
        if self.state() == PlayerState::Idle {
            self.transition_to(PlayerState::Loading);
        }
        self.set_buffering(true);
    }

    fn on_loaded_metadata(&mut self, duration: f64) {
        let duration = if duration.is_finite() && duration >= 0.0 {
            Some(duration)
        } else {
            None
        };
        log::info!("[engine] metadata loaded, duration={:?}", duration);
        self.state.update_playback(|p| p.duration = duration);

        if let Some(offset) = self.pending_resume.take() {
            let target = match duration {
                Some(d) if d > 0.0 => offset.min(d),
                _ => offset,
            };
            log::info!("[engine] resuming at {:.1}s", target);
            self.element.set_current_time(target);
            self.state.update_playback(|p| p.current_time = target);
        }
    }

    fn on_can_play(&mut self) {
        self.set_buffering(false);
        if self.state() == PlayerState::Loading {
            self.transition_to(PlayerState::Ready);
            if let Err(e) = self.element.play() {
                log::warn!("[engine] autoplay rejected: {}", e);
            }
        }
    }

    fn on_playing(&mut self) {
        let state = self.state();
        if !matches!(
            state,
            PlayerState::Loading | PlayerState::Ready | PlayerState::Paused | PlayerState::Playing
        ) {
            log::debug!("[engine] ignoring playing in {:?}", state);
            return;
        }
        self.set_buffering(false);
        self.state.update_playback(|p| p.is_playing = true);
        self.transition_to(PlayerState::Playing);
    }

    fn on_pause(&mut self) {
        self.state.update_playback(|p| p.is_playing = false);
        if matches!(
            self.state(),
            PlayerState::Loading | PlayerState::Ready | PlayerState::Playing
        ) {
            self.transition_to(PlayerState::Paused);
        }
    }

    fn on_time_update(&mut self, current_time: f64, now: Instant) {
        if !current_time.is_finite() {
            return;
        }
        let (current_time, duration) = self.state.update_playback(|p| {
            p.current_time = current_time.max(0.0);
            (p.current_time, p.duration.unwrap_or(0.0))
        });
        if let Some(sample) = self.reporter.sample(now, current_time, duration) {
            self.callback.on_event(sample.into());
        }
    }

    fn on_native_error(&mut self, code: Option<u16>, message: String) {
        let message = if message.is_empty() {
            "Unknown error".to_string()
        } else {
            message
        };
        let error = match code {
            Some(MEDIA_ERR_DECODE) | Some(MEDIA_ERR_SRC_NOT_SUPPORTED) => {
                PlayerError::MediaDecodeError(message)
            }
            _ => PlayerError::NativePlaybackError { code, message },
        };
        self.fail(error);
    }

    fn on_ended(&mut self) {
        match self.state() {
            PlayerState::Playing | PlayerState::Paused => {
                self.state.update_playback(|p| {
                    p.is_playing = false;
                    p.is_loading = false;
                });
                self.transition_to(PlayerState::Ended);
                self.callback.on_event(CallbackEvent::Ended);
            }
            other => log::debug!("[engine] ignoring end of stream in {:?}", other),
        }
    }

    fn set_buffering(&mut self, buffering: bool) {
        let changed = self.state.update_playback(|p| {
            let changed = p.is_loading != buffering;
            p.is_loading = buffering;
            changed
        });
        if changed {
            self.callback.on_event(CallbackEvent::BufferingChanged { buffering });
        }
    }

    fn transition_to(&mut self, to: PlayerState) {
        if self.state() == to {
            return;
        }
        match self.state.transition(to) {
            Ok(from) => self.callback.on_event(CallbackEvent::StateChanged {
                old_state: from,
                new_state: to,
            }),
            Err(e) => log::warn!("[engine] {}", e),
        }
    }

    fn accepts_commands(&self) -> bool {
        let state = self.state();
        if state.is_terminal() {
            log::debug!("[engine] command ignored in {:?}", state);
            false
        } else {
            true
        }
    }

    /// Play when paused, pause when playing
    pub fn toggle_play(&mut self) -> Result<()> {
        if !self.accepts_commands() {
            return Ok(());
        }
        if self.state.get_playback().is_playing {
            self.element.pause()
        } else {
            self.element.play()
        }
    }

    /// Jump to `fraction` of the duration; no-op while the duration is unknown
    pub fn seek(&mut self, fraction: f64) {
        if !self.accepts_commands() || !fraction.is_finite() {
            return;
        }
        let Some(duration) = self.state.get_playback().known_duration() else {
            log::debug!("[engine] seek ignored, duration unknown");
            return;
        };
        let target = (fraction * duration).clamp(0.0, duration);
        self.element.set_current_time(target);
        self.state.update_playback(|p| p.current_time = target);
    }

    /// Move by `delta` seconds, staying within the media
    pub fn skip(&mut self, delta: f64) {
        if !self.accepts_commands() || !delta.is_finite() {
            return;
        }
        let Some(duration) = self.state.get_playback().known_duration() else {
            log::debug!("[engine] skip ignored, duration unknown");
            return;
        };
        let target = (self.element.current_time() + delta).clamp(0.0, duration);
        self.element.set_current_time(target);
        self.state.update_playback(|p| p.current_time = target);
    }

    /// Set the volume; zero mutes, anything above unmutes
    pub fn set_volume(&mut self, level: f32) {
        if !self.accepts_commands() || level.is_nan() {
            return;
        }
        let level = level.clamp(0.0, 1.0);
        let muted = level == 0.0;
        if !muted {
            self.last_audible_volume = level;
        }
        self.element.set_volume(level);
        self.element.set_muted(muted);
        self.state.update_playback(|p| {
            p.volume = level;
            p.is_muted = muted;
        });
    }

    /// Flip mute without losing the stored volume
    pub fn toggle_mute(&mut self) {
        if !self.accepts_commands() {
            return;
        }
        let playback = self.state.get_playback();
        let muted = !playback.is_muted;
        if !muted && playback.volume == 0.0 {
            let restored = self.last_audible_volume;
            self.element.set_volume(restored);
            self.state.update_playback(|p| p.volume = restored);
        }
        self.element.set_muted(muted);
        self.state.update_playback(|p| p.is_muted = muted);
    }

    /// Ask the host to enter or leave fullscreen. State follows the host's notification.
    pub fn toggle_fullscreen(&mut self) -> Result<()> {
        if self.state.get_playback().is_fullscreen {
            self.host.exit_fullscreen()
        } else {
            self.host.request_fullscreen()
        }
    }

    pub fn exit_fullscreen(&mut self) -> Result<()> {
        if self.state.get_playback().is_fullscreen {
            self.host.exit_fullscreen()
        } else {
            Ok(())
        }
    }
}

fn resume_offset(initial_time: f64) -> Option<f64> {
    if initial_time.is_finite() && initial_time > 0.0 {
        Some(initial_time)
    } else {
        None
    }
}
