// One playback session: source ingestion, engine, control surface and shortcuts

use crate::completion::{CompletionPolicy, CompletionPrompt};
use crate::controls::ControlSurfaceTimer;
use crate::engine::PlaybackEngine;
use crate::shortcuts::{Key, ShortcutAction, ShortcutDispatcher};
use marquee_core::{
    CallbackEvent, HostSurface, LoadError, MediaElement, MediaEvent, PlaybackState, PlayerCallback,
    PlayerState, Result, SessionConfig,
};
use marquee_source_loader::{
    is_remote_locator, CancellationToken, ChunkedSourceLoader, LoadMessage, LoadTask,
    PlayableResource, ResourceSlot,
};
use std::sync::Arc;
use std::time::Instant;

/// Display metadata for the session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    pub title: String,
    pub poster: Option<String>,
}

/// Coordinates the whole pipeline for one source:
/// Load → Attach → Native events → State → Progress / Controls / Shortcuts
pub struct PlaybackSession {
    source: String,
    info: SessionInfo,
    initial_time: f64,
    loader: ChunkedSourceLoader,
    task: Option<LoadTask>,
    resource: ResourceSlot,
    engine: PlaybackEngine,
    controls: ControlSurfaceTimer,
    shortcuts: ShortcutDispatcher,
    completion: CompletionPolicy,
    callback: Arc<dyn PlayerCallback>,
    config: SessionConfig,
}

impl PlaybackSession {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: impl Into<String>,
        info: SessionInfo,
        loader: ChunkedSourceLoader,
        element: Box<dyn MediaElement>,
        host: Box<dyn HostSurface>,
        callback: Arc<dyn PlayerCallback>,
        config: SessionConfig,
        initial_time: f64,
    ) -> Self {
        let source = source.into();
        log::info!("[session] new session for {} ({})", source, info.title);
        Self {
            source,
            info,
            initial_time,
            loader: loader.with_chunk_size(config.chunk_size),
            task: None,
            resource: ResourceSlot::new(),
            engine: PlaybackEngine::new(element, host, callback.clone(), config, initial_time),
            controls: ControlSurfaceTimer::new(config.controls_hide_delay),
            shortcuts: ShortcutDispatcher::new(config.skip_seconds),
            completion: CompletionPolicy::new(config.completion_threshold),
            callback,
            config,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn initial_time(&self) -> f64 {
        self.initial_time
    }

    pub fn state(&self) -> PlayerState {
        self.engine.state()
    }

    pub fn playback(&self) -> PlaybackState {
        self.engine.playback()
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut PlaybackEngine {
        &mut self.engine
    }

    pub fn controls_visible(&self) -> bool {
        self.controls.is_visible()
    }

    /// Whether ingestion is still running
    pub fn is_loading_source(&self) -> bool {
        self.task.is_some()
    }

    pub fn resource(&self) -> Option<&PlayableResource> {
        self.resource.current()
    }

    /// Start resolving the source. Remote locators attach immediately;
    /// local paths are read on a worker thread and picked up by `poll_load`.
    pub fn begin(&mut self) {
        if self.task.is_some() || self.resource.current().is_some() {
            log::warn!("[session] begin called twice for {}", self.source);
            return;
        }

        if is_remote_locator(&self.source) {
            let result = self.loader.load(&self.source, &CancellationToken::new(), |_, _| {});
            self.finish_load(result);
            return;
        }

        self.task = Some(self.loader.spawn(self.source.clone()));
    }

    /// Drain pending loader messages without blocking.
    /// Returns true once the load has finished (successfully or not).
    pub fn poll_load(&mut self) -> bool {
        loop {
            let Some(task) = self.task.as_mut() else {
                return true;
            };
            match task.try_next() {
                Some(message) => self.handle_load_message(message),
                None => return self.task.is_none(),
            }
        }
    }

    /// Block until the load finishes
    pub fn wait_for_load(&mut self) {
        while let Some(task) = self.task.as_mut() {
            match task.wait_next() {
                Some(message) => self.handle_load_message(message),
                None => {
                    log::error!("[session] loader exited without a result");
                    self.task = None;
                }
            }
        }
    }

    fn handle_load_message(&mut self, message: LoadMessage) {
        match message {
            LoadMessage::Progress {
                bytes_read,
                total_size,
            } => self.callback.on_event(CallbackEvent::LoadProgress {
                bytes_read,
                total_size,
            }),
            LoadMessage::Finished(result) => {
                if let Some(task) = self.task.take() {
                    task.join();
                }
                self.finish_load(result);
            }
        }
    }

    fn finish_load(&mut self, result: std::result::Result<PlayableResource, LoadError>) {
        match result {
            Ok(resource) => {
                let source = self.resource.replace(resource).attach_source();
                if let Err(e) = self.engine.attach(&source) {
                    self.engine.fail(e);
                }
            }
            Err(e) if e.is_cancelled() => {
                log::debug!("[session] load cancelled for {}", self.source)
            }
            Err(e) => self.engine.fail(e.into()),
        }
    }

    pub fn handle_media_event(&mut self, event: MediaEvent, now: Instant) {
        self.engine.handle_event(event, now);
    }

    /// Returns true when the key was consumed and its default behaviour must be suppressed
    pub fn handle_key(&mut self, key: Key) -> Result<bool> {
        let is_fullscreen = self.engine.playback().is_fullscreen;
        match self.shortcuts.dispatch(key, is_fullscreen) {
            Some(action) => {
                self.apply(action)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn apply(&mut self, action: ShortcutAction) -> Result<()> {
        log::debug!("[session] shortcut {:?}", action);
        match action {
            ShortcutAction::TogglePlay => self.engine.toggle_play(),
            ShortcutAction::ToggleFullscreen => self.engine.toggle_fullscreen(),
            ShortcutAction::ToggleMute => {
                self.engine.toggle_mute();
                Ok(())
            }
            ShortcutAction::Skip(delta) => {
                self.engine.skip(delta);
                Ok(())
            }
            ShortcutAction::ExitFullscreen => self.engine.exit_fullscreen(),
            ShortcutAction::Close => {
                self.close();
                Ok(())
            }
        }
    }

    pub fn pointer_moved(&mut self, now: Instant) {
        self.controls.on_interaction(now);
    }

    /// A click on the bare playback surface toggles play
    pub fn surface_clicked(&mut self) -> Result<()> {
        self.engine.toggle_play()
    }

    /// Drive the control surface countdown. Returns true when visibility changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let is_playing = self.engine.playback().is_playing;
        self.controls.tick(now, is_playing)
    }

    /// What the completion dialog should ask, if anything
    pub fn completion_prompt(&self) -> Option<CompletionPrompt> {
        if self.engine.state() == PlayerState::Ended {
            return Some(self.completion.on_ended());
        }
        let playback = self.engine.playback();
        self.completion.on_close(playback.current_time, playback.duration)
    }

    /// The user asked to leave; the host follows up with `teardown`
    pub fn close(&mut self) {
        log::info!("[session] close requested for {}", self.source);
        self.callback.on_event(CallbackEvent::CloseRequested);
    }

    /// Tear everything down and start a fresh session for `source`
    pub fn replace_source(&mut self, source: impl Into<String>, initial_time: f64) {
        self.teardown();
        self.source = source.into();
        self.initial_time = initial_time;
        log::info!("[session] replacing source with {}", self.source);
        self.engine.reset(initial_time);
        self.controls = ControlSurfaceTimer::new(self.config.controls_hide_delay);
        self.begin();
    }

    /// Cancel any running load and revoke the live resource. Safe to call twice.
    pub fn teardown(&mut self) {
        if let Some(task) = self.task.take() {
            log::info!("[session] cancelling load for {}", self.source);
            task.abort();
        }
        self.engine.detach();
        self.resource.release();
    }
}
