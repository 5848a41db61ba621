// Recording doubles shared by the unit tests

use marquee_core::{AttachSource, CallbackEvent, HostSurface, MediaElement, PlayerCallback, Result};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum ElementCall {
    Attach(String),
    Detach,
    Play,
    Pause,
    SetCurrentTime(f64),
    SetVolume(f32),
    SetMuted(bool),
}

#[derive(Default)]
struct ElementInner {
    calls: Vec<ElementCall>,
    current_time: f64,
    attached: Option<AttachSource>,
}

/// Native primitive double; clones share the same call log
#[derive(Clone, Default)]
pub struct RecordingElement {
    inner: Arc<Mutex<ElementInner>>,
}

impl RecordingElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ElementCall> {
        self.inner.lock().calls.clone()
    }

    pub fn clear(&self) {
        self.inner.lock().calls.clear();
    }

    pub fn attached(&self) -> Option<AttachSource> {
        self.inner.lock().attached.clone()
    }

    pub fn set_position(&self, seconds: f64) {
        self.inner.lock().current_time = seconds;
    }
}

impl MediaElement for RecordingElement {
    fn attach(&mut self, source: &AttachSource) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(ElementCall::Attach(source.locator().to_string()));
        inner.attached = Some(source.clone());
        Ok(())
    }

    fn detach(&mut self) {
        let mut inner = self.inner.lock();
        inner.calls.push(ElementCall::Detach);
        inner.attached = None;
    }

    fn play(&mut self) -> Result<()> {
        self.inner.lock().calls.push(ElementCall::Play);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.inner.lock().calls.push(ElementCall::Pause);
        Ok(())
    }

    fn set_current_time(&mut self, seconds: f64) {
        let mut inner = self.inner.lock();
        inner.calls.push(ElementCall::SetCurrentTime(seconds));
        inner.current_time = seconds;
    }

    fn current_time(&self) -> f64 {
        self.inner.lock().current_time
    }

    fn set_volume(&mut self, volume: f32) {
        self.inner.lock().calls.push(ElementCall::SetVolume(volume));
    }

    fn set_muted(&mut self, muted: bool) {
        self.inner.lock().calls.push(ElementCall::SetMuted(muted));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCall {
    RequestFullscreen,
    ExitFullscreen,
}

#[derive(Clone, Default)]
pub struct RecordingHost {
    calls: Arc<Mutex<Vec<HostCall>>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }
}

impl HostSurface for RecordingHost {
    fn request_fullscreen(&mut self) -> Result<()> {
        self.calls.lock().push(HostCall::RequestFullscreen);
        Ok(())
    }

    fn exit_fullscreen(&mut self) -> Result<()> {
        self.calls.lock().push(HostCall::ExitFullscreen);
        Ok(())
    }
}

/// Collects every callback event
#[derive(Default)]
pub struct TestCallback {
    events: Mutex<Vec<CallbackEvent>>,
}

impl TestCallback {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn get_events(&self) -> Vec<CallbackEvent> {
        self.events.lock().clone()
    }

    pub fn count<F: Fn(&CallbackEvent) -> bool>(&self, predicate: F) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl PlayerCallback for TestCallback {
    fn on_event(&self, event: CallbackEvent) {
        self.events.lock().push(event);
    }
}
