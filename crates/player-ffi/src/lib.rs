// FFI bridge for Marquee
// C ABI entrypoints for the host shell: file-range commands and a session registry.

use marquee_core::{
    AttachSource, CallbackEvent, HostSurface, MediaElement, MediaEvent, PlayerCallback, PlayerError,
    PlayerState, Result, SessionConfig,
};
use marquee_session::{Key, PlaybackSession, SessionInfo};
use marquee_source_loader::{
    ChunkedSourceLoader, FileBridge, LocalFileBridge, PlayableResource, ResourceRegistry,
};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::ffi::CStr;
use std::os::raw::c_char;
use std::sync::{Arc, Once};
use std::time::Instant;

// -----------------------------------------------------------------------------
// Host-facing records
// -----------------------------------------------------------------------------

pub const COMMAND_ATTACH: i32 = 1;
pub const COMMAND_DETACH: i32 = 2;
pub const COMMAND_PLAY: i32 = 3;
pub const COMMAND_PAUSE: i32 = 4;
pub const COMMAND_SET_CURRENT_TIME: i32 = 5;
pub const COMMAND_SET_VOLUME: i32 = 6;
pub const COMMAND_SET_MUTED: i32 = 7;
pub const COMMAND_REQUEST_FULLSCREEN: i32 = 8;
pub const COMMAND_EXIT_FULLSCREEN: i32 = 9;

pub const EVENT_STATE_CHANGED: i32 = 1;
pub const EVENT_PROGRESS: i32 = 2;
pub const EVENT_LOAD_PROGRESS: i32 = 3;
pub const EVENT_BUFFERING: i32 = 4;
pub const EVENT_ENDED: i32 = 5;
pub const EVENT_ERROR: i32 = 6;
pub const EVENT_CLOSE_REQUESTED: i32 = 7;

/// An instruction for the host's native media element.
/// For `COMMAND_ATTACH`, `value` is the blob size or -1 for a remote locator;
/// the locator and bytes are fetched with `marquee_session_source_*`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MarqueeCommand {
    pub kind: i32,
    pub value: f64,
}

/// A session notification. Progress reports an unknown duration as 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MarqueeEvent {
    pub kind: i32,
    pub a: f64,
    pub b: f64,
}

fn state_code(state: PlayerState) -> i32 {
    match state {
        PlayerState::Idle => 0,
        PlayerState::Loading => 1,
        PlayerState::Ready => 2,
        PlayerState::Playing => 3,
        PlayerState::Paused => 4,
        PlayerState::Ended => 5,
        PlayerState::Errored => 6,
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

fn event_record(event: &CallbackEvent) -> MarqueeEvent {
    let (kind, a, b) = match event {
        CallbackEvent::StateChanged { old_state, new_state } => (
            EVENT_STATE_CHANGED,
            state_code(*old_state) as f64,
            state_code(*new_state) as f64,
        ),
        CallbackEvent::Progress {
            current_time,
            duration,
        } => (EVENT_PROGRESS, *current_time, *duration),
        CallbackEvent::LoadProgress {
            bytes_read,
            total_size,
        } => (EVENT_LOAD_PROGRESS, *bytes_read as f64, *total_size as f64),
        CallbackEvent::BufferingChanged { buffering } => (EVENT_BUFFERING, flag(*buffering), 0.0),
        CallbackEvent::Ended => (EVENT_ENDED, 0.0, 0.0),
        CallbackEvent::Error { .. } => (EVENT_ERROR, 0.0, 0.0),
        CallbackEvent::CloseRequested => (EVENT_CLOSE_REQUESTED, 0.0, 0.0),
    };
    MarqueeEvent { kind, a, b }
}

// -----------------------------------------------------------------------------
// Queued collaborators
// -----------------------------------------------------------------------------

type CommandQueue = Arc<Mutex<VecDeque<MarqueeCommand>>>;

/// Media element that records commands for the host to drain.
/// The position is mirrored from the host's time updates.
struct QueuedElement {
    commands: CommandQueue,
    position: Arc<Mutex<f64>>,
}

impl QueuedElement {
    fn push(&self, kind: i32, value: f64) {
        self.commands.lock().push_back(MarqueeCommand { kind, value });
    }
}

impl MediaElement for QueuedElement {
    fn attach(&mut self, source: &AttachSource) -> Result<()> {
        let size = match source {
            AttachSource::Remote(_) => -1.0,
            AttachSource::Blob { blob, .. } => blob.len() as f64,
        };
        self.push(COMMAND_ATTACH, size);
        Ok(())
    }

    fn detach(&mut self) {
        self.push(COMMAND_DETACH, 0.0);
    }

    fn play(&mut self) -> Result<()> {
        self.push(COMMAND_PLAY, 0.0);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.push(COMMAND_PAUSE, 0.0);
        Ok(())
    }

    fn set_current_time(&mut self, seconds: f64) {
        *self.position.lock() = seconds;
        self.push(COMMAND_SET_CURRENT_TIME, seconds);
    }

    fn current_time(&self) -> f64 {
        *self.position.lock()
    }

    fn set_volume(&mut self, volume: f32) {
        self.push(COMMAND_SET_VOLUME, volume as f64);
    }

    fn set_muted(&mut self, muted: bool) {
        self.push(COMMAND_SET_MUTED, flag(muted));
    }
}

struct QueuedHost {
    commands: CommandQueue,
}

impl HostSurface for QueuedHost {
    fn request_fullscreen(&mut self) -> Result<()> {
        self.commands.lock().push_back(MarqueeCommand {
            kind: COMMAND_REQUEST_FULLSCREEN,
            value: 0.0,
        });
        Ok(())
    }

    fn exit_fullscreen(&mut self) -> Result<()> {
        self.commands.lock().push_back(MarqueeCommand {
            kind: COMMAND_EXIT_FULLSCREEN,
            value: 0.0,
        });
        Ok(())
    }
}

#[derive(Default)]
struct QueuedCallback {
    events: Mutex<VecDeque<MarqueeEvent>>,
    last_error: Mutex<Option<String>>,
}

impl PlayerCallback for QueuedCallback {
    fn on_event(&self, event: CallbackEvent) {
        if let CallbackEvent::Error { message } = &event {
            *self.last_error.lock() = Some(message.clone());
        }
        self.events.lock().push_back(event_record(&event));
    }
}

// -----------------------------------------------------------------------------
// Session registry
// -----------------------------------------------------------------------------

struct SessionEntry {
    session: PlaybackSession,
    commands: CommandQueue,
    position: Arc<Mutex<f64>>,
    callback: Arc<QueuedCallback>,
}

static SESSION_REGISTRY: Lazy<Mutex<HashMap<i64, SessionEntry>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));
static NEXT_SESSION_ID: Lazy<Mutex<i64>> = Lazy::new(|| Mutex::new(1));
static RESOURCES: Lazy<ResourceRegistry> = Lazy::new(ResourceRegistry::new);
static BRIDGE: Lazy<Arc<LocalFileBridge>> = Lazy::new(|| Arc::new(LocalFileBridge::new()));
static INIT_LOGGER: Once = Once::new();

/// Info by default; `RUST_LOG` takes precedence when set
fn logger_builder() -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder
        .is_test(false)
        .filter_level(log::LevelFilter::Info)
        .parse_default_env();
    builder
}

fn init_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = logger_builder().try_init();
    });
}

fn create_session(source: &str, initial_time: f64) -> i64 {
    init_logging();
    let commands: CommandQueue = Arc::new(Mutex::new(VecDeque::new()));
    let position = Arc::new(Mutex::new(0.0));
    let callback = Arc::new(QueuedCallback::default());
    let loader = ChunkedSourceLoader::new(Arc::clone(&*BRIDGE) as Arc<dyn FileBridge>, (*RESOURCES).clone());

    let session = PlaybackSession::new(
        source,
        SessionInfo::default(),
        loader,
        Box::new(QueuedElement {
            commands: commands.clone(),
            position: position.clone(),
        }),
        Box::new(QueuedHost {
            commands: commands.clone(),
        }),
        callback.clone(),
        SessionConfig::default(),
        initial_time,
    );

    let mut next = NEXT_SESSION_ID.lock();
    let id = *next;
    *next += 1;
    drop(next);

    SESSION_REGISTRY.lock().insert(
        id,
        SessionEntry {
            session,
            commands,
            position,
            callback,
        },
    );
    id
}

fn with_session_mut<R>(id: i64, f: impl FnOnce(&mut SessionEntry) -> Result<R>) -> Result<R> {
    let mut registry = SESSION_REGISTRY.lock();
    let entry = registry
        .get_mut(&id)
        .ok_or_else(|| PlayerError::InvalidState("Invalid session ID".into()))?;
    f(entry)
}

fn with_session<R>(id: i64, f: impl FnOnce(&SessionEntry) -> Result<R>) -> Result<R> {
    let registry = SESSION_REGISTRY.lock();
    let entry = registry
        .get(&id)
        .ok_or_else(|| PlayerError::InvalidState("Invalid session ID".into()))?;
    f(entry)
}

fn to_code(result: Result<()>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(err) => {
            log::error!("FFI error: {}", err);
            -1
        }
    }
}

fn media_error_code(value: f64) -> Option<u16> {
    (value >= 0.0 && value <= u16::MAX as f64).then_some(value as u16)
}

fn media_event(kind: i32, value: f64) -> Option<MediaEvent> {
    let event = match kind {
        0 => MediaEvent::SourceAttached,
        1 => MediaEvent::LoadedMetadata { duration: value },
        2 => MediaEvent::CanPlay,
        3 => MediaEvent::Waiting,
        4 => MediaEvent::Stalled,
        5 => MediaEvent::Playing,
        6 => MediaEvent::Pause,
        7 => MediaEvent::TimeUpdate { current_time: value },
        8 => MediaEvent::Error {
            code: media_error_code(value),
            message: String::new(),
        },
        9 => MediaEvent::Ended,
        10 => MediaEvent::FullscreenChanged {
            fullscreen: value != 0.0,
        },
        _ => return None,
    };
    Some(event)
}

/// Copy `bytes` into a caller buffer. Returns the full length, or -1 if it does not fit.
///
/// # Safety
/// `out` must be valid for `cap` bytes of writes, or null to query the length.
unsafe fn copy_out(bytes: &[u8], out: *mut u8, cap: usize) -> i64 {
    if out.is_null() {
        return bytes.len() as i64;
    }
    if bytes.len() > cap {
        return -1;
    }
    std::ptr::copy_nonoverlapping(bytes.as_ptr(), out, bytes.len());
    bytes.len() as i64
}

unsafe fn c_string<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

// -------------------------------
// File-range commands
// -------------------------------

/// Size in bytes of the file at `path`, or -1.
///
/// # Safety
/// `path` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn marquee_file_size(path: *const c_char) -> i64 {
    let Some(path) = c_string(path) else {
        return -1;
    };
    match BRIDGE.query_size(path) {
        Ok(size) => size as i64,
        Err(err) => {
            log::error!("Failed to stat {}: {}", path, err);
            -1
        }
    }
}

/// Read up to `length` bytes at `offset` into `out`. Returns the byte count, or -1.
///
/// # Safety
/// `path` must be a valid NUL-terminated string and `out` valid for `cap` bytes.
#[no_mangle]
pub unsafe extern "C" fn marquee_read_chunk(
    path: *const c_char,
    offset: u64,
    length: u64,
    out: *mut u8,
    cap: usize,
) -> i64 {
    let Some(path) = c_string(path) else {
        return -1;
    };
    match BRIDGE.read_range(path, offset, length) {
        Ok(bytes) => copy_out(&bytes, out, cap),
        Err(err) => {
            log::error!("Failed to read {} at {}: {}", path, offset, err);
            -1
        }
    }
}

// -------------------------------
// Session lifecycle
// -------------------------------

/// # Safety
/// `source` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn marquee_session_create(source: *const c_char, initial_time: f64) -> i64 {
    match c_string(source) {
        Some(source) => create_session(source, initial_time),
        None => -1,
    }
}

#[no_mangle]
pub extern "C" fn marquee_session_begin(session_id: i64) -> i32 {
    to_code(with_session_mut(session_id, |e| {
        e.session.begin();
        Ok(())
    }))
}

/// Drain loader progress. Returns 1 once the load is finished, 0 while running, -1 on error.
#[no_mangle]
pub extern "C" fn marquee_session_poll(session_id: i64) -> i32 {
    match with_session_mut(session_id, |e| Ok(e.session.poll_load())) {
        Ok(true) => 1,
        Ok(false) => 0,
        Err(err) => {
            log::error!("Failed to poll load: {}", err);
            -1
        }
    }
}

#[no_mangle]
pub extern "C" fn marquee_session_media_event(session_id: i64, kind: i32, value: f64) -> i32 {
    let Some(event) = media_event(kind, value) else {
        log::warn!("Unknown media event kind {}", kind);
        return -1;
    };
    to_code(with_session_mut(session_id, |e| {
        if let MediaEvent::TimeUpdate { current_time } = event {
            *e.position.lock() = current_time;
        }
        e.session.handle_media_event(event, Instant::now());
        Ok(())
    }))
}

/// Report a native playback failure with the primitive's own message.
/// A negative `code` means the primitive gave none.
///
/// # Safety
/// `message` must be a valid NUL-terminated string or null.
#[no_mangle]
pub unsafe extern "C" fn marquee_session_media_error(
    session_id: i64,
    code: i32,
    message: *const c_char,
) -> i32 {
    let message = c_string(message).unwrap_or_default().to_string();
    let event = MediaEvent::Error {
        code: media_error_code(code as f64),
        message,
    };
    to_code(with_session_mut(session_id, |e| {
        e.session.handle_media_event(event, Instant::now());
        Ok(())
    }))
}

/// Returns 1 when the key was consumed and the host must suppress its default, 0 otherwise.
///
/// # Safety
/// `key` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn marquee_session_key(session_id: i64, key: *const c_char) -> i32 {
    let Some(name) = c_string(key) else {
        return -1;
    };
    match with_session_mut(session_id, |e| e.session.handle_key(Key::from_name(name))) {
        Ok(true) => 1,
        Ok(false) => 0,
        Err(err) => {
            log::error!("Failed to handle key: {}", err);
            -1
        }
    }
}

#[no_mangle]
pub extern "C" fn marquee_session_pointer_moved(session_id: i64) -> i32 {
    to_code(with_session_mut(session_id, |e| {
        e.session.pointer_moved(Instant::now());
        Ok(())
    }))
}

/// Returns 1 if the controls are visible after the tick, 0 if hidden.
#[no_mangle]
pub extern "C" fn marquee_session_tick(session_id: i64) -> i32 {
    match with_session_mut(session_id, |e| {
        e.session.tick(Instant::now());
        Ok(e.session.controls_visible())
    }) {
        Ok(visible) => visible as i32,
        Err(err) => {
            log::error!("Failed to tick: {}", err);
            -1
        }
    }
}

#[no_mangle]
pub extern "C" fn marquee_session_toggle_play(session_id: i64) -> i32 {
    to_code(with_session_mut(session_id, |e| e.session.surface_clicked()))
}

#[no_mangle]
pub extern "C" fn marquee_session_seek(session_id: i64, fraction: f64) -> i32 {
    to_code(with_session_mut(session_id, |e| {
        e.session.engine_mut().seek(fraction);
        Ok(())
    }))
}

#[no_mangle]
pub extern "C" fn marquee_session_set_volume(session_id: i64, level: f32) -> i32 {
    to_code(with_session_mut(session_id, |e| {
        e.session.engine_mut().set_volume(level);
        Ok(())
    }))
}

#[no_mangle]
pub extern "C" fn marquee_session_toggle_mute(session_id: i64) -> i32 {
    to_code(with_session_mut(session_id, |e| {
        e.session.engine_mut().toggle_mute();
        Ok(())
    }))
}

#[no_mangle]
pub extern "C" fn marquee_session_get_state(session_id: i64) -> i32 {
    match with_session(session_id, |e| Ok(e.session.state())) {
        Ok(state) => state_code(state),
        Err(err) => {
            log::error!("Failed to get state: {}", err);
            -1
        }
    }
}

#[no_mangle]
pub extern "C" fn marquee_session_get_position(session_id: i64) -> f64 {
    match with_session(session_id, |e| Ok(e.session.playback().current_time)) {
        Ok(pos) => pos,
        Err(err) => {
            log::error!("Failed to get position: {}", err);
            -1.0
        }
    }
}

/// Duration in seconds, or -1 while unknown
#[no_mangle]
pub extern "C" fn marquee_session_get_duration(session_id: i64) -> f64 {
    match with_session(session_id, |e| Ok(e.session.playback().known_duration())) {
        Ok(duration) => duration.unwrap_or(-1.0),
        Err(err) => {
            log::error!("Failed to get duration: {}", err);
            -1.0
        }
    }
}

/// Pop the next element command. Returns 1 if one was written, 0 if the queue is empty.
///
/// # Safety
/// `out` must point to a writable `MarqueeCommand`.
#[no_mangle]
pub unsafe extern "C" fn marquee_session_next_command(
    session_id: i64,
    out: *mut MarqueeCommand,
) -> i32 {
    if out.is_null() {
        return -1;
    }
    match with_session(session_id, |e| Ok(e.commands.lock().pop_front())) {
        Ok(Some(command)) => {
            *out = command;
            1
        }
        Ok(None) => 0,
        Err(_) => -1,
    }
}

/// Pop the next session event. Returns 1 if one was written, 0 if the queue is empty.
///
/// # Safety
/// `out` must point to a writable `MarqueeEvent`.
#[no_mangle]
pub unsafe extern "C" fn marquee_session_next_event(
    session_id: i64,
    out: *mut MarqueeEvent,
) -> i32 {
    if out.is_null() {
        return -1;
    }
    match with_session(session_id, |e| Ok(e.callback.events.lock().pop_front())) {
        Ok(Some(event)) => {
            *out = event;
            1
        }
        Ok(None) => 0,
        Err(_) => -1,
    }
}

/// Copy the locator of the attached resource into `out`.
///
/// # Safety
/// `out` must be valid for `cap` bytes, or null to query the length.
#[no_mangle]
pub unsafe extern "C" fn marquee_session_source_locator(
    session_id: i64,
    out: *mut u8,
    cap: usize,
) -> i64 {
    let locator = with_session(session_id, |e| {
        e.session
            .resource()
            .map(|r| r.locator().to_string())
            .ok_or_else(|| PlayerError::InvalidState("No resource attached".into()))
    });
    match locator {
        Ok(locator) => copy_out(locator.as_bytes(), out, cap),
        Err(err) => {
            log::error!("Failed to get locator: {}", err);
            -1
        }
    }
}

/// Copy the bytes of the attached local resource into `out`.
///
/// # Safety
/// `out` must be valid for `cap` bytes, or null to query the length.
#[no_mangle]
pub unsafe extern "C" fn marquee_session_source_bytes(
    session_id: i64,
    out: *mut u8,
    cap: usize,
) -> i64 {
    let blob = with_session(session_id, |e| match e.session.resource() {
        Some(PlayableResource::Local { blob, .. }) => Ok(blob.clone()),
        _ => Err(PlayerError::InvalidState("No local resource attached".into())),
    });
    match blob {
        Ok(blob) => copy_out(blob.data(), out, cap),
        Err(err) => {
            log::error!("Failed to get source bytes: {}", err);
            -1
        }
    }
}

/// Copy the last user-facing error message into `out`.
///
/// # Safety
/// `out` must be valid for `cap` bytes, or null to query the length.
#[no_mangle]
pub unsafe extern "C" fn marquee_session_last_error(
    session_id: i64,
    out: *mut u8,
    cap: usize,
) -> i64 {
    match with_session(session_id, |e| Ok(e.callback.last_error.lock().clone())) {
        Ok(Some(message)) => copy_out(message.as_bytes(), out, cap),
        Ok(None) => 0,
        Err(_) => -1,
    }
}

/// Cancel any load, revoke the resource and forget the session
#[no_mangle]
pub extern "C" fn marquee_session_release(session_id: i64) -> i32 {
    let entry = SESSION_REGISTRY.lock().remove(&session_id);
    match entry {
        Some(mut entry) => {
            entry.session.teardown();
            0
        }
        None => -1,
    }
}
