// Revocable in-memory resources handed to the playback primitive

use marquee_core::{AttachSource, MediaBlob};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

const LOCATOR_PREFIX: &str = "blob:marquee/";

#[derive(Default)]
struct RegistryState {
    next_id: u64,
    live: HashMap<u64, MediaBlob>,
    revoked_total: u64,
}

/// Table of live blob locators, the Rust side of object-URL bookkeeping
#[derive(Clone, Default)]
pub struct ResourceRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a blob and hand back the only handle able to revoke it
    pub fn register(&self, blob: MediaBlob) -> ResourceHandle {
        let mut state = self.inner.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.live.insert(id, blob);
        drop(state);

        let locator = format!("{}{}", LOCATOR_PREFIX, id);
        log::debug!("Registered resource {}", locator);
        ResourceHandle {
            id,
            locator,
            registry: self.clone(),
            revoked: false,
        }
    }

    /// Look up the bytes behind a live locator
    pub fn resolve(&self, locator: &str) -> Option<MediaBlob> {
        let id = locator.strip_prefix(LOCATOR_PREFIX)?.parse::<u64>().ok()?;
        self.inner.lock().live.get(&id).cloned()
    }

    /// Number of handles registered and not yet revoked
    pub fn live_count(&self) -> usize {
        self.inner.lock().live.len()
    }

    /// Number of revocations performed over the registry's lifetime
    pub fn revoked_total(&self) -> u64 {
        self.inner.lock().revoked_total
    }

    fn remove(&self, id: u64) -> bool {
        let mut state = self.inner.lock();
        let removed = state.live.remove(&id).is_some();
        if removed {
            state.revoked_total += 1;
        }
        removed
    }
}

/// Exclusive ownership of one registered blob.
///
/// Not `Clone`; `revoke` takes the handle by value so it can run at most once.
/// Dropping an unrevoked handle is a leak and is reported, not repaired.
pub struct ResourceHandle {
    id: u64,
    locator: String,
    registry: ResourceRegistry,
    revoked: bool,
}

impl ResourceHandle {
    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn revoke(mut self) {
        if !self.registry.remove(self.id) {
            log::error!("Resource {} was not live at revoke time", self.locator);
        } else {
            log::debug!("Revoked resource {}", self.locator);
        }
        self.revoked = true;
    }
}

impl Drop for ResourceHandle {
    fn drop(&mut self) {
        if !self.revoked {
            log::error!("Resource {} dropped without revoke; blob leaked", self.locator);
        }
    }
}

impl std::fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("locator", &self.locator)
            .field("revoked", &self.revoked)
            .finish()
    }
}

/// Result of a successful load
#[derive(Debug)]
pub enum PlayableResource {
    /// Remote locator, nothing owned
    Remote(String),
    /// Locally assembled bytes and the handle that must be revoked
    Local { handle: ResourceHandle, blob: MediaBlob },
}

impl PlayableResource {
    pub fn locator(&self) -> &str {
        match self {
            PlayableResource::Remote(url) => url,
            PlayableResource::Local { handle, .. } => handle.locator(),
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, PlayableResource::Local { .. })
    }

    pub fn attach_source(&self) -> AttachSource {
        match self {
            PlayableResource::Remote(url) => AttachSource::Remote(url.clone()),
            PlayableResource::Local { handle, blob } => AttachSource::Blob {
                locator: handle.locator().to_string(),
                blob: blob.clone(),
            },
        }
    }

    /// Release ownership; a no-op for remote locators
    pub fn revoke(self) {
        if let PlayableResource::Local { handle, .. } = self {
            handle.revoke();
        }
    }
}

/// Holds the single live resource of a session
#[derive(Debug, Default)]
pub struct ResourceSlot {
    current: Option<PlayableResource>,
}

impl ResourceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `next`, revoking the predecessor first
    pub fn replace(&mut self, next: PlayableResource) -> &PlayableResource {
        if let Some(previous) = self.current.take() {
            log::debug!("Revoking previous resource {} before replacement", previous.locator());
            previous.revoke();
        }
        self.current.insert(next)
    }

    pub fn current(&self) -> Option<&PlayableResource> {
        self.current.as_ref()
    }

    /// Revoke the live resource, if any
    pub fn release(&mut self) {
        if let Some(resource) = self.current.take() {
            resource.revoke();
        }
    }
}
