// Injected key-value persistence for "seen" flags

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Minimal string store; the host decides where it lives
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Process-local store
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.lock().remove(key);
    }
}

/// Show-once-per-version gate for release notes.
/// The record is stored as `<version>|<shown>`.
pub struct ReleaseNotesGate {
    store: Arc<dyn KeyValueStore>,
    key: String,
    current_version: String,
}

impl ReleaseNotesGate {
    pub fn new(store: Arc<dyn KeyValueStore>, key: &str, current_version: &str) -> Self {
        Self {
            store,
            key: key.to_string(),
            current_version: current_version.to_string(),
        }
    }

    fn record(&self) -> Option<(String, bool)> {
        let raw = self.store.get(&self.key)?;
        let (version, shown) = raw.split_once('|')?;
        match shown {
            "true" => Some((version.to_string(), true)),
            "false" => Some((version.to_string(), false)),
            _ => {
                log::warn!("Malformed release notes record: {}", raw);
                None
            }
        }
    }

    pub fn should_show(&self) -> bool {
        match self.record() {
            None => true,
            Some((version, _)) if version != self.current_version => true,
            Some((_, shown)) => !shown,
        }
    }

    pub fn mark_shown(&self) {
        self.store.set(&self.key, &format!("{}|true", self.current_version));
    }

    pub fn reset_for_version(&self, version: &str) {
        self.store.set(&self.key, &format!("{}|false", version));
    }
}
