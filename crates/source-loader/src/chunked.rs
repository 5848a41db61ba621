// Chunked ingestion of local media over the file bridge

use crate::bridge::FileBridge;
use crate::content_type::content_type_for_path;
use crate::resource::{PlayableResource, ResourceRegistry};
use marquee_core::config::DEFAULT_CHUNK_SIZE;
use marquee_core::{LoadError, MediaBlob};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

/// Shared cancellation flag for one load
#[derive(Clone, Default, Debug)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    /// Serializes `cancel` against `unless_cancelled`
    gate: Arc<Mutex<()>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks while an `unless_cancelled` section is running
    pub fn cancel(&self) {
        let _gate = self.gate.lock();
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), LoadError> {
        if self.is_cancelled() {
            Err(LoadError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Run `f` only if not cancelled. A concurrent `cancel` lands either
    /// before the check or after `f` returns, never in between.
    pub fn unless_cancelled<R>(&self, f: impl FnOnce() -> R) -> Result<R, LoadError> {
        let _gate = self.gate.lock();
        self.check()?;
        Ok(f())
    }
}

/// Remote locators are handed to the primitive as-is
pub fn is_remote_locator(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://") || source.starts_with("blob:")
}

/// Progress cursor for one load; chunks are kept in request order
#[derive(Debug)]
pub struct ChunkReadState {
    total_size: u64,
    bytes_read: u64,
    chunks: Vec<Vec<u8>>,
}

impl ChunkReadState {
    pub fn new(total_size: u64) -> Self {
        Self {
            total_size,
            bytes_read: 0,
            chunks: Vec::new(),
        }
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn is_complete(&self) -> bool {
        self.bytes_read >= self.total_size
    }

    /// Next `(offset, length)` window, or `None` once everything is read
    pub fn next_window(&self, chunk_size: u64) -> Option<(u64, u64)> {
        if self.is_complete() {
            return None;
        }
        let remaining = self.total_size - self.bytes_read;
        Some((self.bytes_read, chunk_size.min(remaining)))
    }

    /// Append the answer to the window starting at `offset`
    pub fn push(&mut self, offset: u64, requested: u64, chunk: Vec<u8>) -> Result<(), LoadError> {
        let len = chunk.len() as u64;
        if len == 0 {
            return Err(LoadError::ChunkReadFailed {
                offset,
                reason: "unexpected end of file".to_string(),
            });
        }
        if len > requested {
            return Err(LoadError::ChunkReadFailed {
                offset,
                reason: format!("bridge returned {} bytes for a {} byte request", len, requested),
            });
        }
        self.bytes_read += len;
        self.chunks.push(chunk);
        Ok(())
    }

    /// Concatenate all chunks in request order
    pub fn into_bytes(self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.bytes_read as usize);
        for chunk in self.chunks {
            data.extend_from_slice(&chunk);
        }
        data
    }
}

/// Messages sent from a background load to its owner
#[derive(Debug)]
pub enum LoadMessage {
    Progress { bytes_read: u64, total_size: u64 },
    Finished(Result<PlayableResource, LoadError>),
}

/// Resolves source references into playable resources
#[derive(Clone)]
pub struct ChunkedSourceLoader {
    bridge: Arc<dyn FileBridge>,
    registry: ResourceRegistry,
    chunk_size: u64,
}

impl ChunkedSourceLoader {
    pub fn new(bridge: Arc<dyn FileBridge>, registry: ResourceRegistry) -> Self {
        Self {
            bridge,
            registry,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Load `source` on the calling thread.
    ///
    /// `on_progress` runs after every chunk with `(bytes_read, total_size)`.
    /// The token is checked before each request and once more before the
    /// resource is registered, so a cancelled load never allocates a handle.
    pub fn load<F>(
        &self,
        source: &str,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<PlayableResource, LoadError>
    where
        F: FnMut(u64, u64),
    {
        if is_remote_locator(source) {
            log::info!("Using remote source directly: {}", source);
            return Ok(PlayableResource::Remote(source.to_string()));
        }

        log::info!("Loading local media from: {}", source);
        cancel.check()?;

        let total_size = self.bridge.query_size(source).map_err(|e| {
            log::error!("Size query failed for {}: {}", source, e);
            LoadError::SizeQueryFailed(e.to_string())
        })?;
        log::info!(
            "File size: {} bytes ({:.2} MB)",
            total_size,
            total_size as f64 / 1024.0 / 1024.0
        );

        let mut state = ChunkReadState::new(total_size);
        let mut last_percent = None;

        while let Some((offset, length)) = state.next_window(self.chunk_size) {
            cancel.check()?;

            log::debug!("Requesting range: offset={} len={}", offset, length);
            let chunk = self.bridge.read_range(source, offset, length).map_err(|e| {
                log::error!("Chunk read failed for {} at offset {}: {}", source, offset, e);
                LoadError::ChunkReadFailed {
                    offset,
                    reason: e.to_string(),
                }
            })?;

            // The answer to an abandoned request is dropped unread
            cancel.check()?;
            state.push(offset, length, chunk).map_err(|e| {
                log::error!("Rejected chunk for {}: {}", source, e);
                e
            })?;

            let percent = state.bytes_read() * 100 / total_size.max(1);
            if last_percent != Some(percent) {
                log::info!("Loaded {}%", percent);
                last_percent = Some(percent);
            }
            on_progress(state.bytes_read(), total_size);
        }

        let content_type = content_type_for_path(source);
        let blob = MediaBlob::new(state.into_bytes(), content_type);
        let handle = cancel.unless_cancelled(|| self.registry.register(blob.clone()))?;
        log::info!(
            "Created resource {} ({}, {} bytes)",
            handle.locator(),
            content_type,
            blob.len()
        );

        Ok(PlayableResource::Local { handle, blob })
    }

    /// Run `load` on a worker thread
    pub fn spawn(&self, source: String) -> LoadTask {
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel();
        let loader = self.clone();
        let token = cancel.clone();

        let worker = thread::spawn(move || {
            let progress_tx = tx.clone();
            let result = loader.load(&source, &token, |bytes_read, total_size| {
                let _ = progress_tx.send(LoadMessage::Progress {
                    bytes_read,
                    total_size,
                });
            });

            let result = match result {
                Ok(resource) if token.is_cancelled() => {
                    resource.revoke();
                    Err(LoadError::Cancelled)
                }
                other => other,
            };

            if let Err(mpsc::SendError(message)) = tx.send(LoadMessage::Finished(result)) {
                // Owner is gone; nobody else can revoke this
                if let LoadMessage::Finished(Ok(resource)) = message {
                    log::debug!("Load owner dropped, revoking {}", resource.locator());
                    resource.revoke();
                }
            }
        });

        LoadTask {
            cancel,
            rx,
            worker: Some(worker),
        }
    }
}

/// Handle to a load running on a worker thread
pub struct LoadTask {
    cancel: CancellationToken,
    rx: Receiver<LoadMessage>,
    worker: Option<thread::JoinHandle<()>>,
}

impl LoadTask {
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Next pending message without blocking.
    /// Once cancelled, a finished resource that arrives late is revoked here.
    pub fn try_next(&mut self) -> Option<LoadMessage> {
        match self.rx.try_recv() {
            Ok(LoadMessage::Finished(Ok(resource))) if self.cancel.is_cancelled() => {
                log::debug!("Discarding late resource {}", resource.locator());
                resource.revoke();
                Some(LoadMessage::Finished(Err(LoadError::Cancelled)))
            }
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block until the next message arrives
    pub fn wait_next(&mut self) -> Option<LoadMessage> {
        match self.rx.recv() {
            Ok(LoadMessage::Finished(Ok(resource))) if self.cancel.is_cancelled() => {
                resource.revoke();
                Some(LoadMessage::Finished(Err(LoadError::Cancelled)))
            }
            Ok(message) => Some(message),
            Err(_) => None,
        }
    }

    /// Cancel and drain. Anything the worker finishes afterwards is revoked
    /// by the worker itself since the receiving side is gone.
    pub fn abort(mut self) {
        self.cancel.cancel();
        while let Some(message) = self.try_next() {
            if let LoadMessage::Finished(Ok(resource)) = message {
                resource.revoke();
            }
        }
        // Worker keeps running until its current request returns
        self.worker.take();
    }

    /// Wait for the worker thread to exit, revoking any result nobody read
    pub fn join(mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        while let Ok(message) = self.rx.try_recv() {
            if let LoadMessage::Finished(Ok(resource)) = message {
                log::warn!("Unclaimed resource {} revoked on join", resource.locator());
                resource.revoke();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io;

    const MIB: u64 = 1024 * 1024;

    /// In-memory bridge that records every request
    struct RecordingBridge {
        data: Vec<u8>,
        requests: Mutex<Vec<(u64, u64)>>,
        fail_at: Option<u64>,
        cancel_after: Option<(usize, CancellationToken)>,
    }

    impl RecordingBridge {
        fn new(data: Vec<u8>) -> Self {
            Self {
                data,
                requests: Mutex::new(Vec::new()),
                fail_at: None,
                cancel_after: None,
            }
        }

        fn requests(&self) -> Vec<(u64, u64)> {
            self.requests.lock().clone()
        }
    }

    impl FileBridge for RecordingBridge {
        fn query_size(&self, path: &str) -> io::Result<u64> {
            if path.contains("missing") {
                return Err(io::Error::new(io::ErrorKind::NotFound, "No such file"));
            }
            Ok(self.data.len() as u64)
        }

        fn read_range(&self, _path: &str, offset: u64, length: u64) -> io::Result<Vec<u8>> {
            let mut requests = self.requests.lock();
            requests.push((offset, length));
            if let Some((count, token)) = &self.cancel_after {
                if requests.len() == *count {
                    token.cancel();
                }
            }
            drop(requests);

            if self.fail_at == Some(offset) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"));
            }
            let start = offset as usize;
            let end = (offset + length).min(self.data.len() as u64) as usize;
            Ok(self.data[start..end].to_vec())
        }
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn loader_for(bridge: Arc<RecordingBridge>, chunk_size: u64) -> ChunkedSourceLoader {
        ChunkedSourceLoader::new(bridge, ResourceRegistry::new()).with_chunk_size(chunk_size)
    }

    #[test]
    fn test_remote_sources_short_circuit() {
        let bridge = Arc::new(RecordingBridge::new(Vec::new()));
        let loader = loader_for(bridge.clone(), 16);
        for url in ["http://host/a.mp4", "https://host/b.mkv", "blob:app/123"] {
            let resource = loader.load(url, &CancellationToken::new(), |_, _| {}).unwrap();
            assert!(!resource.is_owned());
            assert_eq!(resource.locator(), url);
        }
        assert!(bridge.requests().is_empty());
        assert_eq!(loader.registry().live_count(), 0);
    }

    #[test]
    fn test_25_mib_file_reads_three_windows_in_order() {
        let bridge = Arc::new(RecordingBridge::new(pattern((25 * MIB) as usize)));
        let loader = loader_for(bridge.clone(), 10 * MIB);

        let resource = loader
            .load("/media/movie.mkv", &CancellationToken::new(), |_, _| {})
            .unwrap();

        assert_eq!(
            bridge.requests(),
            vec![(0, 10 * MIB), (10 * MIB, 10 * MIB), (20 * MIB, 5 * MIB)]
        );
        match &resource {
            PlayableResource::Local { blob, .. } => {
                assert_eq!(blob.content_type(), "video/x-matroska");
                assert_eq!(blob.data(), &bridge.data[..]);
            }
            PlayableResource::Remote(_) => panic!("expected a local resource"),
        }
        resource.revoke();
    }

    #[test]
    fn test_concatenation_is_exact_for_many_sizes() {
        let cases = [(0usize, 4u64), (1, 4), (4, 4), (5, 4), (17, 3), (100, 7), (64, 64)];
        for (total, window) in cases {
            let bridge = Arc::new(RecordingBridge::new(pattern(total)));
            let loader = loader_for(bridge.clone(), window);
            let resource = loader.load("/tmp/a.mp4", &CancellationToken::new(), |_, _| {}).unwrap();

            let requests = bridge.requests();
            assert_eq!(requests.len() as u64, (total as u64 + window - 1) / window);
            let mut expected_offset = 0;
            for (offset, length) in &requests {
                assert_eq!(*offset, expected_offset);
                expected_offset += length;
            }
            assert_eq!(expected_offset, total as u64);

            if let PlayableResource::Local { blob, .. } = &resource {
                assert_eq!(blob.data(), &bridge.data[..]);
            }
            resource.revoke();
        }
    }

    #[test]
    fn test_progress_reported_per_chunk() {
        let bridge = Arc::new(RecordingBridge::new(pattern(10)));
        let loader = loader_for(bridge, 4);
        let mut seen = Vec::new();
        let resource = loader
            .load("/tmp/a.webm", &CancellationToken::new(), |read, total| seen.push((read, total)))
            .unwrap();
        assert_eq!(seen, vec![(4, 10), (8, 10), (10, 10)]);
        resource.revoke();
    }

    #[test]
    fn test_size_query_failure() {
        let bridge = Arc::new(RecordingBridge::new(pattern(10)));
        let loader = loader_for(bridge.clone(), 4);
        let err = loader
            .load("/tmp/missing.mp4", &CancellationToken::new(), |_, _| {})
            .unwrap_err();
        assert!(matches!(err, LoadError::SizeQueryFailed(_)));
        assert!(bridge.requests().is_empty());
    }

    #[test]
    fn test_chunk_failure_discards_partial_bytes() {
        let mut bridge = RecordingBridge::new(pattern(12));
        bridge.fail_at = Some(8);
        let bridge = Arc::new(bridge);
        let loader = loader_for(bridge.clone(), 4);

        let err = loader.load("/tmp/a.mov", &CancellationToken::new(), |_, _| {}).unwrap_err();
        assert_eq!(
            err,
            LoadError::ChunkReadFailed {
                offset: 8,
                reason: "permission denied".to_string()
            }
        );
        assert_eq!(bridge.requests().len(), 3);
        assert_eq!(loader.registry().live_count(), 0);
    }

    #[test]
    fn test_truncated_file_is_a_chunk_failure() {
        let mut state = ChunkReadState::new(10);
        state.push(0, 4, vec![1, 2, 3, 4]).unwrap();
        let err = state.push(4, 4, Vec::new()).unwrap_err();
        assert!(matches!(err, LoadError::ChunkReadFailed { offset: 4, .. }));
        assert_eq!(state.bytes_read(), 4);
        assert!(!state.is_complete());
    }

    #[test]
    fn test_oversized_chunk_rejected() {
        let mut state = ChunkReadState::new(10);
        let err = state.push(0, 4, vec![0; 5]).unwrap_err();
        assert!(matches!(err, LoadError::ChunkReadFailed { offset: 0, .. }));
        assert_eq!(state.next_window(4), Some((0, 4)));
    }

    #[test]
    fn test_cancel_mid_load_creates_no_handle() {
        let token = CancellationToken::new();
        let mut bridge = RecordingBridge::new(pattern(40));
        bridge.cancel_after = Some((2, token.clone()));
        let bridge = Arc::new(bridge);
        let loader = loader_for(bridge.clone(), 4);

        let err = loader.load("/tmp/a.mp4", &token, |_, _| {}).unwrap_err();
        assert!(err.is_cancelled());
        // The in-flight second request resolved, but no third was issued
        assert_eq!(bridge.requests().len(), 2);
        assert_eq!(loader.registry().live_count(), 0);
        assert_eq!(loader.registry().revoked_total(), 0);
    }

    #[test]
    fn test_cancel_before_start_issues_nothing() {
        let bridge = Arc::new(RecordingBridge::new(pattern(40)));
        let loader = loader_for(bridge.clone(), 4);
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(loader.load("/tmp/a.mp4", &token, |_, _| {}).unwrap_err(), LoadError::Cancelled);
        assert!(bridge.requests().is_empty());
    }

    #[test]
    fn test_spawned_load_delivers_progress_then_resource() {
        let bridge = Arc::new(RecordingBridge::new(pattern(9)));
        let loader = loader_for(bridge, 4);
        let mut task = loader.spawn("/tmp/a.avi".to_string());

        let mut progress = Vec::new();
        let resource = loop {
            match task.wait_next() {
                Some(LoadMessage::Progress { bytes_read, .. }) => progress.push(bytes_read),
                Some(LoadMessage::Finished(result)) => break result.unwrap(),
                None => panic!("worker exited without a result"),
            }
        };

        assert_eq!(progress, vec![4, 8, 9]);
        assert_eq!(loader.registry().live_count(), 1);
        resource.revoke();
        task.join();
        assert_eq!(loader.registry().live_count(), 0);
    }

    #[test]
    fn test_cancelled_task_leaves_nothing_live() {
        let bridge = Arc::new(RecordingBridge::new(pattern(64)));
        let loader = loader_for(bridge, 4);
        let task = loader.spawn("/tmp/a.mp4".to_string());
        task.token().cancel();
        task.join();
        assert_eq!(loader.registry().live_count(), 0);
    }

    #[test]
    fn test_abort_cancels_token() {
        let bridge = Arc::new(RecordingBridge::new(pattern(64)));
        let loader = loader_for(bridge, 4);
        let task = loader.spawn("/tmp/a.mp4".to_string());
        let token = task.token().clone();
        task.abort();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_unless_cancelled_skips_after_cancel() {
        let token = CancellationToken::new();
        assert_eq!(token.unless_cancelled(|| 7), Ok(7));
        token.cancel();
        let mut ran = false;
        assert_eq!(token.unless_cancelled(|| ran = true), Err(LoadError::Cancelled));
        assert!(!ran);
    }

    #[test]
    fn test_cancel_waits_for_registration_section() {
        let registry = ResourceRegistry::new();
        let token = CancellationToken::new();
        let cancelled = Arc::new(AtomicBool::new(false));

        let handle = token
            .unless_cancelled(|| {
                let canceller = {
                    let token = token.clone();
                    let cancelled = cancelled.clone();
                    thread::spawn(move || {
                        token.cancel();
                        cancelled.store(true, Ordering::SeqCst);
                    })
                };
                thread::sleep(std::time::Duration::from_millis(20));
                // cancel() cannot complete while the section runs
                assert!(!cancelled.load(Ordering::SeqCst));
                (registry.register(MediaBlob::new(vec![1, 2], "video/mp4")), canceller)
            })
            .map(|(handle, canceller)| {
                let _ = canceller.join();
                handle
            });

        let handle = match handle {
            Ok(handle) => handle,
            Err(e) => panic!("section should have run: {}", e),
        };
        assert!(token.is_cancelled());
        assert_eq!(registry.live_count(), 1);
        handle.revoke();
        assert_eq!(token.unless_cancelled(|| ()), Err(LoadError::Cancelled));
    }
}
