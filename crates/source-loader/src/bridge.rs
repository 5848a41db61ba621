// Request/response boundary to the process that can read local files

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

/// File access across the IPC boundary.
/// Both calls are blocking round trips; the loader keeps at most one in flight.
pub trait FileBridge: Send + Sync {
    /// Total size of the file in bytes
    fn query_size(&self, path: &str) -> io::Result<u64>;

    /// Read `length` bytes starting at `offset`.
    /// Returns fewer bytes only when EOF truncates the request.
    fn read_range(&self, path: &str, offset: u64, length: u64) -> io::Result<Vec<u8>>;
}

/// Bridge backed directly by the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileBridge;

impl LocalFileBridge {
    pub fn new() -> Self {
        Self
    }
}

impl FileBridge for LocalFileBridge {
    fn query_size(&self, path: &str) -> io::Result<u64> {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path),
            ));
        }
        Ok(metadata.len())
    }

    fn read_range(&self, path: &str, offset: u64, length: u64) -> io::Result<Vec<u8>> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(offset))?;

        let mut data = Vec::with_capacity(length.min(usize::MAX as u64) as usize);
        file.take(length).read_to_end(&mut data)?;

        log::debug!("Read range: path={} offset={} len={}", path, offset, data.len());
        Ok(data)
    }
}
