//! Durable backing stores for the pending action queue.

use crate::error::{EngageError, Result};
use crate::queue::state::QueueState;
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Magic bytes for the queue file.
const QUEUE_MAGIC: &[u8; 4] = b"GPQ\0";

/// Current queue file format version.
const QUEUE_VERSION: u8 = 1;

/// Name of the queue file inside the storage directory.
const QUEUE_FILE: &str = "people_queue.bin";

/// 16MB sanity cap on the encoded queue.
const MAX_QUEUE_BYTES: usize = 16 * 1024 * 1024;

/// Key-value persistence for the queue, surviving process restarts.
pub trait QueueStorage: Send + Sync {
    /// Last saved state, or `None` if nothing was ever saved.
    fn load(&self) -> Result<Option<QueueState>>;

    /// Replace the saved state.
    fn persist(&self, state: &QueueState) -> Result<()>;
}

/// Non-durable storage kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryQueueStorage {
    saved: Mutex<Option<QueueState>>,
    saves: Mutex<u64>,
}

impl MemoryQueueStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a previously saved state.
    pub fn with_state(state: QueueState) -> Self {
        Self {
            saved: Mutex::new(Some(state)),
            saves: Mutex::new(0),
        }
    }

    /// Number of `persist` calls so far.
    pub fn save_count(&self) -> u64 {
        *self.saves.lock()
    }

    pub fn saved(&self) -> Option<QueueState> {
        self.saved.lock().clone()
    }
}

impl QueueStorage for MemoryQueueStorage {
    fn load(&self) -> Result<Option<QueueState>> {
        Ok(self.saved.lock().clone())
    }

    fn persist(&self, state: &QueueState) -> Result<()> {
        *self.saved.lock() = Some(state.clone());
        *self.saves.lock() += 1;
        Ok(())
    }
}

/// Single-file storage: magic, version, length-prefixed MessagePack body, CRC32.
///
/// The directory is held under an exclusive advisory lock for the lifetime
/// of the value, so only one client instance owns a queue.
pub struct FileQueueStorage {
    /// Path of the queue file.
    path: PathBuf,

    /// Lock file for exclusive access.
    _lock_file: File,
}

impl FileQueueStorage {
    /// Open (or create) queue storage in `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let lock_file = Self::acquire_lock(dir)?;

        Ok(Self {
            path: dir.join(QUEUE_FILE),
            _lock_file: lock_file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn acquire_lock(dir: &Path) -> Result<File> {
        let lock_file = File::create(dir.join("LOCK"))?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| EngageError::Locked)?;

        Ok(lock_file)
    }
}

impl QueueStorage for FileQueueStorage {
    fn load(&self) -> Result<Option<QueueState>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut file = File::open(&self.path)?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != QUEUE_MAGIC {
            return Err(EngageError::InvalidFormat("Invalid queue magic".into()));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != QUEUE_VERSION {
            return Err(EngageError::InvalidFormat(format!(
                "Unsupported queue version: {}",
                version[0]
            )));
        }

        let mut len_bytes = [0u8; 8];
        file.read_exact(&mut len_bytes)?;
        let len = u64::from_le_bytes(len_bytes) as usize;
        if len > MAX_QUEUE_BYTES {
            return Err(EngageError::InvalidFormat(format!(
                "Queue body too large: {} bytes",
                len
            )));
        }

        let mut encoded = vec![0u8; len];
        file.read_exact(&mut encoded)?;

        let mut checksum_bytes = [0u8; 4];
        file.read_exact(&mut checksum_bytes)?;
        let stored = u32::from_le_bytes(checksum_bytes);
        let computed = crc32fast::hash(&encoded);
        if stored != computed {
            return Err(EngageError::ChecksumMismatch {
                expected: stored,
                got: computed,
            });
        }

        Ok(Some(rmp_serde::from_slice(&encoded)?))
    }

    fn persist(&self, state: &QueueState) -> Result<()> {
        let encoded = rmp_serde::to_vec(state)?;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;

        file.write_all(QUEUE_MAGIC)?;
        file.write_all(&[QUEUE_VERSION])?;
        file.write_all(&(encoded.len() as u64).to_le_bytes())?;
        file.write_all(&encoded)?;
        file.write_all(&crc32fast::hash(&encoded).to_le_bytes())?;

        file.sync_all()?;
        Ok(())
    }
}
