use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::{BlobHandle, BlobStore};

/// Total usable blob space of the backing device.
pub const DEFAULT_CAPACITY: u64 = 1 << 52;

/// Blob store kept entirely in memory. Cloning shares the contents, so
/// a filesystem can be torn down and brought up again over the same
/// blobs.
#[derive(Debug, Clone)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<BTreeMap<u64, Arc<Mutex<Vec<u8>>>>>>,
    free: Arc<Mutex<u64>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(bytes: u64) -> Self {
        Self {
            blobs: Arc::default(),
            free: Arc::new(Mutex::new(bytes)),
        }
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get_blob(&self, id: u64) -> BlobHandle {
        let mut blobs = self.blobs.lock().unwrap_or_else(PoisonError::into_inner);
        let data = blobs.entry(id).or_default().clone();
        BlobHandle {
            id,
            data,
            free: self.free.clone(),
        }
    }

    fn free_space(&self) -> u64 {
        *self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
