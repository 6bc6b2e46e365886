use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};

use crate::Error;

mod memory;

pub use memory::MemoryBlobStore;

/// Hard limit on a single blob's payload in bytes.
pub const MAX_BLOB_SIZE: usize = 1 << 18;

/// Flat key to bytes mapping the filesystem is built on.
pub trait BlobStore: Debug {
    /// Handle for the blob with `id`. Ids never written before yield
    /// empty bytes.
    fn get_blob(&self, id: u64) -> BlobHandle;

    /// Remaining capacity in bytes.
    fn free_space(&self) -> u64;
}

/// Refcounted view over one stored blob. Clones share the underlying
/// buffer, so overlapping handles for the same id never diverge.
#[derive(Debug, Clone)]
pub struct BlobHandle {
    pub(crate) id: u64,
    pub(crate) data: Arc<Mutex<Vec<u8>>>,
    pub(crate) free: Arc<Mutex<u64>>,
}

impl BlobHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Snapshot of the current contents.
    pub fn get(&self) -> Vec<u8> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.data.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the contents atomically, charging the size delta against
    /// the store's free space.
    pub fn put(&self, bytes: Vec<u8>) -> Result<(), Error> {
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(Error::BadArgs);
        }
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        let old = data.len() as u64;
        let new = bytes.len() as u64;
        if new > old {
            let delta = new - old;
            if delta > *free {
                return Err(Error::OutOfSpace);
            }
            *free -= delta;
        } else {
            *free += old - new;
        }
        *data = bytes;
        Ok(())
    }
}
