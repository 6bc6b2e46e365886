use log::debug;

use crate::store::BlobStore;
use crate::structs::{Superblock, MAX_BLOB_COUNT};
use crate::Error;

/// Owner of the mounted namespace: the backing store plus the in-memory
/// superblock, authoritative between initialize and finalize.
#[derive(Debug)]
pub struct Filesystem {
    pub(crate) superblock: Superblock,
    pub(crate) store: Box<dyn BlobStore>,
}

impl Filesystem {
    /// Bring up the filesystem over `store`, formatting blob 0 on first
    /// use. Call exactly once before any other operation.
    pub fn initialize(store: Box<dyn BlobStore>) -> Result<Self, Error> {
        let superblock = Superblock::load(store.as_ref())?;
        debug!("initialized, {superblock}");
        Ok(Self { superblock, store })
    }

    /// Write the in-memory superblock back to blob 0. Call once at
    /// shutdown.
    pub fn finalize(&mut self) -> Result<(), Error> {
        debug!("finalized, {}", self.superblock);
        self.superblock.flush(self.store.as_ref())
    }

    /// Remaining capacity of the backing store in bytes.
    pub fn free_space(&self) -> u64 {
        self.store.free_space()
    }

    pub(crate) fn store(&self) -> &dyn BlobStore {
        self.store.as_ref()
    }

    /// Mint the next unused blob id. Released ids are never handed out
    /// again; the counter is persisted on every allocation so an
    /// unclean shutdown cannot replay ids.
    pub(crate) fn allocate_blob_id(&mut self) -> Result<u64, Error> {
        if self.superblock.next_free >= MAX_BLOB_COUNT {
            return Err(Error::OutOfSpace);
        }
        let id = self.superblock.next_free;
        self.superblock.next_free += 1;
        self.superblock.flush(self.store.as_ref())?;
        Ok(id)
    }
}
