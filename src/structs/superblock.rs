use std::fmt::Display;
use std::mem::size_of;

use bytemuck::{bytes_of, pod_read_unaligned};
use log::debug;

use super::*;
use crate::store::BlobStore;
use crate::Error;

impl Superblock {
    pub(crate) fn new() -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            next_free: FIRST_FREE_DATA_ID,
        }
    }

    /// Read blob 0, formatting it first if the store is pristine.
    pub(crate) fn load(store: &dyn BlobStore) -> Result<Self, Error> {
        let blob = store.get_blob(SUPERBLOCK_ID);
        let raw = blob.get();
        if raw.is_empty() {
            let superblock = Self::new();
            debug!("formatting fresh superblock");
            superblock.flush(store)?;
            return Ok(superblock);
        }
        if raw.len() < size_of::<Self>() {
            return Err(Error::Corrupt);
        }
        let superblock: Self = pod_read_unaligned(&raw[..size_of::<Self>()]);
        superblock.validate()?;
        Ok(superblock)
    }

    pub(crate) fn flush(&self, store: &dyn BlobStore) -> Result<(), Error> {
        store.get_blob(SUPERBLOCK_ID).put(bytes_of(self).to_vec())
    }

    fn validate(&self) -> Result<(), Error> {
        if self.magic != MAGIC || self.version < VERSION || self.next_free <= DIR_HEADS {
            return Err(Error::Corrupt);
        }
        Ok(())
    }
}

impl Display for Superblock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Superblock {{ magic: {:?}, version: {}, next_free: {} }}",
            String::from_utf8_lossy(&self.magic),
            self.version,
            self.next_free
        )
    }
}
