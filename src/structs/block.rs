use std::mem::size_of;

use bytemuck::{bytes_of, pod_read_unaligned};

use super::*;
use crate::store::BlobStore;
use crate::Error;

impl<K: BlockKind> BlockHandle<K> {
    /// Obtain the typed view over blob `id`. An untouched blob gets a
    /// fresh header and empty body written on first load.
    pub fn load(store: &dyn BlobStore, id: u64) -> Result<Self, Error> {
        let blob = store.get_blob(id);
        let mut data = blob.get();
        if data.is_empty() {
            data = vec![0u8; HEADER_LEN + K::FIXED];
            let header = BlockHeader::new(K::KIND, FLAG_NEW);
            data[..HEADER_LEN].copy_from_slice(bytes_of(&header));
            blob.put(data.clone())?;
        }
        let handle = Self::assemble(id, blob, data);
        if handle.data.len() < HEADER_LEN + K::FIXED || handle.header().kind != K::KIND as u32 {
            return Err(Error::Corrupt);
        }
        Ok(handle)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current payload length in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn header(&self) -> BlockHeader {
        pod_read_unaligned(&self.data[..HEADER_LEN])
    }

    fn store_header(&mut self, header: BlockHeader) -> Result<(), Error> {
        self.data[..HEADER_LEN].copy_from_slice(bytes_of(&header));
        self.blob.put(self.data.clone())
    }

    pub fn set_prev(&mut self, id: u64) -> Result<(), Error> {
        let mut header = self.header();
        header.prev = id;
        self.store_header(header)
    }

    pub fn set_next(&mut self, id: u64) -> Result<(), Error> {
        let mut header = self.header();
        header.next = id;
        self.store_header(header)
    }

    pub fn record_count(&self) -> usize {
        (self.size() - HEADER_LEN - K::FIXED) / size_of::<K::Record>()
    }

    pub fn record(&self, index: usize) -> Option<K::Record> {
        let offset = HEADER_LEN + K::FIXED + index * size_of::<K::Record>();
        let end = offset + size_of::<K::Record>();
        if end > self.data.len() {
            return None;
        }
        Some(pod_read_unaligned(&self.data[offset..end]))
    }

    pub fn set_record(&mut self, index: usize, record: K::Record) -> Result<(), Error> {
        let offset = HEADER_LEN + K::FIXED + index * size_of::<K::Record>();
        let end = offset + size_of::<K::Record>();
        if end > self.data.len() {
            return Err(Error::BadArgs);
        }
        self.data[offset..end].copy_from_slice(bytes_of(&record));
        self.blob.put(self.data.clone())
    }

    /// Append one record, failing with [`Error::BlockFull`] when the
    /// blob would outgrow its size limit.
    pub fn append_record(&mut self, record: K::Record) -> Result<(), Error> {
        if self.size() + size_of::<K::Record>() > BLOB_SIZE {
            return Err(Error::BlockFull);
        }
        self.data.extend_from_slice(bytes_of(&record));
        self.blob.put(self.data.clone())
    }

    /// Replace this view with the linked block, `false` if the link is
    /// zero.
    pub fn follow_next(&mut self, store: &dyn BlobStore) -> Result<bool, Error> {
        let next = self.header().next;
        if next == 0 {
            return Ok(false);
        }
        *self = Self::load(store, next)?;
        Ok(true)
    }

    pub fn follow_prev(&mut self, store: &dyn BlobStore) -> Result<bool, Error> {
        let prev = self.header().prev;
        if prev == 0 {
            return Ok(false);
        }
        *self = Self::load(store, prev)?;
        Ok(true)
    }

    /// Return the blob to its uninitialized state.
    pub fn clear(&mut self) -> Result<(), Error> {
        self.data.clear();
        self.blob.put(Vec::new())
    }
}

const DIRECTORY_OFFSET: usize = HEADER_LEN;
const START_OFFSET: usize = HEADER_LEN + 8;
const LAST_MODIFIED_OFFSET: usize = HEADER_LEN + 16;

impl BlockHandle<ControlBlock> {
    /// Owning directory blob, recorded for deletion.
    pub fn directory(&self) -> u64 {
        self.body_u64(DIRECTORY_OFFSET)
    }

    /// Index of this block within its file's chain.
    pub fn start(&self) -> u64 {
        self.body_u64(START_OFFSET)
    }

    /// Seconds since epoch of the last data mutation.
    pub fn last_modified(&self) -> u64 {
        self.body_u64(LAST_MODIFIED_OFFSET)
    }

    pub fn init_body(
        &mut self,
        directory: u64,
        start: u64,
        last_modified: u64,
    ) -> Result<(), Error> {
        self.data[DIRECTORY_OFFSET..DIRECTORY_OFFSET + 8]
            .copy_from_slice(&directory.to_le_bytes());
        self.data[START_OFFSET..START_OFFSET + 8].copy_from_slice(&start.to_le_bytes());
        self.data[LAST_MODIFIED_OFFSET..LAST_MODIFIED_OFFSET + 8]
            .copy_from_slice(&last_modified.to_le_bytes());
        self.blob.put(self.data.clone())
    }

    pub fn set_last_modified(&mut self, last_modified: u64) -> Result<(), Error> {
        self.data[LAST_MODIFIED_OFFSET..LAST_MODIFIED_OFFSET + 8]
            .copy_from_slice(&last_modified.to_le_bytes());
        self.blob.put(self.data.clone())
    }

    /// Drop every data blob slot, keeping header and body fields.
    pub fn reset_slots(&mut self) -> Result<(), Error> {
        self.data.truncate(HEADER_LEN + CONTROL_FIXED);
        self.blob.put(self.data.clone())
    }

    fn body_u64(&self, offset: usize) -> u64 {
        pod_read_unaligned(&self.data[offset..offset + 8])
    }
}
