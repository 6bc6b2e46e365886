use std::collections::HashSet;

use log::{debug, error};

use super::{timestamp_now, ControlChain};
use crate::filesystem::Filesystem;
use crate::store::BlobStore;
use crate::structs::{BlockHandle, ControlBlock, BLOB_SIZE, CONTROL_SLOT_CAPACITY};
use crate::Error;

impl ControlChain {
    /// Start the chain for a new file: one control block with `start` 0,
    /// owned by directory block `directory`, no data blobs yet.
    pub fn create(fs: &mut Filesystem, id: u64, directory: u64) -> Result<Self, Error> {
        let mut block = BlockHandle::<ControlBlock>::load(fs.store(), id)?;
        block.init_body(directory, 0, timestamp_now())?;
        Ok(Self { first: id, current: block })
    }

    /// Load an existing chain by its first control block.
    pub fn load(fs: &Filesystem, id: u64) -> Result<Self, Error> {
        let block = BlockHandle::<ControlBlock>::load(fs.store(), id)?;
        if block.start() != 0 {
            error!("control block {id} opened as chain head but starts at {}", block.start());
            return Err(Error::Corrupt);
        }
        Ok(Self { first: id, current: block })
    }

    /// Walk until the block with `start == ctrl_index` is current.
    /// `false` when the chain ends first, leaving the tail current.
    pub fn seek_to(&mut self, fs: &Filesystem, ctrl_index: u64) -> Result<bool, Error> {
        loop {
            let start = self.current.start();
            if start == ctrl_index {
                return Ok(true);
            }
            if start < ctrl_index {
                let here = self.current.id();
                if !self.current.follow_next(fs.store())? {
                    return Ok(false);
                }
                if self.current.start() != start + 1 || self.current.header().prev != here {
                    error!("control chain of {} broken after block {here}", self.first);
                    return Err(Error::Corrupt);
                }
            } else {
                if !self.current.follow_prev(fs.store())? {
                    return Err(Error::Corrupt);
                }
                if self.current.start() + 1 != start {
                    return Err(Error::Corrupt);
                }
            }
        }
    }

    /// Append control blocks until `start == ctrl_index` exists. The
    /// current block must already be the tail.
    pub fn extend_to(&mut self, fs: &mut Filesystem, ctrl_index: u64) -> Result<(), Error> {
        while self.current.start() < ctrl_index {
            let id = fs.allocate_blob_id()?;
            let start = self.current.start() + 1;
            let mut block = BlockHandle::<ControlBlock>::load(fs.store(), id)?;
            block.init_body(self.current.directory(), start, self.current.last_modified())?;
            block.set_prev(self.current.id())?;
            self.current.set_next(id)?;
            debug!("chain {} extended with control block {id} at index {start}", self.first);
            self.current = block;
        }
        Ok(())
    }

    /// Data blob id at `slot` of the current control block.
    pub fn slot(&self, slot: usize) -> Option<u64> {
        self.current.record(slot)
    }

    /// Allocate data blobs for every missing slot up to and including
    /// `slot` on the current control block, returning the id stored
    /// there. The freshly allocated blobs stay empty.
    pub fn ensure_slot(&mut self, fs: &mut Filesystem, slot: usize) -> Result<u64, Error> {
        while self.current.record_count() <= slot {
            let id = fs.allocate_blob_id()?;
            self.current.append_record(id)?;
        }
        self.slot(slot).ok_or(Error::Corrupt)
    }

    /// Refresh the file's modification stamp. The head block holds the
    /// canonical value, wherever the chain is currently positioned.
    pub fn touch(&mut self, fs: &Filesystem) -> Result<(), Error> {
        let stamp = timestamp_now();
        if self.current.id() == self.first {
            return self.current.set_last_modified(stamp);
        }
        let mut head = BlockHandle::<ControlBlock>::load(fs.store(), self.first)?;
        head.set_last_modified(stamp)
    }

    /// The file's modification stamp, read off the head block.
    pub fn last_modified(&self, fs: &Filesystem) -> Result<u64, Error> {
        if self.current.id() == self.first {
            return Ok(self.current.last_modified());
        }
        Ok(BlockHandle::<ControlBlock>::load(fs.store(), self.first)?.last_modified())
    }

    /// File length implied by the chain: the highest indexed slot times
    /// the blob size, plus the byte count of the final data blob.
    pub fn length(&mut self, fs: &Filesystem) -> Result<u64, Error> {
        loop {
            let start = self.current.start();
            let here = self.current.id();
            if !self.current.follow_next(fs.store())? {
                break;
            }
            if self.current.start() != start + 1 || self.current.header().prev != here {
                return Err(Error::Corrupt);
            }
        }
        let start = self.current.start();
        let count = self.current.record_count() as u64;
        if count == 0 {
            return Ok(start * (CONTROL_SLOT_CAPACITY * BLOB_SIZE) as u64);
        }
        let last = self.current.record(count as usize - 1).ok_or(Error::Corrupt)?;
        let tail_len = fs.store().get_blob(last).len() as u64;
        Ok((start * CONTROL_SLOT_CAPACITY as u64 + count - 1) * BLOB_SIZE as u64 + tail_len)
    }

    /// Reset the chain to a single empty control block: every data blob
    /// and overflow control block is cleared, the first block keeps its
    /// identity so the directory entry stays valid.
    pub fn truncate(&mut self, fs: &Filesystem) -> Result<(), Error> {
        debug!("truncate chain {}", self.first);
        self.clear_blocks(fs, true)?;
        self.current = BlockHandle::<ControlBlock>::load(fs.store(), self.first)?;
        Ok(())
    }

    /// Tear the whole chain down, first block included. Used by remove;
    /// blob ids are never recycled, only their contents are dropped.
    pub fn release(mut self, fs: &Filesystem) -> Result<(), Error> {
        debug!("release chain {}", self.first);
        self.clear_blocks(fs, false)
    }

    fn clear_blocks(&mut self, fs: &Filesystem, keep_first: bool) -> Result<(), Error> {
        let mut block = BlockHandle::<ControlBlock>::load(fs.store(), self.first)?;
        let mut visited = HashSet::from([self.first]);
        loop {
            for slot in 0..block.record_count() {
                let id = block.record(slot).ok_or(Error::Corrupt)?;
                if id != 0 {
                    fs.store().get_blob(id).put(Vec::new())?;
                }
            }
            let next = block.header().next;
            if keep_first && block.id() == self.first {
                block.reset_slots()?;
                block.set_next(0)?;
                block.set_last_modified(timestamp_now())?;
            } else {
                block.clear()?;
            }
            if next == 0 {
                return Ok(());
            }
            if !visited.insert(next) {
                return Err(Error::Corrupt);
            }
            block = BlockHandle::<ControlBlock>::load(fs.store(), next)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ControlChain;
    use crate::filesystem::Filesystem;
    use crate::store::{BlobStore, MemoryBlobStore};
    use crate::structs::{BlockHandle, ControlBlock, BLOB_SIZE, CONTROL_SLOT_CAPACITY, HEADER_LEN};
    use crate::Error;

    fn empty_fs() -> Filesystem {
        Filesystem::initialize(Box::new(MemoryBlobStore::new())).unwrap()
    }

    fn fresh_chain(fs: &mut Filesystem) -> ControlChain {
        let id = fs.allocate_blob_id().unwrap();
        ControlChain::create(fs, id, 1).unwrap()
    }

    #[test]
    fn create_and_reload() {
        let mut fs = empty_fs();
        let chain = fresh_chain(&mut fs);
        let reloaded = ControlChain::load(&fs, chain.first).unwrap();
        assert_eq!(reloaded.current.directory(), 1);
        assert_eq!(reloaded.current.start(), 0);
        assert_eq!(reloaded.current.record_count(), 0);
    }

    #[test]
    fn ensure_slot_allocates_gap() {
        let mut fs = empty_fs();
        let mut chain = fresh_chain(&mut fs);
        let blob = chain.ensure_slot(&mut fs, 3).unwrap();
        assert_eq!(chain.current.record_count(), 4);
        assert_eq!(chain.slot(3), Some(blob));
        assert_ne!(chain.slot(0), Some(blob));
        // gap blobs exist but carry no bytes
        assert!(fs.store().get_blob(chain.slot(0).unwrap()).is_empty());
    }

    #[test]
    fn extend_links_blocks() {
        let mut fs = empty_fs();
        let mut chain = fresh_chain(&mut fs);
        chain.extend_to(&mut fs, 2).unwrap();
        assert_eq!(chain.current.start(), 2);
        assert_eq!(chain.current.directory(), 1);
        // walk back and forth over the links
        assert!(chain.seek_to(&fs, 0).unwrap());
        assert_eq!(chain.current.id(), chain.first);
        assert!(chain.seek_to(&fs, 2).unwrap());
        assert!(!chain.seek_to(&fs, 7).unwrap());
        assert_eq!(chain.current.start(), 2);
    }

    #[test]
    fn length_tracks_tail_blob() {
        let mut fs = empty_fs();
        let mut chain = fresh_chain(&mut fs);
        assert_eq!(chain.length(&fs).unwrap(), 0);
        let blob = chain.ensure_slot(&mut fs, 0).unwrap();
        fs.store().get_blob(blob).put(vec![7; 100]).unwrap();
        assert_eq!(chain.length(&fs).unwrap(), 100);
        let blob = chain.ensure_slot(&mut fs, 2).unwrap();
        fs.store().get_blob(blob).put(vec![7; 25]).unwrap();
        assert_eq!(chain.length(&fs).unwrap(), 2 * BLOB_SIZE as u64 + 25);
    }

    #[test]
    fn length_spans_chained_blocks() {
        let mut fs = empty_fs();
        let mut chain = fresh_chain(&mut fs);
        chain.extend_to(&mut fs, 1).unwrap();
        let blob = chain.ensure_slot(&mut fs, 0).unwrap();
        fs.store().get_blob(blob).put(vec![1; 10]).unwrap();
        let region = (CONTROL_SLOT_CAPACITY * BLOB_SIZE) as u64;
        assert_eq!(chain.length(&fs).unwrap(), region + 10);
    }

    #[test]
    fn truncate_keeps_first_block() {
        let mut fs = empty_fs();
        let mut chain = fresh_chain(&mut fs);
        chain.extend_to(&mut fs, 1).unwrap();
        let blob = chain.ensure_slot(&mut fs, 0).unwrap();
        fs.store().get_blob(blob).put(vec![9; 50]).unwrap();
        chain.truncate(&fs).unwrap();
        assert_eq!(chain.current.id(), chain.first);
        assert_eq!(chain.current.record_count(), 0);
        assert_eq!(chain.current.header().next, 0);
        assert_eq!(chain.length(&fs).unwrap(), 0);
        assert!(fs.store().get_blob(blob).is_empty());
    }

    #[test]
    fn release_clears_everything() {
        let mut fs = empty_fs();
        let mut chain = fresh_chain(&mut fs);
        let first = chain.first;
        chain.extend_to(&mut fs, 1).unwrap();
        let overflow = chain.current.id();
        let blob = chain.ensure_slot(&mut fs, 0).unwrap();
        fs.store().get_blob(blob).put(vec![9; 50]).unwrap();
        chain.release(&fs).unwrap();
        assert!(fs.store().get_blob(first).is_empty());
        assert!(fs.store().get_blob(overflow).is_empty());
        assert!(fs.store().get_blob(blob).is_empty());
    }

    #[test]
    fn broken_start_sequence_is_corrupt() {
        let mut fs = empty_fs();
        let mut chain = fresh_chain(&mut fs);
        chain.extend_to(&mut fs, 1).unwrap();
        let overflow = chain.current.id();
        let mut block = BlockHandle::<ControlBlock>::load(fs.store(), overflow).unwrap();
        block.init_body(1, 5, 0).unwrap();
        assert!(chain.seek_to(&fs, 0).unwrap());
        assert_eq!(chain.seek_to(&fs, 1).unwrap_err(), Error::Corrupt);
    }

    #[test]
    fn loading_mid_chain_block_is_corrupt() {
        let mut fs = empty_fs();
        let mut chain = fresh_chain(&mut fs);
        chain.extend_to(&mut fs, 1).unwrap();
        let overflow = chain.current.id();
        assert_eq!(ControlChain::load(&fs, overflow).unwrap_err(), Error::Corrupt);
    }

    #[test]
    fn touch_stamps_the_head_block() {
        let mut fs = empty_fs();
        let mut chain = fresh_chain(&mut fs);
        chain.extend_to(&mut fs, 1).unwrap();
        let mut head = BlockHandle::<ControlBlock>::load(fs.store(), chain.first).unwrap();
        head.set_last_modified(0).unwrap();
        // current rests on block 1, the stamp still lands on the head
        chain.touch(&fs).unwrap();
        let head = BlockHandle::<ControlBlock>::load(fs.store(), chain.first).unwrap();
        assert!(head.last_modified() > 0);
        assert_eq!(chain.last_modified(&fs).unwrap(), head.last_modified());
        // walking back to the head does not change the answer
        assert!(chain.seek_to(&fs, 0).unwrap());
        assert_eq!(chain.last_modified(&fs).unwrap(), head.last_modified());
    }

    #[test]
    fn slot_capacity_fills_block_exactly() {
        assert_eq!(HEADER_LEN + 24 + CONTROL_SLOT_CAPACITY * 8, BLOB_SIZE);
    }
}
