use super::{ChainPos, StreamCursor};
use crate::structs::{BLOB_SIZE, CONTROL_SLOT_CAPACITY};

impl StreamCursor {
    pub fn new(position: u64) -> Self {
        Self { position }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn set(&mut self, position: u64) {
        self.position = position;
    }

    pub fn advance(&mut self, bytes: u64) {
        self.position += bytes;
    }

    /// Split the position into control block index, data blob slot and
    /// intra-blob offset.
    pub fn translate(&self) -> ChainPos {
        let data_index = self.position / BLOB_SIZE as u64;
        ChainPos {
            ctrl_index: data_index / CONTROL_SLOT_CAPACITY as u64,
            slot: (data_index % CONTROL_SLOT_CAPACITY as u64) as usize,
            within: (self.position % BLOB_SIZE as u64) as usize,
        }
    }
}
