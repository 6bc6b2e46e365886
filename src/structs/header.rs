use std::fmt::Display;

use super::*;

impl BlockHeader {
    pub(crate) fn new(kind: BlockType, flags: u32) -> Self {
        Self {
            kind: kind as u32,
            flags,
            prev: 0,
            next: 0,
        }
    }

    pub(crate) fn block_type(&self) -> Option<BlockType> {
        match self.kind {
            0 => Some(BlockType::None),
            1 => Some(BlockType::Control),
            2 => Some(BlockType::Dir),
            3 => Some(BlockType::Data),
            _ => None,
        }
    }
}

impl Display for BlockHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BlockHeader {{ type: {:?}, flags: {:#x}, prev: {}, next: {} }}",
            self.block_type(),
            self.flags,
            self.prev,
            self.next
        )
    }
}
