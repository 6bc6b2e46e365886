mod control;
mod cursor;
mod directory;
mod stream;

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::filesystem::Filesystem;
use crate::structs::{BlockHandle, ControlBlock};

/// Parsed open-mode flags, consumed while opening a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Mode {
    pub(crate) read: bool,
    pub(crate) write: bool,
    pub(crate) append: bool,
}

/// Location of one entry inside a directory bucket chain.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DirEntryRef {
    pub(crate) dir_blob: u64,
    pub(crate) slot: usize,
    pub(crate) control: u64,
}

/// Coordinates of a byte offset within a control chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChainPos {
    pub(crate) ctrl_index: u64,
    pub(crate) slot: usize,
    pub(crate) within: usize,
}

/// Byte position of a stream, translated on demand into chain
/// coordinates.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StreamCursor {
    position: u64,
}

/// Doubly linked list of control blocks indexing a file's data blobs.
#[derive(Debug, Clone)]
pub(crate) struct ControlChain {
    pub(crate) first: u64,
    pub(crate) current: BlockHandle<ControlBlock>,
}

/// Stream handle over one named file: cursor position plus the file's
/// control chain. Open-mode flags are consumed while opening.
#[derive(Debug)]
pub struct FileStream {
    pub(crate) filesystem: Arc<Mutex<Filesystem>>,
    pub(crate) chain: ControlChain,
    pub(crate) cursor: StreamCursor,
}

pub(crate) fn timestamp_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
