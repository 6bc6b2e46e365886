//! Stream-oriented file namespace over a flat, fixed-size blob store.
//!
//! The backing store is an opaque mapping from 64-bit ids to blobs of at
//! most 256 KiB. On top of it the crate keeps a superblock at blob 0, a
//! hash-bucketed directory in blobs `1..=DIR_HEADS`, and per-file chains
//! of control blocks indexing the data blobs. Files are accessed through
//! [`FileStream`] handles with C-like open/read/write/seek semantics.

mod error;
mod filesystem;
mod filetypes;
mod store;
mod structs;

pub use error::Error;
pub use filesystem::Filesystem;
pub use filetypes::FileStream;
pub use store::{BlobHandle, BlobStore, MemoryBlobStore, MAX_BLOB_SIZE};
pub use structs::{
    BLOB_SIZE, CONTROL_SLOT_CAPACITY, DIR_ENTRY_CAPACITY, DIR_HEADS, MAX_FILE_SIZE, MAX_PATH,
};
