use std::io::{Seek, SeekFrom};
use std::sync::{Arc, Mutex};

use log::debug;

use super::directory::validate_name;
use super::{ControlChain, FileStream, Mode, StreamCursor};
use crate::filesystem::Filesystem;
use crate::store::BlobStore;
use crate::structs::{BLOB_SIZE, MAX_FILE_SIZE};
use crate::Error;

impl Mode {
    /// One or two characters over `r`, `w` and `a`. Write or append
    /// create a missing file; only the bare write mode truncates.
    pub(crate) fn parse(mode: &str) -> Result<Self, Error> {
        if mode.is_empty() || mode.len() > 2 {
            return Err(Error::BadMode);
        }
        let mut parsed = Self {
            read: false,
            write: false,
            append: false,
        };
        for flag in mode.chars() {
            match flag {
                'r' => parsed.read = true,
                'w' => parsed.write = true,
                'a' => parsed.append = true,
                _ => return Err(Error::BadMode),
            }
        }
        Ok(parsed)
    }

    fn creates(&self) -> bool {
        self.write || self.append
    }

    fn truncates(&self) -> bool {
        self.write && !self.read && !self.append
    }
}

impl FileStream {
    /// Open `name`, creating or truncating it according to `mode`.
    pub fn open(fs: &Arc<Mutex<Filesystem>>, name: &str, mode: &str) -> Result<Self, Error> {
        let mode = Mode::parse(mode)?;
        let mut fs_handle = fs.lock()?;
        let name_bytes = validate_name(name)?;
        let (chain, position) = match fs_handle.find_entry(name_bytes)? {
            Some(entry) => {
                let mut chain = ControlChain::load(&fs_handle, entry.control)?;
                if mode.truncates() {
                    chain.truncate(&fs_handle)?;
                }
                let position = if mode.append {
                    chain.length(&fs_handle)?
                } else {
                    0
                };
                (chain, position)
            }
            None => {
                if !mode.creates() {
                    return Err(Error::NotFound);
                }
                let id = fs_handle.allocate_blob_id()?;
                let entry = fs_handle.insert_entry(name_bytes, id)?;
                debug!("create {name} with control block {id}");
                let chain = ControlChain::create(&mut fs_handle, id, entry.dir_blob)?;
                (chain, 0)
            }
        };
        drop(fs_handle);
        Ok(Self {
            filesystem: fs.clone(),
            chain,
            cursor: StreamCursor::new(position),
        })
    }

    /// Bytes read into `buffer`, 0 at end of file. A single call never
    /// crosses a data blob boundary, so short reads are routine.
    pub fn read(&mut self, buffer: &mut [u8]) -> Result<usize, Error> {
        if buffer.is_empty() {
            return Ok(0);
        }
        let pos = self.cursor.translate();
        let fs_handle = self.filesystem.lock()?;
        if !self.chain.seek_to(&fs_handle, pos.ctrl_index)? {
            return Ok(0);
        }
        let Some(blob_id) = self.chain.slot(pos.slot) else {
            return Ok(0);
        };
        if blob_id == 0 {
            return Ok(0);
        }
        let data = fs_handle.store().get_blob(blob_id).get();
        drop(fs_handle);
        if pos.within >= data.len() {
            return Ok(0);
        }
        let count = buffer
            .len()
            .min(BLOB_SIZE - pos.within)
            .min(data.len() - pos.within);
        buffer[..count].copy_from_slice(&data[pos.within..pos.within + count]);
        self.cursor.advance(count as u64);
        Ok(count)
    }

    /// Bytes written, always `buffer.len()` on success. The target data
    /// blob is zero-extended up to the write's start when needed; a
    /// range spilling into the next blob fails with
    /// [`Error::CrossBoundary`] and leaves the cursor in place.
    pub fn write(&mut self, buffer: &[u8]) -> Result<usize, Error> {
        if buffer.is_empty() {
            return Ok(0);
        }
        if self.cursor.position() + buffer.len() as u64 > MAX_FILE_SIZE {
            return Err(Error::BadArgs);
        }
        let pos = self.cursor.translate();
        if pos.within + buffer.len() > BLOB_SIZE {
            return Err(Error::CrossBoundary);
        }
        let mut fs_handle = self.filesystem.lock()?;
        if !self.chain.seek_to(&fs_handle, pos.ctrl_index)? {
            self.chain.extend_to(&mut fs_handle, pos.ctrl_index)?;
        }
        let blob_id = self.chain.ensure_slot(&mut fs_handle, pos.slot)?;
        let blob = fs_handle.store().get_blob(blob_id);
        let mut data = blob.get();
        if data.len() < pos.within + buffer.len() {
            data.resize(pos.within + buffer.len(), 0);
        }
        data[pos.within..pos.within + buffer.len()].copy_from_slice(buffer);
        blob.put(data)?;
        self.chain.touch(&fs_handle)?;
        drop(fs_handle);
        self.cursor.advance(buffer.len() as u64);
        Ok(buffer.len())
    }

    /// Current cursor position.
    pub fn tell(&self) -> u64 {
        self.cursor.position()
    }

    /// Seconds since epoch of the file's last mutation.
    pub fn last_modified(&self) -> Result<u64, Error> {
        let fs_handle = self.filesystem.lock()?;
        self.chain.last_modified(&fs_handle)
    }

    /// Writes are eager, so closing only releases the handle.
    pub fn close(self) -> Result<(), Error> {
        Ok(())
    }
}

impl Seek for FileStream {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(bytes) => bytes as i128,
            SeekFrom::End(bytes) => {
                let fs_handle = self.filesystem.lock().map_err(|_| Error::ThreadSync)?;
                let length = self.chain.length(&fs_handle)?;
                length as i128 + bytes as i128
            }
            SeekFrom::Current(bytes) => self.cursor.position() as i128 + bytes as i128,
        };
        if target < 0 || target > MAX_FILE_SIZE as i128 {
            return Err(Error::BadArgs.into());
        }
        self.cursor.set(target as u64);
        Ok(target as u64)
    }
}

impl Filesystem {
    /// Delete `name`: clear its control chain and data blobs, then
    /// tombstone the directory entry.
    pub fn remove(&mut self, name: &str) -> Result<(), Error> {
        let name_bytes = validate_name(name)?;
        let Some(entry) = self.find_entry(name_bytes)? else {
            return Err(Error::NotFound);
        };
        let chain = ControlChain::load(self, entry.control)?;
        chain.release(self)?;
        self.tombstone_entry(&entry)?;
        debug!("removed {name}");
        Ok(())
    }
}
