use std::fmt::Debug;

use bytemuck::Zeroable;

use super::*;
use crate::Error;

impl FileEntry {
    pub(crate) fn new(name: &[u8], control_blob: u64) -> Result<Self, Error> {
        if name.is_empty() || name.len() > MAX_PATH {
            return Err(Error::BadArgs);
        }
        let mut entry = Self::zeroed();
        entry.name[..name.len()].copy_from_slice(name);
        entry.control_blob = control_blob;
        Ok(entry)
    }

    /// All-zero slot left behind by a removed file.
    pub(crate) fn tombstone() -> Self {
        Self::zeroed()
    }

    pub(crate) fn is_tombstone(&self) -> bool {
        self.name[0] == 0
    }

    /// Name bytes up to the first NUL; a full-width name has none.
    pub(crate) fn name_bytes(&self) -> &[u8] {
        let end = self.name.iter().position(|&byte| byte == 0).unwrap_or(MAX_PATH);
        &self.name[..end]
    }

    /// Bytewise comparison up to the first NUL. Tombstones match nothing.
    pub(crate) fn matches(&self, name: &[u8]) -> bool {
        !self.is_tombstone() && self.name_bytes() == name
    }
}

impl Debug for FileEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileEntry")
            .field("name", &String::from_utf8_lossy(self.name_bytes()))
            .field("control_blob", &self.control_blob)
            .finish()
    }
}
