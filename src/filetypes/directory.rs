use std::collections::HashSet;

use log::debug;

use super::DirEntryRef;
use crate::filesystem::Filesystem;
use crate::structs::{BlockHandle, DirBlock, FileEntry, DIR_HEADS, MAX_PATH};
use crate::Error;

const FNV_INIT: u32 = 0x811c9dc5;
const FNV_32_PRIME: u32 = 0x01000193;

/// FNV-1a over 32 bits.
pub(crate) fn fnv32(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(FNV_INIT, |hash, &byte| (hash ^ byte as u32).wrapping_mul(FNV_32_PRIME))
}

/// Bucket head blob for `name`, in `1..=DIR_HEADS`.
pub(crate) fn bucket_id(name: &[u8]) -> u64 {
    (fnv32(name) as u64 % DIR_HEADS) + 1
}

/// Length and printable-ASCII constraints on a file name.
pub(crate) fn validate_name(name: &str) -> Result<&[u8], Error> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > MAX_PATH {
        return Err(Error::BadArgs);
    }
    if bytes.iter().any(|byte| !(0x20..=0x7e).contains(byte)) {
        return Err(Error::BadArgs);
    }
    Ok(bytes)
}

impl Filesystem {
    /// Scan the bucket chain of `name` for its entry.
    pub(crate) fn find_entry(&self, name: &[u8]) -> Result<Option<DirEntryRef>, Error> {
        let head = bucket_id(name);
        let mut block = BlockHandle::<DirBlock>::load(self.store(), head)?;
        let mut visited = HashSet::from([head]);
        loop {
            for slot in 0..block.record_count() {
                let entry = block.record(slot).ok_or(Error::Corrupt)?;
                if entry.matches(name) {
                    return Ok(Some(DirEntryRef {
                        dir_blob: block.id(),
                        slot,
                        control: entry.control_blob,
                    }));
                }
            }
            if !block.follow_next(self.store())? {
                return Ok(None);
            }
            if !visited.insert(block.id()) {
                return Err(Error::Corrupt);
            }
        }
    }

    /// Append an entry to the tail of the bucket chain, chaining a new
    /// directory block when the tail is full. The caller guarantees the
    /// name is not present.
    pub(crate) fn insert_entry(&mut self, name: &[u8], control: u64) -> Result<DirEntryRef, Error> {
        let head = bucket_id(name);
        let mut block = BlockHandle::<DirBlock>::load(self.store(), head)?;
        let mut visited = HashSet::from([head]);
        while block.follow_next(self.store())? {
            if !visited.insert(block.id()) {
                return Err(Error::Corrupt);
            }
        }
        let entry = FileEntry::new(name, control)?;
        match block.append_record(entry) {
            Ok(()) => {}
            Err(Error::BlockFull) => {
                let id = self.allocate_blob_id()?;
                debug!("bucket {head} full, chaining directory block {id}");
                let mut tail = BlockHandle::<DirBlock>::load(self.store(), id)?;
                tail.set_prev(block.id())?;
                block.set_next(id)?;
                tail.append_record(entry)?;
                block = tail;
            }
            Err(error) => return Err(error),
        }
        Ok(DirEntryRef {
            dir_blob: block.id(),
            slot: block.record_count() - 1,
            control,
        })
    }

    /// Zero the entry in place. The slot is never reused.
    pub(crate) fn tombstone_entry(&mut self, entry: &DirEntryRef) -> Result<(), Error> {
        let mut block = BlockHandle::<DirBlock>::load(self.store(), entry.dir_blob)?;
        block.set_record(entry.slot, FileEntry::tombstone())
    }
}

#[cfg(test)]
mod tests {
    use super::{bucket_id, fnv32, validate_name};
    use crate::filesystem::Filesystem;
    use crate::store::MemoryBlobStore;
    use crate::structs::{BlockHandle, DirBlock, DIR_ENTRY_CAPACITY, DIR_HEADS, MAX_PATH};
    use crate::Error;

    fn empty_fs() -> Filesystem {
        Filesystem::initialize(Box::new(MemoryBlobStore::new())).unwrap()
    }

    #[test]
    fn fnv32_vectors() {
        assert_eq!(fnv32(b""), 0x811c9dc5);
        assert_eq!(fnv32(b"a"), 0xe40c292c);
        assert_eq!(fnv32(b"foobar"), 0xbf9cf968);
    }

    #[test]
    fn buckets_stay_in_reserved_range() {
        for name in ["a", "b", "zzz", "some/longer/name.txt"] {
            let bucket = bucket_id(name.as_bytes());
            assert!(bucket >= 1);
            assert!(bucket <= DIR_HEADS);
        }
    }

    #[test]
    fn name_validation() {
        assert!(validate_name("readme.md").is_ok());
        assert!(validate_name("with space").is_ok());
        assert_eq!(validate_name("").unwrap_err(), Error::BadArgs);
        assert_eq!(validate_name("tab\there").unwrap_err(), Error::BadArgs);
        assert_eq!(validate_name("nul\0here").unwrap_err(), Error::BadArgs);
        let long = "x".repeat(MAX_PATH);
        assert!(validate_name(&long).is_ok());
        let too_long = "x".repeat(MAX_PATH + 1);
        assert_eq!(validate_name(&too_long).unwrap_err(), Error::BadArgs);
    }

    #[test]
    fn insert_then_find() {
        let mut fs = empty_fs();
        assert!(fs.find_entry(b"missing").unwrap().is_none());
        fs.insert_entry(b"alpha", 2000).unwrap();
        fs.insert_entry(b"beta", 2001).unwrap();
        let entry = fs.find_entry(b"alpha").unwrap().unwrap();
        assert_eq!(entry.control, 2000);
        assert_eq!(entry.dir_blob, bucket_id(b"alpha"));
        assert_eq!(fs.find_entry(b"beta").unwrap().unwrap().control, 2001);
        assert!(fs.find_entry(b"gamma").unwrap().is_none());
    }

    #[test]
    fn tombstoned_entries_disappear() {
        let mut fs = empty_fs();
        fs.insert_entry(b"doomed", 2000).unwrap();
        let entry = fs.find_entry(b"doomed").unwrap().unwrap();
        fs.tombstone_entry(&entry).unwrap();
        assert!(fs.find_entry(b"doomed").unwrap().is_none());
    }

    /// Names hashing into the bucket of `seed`, for chaining tests.
    fn colliding_names(seed: &str, count: usize) -> Vec<String> {
        let bucket = bucket_id(seed.as_bytes());
        let mut names = Vec::with_capacity(count);
        let mut attempt = 0u64;
        while names.len() < count {
            let candidate = format!("{seed}-{attempt}");
            if bucket_id(candidate.as_bytes()) == bucket {
                names.push(candidate);
            }
            attempt += 1;
        }
        names
    }

    #[test]
    fn overflow_chains_a_second_block() {
        let mut fs = empty_fs();
        let names = colliding_names("crowd", DIR_ENTRY_CAPACITY + 3);
        let bucket = bucket_id(names[0].as_bytes());
        for (index, name) in names.iter().enumerate() {
            fs.insert_entry(name.as_bytes(), 5000 + index as u64).unwrap();
        }
        let head = BlockHandle::<DirBlock>::load(fs.store(), bucket).unwrap();
        assert_eq!(head.record_count(), DIR_ENTRY_CAPACITY);
        let overflow = head.header().next;
        assert_ne!(overflow, 0);
        let tail = BlockHandle::<DirBlock>::load(fs.store(), overflow).unwrap();
        assert_eq!(tail.header().prev, bucket);
        assert_eq!(tail.record_count(), 3);
        for (index, name) in names.iter().enumerate() {
            let entry = fs.find_entry(name.as_bytes()).unwrap().unwrap();
            assert_eq!(entry.control, 5000 + index as u64);
        }
    }

    #[test]
    fn cyclic_chain_is_rejected() {
        let mut fs = empty_fs();
        fs.insert_entry(b"loop", 2000).unwrap();
        let bucket = bucket_id(b"loop");
        let mut head = BlockHandle::<DirBlock>::load(fs.store(), bucket).unwrap();
        head.set_next(bucket).unwrap();
        // a missing name in the same bucket walks the whole chain
        let probe = colliding_names("loop", 1).remove(0);
        assert_eq!(fs.find_entry(probe.as_bytes()).unwrap_err(), Error::Corrupt);
    }
}
