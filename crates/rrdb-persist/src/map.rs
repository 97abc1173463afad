//! `Map` memory mode: a memory-mapped backing file. Unlike `Save`, the file
//! is kept open and mapped for the dimension's lifetime; `sync()` re-encodes
//! the current header and values into the mapping and asks the kernel to
//! flush it, rather than mapping the live ring storage directly (rrdb's
//! `Ring` is a `Box<[AtomicI32]>`, not file-backed memory, so the bridge is
//! an explicit copy-and-flush rather than true shared memory).

use crate::error::PersistError;
use crate::framing::{checksum_for, decode, encode};
use crate::header::{align_entries_to_pagesize, DimensionFileHeader, DIMENSION_MAGIC};
use memmap2::MmapMut;
use std::fs::OpenOptions;
use std::path::Path;

fn io_err(path: &Path, source: std::io::Error) -> PersistError {
    PersistError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn map_err(path: &Path, source: std::io::Error) -> PersistError {
    PersistError::MapFailed {
        path: path.display().to_string(),
        source,
    }
}

pub struct MappedDimension {
    mmap: MmapMut,
}

impl MappedDimension {
    /// Creates a new backing file sized to hold `header` plus `entries`
    /// values, page-aligned, and maps it.
    pub fn create(path: &Path, mut header: DimensionFileHeader) -> Result<Self, PersistError> {
        let initial_values = vec![0i32; header.entries];
        header.checksum = checksum_for(&initial_values);
        let bytes = encode(&header, &initial_values)?;
        let aligned_len = align_entries_to_pagesize(header.entries, bytes.len() - header.entries * 4);
        let padded_len = bytes.len() + (aligned_len - header.entries) * 4;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| io_err(path, e))?;
        file.set_len(padded_len as u64).map_err(|e| io_err(path, e))?;
        let mut mmap = unsafe { MmapMut::map_mut(&file).map_err(|e| map_err(path, e))? };
        mmap[..bytes.len()].copy_from_slice(&bytes);
        Ok(Self { mmap })
    }

    /// Opens an existing mapped file, verifying magic and checksum.
    pub fn open(path: &Path) -> Result<(Self, DimensionFileHeader, Vec<i32>), PersistError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| io_err(path, e))?;
        let mmap = unsafe { MmapMut::map_mut(&file).map_err(|e| map_err(path, e))? };
        let path_str = path.display().to_string();
        let (header, values): (DimensionFileHeader, Vec<i32>) = decode(&path_str, &mmap)?;

        if header.magic != DIMENSION_MAGIC {
            return Err(PersistError::MagicMismatch {
                path: path_str,
                expected: DIMENSION_MAGIC,
                found: header.magic.clone(),
            });
        }
        let truncated_values = values[..header.entries.min(values.len())].to_vec();
        let computed = checksum_for(&truncated_values);
        if computed != header.checksum {
            return Err(PersistError::ChecksumMismatch {
                path: path_str,
                expected: header.checksum,
                computed,
            });
        }
        Ok((Self { mmap }, header, truncated_values))
    }

    /// Re-encodes `header`/`values` into the mapping and requests the kernel
    /// flush the dirty pages. `header.checksum` is recomputed here.
    pub fn sync(&mut self, path: &Path, mut header: DimensionFileHeader, values: &[i32]) -> Result<(), PersistError> {
        header.checksum = checksum_for(values);
        let bytes = encode(&header, values)?;
        if bytes.len() > self.mmap.len() {
            return Err(PersistError::SizeMismatch {
                path: path.display().to_string(),
            });
        }
        self.mmap[..bytes.len()].copy_from_slice(&bytes);
        self.mmap.flush().map_err(|e| io_err(path, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn header(entries: usize) -> DimensionFileHeader {
        DimensionFileHeader::new("received".to_string(), "received".to_string(), 1, 1, 1, entries, 0, 0, 0)
    }

    #[test]
    fn create_then_reopen_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("received.db");
        {
            let mut mapped = MappedDimension::create(&path, header(5)).unwrap();
            mapped.sync(&path, header(5), &[1, 2, 3, 4, 5]).unwrap();
        }
        let (_mapped, loaded_header, values) = MappedDimension::open(&path).unwrap();
        assert_eq!(loaded_header.entries, 5);
        assert_eq!(values, vec![1, 2, 3, 4, 5]);
    }
}
