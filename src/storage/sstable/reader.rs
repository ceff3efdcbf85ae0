//! SSTable Reader
//!
//! Opens SSTable files and provides O(log n) key lookups and range reads via
//! an in-memory index.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::ops::Bound;
use std::path::{Path, PathBuf};

use crate::error::{Result, ZsetError};
use crate::store::bounds_are_empty;

use super::iterator::SSTableIterator;
use super::{read_u32, read_u64, FOOTER_SIZE, HEADER_SIZE, MAGIC, TOMBSTONE_MARKER, VERSION};

/// Reader for SSTable files with in-memory index for O(log n) lookups
pub struct SSTableReader {
    path: PathBuf,
    /// File handle for reading entries
    pub(super) file: BufReader<File>,
    /// In-memory index: key → file offset
    index: BTreeMap<Vec<u8>, u64>,
    entry_count: u64,
    /// Index block starting offset (end of the data block)
    pub(super) index_offset: u64,
}

impl SSTableReader {
    /// Open an SSTable for reading
    ///
    /// Validates header, footer and the data-block checksum, then loads the
    /// entire index into memory.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();
        if file_size < HEADER_SIZE + FOOTER_SIZE {
            return Err(ZsetError::Storage(format!(
                "SSTable {} too small: {} bytes",
                path.display(),
                file_size
            )));
        }

        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;

        if &header[0..4] != MAGIC {
            return Err(ZsetError::Storage(format!(
                "Invalid SSTable magic: expected ZSKV, got {:?}",
                &header[0..4]
            )));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(ZsetError::Storage(format!(
                "Unsupported SSTable version: {}",
                version
            )));
        }

        let entry_count = read_u64(&header, 6)?;

        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut footer = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer)?;

        let index_offset = read_u64(&footer, 0)?;
        let data_crc = read_u32(&footer, 8)?;
        if index_offset < HEADER_SIZE || index_offset > file_size - FOOTER_SIZE {
            return Err(ZsetError::Storage(format!(
                "SSTable {} has invalid index offset {}",
                path.display(),
                index_offset
            )));
        }

        // Data block checksum
        file.seek(SeekFrom::Start(HEADER_SIZE))?;
        let mut data = vec![0u8; (index_offset - HEADER_SIZE) as usize];
        file.read_exact(&mut data)?;
        if crc32fast::hash(&data) != data_crc {
            return Err(ZsetError::Storage(format!(
                "SSTable {} failed checksum validation",
                path.display()
            )));
        }

        // Index block: [key_len(4)][offset(8)][key]
        let mut index_data = vec![0u8; (file_size - FOOTER_SIZE - index_offset) as usize];
        file.read_exact(&mut index_data)?;

        let mut index = BTreeMap::new();
        let mut pos = 0;
        while pos < index_data.len() {
            let key_len = read_u32(&index_data, pos)? as usize;
            let offset = read_u64(&index_data, pos + 4)?;
            pos += 12;
            let key = index_data
                .get(pos..pos + key_len)
                .ok_or_else(|| ZsetError::Storage("SSTable index truncated".to_string()))?
                .to_vec();
            pos += key_len;
            index.insert(key, offset);
        }

        if index.len() as u64 != entry_count {
            return Err(ZsetError::Storage(format!(
                "SSTable {} index holds {} keys, header says {}",
                path.display(),
                index.len(),
                entry_count
            )));
        }

        file.seek(SeekFrom::Start(0))?;

        Ok(Self {
            path: path.to_path_buf(),
            file: BufReader::new(file),
            index,
            entry_count,
            index_offset,
        })
    }

    /// Get a value by key: O(log n) lookup via in-memory index
    ///
    /// Returns:
    /// - `Ok(Some(Some(value)))`: key found with value
    /// - `Ok(Some(None))`: key found but is a tombstone (deleted)
    /// - `Ok(None)`: key not in this SSTable
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Option<Vec<u8>>>> {
        let offset = match self.index.get(key) {
            Some(&off) => off,
            None => return Ok(None),
        };
        let (_, value) = self.read_entry_at(offset)?;
        Ok(Some(value))
    }

    /// Entries within the given key bounds, ascending (tombstones as `None`)
    pub fn range(
        &mut self,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
    ) -> Result<Vec<(Vec<u8>, Option<Vec<u8>>)>> {
        if bounds_are_empty(lower, upper) {
            return Ok(Vec::new());
        }
        let offsets: Vec<u64> = self
            .index
            .range::<[u8], _>((lower, upper))
            .map(|(_, &off)| off)
            .collect();

        offsets
            .into_iter()
            .map(|off| self.read_entry_at(off))
            .collect()
    }

    fn read_entry_at(&mut self, offset: u64) -> Result<(Vec<u8>, Option<Vec<u8>>)> {
        self.file.seek(SeekFrom::Start(offset))?;

        let mut header = [0u8; 8];
        self.file.read_exact(&mut header)?;
        let key_len = read_u32(&header, 0)? as usize;
        let val_len = read_u32(&header, 4)?;

        let mut key = vec![0u8; key_len];
        self.file.read_exact(&mut key)?;

        if val_len == TOMBSTONE_MARKER {
            return Ok((key, None));
        }

        let mut value = vec![0u8; val_len as usize];
        self.file.read_exact(&mut value)?;
        Ok((key, Some(value)))
    }

    /// Get entry count
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the minimum key in this SSTable (for range filtering)
    pub fn min_key(&self) -> Option<&[u8]> {
        self.index.keys().next().map(|k| k.as_slice())
    }

    /// Get the maximum key in this SSTable (for range filtering)
    pub fn max_key(&self) -> Option<&[u8]> {
        self.index.keys().next_back().map(|k| k.as_slice())
    }

    /// Quick check if a key might be in this SSTable (range check)
    /// Returns false only if the key is definitely outside [min_key, max_key]
    pub fn might_contain(&self, key: &[u8]) -> bool {
        match (self.min_key(), self.max_key()) {
            (Some(min), Some(max)) => key >= min && key <= max,
            _ => false,
        }
    }

    /// Create an iterator over all entries (for compaction, debugging)
    pub fn iter(&mut self) -> Result<SSTableIterator<'_>> {
        SSTableIterator::new(&mut self.file, self.index_offset)
    }
}
