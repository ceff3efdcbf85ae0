//! SSTable Builder
//!
//! Writes sorted key-value entries to a new SSTable file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, ZsetError};

use super::{SSTable, HEADER_SIZE, MAGIC, TOMBSTONE_MARKER, VERSION};

/// Builder for creating new SSTables from sorted entries
///
/// Entries are staged in memory and the whole file (header, data, index,
/// footer) is written by `finish()`, so a failed build never leaves a
/// half-written table that looks valid.
pub struct SSTableBuilder {
    /// Output file path
    path: PathBuf,
    /// Opened up front so permission problems surface early
    file: File,
    /// Encoded data block
    data: Vec<u8>,
    /// Index: key → file offset of entry
    index: Vec<(Vec<u8>, u64)>,
    /// Running CRC hasher for data section
    data_hasher: crc32fast::Hasher,
}

impl SSTableBuilder {
    /// Create a new SSTable builder
    pub fn new(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            data: Vec::new(),
            index: Vec::new(),
            data_hasher: crc32fast::Hasher::new(),
        })
    }

    /// Add a key-value pair (must be called in strictly ascending key order)
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.push_entry(key, Some(value))
    }

    /// Add a tombstone (must be called in strictly ascending key order)
    pub fn add_tombstone(&mut self, key: &[u8]) -> Result<()> {
        self.push_entry(key, None)
    }

    /// Number of entries staged so far
    pub fn entry_count(&self) -> u64 {
        self.index.len() as u64
    }

    fn push_entry(&mut self, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        if let Some((last, _)) = self.index.last() {
            if key <= last.as_slice() {
                return Err(ZsetError::Storage(
                    "SSTable keys must be added in strictly ascending order".to_string(),
                ));
            }
        }

        let offset = HEADER_SIZE + self.data.len() as u64;
        let start = self.data.len();

        // [key_len(4)][val_len(4)][key][value]
        let val_len = value.map_or(TOMBSTONE_MARKER, |v| v.len() as u32);
        self.data.extend_from_slice(&(key.len() as u32).to_le_bytes());
        self.data.extend_from_slice(&val_len.to_le_bytes());
        self.data.extend_from_slice(key);
        if let Some(v) = value {
            self.data.extend_from_slice(v);
        }

        self.data_hasher.update(&self.data[start..]);
        self.index.push((key.to_vec(), offset));
        Ok(())
    }

    /// Finish building: write every section, fsync, and return metadata
    pub fn finish(self) -> Result<SSTable> {
        let entry_count = self.index.len() as u64;
        let index_offset = HEADER_SIZE + self.data.len() as u64;
        let data_crc = self.data_hasher.finalize();

        let mut writer = BufWriter::new(self.file);

        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&entry_count.to_le_bytes())?;

        writer.write_all(&self.data)?;

        // Index block: [key_len(4)][offset(8)][key] for each entry
        for (key, offset) in &self.index {
            writer.write_all(&(key.len() as u32).to_le_bytes())?;
            writer.write_all(&offset.to_le_bytes())?;
            writer.write_all(key)?;
        }

        // Footer: index_offset (8) + data_crc (4) + padding (4)
        writer.write_all(&index_offset.to_le_bytes())?;
        writer.write_all(&data_crc.to_le_bytes())?;
        writer.write_all(&[0u8; 4])?;

        let file = writer
            .into_inner()
            .map_err(|e| ZsetError::Storage(format!("Failed to flush SSTable: {}", e)))?;
        file.sync_all()?;
        let file_size = file.metadata()?.len();

        let min_key = self.index.first().map(|(k, _)| k.clone()).unwrap_or_default();
        let max_key = self.index.last().map(|(k, _)| k.clone()).unwrap_or_default();

        Ok(SSTable {
            path: self.path,
            entry_count,
            min_key,
            max_key,
            file_size,
        })
    }
}
