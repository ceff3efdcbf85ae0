//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::Result;

use super::{Operation, WalEntry, WalRecovery};

/// Writes entries to the WAL file
pub struct WalWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    /// LSN the next append will receive
    current_lsn: u64,
    sync_strategy: WalSyncStrategy,
    /// Appends since the last fsync
    unsynced: usize,
}

impl WalWriter {
    /// Open or create a WAL file
    ///
    /// An existing file is scanned so LSNs keep increasing across restarts.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let next_lsn = if path.exists() {
            WalRecovery::verify(path)?.last_lsn + 1
        } else {
            1
        };

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            current_lsn: next_lsn,
            sync_strategy,
            unsynced: 0,
        })
    }

    /// Append a batch of operations as one record; returns its LSN
    pub fn append_batch(&mut self, operations: Vec<Operation>) -> Result<u64> {
        let lsn = self.current_lsn;
        let entry = WalEntry::new(lsn, operations);
        let bytes = entry.serialize()?;

        self.writer.write_all(&bytes)?;
        self.current_lsn += 1;
        self.unsynced += 1;

        match self.sync_strategy {
            WalSyncStrategy::EveryWrite => self.sync()?,
            WalSyncStrategy::EveryNEntries { count } => {
                if self.unsynced >= count {
                    self.sync()?;
                } else {
                    self.writer.flush()?;
                }
            }
        }

        Ok(lsn)
    }

    /// Append a single operation
    pub fn append(&mut self, operation: Operation) -> Result<u64> {
        self.append_batch(vec![operation])
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Discard every entry (called once their effects are durable elsewhere)
    ///
    /// LSNs keep counting up from where they were.
    pub fn truncate(&mut self) -> Result<()> {
        self.writer.flush()?;
        let file = self.writer.get_ref();
        file.set_len(0)?;
        file.sync_all()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Get the LSN the next append will receive
    pub fn current_lsn(&self) -> u64 {
        self.current_lsn
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }
}
