//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{Result, ZsetError};

use super::entry::{parse_header, HEADER_SIZE};
use super::WalEntry;

/// Upper bound on a single record payload (guards against garbage lengths)
const MAX_RECORD_SIZE: u32 = 256 * 1024 * 1024;

/// Reads entries from the WAL file
pub struct WalReader {
    reader: BufReader<File>,
    /// Byte offset just past the last successfully read entry
    position: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
        })
    }

    /// Read the next entry from the WAL
    ///
    /// Returns `Ok(None)` at a clean end of file. A record cut short by a
    /// crash surfaces as `WalCorruption`.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        let mut header_buf = [0u8; HEADER_SIZE];
        let read = read_full(&mut self.reader, &mut header_buf)?;
        if read == 0 {
            return Ok(None);
        }
        if read < HEADER_SIZE {
            return Err(ZsetError::WalCorruption(format!(
                "partial header at offset {}",
                self.position
            )));
        }

        let header = parse_header(&header_buf)?;
        if header.len > MAX_RECORD_SIZE {
            return Err(ZsetError::WalCorruption(format!(
                "record length {} at offset {} exceeds limit",
                header.len, self.position
            )));
        }

        let mut payload = vec![0u8; header.len as usize];
        let read = read_full(&mut self.reader, &mut payload)?;
        if read < payload.len() {
            return Err(ZsetError::WalCorruption(format!(
                "partial payload at offset {}",
                self.position
            )));
        }

        let entry = WalEntry::decode_payload(&header, &payload)?;
        self.position += (HEADER_SIZE + payload.len()) as u64;
        Ok(Some(entry))
    }

    /// Offset just past the last entry returned by `next_entry`
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Iterate over all valid entries
    ///
    /// Iteration ends after the first error is yielded.
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }
}

/// Iterator over WAL entries
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Read until `buf` is full or EOF; returns the number of bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
