//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries. One entry carries a
//! whole write batch, so replay applies a batch completely or not at all.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ZsetError};

/// Record header: LSN (8) + CRC (4) + payload length (4)
pub const HEADER_SIZE: usize = 16;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The batch of operations, applied atomically on replay
    pub operations: Vec<Operation>,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged (and staged in a write batch)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },
}

impl Operation {
    /// The key this operation touches
    pub fn key(&self) -> &[u8] {
        match self {
            Operation::Put { key, .. } | Operation::Delete { key } => key,
        }
    }
}

impl WalEntry {
    /// Create an entry stamped with the current wall-clock time
    pub fn new(lsn: u64, operations: Vec<Operation>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            lsn,
            operations,
            timestamp,
        }
    }

    /// Serialize into the on-disk record format
    ///
    /// `[LSN u64 BE][CRC u32 BE][LEN u32 BE][bincode payload]`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)?;
        let crc = Self::checksum(self.lsn, &payload);

        let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
        buf.extend_from_slice(&self.lsn.to_be_bytes());
        buf.extend_from_slice(&crc.to_be_bytes());
        buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Deserialize a record, verifying its checksum
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let header = parse_header(bytes)?;

        let end = HEADER_SIZE + header.len as usize;
        if bytes.len() < end {
            return Err(ZsetError::WalCorruption(format!(
                "truncated entry: need {} bytes, have {}",
                end,
                bytes.len()
            )));
        }

        Self::decode_payload(&header, &bytes[HEADER_SIZE..end])
    }

    /// Verify and decode a payload whose header was already parsed
    pub(crate) fn decode_payload(header: &RecordHeader, payload: &[u8]) -> Result<Self> {
        let actual = Self::checksum(header.lsn, payload);
        if actual != header.crc {
            return Err(ZsetError::WalCorruption(format!(
                "CRC mismatch at lsn {}: expected {:#010x}, got {:#010x}",
                header.lsn, header.crc, actual
            )));
        }

        let entry: WalEntry = bincode::deserialize(payload)
            .map_err(|e| ZsetError::WalCorruption(format!("undecodable payload: {}", e)))?;

        if entry.lsn != header.lsn {
            return Err(ZsetError::WalCorruption(format!(
                "LSN mismatch: header {}, payload {}",
                header.lsn, entry.lsn
            )));
        }

        Ok(entry)
    }

    /// Size of the serialized record in bytes
    pub fn serialized_size(&self) -> Result<usize> {
        Ok(HEADER_SIZE + bincode::serialized_size(self)? as usize)
    }

    /// CRC over the LSN and the encoded payload
    pub fn compute_crc(&self) -> Result<u32> {
        let payload = bincode::serialize(self)?;
        Ok(Self::checksum(self.lsn, &payload))
    }

    fn checksum(lsn: u64, payload: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&lsn.to_be_bytes());
        hasher.update(payload);
        hasher.finalize()
    }
}

/// Fixed-size prefix of every WAL record
#[derive(Debug, Clone, Copy)]
pub(crate) struct RecordHeader {
    pub lsn: u64,
    pub crc: u32,
    pub len: u32,
}

pub(crate) fn parse_header(bytes: &[u8]) -> Result<RecordHeader> {
    if bytes.len() < HEADER_SIZE {
        return Err(ZsetError::WalCorruption(format!(
            "header too small: {} bytes",
            bytes.len()
        )));
    }

    let mut lsn = [0u8; 8];
    lsn.copy_from_slice(&bytes[0..8]);
    let mut crc = [0u8; 4];
    crc.copy_from_slice(&bytes[8..12]);
    let mut len = [0u8; 4];
    len.copy_from_slice(&bytes[12..16]);

    Ok(RecordHeader {
        lsn: u64::from_be_bytes(lsn),
        crc: u32::from_be_bytes(crc),
        len: u32::from_be_bytes(len),
    })
}
