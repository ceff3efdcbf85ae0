//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only logging.
//!
//! ## Responsibilities
//! - Append one log record per write batch before it is applied
//! - CRC32 checksums for corruption detection
//! - Log Sequence Numbers (LSN) for ordering
//! - Crash recovery and replay (whole batches only)
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Entry 1                                      │
//! │ ┌─────────┬─────────┬─────────┬────────────┐ │
//! │ │ LSN (8) │ CRC (4) │ Len (4) │ Batch data │ │
//! │ └─────────┴─────────┴─────────┴────────────┘ │
//! ├──────────────────────────────────────────────┤
//! │ Entry 2                                      │
//! │ ┌─────────┬─────────┬─────────┬────────────┐ │
//! │ │ LSN (8) │ CRC (4) │ Len (4) │ Batch data │ │
//! │ └─────────┴─────────┴─────────┴────────────┘ │
//! └──────────────────────────────────────────────┘
//! ```

mod entry;
mod reader;
mod recovery;
mod writer;

pub use entry::{Operation, WalEntry, HEADER_SIZE};
pub use reader::{WalIterator, WalReader};
pub use recovery::{RecoveryResult, WalRecovery};
pub use writer::WalWriter;
