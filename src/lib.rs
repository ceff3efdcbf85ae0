//! # zsetkv
//!
//! Persistent sorted sets on an ordered key-value store:
//! - Unique members ordered by `(score, member)`
//! - Rank, score-range and lexicographic-range queries
//! - One atomic batch per mutation, version-tagged keys for O(1) deletes
//! - A WAL + MemTable + SSTable engine with crash recovery underneath
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         ZSet<S>                              │
//! │        (mutations, queries, metadata, key encoding)          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  get / write(batch) / scan
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     Store trait                              │
//! │              MemoryStore  |  Engine                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ (Engine)
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     WAL     │          │  MemTable   │
//!   │  (Append)   │          │  (RwLock)   │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │   Storage   │
//!                           │  (SSTable)  │
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod memtable;
pub mod storage;
pub mod store;
pub mod engine;
pub mod zset;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ErrorKind, Result, ZsetError};
pub use config::{Config, WalSyncStrategy};
pub use engine::Engine;
pub use store::{Direction, MemoryStore, Store, WriteBatch};
pub use zset::{AddFlags, LexBound, LexRange, MemberScore, ScoreRange, ZSet};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of zsetkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
