//! Error types for zsetkv
//!
//! Provides a unified error type for all operations, plus a coarse
//! [`ErrorKind`] classification for callers that only care about the
//! category of failure (absent data, bad input, or a storage failure).

use thiserror::Error;

/// Result type alias using ZsetError
pub type Result<T> = std::result::Result<T, ZsetError>;

/// Unified error type for zsetkv operations
#[derive(Debug, Error)]
pub enum ZsetError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    /// Stored bytes could not be decoded (bad score, metadata or key layout)
    #[error("Data corruption: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Sorted Set Errors
    // -------------------------------------------------------------------------
    #[error("Not found")]
    NotFound,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Coarse error category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Member or collection absent on a point query
    NotFound,

    /// The caller supplied a value the engine refuses (NaN score, bad flags, ...)
    InvalidArgument,

    /// The underlying store failed or returned undecodable data
    StoreFailure,
}

impl ZsetError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ZsetError::NotFound => ErrorKind::NotFound,
            ZsetError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ZsetError::Io(_)
            | ZsetError::WalCorruption(_)
            | ZsetError::Storage(_)
            | ZsetError::Corruption(_)
            | ZsetError::Serialization(_)
            | ZsetError::Config(_) => ErrorKind::StoreFailure,
        }
    }

    /// Shorthand for building an `InvalidArgument` error
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ZsetError::InvalidArgument(msg.into())
    }

    /// Shorthand for building a `Corruption` error
    pub(crate) fn corruption(msg: impl Into<String>) -> Self {
        ZsetError::Corruption(msg.into())
    }
}

impl From<bincode::Error> for ZsetError {
    fn from(e: bincode::Error) -> Self {
        ZsetError::Serialization(e.to_string())
    }
}
