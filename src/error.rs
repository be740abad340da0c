//! Error surface for the storage engine and the Merkle tree built on top of
//! it. Each concern gets its own enum rather than one crate-wide grab bag,
//! mirroring how the error categories are described in isolation in the
//! design notes (storage errors are not tree errors are not encoding
//! errors).

use std::io;
use thiserror::Error;

/// Errors raised by the encoding layer (`crate::encoding`).
#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("value does not decode to the expected type")]
    InvalidEncoding,

    #[error("prefix must serialize to exactly {expected} bytes, got {actual}")]
    PrefixSizeError { expected: usize, actual: usize },

    #[error("invalid utf-8 in encoded string")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Errors raised by the storage engine (`crate::storage`).
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("i/o error opening database: {0}")]
    DatabaseIsOpenError(String),

    #[error("database is locked by another process")]
    DatabaseIsLockedError,

    #[error("database appears to be corrupt: {0}")]
    DatabaseIsCorruptError(String),

    #[error("database version mismatch: current {current}, expected {expected}")]
    DatabaseVersionError { current: u32, expected: u32 },

    #[error("database is closed")]
    DatabaseIsClosed,

    #[error("a store named {0:?} is already registered")]
    DuplicateStoreName(String),

    #[error("key already exists")]
    DuplicateKeyError,

    #[error("transaction belongs to a different database")]
    TransactionWrongDatabaseError,

    #[error("transaction is being committed")]
    TransactionCommittingError,

    #[error("transaction has already been aborted")]
    TransactionAbortedError,

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("underlying store error: {0}")]
    Backend(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Errors raised by the Merkle tree itself (`crate::merkle_tree`).
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("no leaf found at index {0}")]
    NoLeafFound(u32),

    #[error("no node found at index {0}")]
    NoNodeFound(u32),

    #[error("unable to get past size {past_size} for tree with {node_count} nodes")]
    UnableToGetPastSize { past_size: u32, node_count: u32 },

    #[error("tree is full: cannot exceed depth {0}")]
    TreeFull(u32),

    #[error("database is in an unexpected state: {0}")]
    UnexpectedDatabaseState(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
