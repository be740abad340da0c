//! The seam between the generic storage engine and a concrete embedded
//! key/value store. Everything above this trait (`Store`, `Batch`,
//! `Transaction`, `Database`) works purely in terms of raw byte keys and
//! values; everything below it is sled- or rocksdb-specific.

use crate::encoding::KeyRange;
use crate::error::StorageError;

/// A single queued mutation against the physical backend.
#[derive(Debug, Clone)]
pub enum RawOp {
    Put(Vec<u8>, Vec<u8>),
    Del(Vec<u8>),
}

/// An already-open embedded key/value store. Implementations own whatever
/// handle their underlying library hands back from its `open` call; this
/// trait only has to express point reads, atomic batch application, and
/// ordered range scans.
pub trait PhysicalBackend: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Apply every op in `ops` atomically: either all of them land or none
    /// do.
    fn apply(&self, ops: &[RawOp]) -> Result<(), StorageError>;

    /// Return every key/value pair whose key falls in `range`, sorted by
    /// key ascending (or descending if `reverse`).
    fn range(&self, range: &KeyRange, reverse: bool) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError>;

    fn flush(&self) -> Result<(), StorageError>;

    fn size_on_disk(&self) -> Result<u64, StorageError>;

    /// Best-effort compaction hint. Backends without an explicit compaction
    /// API may no-op.
    fn compact(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
