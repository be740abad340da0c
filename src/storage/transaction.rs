//! A single writer's view onto a `Database`: a read/write cache laid over
//! the physical backend, backed by an exclusive lock so at most one
//! transaction is ever mutating a database at a time.

use super::backend::RawOp;
use super::database::DatabaseInner;
use crate::error::StorageError;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    Active,
    Committed,
    Aborted,
}

/// An open transaction against a [`Database`](super::database::Database).
///
/// Reads first check the local cache, then fall through to the backend;
/// writes land in the cache and a pending raw-op batch, and only reach the
/// backend on `commit`/`update`. The write lock is acquired lazily, on the
/// first read or write, and released by `commit` or `abort` — whichever
/// comes first. Dropping a transaction that was never explicitly resolved
/// aborts it, so a lock is never leaked by a `?`-propagated early return.
pub struct Transaction {
    pub(crate) db: Arc<DatabaseInner>,
    state: TxState,
    cache: HashMap<Vec<u8>, Vec<u8>>,
    tombstones: HashSet<Vec<u8>>,
    batch: Vec<RawOp>,
    lock_acquired: bool,
}

impl Transaction {
    pub(crate) fn begin(db: Arc<DatabaseInner>) -> Self {
        Transaction {
            db,
            state: TxState::Active,
            cache: HashMap::new(),
            tombstones: HashSet::new(),
            batch: Vec::new(),
            lock_acquired: false,
        }
    }

    pub(crate) fn ensure_same_database(&self, other: &Arc<DatabaseInner>) -> Result<(), StorageError> {
        if Arc::ptr_eq(&self.db, other) {
            Ok(())
        } else {
            Err(StorageError::TransactionWrongDatabaseError)
        }
    }

    fn ensure_active(&self) -> Result<(), StorageError> {
        match self.state {
            TxState::Active => Ok(()),
            TxState::Committed => Err(StorageError::TransactionCommittingError),
            TxState::Aborted => Err(StorageError::TransactionAbortedError),
        }
    }

    fn acquire_lock(&mut self) {
        if !self.lock_acquired {
            self.db.write_lock.acquire();
            self.lock_acquired = true;
        }
    }

    fn release_lock(&mut self) {
        if self.lock_acquired {
            self.db.write_lock.release();
            self.lock_acquired = false;
        }
    }

    pub(crate) fn get_raw(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        self.ensure_active()?;
        self.acquire_lock();
        if self.tombstones.contains(key) {
            return Ok(None);
        }
        if let Some(value) = self.cache.get(key) {
            return Ok(Some(value.clone()));
        }
        let from_backend = self.db.backend.get(key)?;
        if let Some(ref value) = from_backend {
            self.cache.insert(key.to_vec(), value.clone());
        }
        Ok(from_backend)
    }

    pub(crate) fn put_raw(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StorageError> {
        self.ensure_active()?;
        self.acquire_lock();
        self.tombstones.remove(&key);
        self.cache.insert(key.clone(), value.clone());
        self.batch.push(RawOp::Put(key, value));
        Ok(())
    }

    pub(crate) fn del_raw(&mut self, key: Vec<u8>) -> Result<(), StorageError> {
        self.ensure_active()?;
        self.acquire_lock();
        self.cache.remove(&key);
        self.tombstones.insert(key.clone());
        self.batch.push(RawOp::Del(key));
        Ok(())
    }

    /// Overlay the transaction's uncommitted cache on top of a
    /// backend-ordered range. `backend_pairs` must already be sorted by key
    /// and restricted to the range the caller cares about; this merges in
    /// same-range cache writes and suppresses tombstoned keys without
    /// materializing anything outside that range.
    pub(crate) fn overlay_range(
        &self,
        backend_pairs: Vec<(Vec<u8>, Vec<u8>)>,
        in_range: impl Fn(&[u8]) -> bool,
    ) -> Vec<(Vec<u8>, Vec<u8>)> {
        use std::collections::BTreeMap;
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = backend_pairs.into_iter().collect();
        for key in &self.tombstones {
            if in_range(key) {
                merged.remove(key);
            }
        }
        for (key, value) in &self.cache {
            if in_range(key) && !self.tombstones.contains(key) {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged.into_iter().collect()
    }

    /// Commit the pending batch and release the write lock. Idempotent if
    /// already committed or aborted.
    pub fn commit(&mut self) -> Result<(), StorageError> {
        match self.state {
            TxState::Committed => return Ok(()),
            TxState::Aborted => {
                self.release_lock();
                return Ok(());
            }
            TxState::Active => {}
        }
        let result = self.db.backend.apply(&self.batch);
        self.release_lock();
        match result {
            Ok(()) => {
                self.state = TxState::Committed;
                Ok(())
            }
            Err(e) => {
                self.cache.clear();
                self.tombstones.clear();
                self.batch.clear();
                self.state = TxState::Aborted;
                Err(e)
            }
        }
    }

    /// Commit the pending batch without releasing the write lock, so the
    /// caller can persist intermediate progress while retaining exclusive
    /// access for further writes.
    pub fn update(&mut self) -> Result<(), StorageError> {
        self.ensure_active()?;
        self.db.backend.apply(&self.batch)?;
        self.batch.clear();
        Ok(())
    }

    /// Discard every pending write and release the lock. Safe to call more
    /// than once.
    pub fn abort(&mut self) {
        if self.state == TxState::Aborted {
            return;
        }
        self.state = TxState::Aborted;
        self.cache.clear();
        self.tombstones.clear();
        self.batch.clear();
        self.release_lock();
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.lock_acquired {
            self.release_lock();
        }
    }
}
