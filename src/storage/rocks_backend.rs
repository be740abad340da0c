//! Optional physical backend built on `rocksdb`, kept for deployments that
//! already standardize on it. Not the default: it needs a hand-rolled
//! batch/iterator story that sled gives us for free. Enabled by the
//! `rocker` feature.

use super::backend::{PhysicalBackend, RawOp};
use crate::encoding::KeyRange;
use crate::error::StorageError;
use rocksdb::{IteratorMode, WriteBatch, DB};
use std::path::Path;

pub struct RocksBackend {
    db: DB,
}

impl RocksBackend {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let db = DB::open_default(path).map_err(|e| {
            let message = e.to_string();
            if message.to_lowercase().contains("lock") {
                StorageError::DatabaseIsLockedError
            } else {
                StorageError::DatabaseIsOpenError(message)
            }
        })?;
        Ok(RocksBackend { db })
    }
}

impl PhysicalBackend for RocksBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        self.db
            .get(key)
            .map(|maybe| maybe.map(|v| v.to_vec()))
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    fn apply(&self, ops: &[RawOp]) -> Result<(), StorageError> {
        let mut batch = WriteBatch::default();
        for op in ops {
            match op {
                RawOp::Put(key, value) => batch.put(key, value),
                RawOp::Del(key) => batch.delete(key),
            }
        }
        self.db
            .write(batch)
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    fn range(&self, range: &KeyRange, reverse: bool) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        // rocksdb's iterator has no upper-bound primitive in this version,
        // so walk forward from `gte` and stop as soon as a key falls
        // outside the half-open range.
        let mode = IteratorMode::From(&range.gte, rocksdb::Direction::Forward);
        let mut pairs = Vec::new();
        for item in self.db.iterator(mode) {
            let (key, value) = item.map_err(|e| StorageError::Backend(e.to_string()))?;
            if !range.contains(&key) {
                if key.as_ref() < range.gte.as_slice() {
                    continue;
                }
                break;
            }
            pairs.push((key.to_vec(), value.to_vec()));
        }
        if reverse {
            pairs.reverse();
        }
        Ok(pairs)
    }

    fn flush(&self) -> Result<(), StorageError> {
        self.db.flush().map_err(|e| StorageError::Backend(e.to_string()))
    }

    fn size_on_disk(&self) -> Result<u64, StorageError> {
        match self
            .db
            .property_int_value("rocksdb.total-sst-files-size")
            .map_err(|e| StorageError::Backend(e.to_string()))?
        {
            Some(size) => Ok(size),
            None => Ok(0),
        }
    }

    fn compact(&self) -> Result<(), StorageError> {
        self.db.compact_range(None::<&[u8]>, None::<&[u8]>);
        Ok(())
    }
}
