//! Default physical backend, built on `sled`. Chosen over the raw rocksdb
//! backend because it natively gives us atomic batches and ordered range
//! scans without hand-rolling either on top of rocksdb's C bindings.

use super::backend::{PhysicalBackend, RawOp};
use crate::encoding::KeyRange;
use crate::error::StorageError;
use std::path::Path;

pub struct SledBackend {
    db: sled::Db,
}

impl SledBackend {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(classify_open_error)?;
        Ok(SledBackend { db })
    }

    /// An in-memory backend, useful for tests that don't want to touch
    /// disk.
    pub fn open_temporary() -> Result<Self, StorageError> {
        let config = sled::Config::new().temporary(true);
        let db = config.open().map_err(classify_open_error)?;
        Ok(SledBackend { db })
    }
}

fn classify_open_error(err: sled::Error) -> StorageError {
    match &err {
        sled::Error::Io(io_err) => {
            let message = io_err.to_string();
            if message.to_lowercase().contains("lock") {
                StorageError::DatabaseIsLockedError
            } else {
                StorageError::DatabaseIsOpenError(message)
            }
        }
        sled::Error::Corruption { .. } => StorageError::DatabaseIsCorruptError(err.to_string()),
        other => StorageError::DatabaseIsOpenError(other.to_string()),
    }
}

impl PhysicalBackend for SledBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        self.db
            .get(key)
            .map(|maybe| maybe.map(|ivec| ivec.to_vec()))
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    fn apply(&self, ops: &[RawOp]) -> Result<(), StorageError> {
        let mut batch = sled::Batch::default();
        for op in ops {
            match op {
                RawOp::Put(key, value) => batch.insert(key.as_slice(), value.as_slice()),
                RawOp::Del(key) => batch.remove(key.as_slice()),
            }
        }
        self.db
            .apply_batch(batch)
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    fn range(&self, range: &KeyRange, reverse: bool) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let pairs: Result<Vec<(sled::IVec, sled::IVec)>, sled::Error> = match &range.lt {
            Some(lt) => {
                let bounded = range.gte.clone()..lt.clone();
                if reverse {
                    self.db.range(bounded).rev().collect()
                } else {
                    self.db.range(bounded).collect()
                }
            }
            None => {
                let unbounded = range.gte.clone()..;
                if reverse {
                    self.db.range(unbounded).rev().collect()
                } else {
                    self.db.range(unbounded).collect()
                }
            }
        };
        let pairs = pairs.map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(pairs
            .into_iter()
            .map(|(k, v)| (k.to_vec(), v.to_vec()))
            .collect())
    }

    fn flush(&self) -> Result<(), StorageError> {
        self.db
            .flush()
            .map(|_| ())
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    fn size_on_disk(&self) -> Result<u64, StorageError> {
        self.db
            .size_on_disk()
            .map_err(|e| StorageError::Backend(e.to_string()))
    }
}
