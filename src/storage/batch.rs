//! A standalone write batch, for callers that want atomic multi-key writes
//! without the read-your-writes cache a [`Transaction`](super::transaction::Transaction)
//! carries.

use super::backend::RawOp;
use super::database::DatabaseInner;
use crate::error::StorageError;
use std::sync::Arc;

pub struct Batch {
    pub(crate) db: Arc<DatabaseInner>,
    ops: Vec<RawOp>,
}

impl Batch {
    pub(crate) fn new(db: Arc<DatabaseInner>) -> Self {
        Batch { db, ops: Vec::new() }
    }

    pub(crate) fn put_raw(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push(RawOp::Put(key, value));
    }

    pub(crate) fn del_raw(&mut self, key: Vec<u8>) {
        self.ops.push(RawOp::Del(key));
    }

    /// Apply every queued op atomically. Consumes the batch: a committed
    /// batch cannot be reused or partially replayed.
    pub fn commit(self) -> Result<(), StorageError> {
        self.db.backend.apply(&self.ops)
    }
}
