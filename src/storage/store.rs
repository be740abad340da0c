//! A typed view onto one namespace of a [`Database`](super::database::Database).
//!
//! Every store owns a 4-byte prefix derived from its name, so many typed
//! stores can share one physical keyspace without colliding. Reads/writes
//! either go straight to the backend (`tx: None`) or through a caller's
//! open [`Transaction`], which is what makes cross-store atomic updates
//! possible (add a leaf and bump its counter in one commit).

use super::backend::RawOp;
use super::database::DatabaseInner;
use super::transaction::Transaction;
use crate::encoding::{Encoding, KeyRange};
use crate::error::StorageError;
use std::marker::PhantomData;
use std::sync::Arc;

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// A small non-cryptographic hash of a store name into a 4-byte prefix.
/// Deterministic and, in practice, collision-free across the handful of
/// store names this crate ever registers; `Database::add_store` still
/// checks for an accidental collision at registration time.
pub(crate) fn store_prefix(name: &str) -> [u8; 4] {
    let mut hash = FNV_OFFSET;
    for byte in name.as_bytes() {
        hash ^= *byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash.to_be_bytes()
}

pub struct Store<K, V, KE, VE>
where
    KE: Encoding<Item = K>,
    VE: Encoding<Item = V>,
{
    pub(crate) db: Arc<DatabaseInner>,
    name: String,
    prefix: [u8; 4],
    key_encoding: KE,
    value_encoding: VE,
    _marker: PhantomData<(K, V)>,
}

impl<K, V, KE, VE> Store<K, V, KE, VE>
where
    KE: Encoding<Item = K>,
    VE: Encoding<Item = V>,
{
    pub(crate) fn new(db: Arc<DatabaseInner>, name: &str, key_encoding: KE, value_encoding: VE) -> Self {
        Store {
            db,
            name: name.to_string(),
            prefix: store_prefix(name),
            key_encoding,
            value_encoding,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn prefix(&self) -> [u8; 4] {
        self.prefix
    }

    fn encode_key(&self, key: &K) -> Result<Vec<u8>, StorageError> {
        let mut out = self.prefix.to_vec();
        out.extend(self.key_encoding.serialize(key)?);
        Ok(out)
    }

    /// Look up a key. A raw value that fails to decode is treated the same
    /// as an absent one (`Ok(None)`) rather than surfaced as an error — a
    /// present-but-undecodable record is something a caller can't act on
    /// differently from "not there".
    pub fn get(&self, key: &K, tx: Option<&mut Transaction>) -> Result<Option<V>, StorageError> {
        let raw_key = self.encode_key(key)?;
        let raw_value = match tx {
            Some(tx) => {
                tx.ensure_same_database(&self.db)?;
                tx.get_raw(&raw_key)?
            }
            None => self.db.backend.get(&raw_key)?,
        };
        Ok(raw_value.and_then(|bytes| self.value_encoding.deserialize(&bytes).ok()))
    }

    pub fn has(&self, key: &K, tx: Option<&mut Transaction>) -> Result<bool, StorageError> {
        Ok(self.get(key, tx)?.is_some())
    }

    pub fn put(&self, key: &K, value: &V, tx: Option<&mut Transaction>) -> Result<(), StorageError> {
        let raw_key = self.encode_key(key)?;
        let raw_value = self.value_encoding.serialize(value)?;
        match tx {
            Some(tx) => {
                tx.ensure_same_database(&self.db)?;
                tx.put_raw(raw_key, raw_value)
            }
            None => self.db.backend.apply(&[RawOp::Put(raw_key, raw_value)]),
        }
    }

    /// Like `put`, but fails with `DuplicateKeyError` if the key is
    /// already present.
    pub fn add(&self, key: &K, value: &V, mut tx: Option<&mut Transaction>) -> Result<(), StorageError> {
        let reborrow = tx.as_mut().map(|t| &mut **t);
        if self.get(key, reborrow)?.is_some() {
            return Err(StorageError::DuplicateKeyError);
        }
        self.put(key, value, tx)
    }

    pub fn del(&self, key: &K, tx: Option<&mut Transaction>) -> Result<(), StorageError> {
        let raw_key = self.encode_key(key)?;
        match tx {
            Some(tx) => {
                tx.ensure_same_database(&self.db)?;
                tx.del_raw(raw_key)
            }
            None => self.db.backend.apply(&[RawOp::Del(raw_key)]),
        }
    }

    /// Delete keys in this store. `range`, if given, is relative to this
    /// store's own keyspace (i.e. excluding the prefix) and narrows the
    /// clear to that sub-range; `None` clears the whole store. Runs inside
    /// `tx` if given, or a fresh transaction committed before returning.
    pub fn clear(&self, tx: Option<&mut Transaction>, range: Option<&KeyRange>) -> Result<(), StorageError> {
        let full_range = match range {
            Some(r) => KeyRange {
                gte: [self.prefix.to_vec(), r.gte.clone()].concat(),
                lt: match &r.lt {
                    Some(lt) => Some([self.prefix.to_vec(), lt.clone()].concat()),
                    None => KeyRange::from_prefix(&self.prefix).lt,
                },
            },
            None => KeyRange::from_prefix(&self.prefix),
        };
        let backend_pairs = self.db.backend.range(&full_range, false)?;
        match tx {
            Some(tx) => {
                tx.ensure_same_database(&self.db)?;
                let merged = tx.overlay_range(backend_pairs, |k| full_range.contains(k));
                for (raw_key, _) in merged {
                    tx.del_raw(raw_key)?;
                }
                Ok(())
            }
            None => {
                let ops: Vec<RawOp> = backend_pairs.into_iter().map(|(k, _)| RawOp::Del(k)).collect();
                self.db.backend.apply(&ops)
            }
        }
    }

    /// Every key/value pair in the store, overlaying any uncommitted writes
    /// from `tx`. Ordered ascending by raw key unless `reverse` is set.
    pub fn get_all_iter(&self, tx: Option<&mut Transaction>, reverse: bool) -> Result<Vec<(K, V)>, StorageError> {
        let range = KeyRange::from_prefix(&self.prefix);
        let backend_pairs = self.db.backend.range(&range, false)?;
        let merged = match tx {
            Some(tx) => {
                tx.ensure_same_database(&self.db)?;
                tx.overlay_range(backend_pairs, |k| range.contains(k))
            }
            None => backend_pairs,
        };
        let mut results = Vec::with_capacity(merged.len());
        for (raw_key, raw_value) in merged {
            let key_bytes = &raw_key[self.prefix.len()..];
            let key = self.key_encoding.deserialize(key_bytes)?;
            let value = self.value_encoding.deserialize(&raw_value)?;
            results.push((key, value));
        }
        if reverse {
            results.reverse();
        }
        Ok(results)
    }
}
