//! Top-level handle onto a physical backend: owns the store registry, the
//! schema-version meta-store, and the single write lock every transaction
//! serializes through.

use super::backend::PhysicalBackend;
use super::batch::Batch;
use super::lock::WriteLock;
use super::store::{store_prefix, Store};
use super::transaction::Transaction;
use crate::encoding::{Encoding, StringEncoding, U32BEEncoding};
use crate::error::StorageError;
use log::{debug, info};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

static NEXT_DATABASE_ID: AtomicU64 = AtomicU64::new(1);

const META_STORE_NAME: &str = "__meta__";
const VERSION_KEY: &str = "version";

pub(crate) struct DatabaseInner {
    pub(crate) id: u64,
    pub(crate) backend: Box<dyn PhysicalBackend>,
    pub(crate) write_lock: WriteLock,
    registered: Mutex<HashMap<String, [u8; 4]>>,
    closed: AtomicBool,
}

/// A registry of [`Store`]s layered over one physical backend, plus the
/// schema-version bookkeeping every store's prefix lives alongside.
///
/// Cheaply cloneable: clones share the same backend, lock, and store
/// registry.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    meta: Arc<Store<String, u32, StringEncoding, U32BEEncoding>>,
}

impl Database {
    pub fn open(backend: Box<dyn PhysicalBackend>) -> Result<Self, StorageError> {
        let id = NEXT_DATABASE_ID.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::new(DatabaseInner {
            id,
            backend,
            write_lock: WriteLock::new(),
            registered: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        });
        let meta = Store::new(inner.clone(), META_STORE_NAME, StringEncoding, U32BEEncoding);
        inner
            .registered
            .lock()
            .expect("store registry poisoned")
            .insert(META_STORE_NAME.to_string(), meta.prefix());
        info!("database {} opened", id);
        Ok(Database {
            inner,
            meta: Arc::new(meta),
        })
    }

    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.inner.closed.load(Ordering::Acquire) {
            Err(StorageError::DatabaseIsClosed)
        } else {
            Ok(())
        }
    }

    /// Register a typed store under `name`. When `require_unique` is set
    /// (the default for application code), re-registering an existing
    /// name, or a name whose derived prefix collides with one already
    /// registered, is an error.
    pub fn add_store<K, V, KE, VE>(
        &self,
        name: &str,
        key_encoding: KE,
        value_encoding: VE,
        require_unique: bool,
    ) -> Result<Store<K, V, KE, VE>, StorageError>
    where
        KE: Encoding<Item = K>,
        VE: Encoding<Item = V>,
    {
        self.ensure_open()?;
        let prefix = store_prefix(name);
        let mut registered = self.inner.registered.lock().expect("store registry poisoned");
        if require_unique {
            if registered.contains_key(name) {
                return Err(StorageError::DuplicateStoreName(name.to_string()));
            }
            if registered.values().any(|existing| *existing == prefix) {
                return Err(StorageError::DuplicateStoreName(name.to_string()));
            }
        }
        registered.insert(name.to_string(), prefix);
        drop(registered);
        debug!("store {:?} registered on database {}", name, self.inner.id);
        Ok(Store::new(self.inner.clone(), name, key_encoding, value_encoding))
    }

    pub fn transaction(&self) -> Result<Transaction, StorageError> {
        self.ensure_open()?;
        Ok(Transaction::begin(self.inner.clone()))
    }

    /// Run `f` against `existing` if given, or a fresh transaction that is
    /// committed on success and aborted on error. Lets call sites compose
    /// several store operations into one atomic unit while still letting
    /// callers pass their own in-flight transaction through.
    pub fn with_transaction<R, E>(
        &self,
        existing: Option<&mut Transaction>,
        f: impl FnOnce(&mut Transaction) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<StorageError>,
    {
        match existing {
            Some(tx) => f(tx),
            None => {
                let mut tx = self.transaction().map_err(E::from)?;
                match f(&mut tx) {
                    Ok(value) => {
                        tx.commit().map_err(E::from)?;
                        Ok(value)
                    }
                    Err(e) => {
                        tx.abort();
                        Err(e)
                    }
                }
            }
        }
    }

    pub fn batch(&self) -> Batch {
        Batch::new(self.inner.clone())
    }

    pub fn get_version(&self) -> Result<u32, StorageError> {
        Ok(self.meta.get(&VERSION_KEY.to_string(), None)?.unwrap_or(0))
    }

    pub fn put_version(&self, version: u32) -> Result<(), StorageError> {
        self.meta.put(&VERSION_KEY.to_string(), &version, None)
    }

    /// Stamp a fresh database with `expected`, or fail if an existing
    /// database's recorded version disagrees.
    pub fn upgrade(&self, expected: u32) -> Result<(), StorageError> {
        let current = self.get_version()?;
        if current == 0 {
            info!("database {} stamped at schema version {}", self.inner.id, expected);
            self.put_version(expected)
        } else if current != expected {
            Err(StorageError::DatabaseVersionError { current, expected })
        } else {
            Ok(())
        }
    }

    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        info!("database {} closed", self.inner.id);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    pub fn compact(&self) -> Result<(), StorageError> {
        self.ensure_open()?;
        self.inner.backend.compact()
    }

    pub fn size(&self) -> Result<u64, StorageError> {
        self.inner.backend.size_on_disk()
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.inner.backend.flush()
    }
}
