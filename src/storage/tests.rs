use super::*;
use crate::encoding::{Encoding, StringEncoding, U32BEEncoding};
use crate::error::StorageError;

fn open_test_database() -> Database {
    let backend = SledBackend::open_temporary().expect("open temporary sled backend");
    Database::open(Box::new(backend)).expect("open database")
}

#[test]
fn put_get_round_trips_without_a_transaction() {
    let db = open_test_database();
    let store = db
        .add_store::<String, u32, _, _>("counts", StringEncoding, U32BEEncoding, true)
        .unwrap();
    store.put(&"a".to_string(), &1, None).unwrap();
    assert_eq!(store.get(&"a".to_string(), None).unwrap(), Some(1));
    assert_eq!(store.get(&"missing".to_string(), None).unwrap(), None);
}

#[test]
fn duplicate_store_name_is_rejected() {
    let db = open_test_database();
    db.add_store::<String, u32, _, _>("counts", StringEncoding, U32BEEncoding, true)
        .unwrap();
    let result = db.add_store::<String, u32, _, _>("counts", StringEncoding, U32BEEncoding, true);
    assert_matches::assert_matches!(result, Err(StorageError::DuplicateStoreName(_)));
}

#[test]
fn add_rejects_an_existing_key() {
    let db = open_test_database();
    let store = db
        .add_store::<String, u32, _, _>("counts", StringEncoding, U32BEEncoding, true)
        .unwrap();
    store.add(&"a".to_string(), &1, None).unwrap();
    let result = store.add(&"a".to_string(), &2, None);
    assert_matches::assert_matches!(result, Err(StorageError::DuplicateKeyError));
}

#[test]
fn transaction_writes_are_invisible_outside_until_commit() {
    let db = open_test_database();
    let store = db
        .add_store::<String, u32, _, _>("counts", StringEncoding, U32BEEncoding, true)
        .unwrap();

    let mut tx = db.transaction().unwrap();
    store.put(&"a".to_string(), &1, Some(&mut tx)).unwrap();
    assert_eq!(store.get(&"a".to_string(), None).unwrap(), None);
    assert_eq!(store.get(&"a".to_string(), Some(&mut tx)).unwrap(), Some(1));

    tx.commit().unwrap();
    assert_eq!(store.get(&"a".to_string(), None).unwrap(), Some(1));
}

#[test]
fn aborted_transaction_discards_its_writes() {
    let db = open_test_database();
    let store = db
        .add_store::<String, u32, _, _>("counts", StringEncoding, U32BEEncoding, true)
        .unwrap();

    let mut tx = db.transaction().unwrap();
    store.put(&"a".to_string(), &1, Some(&mut tx)).unwrap();
    tx.abort();
    assert_eq!(store.get(&"a".to_string(), None).unwrap(), None);
}

#[test]
fn dropping_an_unresolved_transaction_releases_the_write_lock() {
    let db = open_test_database();
    {
        let mut tx = db.transaction().unwrap();
        let store = db
            .add_store::<String, u32, _, _>("counts", StringEncoding, U32BEEncoding, true)
            .unwrap();
        store.put(&"a".to_string(), &1, Some(&mut tx)).unwrap();
        // tx dropped here without commit/abort
    }
    // if the lock leaked, this would deadlock
    let mut tx2 = db.transaction().unwrap();
    tx2.commit().unwrap();
}

#[test]
fn with_transaction_commits_on_success_and_aborts_on_error() {
    let db = open_test_database();
    let store = db
        .add_store::<String, u32, _, _>("counts", StringEncoding, U32BEEncoding, true)
        .unwrap();

    let result: Result<(), StorageError> = db.with_transaction(None, |tx| {
        store.put(&"a".to_string(), &1, Some(tx))?;
        Ok(())
    });
    result.unwrap();
    assert_eq!(store.get(&"a".to_string(), None).unwrap(), Some(1));

    let result: Result<(), StorageError> = db.with_transaction(None, |tx| {
        store.put(&"b".to_string(), &2, Some(tx))?;
        Err(StorageError::DuplicateKeyError)
    });
    assert!(result.is_err());
    assert_eq!(store.get(&"b".to_string(), None).unwrap(), None);
}

#[test]
fn transaction_from_one_database_is_rejected_by_a_store_from_another() {
    let db1 = open_test_database();
    let db2 = open_test_database();
    let store1 = db1
        .add_store::<String, u32, _, _>("counts", StringEncoding, U32BEEncoding, true)
        .unwrap();
    let mut tx2 = db2.transaction().unwrap();
    let result = store1.put(&"a".to_string(), &1, Some(&mut tx2));
    assert_matches::assert_matches!(result, Err(StorageError::TransactionWrongDatabaseError));
}

#[test]
fn batch_applies_atomically() {
    let db = open_test_database();
    let store = db
        .add_store::<String, u32, _, _>("counts", StringEncoding, U32BEEncoding, true)
        .unwrap();
    let mut batch = db.batch();
    store.put(&"a".to_string(), &1, None).unwrap();
    batch.put_raw(
        {
            let mut k = store.prefix().to_vec();
            k.extend(StringEncoding.serialize(&"b".to_string()).unwrap());
            k
        },
        U32BEEncoding.serialize(&2).unwrap(),
    );
    batch.commit().unwrap();
    assert_eq!(store.get(&"b".to_string(), None).unwrap(), Some(2));
}

#[test]
fn get_all_iter_overlays_pending_transaction_writes() {
    let db = open_test_database();
    let store = db
        .add_store::<String, u32, _, _>("counts", StringEncoding, U32BEEncoding, true)
        .unwrap();
    store.put(&"a".to_string(), &1, None).unwrap();
    store.put(&"b".to_string(), &2, None).unwrap();

    let mut tx = db.transaction().unwrap();
    store.del(&"a".to_string(), Some(&mut tx)).unwrap();
    store.put(&"c".to_string(), &3, Some(&mut tx)).unwrap();

    let all = store.get_all_iter(Some(&mut tx), false).unwrap();
    assert_eq!(all, vec![("b".to_string(), 2), ("c".to_string(), 3)]);

    tx.abort();
    let all = store.get_all_iter(None, false).unwrap();
    assert_eq!(all, vec![("a".to_string(), 1), ("b".to_string(), 2)]);
}

#[test]
fn schema_version_is_stamped_once_and_enforced_thereafter() {
    let db = open_test_database();
    assert_eq!(db.get_version().unwrap(), 0);
    db.upgrade(3).unwrap();
    assert_eq!(db.get_version().unwrap(), 3);
    db.upgrade(3).unwrap();
    let result = db.upgrade(4);
    assert_matches::assert_matches!(
        result,
        Err(StorageError::DatabaseVersionError {
            current: 3,
            expected: 4
        })
    );
}

#[test]
fn operations_after_close_are_rejected() {
    let db = open_test_database();
    db.close();
    assert!(db.is_closed());
    let result = db.add_store::<String, u32, _, _>("counts", StringEncoding, U32BEEncoding, true);
    assert_matches::assert_matches!(result, Err(StorageError::DatabaseIsClosed));
}
