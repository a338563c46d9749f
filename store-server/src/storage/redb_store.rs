//! redb-backed KvStore for production deployments
//!
//! A single `kv` table holds every aggregate and index, keyed by the
//! prefixed scheme documented in the module docs. redb commits with
//! immediate durability by default: once `put` returns, the write survives
//! power loss, and the database file is always in a consistent state.

use super::{KvStore, StorageError, StorageResult};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const KV_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");

fn db_err(e: impl std::fmt::Display) -> StorageError {
    StorageError::Database(e.to_string())
}

/// Key-value store backed by redb
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path).map_err(db_err)?;

        // Create the table up front so reads never hit a missing table
        let txn = db.begin_write().map_err(db_err)?;
        {
            let _ = txn.open_table(KV_TABLE).map_err(db_err)?;
        }
        txn.commit().map_err(db_err)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl KvStore for RedbStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let txn = self.db.begin_read().map_err(db_err)?;
        let table = txn.open_table(KV_TABLE).map_err(db_err)?;
        let value = table.get(key).map_err(db_err)?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = txn.open_table(KV_TABLE).map_err(db_err)?;
            table.insert(key, value).map_err(db_err)?;
        }
        txn.commit().map_err(db_err)?;
        Ok(())
    }

    fn put_if_absent(&self, key: &str, value: &[u8]) -> StorageResult<bool> {
        let txn = self.db.begin_write().map_err(db_err)?;
        let inserted = {
            let mut table = txn.open_table(KV_TABLE).map_err(db_err)?;
            let exists = table.get(key).map_err(db_err)?.is_some();
            if exists {
                false
            } else {
                table.insert(key, value).map_err(db_err)?;
                true
            }
        };
        txn.commit().map_err(db_err)?;
        Ok(inserted)
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let txn = self.db.begin_write().map_err(db_err)?;
        let removed = {
            let mut table = txn.open_table(KV_TABLE).map_err(db_err)?;
            table.remove(key).map_err(db_err)?.is_some()
        };
        txn.commit().map_err(db_err)?;
        Ok(removed)
    }

    fn scan_prefix(&self, prefix: &str) -> StorageResult<Vec<(String, Vec<u8>)>> {
        let txn = self.db.begin_read().map_err(db_err)?;
        let table = txn.open_table(KV_TABLE).map_err(db_err)?;
        let mut out = Vec::new();
        for entry in table.range(prefix..).map_err(db_err)? {
            let (k, v) = entry.map_err(db_err)?;
            let key = k.value();
            if !key.starts_with(prefix) {
                break;
            }
            out.push((key.to_string(), v.value().to_vec()));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, RedbStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("kv.redb")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_put_get_delete() {
        let (_dir, store) = temp_store();
        store.put("order:1", b"payload").unwrap();
        assert_eq!(store.get("order:1").unwrap().unwrap(), b"payload");
        assert!(store.delete("order:1").unwrap());
        assert!(store.get("order:1").unwrap().is_none());
    }

    #[test]
    fn test_put_if_absent_is_atomic_per_key() {
        let (_dir, store) = temp_store();
        assert!(store.put_if_absent("refund_order:o1", b"r1").unwrap());
        assert!(!store.put_if_absent("refund_order:o1", b"r2").unwrap());
        assert_eq!(store.get("refund_order:o1").unwrap().unwrap(), b"r1");
    }

    #[test]
    fn test_scan_prefix_bounded() {
        let (_dir, store) = temp_store();
        store.put("order:1", b"a").unwrap();
        store.put("order:2", b"b").unwrap();
        store.put("order_user:u:1", b"").unwrap();
        store.put("refund:1", b"c").unwrap();

        let orders = store.scan_prefix("order:").unwrap();
        assert_eq!(
            orders.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
            vec!["order:1", "order:2"]
        );
    }

    #[test]
    fn test_reopen_preserves_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.redb");
        {
            let store = RedbStore::open(&path).unwrap();
            store.put("voucher:WELCOME10", b"v").unwrap();
        }
        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.get("voucher:WELCOME10").unwrap().unwrap(), b"v");
    }
}
