//! Durable key-value storage for per-provider scan caches.
//!
//! Values are compact strings (see [`crate::provider_cache`]). Writes for
//! different keys never conflict; concurrent writes to the same key are last
//! write wins.

use parking_lot::RwLock;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use rustc_hash::FxHashMap;
use std::path::Path;

use crate::error::ProviderCacheError;

const PROVIDER_TABLE: TableDefinition<&str, &str> = TableDefinition::new("provider_cache");

pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ProviderCacheError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ProviderCacheError>;
    fn remove(&self, key: &str) -> Result<(), ProviderCacheError>;
}

/// redb-backed store at `<cache_dir>/windpress.redb`.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create the store, creating `cache_dir` if needed.
    pub fn open(cache_dir: &Path) -> Result<Self, ProviderCacheError> {
        std::fs::create_dir_all(cache_dir)?;

        let db = Database::create(cache_dir.join("windpress.redb"))?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PROVIDER_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }
}

impl DurableStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<String>, ProviderCacheError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROVIDER_TABLE)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ProviderCacheError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PROVIDER_TABLE)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ProviderCacheError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PROVIDER_TABLE)?;
            table.remove(key)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

/// Process-lifetime store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<FxHashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ProviderCacheError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ProviderCacheError> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ProviderCacheError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_store_open_creates_directory() {
        let dir = TempDir::new().unwrap();
        let cache_dir = dir.path().join("nested").join("cache");

        let _store = RedbStore::open(&cache_dir).unwrap();
        assert!(cache_dir.join("windpress.redb").exists());
    }

    #[test]
    fn test_redb_set_get_remove() {
        let dir = TempDir::new().unwrap();
        let store = RedbStore::open(dir.path()).unwrap();

        assert_eq!(store.get("missing").unwrap(), None);
        store.set("windpress.cache.provider.a", "value").unwrap();
        assert_eq!(store.get("windpress.cache.provider.a").unwrap().as_deref(), Some("value"));

        store.set("windpress.cache.provider.a", "newer").unwrap();
        assert_eq!(store.get("windpress.cache.provider.a").unwrap().as_deref(), Some("newer"));

        store.remove("windpress.cache.provider.a").unwrap();
        assert_eq!(store.get("windpress.cache.provider.a").unwrap(), None);
    }

    #[test]
    fn test_redb_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = RedbStore::open(dir.path()).unwrap();
            store.set("k", "v").unwrap();
        }
        let store = RedbStore::open(dir.path()).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(store.len(), 1);
    }
}
