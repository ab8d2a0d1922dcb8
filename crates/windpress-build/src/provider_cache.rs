//! Per-provider scan caches in the durable store.
//!
//! Key: `windpress.cache.provider.<id>`. Value: the packed
//! (JSON, zlib, base64) form of [`ProviderCache`].

use std::sync::Arc;
use tracing::trace;
use windpress_volume::sfs;

use crate::error::ProviderCacheError;
use crate::models::ProviderCache;
use crate::store::DurableStore;

pub const KEY_PREFIX: &str = "windpress.cache.provider.";

pub fn cache_key(provider_id: &str) -> String {
    format!("{KEY_PREFIX}{provider_id}")
}

#[derive(Clone, Default)]
pub struct ProviderCacheStore {
    store: Option<Arc<dyn DurableStore>>,
}

impl ProviderCacheStore {
    pub fn new(store: Option<Arc<dyn DurableStore>>) -> Self {
        Self { store }
    }

    /// A store that is never available; every build rescans.
    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub fn is_available(&self) -> bool {
        self.store.is_some()
    }

    fn store(&self) -> Result<&dyn DurableStore, ProviderCacheError> {
        self.store.as_deref().ok_or(ProviderCacheError::Unavailable)
    }

    pub fn load(&self, provider_id: &str) -> Result<Option<ProviderCache>, ProviderCacheError> {
        let Some(packed) = self.store()?.get(&cache_key(provider_id))? else {
            trace!("no cached scan for {provider_id}");
            return Ok(None);
        };
        Ok(Some(sfs::unpack(&packed)?))
    }

    pub fn save(&self, provider_id: &str, cache: &ProviderCache) -> Result<(), ProviderCacheError> {
        let packed = sfs::pack(cache)?;
        self.store()?.set(&cache_key(provider_id), &packed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentKind, ScanBatch, ScanContent};
    use crate::store::MemoryStore;

    fn sample() -> ProviderCache {
        ProviderCache {
            contents: vec![ScanBatch {
                contents: vec![ScanContent {
                    content: "PGRpdj48L2Rpdj4=".into(),
                    kind: ContentKind::Text,
                }],
                metadata: Default::default(),
            }],
            timestamp: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_save_and_load() {
        let memory = Arc::new(MemoryStore::new());
        let caches = ProviderCacheStore::new(Some(memory.clone()));

        caches.save("gutenberg", &sample()).unwrap();
        assert_eq!(caches.load("gutenberg").unwrap(), Some(sample()));
        assert_eq!(caches.load("bricks").unwrap(), None);

        let raw = memory.get("windpress.cache.provider.gutenberg").unwrap().unwrap();
        assert!(!raw.contains("timestamp"), "value should be packed");
    }

    #[test]
    fn test_disabled_store_is_unavailable() {
        let caches = ProviderCacheStore::disabled();
        assert!(!caches.is_available());
        assert!(matches!(caches.load("x"), Err(ProviderCacheError::Unavailable)));
        assert!(matches!(caches.save("x", &sample()), Err(ProviderCacheError::Unavailable)));
    }

    #[test]
    fn test_corrupt_value() {
        let memory = Arc::new(MemoryStore::new());
        memory.set(&cache_key("x"), "not packed").unwrap();
        let caches = ProviderCacheStore::new(Some(memory));
        assert!(matches!(caches.load("x"), Err(ProviderCacheError::Corrupt(_))));
    }
}
