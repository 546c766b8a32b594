//! Per-tenant schema cache using moka
//!
//! Entries are keyed by tenant and the fingerprint of the tenant's bundle
//! metadata, so a changed file list misses the cache and reloads.

use crate::bundle::{BundleMetadata, SchemaBundle};
use crate::error::SchemaError;
use crate::registry::SchemaRegistry;
use moka::future::Cache;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Cache key for a tenant bundle: `cache/schemas/{tenant}/cache_{hash}.gz`
#[inline]
#[must_use]
pub fn cache_key(tenant_id: &str, hash: &str) -> String {
    format!("{}cache_{hash}.gz", tenant_prefix(tenant_id))
}

fn tenant_prefix(tenant_id: &str) -> String {
    format!("cache/schemas/{tenant_id}/")
}

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
}

/// A loaded bundle together with its registry
#[derive(Debug)]
pub struct CachedSchemas {
    /// Metadata fingerprint the entry was loaded for
    pub hash: String,
    /// Source bundle
    pub bundle: SchemaBundle,
    /// Registry built from the bundle
    pub registry: SchemaRegistry,
}

impl CachedSchemas {
    /// Build the registry for a bundle
    #[must_use]
    pub fn new(hash: impl Into<String>, bundle: SchemaBundle) -> Self {
        let registry = bundle.registry();
        Self {
            hash: hash.into(),
            bundle,
            registry,
        }
    }
}

/// Tenant schema cache
#[derive(Debug, Clone)]
pub struct SchemaCache {
    inner: Cache<String, Arc<CachedSchemas>>,
}

impl SchemaCache {
    /// Create new cache with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    /// Create cache with time-based expiration
    #[inline]
    #[must_use]
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Get a cached entry
    pub async fn get(&self, tenant_id: &str, hash: &str) -> Option<Arc<CachedSchemas>> {
        self.inner.get(&cache_key(tenant_id, hash)).await
    }

    /// Get the entry for `metadata`, loading the bundle on a miss
    ///
    /// A miss also drops entries of the same tenant with other fingerprints.
    pub async fn get_or_load<F, Fut>(
        &self,
        tenant_id: &str,
        metadata: &BundleMetadata,
        load: F,
    ) -> Arc<CachedSchemas>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SchemaBundle>,
    {
        let hash = metadata.fingerprint();
        let key = cache_key(tenant_id, &hash);

        if let Some(cached) = self.inner.get(&key).await {
            tracing::debug!(tenant = tenant_id, %hash, "schema cache hit");
            return cached;
        }

        tracing::info!(tenant = tenant_id, %hash, "schema cache miss, loading schemas");
        let bundle = load().await;
        let entry = Arc::new(CachedSchemas::new(hash, bundle));
        self.inner.insert(key.clone(), Arc::clone(&entry)).await;

        let stale = self.cleanup_tenant(tenant_id, Some(&key)).await;
        if stale > 0 {
            tracing::info!(tenant = tenant_id, stale, "cleaned up old schema cache entries");
        }
        entry
    }

    /// Scan `dir` and return the cached registry for its current contents
    ///
    /// # Errors
    /// Returns [`SchemaError::Io`] if the directory cannot be listed.
    pub async fn load_dir(
        &self,
        tenant_id: &str,
        dir: impl AsRef<Path>,
    ) -> Result<Arc<CachedSchemas>, SchemaError> {
        let metadata = BundleMetadata::scan(dir).await?;
        Ok(self
            .get_or_load(tenant_id, &metadata, || SchemaBundle::load(tenant_id, &metadata))
            .await)
    }

    /// Drop every entry of a tenant, returning how many were dropped
    pub async fn invalidate_tenant(&self, tenant_id: &str) -> usize {
        let dropped = self.cleanup_tenant(tenant_id, None).await;
        tracing::info!(tenant = tenant_id, dropped, "invalidated schema cache");
        dropped
    }

    async fn cleanup_tenant(&self, tenant_id: &str, keep: Option<&str>) -> usize {
        let prefix = tenant_prefix(tenant_id);
        let stale: Vec<Arc<String>> = self
            .inner
            .iter()
            .map(|(key, _)| key)
            .filter(|key| key.starts_with(&prefix) && Some(key.as_str()) != keep)
            .collect();

        for key in &stale {
            self.inner.invalidate(key.as_str()).await;
        }
        stale.len()
    }

    /// Invalidate all entries
    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Apply pending maintenance so counts are exact
    pub async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }

    /// Get cache statistics
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.inner.entry_count(),
        }
    }
}

impl Default for SchemaCache {
    /// Create cache with default capacity (1,000 tenants)
    fn default() -> Self {
        Self::new(1_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::FileMeta;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn metadata(size: u64) -> BundleMetadata {
        BundleMetadata::from_files(
            "unused",
            vec![FileMeta {
                key: "Order.json".into(),
                name: "Order.json".into(),
                last_modified: None,
                size,
            }],
        )
    }

    fn bundle() -> SchemaBundle {
        SchemaBundle::new("acme").with_schema("Order", json!({"properties": {}}))
    }

    #[test]
    fn cache_key_format() {
        assert_eq!(cache_key("acme", "abc"), "cache/schemas/acme/cache_abc.gz");
    }

    #[tokio::test]
    async fn get_or_load_caches_by_fingerprint() {
        let cache = SchemaCache::new(10);
        let loads = Arc::new(AtomicUsize::new(0));
        let meta = metadata(10);

        for _ in 0..2 {
            let loads = Arc::clone(&loads);
            let entry = cache
                .get_or_load("acme", &meta, || async move {
                    loads.fetch_add(1, Ordering::SeqCst);
                    bundle()
                })
                .await;
            assert!(entry.registry.contains("Order"));
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(cache.get("acme", &meta.fingerprint()).await.is_some());
    }

    #[tokio::test]
    async fn new_fingerprint_replaces_stale_entry() {
        let cache = SchemaCache::new(10);
        let old = metadata(10);
        let new = metadata(20);

        cache.get_or_load("acme", &old, || async { bundle() }).await;
        cache.get_or_load("acme", &new, || async { bundle() }).await;
        cache.sync().await;

        assert!(cache.get("acme", &old.fingerprint()).await.is_none());
        assert!(cache.get("acme", &new.fingerprint()).await.is_some());
        assert_eq!(cache.stats().entry_count, 1);
    }

    #[tokio::test]
    async fn invalidate_tenant_leaves_other_tenants() {
        let cache = SchemaCache::default();
        let meta = metadata(10);
        cache.get_or_load("acme", &meta, || async { bundle() }).await;
        cache.get_or_load("globex", &meta, || async { bundle() }).await;

        assert_eq!(cache.invalidate_tenant("acme").await, 1);
        assert!(cache.get("acme", &meta.fingerprint()).await.is_none());
        assert!(cache.get("globex", &meta.fingerprint()).await.is_some());
    }
}
