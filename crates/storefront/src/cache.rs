//! In-process cache for read-heavy catalog responses.
//!
//! Entries live for five minutes. Admin writes and new reviews invalidate the
//! affected keys so the next read goes back to `PostgreSQL`.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use clayhouse_core::ProductId;

use crate::models::{Category, ProductDetail};

const TTL: Duration = Duration::from_secs(300);
const MAX_ENTRIES: u64 = 1000;

/// Cache key for catalog reads.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Categories,
    Product(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Categories(Arc<Vec<Category>>),
    Product(Arc<ProductDetail>),
}

/// Shared catalog cache. Cloning shares the underlying store.
#[derive(Clone)]
pub struct CatalogCache {
    inner: Cache<CacheKey, CacheValue>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogCache {
    #[must_use]
    pub fn new() -> Self {
        let inner = Cache::builder()
            .max_capacity(MAX_ENTRIES)
            .time_to_live(TTL)
            .build();
        Self { inner }
    }

    pub async fn categories(&self) -> Option<Arc<Vec<Category>>> {
        match self.inner.get(&CacheKey::Categories).await {
            Some(CacheValue::Categories(categories)) => Some(categories),
            _ => None,
        }
    }

    pub async fn put_categories(&self, categories: Arc<Vec<Category>>) {
        self.inner
            .insert(CacheKey::Categories, CacheValue::Categories(categories))
            .await;
    }

    pub async fn product(&self, id: ProductId) -> Option<Arc<ProductDetail>> {
        match self.inner.get(&CacheKey::Product(id)).await {
            Some(CacheValue::Product(detail)) => Some(detail),
            _ => None,
        }
    }

    pub async fn put_product(&self, id: ProductId, detail: Arc<ProductDetail>) {
        self.inner
            .insert(CacheKey::Product(id), CacheValue::Product(detail))
            .await;
    }

    /// Invalidate a cached product page.
    pub async fn invalidate_product(&self, id: ProductId) {
        self.inner.invalidate(&CacheKey::Product(id)).await;
    }

    /// Invalidate all cached data.
    pub async fn invalidate_all(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clayhouse_core::CategoryId;

    fn category(name: &str) -> Category {
        Category {
            id: CategoryId::new(),
            slug: name.to_lowercase(),
            name: name.to_string(),
            sort_order: 0,
        }
    }

    #[tokio::test]
    async fn test_categories_round_trip_and_invalidate() {
        let cache = CatalogCache::new();
        assert!(cache.categories().await.is_none());

        cache
            .put_categories(Arc::new(vec![category("Bowls"), category("Cups")]))
            .await;
        assert_eq!(cache.categories().await.unwrap().len(), 2);

        cache.invalidate_all().await;
        assert!(cache.categories().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_product_is_none() {
        let cache = CatalogCache::new();
        cache.invalidate_product(ProductId::new()).await;
        assert!(cache.product(ProductId::new()).await.is_none());
    }
}
