mod key;
mod memory;

pub use key::CacheKey;
pub use memory::MemoryCache;

use async_trait::async_trait;
use tracing::debug;

use crate::config::CacheConfig;
use crate::error::Result;
use crate::split::SizeOracle;

/// Store of page-set measurements, shared by every oracle built from it.
///
/// Cloning is cheap and clones share entries.
#[derive(Clone, Default)]
pub struct MeasurementCache {
    memory: Option<MemoryCache>,
}

impl MeasurementCache {
    /// Create a measurement cache from configuration
    pub fn new(config: &CacheConfig) -> Self {
        let memory = config
            .enabled
            .then(|| MemoryCache::new(config.max_entries, config.ttl_seconds));

        Self { memory }
    }

    /// A cache that never stores anything
    pub const fn disabled() -> Self {
        Self { memory: None }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<u64> {
        match self.memory {
            Some(ref memory) => memory.get(key.as_str()).await,
            None => None,
        }
    }

    pub async fn insert(&self, key: &CacheKey, size: u64) {
        if let Some(ref memory) = self.memory {
            memory.insert(key.to_string(), size).await;
        }
    }

    pub fn clear(&self) {
        if let Some(ref memory) = self.memory {
            memory.clear();
        }
    }
}

/// Oracle wrapper that remembers successful measurements.
///
/// Failures are never cached, so a transient failure is retried the next
/// time the same pages are asked for.
pub struct MemoizedOracle<O> {
    inner: O,
    doc_id: String,
    cache: MeasurementCache,
}

impl<O: SizeOracle> MemoizedOracle<O> {
    /// `doc_id` must identify the measured document's content.
    pub fn new(inner: O, doc_id: impl Into<String>, cache: MeasurementCache) -> Self {
        Self {
            inner,
            doc_id: doc_id.into(),
            cache,
        }
    }
}

#[async_trait]
impl<O: SizeOracle> SizeOracle for MemoizedOracle<O> {
    async fn measure(&self, pages: &[usize]) -> Result<u64> {
        let key = CacheKey::new(&self.doc_id, pages);

        if let Some(size) = self.cache.get(&key).await {
            debug!("Measurement cache hit for {} pages", pages.len());
            return Ok(size);
        }

        let size = self.inner.measure(pages).await?;
        self.cache.insert(&key, size).await;
        Ok(size)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::split::{oracle_fn, split};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_oracle(
        calls: Arc<AtomicUsize>,
    ) -> impl SizeOracle {
        oracle_fn(move |pages: &[usize]| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(pages.len() as u64 * 100)
        })
    }

    #[tokio::test]
    async fn test_repeated_measurement_hits_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let oracle = MemoizedOracle::new(
            counting_oracle(Arc::clone(&calls)),
            "doc",
            MeasurementCache::new(&CacheConfig::default()),
        );

        assert_eq!(oracle.measure(&[0, 1, 2]).await.unwrap(), 300);
        assert_eq!(oracle.measure(&[0, 1, 2]).await.unwrap(), 300);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        oracle.measure(&[0, 1]).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_measures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let oracle = MemoizedOracle::new(
            counting_oracle(Arc::clone(&calls)),
            "doc",
            MeasurementCache::disabled(),
        );

        oracle.measure(&[0]).await.unwrap();
        oracle.measure(&[0]).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_shared_cache_is_scoped_by_document() {
        let cache = MeasurementCache::new(&CacheConfig::default());
        let a = MemoizedOracle::new(oracle_fn(|_: &[usize]| Ok(1)), "a", cache.clone());
        let b = MemoizedOracle::new(oracle_fn(|_: &[usize]| Ok(2)), "b", cache);

        assert_eq!(a.measure(&[0]).await.unwrap(), 1);
        assert_eq!(b.measure(&[0]).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let oracle = MemoizedOracle::new(
            oracle_fn(move |_: &[usize]| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(Error::Measurement("transient".to_string()))
                } else {
                    Ok(7)
                }
            }),
            "doc",
            MeasurementCache::new(&CacheConfig::default()),
        );

        assert!(oracle.measure(&[0]).await.is_err());
        assert_eq!(oracle.measure(&[0]).await.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_resplit_reuses_measurements() {
        let calls = Arc::new(AtomicUsize::new(0));
        let oracle = MemoizedOracle::new(
            counting_oracle(Arc::clone(&calls)),
            "doc",
            MeasurementCache::new(&CacheConfig::default()),
        );

        let first = split(20, 500, &oracle).await.unwrap();
        let after_first = calls.load(Ordering::SeqCst);
        let second = split(20, 500, &oracle).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), after_first);
    }

    #[tokio::test]
    async fn test_clear_forgets_measurements() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = MeasurementCache::new(&CacheConfig::default());
        let oracle = MemoizedOracle::new(counting_oracle(Arc::clone(&calls)), "doc", cache.clone());

        oracle.measure(&[3]).await.unwrap();
        cache.clear();
        oracle.measure(&[3]).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
