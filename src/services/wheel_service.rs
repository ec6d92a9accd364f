use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{AppError, AppResult};
use crate::models::Prize;

/// Where the prize catalog comes from (a spreadsheet in production).
/// The catalog is replaced wholesale on each fetch, never patched.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_catalog(&self) -> AppResult<Vec<Prize>>;
}

struct CatalogCache {
    data: Option<Vec<Prize>>,
    fetched_at: Option<Instant>,
}

/// Read-through cache over the catalog source.
///
/// A stale catalog is preferred over failing a spin: when a refetch
/// errors, the last-known-good snapshot is served. The lock is held across
/// the refetch so concurrent misses wait for one fetch instead of issuing
/// their own.
#[derive(Clone)]
pub struct WheelConfigService {
    source: Arc<dyn CatalogSource>,
    ttl: Duration,
    cache: Arc<Mutex<CatalogCache>>,
}

impl WheelConfigService {
    pub fn new(source: Arc<dyn CatalogSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cache: Arc::new(Mutex::new(CatalogCache {
                data: None,
                fetched_at: None,
            })),
        }
    }

    pub async fn get_configuration(&self) -> AppResult<Vec<Prize>> {
        let mut cache = self.cache.lock().await;

        if let (Some(data), Some(fetched_at)) = (&cache.data, cache.fetched_at)
            && fetched_at.elapsed() < self.ttl
        {
            return Ok(data.clone());
        }

        match self.source.fetch_catalog().await {
            Ok(prizes) => {
                cache.data = Some(prizes.clone());
                cache.fetched_at = Some(Instant::now());
                Ok(prizes)
            }
            Err(e) => {
                if let Some(stale) = &cache.data {
                    log::warn!("Catalog refetch failed, serving last known good: {e}");
                    return Ok(stale.clone());
                }
                Err(AppError::CatalogUnavailable(e.to_string()))
            }
        }
    }

    /// Drop the cached snapshot; the next read refetches.
    pub async fn clear_cache(&self) {
        let mut cache = self.cache.lock().await;
        cache.data = None;
        cache.fetched_at = None;
        log::info!("Wheel catalog cache cleared");
    }

    pub async fn force_refresh(&self) -> AppResult<Vec<Prize>> {
        self.clear_cache().await;
        self.get_configuration().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct StubSource {
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    impl StubSource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl CatalogSource for StubSource {
        async fn fetch_catalog(&self) -> AppResult<Vec<Prize>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::ExternalApiError("sheet down".to_string()));
            }
            Ok(vec![Prize {
                id: "p1".to_string(),
                name: "Voucher".to_string(),
                icon: "🎁".to_string(),
                image_url: None,
                probability: 100.0,
                color: "#FFFFFF".to_string(),
                description: String::new(),
                category: "Khác".to_string(),
            }])
        }
    }

    #[tokio::test]
    async fn test_cache_hit_skips_source() {
        let source = Arc::new(StubSource::new());
        let service = WheelConfigService::new(source.clone(), Duration::from_secs(300));

        service.get_configuration().await.unwrap();
        service.get_configuration().await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_catalog_served_on_refetch_failure() {
        let source = Arc::new(StubSource::new());
        // Zero TTL: every read is a refetch.
        let service = WheelConfigService::new(source.clone(), Duration::ZERO);

        let first = service.get_configuration().await.unwrap();
        assert_eq!(first.len(), 1);

        source.fail.store(true, Ordering::SeqCst);
        let stale = service.get_configuration().await.unwrap();
        assert_eq!(stale.len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_known_and_source_down_is_an_error() {
        let source = Arc::new(StubSource::new());
        source.fail.store(true, Ordering::SeqCst);
        let service = WheelConfigService::new(source.clone(), Duration::from_secs(300));

        match service.get_configuration().await {
            Err(AppError::CatalogUnavailable(_)) => {}
            other => panic!("expected CatalogUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_ttl() {
        let source = Arc::new(StubSource::new());
        let service = WheelConfigService::new(source.clone(), Duration::from_secs(300));

        service.get_configuration().await.unwrap();
        service.force_refresh().await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
