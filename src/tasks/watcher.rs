use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use log::{error, info};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use utoipa::ToSchema;

use crate::error::AppResult;
use crate::services::WheelConfigService;
use crate::utils::format_vietnam_time;

/// Where the "when was the wheel sheet last edited" signal comes from
/// (Drive file metadata in production).
#[async_trait]
pub trait ModifiedTimeSource: Send + Sync {
    async fn modified_time_ms(&self) -> AppResult<i64>;
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WatcherStatus {
    pub is_polling: bool,
    pub interval_secs: u64,
    pub last_modified: i64,
    pub last_modified_formatted: String,
}

struct WatcherInner {
    source: Arc<dyn ModifiedTimeSource>,
    wheel: WheelConfigService,
    interval: Duration,
    polling: AtomicBool,
    last_modified: AtomicI64,
    handle: Mutex<Option<JoinHandle<()>>>,
}

/// Polls the catalog sheet's modification time and drops the cached wheel
/// configuration whenever the sheet changed, so edits reach players ahead
/// of the cache TTL.
#[derive(Clone)]
pub struct SheetWatcher {
    inner: Arc<WatcherInner>,
}

impl SheetWatcher {
    pub fn new(
        source: Arc<dyn ModifiedTimeSource>,
        wheel: WheelConfigService,
        interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(WatcherInner {
                source,
                wheel,
                interval,
                polling: AtomicBool::new(false),
                last_modified: AtomicI64::new(0),
                handle: Mutex::new(None),
            }),
        }
    }

    /// Starts the polling loop. A second start while one is running is a
    /// no-op.
    pub async fn start(&self) {
        if self.inner.polling.swap(true, Ordering::SeqCst) {
            info!("Sheet watcher already running");
            return;
        }
        info!(
            "Sheet watcher started, polling every {}s",
            self.inner.interval.as_secs()
        );
        let watcher = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                if !watcher.inner.polling.load(Ordering::SeqCst) {
                    break;
                }
                if let Err(e) = watcher.check_once().await {
                    error!("Sheet watcher check failed: {e}");
                }
                tokio::time::sleep(watcher.inner.interval).await;
            }
        });
        *self.inner.handle.lock().await = Some(handle);
    }

    pub async fn stop(&self) {
        self.inner.polling.store(false, Ordering::SeqCst);
        if let Some(handle) = self.inner.handle.lock().await.take() {
            handle.abort();
        }
        info!("Sheet watcher stopped");
    }

    /// One poll on demand, regardless of whether the loop is running.
    /// Returns whether a change was detected.
    pub async fn force_check(&self) -> AppResult<bool> {
        self.check_once().await
    }

    pub fn status(&self) -> WatcherStatus {
        let last_modified = self.inner.last_modified.load(Ordering::SeqCst);
        WatcherStatus {
            is_polling: self.inner.polling.load(Ordering::SeqCst),
            interval_secs: self.inner.interval.as_secs(),
            last_modified,
            last_modified_formatted: format_vietnam_time(last_modified),
        }
    }

    async fn check_once(&self) -> AppResult<bool> {
        let modified = self.inner.source.modified_time_ms().await?;
        let last = self.inner.last_modified.load(Ordering::SeqCst);
        if modified <= last {
            return Ok(false);
        }
        self.inner.last_modified.store(modified, Ordering::SeqCst);
        if last == 0 {
            // First observation is a baseline, not an edit.
            return Ok(false);
        }
        info!("Wheel sheet changed at {}, clearing catalog cache", modified);
        self.inner.wheel.clear_cache().await;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Prize;
    use crate::services::CatalogSource;
    use std::sync::atomic::AtomicUsize;

    struct StubClock {
        now: AtomicI64,
    }

    #[async_trait]
    impl ModifiedTimeSource for StubClock {
        async fn modified_time_ms(&self) -> AppResult<i64> {
            Ok(self.now.load(Ordering::SeqCst))
        }
    }

    struct CountingCatalog {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl CatalogSource for CountingCatalog {
        async fn fetch_catalog(&self) -> AppResult<Vec<Prize>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Prize {
                id: "p1".to_string(),
                name: "Voucher".to_string(),
                icon: "🎁".to_string(),
                image_url: None,
                probability: 100.0,
                color: "#FFFFFF".to_string(),
                description: String::new(),
                category: "Other".to_string(),
            }])
        }
    }

    fn watcher_with_counting_cache() -> (SheetWatcher, Arc<StubClock>, Arc<CountingCatalog>) {
        let clock = Arc::new(StubClock {
            now: AtomicI64::new(1_000),
        });
        let catalog = Arc::new(CountingCatalog {
            fetches: AtomicUsize::new(0),
        });
        let wheel = WheelConfigService::new(catalog.clone(), Duration::from_secs(3600));
        let watcher = SheetWatcher::new(clock.clone(), wheel, Duration::from_secs(60));
        (watcher, clock, catalog)
    }

    #[tokio::test]
    async fn test_first_check_is_baseline_not_change() {
        let (watcher, _clock, _catalog) = watcher_with_counting_cache();
        assert!(!watcher.force_check().await.unwrap());
        assert_eq!(watcher.status().last_modified, 1_000);
    }

    #[tokio::test]
    async fn test_change_detection_clears_cache() {
        let (watcher, clock, catalog) = watcher_with_counting_cache();
        watcher.force_check().await.unwrap();

        // Warm the cache, then edit the sheet.
        watcher.inner.wheel.get_configuration().await.unwrap();
        watcher.inner.wheel.get_configuration().await.unwrap();
        assert_eq!(catalog.fetches.load(Ordering::SeqCst), 1);

        clock.now.store(2_000, Ordering::SeqCst);
        assert!(watcher.force_check().await.unwrap());

        watcher.inner.wheel.get_configuration().await.unwrap();
        assert_eq!(catalog.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unchanged_sheet_is_quiet() {
        let (watcher, _clock, _catalog) = watcher_with_counting_cache();
        watcher.force_check().await.unwrap();
        assert!(!watcher.force_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_start_stop_status() {
        let (watcher, _clock, _catalog) = watcher_with_counting_cache();
        assert!(!watcher.status().is_polling);
        watcher.start().await;
        assert!(watcher.status().is_polling);
        watcher.stop().await;
        assert!(!watcher.status().is_polling);
    }
}
