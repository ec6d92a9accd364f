pub mod watcher;

pub use watcher::*;

use log::info;

use crate::services::SyncService;

/// Launches the long-lived background workers: the mirror-sync queue
/// consumer and the catalog sheet watcher. `SheetWatcher::start` spawns
/// its own polling task and returns promptly.
pub async fn spawn_all(sync_service: SyncService, watcher: SheetWatcher) {
    tokio::spawn(async move {
        sync_service.run_worker().await;
    });
    watcher.start().await;
    info!("Background tasks started");
}
