use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::services::{GameService, SyncService};

#[utoipa::path(
    post,
    path = "/sync/sheets",
    tag = "sync",
    responses(
        (status = 200, description = "Mirror sync finished, or one was already running"),
        (status = 502, description = "Sheets API rejected the rewrite")
    )
)]
/// Rewrite the spreadsheet mirror from the store right now. When a sync is
/// already in flight this returns without starting a second one.
pub async fn sync_sheets(service: web::Data<SyncService>) -> Result<HttpResponse> {
    match service.sync_all().await {
        Ok(true) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Sheets mirror updated"
        }))),
        Ok(false) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "A sync is already in progress"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/sync/reset",
    tag = "sync",
    responses(
        (status = 200, description = "Aggregate counters zeroed and mirror rewritten"),
        (status = 502, description = "Sheets API rejected the rewrite"),
        (status = 503, description = "Store unavailable")
    )
)]
/// Zero the aggregate game counters and rewrite the mirror from the
/// current store state. Players and spin history are kept.
pub async fn reset_stats(
    service: web::Data<GameService>,
    sync: web::Data<SyncService>,
) -> Result<HttpResponse> {
    if let Err(e) = service.reset_stats().await {
        return Ok(e.error_response());
    }
    match sync.sync_all().await {
        Ok(_) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Game stats reset and mirror resynced"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// Route configuration
pub fn sync_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/sync")
            .route("/sheets", web::post().to(sync_sheets))
            .route("/reset", web::post().to(reset_stats)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncSheetConfig;
    use crate::database::{MemoryDatabase, StatsStore};
    use crate::error::AppResult;
    use crate::models::{Prize, StatsDelta};
    use crate::services::{CatalogSource, SheetsWriter, WheelConfigService};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingWriter {
        sheets: Mutex<HashMap<String, Vec<Vec<Value>>>>,
    }

    #[async_trait]
    impl SheetsWriter for RecordingWriter {
        async fn replace_all(&self, sheet: &str, rows: Vec<Vec<Value>>) -> AppResult<()> {
            self.sheets.lock().await.insert(sheet.to_string(), rows);
            Ok(())
        }

        async fn append_rows(&self, sheet: &str, rows: Vec<Vec<Value>>) -> AppResult<()> {
            self.sheets
                .lock()
                .await
                .entry(sheet.to_string())
                .or_default()
                .extend(rows);
            Ok(())
        }
    }

    struct EmptyCatalog;

    #[async_trait]
    impl CatalogSource for EmptyCatalog {
        async fn fetch_catalog(&self) -> AppResult<Vec<Prize>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_reset_zeros_stats_and_rewrites_mirror() {
        let db = Arc::new(MemoryDatabase::new());
        db.increment_stats(StatsDelta {
            players: 3,
            spins: 5,
            prizes_won: 5,
            scores: 0,
        })
        .await
        .unwrap();

        let writer = Arc::new(RecordingWriter::default());
        let sync = SyncService::new(db.clone(), writer.clone(), &SyncSheetConfig::default());
        let wheel = WheelConfigService::new(Arc::new(EmptyCatalog), Duration::from_secs(300));
        let game = GameService::new(db.clone(), wheel, sync.clone(), 1);

        let response = reset_stats(web::Data::new(game), web::Data::new(sync))
            .await
            .unwrap();
        assert!(response.status().is_success());

        let stats = db.get_stats().await.unwrap();
        assert_eq!(stats.total_players, 0);
        assert_eq!(stats.total_spins, 0);

        // Both mirror sheets were rewritten (header rows only, empty store).
        let sheets = writer.sheets.lock().await;
        assert_eq!(sheets.get("RecentSpins").unwrap().len(), 1);
        assert_eq!(sheets.get("RecentSpins_Players").unwrap().len(), 1);
    }
}
