use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::tasks::SheetWatcher;

#[utoipa::path(
    get,
    path = "/auto-update",
    tag = "auto_update",
    responses(
        (status = 200, description = "Current watcher state", body = crate::tasks::WatcherStatus)
    )
)]
/// Current state of the catalog sheet watcher.
pub async fn status(watcher: web::Data<SheetWatcher>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": watcher.status() })))
}

#[utoipa::path(
    post,
    path = "/auto-update",
    tag = "auto_update",
    responses(
        (status = 200, description = "Watcher started")
    )
)]
/// Start polling the catalog sheet for edits.
pub async fn start(watcher: web::Data<SheetWatcher>) -> Result<HttpResponse> {
    watcher.start().await;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": watcher.status() })))
}

#[utoipa::path(
    delete,
    path = "/auto-update",
    tag = "auto_update",
    responses(
        (status = 200, description = "Watcher stopped")
    )
)]
/// Stop polling. Manual refreshes keep working.
pub async fn stop(watcher: web::Data<SheetWatcher>) -> Result<HttpResponse> {
    watcher.stop().await;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": watcher.status() })))
}

#[utoipa::path(
    patch,
    path = "/auto-update",
    tag = "auto_update",
    responses(
        (status = 200, description = "One check performed, reports whether the sheet changed"),
        (status = 502, description = "Drive metadata lookup failed")
    )
)]
/// Check the sheet once right now, regardless of the polling loop.
pub async fn force_check(watcher: web::Data<SheetWatcher>) -> Result<HttpResponse> {
    match watcher.force_check().await {
        Ok(changed) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "changed": changed, "status": watcher.status() }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// Route configuration
pub fn auto_update_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/auto-update")
            .route(web::get().to(status))
            .route(web::post().to(start))
            .route(web::delete().to(stop))
            .route(web::patch().to(force_check)),
    );
}
