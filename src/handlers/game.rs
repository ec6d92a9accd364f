use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::models::*;
use crate::services::{GameService, WheelConfigService};

/// The wheel renders a fixed number of slots; anything beyond is reported
/// in the total but not returned.
const MAX_WHEEL_SLOTS: usize = 20;

fn wheel_response(mut prizes: Vec<Prize>) -> WheelConfigResponse {
    let total_prizes = prizes.len();
    prizes.truncate(MAX_WHEEL_SLOTS);
    WheelConfigResponse {
        prizes,
        total_prizes,
    }
}

#[utoipa::path(
    post,
    path = "/game/spin",
    tag = "game",
    request_body = SpinRequest,
    responses(
        (status = 200, description = "Spin resolved, either won or blocked", body = SpinOutcome),
        (status = 400, description = "Invalid player details"),
        (status = 503, description = "Store or prize catalog unavailable")
    )
)]
/// Play one spin:
/// 1. Validate and normalize the player details
/// 2. Look up or register the player, refresh the profile
/// 3. Check today's quota
/// 4. Pick a prize by weight and commit the spin atomically
pub async fn spin(
    service: web::Data<GameService>,
    body: web::Json<SpinRequest>,
) -> Result<HttpResponse> {
    match service.spin(body.into_inner()).await {
        Ok(outcome) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": outcome }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/game/recent-spins",
    tag = "game",
    params(
        ("limit" = Option<usize>, Query, description = "Maximum records returned (default 1000)")
    ),
    responses(
        (status = 200, description = "Recent spins, newest first", body = [SpinRecord])
    )
)]
/// List recent spin records, newest first.
pub async fn recent_spins(
    service: web::Data<GameService>,
    query: web::Query<RecentSpinsQuery>,
) -> Result<HttpResponse> {
    match service.recent_spins(query.limit).await {
        Ok(records) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": records }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/game/wheel-config",
    tag = "game",
    params(
        ("refresh" = Option<bool>, Query, description = "Bypass the catalog cache")
    ),
    responses(
        (status = 200, description = "Current prize catalog", body = WheelConfigResponse),
        (status = 503, description = "No catalog available")
    )
)]
/// The current prize catalog as the wheel should render it.
pub async fn wheel_config(
    wheel: web::Data<WheelConfigService>,
    query: web::Query<WheelConfigQuery>,
) -> Result<HttpResponse> {
    let result = if query.refresh.unwrap_or(false) {
        wheel.force_refresh().await
    } else {
        wheel.get_configuration().await
    };
    match result {
        Ok(prizes) => {
            Ok(HttpResponse::Ok().json(json!({ "success": true, "data": wheel_response(prizes) })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/game/stats",
    tag = "game",
    responses(
        (status = 200, description = "Aggregate game counters", body = GameStats)
    )
)]
/// Aggregate counters for the admin dashboard. Display-only numbers.
pub async fn stats(service: web::Data<GameService>) -> Result<HttpResponse> {
    match service.stats().await {
        Ok(stats) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": stats.sanitized() }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// Route configuration
pub fn game_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/game")
            .route("/spin", web::post().to(spin))
            .route("/recent-spins", web::get().to(recent_spins))
            .route("/wheel-config", web::get().to(wheel_config))
            .route("/stats", web::get().to(stats)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prize(n: usize) -> Prize {
        Prize {
            id: format!("p{n}"),
            name: format!("Prize {n}"),
            icon: "🎁".to_string(),
            image_url: None,
            probability: 1.0,
            color: "#FFFFFF".to_string(),
            description: String::new(),
            category: "Khác".to_string(),
        }
    }

    #[test]
    fn test_wheel_response_caps_slots_but_reports_full_count() {
        let catalog: Vec<Prize> = (0..25).map(prize).collect();
        let response = wheel_response(catalog);
        assert_eq!(response.prizes.len(), MAX_WHEEL_SLOTS);
        assert_eq!(response.total_prizes, 25);
        // Catalog order is preserved; the tail is what gets dropped.
        assert_eq!(response.prizes[0].id, "p0");
        assert_eq!(response.prizes[19].id, "p19");
    }

    #[test]
    fn test_wheel_response_small_catalog_untouched() {
        let catalog: Vec<Prize> = (0..3).map(prize).collect();
        let response = wheel_response(catalog);
        assert_eq!(response.prizes.len(), 3);
        assert_eq!(response.total_prizes, 3);
    }
}
