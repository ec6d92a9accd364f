use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::models::*;
use crate::services::ExperienceService;

#[utoipa::path(
    post,
    path = "/experience",
    tag = "registration",
    request_body = ExperienceRequest,
    responses(
        (status = 200, description = "Booking notified and archived"),
        (status = 400, description = "Invalid booking details"),
        (status = 500, description = "Admin notification could not be delivered")
    )
)]
/// Book an experience visit:
/// 1. Validate name and phone
/// 2. Email the admins, a failed send fails the booking
/// 3. Archive the row to the experience sheet, best effort
pub async fn book_experience(
    service: web::Data<ExperienceService>,
    body: web::Json<ExperienceRequest>,
) -> Result<HttpResponse> {
    match service.submit(body.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Experience booking received",
            "timestamp": data.timestamp
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// Route configuration
pub fn experience_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/experience", web::post().to(book_experience));
}
