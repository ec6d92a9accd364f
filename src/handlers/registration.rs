use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::models::*;
use crate::services::RegistrationService;

#[utoipa::path(
    post,
    path = "/register",
    tag = "registration",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Reservation recorded", body = RegistrationResponse),
        (status = 400, description = "Invalid registration details"),
        (status = 502, description = "Registration sheet unreachable")
    )
)]
/// Register a promotion reservation:
/// 1. Validate the contact details
/// 2. Issue a reservation code and append the row to the sheet
/// 3. Notify the admins by email, best effort with a timeout
pub async fn register(
    service: web::Data<RegistrationService>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    match service.register(body.into_inner()).await {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": result }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/registration",
    tag = "registration",
    params(
        ("limit" = Option<usize>, Query, description = "Maximum entries to return, default 1000")
    ),
    responses(
        (status = 200, description = "Registrations, newest first", body = [RegistrationEntry]),
        (status = 502, description = "Registration sheet unreachable")
    )
)]
/// List stored registrations, newest first
pub async fn list_registrations(
    service: web::Data<RegistrationService>,
    query: web::Query<RegistrationListQuery>,
) -> Result<HttpResponse> {
    match service.list_registrations(query.limit).await {
        Ok(entries) => {
            let count = entries.len();
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": entries,
                "count": count
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/registration-count",
    tag = "registration",
    responses(
        (status = 200, description = "Total registrations on record"),
        (status = 502, description = "Registration sheet unreachable")
    )
)]
/// Total registrations on record
pub async fn registration_count(service: web::Data<RegistrationService>) -> Result<HttpResponse> {
    match service.registration_count().await {
        Ok(count) => Ok(HttpResponse::Ok().json(json!({ "success": true, "count": count }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// Route configuration
pub fn registration_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/register", web::post().to(register))
        .route("/registration", web::get().to(list_registrations))
        .route("/registration-count", web::get().to(registration_count));
}
