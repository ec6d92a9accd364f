use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;
use crate::tasks::WatcherStatus;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::game::spin,
        handlers::game::recent_spins,
        handlers::game::wheel_config,
        handlers::game::stats,
        handlers::registration::register,
        handlers::registration::list_registrations,
        handlers::registration::registration_count,
        handlers::experience::book_experience,
        handlers::sync::sync_sheets,
        handlers::sync::reset_stats,
        handlers::auto_update::status,
        handlers::auto_update::start,
        handlers::auto_update::stop,
        handlers::auto_update::force_check,
    ),
    components(
        schemas(
            Player,
            Gender,
            ProfileUpdate,
            Prize,
            SpinRecord,
            GameStats,
            SpinRequest,
            SpinOutcome,
            WheelConfigResponse,
            RegisterRequest,
            RegistrationResponse,
            RegistrationEntry,
            ExperienceRequest,
            WatcherStatus,
            ApiError,
        )
    ),
    tags(
        (name = "game", description = "Spin wheel game API"),
        (name = "registration", description = "Offer registration API"),
        (name = "sync", description = "Spreadsheet mirror API"),
        (name = "auto_update", description = "Catalog watcher API"),
    ),
    info(
        title = "Coop Wheel Backend API",
        version = "1.0.0",
        description = "Promotion spin-wheel backend REST API documentation"
    ),
    servers(
        (url = "/api", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
