use actix_cors::Cors;

pub fn create_cors() -> Cors {
    Cors::default()
        .allowed_origin_fn(|_, _req_head| {
            // Promotion pages are served from rotating campaign domains,
            // so the origin list lives outside the backend.
            true
        })
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"])
        .allow_any_header()
        .max_age(3600)
}
