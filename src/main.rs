use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;
use std::time::Duration;

use coop_wheel_backend::{
    config::Config,
    database::{FirebaseDatabase, MemoryDatabase, SharedDatabase},
    external::{
        DRIVE_READONLY_SCOPE, GoogleDriveClient, GoogleSheetsClient, SHEETS_READONLY_SCOPE,
        SHEETS_SCOPE, ServiceAccountAuth, WheelCatalogClient,
    },
    handlers,
    middlewares::create_cors,
    services::*,
    swagger::swagger_config,
    tasks,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration file");

    // Authoritative game store. Without a Firebase URL the server keeps
    // state in memory, which is enough for local development.
    let db: SharedDatabase = if config.firebase.database_url.is_empty() {
        log::warn!("No Firebase database URL configured, game state is kept in memory");
        Arc::new(MemoryDatabase::new())
    } else {
        Arc::new(FirebaseDatabase::new(config.firebase.clone()))
    };

    // One service-account session per spreadsheet, scoped to what each
    // needs.
    let wheel_auth = Arc::new(ServiceAccountAuth::new(
        config.wheel_sheet.service_account_email.clone(),
        config.wheel_sheet.private_key.clone(),
        SHEETS_READONLY_SCOPE.to_string(),
    ));
    let drive_auth = Arc::new(ServiceAccountAuth::new(
        config.wheel_sheet.service_account_email.clone(),
        config.wheel_sheet.private_key.clone(),
        DRIVE_READONLY_SCOPE.to_string(),
    ));
    let sync_auth = Arc::new(ServiceAccountAuth::new(
        config.sync_sheet.service_account_email.clone(),
        config.sync_sheet.private_key.clone(),
        SHEETS_SCOPE.to_string(),
    ));
    let registration_auth = Arc::new(ServiceAccountAuth::new(
        config.registration_sheet.service_account_email.clone(),
        config.registration_sheet.private_key.clone(),
        SHEETS_SCOPE.to_string(),
    ));
    let experience_auth = Arc::new(ServiceAccountAuth::new(
        config.experience_sheet.service_account_email.clone(),
        config.experience_sheet.private_key.clone(),
        SHEETS_SCOPE.to_string(),
    ));

    let wheel_sheet_name = if config.wheel_sheet.sheet_name.is_empty() {
        "Sheet1".to_string()
    } else {
        config.wheel_sheet.sheet_name.clone()
    };
    let catalog_source = Arc::new(WheelCatalogClient::new(
        wheel_auth,
        config.wheel_sheet.spreadsheet_id.clone(),
        wheel_sheet_name,
    ));
    let wheel_service = WheelConfigService::new(
        catalog_source,
        Duration::from_secs(config.game.catalog_cache_ttl_secs),
    );

    let sync_writer = Arc::new(GoogleSheetsClient::new(
        sync_auth,
        config.sync_sheet.spreadsheet_id.clone(),
    ));
    let sync_service = SyncService::new(db.clone(), sync_writer, &config.sync_sheet);

    let game_service = GameService::new(
        db.clone(),
        wheel_service.clone(),
        sync_service.clone(),
        config.game.max_spins_per_day,
    );

    let notifier: Option<Arc<dyn NotificationSender>> =
        if config.email.username.is_empty() || config.email.app_password.is_empty() {
            log::warn!("Email credentials not configured, registration notifications disabled");
            None
        } else {
            match SmtpNotifier::new(config.email.clone()) {
                Ok(notifier) => Some(Arc::new(notifier)),
                Err(e) => {
                    log::error!("SMTP transport setup failed, notifications disabled: {e}");
                    None
                }
            }
        };
    let registration_writer = Arc::new(GoogleSheetsClient::new(
        registration_auth,
        config.registration_sheet.spreadsheet_id.clone(),
    ));
    let registration_service = RegistrationService::new(
        registration_writer.clone(),
        registration_writer,
        notifier.clone(),
        &config.registration_sheet,
        Duration::from_secs(config.email.send_timeout_secs),
    );
    let experience_writer = Arc::new(GoogleSheetsClient::new(
        experience_auth,
        config.experience_sheet.spreadsheet_id.clone(),
    ));
    let experience_service = ExperienceService::new(
        experience_writer,
        notifier,
        &config.experience_sheet,
        Duration::from_secs(config.email.send_timeout_secs),
    );

    let modified_source = Arc::new(GoogleDriveClient::new(
        drive_auth,
        config.wheel_sheet.spreadsheet_id.clone(),
    ));
    let watcher = tasks::SheetWatcher::new(
        modified_source,
        wheel_service.clone(),
        Duration::from_secs(config.game.watcher_interval_secs),
    );

    tasks::spawn_all(sync_service.clone(), watcher.clone()).await;

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .app_data(web::Data::new(game_service.clone()))
            .app_data(web::Data::new(wheel_service.clone()))
            .app_data(web::Data::new(sync_service.clone()))
            .app_data(web::Data::new(registration_service.clone()))
            .app_data(web::Data::new(experience_service.clone()))
            .app_data(web::Data::new(watcher.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api")
                    .configure(handlers::game_config)
                    .configure(handlers::registration_config)
                    .configure(handlers::experience_config)
                    .configure(handlers::sync_config)
                    .configure(handlers::auto_update_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
