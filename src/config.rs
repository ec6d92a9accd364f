use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub firebase: FirebaseConfig,
    #[serde(default)]
    pub wheel_sheet: WheelSheetConfig,
    #[serde(default)]
    pub sync_sheet: SyncSheetConfig,
    #[serde(default)]
    pub registration_sheet: RegistrationSheetConfig,
    #[serde(default)]
    pub experience_sheet: ExperienceSheetConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub game: GameConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Firebase Realtime Database (authoritative game state).
/// When `database_url` is empty the server falls back to a process-local
/// in-memory store, which loses state on restart.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FirebaseConfig {
    #[serde(default)]
    pub database_url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
}

/// Sheet the wheel prize catalog is read from.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WheelSheetConfig {
    #[serde(default)]
    pub spreadsheet_id: String,
    #[serde(default)]
    pub sheet_name: String,
    #[serde(default)]
    pub service_account_email: String,
    #[serde(default)]
    pub private_key: String,
}

/// Spreadsheet the spin log and player set are mirrored into.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SyncSheetConfig {
    #[serde(default)]
    pub spreadsheet_id: String,
    #[serde(default)]
    pub spins_sheet_name: String,
    #[serde(default)]
    pub players_sheet_name: String,
    #[serde(default)]
    pub service_account_email: String,
    #[serde(default)]
    pub private_key: String,
}

/// Sheet offer registrations are appended to.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RegistrationSheetConfig {
    #[serde(default)]
    pub spreadsheet_id: String,
    #[serde(default)]
    pub sheet_name: String,
    #[serde(default)]
    pub service_account_email: String,
    #[serde(default)]
    pub private_key: String,
}

/// Sheet experience-visit registrations are appended to.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExperienceSheetConfig {
    #[serde(default)]
    pub spreadsheet_id: String,
    #[serde(default)]
    pub sheet_name: String,
    #[serde(default)]
    pub service_account_email: String,
    #[serde(default)]
    pub private_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub app_password: String,
    /// Comma separated list of admin recipients.
    #[serde(default)]
    pub admin_emails: String,
    /// The notification send is raced against this timeout; the
    /// registration outcome is unaffected when it loses.
    pub send_timeout_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            username: String::new(),
            app_password: String::new(),
            admin_emails: String::new(),
            send_timeout_secs: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub max_spins_per_day: u32,
    pub catalog_cache_ttl_secs: u64,
    pub watcher_interval_secs: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_spins_per_day: 1,
            catalog_cache_ttl_secs: 5 * 60,
            watcher_interval_secs: 60,
        }
    }
}

impl EmailConfig {
    pub fn admin_recipients(&self) -> Vec<String> {
        let configured: Vec<String> = self
            .admin_emails
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if configured.is_empty() && !self.username.is_empty() {
            vec![self.username.clone()]
        } else {
            configured
        }
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str)
                    .map_err(|e| format!("Failed to parse config file: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // No config file: build entirely from environment variables.
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                Config {
                    server: ServerConfig {
                        host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    firebase: FirebaseConfig::default(),
                    wheel_sheet: WheelSheetConfig::default(),
                    sync_sheet: SyncSheetConfig::default(),
                    registration_sheet: RegistrationSheetConfig::default(),
                    experience_sheet: ExperienceSheetConfig::default(),
                    email: EmailConfig::default(),
                    game: GameConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        // Environment variables override the file in every case.
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("FIREBASE_DATABASE_URL") {
            config.firebase.database_url = v;
        }
        if let Ok(v) = env::var("FIREBASE_AUTH_TOKEN") {
            config.firebase.auth_token = Some(v);
        }
        if let Ok(v) = env::var("WHEEL_GOOGLE_SHEETS_ID") {
            config.wheel_sheet.spreadsheet_id = v;
        }
        if let Ok(v) = env::var("WHEEL_GOOGLE_SHEETS_NAME") {
            config.wheel_sheet.sheet_name = v;
        }
        if let Ok(v) = env::var("WHEEL_GOOGLE_SERVICE_ACCOUNT_EMAIL") {
            config.wheel_sheet.service_account_email = v;
        }
        if let Ok(v) = env::var("WHEEL_GOOGLE_PRIVATE_KEY") {
            config.wheel_sheet.private_key = v;
        }
        if let Ok(v) = env::var("SYNC_GOOGLE_SHEETS_ID") {
            config.sync_sheet.spreadsheet_id = v;
        }
        if let Ok(v) = env::var("SYNC_GOOGLE_SHEETS_NAME") {
            config.sync_sheet.spins_sheet_name = v;
        }
        if let Ok(v) = env::var("PLAYERS_GOOGLE_SHEETS_NAME") {
            config.sync_sheet.players_sheet_name = v;
        }
        if let Ok(v) = env::var("SYNC_GOOGLE_SERVICE_ACCOUNT_EMAIL") {
            config.sync_sheet.service_account_email = v;
        }
        if let Ok(v) = env::var("SYNC_GOOGLE_PRIVATE_KEY") {
            config.sync_sheet.private_key = v;
        }
        if let Ok(v) = env::var("REGISTRATION_GOOGLE_SHEETS_ID") {
            config.registration_sheet.spreadsheet_id = v;
        }
        if let Ok(v) = env::var("REGISTRATION_GOOGLE_SHEETS_NAME") {
            config.registration_sheet.sheet_name = v;
        }
        if let Ok(v) = env::var("REGISTRATION_GOOGLE_SERVICE_ACCOUNT_EMAIL") {
            config.registration_sheet.service_account_email = v;
        }
        if let Ok(v) = env::var("REGISTRATION_GOOGLE_PRIVATE_KEY") {
            config.registration_sheet.private_key = v;
        }
        if let Ok(v) = env::var("EXPERIENCE_GOOGLE_SHEETS_ID") {
            config.experience_sheet.spreadsheet_id = v;
        }
        if let Ok(v) = env::var("EXPERIENCE_GOOGLE_SHEETS_NAME") {
            config.experience_sheet.sheet_name = v;
        }
        if let Ok(v) = env::var("EXPERIENCE_GOOGLE_SERVICE_ACCOUNT_EMAIL") {
            config.experience_sheet.service_account_email = v;
        }
        if let Ok(v) = env::var("EXPERIENCE_GOOGLE_PRIVATE_KEY") {
            config.experience_sheet.private_key = v;
        }
        if let Ok(v) = env::var("EMAIL_SMTP_HOST") {
            config.email.smtp_host = v;
        }
        if let Ok(v) = env::var("EMAIL_SMTP_PORT")
            && let Ok(p) = v.parse()
        {
            config.email.smtp_port = p;
        }
        if let Ok(v) = env::var("EMAIL_USER") {
            config.email.username = v;
        }
        if let Ok(v) = env::var("EMAIL_APP_PASSWORD") {
            config.email.app_password = v;
        }
        if let Ok(v) = env::var("ADMIN_EMAILS") {
            config.email.admin_emails = v;
        }
        if let Ok(v) = env::var("EMAIL_SEND_TIMEOUT_SECS")
            && let Ok(n) = v.parse()
        {
            config.email.send_timeout_secs = n;
        }
        if let Ok(v) = env::var("GAME_MAX_SPINS_PER_DAY")
            && let Ok(n) = v.parse()
        {
            config.game.max_spins_per_day = n;
        }
        if let Ok(v) = env::var("CATALOG_CACHE_TTL_SECS")
            && let Ok(n) = v.parse()
        {
            config.game.catalog_cache_ttl_secs = n;
        }
        if let Ok(v) = env::var("WATCHER_INTERVAL_SECS")
            && let Ok(n) = v.parse()
        {
            config.game.watcher_interval_secs = n;
        }

        Ok(config)
    }
}
