use std::time::{Duration, Instant};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{AppError, AppResult};

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Google service-account authentication: a signed RS256 assertion is
/// exchanged for a short-lived OAuth2 access token, cached until shortly
/// before expiry.
pub struct ServiceAccountAuth {
    client: Client,
    email: String,
    private_key: String,
    scope: String,
    token: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(email: String, private_key: String, scope: String) -> Self {
        Self {
            client: Client::new(),
            email,
            // Keys arriving through environment variables have their
            // newlines escaped.
            private_key: private_key.replace("\\n", "\n"),
            scope,
            token: Mutex::new(None),
        }
    }

    pub async fn access_token(&self) -> AppResult<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && token.expires_at > Instant::now()
        {
            return Ok(token.access_token.clone());
        }

        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &self.email,
            scope: &self.scope,
            aud: TOKEN_URL,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())?;
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)?;

        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApiError(format!(
                "Token exchange failed: {status} {body}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        // Refresh a minute early so in-flight requests never carry an
        // expired token.
        let lifetime = Duration::from_secs(token.expires_in.saturating_sub(60));
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }
}
