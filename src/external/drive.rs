use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;

use super::google_auth::ServiceAccountAuth;
use crate::error::{AppError, AppResult};
use crate::tasks::ModifiedTimeSource;

const DRIVE_API: &str = "https://www.googleapis.com/drive/v3/files";

pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.metadata.readonly";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileMetadata {
    modified_time: String,
}

/// Polls the Drive metadata of a spreadsheet file, used to find out when
/// the wheel sheet was last edited without downloading its contents.
pub struct GoogleDriveClient {
    client: Client,
    auth: Arc<ServiceAccountAuth>,
    file_id: String,
}

impl GoogleDriveClient {
    pub fn new(auth: Arc<ServiceAccountAuth>, file_id: String) -> Self {
        Self {
            client: Client::new(),
            auth,
            file_id,
        }
    }
}

#[async_trait]
impl ModifiedTimeSource for GoogleDriveClient {
    async fn modified_time_ms(&self) -> AppResult<i64> {
        let token = self.auth.access_token().await?;
        let url = format!("{DRIVE_API}/{}?fields=modifiedTime", self.file_id);
        let response = self.client.get(&url).bearer_auth(token).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApiError(format!(
                "Drive metadata lookup failed: {status} {body}"
            )));
        }
        let metadata: FileMetadata = response.json().await?;
        let parsed = DateTime::parse_from_rfc3339(&metadata.modified_time).map_err(|e| {
            AppError::ExternalApiError(format!(
                "Unparseable modifiedTime {:?}: {e}",
                metadata.modified_time
            ))
        })?;
        Ok(parsed.timestamp_millis())
    }
}
