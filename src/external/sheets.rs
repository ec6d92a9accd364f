use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::google_auth::ServiceAccountAuth;
use crate::error::{AppError, AppResult};
use crate::models::Prize;
use crate::services::{CatalogSource, SheetsReader, SheetsWriter};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

pub const SHEETS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Thin client over the Sheets values API for a single spreadsheet.
pub struct GoogleSheetsClient {
    client: Client,
    auth: Arc<ServiceAccountAuth>,
    spreadsheet_id: String,
}

impl GoogleSheetsClient {
    pub fn new(auth: Arc<ServiceAccountAuth>, spreadsheet_id: String) -> Self {
        Self {
            client: Client::new(),
            auth,
            spreadsheet_id,
        }
    }

    async fn get_values(&self, range: &str) -> AppResult<Vec<Vec<String>>> {
        let token = self.auth.access_token().await?;
        let url = format!("{SHEETS_API}/{}/values/{range}", self.spreadsheet_id);
        let response = self.client.get(&url).bearer_auth(token).send().await?;
        if !response.status().is_success() {
            return Err(api_error("read", response).await);
        }
        let body: ValueRange = response.json().await?;
        Ok(body.values)
    }

    async fn clear_values(&self, range: &str) -> AppResult<()> {
        let token = self.auth.access_token().await?;
        let url = format!("{SHEETS_API}/{}/values/{range}:clear", self.spreadsheet_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({}))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error("clear", response).await);
        }
        Ok(())
    }

    async fn update_values(&self, range: &str, rows: &[Vec<serde_json::Value>]) -> AppResult<()> {
        let token = self.auth.access_token().await?;
        let url = format!(
            "{SHEETS_API}/{}/values/{range}?valueInputOption=RAW",
            self.spreadsheet_id
        );
        let response = self
            .client
            .put(&url)
            .bearer_auth(token)
            .json(&json!({ "values": rows }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error("update", response).await);
        }
        Ok(())
    }

    async fn append_values(&self, range: &str, rows: &[Vec<serde_json::Value>]) -> AppResult<()> {
        let token = self.auth.access_token().await?;
        let url = format!(
            "{SHEETS_API}/{}/values/{range}:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            self.spreadsheet_id
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "values": rows }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error("append", response).await);
        }
        Ok(())
    }
}

async fn api_error(action: &str, response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    AppError::ExternalApiError(format!("Sheets {action} failed: {status} {body}"))
}

fn column_letter(width: usize) -> char {
    // Our widest table is eight columns, well inside A..Z.
    (b'A' + (width.max(1) - 1).min(25) as u8) as char
}

#[async_trait]
impl SheetsWriter for GoogleSheetsClient {
    async fn replace_all(&self, sheet: &str, rows: Vec<Vec<serde_json::Value>>) -> AppResult<()> {
        let width = rows.first().map(Vec::len).unwrap_or(1);
        let last = column_letter(width);
        // Clearing the whole column span first guarantees a shrinking
        // table leaves no stale trailing rows behind.
        self.clear_values(&format!("{sheet}!A:{last}")).await?;
        if !rows.is_empty() {
            self.update_values(&format!("{sheet}!A1"), &rows).await?;
        }
        info!("Rewrote sheet {sheet} with {} rows", rows.len());
        Ok(())
    }

    async fn append_rows(&self, sheet: &str, rows: Vec<Vec<serde_json::Value>>) -> AppResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let width = rows.first().map(Vec::len).unwrap_or(1);
        let last = column_letter(width);
        self.append_values(&format!("{sheet}!A:{last}"), &rows).await
    }
}

#[async_trait]
impl SheetsReader for GoogleSheetsClient {
    async fn read_rows(&self, sheet: &str) -> AppResult<Vec<Vec<String>>> {
        self.get_values(&format!("{sheet}!A:F")).await
    }
}

/// Reads the prize catalog off a spreadsheet tab. Rows follow the layout
/// `id | name | icon | image | probability | description`.
pub struct WheelCatalogClient {
    sheets: GoogleSheetsClient,
    sheet_name: String,
}

impl WheelCatalogClient {
    pub fn new(auth: Arc<ServiceAccountAuth>, spreadsheet_id: String, sheet_name: String) -> Self {
        Self {
            sheets: GoogleSheetsClient::new(auth, spreadsheet_id),
            sheet_name,
        }
    }

    fn row_to_prize(index: usize, row: &[String]) -> Prize {
        let cell = |i: usize| row.get(i).map(String::as_str).unwrap_or("").trim().to_string();
        let id = match cell(0) {
            ref s if s.is_empty() => format!("prize-{}", index + 1),
            s => s,
        };
        let name = match cell(1) {
            ref s if s.is_empty() => "Mystery prize".to_string(),
            s => s,
        };
        let icon = match cell(2) {
            ref s if s.is_empty() => "🎁".to_string(),
            s => s,
        };
        let probability = cell(4).parse::<f64>().unwrap_or(5.0);
        let image_url = match cell(3) {
            ref s if s.is_empty() => None,
            s => Some(s),
        };
        Prize {
            id,
            name,
            icon,
            image_url,
            probability,
            color: "#FFFFFF".to_string(),
            description: cell(5),
            category: "Other".to_string(),
        }
    }
}

#[async_trait]
impl CatalogSource for WheelCatalogClient {
    async fn fetch_catalog(&self) -> AppResult<Vec<Prize>> {
        let range = format!("{}!A2:F", self.sheet_name);
        let rows = self.sheets.get_values(&range).await?;
        let prizes: Vec<Prize> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().any(|cell| !cell.trim().is_empty()))
            .map(|(i, row)| Self::row_to_prize(i, row))
            .collect();
        info!("Fetched {} prizes from sheet {}", prizes.len(), self.sheet_name);
        Ok(prizes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_to_prize_defaults() {
        let row = vec!["".to_string(), "".to_string()];
        let prize = WheelCatalogClient::row_to_prize(2, &row);
        assert_eq!(prize.id, "prize-3");
        assert_eq!(prize.name, "Mystery prize");
        assert_eq!(prize.icon, "🎁");
        assert_eq!(prize.probability, 5.0);
        assert_eq!(prize.color, "#FFFFFF");
    }

    #[test]
    fn test_row_to_prize_full_row() {
        let row: Vec<String> = ["p1", "Voucher", "🎫", "https://img", "12.5", "50k off"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let prize = WheelCatalogClient::row_to_prize(0, &row);
        assert_eq!(prize.id, "p1");
        assert_eq!(prize.name, "Voucher");
        assert_eq!(prize.image_url.as_deref(), Some("https://img"));
        assert_eq!(prize.probability, 12.5);
        assert_eq!(prize.description, "50k off");
    }

    #[test]
    fn test_row_to_prize_bad_probability_falls_back() {
        let row: Vec<String> = ["p1", "Voucher", "🎫", "", "lots", ""]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(WheelCatalogClient::row_to_prize(0, &row).probability, 5.0);
    }

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(1), 'A');
        assert_eq!(column_letter(4), 'D');
        assert_eq!(column_letter(8), 'H');
    }
}
