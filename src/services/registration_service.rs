use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde_json::json;

use crate::config::RegistrationSheetConfig;
use crate::error::{AppError, AppResult};
use crate::models::{
    RegisterRequest, RegistrationEntry, RegistrationNotification, RegistrationResponse,
};
use crate::services::email_service::NotificationSender;
use crate::services::sync_service::{SheetsReader, SheetsWriter};
use crate::utils::{format_vietnam_time, generate_reservation_code, now_millis, validate_phone};

/// Offer-registration flow: validate, append one row to the registration
/// sheet, then notify the admins. The sheet append is the durable part;
/// the email is raced against a timeout and never fails the registration.
#[derive(Clone)]
pub struct RegistrationService {
    writer: Arc<dyn SheetsWriter>,
    reader: Arc<dyn SheetsReader>,
    notifier: Option<Arc<dyn NotificationSender>>,
    sheet_name: String,
    send_timeout: Duration,
}

/// Default cap on list responses when the caller sends no limit.
const DEFAULT_LIST_LIMIT: usize = 1000;

impl RegistrationService {
    pub fn new(
        writer: Arc<dyn SheetsWriter>,
        reader: Arc<dyn SheetsReader>,
        notifier: Option<Arc<dyn NotificationSender>>,
        config: &RegistrationSheetConfig,
        send_timeout: Duration,
    ) -> Self {
        let sheet_name = if config.sheet_name.is_empty() {
            "dang_ky_nhan_uu_dai".to_string()
        } else {
            config.sheet_name.clone()
        };
        Self {
            writer,
            reader,
            notifier,
            sheet_name,
            send_timeout,
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> AppResult<RegistrationResponse> {
        let full_name = request.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(AppError::ValidationError(
                "Full name must not be empty".to_string(),
            ));
        }
        let phone = validate_phone(&request.phone_number)?;

        let people_count = request.people_count.unwrap_or(1);
        if people_count < 1 {
            return Err(AppError::ValidationError(
                "People count must be at least 1".to_string(),
            ));
        }
        let arrival_time = match &request.arrival_time {
            Some(t) => {
                let time_regex = Regex::new(r"^([01]?\d|2[0-3]):[0-5]\d$").unwrap();
                if !time_regex.is_match(t) {
                    return Err(AppError::ValidationError(
                        "Invalid arrival time, HH:mm expected".to_string(),
                    ));
                }
                t.clone()
            }
            None => "TBD".to_string(),
        };

        let reservation_code = generate_reservation_code();
        let timestamp = format_vietnam_time(now_millis());

        self.writer
            .append_rows(
                &self.sheet_name,
                vec![vec![
                    json!(full_name),
                    json!(phone),
                    json!(reservation_code),
                    json!(timestamp),
                ]],
            )
            .await?;
        log::info!("Registration recorded: {reservation_code}");

        if let Some(notifier) = &self.notifier {
            let data = RegistrationNotification {
                full_name,
                phone_number: phone,
                address: request.address.map(|a| a.trim().to_string()),
                gender: request.gender,
                birth_date: request.birth_date,
                people_count,
                arrival_time,
                reservation_code: reservation_code.clone(),
                timestamp: timestamp.clone(),
            };
            // Email lives or dies on its own; the registration outcome is
            // already settled.
            match tokio::time::timeout(self.send_timeout, notifier.send_admin_notification(&data))
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::warn!("Admin notification failed: {e}"),
                Err(_) => log::warn!(
                    "Admin notification timed out after {:?}",
                    self.send_timeout
                ),
            }
        }

        Ok(RegistrationResponse {
            reservation_code,
            timestamp,
        })
    }

    /// Stored registrations, newest first. Rows append in submission
    /// order, so reversing the sheet yields the sort the admin page
    /// expects. Header or junk rows without a reservation code are
    /// skipped.
    pub async fn list_registrations(&self, limit: Option<usize>) -> AppResult<Vec<RegistrationEntry>> {
        let rows = self.reader.read_rows(&self.sheet_name).await?;
        let cap = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        let entries = rows
            .iter()
            .filter(|row| Self::is_data_row(row))
            .rev()
            .take(cap)
            .map(|row| {
                let cell = |i: usize| row.get(i).cloned().unwrap_or_default();
                RegistrationEntry {
                    full_name: cell(0),
                    phone_number: cell(1),
                    reservation_code: cell(2),
                    timestamp: cell(3),
                }
            })
            .collect();
        Ok(entries)
    }

    /// Total registrations on record, derived from the sheet itself so
    /// there is no second counter to drift.
    pub async fn registration_count(&self) -> AppResult<usize> {
        let rows = self.reader.read_rows(&self.sheet_name).await?;
        Ok(rows.iter().filter(|row| Self::is_data_row(row)).count())
    }

    fn is_data_row(row: &[String]) -> bool {
        row.get(2).is_some_and(|code| code.starts_with("ROCA"))
    }
}
