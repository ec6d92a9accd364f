use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::config::ExperienceSheetConfig;
use crate::error::{AppError, AppResult};
use crate::models::{ExperienceNotification, ExperienceRequest};
use crate::services::email_service::NotificationSender;
use crate::services::sync_service::SheetsWriter;
use crate::utils::{format_vietnam_time, now_millis, validate_phone};

/// Experience-visit bookings: validate, notify the admins, then archive
/// one row to the experience sheet. Unlike offer registrations the email
/// is the payload here, so a failed or timed-out send fails the booking;
/// the sheet append afterwards is best effort.
#[derive(Clone)]
pub struct ExperienceService {
    writer: Arc<dyn SheetsWriter>,
    notifier: Option<Arc<dyn NotificationSender>>,
    sheet_name: String,
    send_timeout: Duration,
}

impl ExperienceService {
    pub fn new(
        writer: Arc<dyn SheetsWriter>,
        notifier: Option<Arc<dyn NotificationSender>>,
        config: &ExperienceSheetConfig,
        send_timeout: Duration,
    ) -> Self {
        let sheet_name = if config.sheet_name.is_empty() {
            "dang_ky_trai_nghiem".to_string()
        } else {
            config.sheet_name.clone()
        };
        Self {
            writer,
            notifier,
            sheet_name,
            send_timeout,
        }
    }

    pub async fn submit(&self, request: ExperienceRequest) -> AppResult<ExperienceNotification> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::ValidationError(
                "Name must not be empty".to_string(),
            ));
        }
        let phone = validate_phone(&request.phone)?;

        let trimmed = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let data = ExperienceNotification {
            name,
            phone,
            age: trimmed(request.age),
            schedule: trimmed(request.schedule),
            description: trimmed(request.description),
            timestamp: format_vietnam_time(now_millis()),
        };

        let notifier = self.notifier.as_ref().ok_or_else(|| {
            AppError::EmailError("Experience notifications are not configured".to_string())
        })?;
        match tokio::time::timeout(
            self.send_timeout,
            notifier.send_experience_notification(&data),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(AppError::EmailError(format!(
                    "Experience notification timed out after {:?}",
                    self.send_timeout
                )));
            }
        }

        let cell = |value: &Option<String>| json!(value.clone().unwrap_or_default());
        if let Err(e) = self
            .writer
            .append_rows(
                &self.sheet_name,
                vec![vec![
                    json!(data.timestamp),
                    json!(data.name),
                    cell(&data.age),
                    json!(data.phone),
                    cell(&data.schedule),
                    cell(&data.description),
                ]],
            )
            .await
        {
            // The admins already have the email; a missing archive row is
            // recoverable by hand.
            log::warn!("Experience sheet append failed: {e}");
        }
        log::info!("Experience booking recorded for {}", data.phone);

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    use crate::models::RegistrationNotification;

    #[derive(Default)]
    struct RecordingWriter {
        sheets: Mutex<HashMap<String, Vec<Vec<Value>>>>,
        fail: bool,
    }

    #[async_trait]
    impl SheetsWriter for RecordingWriter {
        async fn replace_all(&self, sheet: &str, rows: Vec<Vec<Value>>) -> AppResult<()> {
            self.sheets.lock().await.insert(sheet.to_string(), rows);
            Ok(())
        }

        async fn append_rows(&self, sheet: &str, rows: Vec<Vec<Value>>) -> AppResult<()> {
            if self.fail {
                return Err(AppError::ExternalApiError("append refused".to_string()));
            }
            self.sheets
                .lock()
                .await
                .entry(sheet.to_string())
                .or_default()
                .extend(rows);
            Ok(())
        }
    }

    struct StubNotifier {
        sent: AtomicUsize,
        fail: bool,
    }

    impl StubNotifier {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                sent: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                sent: AtomicUsize::new(0),
                fail: true,
            })
        }
    }

    #[async_trait]
    impl NotificationSender for StubNotifier {
        async fn send_admin_notification(
            &self,
            _data: &RegistrationNotification,
        ) -> AppResult<()> {
            Ok(())
        }

        async fn send_experience_notification(
            &self,
            _data: &ExperienceNotification,
        ) -> AppResult<()> {
            if self.fail {
                return Err(AppError::EmailError("SMTP refused".to_string()));
            }
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn request() -> ExperienceRequest {
        ExperienceRequest {
            name: "Trần Thị Bình".to_string(),
            phone: "0987 654 321".to_string(),
            age: Some("27".to_string()),
            schedule: Some("Saturday morning".to_string()),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_submit_sends_email_then_appends_row() {
        let writer = Arc::new(RecordingWriter::default());
        let notifier = StubNotifier::ok();
        let service = ExperienceService::new(
            writer.clone(),
            Some(notifier.clone()),
            &ExperienceSheetConfig::default(),
            Duration::from_secs(8),
        );

        let data = service.submit(request()).await.unwrap();
        assert_eq!(data.phone, "0987654321");
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 1);

        let sheets = writer.sheets.lock().await;
        let rows = sheets.get("dang_ky_trai_nghiem").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1], serde_json::json!("Trần Thị Bình"));
        assert_eq!(rows[0][3], serde_json::json!("0987654321"));
    }

    #[tokio::test]
    async fn test_failed_email_fails_booking_and_skips_sheet() {
        let writer = Arc::new(RecordingWriter::default());
        let service = ExperienceService::new(
            writer.clone(),
            Some(StubNotifier::failing()),
            &ExperienceSheetConfig::default(),
            Duration::from_secs(8),
        );

        assert!(matches!(
            service.submit(request()).await,
            Err(AppError::EmailError(_))
        ));
        assert!(writer.sheets.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_notifier_rejects_booking() {
        let writer = Arc::new(RecordingWriter::default());
        let service = ExperienceService::new(
            writer,
            None,
            &ExperienceSheetConfig::default(),
            Duration::from_secs(8),
        );

        assert!(matches!(
            service.submit(request()).await,
            Err(AppError::EmailError(_))
        ));
    }

    #[tokio::test]
    async fn test_sheet_failure_does_not_fail_booking() {
        let writer = Arc::new(RecordingWriter {
            sheets: Mutex::new(HashMap::new()),
            fail: true,
        });
        let service = ExperienceService::new(
            writer,
            Some(StubNotifier::ok()),
            &ExperienceSheetConfig::default(),
            Duration::from_secs(8),
        );

        assert!(service.submit(request()).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_phone_rejected_before_email() {
        let notifier = StubNotifier::ok();
        let service = ExperienceService::new(
            Arc::new(RecordingWriter::default()),
            Some(notifier.clone()),
            &ExperienceSheetConfig::default(),
            Duration::from_secs(8),
        );

        let mut bad = request();
        bad.phone = "12345".to_string();
        assert!(matches!(
            service.submit(bad).await,
            Err(AppError::ValidationError(_))
        ));
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 0);
    }
}
