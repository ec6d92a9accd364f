use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::EmailConfig;
use crate::error::{AppError, AppResult};
use crate::models::{ExperienceNotification, RegistrationNotification};

/// Admin notification channel. The caller imposes its own timeout around
/// the send methods; implementations must not leave dangling resources
/// when the future is dropped.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_admin_notification(&self, data: &RegistrationNotification) -> AppResult<()>;
    async fn send_experience_notification(&self, data: &ExperienceNotification) -> AppResult<()>;
}

/// SMTP notifier. Admins are addressed via BCC so recipients do not see
/// each other.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: EmailConfig,
}

impl SmtpNotifier {
    pub fn new(config: EmailConfig) -> AppResult<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| AppError::EmailError(format!("SMTP relay setup failed: {e}")))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.app_password.clone(),
            ))
            .build();
        Ok(Self { transport, config })
    }

    fn render_html(data: &RegistrationNotification) -> String {
        let optional_row = |label: &str, value: &Option<String>| match value {
            Some(v) if !v.is_empty() => format!(
                "<tr><td style=\"padding:8px;border:1px solid #F59E0B;font-weight:bold\">{label}</td>\
                 <td style=\"padding:8px;border:1px solid #F59E0B\">{v}</td></tr>"
            ),
            _ => String::new(),
        };

        format!(
            "<div style=\"font-family:Arial,sans-serif;max-width:600px;margin:0 auto\">\
             <h1 style=\"background:#D97706;color:#fff;padding:16px;text-align:center\">New offer registration</h1>\
             <table style=\"width:100%;border-collapse:collapse\">\
             <tr><td style=\"padding:8px;border:1px solid #F59E0B;font-weight:bold\">Full name</td>\
             <td style=\"padding:8px;border:1px solid #F59E0B\">{name}</td></tr>\
             <tr><td style=\"padding:8px;border:1px solid #F59E0B;font-weight:bold\">Phone</td>\
             <td style=\"padding:8px;border:1px solid #F59E0B\">{phone}</td></tr>\
             {address}{gender}{birth_date}\
             <tr><td style=\"padding:8px;border:1px solid #F59E0B;font-weight:bold\">People</td>\
             <td style=\"padding:8px;border:1px solid #F59E0B\">{people}</td></tr>\
             <tr><td style=\"padding:8px;border:1px solid #F59E0B;font-weight:bold\">Arrival</td>\
             <td style=\"padding:8px;border:1px solid #F59E0B\">{arrival}</td></tr>\
             <tr><td style=\"padding:8px;border:1px solid #F59E0B;font-weight:bold\">Reservation code</td>\
             <td style=\"padding:8px;border:1px solid #F59E0B\"><strong>{code}</strong></td></tr>\
             <tr><td style=\"padding:8px;border:1px solid #F59E0B;font-weight:bold\">Registered at</td>\
             <td style=\"padding:8px;border:1px solid #F59E0B\">{timestamp}</td></tr>\
             </table></div>",
            name = data.full_name,
            phone = data.phone_number,
            address = optional_row("Address", &data.address),
            gender = optional_row("Gender", &data.gender),
            birth_date = optional_row("Date of birth", &data.birth_date),
            people = data.people_count,
            arrival = data.arrival_time,
            code = data.reservation_code,
            timestamp = data.timestamp,
        )
    }

    fn render_experience_html(data: &ExperienceNotification) -> String {
        let value_or = |value: &Option<String>, fallback: &str| match value {
            Some(v) if !v.is_empty() => v.clone(),
            _ => fallback.to_string(),
        };

        format!(
            "<div style=\"font-family:Arial,sans-serif;max-width:600px;margin:0 auto\">\
             <h1 style=\"background:#10B981;color:#fff;padding:16px;text-align:center\">New experience booking</h1>\
             <table style=\"width:100%;border-collapse:collapse\">\
             <tr><td style=\"padding:8px;border:1px solid #10B981;font-weight:bold\">Name</td>\
             <td style=\"padding:8px;border:1px solid #10B981\">{name}</td></tr>\
             <tr><td style=\"padding:8px;border:1px solid #10B981;font-weight:bold\">Age</td>\
             <td style=\"padding:8px;border:1px solid #10B981\">{age}</td></tr>\
             <tr><td style=\"padding:8px;border:1px solid #10B981;font-weight:bold\">Phone</td>\
             <td style=\"padding:8px;border:1px solid #10B981\">{phone}</td></tr>\
             <tr><td style=\"padding:8px;border:1px solid #10B981;font-weight:bold\">Preferred schedule</td>\
             <td style=\"padding:8px;border:1px solid #10B981\">{schedule}</td></tr>\
             <tr><td style=\"padding:8px;border:1px solid #10B981;font-weight:bold\">Notes</td>\
             <td style=\"padding:8px;border:1px solid #10B981\">{description}</td></tr>\
             <tr><td style=\"padding:8px;border:1px solid #10B981;font-weight:bold\">Submitted at</td>\
             <td style=\"padding:8px;border:1px solid #10B981\">{timestamp}</td></tr>\
             </table></div>",
            name = data.name,
            age = value_or(&data.age, "Not provided"),
            phone = data.phone,
            schedule = value_or(&data.schedule, "Not provided"),
            description = value_or(&data.description, "Not provided"),
            timestamp = data.timestamp,
        )
    }

    async fn send_to_admins(&self, subject: String, html: String) -> AppResult<()> {
        let recipients = self.config.admin_recipients();
        if recipients.is_empty() {
            return Err(AppError::EmailError(
                "No admin emails configured".to_string(),
            ));
        }

        let from = self
            .config
            .username
            .parse()
            .map_err(|e| AppError::EmailError(format!("Invalid sender address: {e}")))?;
        let mut builder = Message::builder()
            .from(from)
            .subject(subject)
            .header(ContentType::TEXT_HTML);
        for recipient in &recipients {
            let bcc = recipient
                .parse()
                .map_err(|e| AppError::EmailError(format!("Invalid admin address: {e}")))?;
            builder = builder.bcc(bcc);
        }
        // `to` mirrors the sender so the BCC-only delivery is not flagged.
        let to = self
            .config
            .username
            .parse()
            .map_err(|e| AppError::EmailError(format!("Invalid sender address: {e}")))?;
        let message = builder
            .to(to)
            .body(html)
            .map_err(|e| AppError::EmailError(format!("Failed to build message: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::EmailError(format!("SMTP send failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl NotificationSender for SmtpNotifier {
    async fn send_admin_notification(&self, data: &RegistrationNotification) -> AppResult<()> {
        self.send_to_admins(
            format!(
                "New registration {} - {}",
                data.reservation_code, data.full_name
            ),
            Self::render_html(data),
        )
        .await?;
        log::info!(
            "Admin notification sent for registration {}",
            data.reservation_code
        );
        Ok(())
    }

    async fn send_experience_notification(&self, data: &ExperienceNotification) -> AppResult<()> {
        self.send_to_admins(
            format!("New experience booking - {}", data.name),
            Self::render_experience_html(data),
        )
        .await?;
        log::info!("Experience notification sent for {}", data.phone);
        Ok(())
    }
}
