use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Offer registration submitted from the landing page contact form.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub phone_number: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub people_count: Option<u32>,
    /// Expected arrival time, HH:mm.
    #[serde(default)]
    pub arrival_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub reservation_code: String,
    pub timestamp: String,
}

/// One stored registration row, newest first in list responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationEntry {
    pub full_name: String,
    pub phone_number: String,
    pub reservation_code: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationListQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Experience-visit signup from the booking form.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceRequest {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Everything the experience notification email template needs.
#[derive(Debug, Clone)]
pub struct ExperienceNotification {
    pub name: String,
    pub phone: String,
    pub age: Option<String>,
    pub schedule: Option<String>,
    pub description: Option<String>,
    pub timestamp: String,
}

/// Everything the admin notification email template needs.
#[derive(Debug, Clone)]
pub struct RegistrationNotification {
    pub full_name: String,
    pub phone_number: String,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<String>,
    pub people_count: u32,
    pub arrival_time: String,
    pub reservation_code: String,
    pub timestamp: String,
}
