use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::game::{Gender, Prize};

/// Spin request: phone plus registration fields, merged into the player
/// record before eligibility is checked.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpinRequest {
    pub phone: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    /// Client-side anti-replay hint only; never enforced server-side.
    #[serde(default)]
    pub session_token: Option<String>,
}

/// Terminal outcome of a spin attempt. A blocked quota is a normal
/// outcome, not an error.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SpinOutcome {
    #[serde(rename_all = "camelCase")]
    Won {
        prize: Prize,
        spin_number: u32,
        remaining_today: u32,
    },
    #[serde(rename_all = "camelCase")]
    Blocked {
        remaining_today: u32,
        message: String,
    },
}

impl SpinOutcome {
    pub fn blocked() -> Self {
        SpinOutcome::Blocked {
            remaining_today: 0,
            message: "You have used all of today's spins. Come back tomorrow for another chance!"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecentSpinsQuery {
    /// Maximum number of entries to return (default 1000).
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct WheelConfigQuery {
    /// `refresh=true` bypasses the catalog cache.
    pub refresh: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WheelConfigResponse {
    pub prizes: Vec<Prize>,
    pub total_prizes: usize,
}
