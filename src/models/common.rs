use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error payload carried inside `{ "success": false, "error": ... }`
/// responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}
