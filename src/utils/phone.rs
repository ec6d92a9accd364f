use crate::error::{AppError, AppResult};
use regex::Regex;

/// Strip everything but digits; the normalized number is the player's
/// identity in the store.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Validate a Vietnamese phone number (10-11 digits after normalization).
pub fn validate_phone(phone: &str) -> AppResult<String> {
    let normalized = normalize_phone(phone);
    let phone_regex = Regex::new(r"^[0-9]{10,11}$").unwrap();

    if !phone_regex.is_match(&normalized) {
        return Err(AppError::ValidationError(
            "Invalid phone number, 10-11 digits expected".to_string(),
        ));
    }

    Ok(normalized)
}
