use chrono::Utc;

/// Generate a reservation code from the millisecond clock
/// (`ROCA` + last six digits). Collisions within the same millisecond are
/// not a concern at this traffic level.
pub fn generate_reservation_code() -> String {
    let millis = Utc::now().timestamp_millis().to_string();
    let tail = &millis[millis.len().saturating_sub(6)..];
    format!("ROCA{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_reservation_code() {
        let code = generate_reservation_code();
        assert_eq!(code.len(), 10);
        assert!(code.starts_with("ROCA"));
        assert!(code[4..].chars().all(|c| c.is_ascii_digit()));
    }
}
