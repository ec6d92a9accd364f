pub mod code_generator;
pub mod datetime;
pub mod phone;

pub use code_generator::generate_reservation_code;
pub use datetime::{format_vietnam_time, now_millis, vietnam_today};
pub use phone::{normalize_phone, validate_phone};
