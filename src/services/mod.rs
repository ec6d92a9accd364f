pub mod email_service;
pub mod experience_service;
pub mod game_service;
pub mod registration_service;
pub mod spin_rules;
pub mod sync_service;
pub mod wheel_service;

pub use email_service::*;
pub use experience_service::*;
pub use game_service::*;
pub use registration_service::*;
pub use spin_rules::*;
pub use sync_service::*;
pub use wheel_service::*;
