pub mod drive;
pub mod google_auth;
pub mod sheets;

pub use drive::*;
pub use google_auth::*;
pub use sheets::*;
