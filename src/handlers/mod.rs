pub mod auto_update;
pub mod experience;
pub mod game;
pub mod registration;
pub mod sync;

pub use auto_update::auto_update_config;
pub use experience::experience_config;
pub use game::game_config;
pub use registration::registration_config;
pub use sync::sync_config;
