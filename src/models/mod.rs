pub mod common;
pub mod game;
pub mod registration;
pub mod spin;

pub use common::*;
pub use game::*;
pub use registration::*;
pub use spin::*;
