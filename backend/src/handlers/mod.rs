pub mod home;
pub mod profile;
pub mod ws;

pub use home::{health_check, home};
pub use profile::{list_likes, submit_profile};
pub use ws::start;
