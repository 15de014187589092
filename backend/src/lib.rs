pub mod constants;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod state;
pub mod utils;

pub use router::create_router;
pub use services::{Hub, HubHandle, HubSettings};
pub use state::AppState;
pub use utils::config::Config;

// Re-export common types
pub use anyhow::Result;
