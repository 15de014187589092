pub mod catalog;
pub mod hub;
pub mod matching;
pub mod session;

pub use hub::{Hub, HubError, HubEvent, HubHandle, HubSettings};
