use crate::services::HubHandle;
use crate::utils::Config;

#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
    pub config: Config,
}

impl AppState {
    pub fn new(hub: HubHandle, config: Config) -> Self {
        Self { hub, config }
    }
}
