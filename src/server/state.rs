use std::sync::Arc;

use crate::monitor::ProviderMonitor;
use crate::system_info::SystemInfo;

// App state
pub struct AppState {
    pub monitor: Arc<ProviderMonitor>,
    pub system_info: SystemInfo,
}

impl AppState {
    pub fn new(monitor: Arc<ProviderMonitor>) -> Self {
        Self {
            monitor,
            system_info: SystemInfo::collect(),
        }
    }
}
