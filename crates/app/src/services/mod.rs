mod dashboard;
mod progress;

use std::sync::Arc;

use crate::app::AppConfig;
use crate::error::Result;
use skillswap_store::{ActivityLogStore, UpdateSignal};

pub use dashboard::{DashboardService, DashboardSnapshot};
pub use progress::ProgressService;

type SharedConfig = Arc<AppConfig>;

/// Service registry for read-side consumers. Both services re-read the
/// store on demand; freshness comes from the update signal.
#[derive(Clone)]
pub struct AppServices {
    pub dashboard: DashboardService,
    pub progress: ProgressService,
}

impl AppServices {
    pub fn new(config: &AppConfig, signal: UpdateSignal) -> Self {
        let shared = Arc::new(config.clone());
        Self {
            dashboard: DashboardService::new(shared.clone(), signal.clone()),
            progress: ProgressService::new(shared, signal),
        }
    }
}

fn open_store(config: &SharedConfig, signal: &UpdateSignal) -> Result<ActivityLogStore> {
    Ok(ActivityLogStore::open(&config.db_path, signal.clone())?)
}
