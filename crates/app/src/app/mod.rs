use std::path::PathBuf;

use crate::engine::SyncEngine;
use crate::error::Result;
use crate::services::AppServices;
use crate::session::SessionHandle;
use skillswap_realtime::ChannelConfig;
use skillswap_store::{ActivityLogStore, UpdateSignal};

/// Paths and endpoints needed to run the local client.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub channel_url: String,
}

/// Application state shared by frontends (CLI today).
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub services: AppServices,
    pub session: SessionHandle,
    pub signal: UpdateSignal,
}

impl AppState {
    pub fn new(db_path: PathBuf, channel_url: impl Into<String>) -> Self {
        let config = AppConfig {
            db_path,
            channel_url: channel_url.into(),
        };
        let signal = UpdateSignal::new();
        let services = AppServices::new(&config, signal.clone());
        Self {
            config,
            services,
            session: SessionHandle::new(),
            signal,
        }
    }

    pub fn open_store(&self) -> Result<ActivityLogStore> {
        Ok(ActivityLogStore::open(
            &self.config.db_path,
            self.signal.clone(),
        )?)
    }

    /// Build the sync engine over this state; the caller spawns it.
    pub fn sync_engine(&self) -> Result<SyncEngine> {
        let store = self.open_store()?;
        let config = ChannelConfig::new(self.config.channel_url.clone());
        Ok(SyncEngine::new(store, self.session.clone(), config))
    }
}
