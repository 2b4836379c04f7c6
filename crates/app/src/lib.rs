pub mod app;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod services;
pub mod session;
pub mod startup;

pub use app::{AppConfig, AppState};
pub use engine::SyncEngine;
pub use error::{AppError, Result};
pub use ledger::TokenLedger;
pub use services::{AppServices, DashboardService, DashboardSnapshot, ProgressService};
pub use session::{AuthSession, SessionHandle};
pub use startup::{AppPaths, ensure_app_data_dir};
