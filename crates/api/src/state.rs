use std::sync::Arc;

use banner_core::store::SessionStore;

use crate::config::ServerConfig;
use crate::jobs::JobOrchestrator;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything lives behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Session table shared with the orchestrator.
    pub store: Arc<SessionStore>,
    /// Launches and supervises scrape jobs.
    pub orchestrator: Arc<JobOrchestrator>,
}

impl AppState {
    /// Wire a fresh store and orchestrator from `config`.
    pub fn new(config: ServerConfig) -> Self {
        let store = Arc::new(SessionStore::new());
        let orchestrator = Arc::new(JobOrchestrator::new(
            Arc::clone(&store),
            config.worker.clone(),
        ));
        Self {
            config: Arc::new(config),
            store,
            orchestrator,
        }
    }
}
