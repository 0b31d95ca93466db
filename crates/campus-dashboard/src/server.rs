//! Action server implementation.

use crate::error::DashboardError;
use crate::routes;
use crate::state::AppState;
use campus_core::DashboardConfig;
use std::future::Future;
use tokio::net::TcpListener;

/// The action server.
pub struct DashboardServer {
    config: DashboardConfig,
    state: AppState,
}

impl DashboardServer {
    /// Create a new server with the given configuration and services.
    pub fn new(config: DashboardConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Serve until Ctrl-C.
    pub async fn run(self) -> Result<(), DashboardError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), DashboardError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.bind_address();
        tracing::info!(address = %addr, "Starting Campus action server");

        let app = routes::create_router(self.state);

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| DashboardError::StartupFailed(e.to_string()))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| DashboardError::StartupFailed(e.to_string()))?;

        tracing::info!("Campus action server stopped");
        Ok(())
    }

    /// Get the configured listen port.
    pub fn listen_port(&self) -> u16 {
        self.config.port
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_policy::AllowAllPolicy;
    use campus_runtime::{InMemoryDirectory, InMemoryStore, PersonProvisioner, RecordService};
    use std::sync::Arc;

    #[test]
    fn test_server_creation() {
        let store = Arc::new(InMemoryStore::new());
        let state = AppState::new(
            PersonProvisioner::new(Arc::new(InMemoryDirectory::new()), store.clone()),
            RecordService::new(store, Arc::new(AllowAllPolicy)),
        );
        let server = DashboardServer::new(DashboardConfig::default(), state);
        assert_eq!(server.listen_port(), 8080);
    }
}
