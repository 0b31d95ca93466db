//! `campus serve` - run the admin action endpoints.

use campus_adapter_pg::PgStore;
use campus_core::CampusConfig;
use campus_dashboard::{AppState, DashboardServer};
use campus_identity::DirectoryClient;
use campus_runtime::{
    InMemoryDirectory, InMemoryStore, PersonProvisioner, RecordService, TracingAuditSink,
};
use std::sync::Arc;

/// Wire the services described by `config` and serve until Ctrl-C.
pub async fn run(config: CampusConfig, in_memory: bool) -> anyhow::Result<()> {
    let state = if in_memory {
        in_memory_state(&config)
    } else {
        postgres_state(&config).await?
    };

    tracing::info!(
        project = config.project.as_deref().unwrap_or("campus"),
        in_memory,
        policy = ?config.policy.mode,
        "Services ready"
    );

    DashboardServer::new(config.dashboard.clone(), state)
        .run()
        .await?;
    Ok(())
}

fn in_memory_state(config: &CampusConfig) -> AppState {
    tracing::warn!("Using in-memory directory and store; nothing survives a restart");
    let directory = Arc::new(InMemoryDirectory::new());
    let store = Arc::new(InMemoryStore::new());

    let provisioner =
        PersonProvisioner::new(directory, store.clone()).with_audit(Arc::new(TracingAuditSink));
    let policy = campus_policy::from_config(&config.policy, store.clone());
    AppState::new(provisioner, RecordService::new(store, policy))
}

async fn postgres_state(config: &CampusConfig) -> anyhow::Result<AppState> {
    let identity = Arc::new(DirectoryClient::from_config(&config.identity)?);
    let store = Arc::new(PgStore::connect(&config.upstream).await?);

    let provisioner =
        PersonProvisioner::new(identity, store.clone()).with_audit(Arc::new(TracingAuditSink));
    let policy = campus_policy::from_config(&config.policy, store.clone());
    Ok(AppState::new(provisioner, RecordService::new(store, policy)))
}
