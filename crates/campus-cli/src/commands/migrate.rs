//! `campus migrate` - apply the Postgres schema.

use super::check::database_source;
use campus_adapter_pg::PgStore;
use campus_core::CampusConfig;

pub async fn run(config: &CampusConfig) -> anyhow::Result<()> {
    tracing::info!(database = %database_source(&config.upstream), "Running migrations");
    let store = PgStore::connect(&config.upstream).await?;
    store.migrate().await?;
    println!("Migrations applied.");
    Ok(())
}
