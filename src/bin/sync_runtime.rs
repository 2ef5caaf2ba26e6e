//! Sync Runtime - pulls every unit's members into the snapshot cache
//!
//! Usage:
//!   cargo run --release --bin sync_runtime            # scheduled, every SYNC_INTERVAL_SECS
//!   cargo run --release --bin sync_runtime -- --once  # single run, exit code 1 if any unit failed
//!
//! Environment variables: see `member_sync::config`.

use dotenv::dotenv;
use log::{error, info};
use member_sync::config::AppConfig;
use member_sync::sync::{
    scheduler::{run_once, sync_scheduler_task},
    CredentialRegistry, SqliteCacheStore, SyncOrchestrator, SyncSettings, UnitApiClientFactory,
};
use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let once = env::args().any(|arg| arg == "--once");
    let config = AppConfig::from_env()?;

    info!("🚀 Starting member sync");
    info!("   ├─ API: {}", config.api.base_url);
    info!("   ├─ Cache: {}", config.db_path);
    info!("   ├─ Partitions: {}", config.status_partitions.join(", "));
    info!("   ├─ Page size: {}", config.api.page_size);
    info!("   ├─ Request timeout: {}s", config.api.request_timeout.as_secs());
    info!("   └─ Pool width: {}", config.max_concurrent_units);

    let registry = Arc::new(CredentialRegistry::from_json_file(&config.credentials_path)?);
    let cache = Arc::new(SqliteCacheStore::open(&config.db_path)?);
    let factory = Arc::new(UnitApiClientFactory::new(config.api.clone()));

    let unit_ids = config.resolve_units(registry.unit_ids());
    if unit_ids.is_empty() {
        info!("⚠️  No units to sync, exiting");
        return Ok(());
    }

    let orchestrator = Arc::new(SyncOrchestrator::new(
        registry,
        factory,
        cache,
        SyncSettings {
            partitions: config.status_partitions.clone(),
            page_size: config.api.page_size,
            max_concurrent_units: config.max_concurrent_units,
        },
    ));

    if once {
        let summary = run_once(&orchestrator, &unit_ids).await;
        if summary.failed() > 0 {
            std::process::exit(1);
        }
        return Ok(());
    }

    let scheduler = tokio::spawn(sync_scheduler_task(orchestrator, unit_ids, config.sync_interval));

    info!("🔄 Press CTRL+C to shutdown");
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("⚠️  Received CTRL+C, shutting down..."),
        Err(err) => error!("❌ Failed to listen for CTRL+C: {}", err),
    }

    scheduler.abort();
    info!("✅ Sync runtime stopped");
    Ok(())
}
