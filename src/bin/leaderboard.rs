//! Leaderboard - ranks members across all units
//!
//! Usage:
//!   cargo run --release --bin leaderboard -- --once   # print one ranking as JSON and exit
//!   cargo run --release --bin leaderboard             # refresh every RANKING_INTERVAL_SECS
//!
//! `RANKING_SOURCE=cache` reads the snapshots written by `sync_runtime`;
//! `RANKING_SOURCE=live` reads each unit's members API directly. Either way the
//! ranked units are the registered ones (or `SYNC_UNITS`).

use dotenv::dotenv;
use log::{error, info};
use member_sync::aggregation::{
    ranking_scheduler_task, refresh_leaderboard, AggregationService, CacheRecordReader, LiveRecordReader,
    RankingRequest, SharedLeaderboard, UnitRecordReader,
};
use member_sync::config::{AppConfig, RankingSource};
use member_sync::sync::{CredentialRegistry, SqliteCacheStore, UnitApiClientFactory};
use std::env;
use std::sync::Arc;
use tokio::sync::RwLock;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let once = env::args().any(|arg| arg == "--once");
    let config = AppConfig::from_env()?;

    info!("🏆 Starting leaderboard");
    info!("   ├─ Source: {:?}", config.ranking_source);
    info!("   ├─ Status: {}", config.ranking_status);
    info!("   ├─ Top N: {}", config.ranking_top_n);
    info!("   └─ Failure policy: {:?}", config.ranking_failure_policy);

    // Every registered unit is ranked, synced or not: a unit without a
    // snapshot fails the cycle (or is reported under the degrade policy)
    let registry = Arc::new(CredentialRegistry::from_json_file(&config.credentials_path)?);
    let unit_ids = config.resolve_units(registry.unit_ids());

    let reader: Arc<dyn UnitRecordReader> = match config.ranking_source {
        RankingSource::Cache => {
            let cache = Arc::new(SqliteCacheStore::open(&config.db_path)?);
            Arc::new(CacheRecordReader::new(cache))
        }
        RankingSource::Live => {
            let factory = Arc::new(UnitApiClientFactory::new(config.api.clone()));
            Arc::new(LiveRecordReader::new(registry, factory, config.api.page_size))
        }
    };

    let service = Arc::new(AggregationService::new(reader));
    let request = RankingRequest {
        unit_ids,
        status: config.ranking_status.clone(),
        top_n: config.ranking_top_n,
        policy: config.ranking_failure_policy,
    };
    let board: SharedLeaderboard = Arc::new(RwLock::new(None));

    if once {
        refresh_leaderboard(&service, &request, &board).await?;
        if let Some(leaderboard) = board.read().await.as_ref() {
            println!("{}", serde_json::to_string_pretty(leaderboard)?);
        }
        return Ok(());
    }

    let scheduler = tokio::spawn(ranking_scheduler_task(
        service,
        request,
        config.ranking_interval,
        board.clone(),
    ));

    info!("🔄 Press CTRL+C to shutdown");
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("⚠️  Received CTRL+C, shutting down..."),
        Err(err) => error!("❌ Failed to listen for CTRL+C: {}", err),
    }
    scheduler.abort();

    if let Some(leaderboard) = board.read().await.as_ref() {
        println!("{}", serde_json::to_string_pretty(leaderboard)?);
    }
    info!("✅ Leaderboard stopped");
    Ok(())
}
