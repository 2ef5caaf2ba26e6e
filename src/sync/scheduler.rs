//! Periodic sync task
//!
//! Manual triggers may call `SyncOrchestrator::sync_unit` at any time; the
//! orchestrator's per-unit locks keep them from racing this loop.

use super::orchestrator::SyncOrchestrator;
use super::types::SyncSummary;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Run `sync_all` over `unit_ids` every `period`, forever
///
/// The first run starts immediately. A run that overruns the period delays
/// the next tick instead of stacking runs. A zero period returns at once.
pub async fn sync_scheduler_task(orchestrator: Arc<SyncOrchestrator>, unit_ids: Vec<String>, period: Duration) {
    if period.is_zero() {
        log::error!("❌ Sync scheduler not started: interval must be greater than zero");
        return;
    }
    log::info!("⏰ Starting sync scheduler ({} units, interval: {}s)", unit_ids.len(), period.as_secs());

    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        timer.tick().await;
        run_once(&orchestrator, &unit_ids).await;
    }
}

/// One scheduled cycle; exposed for the one-shot binary mode
pub async fn run_once(orchestrator: &SyncOrchestrator, unit_ids: &[String]) -> SyncSummary {
    let summary = orchestrator.sync_all(unit_ids).await;
    if summary.failed() > 0 {
        log::warn!("⚠️  {} of {} units failed this cycle", summary.failed(), summary.results.len());
    }
    summary
}
