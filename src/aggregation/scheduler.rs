//! Periodic leaderboard refresh
//!
//! Each cycle replaces the shared board on success. A failed cycle leaves the
//! previous board in place and is only logged.

use super::service::{AggregationError, AggregationService, RankEntry, UnitFailure};
use super::FailurePolicy;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Parameters of one ranking cycle
#[derive(Debug, Clone)]
pub struct RankingRequest {
    pub unit_ids: Vec<String>,
    pub status: String,
    pub top_n: usize,
    pub policy: FailurePolicy,
}

/// Latest published ranking
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaderboard {
    pub computed_at: DateTime<Utc>,
    pub entries: Vec<RankEntry>,
    pub unavailable_units: Vec<UnitFailure>,
}

pub type SharedLeaderboard = Arc<RwLock<Option<Leaderboard>>>;

/// Run one cycle and publish the result
pub async fn refresh_leaderboard(
    service: &AggregationService,
    request: &RankingRequest,
    board: &SharedLeaderboard,
) -> Result<(), AggregationError> {
    let outcome = service
        .rank_with_policy(&request.unit_ids, &request.status, request.top_n, request.policy)
        .await?;

    let leaderboard = Leaderboard {
        computed_at: Utc::now(),
        entries: outcome.entries,
        unavailable_units: outcome.unavailable_units,
    };

    *board.write().await = Some(leaderboard);
    Ok(())
}

/// Refresh `board` every `period`, forever
pub async fn ranking_scheduler_task(
    service: Arc<AggregationService>,
    request: RankingRequest,
    period: Duration,
    board: SharedLeaderboard,
) {
    if period.is_zero() {
        log::error!("❌ Ranking scheduler not started: interval must be greater than zero");
        return;
    }

    log::info!(
        "⏰ Starting ranking scheduler ({} units, top {}, interval: {}s)",
        request.unit_ids.len(),
        request.top_n,
        period.as_secs()
    );

    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        timer.tick().await;

        if let Err(e) = refresh_leaderboard(&service, &request, &board).await {
            log::error!("❌ Ranking cycle failed, keeping previous leaderboard: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::reader::CacheRecordReader;
    use crate::sync::types::UnitCacheSnapshot;
    use crate::test_support::{member, MemoryCacheStore};

    fn request(units: &[&str], policy: FailurePolicy) -> RankingRequest {
        RankingRequest {
            unit_ids: units.iter().map(|s| s.to_string()).collect(),
            status: "active".to_string(),
            top_n: 10,
            policy,
        }
    }

    #[tokio::test]
    async fn test_failed_cycle_keeps_previous_board() {
        let cache = Arc::new(MemoryCacheStore::new());
        cache.insert(UnitCacheSnapshot::new("a", vec![member("a", "1", 4.0)], Utc::now()));
        let service = AggregationService::new(Arc::new(CacheRecordReader::new(cache)));
        let board: SharedLeaderboard = Arc::new(RwLock::new(None));

        refresh_leaderboard(&service, &request(&["a"], FailurePolicy::FailTogether), &board)
            .await
            .unwrap();
        assert_eq!(board.read().await.as_ref().unwrap().entries.len(), 1);

        // "b" has no snapshot: the cycle fails and the old board stays
        let result = refresh_leaderboard(&service, &request(&["a", "b"], FailurePolicy::FailTogether), &board).await;
        assert!(result.is_err());
        let current = board.read().await;
        assert_eq!(current.as_ref().unwrap().entries[0].external_id, "1");
        assert!(current.as_ref().unwrap().unavailable_units.is_empty());
    }

    #[tokio::test]
    async fn test_degraded_cycle_publishes_unavailable_units() {
        let cache = Arc::new(MemoryCacheStore::new());
        cache.insert(UnitCacheSnapshot::new("a", vec![member("a", "1", 4.0)], Utc::now()));
        let service = AggregationService::new(Arc::new(CacheRecordReader::new(cache)));
        let board: SharedLeaderboard = Arc::new(RwLock::new(None));

        refresh_leaderboard(&service, &request(&["a", "b"], FailurePolicy::Degrade), &board)
            .await
            .unwrap();

        let current = board.read().await;
        let leaderboard = current.as_ref().unwrap();
        assert_eq!(leaderboard.entries.len(), 1);
        assert_eq!(leaderboard.unavailable_units[0].unit_id, "b");
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_publishes_first_board_immediately() {
        let cache = Arc::new(MemoryCacheStore::new());
        cache.insert(UnitCacheSnapshot::new("a", vec![member("a", "1", 4.0)], Utc::now()));
        let service = Arc::new(AggregationService::new(Arc::new(CacheRecordReader::new(cache))));
        let board: SharedLeaderboard = Arc::new(RwLock::new(None));

        let handle = tokio::spawn(ranking_scheduler_task(
            service,
            request(&["a"], FailurePolicy::FailTogether),
            Duration::from_secs(300),
            board.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.abort();

        assert!(board.read().await.is_some());
    }

    #[tokio::test]
    async fn test_zero_period_does_not_start() {
        let service = Arc::new(AggregationService::new(Arc::new(CacheRecordReader::new(Arc::new(
            MemoryCacheStore::new(),
        )))));
        let board: SharedLeaderboard = Arc::new(RwLock::new(None));

        ranking_scheduler_task(service, request(&[], FailurePolicy::FailTogether), Duration::ZERO, board.clone()).await;

        assert!(board.read().await.is_none());
    }
}
