//! Sync orchestrator: remote members API → normalized snapshot per unit
//!
//! ## Flow per unit
//!
//! ```text
//! credentials_for(unit)      (CredentialMissing → failed SyncResult)
//!     ↓
//! SourceFactory::build_source
//!     ↓
//! fetch_all × status partitions   (concurrent, joined in config order)
//!     ↓
//! normalize_batch per partition, then drop repeated ids (first partition wins)
//!     ↓
//! CacheStore::write_snapshot      (whole snapshot replaced)
//! ```
//!
//! Partition errors only cut that partition short; the unit still succeeds
//! with whatever was fetched. Credential, client and cache failures turn into
//! a failed `SyncResult`. Nothing escapes `sync_all`.
//!
//! ## Concurrency
//!
//! - Units go through a semaphore-bounded pool shared by every caller, so a
//!   manual trigger and the scheduler together never exceed the bound.
//!   Width 1 gives strictly sequential processing.
//! - Each unit has its own async lock, held for the whole unit sync. Two
//!   overlapping syncs of one unit run one after the other.

use super::cache::CacheStore;
use super::client::SourceFactory;
use super::credentials::CredentialRegistry;
use super::error::SyncError;
use super::fetcher::fetch_all;
use super::normalizer::{dedup_unit_records, normalize_batch};
use super::types::{SyncResult, SyncSummary, UnitCacheSnapshot};
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::Semaphore;

/// Tunables for a sync run
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Status partitions, fetched concurrently and concatenated in this order
    pub partitions: Vec<String>,
    pub page_size: usize,
    /// Units synced at the same time (1 = sequential)
    pub max_concurrent_units: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            partitions: vec!["active".to_string(), "inactive".to_string()],
            page_size: 500,
            max_concurrent_units: 1,
        }
    }
}

/// Lazily created per-unit async locks
#[derive(Default)]
struct UnitLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl UnitLocks {
    fn get(&self, unit_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry(unit_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

pub struct SyncOrchestrator {
    registry: Arc<CredentialRegistry>,
    factory: Arc<dyn SourceFactory>,
    cache: Arc<dyn CacheStore>,
    settings: SyncSettings,
    pool: Semaphore,
    unit_locks: UnitLocks,
}

impl SyncOrchestrator {
    pub fn new(
        registry: Arc<CredentialRegistry>,
        factory: Arc<dyn SourceFactory>,
        cache: Arc<dyn CacheStore>,
        settings: SyncSettings,
    ) -> Self {
        let width = settings.max_concurrent_units.max(1);
        Self {
            registry,
            factory,
            cache,
            settings,
            pool: Semaphore::new(width),
            unit_locks: UnitLocks::default(),
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Sync one unit; never panics or propagates
    pub async fn sync_unit(&self, unit_id: &str) -> SyncResult {
        let _permit = match self.pool.acquire().await {
            Ok(permit) => permit,
            Err(_) => return SyncResult::failed(unit_id, SyncError::PoolClosed),
        };

        let lock = self.unit_locks.get(unit_id);
        let _unit_guard = lock.lock().await;

        let started = Instant::now();
        match self.run_unit(unit_id).await {
            Ok(count) => {
                log::info!(
                    "✅ Synced unit {}: {} records in {}ms",
                    unit_id,
                    count,
                    started.elapsed().as_millis()
                );
                SyncResult::succeeded(unit_id, count)
            }
            Err(e) => {
                log::error!("❌ Sync failed for unit {}: {}", unit_id, e);
                SyncResult::failed(unit_id, e)
            }
        }
    }

    /// Sync every unit, returning one result per unit in input order
    pub async fn sync_all(&self, unit_ids: &[String]) -> SyncSummary {
        let started = Instant::now();
        log::info!(
            "🔄 Starting sync of {} units (pool width {})",
            unit_ids.len(),
            self.settings.max_concurrent_units.max(1)
        );

        let results = join_all(unit_ids.iter().map(|unit_id| self.sync_unit(unit_id))).await;

        let summary = SyncSummary {
            results,
            elapsed: started.elapsed(),
        };
        summary.log();
        summary
    }

    async fn run_unit(&self, unit_id: &str) -> Result<usize, SyncError> {
        let credential = self.registry.credentials_for(unit_id)?;
        let source = self.factory.build_source(credential)?;

        let fetches = self
            .settings
            .partitions
            .iter()
            .map(|status| fetch_all(source.as_ref(), status, self.settings.page_size));
        let outcomes = join_all(fetches).await;

        let mut records = Vec::new();
        for (status, outcome) in self.settings.partitions.iter().zip(outcomes) {
            if let Some(e) = &outcome.error {
                log::warn!(
                    "⚠️  Unit {} partition {} incomplete after {} pages ({} records kept): {}",
                    unit_id,
                    status,
                    outcome.pages_fetched,
                    outcome.records.len(),
                    e
                );
            }
            records.extend(normalize_batch(outcome.records, unit_id, status));
        }

        let records = dedup_unit_records(records, unit_id);
        let snapshot = UnitCacheSnapshot::new(unit_id, records, Utc::now());
        let count = snapshot.total_students;
        self.cache.write_snapshot(snapshot).await?;

        Ok(count)
    }
}
