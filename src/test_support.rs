//! Test doubles shared by the unit tests

use crate::sync::cache::CacheStore;
use crate::sync::client::{MemberSource, SourceFactory};
use crate::sync::credentials::{CredentialRegistry, UnitCredential};
use crate::sync::error::{CacheError, ClientError, FetchError};
use crate::sync::types::{MemberRecord, RawMember, UnitCacheSnapshot};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// `count` raw members with ids `{prefix}-{i}` and `points = i + 1`
pub fn raw_members(prefix: &str, count: usize) -> Vec<RawMember> {
    (0..count)
        .map(|i| RawMember {
            id: Some(Value::from(format!("{}-{}", prefix, i))),
            points: Some(Value::from(i as f64 + 1.0)),
            ..Default::default()
        })
        .collect()
}

pub fn raw_member(id: &str, total_points: f64) -> RawMember {
    RawMember {
        id: Some(Value::from(id)),
        total_points: Some(Value::from(total_points)),
        ..Default::default()
    }
}

/// Normalized record with only the fields ranking cares about
pub fn member(unit_id: &str, external_id: &str, score: f64) -> MemberRecord {
    MemberRecord {
        external_id: external_id.to_string(),
        unit_id: unit_id.to_string(),
        status_partition: "active".to_string(),
        first_name: Some(format!("First{}", external_id)),
        last_name: None,
        email: None,
        memberships: Vec::new(),
        derived_score: score,
        extra: Map::new(),
    }
}

pub fn credential(unit_id: &str) -> UnitCredential {
    UnitCredential {
        unit_id: unit_id.to_string(),
        tenant_key: format!("{}-key", unit_id),
        secret_token: format!("{}-secret", unit_id),
    }
}

pub fn registry(units: &[&str]) -> Arc<CredentialRegistry> {
    Arc::new(CredentialRegistry::from_entries(units.iter().map(|u| credential(u)).collect()).unwrap())
}

/// Member source replaying scripted pages per status partition
///
/// Once a partition's script runs out every further page is empty.
#[derive(Default)]
pub struct ScriptedSource {
    pages: Mutex<HashMap<String, VecDeque<Result<Vec<RawMember>, FetchError>>>>,
    requests: Mutex<Vec<(String, u32)>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages(self, status: &str, pages: Vec<Result<Vec<RawMember>, FetchError>>) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(status.to_string(), pages.into_iter().collect());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Page numbers requested for a partition, in request order
    pub fn requests(&self, status: &str) -> Vec<u32> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| s == status)
            .map(|(_, page)| *page)
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MemberSource for ScriptedSource {
    async fn fetch_page(
        &self,
        status: &str,
        page: u32,
        _page_size: usize,
    ) -> Result<Vec<RawMember>, FetchError> {
        self.requests.lock().unwrap().push((status.to_string(), page));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .pages
            .lock()
            .unwrap()
            .get_mut(status)
            .and_then(|queue| queue.pop_front());

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        next.unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Hands out pre-built sources per unit; units without one fail to build
#[derive(Default)]
pub struct ScriptedFactory {
    sources: Mutex<HashMap<String, Arc<ScriptedSource>>>,
    builds: AtomicUsize,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(self, unit_id: &str, source: ScriptedSource) -> Self {
        self.sources
            .lock()
            .unwrap()
            .insert(unit_id.to_string(), Arc::new(source));
        self
    }

    /// Register one source under several unit ids
    pub fn with_shared_source(self, unit_ids: &[&str], source: ScriptedSource) -> Self {
        let source = Arc::new(source);
        {
            let mut sources = self.sources.lock().unwrap();
            for unit_id in unit_ids {
                sources.insert(unit_id.to_string(), source.clone());
            }
        }
        self
    }

    pub fn source(&self, unit_id: &str) -> Arc<ScriptedSource> {
        self.sources.lock().unwrap()[unit_id].clone()
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl SourceFactory for ScriptedFactory {
    fn build_source(&self, credential: &UnitCredential) -> Result<Arc<dyn MemberSource>, ClientError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        let source = self
            .sources
            .lock()
            .unwrap()
            .get(&credential.unit_id)
            .cloned()
            .ok_or_else(|| ClientError::InvalidBaseUrl(format!("no scripted source for {}", credential.unit_id)))?;
        Ok(source as Arc<dyn MemberSource>)
    }
}

/// In-memory snapshot store
#[derive(Default)]
pub struct MemoryCacheStore {
    snapshots: Mutex<BTreeMap<String, UnitCacheSnapshot>>,
    writes: AtomicUsize,
    fail_writes_for: Mutex<Vec<String>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(self, unit_id: &str) -> Self {
        self.fail_writes_for.lock().unwrap().push(unit_id.to_string());
        self
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn insert(&self, snapshot: UnitCacheSnapshot) {
        self.snapshots
            .lock()
            .unwrap()
            .insert(snapshot.unit_id.clone(), snapshot);
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn write_snapshot(&self, snapshot: UnitCacheSnapshot) -> Result<(), CacheError> {
        if self.fail_writes_for.lock().unwrap().contains(&snapshot.unit_id) {
            return Err(CacheError::Task(format!("disk full writing {}", snapshot.unit_id)));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.insert(snapshot);
        Ok(())
    }

    async fn read_snapshot(&self, unit_id: &str) -> Result<Option<UnitCacheSnapshot>, CacheError> {
        Ok(self.snapshots.lock().unwrap().get(unit_id).cloned())
    }

    async fn list_snapshots(&self) -> Result<Vec<UnitCacheSnapshot>, CacheError> {
        Ok(self.snapshots.lock().unwrap().values().cloned().collect())
    }
}
