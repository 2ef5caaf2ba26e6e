//! Per-unit read surfaces for the leaderboard
//!
//! - `CacheRecordReader` reads the last synced snapshot (cheap, as fresh as
//!   the last sync)
//! - `LiveRecordReader` walks the unit's members API (fresh, one full
//!   pagination per unit per cycle)

use crate::sync::cache::CacheStore;
use crate::sync::client::SourceFactory;
use crate::sync::credentials::CredentialRegistry;
use crate::sync::error::{CacheError, ClientError, CredentialError, FetchError};
use crate::sync::fetcher::fetch_all;
use crate::sync::normalizer::normalize_batch;
use crate::sync::types::MemberRecord;
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug)]
pub enum ReadError {
    Cache(CacheError),
    /// Unit has never been synced
    NoSnapshot(String),
    Credential(CredentialError),
    Client(ClientError),
    Fetch(FetchError),
}

impl From<CacheError> for ReadError {
    fn from(err: CacheError) -> Self {
        ReadError::Cache(err)
    }
}

impl From<CredentialError> for ReadError {
    fn from(err: CredentialError) -> Self {
        ReadError::Credential(err)
    }
}

impl From<ClientError> for ReadError {
    fn from(err: ClientError) -> Self {
        ReadError::Client(err)
    }
}

impl From<FetchError> for ReadError {
    fn from(err: FetchError) -> Self {
        ReadError::Fetch(err)
    }
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::Cache(e) => write!(f, "Cache read failed: {}", e),
            ReadError::NoSnapshot(unit_id) => write!(f, "No snapshot cached for unit {}", unit_id),
            ReadError::Credential(e) => write!(f, "CredentialMissing: {}", e),
            ReadError::Client(e) => write!(f, "Client error: {}", e),
            ReadError::Fetch(e) => write!(f, "Fetch failed: {}", e),
        }
    }
}

impl std::error::Error for ReadError {}

/// Normalized records of one unit in one status partition
#[async_trait]
pub trait UnitRecordReader: Send + Sync {
    async fn read_unit(&self, unit_id: &str, status: &str) -> Result<Vec<MemberRecord>, ReadError>;
}

/// Reads from the snapshot cache
pub struct CacheRecordReader {
    cache: Arc<dyn CacheStore>,
}

impl CacheRecordReader {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl UnitRecordReader for CacheRecordReader {
    async fn read_unit(&self, unit_id: &str, status: &str) -> Result<Vec<MemberRecord>, ReadError> {
        let snapshot = self
            .cache
            .read_snapshot(unit_id)
            .await?
            .ok_or_else(|| ReadError::NoSnapshot(unit_id.to_string()))?;

        Ok(snapshot
            .students
            .into_iter()
            .filter(|record| record.status_partition == status)
            .collect())
    }
}

/// Reads straight from the unit's members API
///
/// Unlike sync, a partition that ends on an error fails the read: a ranking
/// built from a truncated list would be silently wrong.
pub struct LiveRecordReader {
    registry: Arc<CredentialRegistry>,
    factory: Arc<dyn SourceFactory>,
    page_size: usize,
}

impl LiveRecordReader {
    pub fn new(registry: Arc<CredentialRegistry>, factory: Arc<dyn SourceFactory>, page_size: usize) -> Self {
        Self {
            registry,
            factory,
            page_size,
        }
    }
}

#[async_trait]
impl UnitRecordReader for LiveRecordReader {
    async fn read_unit(&self, unit_id: &str, status: &str) -> Result<Vec<MemberRecord>, ReadError> {
        let credential = self.registry.credentials_for(unit_id)?;
        let source = self.factory.build_source(credential)?;

        let outcome = fetch_all(source.as_ref(), status, self.page_size).await;
        if let Some(e) = outcome.error {
            return Err(e.into());
        }

        Ok(normalize_batch(outcome.records, unit_id, status))
    }
}
