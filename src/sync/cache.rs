//! Snapshot cache: one document per unit
//!
//! Table `unit_snapshots`:
//! - `unit_id` - primary key
//! - `last_sync` - unix millis of the sync that produced the snapshot
//! - `total_students` - record count, always equal to the document's list length
//! - `document` - JSON `{unitId, lastSync, totalStudents, students}`
//!
//! Writes replace the whole row (UPSERT on unit_id). Nothing is merged.

use super::error::CacheError;
use super::types::UnitCacheSnapshot;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Keyed snapshot storage
///
/// The sync orchestrator is the only writer. Readers (leaderboard, display
/// collaborators) only use the read methods.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Replace the snapshot for `snapshot.unit_id`
    async fn write_snapshot(&self, snapshot: UnitCacheSnapshot) -> Result<(), CacheError>;

    /// Read one unit's snapshot, if it has ever been synced
    async fn read_snapshot(&self, unit_id: &str) -> Result<Option<UnitCacheSnapshot>, CacheError>;

    /// Read every snapshot, ordered by unit id
    async fn list_snapshots(&self) -> Result<Vec<UnitCacheSnapshot>, CacheError>;
}

fn check_consistent(snapshot: &UnitCacheSnapshot) -> Result<(), CacheError> {
    if snapshot.is_consistent() {
        Ok(())
    } else {
        Err(CacheError::Inconsistent {
            unit_id: snapshot.unit_id.clone(),
            total_students: snapshot.total_students,
            records: snapshot.students.len(),
        })
    }
}

/// SQLite-backed snapshot store
pub struct SqliteCacheStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCacheStore {
    /// Open (or create) the cache database and its schema
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS unit_snapshots (
                unit_id TEXT PRIMARY KEY,
                last_sync INTEGER NOT NULL,
                total_students INTEGER NOT NULL,
                document TEXT NOT NULL
            );",
        )?;

        log::info!("✅ Snapshot cache ready at {}", db_path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, CacheError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| CacheError::Task("cache connection lock poisoned".to_string()))?;
            op(&mut guard)
        })
        .await?
    }

    fn decode(document: &str) -> Result<UnitCacheSnapshot, CacheError> {
        let snapshot: UnitCacheSnapshot = serde_json::from_str(document)?;
        check_consistent(&snapshot)?;
        Ok(snapshot)
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn write_snapshot(&self, snapshot: UnitCacheSnapshot) -> Result<(), CacheError> {
        check_consistent(&snapshot)?;

        let document = serde_json::to_string(&snapshot)?;
        let unit_id = snapshot.unit_id.clone();
        let last_sync = snapshot.last_sync.timestamp_millis();
        let total = snapshot.total_students as i64;

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO unit_snapshots (unit_id, last_sync, total_students, document)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(unit_id) DO UPDATE SET
                    last_sync = excluded.last_sync,
                    total_students = excluded.total_students,
                    document = excluded.document",
                params![unit_id, last_sync, total, document],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await?;

        log::debug!("💾 Wrote snapshot for {} ({} students)", snapshot.unit_id, snapshot.total_students);
        Ok(())
    }

    async fn read_snapshot(&self, unit_id: &str) -> Result<Option<UnitCacheSnapshot>, CacheError> {
        let unit_id = unit_id.to_string();
        let document: Option<String> = self
            .with_conn(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT document FROM unit_snapshots WHERE unit_id = ?1",
                        params![unit_id],
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .await?;

        document.as_deref().map(Self::decode).transpose()
    }

    async fn list_snapshots(&self) -> Result<Vec<UnitCacheSnapshot>, CacheError> {
        let documents: Vec<String> = self
            .with_conn(|conn| {
                let mut stmt = conn.prepare("SELECT document FROM unit_snapshots ORDER BY unit_id")?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await?;

        documents.iter().map(|doc| Self::decode(doc)).collect()
    }
}
