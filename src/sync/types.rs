//! Core data structures shared by the sync and aggregation paths

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Member object as returned by the remote members API
///
/// Upstream shapes differ between units: ids and names arrive as strings or
/// numbers, point fields may be numbers or numeric strings, `memberships` may
/// be a list or an object keyed by name, and any field may be missing. Every
/// modelled field is kept as a raw `Value` so one odd record never fails the
/// page; `normalizer` reads them leniently. Everything else lands in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMember {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(rename = "firstName", default)]
    pub first_name: Option<Value>,
    #[serde(rename = "lastName", default)]
    pub last_name: Option<Value>,
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(rename = "totalPoints", default)]
    pub total_points: Option<Value>,
    #[serde(default)]
    pub points: Option<Value>,
    #[serde(default)]
    pub memberships: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Membership sub-record as returned upstream
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMembership {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub points: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Normalized membership sub-record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub name: Option<String>,
    pub points: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Normalized member record
///
/// `derived_score` is always finite and non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRecord {
    pub external_id: String,
    pub unit_id: String,
    pub status_partition: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub memberships: Vec<Membership>,
    pub derived_score: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Cached copy of one unit's most recent sync
///
/// Serialized shape: `{unitId, lastSync, totalStudents, students}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitCacheSnapshot {
    pub unit_id: String,
    pub last_sync: DateTime<Utc>,
    pub total_students: usize,
    pub students: Vec<MemberRecord>,
}

impl UnitCacheSnapshot {
    /// Build a snapshot; the count is always taken from the record list
    pub fn new(unit_id: impl Into<String>, students: Vec<MemberRecord>, last_sync: DateTime<Utc>) -> Self {
        Self {
            unit_id: unit_id.into(),
            last_sync,
            total_students: students.len(),
            students,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.total_students == self.students.len()
    }
}

/// Outcome of syncing one unit
#[derive(Debug, Clone, PartialEq)]
pub struct SyncResult {
    pub unit_id: String,
    pub success: bool,
    pub record_count: usize,
    pub error_message: Option<String>,
}

impl SyncResult {
    pub fn succeeded(unit_id: impl Into<String>, record_count: usize) -> Self {
        Self {
            unit_id: unit_id.into(),
            success: true,
            record_count,
            error_message: None,
        }
    }

    pub fn failed(unit_id: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            unit_id: unit_id.into(),
            success: false,
            record_count: 0,
            error_message: Some(error.to_string()),
        }
    }
}

impl std::fmt::Display for SyncResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.error_message {
            None => write!(f, "{}: ok ({} records)", self.unit_id, self.record_count),
            Some(err) => write!(f, "{}: FAILED ({})", self.unit_id, err),
        }
    }
}

/// Results of one `sync_all` run, one entry per requested unit in input order
#[derive(Debug, Clone)]
pub struct SyncSummary {
    pub results: Vec<SyncResult>,
    pub elapsed: Duration,
}

impl SyncSummary {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn total_records(&self) -> usize {
        self.results.iter().map(|r| r.record_count).sum()
    }

    /// Emit the run summary: one line per unit, then totals
    pub fn log(&self) {
        log::info!("📋 Sync summary ({} units, {}ms)", self.results.len(), self.elapsed.as_millis());
        for result in &self.results {
            if result.success {
                log::info!("   ├─ ✅ {}", result);
            } else {
                log::warn!("   ├─ ❌ {}", result);
            }
        }
        log::info!(
            "   └─ {} succeeded, {} failed, {} records cached",
            self.succeeded(),
            self.failed(),
            self.total_records()
        );
    }
}
