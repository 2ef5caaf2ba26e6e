//! Cross-unit leaderboard
//!
//! One cycle:
//! 1. read every unit concurrently (one `read_unit` per unit)
//! 2. apply the failure policy
//! 3. flatten in unit order and keep the first record per `external_id`
//!    (later duplicates are dropped, scores are never summed)
//! 4. drop scores ≤ 0
//! 5. sort by descending score (stable: ties keep first-seen order)
//! 6. truncate to top N

use super::reader::UnitRecordReader;
use super::FailurePolicy;
use crate::sync::types::MemberRecord;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankEntry {
    /// 1-based position
    pub rank: usize,
    pub external_id: String,
    /// Unit the winning (first-seen) record came from
    pub unit_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub score: f64,
}

/// A unit left out of a degraded ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitFailure {
    pub unit_id: String,
    pub reason: String,
}

/// Ranking plus the units it could not include
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingOutcome {
    pub entries: Vec<RankEntry>,
    pub unavailable_units: Vec<UnitFailure>,
}

impl RankingOutcome {
    pub fn is_partial(&self) -> bool {
        !self.unavailable_units.is_empty()
    }
}

/// AggregationFailure: the whole cycle failed
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationError {
    UnitUnavailable { unit_id: String, reason: String },
}

impl std::fmt::Display for AggregationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregationError::UnitUnavailable { unit_id, reason } => {
                write!(f, "AggregationFailure: unit {} unavailable: {}", unit_id, reason)
            }
        }
    }
}

impl std::error::Error for AggregationError {}

/// Dedup, filter, sort and truncate records already flattened in unit order
pub fn build_ranking<I>(records: I, top_n: usize) -> Vec<RankEntry>
where
    I: IntoIterator<Item = MemberRecord>,
{
    let mut seen = HashSet::new();
    let mut ranked: Vec<MemberRecord> = records
        .into_iter()
        .filter(|record| seen.insert(record.external_id.clone()))
        .filter(|record| record.derived_score > 0.0)
        .collect();

    ranked.sort_by(|a, b| b.derived_score.total_cmp(&a.derived_score));

    ranked
        .into_iter()
        .take(top_n)
        .enumerate()
        .map(|(i, record)| RankEntry {
            rank: i + 1,
            external_id: record.external_id,
            unit_id: record.unit_id,
            first_name: record.first_name,
            last_name: record.last_name,
            score: record.derived_score,
        })
        .collect()
}

pub struct AggregationService {
    reader: Arc<dyn UnitRecordReader>,
}

impl AggregationService {
    pub fn new(reader: Arc<dyn UnitRecordReader>) -> Self {
        Self { reader }
    }

    /// Fail-together ranking: any unit failure fails the cycle
    pub async fn rank(
        &self,
        unit_ids: &[String],
        status: &str,
        top_n: usize,
    ) -> Result<Vec<RankEntry>, AggregationError> {
        self.rank_with_policy(unit_ids, status, top_n, FailurePolicy::FailTogether)
            .await
            .map(|outcome| outcome.entries)
    }

    /// Ranking under an explicit failure policy
    ///
    /// With `FailTogether` the first failed unit (in unit order) is reported
    /// and no ranking is returned. With `Degrade` the ranking covers the units
    /// that answered and names the rest.
    pub async fn rank_with_policy(
        &self,
        unit_ids: &[String],
        status: &str,
        top_n: usize,
        policy: FailurePolicy,
    ) -> Result<RankingOutcome, AggregationError> {
        let reads = unit_ids.iter().map(|unit_id| self.reader.read_unit(unit_id, status));
        let results = join_all(reads).await;

        let mut records = Vec::new();
        let mut unavailable_units = Vec::new();

        for (unit_id, result) in unit_ids.iter().zip(results) {
            match result {
                Ok(unit_records) => records.extend(unit_records),
                Err(e) => {
                    let failure = UnitFailure {
                        unit_id: unit_id.clone(),
                        reason: e.to_string(),
                    };
                    if policy == FailurePolicy::FailTogether {
                        log::error!("❌ Ranking aborted: unit {} unavailable: {}", unit_id, e);
                        return Err(AggregationError::UnitUnavailable {
                            unit_id: failure.unit_id,
                            reason: failure.reason,
                        });
                    }
                    log::warn!("⚠️  Ranking without unit {}: {}", unit_id, e);
                    unavailable_units.push(failure);
                }
            }
        }

        let total = records.len();
        let entries = build_ranking(records, top_n);

        log::info!(
            "🏆 Ranked {} entries from {} records across {} units ({} unavailable)",
            entries.len(),
            total,
            unit_ids.len() - unavailable_units.len(),
            unavailable_units.len()
        );

        Ok(RankingOutcome {
            entries,
            unavailable_units,
        })
    }
}
