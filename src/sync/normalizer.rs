//! Normalization of raw member payloads
//!
//! Score precedence (first match wins):
//! 1. `totalPoints`
//! 2. `points`
//! 3. sum of `memberships[].points`, when at least one membership exists
//! 4. zero
//!
//! Point values may be JSON numbers or numeric strings. A value that cannot
//! be read as a finite number counts as absent and precedence moves on.
//! Name and email fields of any other type are treated as missing.

use super::types::{MemberRecord, Membership, RawMember, RawMembership};
use serde_json::Value;
use std::collections::HashSet;

/// Read a JSON value as a finite number
pub fn lenient_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Render an upstream id (string or number) as a non-empty string
pub fn external_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read a JSON string or number as text
pub fn lenient_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Membership entries from a list, or from an object keyed by membership name
///
/// Entries that are not objects are skipped.
pub fn membership_entries(value: &Value) -> Vec<RawMembership> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        Value::Object(by_name) => by_name
            .iter()
            .filter_map(|(name, item)| {
                let mut membership: RawMembership = serde_json::from_value(item.clone()).ok()?;
                if membership.name.is_none() {
                    membership.name = Some(Value::String(name.clone()));
                }
                Some(membership)
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Apply the score precedence to a raw member
pub fn derive_score(raw: &RawMember) -> f64 {
    let score = raw
        .total_points
        .as_ref()
        .and_then(lenient_number)
        .or_else(|| raw.points.as_ref().and_then(lenient_number))
        .or_else(|| match raw.memberships.as_ref().map(membership_entries) {
            Some(memberships) if !memberships.is_empty() => Some(
                memberships
                    .iter()
                    .filter_map(|m| m.points.as_ref().and_then(lenient_number))
                    .sum::<f64>(),
            ),
            _ => None,
        })
        .unwrap_or(0.0);

    if score.is_finite() && score > 0.0 {
        score
    } else {
        0.0
    }
}

fn normalize_membership(raw: RawMembership) -> Membership {
    Membership {
        points: raw.points.as_ref().and_then(lenient_number),
        name: raw.name.as_ref().and_then(lenient_text),
        extra: raw.extra,
    }
}

/// Normalize one raw member for a unit and status partition
///
/// Returns `None` when the payload carries no usable id.
pub fn normalize(raw: RawMember, unit_id: &str, status: &str) -> Option<MemberRecord> {
    let external_id = raw.id.as_ref().and_then(external_id)?;
    let derived_score = derive_score(&raw);

    Some(MemberRecord {
        external_id,
        unit_id: unit_id.to_string(),
        status_partition: status.to_string(),
        first_name: raw.first_name.as_ref().and_then(lenient_text),
        last_name: raw.last_name.as_ref().and_then(lenient_text),
        email: raw.email.as_ref().and_then(lenient_text),
        memberships: raw
            .memberships
            .as_ref()
            .map(membership_entries)
            .unwrap_or_default()
            .into_iter()
            .map(normalize_membership)
            .collect(),
        derived_score,
        extra: raw.extra,
    })
}

/// Normalize a batch, dropping (and counting) records without an id
pub fn normalize_batch(raws: Vec<RawMember>, unit_id: &str, status: &str) -> Vec<MemberRecord> {
    let total = raws.len();
    let records: Vec<MemberRecord> = raws
        .into_iter()
        .filter_map(|raw| normalize(raw, unit_id, status))
        .collect();

    let dropped = total - records.len();
    if dropped > 0 {
        log::warn!("⚠️  {} {} records without an id were dropped for unit {}", dropped, status, unit_id);
    }

    records
}

/// Keep the first record per `external_id` within one unit
///
/// A member listed under more than one status partition is stored once, under
/// the partition that was merged first.
pub fn dedup_unit_records(records: Vec<MemberRecord>, unit_id: &str) -> Vec<MemberRecord> {
    let total = records.len();
    let mut seen = HashSet::new();
    let unique: Vec<MemberRecord> = records
        .into_iter()
        .filter(|record| seen.insert(record.external_id.clone()))
        .collect();

    let duplicates = total - unique.len();
    if duplicates > 0 {
        log::warn!("⚠️  {} duplicate member ids collapsed for unit {}", duplicates, unit_id);
    }

    unique
}
