//! # Leaderboard aggregation
//!
//! Reads every unit's records (snapshot cache or live API), removes
//! cross-unit duplicates and produces a bounded top-N ranking. Runs on a
//! fixed period through `scheduler::ranking_scheduler_task`.
//!
//! ## Module Organization
//!
//! - `reader` - `UnitRecordReader` trait with cache and live implementations
//! - `service` - fan-out, dedup, sort, truncate
//! - `scheduler` - periodic refresh into a shared leaderboard slot

pub mod reader;
pub mod scheduler;
pub mod service;

pub use reader::{CacheRecordReader, LiveRecordReader, ReadError, UnitRecordReader};
pub use scheduler::{ranking_scheduler_task, refresh_leaderboard, Leaderboard, RankingRequest, SharedLeaderboard};
pub use service::{build_ranking, AggregationError, AggregationService, RankEntry, RankingOutcome, UnitFailure};

/// What a ranking cycle does when a unit cannot be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Any failed unit fails the whole cycle
    #[default]
    FailTogether,
    /// Rank the units that answered and report the others
    Degrade,
}
