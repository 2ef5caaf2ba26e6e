//! # Unit sync pipeline
//!
//! Pulls member records from every unit's members API and keeps one cache
//! snapshot per unit.
//!
//! ```text
//! CredentialRegistry
//!     ↓
//! UnitApiClientFactory (Basic auth, timeout, IPv4 only)
//!     ↓
//! fetch_all per status partition (short page = last page)
//!     ↓
//! normalize (score precedence)
//!     ↓
//! CacheStore (one snapshot per unit, replaced wholesale)
//! ```
//!
//! ## Module Organization
//!
//! - `credentials` - unit id → credential registry
//! - `client` - `MemberSource` trait and the reqwest-backed unit client
//! - `fetcher` - page-length driven pagination
//! - `normalizer` - raw payload → `MemberRecord`
//! - `cache` - `CacheStore` trait and SQLite store
//! - `orchestrator` - per-unit sync, bounded pool, per-unit locks
//! - `scheduler` - periodic sync loop
//! - `types` / `error` - shared data and error types

pub mod cache;
pub mod client;
pub mod credentials;
pub mod error;
pub mod fetcher;
pub mod normalizer;
pub mod orchestrator;
pub mod scheduler;
pub mod types;

pub use cache::{CacheStore, SqliteCacheStore};
pub use client::{MemberSource, SourceFactory, UnitApiClient, UnitApiClientFactory};
pub use credentials::{CredentialRegistry, UnitCredential};
pub use error::{CacheError, ClientError, CredentialError, FetchError, SyncError};
pub use fetcher::{fetch_all, FetchOutcome};
pub use normalizer::normalize;
pub use orchestrator::{SyncOrchestrator, SyncSettings};
pub use types::{MemberRecord, Membership, RawMember, SyncResult, SyncSummary, UnitCacheSnapshot};
