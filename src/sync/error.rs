//! Error types for the sync path
//!
//! Every per-unit failure ends up as `SyncResult::error_message`; these enums
//! only travel as far as the orchestrator.

use std::time::Duration;

/// Credential lookup failure
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialError {
    /// No credential registered for the unit (CredentialMissing)
    Missing(String),
}

impl std::fmt::Display for CredentialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialError::Missing(unit_id) => {
                write!(f, "No credentials registered for unit {}", unit_id)
            }
        }
    }
}

impl std::error::Error for CredentialError {}

/// Failure building a per-unit HTTP client
#[derive(Debug)]
pub enum ClientError {
    InvalidBaseUrl(String),
    InvalidHeader(String),
    Build(reqwest::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Build(err)
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::InvalidBaseUrl(url) => write!(f, "Invalid API base URL: {}", url),
            ClientError::InvalidHeader(msg) => write!(f, "Invalid authorization header: {}", msg),
            ClientError::Build(e) => write!(f, "HTTP client build error: {}", e),
        }
    }
}

impl std::error::Error for ClientError {}

/// Failure fetching one page of members
///
/// `Http` is handled exactly like `Network` by the paginator: both stop
/// further pages and keep the accumulator.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    Network(String),
    Timeout(Duration),
    Http { status: u16, body: String },
    Decode(String),
    InvalidPageSize(usize),
}

impl FetchError {
    /// Map a reqwest error onto the fetch taxonomy
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(timeout)
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Http {
                status: status.as_u16(),
                body: String::new(),
            }
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Network(msg) => write!(f, "Network error: {}", msg),
            FetchError::Timeout(after) => write!(f, "Request timed out after {:?}", after),
            FetchError::Http { status, body } if body.is_empty() => {
                write!(f, "Members API returned HTTP {}", status)
            }
            FetchError::Http { status, body } => {
                write!(f, "Members API returned HTTP {}: {}", status, body)
            }
            FetchError::Decode(msg) => write!(f, "Malformed members payload: {}", msg),
            FetchError::InvalidPageSize(size) => {
                write!(f, "Page size must be greater than zero, got {}", size)
            }
        }
    }
}

impl std::error::Error for FetchError {}

/// Cache store failure
#[derive(Debug)]
pub enum CacheError {
    Io(std::io::Error),
    Database(rusqlite::Error),
    Serialization(serde_json::Error),
    /// Snapshot whose `total_students` disagrees with its record list
    Inconsistent {
        unit_id: String,
        total_students: usize,
        records: usize,
    },
    /// Blocking worker panicked or was cancelled
    Task(String),
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(err)
    }
}

impl From<rusqlite::Error> for CacheError {
    fn from(err: rusqlite::Error) -> Self {
        CacheError::Database(err)
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err)
    }
}

impl From<tokio::task::JoinError> for CacheError {
    fn from(err: tokio::task::JoinError) -> Self {
        CacheError::Task(err.to_string())
    }
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::Io(e) => write!(f, "IO error: {}", e),
            CacheError::Database(e) => write!(f, "Database error: {}", e),
            CacheError::Serialization(e) => write!(f, "Serialization error: {}", e),
            CacheError::Inconsistent {
                unit_id,
                total_students,
                records,
            } => write!(
                f,
                "Snapshot for {} claims {} students but holds {}",
                unit_id, total_students, records
            ),
            CacheError::Task(msg) => write!(f, "Cache worker failed: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {}

/// Failure that aborts one unit's sync
#[derive(Debug)]
pub enum SyncError {
    Credential(CredentialError),
    Client(ClientError),
    Cache(CacheError),
    /// Worker pool shut down before the unit could run
    PoolClosed,
}

impl From<CredentialError> for SyncError {
    fn from(err: CredentialError) -> Self {
        SyncError::Credential(err)
    }
}

impl From<ClientError> for SyncError {
    fn from(err: ClientError) -> Self {
        SyncError::Client(err)
    }
}

impl From<CacheError> for SyncError {
    fn from(err: CacheError) -> Self {
        SyncError::Cache(err)
    }
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::Credential(e) => write!(f, "CredentialMissing: {}", e),
            SyncError::Client(e) => write!(f, "Client error: {}", e),
            SyncError::Cache(e) => write!(f, "Cache write failed: {}", e),
            SyncError::PoolClosed => write!(f, "Sync worker pool closed"),
        }
    }
}

impl std::error::Error for SyncError {}
