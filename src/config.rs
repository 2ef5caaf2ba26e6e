//! Runtime configuration from environment variables
//!
//! Environment variables:
//! - `MEMBERS_API_BASE_URL` (required, http:// or https://)
//! - `UNIT_CREDENTIALS_PATH` (default: config/units.json)
//! - `SYNC_DB_PATH` (default: data/member_sync.db)
//! - `SYNC_UNITS` (comma-separated; default: every registered unit)
//! - `STATUS_PARTITIONS` (default: active,inactive)
//! - `MEMBERS_PAGE_SIZE` (default: 500)
//! - `REQUEST_TIMEOUT_SECS` (default: 30)
//! - `SHOW_MEMBERSHIPS` (default: true)
//! - `SYNC_MAX_CONCURRENT_UNITS` (default: 1, strictly sequential)
//! - `SYNC_INTERVAL_SECS` (default: 3600)
//! - `RANKING_INTERVAL_SECS` (default: 300)
//! - `RANKING_TOP_N` (default: 10)
//! - `RANKING_STATUS` (default: active)
//! - `RANKING_SOURCE` (cache | live, default: cache)
//! - `RANKING_FAILURE_POLICY` (fail_together | degrade, default: fail_together)

use crate::aggregation::FailurePolicy;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
    Io(String),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
            ConfigError::Io(msg) => write!(f, "Configuration file error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Configuration parse error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Where the leaderboard reads unit records from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RankingSource {
    Cache,
    Live,
}

/// Settings for the per-unit HTTP clients and the paginator
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub page_size: usize,
    pub request_timeout: Duration,
    pub show_memberships: bool,
}

/// Full runtime configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub credentials_path: String,
    pub db_path: String,
    /// Explicit unit list; `None` means every registered unit
    pub units: Option<Vec<String>>,
    pub status_partitions: Vec<String>,
    pub max_concurrent_units: usize,
    pub sync_interval: Duration,
    pub ranking_interval: Duration,
    pub ranking_top_n: usize,
    pub ranking_status: String,
    pub ranking_source: RankingSource,
    pub ranking_failure_policy: FailurePolicy,
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{}={} is not valid", name, raw))),
        Err(_) => Ok(default),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var("MEMBERS_API_BASE_URL")
            .map_err(|_| ConfigError::MissingVariable("MEMBERS_API_BASE_URL".to_string()))?;

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "MEMBERS_API_BASE_URL must start with http:// or https://".to_string(),
            ));
        }

        let page_size: usize = parse_var("MEMBERS_PAGE_SIZE", 500)?;
        if page_size == 0 {
            return Err(ConfigError::InvalidValue(
                "MEMBERS_PAGE_SIZE must be greater than zero".to_string(),
            ));
        }

        let timeout_secs: u64 = parse_var("REQUEST_TIMEOUT_SECS", 30)?;
        let show_memberships: bool = parse_var("SHOW_MEMBERSHIPS", true)?;

        let status_partitions = parse_list(
            &env::var("STATUS_PARTITIONS").unwrap_or_else(|_| "active,inactive".to_string()),
        );
        if status_partitions.is_empty() {
            return Err(ConfigError::InvalidValue(
                "STATUS_PARTITIONS must name at least one partition".to_string(),
            ));
        }

        let units = env::var("SYNC_UNITS")
            .ok()
            .map(|raw| parse_list(&raw))
            .filter(|units| !units.is_empty());

        let max_concurrent_units: usize = parse_var("SYNC_MAX_CONCURRENT_UNITS", 1)?;
        if max_concurrent_units == 0 {
            return Err(ConfigError::InvalidValue(
                "SYNC_MAX_CONCURRENT_UNITS must be at least 1".to_string(),
            ));
        }

        // tokio intervals panic on a zero period
        let sync_interval_secs: u64 = parse_var("SYNC_INTERVAL_SECS", 3600)?;
        if sync_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "SYNC_INTERVAL_SECS must be at least 1".to_string(),
            ));
        }
        let ranking_interval_secs: u64 = parse_var("RANKING_INTERVAL_SECS", 300)?;
        if ranking_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "RANKING_INTERVAL_SECS must be at least 1".to_string(),
            ));
        }

        let ranking_source = match env::var("RANKING_SOURCE")
            .unwrap_or_else(|_| "cache".to_string())
            .to_lowercase()
            .as_str()
        {
            "cache" => RankingSource::Cache,
            "live" => RankingSource::Live,
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "RANKING_SOURCE must be cache or live, got {}",
                    other
                )))
            }
        };

        let ranking_failure_policy = match env::var("RANKING_FAILURE_POLICY")
            .unwrap_or_else(|_| "fail_together".to_string())
            .to_lowercase()
            .as_str()
        {
            "fail_together" => FailurePolicy::FailTogether,
            "degrade" => FailurePolicy::Degrade,
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "RANKING_FAILURE_POLICY must be fail_together or degrade, got {}",
                    other
                )))
            }
        };

        Ok(Self {
            api: ApiConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                page_size,
                request_timeout: Duration::from_secs(timeout_secs),
                show_memberships,
            },
            credentials_path: env::var("UNIT_CREDENTIALS_PATH")
                .unwrap_or_else(|_| "config/units.json".to_string()),
            db_path: env::var("SYNC_DB_PATH").unwrap_or_else(|_| "data/member_sync.db".to_string()),
            units,
            status_partitions,
            max_concurrent_units,
            sync_interval: Duration::from_secs(sync_interval_secs),
            ranking_interval: Duration::from_secs(ranking_interval_secs),
            ranking_top_n: parse_var("RANKING_TOP_N", 10)?,
            ranking_status: env::var("RANKING_STATUS").unwrap_or_else(|_| "active".to_string()),
            ranking_source,
            ranking_failure_policy,
        })
    }

    /// Resolve the unit list: explicit `SYNC_UNITS` or every registered unit
    pub fn resolve_units(&self, registered: Vec<String>) -> Vec<String> {
        self.units.clone().unwrap_or(registered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment is process-global; serialize the tests that touch it
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "MEMBERS_API_BASE_URL",
        "MEMBERS_PAGE_SIZE",
        "STATUS_PARTITIONS",
        "SYNC_UNITS",
        "SYNC_MAX_CONCURRENT_UNITS",
        "RANKING_SOURCE",
        "RANKING_FAILURE_POLICY",
        "SYNC_INTERVAL_SECS",
        "RANKING_INTERVAL_SECS",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("MEMBERS_API_BASE_URL", "https://members.example.com/api/");

        let config = AppConfig::from_env().unwrap();

        assert_eq!(config.api.base_url, "https://members.example.com/api");
        assert_eq!(config.api.page_size, 500);
        assert_eq!(config.api.request_timeout, Duration::from_secs(30));
        assert!(config.api.show_memberships);
        assert_eq!(config.status_partitions, vec!["active", "inactive"]);
        assert_eq!(config.units, None);
        assert_eq!(config.max_concurrent_units, 1);
        assert_eq!(config.ranking_interval, Duration::from_secs(300));
        assert_eq!(config.ranking_source, RankingSource::Cache);
        assert_eq!(config.ranking_failure_policy, FailurePolicy::FailTogether);

        clear_env();
    }

    #[test]
    fn test_custom_config() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("MEMBERS_API_BASE_URL", "http://localhost:9000");
        env::set_var("MEMBERS_PAGE_SIZE", "100");
        env::set_var("SYNC_UNITS", "north, south,,");
        env::set_var("SYNC_MAX_CONCURRENT_UNITS", "3");
        env::set_var("RANKING_SOURCE", "live");
        env::set_var("RANKING_FAILURE_POLICY", "degrade");

        let config = AppConfig::from_env().unwrap();

        assert_eq!(config.api.page_size, 100);
        assert_eq!(config.units, Some(vec!["north".to_string(), "south".to_string()]));
        assert_eq!(config.max_concurrent_units, 3);
        assert_eq!(config.ranking_source, RankingSource::Live);
        assert_eq!(config.ranking_failure_policy, FailurePolicy::Degrade);

        clear_env();
    }

    #[test]
    fn test_invalid_values_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        assert_eq!(
            AppConfig::from_env().unwrap_err(),
            ConfigError::MissingVariable("MEMBERS_API_BASE_URL".to_string())
        );

        env::set_var("MEMBERS_API_BASE_URL", "ftp://nope");
        assert!(matches!(AppConfig::from_env(), Err(ConfigError::InvalidValue(_))));

        env::set_var("MEMBERS_API_BASE_URL", "http://localhost");
        env::set_var("MEMBERS_PAGE_SIZE", "0");
        assert!(matches!(AppConfig::from_env(), Err(ConfigError::InvalidValue(_))));

        env::set_var("MEMBERS_PAGE_SIZE", "abc");
        assert!(matches!(AppConfig::from_env(), Err(ConfigError::InvalidValue(_))));
        env::remove_var("MEMBERS_PAGE_SIZE");

        env::set_var("SYNC_INTERVAL_SECS", "0");
        assert!(matches!(AppConfig::from_env(), Err(ConfigError::InvalidValue(msg)) if msg.contains("SYNC_INTERVAL_SECS")));
        env::remove_var("SYNC_INTERVAL_SECS");

        env::set_var("RANKING_INTERVAL_SECS", "0");
        assert!(matches!(AppConfig::from_env(), Err(ConfigError::InvalidValue(msg)) if msg.contains("RANKING_INTERVAL_SECS")));

        clear_env();
    }
}
